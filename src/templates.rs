//! Built-in action templates: named bundles of default actions an operator
//! can pick instead of assembling a set by hand. Once a record is created the
//! materialized action list is authoritative and the template id is kept for
//! display only.

use serde::Serialize;

use crate::model::LifecycleAction;

/// A named bundle of default actions.
#[derive(Debug, Clone, Serialize)]
pub struct ActionTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub actions: &'static [LifecycleAction],
}

/// The built-in catalog.
pub const TEMPLATES: &[ActionTemplate] = &[
    ActionTemplate {
        id: "standard-offboard",
        name: "Standard offboarding",
        description: "Disable sign-in, revoke sessions and entitlements, clean up memberships",
        actions: &[
            LifecycleAction::DisableAccount,
            LifecycleAction::RevokeAccess,
            LifecycleAction::ResetPassword,
            LifecycleAction::RevokeLicenses,
            LifecycleAction::RemoveFromGroups,
            LifecycleAction::RemoveFromTeams,
            LifecycleAction::RemoveAppAccess,
        ],
    },
    ActionTemplate {
        id: "security-lockout",
        name: "Security lockout",
        description: "Immediate credential and session lockdown, memberships untouched",
        actions: &[
            LifecycleAction::DisableAccount,
            LifecycleAction::RevokeAccess,
            LifecycleAction::ResetPassword,
            LifecycleAction::RemoveAuthMethods,
        ],
    },
    ActionTemplate {
        id: "full-departure",
        name: "Full departure",
        description: "Complete offboarding including mailbox handover, data transfer, and device wipe",
        actions: &[
            LifecycleAction::DisableAccount,
            LifecycleAction::RevokeAccess,
            LifecycleAction::ResetPassword,
            LifecycleAction::RemoveAuthMethods,
            LifecycleAction::RevokeLicenses,
            LifecycleAction::RemoveFromGroups,
            LifecycleAction::RemoveFromTeams,
            LifecycleAction::RemoveAppAccess,
            LifecycleAction::ConvertToSharedMailbox,
            LifecycleAction::SetEmailForwarding,
            LifecycleAction::SetAutoReply,
            LifecycleAction::BackupData,
            LifecycleAction::TransferFiles,
            LifecycleAction::WipeDevices,
        ],
    },
];

/// Look up a template by id.
pub fn find(id: &str) -> Option<&'static ActionTemplate> {
    TEMPLATES.iter().find(|t| t.id == id)
}
