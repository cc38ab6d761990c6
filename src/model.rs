//! Core domain types: lifecycle actions, scheduled-action records, and
//! execution logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// LifecycleAction
// ---------------------------------------------------------------------------

/// The fixed catalog of directory actions that can be scheduled against a
/// target user. One variant per directory operation; dispatch happens through
/// a single match in `directory::actions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleAction {
    DisableAccount,
    ResetPassword,
    RevokeAccess,
    RevokeLicenses,
    RemoveFromGroups,
    RemoveFromTeams,
    RemoveAppAccess,
    RemoveAuthMethods,
    ConvertToSharedMailbox,
    SetEmailForwarding,
    SetAutoReply,
    BackupData,
    TransferFiles,
    WipeDevices,
    RetireDevices,
    RemoveApps,
}

/// Canonical execution order. Sign-in disablement and session revocation
/// always run first; device actions always run last, with the full wipe at
/// the very end. The engine sorts every record's action set by this order,
/// regardless of the order the caller submitted.
pub const SAFETY_ORDER: [LifecycleAction; 16] = [
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
    LifecycleAction::RemoveApps,
    LifecycleAction::RetireDevices,
    LifecycleAction::WipeDevices,
];

impl LifecycleAction {
    /// Position in the canonical safety order.
    pub fn safety_rank(self) -> usize {
        SAFETY_ORDER
            .iter()
            .position(|a| *a == self)
            .unwrap_or(SAFETY_ORDER.len())
    }

    /// Device wipe and retire cannot be undone; the UI surfaces this flag
    /// before accepting a schedule.
    pub fn is_irreversible(self) -> bool {
        matches!(
            self,
            LifecycleAction::WipeDevices | LifecycleAction::RetireDevices
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleAction::DisableAccount => "disableAccount",
            LifecycleAction::ResetPassword => "resetPassword",
            LifecycleAction::RevokeAccess => "revokeAccess",
            LifecycleAction::RevokeLicenses => "revokeLicenses",
            LifecycleAction::RemoveFromGroups => "removeFromGroups",
            LifecycleAction::RemoveFromTeams => "removeFromTeams",
            LifecycleAction::RemoveAppAccess => "removeAppAccess",
            LifecycleAction::RemoveAuthMethods => "removeAuthMethods",
            LifecycleAction::ConvertToSharedMailbox => "convertToSharedMailbox",
            LifecycleAction::SetEmailForwarding => "setEmailForwarding",
            LifecycleAction::SetAutoReply => "setAutoReply",
            LifecycleAction::BackupData => "backupData",
            LifecycleAction::TransferFiles => "transferFiles",
            LifecycleAction::WipeDevices => "wipeDevices",
            LifecycleAction::RetireDevices => "retireDevices",
            LifecycleAction::RemoveApps => "removeApps",
        }
    }
}

impl std::fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Drop duplicate actions, keeping the first occurrence of each.
pub fn dedup_actions(actions: Vec<LifecycleAction>) -> Vec<LifecycleAction> {
    let mut seen = std::collections::HashSet::new();
    actions.into_iter().filter(|a| seen.insert(*a)).collect()
}

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

/// Lifecycle of a scheduled-action record. `Completed`, `Failed`, and
/// `Partial` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScheduleStatus {
    Scheduled,
    InProgress,
    Completed,
    Failed,
    Partial,
}

impl ScheduleStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ScheduleStatus::Completed | ScheduleStatus::Failed | ScheduleStatus::Partial
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScheduleStatus::Scheduled => "scheduled",
            ScheduleStatus::InProgress => "in-progress",
            ScheduleStatus::Completed => "completed",
            ScheduleStatus::Failed => "failed",
            ScheduleStatus::Partial => "partial",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(ScheduleStatus::Scheduled),
            "in-progress" => Some(ScheduleStatus::InProgress),
            "completed" => Some(ScheduleStatus::Completed),
            "failed" => Some(ScheduleStatus::Failed),
            "partial" => Some(ScheduleStatus::Partial),
            _ => None,
        }
    }
}

impl std::fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one action within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Success,
    Failed,
    Skipped,
}

// ---------------------------------------------------------------------------
// Execution log
// ---------------------------------------------------------------------------

/// One entry per action attempted, in execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub action: LifecycleAction,
    pub status: ActionStatus,
    /// Human-readable detail for successes and skips.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Error message for failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    pub fn success(action: LifecycleAction, detail: impl Into<String>) -> Self {
        Self {
            action,
            status: ActionStatus::Success,
            detail: Some(detail.into()),
            error: None,
        }
    }

    pub fn failed(action: LifecycleAction, error: impl Into<String>) -> Self {
        Self {
            action,
            status: ActionStatus::Failed,
            detail: None,
            error: Some(error.into()),
        }
    }

    pub fn skipped(action: LifecycleAction, reason: impl Into<String>) -> Self {
        Self {
            action,
            status: ActionStatus::Skipped,
            detail: Some(reason.into()),
            error: None,
        }
    }
}

/// Structured result of one run, embedded in the record and copied to the
/// audit store. Counts are denormalized from `action_results` and always
/// consistent with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLog {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub action_results: Vec<ActionResult>,
    pub total_actions: usize,
    pub successful_actions: usize,
    pub failed_actions: usize,
    pub skipped_actions: usize,
}

impl ExecutionLog {
    /// Build a log from per-action results, computing the counts.
    pub fn from_results(
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        action_results: Vec<ActionResult>,
    ) -> Self {
        let successful = action_results
            .iter()
            .filter(|r| r.status == ActionStatus::Success)
            .count();
        let failed = action_results
            .iter()
            .filter(|r| r.status == ActionStatus::Failed)
            .count();
        let skipped = action_results
            .iter()
            .filter(|r| r.status == ActionStatus::Skipped)
            .count();
        Self {
            started_at,
            finished_at,
            total_actions: action_results.len(),
            successful_actions: successful,
            failed_actions: failed,
            skipped_actions: skipped,
            action_results,
        }
    }

    /// Terminal record status implied by this log: `completed` if nothing
    /// failed, `failed` if nothing succeeded, `partial` otherwise.
    pub fn terminal_status(&self) -> ScheduleStatus {
        if self.failed_actions == 0 {
            ScheduleStatus::Completed
        } else if self.successful_actions == 0 {
            ScheduleStatus::Failed
        } else {
            ScheduleStatus::Partial
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduled action record
// ---------------------------------------------------------------------------

/// Snapshot of the target user, taken at creation time so the record stays
/// meaningful even if the directory entity is later deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetUser {
    /// Directory object id.
    pub id: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    /// Manager's mail address, used as the default forwarding recipient.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_mail: Option<String>,
}

/// Secondary targets for actions that need one (forwarding recipient,
/// auto-reply text, file-transfer recipient, backup destination). An action
/// whose parameter is absent records a skipped outcome.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_reply_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_destination: Option<String>,
}

/// One scheduled (or historical) run against a target user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledAction {
    pub id: Uuid,
    pub tenant_id: String,
    pub session_id: String,
    pub created_by: String,
    pub target: TargetUser,
    pub scheduled_at: DateTime<Utc>,
    pub actions: Vec<LifecycleAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default)]
    pub params: ActionParams,
    pub status: ScheduleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_log: Option<ExecutionLog>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for `create`. `actions` may be empty when `template_id` names a
/// known template, in which case the template's action set is materialized.
#[derive(Debug, Clone, Deserialize)]
pub struct NewScheduledAction {
    pub target: TargetUser,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub actions: Vec<LifecycleAction>,
    pub template_id: Option<String>,
    #[serde(default)]
    pub params: ActionParams,
    pub notes: Option<String>,
}

/// Partial update, applicable only while the record is still `scheduled`.
/// For `notes`, an absent field leaves the value unchanged while an explicit
/// `null` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScheduledActionPatch {
    pub scheduled_at: Option<DateTime<Utc>>,
    pub actions: Option<Vec<LifecycleAction>>,
    pub params: Option<ActionParams>,
    #[serde(deserialize_with = "clearable_field")]
    pub notes: Option<Option<String>>,
}

/// Wrap a present-but-possibly-null field so `null` survives as
/// `Some(None)` instead of collapsing into "absent".
fn clearable_field<'de, D>(de: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(de).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safety_order_covers_every_action() {
        // Every variant appears exactly once in the canonical order.
        for action in SAFETY_ORDER {
            assert_eq!(
                SAFETY_ORDER.iter().filter(|a| **a == action).count(),
                1,
                "{action} duplicated in SAFETY_ORDER"
            );
        }
        assert!(SAFETY_ORDER
            .iter()
            .all(|a| a.safety_rank() < SAFETY_ORDER.len()));
    }

    #[test]
    fn test_disable_precedes_revoke_precedes_wipe() {
        assert!(
            LifecycleAction::DisableAccount.safety_rank()
                < LifecycleAction::RevokeAccess.safety_rank()
        );
        assert!(
            LifecycleAction::RevokeAccess.safety_rank()
                < LifecycleAction::RemoveFromGroups.safety_rank()
        );
        assert_eq!(
            LifecycleAction::WipeDevices.safety_rank(),
            SAFETY_ORDER.len() - 1
        );
    }

    #[test]
    fn test_action_serde_names_are_camel_case() {
        let json = serde_json::to_string(&LifecycleAction::DisableAccount).unwrap();
        assert_eq!(json, "\"disableAccount\"");
        let parsed: LifecycleAction = serde_json::from_str("\"removeFromGroups\"").unwrap();
        assert_eq!(parsed, LifecycleAction::RemoveFromGroups);
    }

    #[test]
    fn test_status_parse_roundtrip() {
        for status in [
            ScheduleStatus::Scheduled,
            ScheduleStatus::InProgress,
            ScheduleStatus::Completed,
            ScheduleStatus::Failed,
            ScheduleStatus::Partial,
        ] {
            assert_eq!(ScheduleStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ScheduleStatus::parse("bogus"), None);
    }

    #[test]
    fn test_patch_notes_distinguishes_absent_and_null() {
        let absent: ScheduledActionPatch = serde_json::from_str("{}").unwrap();
        assert!(absent.notes.is_none());

        let cleared: ScheduledActionPatch = serde_json::from_str(r#"{"notes": null}"#).unwrap();
        assert_eq!(cleared.notes, Some(None));

        let set: ScheduledActionPatch =
            serde_json::from_str(r#"{"notes": "handover done"}"#).unwrap();
        assert_eq!(set.notes, Some(Some("handover done".to_string())));
    }

    #[test]
    fn test_dedup_preserves_first_occurrence() {
        let actions = dedup_actions(vec![
            LifecycleAction::WipeDevices,
            LifecycleAction::DisableAccount,
            LifecycleAction::WipeDevices,
        ]);
        assert_eq!(
            actions,
            vec![LifecycleAction::WipeDevices, LifecycleAction::DisableAccount]
        );
    }

    #[test]
    fn test_execution_log_counts_and_terminal_status() {
        let now = Utc::now();
        let log = ExecutionLog::from_results(
            now,
            now,
            vec![
                ActionResult::success(LifecycleAction::DisableAccount, "disabled"),
                ActionResult::failed(LifecycleAction::RevokeLicenses, "api error"),
                ActionResult::skipped(LifecycleAction::RemoveFromGroups, "all groups filtered"),
            ],
        );
        assert_eq!(log.total_actions, 3);
        assert_eq!(log.successful_actions, 1);
        assert_eq!(log.failed_actions, 1);
        assert_eq!(log.skipped_actions, 1);
        assert_eq!(
            log.total_actions,
            log.successful_actions + log.failed_actions + log.skipped_actions
        );
        assert_eq!(log.terminal_status(), ScheduleStatus::Partial);
    }

    #[test]
    fn test_terminal_status_boundaries() {
        let now = Utc::now();
        let all_ok = ExecutionLog::from_results(
            now,
            now,
            vec![
                ActionResult::success(LifecycleAction::DisableAccount, "ok"),
                ActionResult::skipped(LifecycleAction::SetAutoReply, "no message configured"),
            ],
        );
        assert_eq!(all_ok.terminal_status(), ScheduleStatus::Completed);

        let all_bad = ExecutionLog::from_results(
            now,
            now,
            vec![ActionResult::failed(LifecycleAction::DisableAccount, "boom")],
        );
        assert_eq!(all_bad.terminal_status(), ScheduleStatus::Failed);
    }
}
