//! Directory API adapter layer.
//!
//! `DirectoryGateway` is the seam to the external identity/directory service:
//! one low-level, individually-retryable resource operation per method, all
//! scoped to the caller's access token. The action catalog in
//! [`actions`] composes these into the operations an operator schedules.

pub mod actions;
pub mod http;

pub use self::http::HttpDirectoryGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::AccessToken;

#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Non-transient API rejection (4xx other than throttling).
    #[error("directory API returned {status}: {message}")]
    Api { status: u16, message: String },
    /// Network / timeout failure after retries were exhausted.
    #[error("directory request failed: {0}")]
    Transport(String),
    /// The API answered but the payload did not decode.
    #[error("invalid directory response: {0}")]
    Payload(String),
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

// ---------------------------------------------------------------------------
// Resource types
// ---------------------------------------------------------------------------

/// A group the target user is a member of, with the flags that gate whether
/// membership removal is safe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryGroup {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub mail_enabled: bool,
    #[serde(default)]
    pub on_premises_synced: bool,
    /// Present when membership is rule-driven rather than assigned.
    #[serde(default)]
    pub membership_rule: Option<String>,
}

/// Why a group must not be touched by automated removal, if any. Synced
/// groups are mastered elsewhere, mail-enabled groups need a mailbox-side
/// change, and dynamic memberships would immediately reassert themselves.
pub fn group_skip_reason(group: &DirectoryGroup) -> Option<String> {
    if group.on_premises_synced {
        Some(format!(
            "'{}' is synced from the on-premises directory",
            group.display_name
        ))
    } else if group.mail_enabled {
        Some(format!("'{}' is mail-enabled", group.display_name))
    } else if group.membership_rule.is_some() {
        Some(format!(
            "'{}' has a dynamic membership rule",
            group.display_name
        ))
    } else {
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamRef {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppAssignment {
    pub id: String,
    pub app_display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthMethodRef {
    pub id: String,
    pub method_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagedDevice {
    pub id: String,
    pub display_name: String,
}

// ---------------------------------------------------------------------------
// Gateway trait
// ---------------------------------------------------------------------------

/// Low-level directory operations. Each call is idempotent or safely
/// retryable; transient failures are retried inside the implementation and
/// only surface after the retry budget is spent.
#[async_trait]
pub trait DirectoryGateway: Send + Sync {
    async fn disable_sign_in(&self, user_id: &str, token: &AccessToken) -> DirectoryResult<()>;

    async fn set_password(
        &self,
        user_id: &str,
        new_password: &str,
        token: &AccessToken,
    ) -> DirectoryResult<()>;

    async fn revoke_sessions(&self, user_id: &str, token: &AccessToken) -> DirectoryResult<()>;

    async fn assigned_licenses(
        &self,
        user_id: &str,
        token: &AccessToken,
    ) -> DirectoryResult<Vec<String>>;

    async fn remove_licenses(
        &self,
        user_id: &str,
        sku_ids: &[String],
        token: &AccessToken,
    ) -> DirectoryResult<()>;

    async fn member_groups(
        &self,
        user_id: &str,
        token: &AccessToken,
    ) -> DirectoryResult<Vec<DirectoryGroup>>;

    async fn remove_group_member(
        &self,
        group_id: &str,
        user_id: &str,
        token: &AccessToken,
    ) -> DirectoryResult<()>;

    async fn joined_teams(
        &self,
        user_id: &str,
        token: &AccessToken,
    ) -> DirectoryResult<Vec<TeamRef>>;

    async fn remove_team_member(
        &self,
        team_id: &str,
        user_id: &str,
        token: &AccessToken,
    ) -> DirectoryResult<()>;

    async fn app_assignments(
        &self,
        user_id: &str,
        token: &AccessToken,
    ) -> DirectoryResult<Vec<AppAssignment>>;

    async fn remove_app_assignment(
        &self,
        user_id: &str,
        assignment_id: &str,
        token: &AccessToken,
    ) -> DirectoryResult<()>;

    async fn auth_methods(
        &self,
        user_id: &str,
        token: &AccessToken,
    ) -> DirectoryResult<Vec<AuthMethodRef>>;

    async fn delete_auth_method(
        &self,
        user_id: &str,
        method_id: &str,
        token: &AccessToken,
    ) -> DirectoryResult<()>;

    async fn convert_to_shared_mailbox(
        &self,
        user_id: &str,
        token: &AccessToken,
    ) -> DirectoryResult<()>;

    async fn set_mail_forwarding(
        &self,
        user_id: &str,
        forward_to: &str,
        token: &AccessToken,
    ) -> DirectoryResult<()>;

    async fn set_auto_reply(
        &self,
        user_id: &str,
        message: &str,
        token: &AccessToken,
    ) -> DirectoryResult<()>;

    async fn archive_drive(
        &self,
        user_id: &str,
        destination: &str,
        token: &AccessToken,
    ) -> DirectoryResult<()>;

    async fn transfer_drive_ownership(
        &self,
        user_id: &str,
        new_owner: &str,
        token: &AccessToken,
    ) -> DirectoryResult<()>;

    async fn managed_devices(
        &self,
        user_id: &str,
        token: &AccessToken,
    ) -> DirectoryResult<Vec<ManagedDevice>>;

    async fn wipe_device(&self, device_id: &str, token: &AccessToken) -> DirectoryResult<()>;

    async fn retire_device(&self, device_id: &str, token: &AccessToken) -> DirectoryResult<()>;

    async fn uninstall_managed_apps(
        &self,
        device_id: &str,
        token: &AccessToken,
    ) -> DirectoryResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(name: &str) -> DirectoryGroup {
        DirectoryGroup {
            id: "g-1".to_string(),
            display_name: name.to_string(),
            mail_enabled: false,
            on_premises_synced: false,
            membership_rule: None,
        }
    }

    #[test]
    fn test_plain_group_has_no_skip_reason() {
        assert!(group_skip_reason(&group("Engineering")).is_none());
    }

    #[test]
    fn test_flagged_groups_are_skipped_with_reason() {
        let mut synced = group("Domain Users");
        synced.on_premises_synced = true;
        assert!(group_skip_reason(&synced).unwrap().contains("on-premises"));

        let mut mail = group("all-hands");
        mail.mail_enabled = true;
        assert!(group_skip_reason(&mail).unwrap().contains("mail-enabled"));

        let mut dynamic = group("All FTEs");
        dynamic.membership_rule = Some("user.employeeType -eq \"FTE\"".to_string());
        assert!(group_skip_reason(&dynamic).unwrap().contains("dynamic"));
    }

    #[test]
    fn test_sync_flag_takes_precedence_in_reason() {
        let mut g = group("Hybrid DL");
        g.on_premises_synced = true;
        g.mail_enabled = true;
        assert!(group_skip_reason(&g).unwrap().contains("on-premises"));
    }
}
