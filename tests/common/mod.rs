//! Shared test fixtures: an in-memory directory gateway and record builders.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use offboardd::auth::AccessToken;
use offboardd::directory::{
    AppAssignment, AuthMethodRef, DirectoryError, DirectoryGateway, DirectoryGroup,
    DirectoryResult, ManagedDevice, TeamRef,
};
use offboardd::model::{
    ActionParams, LifecycleAction, ScheduleStatus, ScheduledAction, TargetUser,
};

/// Directory gateway backed by fixture data. Operations named in
/// `fail_ops` return an API error; everything else succeeds and is recorded
/// in `calls` in invocation order.
#[derive(Default)]
pub struct MockGateway {
    pub groups: Vec<DirectoryGroup>,
    pub teams: Vec<TeamRef>,
    pub licenses: Vec<String>,
    pub assignments: Vec<AppAssignment>,
    pub auth_methods: Vec<AuthMethodRef>,
    pub devices: Vec<ManagedDevice>,
    pub fail_ops: HashSet<&'static str>,
    pub calls: Mutex<Vec<String>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(ops: &[&'static str]) -> Self {
        Self {
            fail_ops: ops.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn recorded_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn check(&self, op: &'static str) -> DirectoryResult<()> {
        self.calls.lock().unwrap().push(op.to_string());
        if self.fail_ops.contains(op) {
            return Err(DirectoryError::Api {
                status: 503,
                message: format!("{op} unavailable"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DirectoryGateway for MockGateway {
    async fn disable_sign_in(&self, _user_id: &str, _token: &AccessToken) -> DirectoryResult<()> {
        self.check("disable_sign_in")
    }

    async fn set_password(
        &self,
        _user_id: &str,
        _new_password: &str,
        _token: &AccessToken,
    ) -> DirectoryResult<()> {
        self.check("set_password")
    }

    async fn revoke_sessions(&self, _user_id: &str, _token: &AccessToken) -> DirectoryResult<()> {
        self.check("revoke_sessions")
    }

    async fn assigned_licenses(
        &self,
        _user_id: &str,
        _token: &AccessToken,
    ) -> DirectoryResult<Vec<String>> {
        self.check("assigned_licenses")?;
        Ok(self.licenses.clone())
    }

    async fn remove_licenses(
        &self,
        _user_id: &str,
        _sku_ids: &[String],
        _token: &AccessToken,
    ) -> DirectoryResult<()> {
        self.check("remove_licenses")
    }

    async fn member_groups(
        &self,
        _user_id: &str,
        _token: &AccessToken,
    ) -> DirectoryResult<Vec<DirectoryGroup>> {
        self.check("member_groups")?;
        Ok(self.groups.clone())
    }

    async fn remove_group_member(
        &self,
        group_id: &str,
        _user_id: &str,
        _token: &AccessToken,
    ) -> DirectoryResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("remove_group_member:{group_id}"));
        if self.fail_ops.contains("remove_group_member") {
            return Err(DirectoryError::Api {
                status: 503,
                message: "remove_group_member unavailable".to_string(),
            });
        }
        Ok(())
    }

    async fn joined_teams(
        &self,
        _user_id: &str,
        _token: &AccessToken,
    ) -> DirectoryResult<Vec<TeamRef>> {
        self.check("joined_teams")?;
        Ok(self.teams.clone())
    }

    async fn remove_team_member(
        &self,
        _team_id: &str,
        _user_id: &str,
        _token: &AccessToken,
    ) -> DirectoryResult<()> {
        self.check("remove_team_member")
    }

    async fn app_assignments(
        &self,
        _user_id: &str,
        _token: &AccessToken,
    ) -> DirectoryResult<Vec<AppAssignment>> {
        self.check("app_assignments")?;
        Ok(self.assignments.clone())
    }

    async fn remove_app_assignment(
        &self,
        _user_id: &str,
        _assignment_id: &str,
        _token: &AccessToken,
    ) -> DirectoryResult<()> {
        self.check("remove_app_assignment")
    }

    async fn auth_methods(
        &self,
        _user_id: &str,
        _token: &AccessToken,
    ) -> DirectoryResult<Vec<AuthMethodRef>> {
        self.check("auth_methods")?;
        Ok(self.auth_methods.clone())
    }

    async fn delete_auth_method(
        &self,
        _user_id: &str,
        _method_id: &str,
        _token: &AccessToken,
    ) -> DirectoryResult<()> {
        self.check("delete_auth_method")
    }

    async fn convert_to_shared_mailbox(
        &self,
        _user_id: &str,
        _token: &AccessToken,
    ) -> DirectoryResult<()> {
        self.check("convert_to_shared_mailbox")
    }

    async fn set_mail_forwarding(
        &self,
        _user_id: &str,
        forward_to: &str,
        _token: &AccessToken,
    ) -> DirectoryResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("set_mail_forwarding:{forward_to}"));
        Ok(())
    }

    async fn set_auto_reply(
        &self,
        _user_id: &str,
        _message: &str,
        _token: &AccessToken,
    ) -> DirectoryResult<()> {
        self.check("set_auto_reply")
    }

    async fn archive_drive(
        &self,
        _user_id: &str,
        _destination: &str,
        _token: &AccessToken,
    ) -> DirectoryResult<()> {
        self.check("archive_drive")
    }

    async fn transfer_drive_ownership(
        &self,
        _user_id: &str,
        _new_owner: &str,
        _token: &AccessToken,
    ) -> DirectoryResult<()> {
        self.check("transfer_drive_ownership")
    }

    async fn managed_devices(
        &self,
        _user_id: &str,
        _token: &AccessToken,
    ) -> DirectoryResult<Vec<ManagedDevice>> {
        self.check("managed_devices")?;
        Ok(self.devices.clone())
    }

    async fn wipe_device(&self, _device_id: &str, _token: &AccessToken) -> DirectoryResult<()> {
        self.check("wipe_device")
    }

    async fn retire_device(&self, _device_id: &str, _token: &AccessToken) -> DirectoryResult<()> {
        self.check("retire_device")
    }

    async fn uninstall_managed_apps(
        &self,
        _device_id: &str,
        _token: &AccessToken,
    ) -> DirectoryResult<()> {
        self.check("uninstall_managed_apps")
    }
}

// ---------------------------------------------------------------------------
// Fixture builders
// ---------------------------------------------------------------------------

pub fn target_user() -> TargetUser {
    TargetUser {
        id: "u-100".to_string(),
        display_name: "Dana Leaving".to_string(),
        mail: Some("dana@contoso.test".to_string()),
        department: Some("Finance".to_string()),
        manager_mail: Some("boss@contoso.test".to_string()),
    }
}

pub fn plain_group(id: &str, name: &str) -> DirectoryGroup {
    DirectoryGroup {
        id: id.to_string(),
        display_name: name.to_string(),
        mail_enabled: false,
        on_premises_synced: false,
        membership_rule: None,
    }
}

pub fn synced_group(id: &str, name: &str) -> DirectoryGroup {
    DirectoryGroup {
        on_premises_synced: true,
        ..plain_group(id, name)
    }
}

/// An in-memory record for engine tests, bypassing the store.
pub fn record_with_actions(actions: Vec<LifecycleAction>) -> ScheduledAction {
    let now = Utc::now();
    ScheduledAction {
        id: Uuid::new_v4(),
        tenant_id: "t1".to_string(),
        session_id: "sess-1".to_string(),
        created_by: "admin@contoso.test".to_string(),
        target: target_user(),
        scheduled_at: now - Duration::minutes(1),
        actions,
        template_id: None,
        params: ActionParams::default(),
        status: ScheduleStatus::InProgress,
        notes: None,
        execution_log: None,
        created_at: now,
        updated_at: now,
    }
}
