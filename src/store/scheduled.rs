//! Persistent scheduled-action records.
//!
//! All read and write paths except `list_due` are tenant-scoped: the tenant
//! id is part of every WHERE clause, and a mismatch surfaces as not-found.
//! The single concurrency-control primitive is `claim`, a conditional update
//! keyed on the expected prior status.

use chrono::{DateTime, Duration, Utc};
use rusqlite::params;
use uuid::Uuid;

use crate::context::TenantContext;
use crate::error::{EngineError, EngineResult};
use crate::model::{
    dedup_actions, ActionParams, ExecutionLog, LifecycleAction, NewScheduledAction,
    ScheduleStatus, ScheduledAction, ScheduledActionPatch, TargetUser,
};
use crate::store::Pool;
use crate::templates;

/// Grace when validating that `scheduled_at` is not in the past. Wide enough
/// that "a minute ago" on the caller's clock is always accepted regardless of
/// clock skew; the poller picks such records up on its next tick.
const PAST_GRACE_SECONDS: i64 = 300;

const SELECT_COLUMNS: &str = "id, tenant_id, session_id, created_by, target_json, scheduled_at, \
     actions_json, template_id, params_json, status, notes, execution_log_json, \
     created_at, updated_at";

#[derive(Clone)]
pub struct ScheduledActionStore {
    pool: Pool,
}

/// Raw row as read from SQLite, before JSON columns are decoded.
struct RawRow {
    id: String,
    tenant_id: String,
    session_id: String,
    created_by: String,
    target_json: String,
    scheduled_at: String,
    actions_json: String,
    template_id: Option<String>,
    params_json: String,
    status: String,
    notes: Option<String>,
    execution_log_json: Option<String>,
    created_at: String,
    updated_at: String,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        session_id: row.get(2)?,
        created_by: row.get(3)?,
        target_json: row.get(4)?,
        scheduled_at: row.get(5)?,
        actions_json: row.get(6)?,
        template_id: row.get(7)?,
        params_json: row.get(8)?,
        status: row.get(9)?,
        notes: row.get(10)?,
        execution_log_json: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn parse_ts(s: &str) -> EngineResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| EngineError::Storage(format!("bad timestamp '{s}': {e}")))
}

impl RawRow {
    fn into_record(self) -> EngineResult<ScheduledAction> {
        let target: TargetUser = serde_json::from_str(&self.target_json)?;
        let actions: Vec<LifecycleAction> = serde_json::from_str(&self.actions_json)?;
        let params: ActionParams = serde_json::from_str(&self.params_json)?;
        let execution_log: Option<ExecutionLog> = match self.execution_log_json {
            Some(json) => Some(serde_json::from_str(&json)?),
            None => None,
        };
        let status = ScheduleStatus::parse(&self.status)
            .ok_or_else(|| EngineError::Storage(format!("unknown status '{}'", self.status)))?;

        Ok(ScheduledAction {
            id: Uuid::parse_str(&self.id)
                .map_err(|e| EngineError::Storage(format!("bad record id: {e}")))?,
            tenant_id: self.tenant_id,
            session_id: self.session_id,
            created_by: self.created_by,
            target,
            scheduled_at: parse_ts(&self.scheduled_at)?,
            actions,
            template_id: self.template_id,
            params,
            status,
            notes: self.notes,
            execution_log,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

/// Materialize the effective action set for a new record: explicit actions
/// win; an empty list falls back to the named template's bundle.
fn materialize_actions(
    actions: Vec<LifecycleAction>,
    template_id: Option<&str>,
) -> EngineResult<Vec<LifecycleAction>> {
    let actions = if actions.is_empty() {
        match template_id.and_then(templates::find) {
            Some(t) => t.actions.to_vec(),
            None => Vec::new(),
        }
    } else {
        actions
    };
    let actions = dedup_actions(actions);
    if actions.is_empty() {
        return Err(EngineError::Validation(
            "at least one action is required".to_string(),
        ));
    }
    Ok(actions)
}

fn validate_scheduled_at(scheduled_at: DateTime<Utc>, now: DateTime<Utc>) -> EngineResult<()> {
    if scheduled_at < now - Duration::seconds(PAST_GRACE_SECONDS) {
        return Err(EngineError::Validation(format!(
            "scheduled_at {} is in the past",
            scheduled_at.to_rfc3339()
        )));
    }
    Ok(())
}

impl ScheduledActionStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Validate and persist a new record in state `scheduled`.
    pub fn create(
        &self,
        input: NewScheduledAction,
        ctx: &TenantContext,
    ) -> EngineResult<ScheduledAction> {
        let now = Utc::now();
        let actions = materialize_actions(input.actions, input.template_id.as_deref())?;
        validate_scheduled_at(input.scheduled_at, now)?;

        let record = ScheduledAction {
            id: Uuid::new_v4(),
            tenant_id: ctx.tenant_id.clone(),
            session_id: ctx.session_id.clone(),
            created_by: ctx.actor_id.clone(),
            target: input.target,
            scheduled_at: input.scheduled_at,
            actions,
            template_id: input.template_id,
            params: input.params,
            status: ScheduleStatus::Scheduled,
            notes: input.notes,
            execution_log: None,
            created_at: now,
            updated_at: now,
        };

        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO scheduled_actions (id, tenant_id, session_id, created_by, target_json, \
             scheduled_at, actions_json, template_id, params_json, status, notes, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                record.id.to_string(),
                record.tenant_id,
                record.session_id,
                record.created_by,
                serde_json::to_string(&record.target)?,
                record.scheduled_at.to_rfc3339(),
                serde_json::to_string(&record.actions)?,
                record.template_id,
                serde_json::to_string(&record.params)?,
                record.status.as_str(),
                record.notes,
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(record)
    }

    /// All records belonging to a tenant, newest first.
    pub fn list(&self, tenant_id: &str) -> EngineResult<Vec<ScheduledAction>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM scheduled_actions \
             WHERE tenant_id = ?1 ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map([tenant_id], read_row)?;

        let mut records = Vec::new();
        for r in rows {
            records.push(r?.into_record()?);
        }
        Ok(records)
    }

    /// Fetch one record; a foreign tenant id yields not-found.
    pub fn get(&self, id: Uuid, tenant_id: &str) -> EngineResult<ScheduledAction> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM scheduled_actions WHERE id = ?1 AND tenant_id = ?2"
        ))?;
        let mut rows = stmt.query_map(params![id.to_string(), tenant_id], read_row)?;
        match rows.next() {
            Some(row) => row?.into_record(),
            None => Err(EngineError::NotFound),
        }
    }

    /// Apply a patch to a still-`scheduled` record. A record in any other
    /// state is reported exactly like a missing one.
    pub fn update(
        &self,
        id: Uuid,
        patch: ScheduledActionPatch,
        tenant_id: &str,
    ) -> EngineResult<ScheduledAction> {
        let mut record = self.get(id, tenant_id)?;
        if record.status != ScheduleStatus::Scheduled {
            return Err(EngineError::NotFound);
        }

        if let Some(scheduled_at) = patch.scheduled_at {
            validate_scheduled_at(scheduled_at, Utc::now())?;
            record.scheduled_at = scheduled_at;
        }
        if let Some(actions) = patch.actions {
            let actions = dedup_actions(actions);
            if actions.is_empty() {
                return Err(EngineError::Validation(
                    "at least one action is required".to_string(),
                ));
            }
            record.actions = actions;
        }
        if let Some(params) = patch.params {
            record.params = params;
        }
        if let Some(notes) = patch.notes {
            record.notes = notes;
        }
        record.updated_at = Utc::now();

        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE scheduled_actions SET scheduled_at = ?1, actions_json = ?2, params_json = ?3, \
             notes = ?4, updated_at = ?5 \
             WHERE id = ?6 AND tenant_id = ?7 AND status = 'scheduled'",
            params![
                record.scheduled_at.to_rfc3339(),
                serde_json::to_string(&record.actions)?,
                serde_json::to_string(&record.params)?,
                record.notes,
                record.updated_at.to_rfc3339(),
                id.to_string(),
                tenant_id,
            ],
        )?;
        if changed == 0 {
            // Dispatched between the read and the write.
            return Err(EngineError::NotFound);
        }
        Ok(record)
    }

    /// Delete a still-`scheduled` record. Terminal records are preserved for
    /// audit history; like any other non-`scheduled` record they are reported
    /// as missing through this path.
    pub fn remove(&self, id: Uuid, tenant_id: &str) -> EngineResult<()> {
        let record = self.get(id, tenant_id)?;
        if record.status != ScheduleStatus::Scheduled {
            return Err(EngineError::NotFound);
        }
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "DELETE FROM scheduled_actions \
             WHERE id = ?1 AND tenant_id = ?2 AND status = 'scheduled'",
            params![id.to_string(), tenant_id],
        )?;
        if changed == 0 {
            return Err(EngineError::NotFound);
        }
        Ok(())
    }

    /// Every due record across all tenants. Poller-only: this is the single
    /// operation allowed to cross tenant boundaries, and it is never wired to
    /// a user-facing route.
    pub fn list_due(&self, now: DateTime<Utc>) -> EngineResult<Vec<ScheduledAction>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM scheduled_actions \
             WHERE status = 'scheduled' AND scheduled_at <= ?1 \
             ORDER BY scheduled_at ASC"
        ))?;
        let rows = stmt.query_map([now.to_rfc3339()], read_row)?;

        let mut records = Vec::new();
        for r in rows {
            records.push(r?.into_record()?);
        }
        Ok(records)
    }

    /// Atomically transition `scheduled -> in-progress`. Returns whether this
    /// caller won the transition; a concurrent tick or execute-now call sees
    /// `false` and must not dispatch.
    pub fn claim(&self, id: Uuid) -> EngineResult<bool> {
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE scheduled_actions \
             SET status = 'in-progress', updated_at = ?1 \
             WHERE id = ?2 AND status = 'scheduled'",
            params![Utc::now().to_rfc3339(), id.to_string()],
        )?;
        Ok(changed == 1)
    }

    /// Return a claimed record to `scheduled`. Compensation for a dispatch
    /// whose outcome could not be persisted; the next tick picks the record
    /// up again.
    pub fn release(&self, id: Uuid) -> EngineResult<bool> {
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE scheduled_actions \
             SET status = 'scheduled', updated_at = ?1 \
             WHERE id = ?2 AND status = 'in-progress'",
            params![Utc::now().to_rfc3339(), id.to_string()],
        )?;
        Ok(changed == 1)
    }

    /// Re-queue `in-progress` records whose claim was last touched before
    /// `cutoff`. A claim that old means the claiming process died mid-run;
    /// returning the records to `scheduled` lets a later tick dispatch them
    /// again instead of stranding them.
    pub fn requeue_stale(&self, cutoff: DateTime<Utc>) -> EngineResult<usize> {
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE scheduled_actions \
             SET status = 'scheduled', updated_at = ?1 \
             WHERE status = 'in-progress' AND updated_at < ?2",
            params![Utc::now().to_rfc3339(), cutoff.to_rfc3339()],
        )?;
        Ok(changed)
    }

    /// Persist a finished run: the execution log and the terminal status it
    /// implies.
    pub fn finish(&self, id: Uuid, log: &ExecutionLog) -> EngineResult<()> {
        let status = log.terminal_status();
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE scheduled_actions \
             SET status = ?1, execution_log_json = ?2, updated_at = ?3 \
             WHERE id = ?4 AND status = 'in-progress'",
            params![
                status.as_str(),
                serde_json::to_string(log)?,
                Utc::now().to_rfc3339(),
                id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(EngineError::Storage(format!(
                "record {id} was not in-progress when finishing"
            )));
        }
        Ok(())
    }

    /// Re-queue a `failed` or `partial` record: clears the execution log and
    /// sets `scheduled_at` (default: now) so the next poller tick picks it up
    /// through the ordinary dispatch path. All other fields are untouched.
    pub fn retry(
        &self,
        id: Uuid,
        tenant_id: &str,
        new_scheduled_at: Option<DateTime<Utc>>,
    ) -> EngineResult<ScheduledAction> {
        let record = self.get(id, tenant_id)?;
        if !matches!(
            record.status,
            ScheduleStatus::Failed | ScheduleStatus::Partial
        ) {
            return Err(EngineError::InvalidState(format!(
                "record is {}, only failed or partial records can be retried",
                record.status
            )));
        }
        let scheduled_at = new_scheduled_at.unwrap_or_else(Utc::now);
        validate_scheduled_at(scheduled_at, Utc::now())?;

        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE scheduled_actions \
             SET status = 'scheduled', execution_log_json = NULL, scheduled_at = ?1, updated_at = ?2 \
             WHERE id = ?3 AND tenant_id = ?4 AND status IN ('failed', 'partial')",
            params![
                scheduled_at.to_rfc3339(),
                Utc::now().to_rfc3339(),
                id.to_string(),
                tenant_id,
            ],
        )?;
        if changed == 0 {
            return Err(EngineError::InvalidState(
                "record is no longer in a retryable state".to_string(),
            ));
        }
        self.get(id, tenant_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ActionResult;
    use crate::store::open_pool;

    fn test_store() -> (tempfile::TempDir, ScheduledActionStore) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let pool = open_pool(path.to_str().unwrap()).unwrap();
        (dir, ScheduledActionStore::new(pool))
    }

    fn ctx(tenant: &str) -> TenantContext {
        TenantContext::new(tenant, "sess-1", "admin@contoso.test")
    }

    fn target() -> TargetUser {
        TargetUser {
            id: "u-100".to_string(),
            display_name: "Dana Leaving".to_string(),
            mail: Some("dana@contoso.test".to_string()),
            department: Some("Finance".to_string()),
            manager_mail: Some("boss@contoso.test".to_string()),
        }
    }

    fn new_input(actions: Vec<LifecycleAction>) -> NewScheduledAction {
        NewScheduledAction {
            target: target(),
            scheduled_at: Utc::now() + Duration::hours(1),
            actions,
            template_id: None,
            params: ActionParams::default(),
            notes: None,
        }
    }

    #[test]
    fn test_create_persists_scheduled_record_without_log() {
        let (_dir, store) = test_store();
        let record = store
            .create(new_input(vec![LifecycleAction::DisableAccount]), &ctx("t1"))
            .unwrap();
        assert_eq!(record.status, ScheduleStatus::Scheduled);
        assert!(record.execution_log.is_none());

        let fetched = store.get(record.id, "t1").unwrap();
        assert_eq!(fetched.target.display_name, "Dana Leaving");
        assert_eq!(fetched.actions, vec![LifecycleAction::DisableAccount]);
    }

    #[test]
    fn test_create_rejects_empty_actions() {
        let (_dir, store) = test_store();
        let err = store.create(new_input(vec![]), &ctx("t1")).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn test_create_rejects_past_timestamp() {
        let (_dir, store) = test_store();
        let mut input = new_input(vec![LifecycleAction::DisableAccount]);
        input.scheduled_at = Utc::now() - Duration::hours(1);
        let err = store.create(input, &ctx("t1")).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn test_create_accepts_one_minute_past_and_lists_it_due() {
        let (_dir, store) = test_store();
        let mut input = new_input(vec![LifecycleAction::DisableAccount]);
        input.scheduled_at = Utc::now() - Duration::minutes(1);
        let record = store.create(input, &ctx("t1")).unwrap();
        assert_eq!(record.status, ScheduleStatus::Scheduled);

        let due = store.list_due(Utc::now()).unwrap();
        assert!(due.iter().any(|r| r.id == record.id));
    }

    #[test]
    fn test_create_materializes_template_actions() {
        let (_dir, store) = test_store();
        let mut input = new_input(vec![]);
        input.template_id = Some("security-lockout".to_string());
        let record = store.create(input, &ctx("t1")).unwrap();
        assert!(record.actions.contains(&LifecycleAction::DisableAccount));
        assert!(record.actions.contains(&LifecycleAction::RemoveAuthMethods));
        assert_eq!(record.template_id.as_deref(), Some("security-lockout"));
    }

    #[test]
    fn test_tenant_isolation_reports_not_found() {
        let (_dir, store) = test_store();
        let record = store
            .create(new_input(vec![LifecycleAction::DisableAccount]), &ctx("t1"))
            .unwrap();

        assert!(matches!(
            store.get(record.id, "t2").unwrap_err(),
            EngineError::NotFound
        ));
        assert!(matches!(
            store
                .update(record.id, ScheduledActionPatch::default(), "t2")
                .unwrap_err(),
            EngineError::NotFound
        ));
        assert!(matches!(
            store.remove(record.id, "t2").unwrap_err(),
            EngineError::NotFound
        ));
        assert!(store.list("t2").unwrap().is_empty());
    }

    #[test]
    fn test_claim_is_exactly_once() {
        let (_dir, store) = test_store();
        let record = store
            .create(new_input(vec![LifecycleAction::DisableAccount]), &ctx("t1"))
            .unwrap();

        assert!(store.claim(record.id).unwrap());
        assert!(!store.claim(record.id).unwrap());
        assert_eq!(
            store.get(record.id, "t1").unwrap().status,
            ScheduleStatus::InProgress
        );
    }

    #[test]
    fn test_list_due_crosses_tenants_and_respects_time() {
        let (_dir, store) = test_store();
        let mut due = new_input(vec![LifecycleAction::DisableAccount]);
        due.scheduled_at = Utc::now() - Duration::seconds(30);
        let due_a = store.create(due.clone(), &ctx("t1")).unwrap();
        let due_b = store.create(due, &ctx("t2")).unwrap();
        store
            .create(new_input(vec![LifecycleAction::DisableAccount]), &ctx("t1"))
            .unwrap(); // one hour out, not due

        let found = store.list_due(Utc::now()).unwrap();
        let ids: Vec<Uuid> = found.iter().map(|r| r.id).collect();
        assert!(ids.contains(&due_a.id));
        assert!(ids.contains(&due_b.id));
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_update_and_remove_report_non_scheduled_as_missing() {
        let (_dir, store) = test_store();
        let record = store
            .create(new_input(vec![LifecycleAction::DisableAccount]), &ctx("t1"))
            .unwrap();
        store.claim(record.id).unwrap();

        assert!(matches!(
            store
                .update(record.id, ScheduledActionPatch::default(), "t1")
                .unwrap_err(),
            EngineError::NotFound
        ));
        assert!(matches!(
            store.remove(record.id, "t1").unwrap_err(),
            EngineError::NotFound
        ));
    }

    #[test]
    fn test_patch_can_clear_notes() {
        let (_dir, store) = test_store();
        let mut input = new_input(vec![LifecycleAction::DisableAccount]);
        input.notes = Some("pending manager approval".to_string());
        let record = store.create(input, &ctx("t1")).unwrap();

        let patch = ScheduledActionPatch {
            notes: Some(None),
            ..ScheduledActionPatch::default()
        };
        let updated = store.update(record.id, patch, "t1").unwrap();
        assert!(updated.notes.is_none());

        // An absent field leaves the value alone.
        let patch = ScheduledActionPatch {
            notes: Some(Some("reopened".to_string())),
            ..ScheduledActionPatch::default()
        };
        store.update(record.id, patch, "t1").unwrap();
        let untouched = store
            .update(record.id, ScheduledActionPatch::default(), "t1")
            .unwrap();
        assert_eq!(untouched.notes.as_deref(), Some("reopened"));
    }

    #[test]
    fn test_release_returns_claim_to_scheduled() {
        let (_dir, store) = test_store();
        let record = store
            .create(new_input(vec![LifecycleAction::DisableAccount]), &ctx("t1"))
            .unwrap();

        assert!(store.claim(record.id).unwrap());
        assert!(store.release(record.id).unwrap());
        assert_eq!(
            store.get(record.id, "t1").unwrap().status,
            ScheduleStatus::Scheduled
        );
        // The record is claimable again; releasing an unclaimed one is a no-op.
        assert!(store.claim(record.id).unwrap());
        assert!(!store.release(Uuid::new_v4()).unwrap());
    }

    #[test]
    fn test_requeue_stale_claims_only() {
        let (_dir, store) = test_store();
        let stale = store
            .create(new_input(vec![LifecycleAction::DisableAccount]), &ctx("t1"))
            .unwrap();
        let fresh = store
            .create(new_input(vec![LifecycleAction::DisableAccount]), &ctx("t1"))
            .unwrap();
        store.claim(stale.id).unwrap();
        store.claim(fresh.id).unwrap();

        // Age the first claim as if its process died half an hour ago.
        let conn = store.pool.get().unwrap();
        conn.execute(
            "UPDATE scheduled_actions SET updated_at = ?1 WHERE id = ?2",
            params![
                (Utc::now() - Duration::minutes(30)).to_rfc3339(),
                stale.id.to_string()
            ],
        )
        .unwrap();

        let requeued = store
            .requeue_stale(Utc::now() - Duration::minutes(10))
            .unwrap();
        assert_eq!(requeued, 1);
        assert_eq!(
            store.get(stale.id, "t1").unwrap().status,
            ScheduleStatus::Scheduled
        );
        assert_eq!(
            store.get(fresh.id, "t1").unwrap().status,
            ScheduleStatus::InProgress
        );
    }

    #[test]
    fn test_finish_writes_log_and_terminal_status() {
        let (_dir, store) = test_store();
        let record = store
            .create(
                new_input(vec![
                    LifecycleAction::DisableAccount,
                    LifecycleAction::RevokeLicenses,
                ]),
                &ctx("t1"),
            )
            .unwrap();
        store.claim(record.id).unwrap();

        let now = Utc::now();
        let log = ExecutionLog::from_results(
            now,
            now,
            vec![
                ActionResult::success(LifecycleAction::DisableAccount, "ok"),
                ActionResult::failed(LifecycleAction::RevokeLicenses, "throttled"),
            ],
        );
        store.finish(record.id, &log).unwrap();

        let finished = store.get(record.id, "t1").unwrap();
        assert_eq!(finished.status, ScheduleStatus::Partial);
        let stored_log = finished.execution_log.unwrap();
        assert_eq!(stored_log.total_actions, 2);
        assert_eq!(stored_log.successful_actions, 1);
        assert_eq!(stored_log.failed_actions, 1);
    }

    #[test]
    fn test_retry_resets_only_status_log_and_schedule() {
        let (_dir, store) = test_store();
        let mut input = new_input(vec![LifecycleAction::DisableAccount]);
        input.notes = Some("leaver case 4411".to_string());
        let record = store.create(input, &ctx("t1")).unwrap();
        store.claim(record.id).unwrap();

        let now = Utc::now();
        let log = ExecutionLog::from_results(
            now,
            now,
            vec![ActionResult::failed(
                LifecycleAction::DisableAccount,
                "api down",
            )],
        );
        store.finish(record.id, &log).unwrap();

        let retried = store.retry(record.id, "t1", None).unwrap();
        assert_eq!(retried.status, ScheduleStatus::Scheduled);
        assert!(retried.execution_log.is_none());
        assert_eq!(retried.notes.as_deref(), Some("leaver case 4411"));
        assert_eq!(retried.created_by, "admin@contoso.test");
        assert_eq!(retried.actions, record.actions);
        assert_eq!(retried.target.id, record.target.id);
    }

    #[test]
    fn test_retry_rejected_for_non_terminal_record() {
        let (_dir, store) = test_store();
        let record = store
            .create(new_input(vec![LifecycleAction::DisableAccount]), &ctx("t1"))
            .unwrap();
        assert!(matches!(
            store.retry(record.id, "t1", None).unwrap_err(),
            EngineError::InvalidState(_)
        ));
    }
}
