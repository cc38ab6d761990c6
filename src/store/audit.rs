//! Append-only audit record of every run.
//!
//! One row per finished execution, kept independently of the scheduled-action
//! record so the audit trail survives record retries (which clear the
//! embedded log) and is queryable per tenant and per target user.

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::model::{ActionResult, ExecutionLog, ScheduledAction};
use crate::store::Pool;

/// A persisted audit entry for one run.
#[derive(Debug, Clone, Serialize)]
pub struct AuditedRun {
    pub id: Uuid,
    pub scheduled_action_id: Uuid,
    pub tenant_id: String,
    pub target_user_id: String,
    pub target_display_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_actions: usize,
    pub successful_actions: usize,
    pub failed_actions: usize,
    pub skipped_actions: usize,
    pub action_results: Vec<ActionResult>,
}

#[derive(Clone)]
pub struct ExecutionLogStore {
    pool: Pool,
}

impl ExecutionLogStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Append a copy of a finished run. Never updated or deleted afterwards.
    pub fn append(&self, record: &ScheduledAction, log: &ExecutionLog) -> EngineResult<Uuid> {
        let id = Uuid::new_v4();
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO execution_logs (id, scheduled_action_id, tenant_id, target_user_id, \
             target_display_name, started_at, finished_at, total_actions, successful_actions, \
             failed_actions, skipped_actions, results_json) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                id.to_string(),
                record.id.to_string(),
                record.tenant_id,
                record.target.id,
                record.target.display_name,
                log.started_at.to_rfc3339(),
                log.finished_at.to_rfc3339(),
                log.total_actions as i64,
                log.successful_actions as i64,
                log.failed_actions as i64,
                log.skipped_actions as i64,
                serde_json::to_string(&log.action_results)?,
            ],
        )?;
        Ok(id)
    }

    /// Runs for a tenant, optionally narrowed to one target user, newest
    /// first.
    pub fn list(
        &self,
        tenant_id: &str,
        target_user_id: Option<&str>,
        limit: usize,
    ) -> EngineResult<Vec<AuditedRun>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, scheduled_action_id, tenant_id, target_user_id, target_display_name, \
             started_at, finished_at, total_actions, successful_actions, failed_actions, \
             skipped_actions, results_json \
             FROM execution_logs \
             WHERE tenant_id = ?1 AND (?2 IS NULL OR target_user_id = ?2) \
             ORDER BY finished_at DESC LIMIT ?3",
        )?;

        let rows = stmt.query_map(
            params![tenant_id, target_user_id, limit as i64],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, i64>(7)?,
                    row.get::<_, i64>(8)?,
                    row.get::<_, i64>(9)?,
                    row.get::<_, i64>(10)?,
                    row.get::<_, String>(11)?,
                ))
            },
        )?;

        let mut runs = Vec::new();
        for r in rows {
            let (
                id,
                scheduled_action_id,
                tenant_id,
                target_user_id,
                target_display_name,
                started_at,
                finished_at,
                total,
                successful,
                failed,
                skipped,
                results_json,
            ) = r?;
            runs.push(AuditedRun {
                id: Uuid::parse_str(&id)
                    .map_err(|e| EngineError::Storage(format!("bad audit id: {e}")))?,
                scheduled_action_id: Uuid::parse_str(&scheduled_action_id)
                    .map_err(|e| EngineError::Storage(format!("bad record id: {e}")))?,
                tenant_id,
                target_user_id,
                target_display_name,
                started_at: DateTime::parse_from_rfc3339(&started_at)
                    .map_err(|e| EngineError::Storage(e.to_string()))?
                    .with_timezone(&Utc),
                finished_at: DateTime::parse_from_rfc3339(&finished_at)
                    .map_err(|e| EngineError::Storage(e.to_string()))?
                    .with_timezone(&Utc),
                total_actions: total as usize,
                successful_actions: successful as usize,
                failed_actions: failed as usize,
                skipped_actions: skipped as usize,
                action_results: serde_json::from_str(&results_json)?,
            });
        }
        Ok(runs)
    }
}
