//! Execution engine: runs one record's actions sequentially, in the
//! canonical safety order, capturing a per-action outcome. A single failure
//! never aborts the run; later actions still get their chance, and the log's
//! counts decide the record's terminal status.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::auth::AccessToken;
use crate::directory::actions::{run_action, ActionOutcome};
use crate::directory::DirectoryGateway;
use crate::model::{ActionResult, ExecutionLog, LifecycleAction, ScheduledAction};

/// Return the record's actions sorted into the canonical safety order,
/// regardless of submission order. Ranks are unique, so the result is
/// deterministic.
pub fn sort_for_safety(actions: &[LifecycleAction]) -> Vec<LifecycleAction> {
    let mut ordered = actions.to_vec();
    ordered.sort_by_key(|a| a.safety_rank());
    ordered
}

/// Build the log for a run that could not start at all (token acquisition
/// failure): every selected action is recorded as failed with the same
/// record-level error, keeping the count invariant for terminal records.
pub fn record_level_failure_log(actions: &[LifecycleAction], error: &str) -> ExecutionLog {
    let now = Utc::now();
    let results = sort_for_safety(actions)
        .into_iter()
        .map(|a| ActionResult::failed(a, error))
        .collect();
    ExecutionLog::from_results(now, now, results)
}

#[derive(Clone)]
pub struct ExecutionEngine {
    gateway: Arc<dyn DirectoryGateway>,
}

impl ExecutionEngine {
    pub fn new(gateway: Arc<dyn DirectoryGateway>) -> Self {
        Self { gateway }
    }

    /// Run every action of `record` against the directory, strictly
    /// sequentially (later actions may depend on earlier ones, and the
    /// directory API is rate-limited per tenant).
    pub async fn execute(&self, record: &ScheduledAction, token: &AccessToken) -> ExecutionLog {
        let started_at = Utc::now();
        let ordered = sort_for_safety(&record.actions);
        let mut results = Vec::with_capacity(ordered.len());

        for action in ordered {
            let outcome = run_action(
                action,
                self.gateway.as_ref(),
                &record.target,
                &record.params,
                token,
            )
            .await;

            let result = match outcome {
                Ok(ActionOutcome::Success(detail)) => {
                    info!(record_id = %record.id, tenant_id = %record.tenant_id, %action, %detail, "action succeeded");
                    ActionResult::success(action, detail)
                }
                Ok(ActionOutcome::Skipped(reason)) => {
                    info!(record_id = %record.id, tenant_id = %record.tenant_id, %action, %reason, "action skipped");
                    ActionResult::skipped(action, reason)
                }
                Err(e) => {
                    warn!(record_id = %record.id, tenant_id = %record.tenant_id, %action, error = %e, "action failed, continuing");
                    ActionResult::failed(action, e.to_string())
                }
            };
            results.push(result);
        }

        ExecutionLog::from_results(started_at, Utc::now(), results)
    }
}
