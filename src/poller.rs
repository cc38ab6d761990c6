//! Background poller / dispatcher.
//!
//! A single periodic task finds due records across all tenants, claims each
//! one with the store's compare-and-set, and hands it to the execution
//! engine. Records are processed concurrently with each other but strictly
//! sequentially within themselves. One record's failure never stalls the
//! tick for other tenants: every per-record error is logged and swallowed.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::auth::TokenProvider;
use crate::engine::{record_level_failure_log, ExecutionEngine};
use crate::error::EngineResult;
use crate::model::ScheduledAction;
use crate::store::{ExecutionLogStore, ScheduledActionStore};

/// Shared dispatch path for the poller and the execute-now API route. Both
/// go through the same claim + execute + persist sequence, so retry and
/// manual execution need no special-case logic.
#[derive(Clone)]
pub struct Dispatcher {
    store: ScheduledActionStore,
    audit: ExecutionLogStore,
    engine: ExecutionEngine,
    tokens: Arc<dyn TokenProvider>,
}

impl Dispatcher {
    pub fn new(
        store: ScheduledActionStore,
        audit: ExecutionLogStore,
        engine: ExecutionEngine,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            store,
            audit,
            engine,
            tokens,
        }
    }

    /// Claim and run one record to its terminal state. Returns `false` when
    /// a concurrent tick or execute-now call already claimed it.
    pub async fn dispatch(&self, record: &ScheduledAction) -> EngineResult<bool> {
        if !self.store.claim(record.id)? {
            info!(record_id = %record.id, "record already claimed, skipping");
            return Ok(false);
        }

        let log = match self.tokens.access_token(&record.tenant_id).await {
            Ok(token) => self.engine.execute(record, &token).await,
            Err(e) => {
                // Record-level failure: terminal `failed` with the token
                // error on every action, never a tick crash.
                warn!(record_id = %record.id, tenant_id = %record.tenant_id, error = %e, "token acquisition failed");
                record_level_failure_log(
                    &record.actions,
                    &format!("access token acquisition failed: {e}"),
                )
            }
        };

        if let Err(e) = self.store.finish(record.id, &log) {
            // The outcome could not be persisted; put the claim back so the
            // record is not stranded in-progress.
            error!(record_id = %record.id, tenant_id = %record.tenant_id, error = %e, "failed to persist run outcome, releasing claim");
            if let Err(release_err) = self.store.release(record.id) {
                error!(record_id = %record.id, error = %release_err, "failed to release claim");
            }
            return Err(e);
        }
        self.audit.append(record, &log)?;
        info!(
            record_id = %record.id,
            tenant_id = %record.tenant_id,
            status = %log.terminal_status(),
            successful = log.successful_actions,
            failed = log.failed_actions,
            skipped = log.skipped_actions,
            "run finished"
        );
        Ok(true)
    }
}

pub struct Poller {
    dispatcher: Dispatcher,
    tick_interval: Duration,
    stale_claim: Duration,
}

impl Poller {
    pub fn new(dispatcher: Dispatcher, tick_interval: Duration, stale_claim: Duration) -> Self {
        Self {
            dispatcher,
            tick_interval,
            stale_claim,
        }
    }

    /// Main loop: one tick per interval, forever.
    pub async fn run(self) {
        info!(interval_sec = self.tick_interval.as_secs(), "poller started");
        let mut interval = tokio::time::interval(self.tick_interval);
        loop {
            interval.tick().await;
            self.tick().await;
        }
    }

    /// One poll cycle: return abandoned claims to the queue, then find all
    /// due records and dispatch each on its own task. Waits for every
    /// dispatch so overlapping work stays bounded.
    pub async fn tick(&self) {
        let cutoff = Utc::now() - chrono::Duration::seconds(self.stale_claim.as_secs() as i64);
        match self.dispatcher.store.requeue_stale(cutoff) {
            Ok(0) => {}
            Ok(n) => warn!(count = n, "re-queued stale in-progress records"),
            Err(e) => error!(error = %e, "failed to re-queue stale records"),
        }

        let due = match self.dispatcher.store.list_due(Utc::now()) {
            Ok(due) => due,
            Err(e) => {
                error!(error = %e, "failed to list due records");
                return;
            }
        };
        if due.is_empty() {
            return;
        }
        info!(count = due.len(), "dispatching due records");

        let mut tasks = JoinSet::new();
        for record in due {
            let dispatcher = self.dispatcher.clone();
            tasks.spawn(async move {
                if let Err(e) = dispatcher.dispatch(&record).await {
                    error!(record_id = %record.id, tenant_id = %record.tenant_id, error = %e, "dispatch failed");
                }
            });
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "dispatch task panicked");
            }
        }
    }
}
