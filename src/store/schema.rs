//! Database schema and migrations.

use anyhow::Result;
use rusqlite::Connection;

/// Run all pending migrations.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS scheduled_actions (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            session_id TEXT NOT NULL,
            created_by TEXT NOT NULL,
            target_json TEXT NOT NULL,
            scheduled_at TEXT NOT NULL,
            actions_json TEXT NOT NULL,
            template_id TEXT,
            params_json TEXT NOT NULL DEFAULT '{}',
            status TEXT NOT NULL DEFAULT 'scheduled',
            notes TEXT,
            execution_log_json TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS execution_logs (
            id TEXT PRIMARY KEY,
            scheduled_action_id TEXT NOT NULL,
            tenant_id TEXT NOT NULL,
            target_user_id TEXT NOT NULL,
            target_display_name TEXT NOT NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT NOT NULL,
            total_actions INTEGER NOT NULL,
            successful_actions INTEGER NOT NULL,
            failed_actions INTEGER NOT NULL,
            skipped_actions INTEGER NOT NULL,
            results_json TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (scheduled_action_id) REFERENCES scheduled_actions(id)
        );

        CREATE INDEX IF NOT EXISTS idx_scheduled_actions_tenant
            ON scheduled_actions(tenant_id);
        CREATE INDEX IF NOT EXISTS idx_scheduled_actions_due
            ON scheduled_actions(status, scheduled_at);
        CREATE INDEX IF NOT EXISTS idx_execution_logs_tenant
            ON execution_logs(tenant_id);
        CREATE INDEX IF NOT EXISTS idx_execution_logs_target
            ON execution_logs(tenant_id, target_user_id);",
    )?;

    Ok(())
}
