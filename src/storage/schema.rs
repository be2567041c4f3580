//! Database schema definitions and legacy layout detection.
//!
//! Every table holds one row per logical key with a single blob column for
//! structured payloads; only the columns needed for lookups and task queries
//! are modeled relationally.

use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::error::Result;

/// Name of the rolling-update table.
pub const UPDATE_STORE_TABLE: &str = "update_store";

/// Lookup index on the rolling-update table.
pub const UPDATE_STORE_INDEX: &str = "update_store_job_key_shard_id_idx";

/// The complete SQL schema for the scheduler database.
///
/// Every statement is create-if-not-exists so this can run on each startup.
pub const SCHEMA_SQL: &str = r#"
-- ====================
-- Stores
-- ====================

-- Singleton scheduler values (framework id)
CREATE TABLE IF NOT EXISTS scheduler_state (
    key TEXT PRIMARY KEY,
    value BLOB NOT NULL
);

-- Accepted jobs; job keys are unique across managers
CREATE TABLE IF NOT EXISTS job_configs (
    job_key TEXT PRIMARY KEY,
    manager_id TEXT NOT NULL,
    config BLOB NOT NULL
);

CREATE INDEX IF NOT EXISTS job_configs_manager_id_idx ON job_configs(manager_id);

-- Per-role quotas
CREATE TABLE IF NOT EXISTS quotas (
    role TEXT PRIMARY KEY,
    quota BLOB NOT NULL
);

-- Scheduled tasks, with the columns task queries filter on
CREATE TABLE IF NOT EXISTS tasks (
    task_id TEXT PRIMARY KEY,
    job_key TEXT NOT NULL,
    job_role TEXT NOT NULL,
    job_name TEXT NOT NULL,
    shard_id INTEGER NOT NULL,
    status TEXT NOT NULL,
    slave_host TEXT,
    task BLOB NOT NULL
);

CREATE INDEX IF NOT EXISTS tasks_job_key_idx ON tasks(job_key);
CREATE INDEX IF NOT EXISTS tasks_job_role_idx ON tasks(job_role);
CREATE INDEX IF NOT EXISTS tasks_status_idx ON tasks(status);
CREATE INDEX IF NOT EXISTS tasks_slave_host_idx ON tasks(slave_host);

-- In-flight rolling updates, one row per shard
CREATE TABLE IF NOT EXISTS update_store (
    job_key TEXT NOT NULL,
    update_token TEXT NOT NULL,
    shard_id INTEGER NOT NULL,
    config BLOB NOT NULL
);

CREATE INDEX IF NOT EXISTS update_store_job_key_shard_id_idx ON update_store(job_key, shard_id);
"#;

/// Apply the schema to the database.
///
/// Sets connection pragmas, runs the create-if-not-exists DDL, then runs
/// pending migrations (which upgrade any legacy layouts in place).
///
/// # Errors
///
/// Returns an error if the DDL fails, or `Error::SchemaUpgrade` if a
/// migration cannot be applied.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;

    conn.execute_batch(SCHEMA_SQL)?;
    debug!("Schema applied");

    super::migrations::run_migrations(conn)
}

/// Declared type of a column, or `None` if the table or column is missing.
pub(crate) fn column_type(conn: &Connection, table: &str, column: &str) -> Result<Option<String>> {
    let sql = format!("SELECT type FROM pragma_table_info('{table}') WHERE name = ?1");
    let declared = conn
        .query_row(&sql, [column], |row| row.get::<_, String>(0))
        .optional()?;
    Ok(declared)
}

/// Whether the update table predates the config column widening.
///
/// The legacy layout declared `config` as a fixed-width `BINARY(n)`, which
/// truncated large serialized shard configs. The current layout declares it
/// `BLOB`.
///
/// # Errors
///
/// Returns an error if the table metadata cannot be read.
pub fn is_legacy_update_schema(conn: &Connection) -> Result<bool> {
    Ok(column_type(conn, UPDATE_STORE_TABLE, "config")?
        .is_some_and(|declared| !declared.eq_ignore_ascii_case("BLOB")))
}
