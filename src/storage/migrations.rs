//! In-place schema migrations.
//!
//! Each migration detects whether it is needed by introspecting the live
//! schema rather than trusting the `schema_migrations` ledger, so a database
//! file restored from an older build is still upgraded. The ledger records
//! when each migration last ran.

use rusqlite::Connection;
use tracing::{info, warn};

use crate::error::{Error, Result};

use super::schema::{is_legacy_update_schema, UPDATE_STORE_INDEX, UPDATE_STORE_TABLE};

/// Ledger of applied migrations.
const LEDGER_SQL: &str = r"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
";

/// A single migration with version identifier, detection and upgrade steps.
struct Migration {
    version: &'static str,
    needed: fn(&Connection) -> Result<bool>,
    sql: &'static str,
}

/// Widens the update table's `config` column from `BINARY(n)` to `BLOB`.
///
/// Rows are copied verbatim, so every (job_key, update_token, shard_id,
/// config) tuple survives byte-for-byte.
const WIDEN_UPDATE_STORE_CONFIG: &str = r"
CREATE TABLE update_store_new (
    job_key TEXT NOT NULL,
    update_token TEXT NOT NULL,
    shard_id INTEGER NOT NULL,
    config BLOB NOT NULL
);

INSERT INTO update_store_new (job_key, update_token, shard_id, config)
    SELECT job_key, update_token, shard_id, config FROM update_store;

DROP INDEX IF EXISTS update_store_job_key_shard_id_idx;
DROP TABLE update_store;
ALTER TABLE update_store_new RENAME TO update_store;

CREATE INDEX IF NOT EXISTS update_store_job_key_shard_id_idx ON update_store(job_key, shard_id);
";

/// All migrations in order.
const MIGRATIONS: &[Migration] = &[Migration {
    version: "001_widen_update_store_config",
    needed: is_legacy_update_schema,
    sql: WIDEN_UPDATE_STORE_CONFIG,
}];

/// Run all needed migrations on the database.
///
/// Each migration runs in its own transaction. Idempotent and safe to call
/// on every database open.
///
/// # Errors
///
/// Returns `Error::SchemaUpgrade` if a migration fails to apply; the
/// database is left on its previous schema.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(LEDGER_SQL)?;

    for migration in MIGRATIONS {
        if !(migration.needed)(conn)? {
            continue;
        }

        info!(version = migration.version, "Applying migration");
        apply(conn, migration).map_err(|source| {
            warn!(version = migration.version, error = %source, "Migration failed");
            Error::SchemaUpgrade {
                migration: migration.version.to_string(),
                source,
            }
        })?;
        info!(version = migration.version, "Migration complete");
    }

    Ok(())
}

fn apply(conn: &Connection, migration: &Migration) -> rusqlite::Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(migration.sql)?;
    tx.execute(
        "INSERT OR REPLACE INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
        rusqlite::params![migration.version, chrono::Utc::now().timestamp_millis()],
    )?;
    tx.commit()
}

/// Upgrade the update table if it still has the legacy layout.
///
/// No-op when the schema is already current.
///
/// # Errors
///
/// Returns `Error::SchemaUpgrade` if the copy-and-swap fails.
pub fn upgrade_update_schema_if_needed(conn: &Connection) -> Result<bool> {
    if !is_legacy_update_schema(conn)? {
        return Ok(false);
    }
    warn!(
        table = UPDATE_STORE_TABLE,
        index = UPDATE_STORE_INDEX,
        "Legacy update table layout detected"
    );
    run_migrations(conn)?;
    Ok(true)
}
