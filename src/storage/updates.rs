//! Job-update-configuration store.
//!
//! Each in-flight update is stored as one `update_store` row per shard,
//! keyed by job key. An update with no shard changes is kept as a single
//! token-only row so the record survives a round trip.

use rusqlite::Connection;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{job_key, JobUpdateConfiguration, TaskUpdateConfiguration};

use super::keyed::{decode, encode};

/// Shard id of the placeholder row for an update with no shard changes.
const TOKEN_ONLY_SHARD: i32 = -1;

/// One `update_store` row.
struct UpdateRow {
    job_key: String,
    update_token: String,
    shard_id: i32,
    config: Vec<u8>,
}

fn map_update_row(row: &rusqlite::Row) -> rusqlite::Result<UpdateRow> {
    Ok(UpdateRow {
        job_key: row.get(0)?,
        update_token: row.get(1)?,
        shard_id: row.get(2)?,
        config: row.get(3)?,
    })
}

/// Fold rows ordered by (job key, shard id) into update records.
fn group_rows(rows: Vec<UpdateRow>) -> Result<Vec<JobUpdateConfiguration>> {
    let mut grouped: Vec<(String, String, Vec<TaskUpdateConfiguration>)> = Vec::new();

    for row in rows {
        if grouped.last().map(|(key, _, _)| key.as_str()) != Some(row.job_key.as_str()) {
            grouped.push((row.job_key.clone(), row.update_token.clone(), Vec::new()));
        }
        if row.shard_id == TOKEN_ONLY_SHARD {
            continue;
        }
        let config: TaskUpdateConfiguration = decode(&row.config)?;
        if let Some((_, _, configs)) = grouped.last_mut() {
            configs.push(config);
        }
    }

    grouped
        .into_iter()
        .map(|(key, token, configs)| {
            let (role, job) = key.split_once('/').ok_or_else(|| {
                Error::InvalidUpdate(format!("malformed job key in update store: {key}"))
            })?;
            Ok(JobUpdateConfiguration::new(role, job, &token, configs))
        })
        .collect()
}

/// Store for in-flight rolling-update configurations.
pub struct UpdateStore<'a> {
    conn: &'a Connection,
}

impl<'a> UpdateStore<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn query(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<UpdateRow>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map(params, map_update_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Save an update, replacing the job's previous update and all of its
    /// shard configs.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if the role contains `/` or a shard
    /// config has a non-finite resource value, or an error if the write fails.
    pub fn save(&self, update: &JobUpdateConfiguration) -> Result<()> {
        if update.role.contains('/') {
            return Err(Error::InvalidArgument(format!(
                "role may not contain '/': {}",
                update.role
            )));
        }
        update.validate()?;

        let job_key = update.job_key();
        self.conn
            .prepare_cached("DELETE FROM update_store WHERE job_key = ?1")?
            .execute([&job_key])?;

        let mut insert = self.conn.prepare_cached(
            "INSERT INTO update_store (job_key, update_token, shard_id, config) VALUES (?1, ?2, ?3, ?4)",
        )?;
        if update.configs().is_empty() {
            insert.execute(rusqlite::params![
                job_key,
                update.update_token,
                TOKEN_ONLY_SHARD,
                Vec::<u8>::new()
            ])?;
        }
        for config in update.configs() {
            insert.execute(rusqlite::params![
                job_key,
                update.update_token,
                config.shard_id(),
                encode(config)?
            ])?;
        }

        debug!(job_key = %job_key, shards = update.configs().len(), "Saved job update");
        Ok(())
    }

    /// The in-flight update for a job, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or a stored config cannot be decoded.
    pub fn fetch(&self, role: &str, job: &str) -> Result<Option<JobUpdateConfiguration>> {
        let rows = self.query(
            "SELECT job_key, update_token, shard_id, config FROM update_store
             WHERE job_key = ?1 ORDER BY shard_id, rowid",
            [job_key(role, job)],
        )?;
        Ok(group_rows(rows)?.into_iter().next())
    }

    /// In-flight updates for every job owned by `role`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or a stored config cannot be decoded.
    pub fn fetch_all_for_role(&self, role: &str) -> Result<Vec<JobUpdateConfiguration>> {
        let rows = self.query(
            "SELECT job_key, update_token, shard_id, config FROM update_store
             WHERE substr(job_key, 1, length(?1) + 1) = ?1 || '/'
             ORDER BY job_key, shard_id, rowid",
            [role],
        )?;
        group_rows(rows)
    }

    /// Every in-flight update, ordered by job key.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or a stored config cannot be decoded.
    pub fn fetch_all(&self) -> Result<Vec<JobUpdateConfiguration>> {
        let rows = self.query(
            "SELECT job_key, update_token, shard_id, config FROM update_store
             ORDER BY job_key, shard_id, rowid",
            rusqlite::params![],
        )?;
        group_rows(rows)
    }

    /// Remove the update for a job. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn remove(&self, role: &str, job: &str) -> Result<bool> {
        let removed = self
            .conn
            .prepare_cached("DELETE FROM update_store WHERE job_key = ?1")?
            .execute([job_key(role, job)])?;
        Ok(removed > 0)
    }

    pub(crate) fn clear(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM update_store", [])?)
    }
}
