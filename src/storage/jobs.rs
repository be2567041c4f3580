//! Job-configuration store.
//!
//! Jobs are keyed by job key (`role/name`), which is unique across
//! managers; the manager id is kept alongside so each manager (cron,
//! immediate, ...) can list its own jobs.

use std::collections::BTreeSet;

use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::error::Result;
use crate::model::JobConfiguration;

use super::keyed::{decode, encode};

/// Store for accepted job configurations.
pub struct JobStore<'a> {
    conn: &'a Connection,
}

impl<'a> JobStore<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Save a job under `manager_id`, replacing any job with the same key.
    ///
    /// A replaced job keeps its position in [`fetch_all`](Self::fetch_all).
    /// Job keys are unique across managers, so saving a job already held by
    /// another manager moves it to `manager_id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if a task template has a non-finite
    /// resource value, or an error if the write fails.
    pub fn save(&self, manager_id: &str, job: &JobConfiguration) -> Result<()> {
        job.validate()?;
        let job_key = job.job_key();
        debug!(manager_id, job_key = %job_key, "Saving job");
        self.conn
            .prepare_cached(
                "INSERT INTO job_configs (job_key, manager_id, config) VALUES (?1, ?2, ?3)
                 ON CONFLICT(job_key) DO UPDATE SET
                   manager_id = excluded.manager_id,
                   config = excluded.config",
            )?
            .execute(rusqlite::params![job_key, manager_id, encode(job)?])?;
        Ok(())
    }

    /// All jobs accepted by `manager_id`, in insertion order.
    ///
    /// An unknown manager yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub fn fetch_all(&self, manager_id: &str) -> Result<Vec<JobConfiguration>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT config FROM job_configs WHERE manager_id = ?1 ORDER BY rowid",
        )?;
        let blobs = stmt
            .query_map([manager_id], |row| row.get::<_, Vec<u8>>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        blobs.iter().map(|bytes| decode(bytes)).collect()
    }

    /// The job with `job_key` if it was accepted by `manager_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub fn fetch(&self, manager_id: &str, job_key: &str) -> Result<Option<JobConfiguration>> {
        let bytes: Option<Vec<u8>> = self
            .conn
            .prepare_cached("SELECT config FROM job_configs WHERE manager_id = ?1 AND job_key = ?2")?
            .query_row([manager_id, job_key], |row| row.get(0))
            .optional()?;
        bytes.as_deref().map(decode::<JobConfiguration>).transpose()
    }

    /// Remove a job regardless of which manager accepted it.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn remove(&self, job_key: &str) -> Result<bool> {
        debug!(job_key, "Removing job");
        let removed = self
            .conn
            .prepare_cached("DELETE FROM job_configs WHERE job_key = ?1")?
            .execute([job_key])?;
        Ok(removed > 0)
    }

    /// Managers that currently own at least one job.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub fn fetch_manager_ids(&self) -> Result<BTreeSet<String>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT DISTINCT manager_id FROM job_configs")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<BTreeSet<String>, _>>()?;
        Ok(ids)
    }

    /// Every (manager id, job) pair in insertion order.
    pub(crate) fn fetch_all_entries(&self) -> Result<Vec<(String, JobConfiguration)>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT manager_id, config FROM job_configs ORDER BY rowid")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(manager_id, bytes)| Ok((manager_id, decode(&bytes)?)))
            .collect()
    }

    pub(crate) fn clear(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM job_configs", [])?)
    }
}
