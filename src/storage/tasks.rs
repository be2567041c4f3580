//! Task store.
//!
//! Tasks are stored as blobs keyed by task id, with the fields a [`Query`]
//! can filter on lifted into indexed columns.

use std::collections::BTreeSet;

use rusqlite::types::Value;
use rusqlite::Connection;
use tracing::debug;

use crate::error::Result;
use crate::model::ScheduledTask;
use crate::query::Query;

use super::keyed::{decode, encode};

/// Store for scheduled tasks.
pub struct TaskStore<'a> {
    conn: &'a Connection,
}

/// Render `column IN (...)` over a set bound as one JSON array parameter,
/// so the set size is not limited by SQLite's variable count.
/// An empty set matches nothing.
fn in_clause(column: &str, values: Vec<serde_json::Value>, params: &mut Vec<Value>) -> Result<String> {
    if values.is_empty() {
        return Ok("0".to_string());
    }
    params.push(Value::Text(serde_json::to_string(&values)?));
    Ok(format!("{column} IN (SELECT value FROM json_each(?))"))
}

/// Build the WHERE clause and parameters for a query.
fn where_clause(query: &Query) -> Result<(String, Vec<Value>)> {
    let mut conditions: Vec<String> = Vec::new();
    let mut params: Vec<Value> = Vec::new();

    if let Some(ids) = &query.task_ids {
        let values: Vec<serde_json::Value> = ids.iter().map(|id| id.as_str().into()).collect();
        conditions.push(in_clause("task_id", values, &mut params)?);
    }

    if let Some(role) = &query.role {
        conditions.push("job_role = ?".to_string());
        params.push(Value::Text(role.clone()));
    }

    if let Some(job_name) = &query.job_name {
        conditions.push("job_name = ?".to_string());
        params.push(Value::Text(job_name.clone()));
    }

    if let Some(statuses) = &query.statuses {
        let values: Vec<serde_json::Value> = statuses
            .iter()
            .map(|status| status.as_str().into())
            .collect();
        conditions.push(in_clause("status", values, &mut params)?);
    }

    if let Some(shard_ids) = &query.shard_ids {
        let values: Vec<serde_json::Value> = shard_ids.iter().map(|&id| id.into()).collect();
        conditions.push(in_clause("shard_id", values, &mut params)?);
    }

    if let Some(host) = &query.slave_host {
        conditions.push("slave_host = ?".to_string());
        params.push(Value::Text(host.clone()));
    }

    let clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };
    Ok((clause, params))
}

impl<'a> TaskStore<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Save tasks, replacing any stored task with the same id.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if a task has a non-finite resource
    /// value, or an error if any write fails; the enclosing unit of work is
    /// then rolled back as a whole.
    pub fn save(&self, tasks: &[ScheduledTask]) -> Result<()> {
        for task in tasks {
            task.task().validate()?;
        }

        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO tasks (task_id, job_key, job_role, job_name, shard_id, status, slave_host, task)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(task_id) DO UPDATE SET
               job_key = excluded.job_key,
               job_role = excluded.job_role,
               job_name = excluded.job_name,
               shard_id = excluded.shard_id,
               status = excluded.status,
               slave_host = excluded.slave_host,
               task = excluded.task",
        )?;

        for task in tasks {
            let info = task.task();
            stmt.execute(rusqlite::params![
                task.task_id(),
                info.job_key(),
                info.owner.role,
                info.job_name,
                info.shard_id,
                task.status.as_str(),
                task.assigned_task.slave_host,
                encode(task)?,
            ])?;
        }

        debug!(count = tasks.len(), "Saved tasks");
        Ok(())
    }

    /// Ids of the tasks matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub fn fetch_ids(&self, query: &Query) -> Result<BTreeSet<String>> {
        let (clause, params) = where_clause(query)?;
        let sql = format!("SELECT task_id FROM tasks{clause}");
        let mut stmt = self.conn.prepare(&sql)?;
        let ids = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| row.get(0))?
            .collect::<std::result::Result<BTreeSet<String>, _>>()?;
        Ok(ids)
    }

    /// Tasks matching `query`, ordered by task id.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or a stored task cannot be decoded.
    pub fn fetch(&self, query: &Query) -> Result<Vec<ScheduledTask>> {
        let (clause, params) = where_clause(query)?;
        let sql = format!("SELECT task FROM tasks{clause} ORDER BY task_id");
        let mut stmt = self.conn.prepare(&sql)?;
        let blobs = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                row.get::<_, Vec<u8>>(0)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        blobs.iter().map(|bytes| decode(bytes)).collect()
    }

    /// Remove every task matching `query`, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn remove(&self, query: &Query) -> Result<usize> {
        let (clause, params) = where_clause(query)?;
        let sql = format!("DELETE FROM tasks{clause}");
        let removed = self
            .conn
            .execute(&sql, rusqlite::params_from_iter(params.iter()))?;
        debug!(removed, "Removed tasks");
        Ok(removed)
    }

    /// Remove the tasks with the given ids, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn remove_ids(&self, task_ids: &BTreeSet<String>) -> Result<usize> {
        self.remove(&Query::by_ids(task_ids.iter().cloned()))
    }

    /// Number of stored tasks.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub fn size(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}
