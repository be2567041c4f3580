//! Task query filters.
//!
//! A `Query` is an opaque predicate handed to the task store. Every field
//! that is set narrows the match; unset fields match anything.

use std::collections::BTreeSet;

use crate::model::ScheduleStatus;

/// Filter over scheduled tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub task_ids: Option<BTreeSet<String>>,
    pub role: Option<String>,
    pub job_name: Option<String>,
    pub statuses: Option<BTreeSet<ScheduleStatus>>,
    pub shard_ids: Option<BTreeSet<i32>>,
    pub slave_host: Option<String>,
}

impl Query {
    /// Matches every task.
    pub const GET_ALL: Self = Self {
        task_ids: None,
        role: None,
        job_name: None,
        statuses: None,
        shard_ids: None,
        slave_host: None,
    };

    /// Tasks with any of the given ids.
    #[must_use]
    pub fn by_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            task_ids: Some(ids.into_iter().map(Into::into).collect()),
            ..Self::GET_ALL
        }
    }

    #[must_use]
    pub fn by_id(task_id: &str) -> Self {
        Self::by_ids([task_id])
    }

    /// Tasks of every job owned by `role`.
    #[must_use]
    pub fn by_role(role: &str) -> Self {
        Self {
            role: Some(role.to_string()),
            ..Self::GET_ALL
        }
    }

    /// Tasks of one job.
    #[must_use]
    pub fn by_job(role: &str, job_name: &str) -> Self {
        Self {
            role: Some(role.to_string()),
            job_name: Some(job_name.to_string()),
            ..Self::GET_ALL
        }
    }

    /// Narrow to tasks in any of the given statuses.
    #[must_use]
    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = ScheduleStatus>) -> Self {
        self.statuses = Some(statuses.into_iter().collect());
        self
    }

    /// Narrow to the given shards.
    #[must_use]
    pub fn with_shards(mut self, shard_ids: impl IntoIterator<Item = i32>) -> Self {
        self.shard_ids = Some(shard_ids.into_iter().collect());
        self
    }

    /// Narrow to tasks placed on `host`.
    #[must_use]
    pub fn on_host(mut self, host: &str) -> Self {
        self.slave_host = Some(host.to_string());
        self
    }
}
