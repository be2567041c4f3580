//! Job configuration model.

use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::task::{Identity, TaskInfo};

/// Build the scheduler-unique key for a job.
///
/// Job keys are unique across managers, so the key alone identifies a row
/// in the job store.
#[must_use]
pub fn job_key(role: &str, job_name: &str) -> String {
    format!("{role}/{job_name}")
}

/// What to do when a cron run fires while the previous run is still active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CronCollisionPolicy {
    KillExisting,
    CancelNew,
    RunOverlap,
}

impl Default for CronCollisionPolicy {
    fn default() -> Self {
        Self::KillExisting
    }
}

/// An accepted job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfiguration {
    pub owner: Identity,

    pub name: String,

    /// Cron expression for scheduled jobs
    #[serde(default)]
    pub cron_schedule: Option<String>,

    #[serde(default)]
    pub cron_collision_policy: CronCollisionPolicy,

    /// Per-shard task templates
    #[serde(default)]
    pub task_configs: Vec<TaskInfo>,
}

impl JobConfiguration {
    /// Create a job with no task templates.
    #[must_use]
    pub fn new(owner: Identity, name: &str) -> Self {
        Self {
            owner,
            name: name.to_string(),
            cron_schedule: None,
            cron_collision_policy: CronCollisionPolicy::default(),
            task_configs: Vec::new(),
        }
    }

    #[must_use]
    pub fn job_key(&self) -> String {
        job_key(&self.owner.role, &self.name)
    }

    /// Check every task template with [`TaskInfo::validate`].
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if a template cannot be stored.
    pub fn validate(&self) -> Result<()> {
        self.task_configs.iter().try_for_each(TaskInfo::validate)
    }
}
