//! Task models.
//!
//! `TaskInfo` is the structured per-shard task payload. The storage layer
//! persists it as an opaque blob and only lifts a few fields into index
//! columns (owner role, job name, shard id).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Owner of a job: the role it runs as and the user that submitted it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity {
    pub role: String,
    pub user: String,
}

impl Identity {
    #[must_use]
    pub fn new(role: &str, user: &str) -> Self {
        Self {
            role: role.to_string(),
            user: user.to_string(),
        }
    }
}

/// Configuration of a single task (one shard of a job).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    /// Role/user the task runs as
    pub owner: Identity,

    /// Name of the job this task belongs to
    pub job_name: String,

    /// Shard (instance) number within the job
    pub shard_id: i32,

    /// Requested CPU cores
    pub num_cpus: f64,

    /// Requested memory
    pub ram_mb: i64,

    /// Requested disk
    pub disk_mb: i64,

    /// Scheduling priority, higher wins
    #[serde(default)]
    pub priority: i32,

    /// Failures tolerated before the task is abandoned
    #[serde(default = "default_max_task_failures")]
    pub max_task_failures: i32,

    /// Whether the task is restarted when it exits
    #[serde(default)]
    pub is_daemon: bool,

    /// Command line the executor launches
    #[serde(default)]
    pub start_command: String,

    /// Free-form key/value configuration carried with the task
    #[serde(default)]
    pub configuration: BTreeMap<String, String>,
}

const fn default_max_task_failures() -> i32 {
    1
}

impl TaskInfo {
    /// Create a task config with default resources and no extra configuration.
    #[must_use]
    pub fn new(owner: Identity, job_name: &str, shard_id: i32) -> Self {
        Self {
            owner,
            job_name: job_name.to_string(),
            shard_id,
            num_cpus: 1.0,
            ram_mb: 1024,
            disk_mb: 1024,
            priority: 0,
            max_task_failures: default_max_task_failures(),
            is_daemon: false,
            start_command: String::new(),
            configuration: BTreeMap::new(),
        }
    }

    /// Job key of the job this task belongs to.
    #[must_use]
    pub fn job_key(&self) -> String {
        super::job_key(&self.owner.role, &self.job_name)
    }

    /// Check that the config can be stored and read back.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if `num_cpus` is NaN or infinite.
    pub fn validate(&self) -> Result<()> {
        if self.num_cpus.is_finite() {
            return Ok(());
        }
        Err(Error::InvalidArgument(format!(
            "task {} shard {} num_cpus must be finite, got {}",
            self.job_key(),
            self.shard_id,
            self.num_cpus
        )))
    }
}

/// Lifecycle state of a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleStatus {
    Pending,
    Assigned,
    Starting,
    Running,
    Finished,
    Failed,
    Killed,
    Killing,
    Lost,
    Preempting,
    Restarting,
    Updating,
    Rollback,
}

impl ScheduleStatus {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Assigned => "ASSIGNED",
            Self::Starting => "STARTING",
            Self::Running => "RUNNING",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
            Self::Killed => "KILLED",
            Self::Killing => "KILLING",
            Self::Lost => "LOST",
            Self::Preempting => "PREEMPTING",
            Self::Restarting => "RESTARTING",
            Self::Updating => "UPDATING",
            Self::Rollback => "ROLLBACK",
        }
    }
}

impl Default for ScheduleStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl std::fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task bound to (or waiting for) a slot on a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedTask {
    /// Scheduler-unique task id
    pub task_id: String,

    /// Worker the task was placed on, if any
    #[serde(default)]
    pub slave_id: Option<String>,

    /// Host name of that worker
    #[serde(default)]
    pub slave_host: Option<String>,

    /// Named ports allocated on the worker
    #[serde(default)]
    pub assigned_ports: BTreeMap<String, i32>,

    pub task: TaskInfo,
}

/// A status transition recorded on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEvent {
    /// Unix milliseconds
    pub timestamp: i64,
    pub status: ScheduleStatus,
    #[serde(default)]
    pub message: Option<String>,
}

/// A task the scheduler is tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub assigned_task: AssignedTask,
    pub status: ScheduleStatus,
    #[serde(default)]
    pub failure_count: i32,
    /// Task this one replaced after a failure or update
    #[serde(default)]
    pub ancestor_id: Option<String>,
    #[serde(default)]
    pub task_events: Vec<TaskEvent>,
}

impl ScheduledTask {
    /// Create a pending, unassigned task.
    #[must_use]
    pub fn new(task_id: &str, task: TaskInfo) -> Self {
        Self {
            assigned_task: AssignedTask {
                task_id: task_id.to_string(),
                slave_id: None,
                slave_host: None,
                assigned_ports: BTreeMap::new(),
                task,
            },
            status: ScheduleStatus::Pending,
            failure_count: 0,
            ancestor_id: None,
            task_events: Vec::new(),
        }
    }

    #[must_use]
    pub fn task_id(&self) -> &str {
        &self.assigned_task.task_id
    }

    #[must_use]
    pub fn task(&self) -> &TaskInfo {
        &self.assigned_task.task
    }
}
