//! Rolling-update configuration models.
//!
//! An in-flight update is recorded per job as a token plus one
//! `TaskUpdateConfiguration` per affected shard. A shard being added has no
//! old config, a shard being removed has no new config, and a record with
//! neither is rejected.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::task::TaskInfo;

/// Old/new task configuration pair for one shard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConfigPair")]
pub struct TaskUpdateConfiguration {
    old_config: Option<TaskInfo>,
    new_config: Option<TaskInfo>,
}

#[derive(Deserialize)]
struct ConfigPair {
    #[serde(default)]
    old_config: Option<TaskInfo>,
    #[serde(default)]
    new_config: Option<TaskInfo>,
}

impl TryFrom<ConfigPair> for TaskUpdateConfiguration {
    type Error = Error;

    fn try_from(pair: ConfigPair) -> Result<Self> {
        Self::new(pair.old_config, pair.new_config)
    }
}

impl TaskUpdateConfiguration {
    /// Pair an old and new config.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUpdate` if both configs are absent.
    pub fn new(old_config: Option<TaskInfo>, new_config: Option<TaskInfo>) -> Result<Self> {
        if old_config.is_none() && new_config.is_none() {
            return Err(Error::InvalidUpdate(
                "shard update has neither an old nor a new config".to_string(),
            ));
        }
        Ok(Self {
            old_config,
            new_config,
        })
    }

    /// Update that replaces `old` with `new` on an existing shard.
    #[must_use]
    pub fn modify(old: TaskInfo, new: TaskInfo) -> Self {
        Self {
            old_config: Some(old),
            new_config: Some(new),
        }
    }

    /// Update that introduces a new shard.
    #[must_use]
    pub fn add(new: TaskInfo) -> Self {
        Self {
            old_config: None,
            new_config: Some(new),
        }
    }

    /// Update that removes an existing shard.
    #[must_use]
    pub fn remove(old: TaskInfo) -> Self {
        Self {
            old_config: Some(old),
            new_config: None,
        }
    }

    #[must_use]
    pub fn old_config(&self) -> Option<&TaskInfo> {
        self.old_config.as_ref()
    }

    #[must_use]
    pub fn new_config(&self) -> Option<&TaskInfo> {
        self.new_config.as_ref()
    }

    /// Shard this update applies to, taken from whichever config is present.
    #[must_use]
    pub fn shard_id(&self) -> i32 {
        self.new_config
            .as_ref()
            .or(self.old_config.as_ref())
            .map_or(0, |config| config.shard_id)
    }

    /// Check both configs with [`TaskInfo::validate`].
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if either config cannot be stored.
    pub fn validate(&self) -> Result<()> {
        self.old_config
            .iter()
            .chain(self.new_config.iter())
            .try_for_each(TaskInfo::validate)
    }
}

/// The in-flight update for one job.
///
/// Shard configs are kept ordered by shard id, so two updates with the same
/// configs compare equal whatever order they were supplied in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "UpdateFields")]
pub struct JobUpdateConfiguration {
    pub role: String,
    pub job: String,
    /// Opaque token correlating the update session
    pub update_token: String,
    configs: Vec<TaskUpdateConfiguration>,
}

#[derive(Deserialize)]
struct UpdateFields {
    role: String,
    job: String,
    update_token: String,
    #[serde(default)]
    configs: Vec<TaskUpdateConfiguration>,
}

impl From<UpdateFields> for JobUpdateConfiguration {
    fn from(fields: UpdateFields) -> Self {
        Self::new(&fields.role, &fields.job, &fields.update_token, fields.configs)
    }
}

impl JobUpdateConfiguration {
    /// Create an update record; configs are ordered by shard id.
    #[must_use]
    pub fn new(
        role: &str,
        job: &str,
        update_token: &str,
        configs: impl IntoIterator<Item = TaskUpdateConfiguration>,
    ) -> Self {
        let mut configs: Vec<_> = configs.into_iter().collect();
        configs.sort_by_key(TaskUpdateConfiguration::shard_id);
        Self {
            role: role.to_string(),
            job: job.to_string(),
            update_token: update_token.to_string(),
            configs,
        }
    }

    /// Per-shard changes, ordered by shard id.
    #[must_use]
    pub fn configs(&self) -> &[TaskUpdateConfiguration] {
        &self.configs
    }

    #[must_use]
    pub fn job_key(&self) -> String {
        super::job_key(&self.role, &self.job)
    }

    /// Check every shard config.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if any config cannot be stored.
    pub fn validate(&self) -> Result<()> {
        self.configs
            .iter()
            .try_for_each(TaskUpdateConfiguration::validate)
    }
}
