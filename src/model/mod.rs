//! Data models for scheduler state.
//!
//! This module contains the records persisted by the storage engine:
//! - Identity, TaskInfo, ScheduledTask
//! - JobConfiguration
//! - Quota
//! - JobUpdateConfiguration / TaskUpdateConfiguration

pub mod job;
pub mod quota;
pub mod task;
pub mod update;

pub use job::{job_key, CronCollisionPolicy, JobConfiguration};
pub use quota::Quota;
pub use task::{AssignedTask, Identity, ScheduleStatus, ScheduledTask, TaskEvent, TaskInfo};
pub use update::{JobUpdateConfiguration, TaskUpdateConfiguration};
