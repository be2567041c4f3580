//! SQLite storage layer for the scheduler.
//!
//! This module provides the persistence layer using SQLite with:
//! - WAL mode and a busy timeout so several connections can share a file
//! - One IMMEDIATE transaction per unit of work
//! - In-place upgrade of legacy table layouts
//!
//! # Submodules
//!
//! - [`schema`] - Database schema definitions
//! - [`migrations`] - Legacy layout upgrades
//! - [`sqlite`] - Storage engine and unit-of-work executor
//! - [`framework`], [`jobs`], [`quotas`], [`tasks`], [`updates`] - The five stores

pub mod framework;
pub mod jobs;
mod keyed;
pub mod migrations;
pub mod quotas;
pub mod schema;
pub mod sqlite;
pub mod tasks;
pub mod updates;

pub use framework::FrameworkStore;
pub use jobs::JobStore;
pub use migrations::upgrade_update_schema_if_needed;
pub use quotas::QuotaStore;
pub use schema::{ensure_schema, is_legacy_update_schema};
pub use sqlite::{noop, Storage, StoreProvider, DEFAULT_BUSY_TIMEOUT};
pub use tasks::TaskStore;
pub use updates::UpdateStore;
