//! schedstore - durable storage for cluster scheduler state
//!
//! Persists the scheduler's framework identity, accepted jobs, per-role
//! quotas, scheduled tasks and in-flight rolling updates in SQLite. Every
//! unit of work runs in one transaction, the whole store can be captured in
//! a versioned snapshot, and legacy table layouts are upgraded in place.
//!
//! # Architecture
//!
//! - [`storage`] - SQLite engine, unit-of-work executor and the five stores
//! - [`snapshot`] - Whole-store snapshot documents and file I/O
//! - [`model`] - Jobs, tasks, quotas and update configurations
//! - [`query`] - Task selection
//! - [`shards`] - Accessors over per-shard update configs
//! - [`config`] - Configuration management
//! - [`cli`] - Command-line interface using clap
//! - [`error`] - Error types and handling
//!
//! # Example
//!
//! ```no_run
//! use schedstore::storage::Storage;
//!
//! # fn main() -> schedstore::Result<()> {
//! let mut storage = Storage::open_memory()?;
//! storage.execute(|stores| stores.framework().save("framework-1"))?;
//! let snapshot = storage.create_snapshot()?;
//! storage.apply_snapshot(&snapshot)?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod query;
pub mod shards;
pub mod snapshot;
pub mod storage;

pub use error::{Error, Result};
pub use query::Query;
pub use storage::{Storage, StoreProvider};
