//! Configuration management.
//!
//! Resolves where the scheduler database lives and how long a connection
//! waits on a locked database before giving up.
//!
//! Resolution order for the database path:
//! 1. Explicit path (the `--db` flag)
//! 2. `SCHEDSTORE_DB` environment variable
//! 3. Global location: `~/.schedstore/data/scheduler.db`

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::storage::DEFAULT_BUSY_TIMEOUT;

/// Environment variable overriding the database path.
pub const DB_ENV: &str = "SCHEDSTORE_DB";

/// Environment variable overriding the busy timeout, in milliseconds.
pub const BUSY_TIMEOUT_ENV: &str = "SCHEDSTORE_BUSY_TIMEOUT_MS";

/// Resolved settings for opening [`Storage`](crate::storage::Storage).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub db_path: PathBuf,
    pub busy_timeout: Duration,
}

impl StorageConfig {
    /// Resolve from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if no database location can be determined or
    /// the busy timeout is not a number.
    pub fn resolve(explicit_path: Option<&Path>) -> Result<Self> {
        Self::resolve_with(explicit_path, |key| std::env::var(key).ok())
    }

    /// Resolve using `env` for variable lookups.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if no database location can be determined or
    /// the busy timeout is not a number.
    pub fn resolve_with<F>(explicit_path: Option<&Path>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = db_path_from(explicit_path, &env).ok_or_else(|| {
            Error::Config("could not determine a home directory; pass --db".to_string())
        })?;
        Ok(Self {
            db_path,
            busy_timeout: busy_timeout_from(&env)?,
        })
    }
}

/// Get the global schedstore directory location (`~/.schedstore/`).
#[must_use]
pub fn global_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".schedstore"))
}

fn db_path_from<F>(explicit_path: Option<&Path>, env: &F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if let Some(db_path) = env(DB_ENV) {
        if !db_path.trim().is_empty() {
            return Some(PathBuf::from(db_path));
        }
    }

    global_dir().map(|dir| dir.join("data").join("scheduler.db"))
}

fn busy_timeout_from<F>(env: &F) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    match env(BUSY_TIMEOUT_ENV) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| Error::Config(format!("{BUSY_TIMEOUT_ENV} must be milliseconds, got {raw:?}"))),
        _ => Ok(DEFAULT_BUSY_TIMEOUT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_explicit_path_wins() {
        let explicit = PathBuf::from("/custom/path/db.sqlite");
        let config =
            StorageConfig::resolve_with(Some(explicit.as_path()), env_of(&[(DB_ENV, "/env/db")])).unwrap();
        assert_eq!(config.db_path, explicit);
    }

    #[test]
    fn test_env_path_used() {
        let config = StorageConfig::resolve_with(None, env_of(&[(DB_ENV, "/env/db")])).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/env/db"));
    }

    #[test]
    fn test_blank_env_path_falls_back_to_global() {
        let config = StorageConfig::resolve_with(None, env_of(&[(DB_ENV, "  ")])).unwrap();
        assert!(config.db_path.ends_with(".schedstore/data/scheduler.db"));
    }

    #[test]
    fn test_busy_timeout_default_and_override() {
        let config = StorageConfig::resolve_with(None, env_of(&[])).unwrap();
        assert_eq!(config.busy_timeout, DEFAULT_BUSY_TIMEOUT);

        let config =
            StorageConfig::resolve_with(None, env_of(&[(BUSY_TIMEOUT_ENV, "250")])).unwrap();
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_busy_timeout_rejects_garbage() {
        let result = StorageConfig::resolve_with(None, env_of(&[(BUSY_TIMEOUT_ENV, "soon")]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_global_dir_returns_some() {
        assert!(global_dir().is_some());
    }
}
