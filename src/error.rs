//! Error types for the scheduler storage engine.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes for the admin CLI
//! - Retryability flags for callers that own a retry/backoff policy
//! - Structured JSON output for piped / non-TTY consumers
//!
//! Backing-engine failures are carried as the original `rusqlite::Error`
//! so callers can inspect the underlying cause (busy, constraint, corrupt).

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    NotInitialized,
    DatabaseError,
    SchemaUpgradeFailed,

    // Snapshot (exit 3)
    SnapshotVersion,
    SnapshotCorrupt,

    // Validation (exit 4)
    InvalidUpdate,
    InvalidArgument,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::SchemaUpgradeFailed => "SCHEMA_UPGRADE_FAILED",
            Self::SnapshotVersion => "SNAPSHOT_VERSION",
            Self::SnapshotCorrupt => "SNAPSHOT_CORRUPT",
            Self::InvalidUpdate => "INVALID_UPDATE",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotInitialized | Self::DatabaseError | Self::SchemaUpgradeFailed => 2,
            Self::SnapshotVersion | Self::SnapshotCorrupt => 3,
            Self::InvalidUpdate | Self::InvalidArgument => 4,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in storage operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database not found at {path}: run `schedstore init` first")]
    NotInitialized { path: PathBuf },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Schema upgrade {migration} failed: {source}")]
    SchemaUpgrade {
        migration: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Unsupported snapshot version {found} (supported: 1..={supported})")]
    SnapshotVersion { found: u32, supported: u32 },

    #[error("Corrupt snapshot: {0}")]
    SnapshotCorrupt(String),

    #[error("Invalid update configuration: {0}")]
    InvalidUpdate(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized { .. } => ErrorCode::NotInitialized,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::SchemaUpgrade { .. } => ErrorCode::SchemaUpgradeFailed,
            Self::SnapshotVersion { .. } => ErrorCode::SnapshotVersion,
            Self::SnapshotCorrupt(_) => ErrorCode::SnapshotCorrupt,
            Self::InvalidUpdate(_) => ErrorCode::InvalidUpdate,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Whether retrying the same unit of work may succeed.
    ///
    /// True only when the backing engine reported lock contention.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Database(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }

    /// Recovery hint for operators.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized { path } => Some(format!(
                "Run `schedstore init` or pass `--db` pointing at an existing database (looked for {}).",
                path.display()
            )),
            Self::SchemaUpgrade { .. } => Some(
                "The database was left on its previous schema. Restore from a snapshot or inspect it with `schedstore schema check`."
                    .to_string(),
            ),
            Self::SnapshotVersion { .. } => Some(
                "The snapshot was written by a newer build. Apply it with a build that supports its version."
                    .to_string(),
            ),
            Self::SnapshotCorrupt(_) => {
                Some("Use `schedstore snapshot inspect` to check the file before applying it.".to_string())
            }
            _ if self.is_retryable() => {
                Some("Another writer holds the database lock; retry the operation.".to_string())
            }
            Self::Database(_)
            | Self::InvalidUpdate(_)
            | Self::InvalidArgument(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Json(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": self.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
