//! Error types for the configuration store
//!
//! Corrupt or missing documents never surface here from `read()`; they are
//! repaired in place. Everything else propagates to the caller.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for store and registry operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while reading, locking or persisting the configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The document does not match the configuration schema
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A repository name is not present in the registry
    #[error("repository not found: {name}")]
    NotFound {
        /// The name that was looked up
        name: String,
    },

    /// A repository with this name is already registered
    #[error("repository already registered: {name}")]
    AlreadyExists {
        /// The colliding name
        name: String,
    },

    /// The advisory lock could not be acquired within the retry budget
    #[error("timed out acquiring lock on {} after {attempts} attempts", path.display())]
    LockTimeout {
        /// The lock marker path
        path: PathBuf,
        /// How many acquisition attempts were made
        attempts: u32,
    },

    /// Filesystem operation failed
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The in-memory document could not be serialized
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ConfigError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Whether retrying the whole operation later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }
}

/// A single schema violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Path of the offending field, e.g. `repositories[2].localPath`
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Schema validation failure carrying every violated field
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    /// Names of the violated fields, in discovery order
    pub fn fields(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.field.as_str()).collect()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid configuration: ")?;
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}
