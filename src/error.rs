//! Error types shared by every familycart module.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// No record matched the given id, prefix or name.
    #[error("no {kind} matching '{key}'")]
    NotFound { kind: &'static str, key: String },

    /// An id prefix matched more than one record.
    #[error("ambiguous prefix '{prefix}' matches {} items: {}", .matches.len(), .matches.join(", "))]
    AmbiguousId { prefix: String, matches: Vec<String> },

    #[error("unknown decision: {0} (valid: merge, skip, add-anyway)")]
    InvalidDecision(String),

    #[error("unknown priority: {0} (valid: low, medium, high)")]
    InvalidPriority(String),

    #[error("unknown status: {0} (valid: to-buy, bought)")]
    InvalidStatus(String),

    /// Rejected user input.
    #[error("{0}")]
    Invalid(String),

    #[error("familycart not initialized (run `fc init`)")]
    NotInitialized,

    #[error("familycart already initialized in {}", .0.display())]
    AlreadyInitialized(PathBuf),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid store JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl Error {
    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            key: key.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
