//! Error types for EXPLAIN parsing

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while turning EXPLAIN output into a plan tree
#[derive(Debug, Error)]
pub enum ExplainError {
    /// The caller supplied neither or both of source text and source path
    #[error("Usage error: {0}")]
    Usage(&'static str),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The text plan has a shape the line grammar does not model
    #[error("Invalid plan structure at line {line}: {reason}")]
    Structural { line: usize, reason: String },

    #[error("No plan node found in EXPLAIN output")]
    NoPlan,

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid JSON plan: {0}")]
    InvalidJsonPlan(String),

    #[error("Invalid parser configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl ExplainError {
    pub(crate) fn structural(line: usize, reason: impl Into<String>) -> Self {
        Self::Structural {
            line,
            reason: reason.into(),
        }
    }

    /// Returns true for errors caused by the shape of the plan text itself
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Structural { .. })
    }
}

/// Result type for EXPLAIN parsing
pub type Result<T> = std::result::Result<T, ExplainError>;
