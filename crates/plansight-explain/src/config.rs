//! Parser Configuration
//!
//! Knobs that change how EXPLAIN output is read. Every field has a default, so
//! an empty TOML document (or `ParserConfig::default()`) gives the standard
//! CTE-aware, auto-detecting reader.
//!
//! ```toml
//! format = "text"
//! cte_aware = true
//! strip_trailing_quote = true
//! collect_discarded_lines = false
//! ```

use crate::error::{ExplainError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which reader to use for a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// JSON when the first non-blank character is `[` or `{`, text otherwise
    #[default]
    Auto,
    /// Default `EXPLAIN` text rendering
    Text,
    /// `EXPLAIN (FORMAT JSON)`
    Json,
}

/// Options for a single parse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserConfig {
    #[serde(default)]
    pub format: InputFormat,
    /// Recognize `CTE name` blocks and collect their bodies into `ctes`.
    /// When off, CTE marker lines are plain extra info.
    #[serde(default = "default_true")]
    pub cte_aware: bool,
    /// Strip one trailing `"` per line (left over from copying out of psql/pgAdmin)
    #[serde(default = "default_true")]
    pub strip_trailing_quote: bool,
    /// Keep the text of lines the text reader drops. The count is kept either way.
    #[serde(default = "default_true")]
    pub collect_discarded_lines: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            format: InputFormat::Auto,
            cte_aware: true,
            strip_trailing_quote: true,
            collect_discarded_lines: true,
        }
    }
}

impl ParserConfig {
    /// Parses a configuration from a TOML document
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Loads a configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ExplainError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Forces the given input format
    pub fn with_format(mut self, format: InputFormat) -> Self {
        self.format = format;
        self
    }

    /// Enables or disables CTE recognition
    pub fn with_cte_aware(mut self, cte_aware: bool) -> Self {
        self.cte_aware = cte_aware;
        self
    }

    /// Resolves the reader to use for `source`
    pub fn resolve_format(&self, source: &str) -> SourceFormat {
        match self.format {
            InputFormat::Text => SourceFormat::Text,
            InputFormat::Json => SourceFormat::Json,
            InputFormat::Auto => {
                let trimmed = source.trim_start();
                if trimmed.starts_with('[') || trimmed.starts_with('{') {
                    SourceFormat::Json
                } else {
                    SourceFormat::Text
                }
            }
        }
    }
}

/// The reader that actually produced a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Text,
    Json,
}
