//! Explain Document
//!
//! [`Explain`] is the entry point: hand it EXPLAIN output (or a file holding
//! it) and get back the plan tree together with the statement-level timings
//! and a report of the lines that could not be placed.
//!
//! # Examples
//!
//! ```
//! use plansight_explain::Explain;
//!
//! let explain = Explain::from_text(
//!     "Seq Scan on tenk1  (cost=0.00..333.00 rows=10000 width=148)",
//! )
//! .unwrap();
//!
//! assert_eq!(explain.root().node_type(), "Seq Scan");
//! assert!(!explain.is_analyzed());
//! ```

use crate::assembler::{DiscardedLine, parse_text};
use crate::config::{ParserConfig, SourceFormat};
use crate::error::{ExplainError, Result};
use crate::json::parse_json;
use crate::metrics::number;
use crate::node::{Node, NodeIterator};
use crate::summary::{StatementSummary, TriggerTiming};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// A parsed EXPLAIN document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explain {
    root: Node,
    format: SourceFormat,
    #[serde(flatten)]
    summary: StatementSummary,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    discarded_lines: Vec<DiscardedLine>,
    #[serde(default)]
    discarded_count: usize,
}

impl Explain {
    /// Starts building an [`Explain`] from exactly one source
    pub fn builder() -> ExplainBuilder {
        ExplainBuilder::default()
    }

    /// Parses EXPLAIN output with the default configuration
    pub fn from_text(source: &str) -> Result<Self> {
        Self::from_text_with(source, &ParserConfig::default())
    }

    /// Parses EXPLAIN output with the given configuration
    pub fn from_text_with(source: &str, config: &ParserConfig) -> Result<Self> {
        parse_source(source, config)
    }

    /// Reads and parses a file of EXPLAIN output with the default configuration
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::builder().source_file(path.as_ref()).parse()
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Which reader produced this plan
    pub fn format(&self) -> SourceFormat {
        self.format
    }

    pub fn summary(&self) -> &StatementSummary {
        &self.summary
    }

    pub fn planning_time_ms(&self) -> Option<f64> {
        self.summary.planning_time_ms
    }

    pub fn execution_time_ms(&self) -> Option<f64> {
        self.summary.execution_time_ms
    }

    pub fn triggers(&self) -> &[TriggerTiming] {
        &self.summary.triggers
    }

    /// Lines the text reader dropped, when collection is enabled
    pub fn discarded_lines(&self) -> &[DiscardedLine] {
        &self.discarded_lines
    }

    /// Number of lines the text reader dropped
    pub fn discarded_count(&self) -> usize {
        self.discarded_count
    }

    /// True when the plan came from an `EXPLAIN ANALYZE` run
    pub fn is_analyzed(&self) -> bool {
        self.root.is_analyzed()
    }

    /// Returns an iterator over all nodes in the plan (depth-first)
    pub fn iter_nodes(&self) -> NodeIterator<'_> {
        self.root.iter()
    }

    /// Finds all nodes with the given type
    pub fn find_nodes_by_type(&self, node_type: &str) -> Vec<&Node> {
        self.iter_nodes()
            .filter(|n| n.node_type() == node_type)
            .collect()
    }

    /// Plain, ordered representation of the whole document: the plan snapshot
    /// followed by whichever statement timings are present
    pub fn snapshot(&self) -> Value {
        let mut map = Map::new();
        map.insert("plan".into(), self.root.snapshot());

        if let Some(ms) = self.summary.planning_time_ms {
            map.insert("planning_time_ms".into(), number(ms));
        }
        if let Some(ms) = self.summary.execution_time_ms {
            map.insert("execution_time_ms".into(), number(ms));
        }
        if !self.summary.triggers.is_empty() {
            let triggers = self
                .summary
                .triggers
                .iter()
                .map(|trigger| {
                    let mut entry = Map::new();
                    entry.insert("name".into(), Value::from(trigger.name.as_str()));
                    entry.insert("time_ms".into(), number(trigger.time_ms));
                    entry.insert("calls".into(), Value::from(trigger.calls));
                    Value::Object(entry)
                })
                .collect();
            map.insert("triggers".into(), triggers);
        }

        Value::Object(map)
    }
}

/// Builder enforcing that exactly one source is supplied
#[derive(Debug, Clone, Default)]
pub struct ExplainBuilder {
    source: Option<String>,
    source_file: Option<PathBuf>,
    config: ParserConfig,
}

impl ExplainBuilder {
    /// Sets the EXPLAIN output to parse
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets a file to read EXPLAIN output from
    pub fn source_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_file = Some(path.into());
        self
    }

    pub fn config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    /// Loads the source and parses it
    pub fn parse(self) -> Result<Explain> {
        let source = match (self.source, self.source_file) {
            (Some(source), None) => source,
            (None, Some(path)) => std::fs::read_to_string(&path)
                .map_err(|source| ExplainError::Io { path, source })?,
            (None, None) => {
                return Err(ExplainError::Usage(
                    "either source text or a source file is required",
                ));
            }
            (Some(_), Some(_)) => {
                return Err(ExplainError::Usage(
                    "source text and a source file cannot both be given",
                ));
            }
        };

        parse_source(&source, &self.config)
    }
}

#[tracing::instrument(
    level = "debug",
    name = "parse_explain",
    skip_all,
    fields(format = ?config.resolve_format(source), lines = source.lines().count())
)]
fn parse_source(source: &str, config: &ParserConfig) -> Result<Explain> {
    match config.resolve_format(source) {
        SourceFormat::Text => {
            let plan = parse_text(source, config)?;
            Ok(Explain {
                root: plan.root,
                format: SourceFormat::Text,
                summary: plan.summary,
                discarded_lines: plan.discarded_lines,
                discarded_count: plan.discarded_count,
            })
        }
        SourceFormat::Json => {
            let plan = parse_json(source, config)?;
            Ok(Explain {
                root: plan.root,
                format: SourceFormat::Json,
                summary: plan.summary,
                discarded_lines: Vec::new(),
                discarded_count: 0,
            })
        }
    }
}
