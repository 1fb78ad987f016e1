//! Line Classifier
//!
//! Maps one line of text-format EXPLAIN output to what it means for the tree:
//!
//! ```text
//! Hash Join  (cost=1.09..2.19 rows=3 width=8)           <- NodeHeader, depth 0
//!   Hash Cond: (a.id = b.id)                            <- ExtraInfo, depth 2
//!   InitPlan 1 (returns $0)                             <- StructureMarker, depth 2
//!     ->  Result  (cost=0.00..0.01 rows=1 width=4)      <- NodeHeader, depth 8
//!   CTE totals                                          <- CteMarker, depth 2
//!   ->  Seq Scan on a  (cost=0.00..1.03 rows=3 width=4) <- NodeHeader, depth 6
//! ```
//!
//! The depth of a node header counts the `->` arrow and the spaces after it;
//! the depth of every other line is just its leading whitespace. Node headers
//! also report their indent, the whitespace before the arrow, which is the
//! column their `InitPlan` / `SubPlan` siblings are printed at.

use crate::node::{ActualStats, Estimates, Execution, Node};
use regex::Regex;
use std::sync::LazyLock;

static NODE_HEADER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(\s*->\s*|\s*)(\S.*?)\s+",
        r"\(cost=(\d+(?:\.\d+)?)\.\.(\d+(?:\.\d+)?)\s+rows=(\d+)\s+width=(\d+)\)",
        r"(?:\s+\((?:",
        r"actual\s+time=(\d+(?:\.\d+)?)\.\.(\d+(?:\.\d+)?)\s+rows=(\d+(?:\.\d+)?)\s+loops=(\d+)",
        r"|(never\s+executed)",
        r")\))?\s*$",
    ))
    .expect("valid regex")
});

static STRUCTURE_MARKER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)(SubPlan|InitPlan)\s*(?:\d+\s*)?(?:\(returns\s.*\)\s*)?$")
        .expect("valid regex")
});

static CTE_MARKER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)CTE\s+(\S+)\s*$").expect("valid regex"));

/// Kind of nested fragment a structure marker opens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    InitPlan,
    SubPlan,
}

/// Fields captured from a node header line
#[derive(Debug, Clone, PartialEq)]
pub struct NodeHeader<'a> {
    /// Step phrase as written, e.g. `Index Scan using users_pkey on users`
    pub type_text: &'a str,
    pub estimates: Estimates,
    pub execution: Execution,
}

impl NodeHeader<'_> {
    /// Builds the finished node for this header
    pub fn into_node(self) -> Node {
        Node::new(self.type_text, self.estimates).with_execution(self.execution)
    }
}

/// What a single line of text-format EXPLAIN output is
#[derive(Debug, Clone, PartialEq)]
pub enum LineKind<'a> {
    NodeHeader {
        /// Prefix length including the `->` arrow
        depth: usize,
        /// Whitespace before the arrow; equals `depth` when there is none
        indent: usize,
        header: NodeHeader<'a>,
    },
    StructureMarker {
        depth: usize,
        kind: MarkerKind,
    },
    CteMarker {
        depth: usize,
        name: &'a str,
    },
    ExtraInfo {
        depth: usize,
        text: &'a str,
    },
    Ignore,
}

/// Options that change how lines are classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifyOptions {
    pub cte_aware: bool,
    pub strip_trailing_quote: bool,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            cte_aware: true,
            strip_trailing_quote: true,
        }
    }
}

/// Classifies one line of text-format EXPLAIN output
pub fn classify_line(line: &str, options: ClassifyOptions) -> LineKind<'_> {
    let line = if options.strip_trailing_quote {
        line.strip_suffix('"').unwrap_or(line)
    } else {
        line
    };

    if line.trim().is_empty() {
        return LineKind::Ignore;
    }

    if let Some(kind) = parse_node_header(line) {
        return kind;
    }

    if let Some(caps) = STRUCTURE_MARKER_REGEX.captures(line) {
        let kind = match &caps[2] {
            "InitPlan" => MarkerKind::InitPlan,
            _ => MarkerKind::SubPlan,
        };
        return LineKind::StructureMarker {
            depth: char_len(&caps[1]),
            kind,
        };
    }

    if options.cte_aware
        && let Some(caps) = CTE_MARKER_REGEX.captures(line)
    {
        let prefix = caps.get(1).map_or("", |m| m.as_str());
        let name = caps.get(2).map_or("", |m| m.as_str());
        return LineKind::CteMarker {
            depth: char_len(prefix),
            name,
        };
    }

    let text = line.trim();
    let prefix_len = line.len() - line.trim_start().len();
    LineKind::ExtraInfo {
        depth: char_len(&line[..prefix_len]),
        text,
    }
}

fn parse_node_header(line: &str) -> Option<LineKind<'_>> {
    let caps = NODE_HEADER_REGEX.captures(line)?;

    let prefix = caps.get(1).map_or("", |m| m.as_str());
    let type_text = caps.get(2)?.as_str();

    let estimates = Estimates::new(
        caps[3].parse().ok()?,
        caps[4].parse().ok()?,
        caps[5].parse().ok()?,
        caps[6].parse().ok()?,
    );

    let execution = if caps.get(11).is_some() {
        Execution::NeverExecuted
    } else if let (Some(first), Some(last), Some(rows), Some(loops)) =
        (caps.get(7), caps.get(8), caps.get(9), caps.get(10))
    {
        Execution::Analyzed(ActualStats {
            time_first: first.as_str().parse().ok()?,
            time_last: last.as_str().parse().ok()?,
            rows: parse_count(rows.as_str())?,
            loops: loops.as_str().parse().ok()?,
        })
    } else {
        Execution::Estimated
    };

    let indent = match prefix.find("->") {
        Some(arrow) => char_len(&prefix[..arrow]),
        None => char_len(prefix),
    };

    Some(LineKind::NodeHeader {
        depth: char_len(prefix),
        indent,
        header: NodeHeader {
            type_text,
            estimates,
            execution,
        },
    })
}

/// Actual rows are averaged per loop, so newer servers print fractions
fn parse_count(text: &str) -> Option<u64> {
    text.parse::<u64>().ok().or_else(|| {
        text.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f.round() as u64)
    })
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
