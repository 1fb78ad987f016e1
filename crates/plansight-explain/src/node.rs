//! Plan Node Model
//!
//! A [`Node`] is one step of a PostgreSQL execution plan together with the
//! steps it owns. Children come in four flavours, kept apart because they are
//! timed differently:
//!
//! - `sub_nodes` - ordinary plan inputs (`->` lines)
//! - `initplans` - `InitPlan` fragments, evaluated once
//! - `subplans` - `SubPlan` fragments, evaluated per outer row
//! - `ctes` - `CTE name` bodies, keyed by name

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static SEQ_OR_HEAP_SCAN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((?:Parallel\s+)?Seq\s+Scan|Bitmap\s+Heap\s+Scan)\s+on\s+(\S+)(?:\s+(\S+))?$")
        .expect("valid regex")
});

static BITMAP_INDEX_SCAN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(Bitmap\s+Index\s+Scan)\s+on\s+(\S+)$").expect("valid regex")
});

static INDEX_SCAN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(Index(?:\s+Only)?\s+Scan(?:\s+Backward)?)\s+using\s+(\S+)\s+on\s+(\S+)(?:\s+(\S+))?$",
    )
    .expect("valid regex")
});

/// Which relation or index a scan node reads
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTarget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
}

impl ScanTarget {
    /// Splits a raw step phrase such as `Index Scan using t_pkey on t x` into
    /// the bare scan keyword and the scan target.
    ///
    /// Phrases that are not one of the recognized scan shapes come back
    /// unchanged with no target.
    pub fn split(raw: &str) -> (String, Option<ScanTarget>) {
        let raw = raw.trim();

        if let Some(caps) = SEQ_OR_HEAP_SCAN_REGEX.captures(raw) {
            let target = ScanTarget {
                table_name: Some(caps[2].to_string()),
                table_alias: caps.get(3).map(|m| m.as_str().to_string()),
                index_name: None,
            };
            return (normalize_spaces(&caps[1]), Some(target));
        }

        if let Some(caps) = BITMAP_INDEX_SCAN_REGEX.captures(raw) {
            let target = ScanTarget {
                index_name: Some(caps[2].to_string()),
                ..Default::default()
            };
            return (normalize_spaces(&caps[1]), Some(target));
        }

        if let Some(caps) = INDEX_SCAN_REGEX.captures(raw) {
            let target = ScanTarget {
                table_name: Some(caps[3].to_string()),
                table_alias: caps.get(4).map(|m| m.as_str().to_string()),
                index_name: Some(caps[2].to_string()),
            };
            return (normalize_spaces(&caps[1]), Some(target));
        }

        (raw.to_string(), None)
    }

    /// Builds a target from the loose pieces JSON output provides
    pub(crate) fn from_parts(
        table_name: Option<String>,
        table_alias: Option<String>,
        index_name: Option<String>,
    ) -> Option<Self> {
        if table_name.is_none() && table_alias.is_none() && index_name.is_none() {
            return None;
        }
        Some(Self {
            table_name,
            table_alias,
            index_name,
        })
    }
}

fn normalize_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Actual execution statistics from `EXPLAIN ANALYZE`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActualStats {
    /// Time to the first row, per loop, in milliseconds
    pub time_first: f64,
    /// Time to the last row, per loop, in milliseconds
    pub time_last: f64,
    /// Rows returned, per loop
    pub rows: u64,
    pub loops: u64,
}

/// Whether, and how, a node carries execution statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum Execution {
    /// Planner estimates only (plain `EXPLAIN`)
    #[default]
    Estimated,
    /// Ran with the given statistics
    Analyzed(ActualStats),
    /// `(never executed)`: part of an analyzed plan, but never started
    NeverExecuted,
}

/// Planner estimates carried by every node
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Estimates {
    pub startup_cost: f64,
    pub total_cost: f64,
    pub rows: u64,
    pub row_width: u64,
}

impl Estimates {
    pub fn new(startup_cost: f64, total_cost: f64, rows: u64, row_width: u64) -> Self {
        Self {
            startup_cost,
            total_cost,
            rows,
            row_width,
        }
    }
}

/// A single step of an execution plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    node_type: String,
    estimates: Estimates,
    execution: Execution,
    scan_on: Option<ScanTarget>,
    extra_info: Vec<String>,
    sub_nodes: Vec<Node>,
    initplans: Vec<Node>,
    subplans: Vec<Node>,
    ctes: IndexMap<String, Node>,
}

impl Node {
    /// Creates a node from a raw step phrase.
    ///
    /// Scan phrases (`Seq Scan on users u`, `Index Scan using users_pkey on
    /// users`, ...) are split here, once: `node_type` gets the bare scan
    /// keyword and the identifiers land in [`Node::scan_on`].
    pub fn new(raw_type: &str, estimates: Estimates) -> Self {
        let (node_type, scan_on) = ScanTarget::split(raw_type);
        Self {
            node_type,
            estimates,
            execution: Execution::Estimated,
            scan_on,
            extra_info: Vec::new(),
            sub_nodes: Vec::new(),
            initplans: Vec::new(),
            subplans: Vec::new(),
            ctes: IndexMap::new(),
        }
    }

    /// Creates a node whose type is taken verbatim, with an explicit scan target
    pub(crate) fn with_canonical_type(
        node_type: impl Into<String>,
        scan_on: Option<ScanTarget>,
        estimates: Estimates,
    ) -> Self {
        Self {
            node_type: node_type.into(),
            scan_on,
            ..Self::new("", estimates)
        }
    }

    /// Sets execution statistics
    pub fn with_execution(mut self, execution: Execution) -> Self {
        self.execution = execution;
        self
    }

    /// Sets actual statistics from `(actual time=FIRST..LAST rows=ROWS loops=LOOPS)`
    pub fn with_actual(self, time_first: f64, time_last: f64, rows: u64, loops: u64) -> Self {
        self.with_execution(Execution::Analyzed(ActualStats {
            time_first,
            time_last,
            rows,
            loops,
        }))
    }

    /// Marks the node `(never executed)`
    pub fn with_never_executed(self) -> Self {
        self.with_execution(Execution::NeverExecuted)
    }

    /// Appends an extra info line
    pub fn with_extra_info(mut self, info: impl Into<String>) -> Self {
        self.extra_info.push(info.into());
        self
    }

    /// Adds a plan child
    pub fn with_sub_node(mut self, child: Node) -> Self {
        self.sub_nodes.push(child);
        self
    }

    /// Adds an InitPlan child
    pub fn with_initplan(mut self, child: Node) -> Self {
        self.initplans.push(child);
        self
    }

    /// Adds a SubPlan child
    pub fn with_subplan(mut self, child: Node) -> Self {
        self.subplans.push(child);
        self
    }

    /// Adds a CTE body. A later body under the same name replaces the earlier one.
    pub fn with_cte(mut self, name: impl Into<String>, body: Node) -> Self {
        self.ctes.insert(name.into(), body);
        self
    }

    pub(crate) fn push_extra_info(&mut self, info: String) {
        self.extra_info.push(info);
    }

    pub(crate) fn push_sub_node(&mut self, child: Node) {
        self.sub_nodes.push(child);
    }

    pub(crate) fn push_initplan(&mut self, child: Node) {
        self.initplans.push(child);
    }

    pub(crate) fn push_subplan(&mut self, child: Node) {
        self.subplans.push(child);
    }

    /// Inserts a CTE body, returning false if the name is already taken
    pub(crate) fn insert_cte(&mut self, name: String, body: Node) -> bool {
        if self.ctes.contains_key(&name) {
            return false;
        }
        self.ctes.insert(name, body);
        true
    }

    /// Canonical step name, e.g. `Seq Scan`, `Hash Join`, `Sort`
    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    pub fn estimates(&self) -> &Estimates {
        &self.estimates
    }

    pub fn estimated_startup_cost(&self) -> f64 {
        self.estimates.startup_cost
    }

    pub fn estimated_total_cost(&self) -> f64 {
        self.estimates.total_cost
    }

    pub fn estimated_rows(&self) -> u64 {
        self.estimates.rows
    }

    pub fn estimated_row_width(&self) -> u64 {
        self.estimates.row_width
    }

    pub fn execution(&self) -> &Execution {
        &self.execution
    }

    fn actual(&self) -> Option<&ActualStats> {
        match &self.execution {
            Execution::Analyzed(stats) => Some(stats),
            Execution::Estimated | Execution::NeverExecuted => None,
        }
    }

    pub fn actual_time_first(&self) -> Option<f64> {
        self.actual().map(|a| a.time_first)
    }

    pub fn actual_time_last(&self) -> Option<f64> {
        self.actual().map(|a| a.time_last)
    }

    pub fn actual_rows(&self) -> Option<u64> {
        self.actual().map(|a| a.rows)
    }

    /// Loop count; `Some(0)` for never-executed nodes
    pub fn actual_loops(&self) -> Option<u64> {
        match &self.execution {
            Execution::Analyzed(stats) => Some(stats.loops),
            Execution::NeverExecuted => Some(0),
            Execution::Estimated => None,
        }
    }

    pub fn never_executed(&self) -> bool {
        matches!(self.execution, Execution::NeverExecuted)
    }

    pub fn scan_on(&self) -> Option<&ScanTarget> {
        self.scan_on.as_ref()
    }

    pub fn extra_info(&self) -> &[String] {
        &self.extra_info
    }

    pub fn sub_nodes(&self) -> &[Node] {
        &self.sub_nodes
    }

    pub fn initplans(&self) -> &[Node] {
        &self.initplans
    }

    pub fn subplans(&self) -> &[Node] {
        &self.subplans
    }

    /// CTE bodies in the order they appeared
    pub fn ctes(&self) -> &IndexMap<String, Node> {
        &self.ctes
    }

    /// Direct children whose time is charged to this node: sub nodes,
    /// initplans and subplans, in that order. CTE bodies are not included.
    pub fn timed_children(&self) -> impl Iterator<Item = &Node> {
        self.sub_nodes
            .iter()
            .chain(self.initplans.iter())
            .chain(self.subplans.iter())
    }

    /// Every direct child, CTE bodies last
    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.timed_children().chain(self.ctes.values())
    }

    /// Returns an iterator over this node and all its descendants (depth-first)
    pub fn iter(&self) -> NodeIterator<'_> {
        NodeIterator::new(self)
    }

    /// Returns the total number of nodes in this subtree (including self)
    pub fn node_count(&self) -> usize {
        1 + self.children().map(|c| c.node_count()).sum::<usize>()
    }

    /// Returns the maximum depth of this subtree
    pub fn depth(&self) -> usize {
        1 + self.children().map(|c| c.depth()).max().unwrap_or(0)
    }

    /// Returns true if this is a leaf node (no children of any kind)
    pub fn is_leaf(&self) -> bool {
        self.children().next().is_none()
    }
}

/// Iterator for traversing plan nodes depth-first
pub struct NodeIterator<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> NodeIterator<'a> {
    fn new(root: &'a Node) -> Self {
        Self { stack: vec![root] }
    }
}

impl<'a> Iterator for NodeIterator<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Push children in reverse order so we visit them in order
        let children: Vec<&Node> = node.children().collect();
        self.stack.extend(children.into_iter().rev());
        Some(node)
    }
}
