//! Metrics Engine
//!
//! Timing figures and plain-data snapshots computed from a finished tree.
//! Nothing here runs during parsing.
//!
//! PostgreSQL reports `actual time` per loop, so a node's inclusive time is
//! `loops × time_last`. Its exclusive time subtracts the inclusive time of
//! every child whose work is charged to it (sub nodes, initplans, subplans).
//! CTE bodies are charged to the CTE Scan nodes reading them, not to the node
//! that declares them, so they are left out.

use crate::node::Node;
use serde_json::{Map, Number, Value};

impl Node {
    /// Total time spent in this node and everything below it, in milliseconds.
    ///
    /// `None` when the node has no loop count or no last-row time.
    pub fn total_inclusive_time(&self) -> Option<f64> {
        let loops = self.actual_loops()?;
        let time_last = self.actual_time_last()?;
        Some(loops as f64 * time_last)
    }

    /// Time spent in this node alone, in milliseconds. Never negative.
    ///
    /// Children without timing count as zero.
    pub fn total_exclusive_time(&self) -> Option<f64> {
        let inclusive = self.total_inclusive_time()?;
        let children: f64 = self
            .timed_children()
            .filter_map(Node::total_inclusive_time)
            .sum();
        Some((inclusive - children).max(0.0))
    }

    /// True when the node came from an `EXPLAIN ANALYZE` run
    pub fn is_analyzed(&self) -> bool {
        self.actual_loops().is_some() || self.never_executed()
    }

    /// Plain, ordered representation of this subtree.
    ///
    /// Only defined fields are emitted, followed by `is_analyzed`. Integral
    /// numbers are written without a fractional part.
    pub fn snapshot(&self) -> Value {
        let mut map = Map::new();

        map.insert("type".into(), Value::from(self.node_type()));
        map.insert(
            "estimated_startup_cost".into(),
            number(self.estimated_startup_cost()),
        );
        map.insert(
            "estimated_total_cost".into(),
            number(self.estimated_total_cost()),
        );
        map.insert("estimated_rows".into(), Value::from(self.estimated_rows()));
        map.insert(
            "estimated_row_width".into(),
            Value::from(self.estimated_row_width()),
        );

        if let Some(time) = self.actual_time_first() {
            map.insert("actual_time_first".into(), number(time));
        }
        if let Some(time) = self.actual_time_last() {
            map.insert("actual_time_last".into(), number(time));
        }
        if let Some(rows) = self.actual_rows() {
            map.insert("actual_rows".into(), Value::from(rows));
        }
        if let Some(loops) = self.actual_loops() {
            map.insert("actual_loops".into(), Value::from(loops));
        }
        if self.never_executed() {
            map.insert("never_executed".into(), Value::Bool(true));
        }

        if let Some(scan_on) = self.scan_on() {
            let mut target = Map::new();
            if let Some(name) = &scan_on.table_name {
                target.insert("table_name".into(), Value::from(name.as_str()));
            }
            if let Some(alias) = &scan_on.table_alias {
                target.insert("table_alias".into(), Value::from(alias.as_str()));
            }
            if let Some(index) = &scan_on.index_name {
                target.insert("index_name".into(), Value::from(index.as_str()));
            }
            map.insert("scan_on".into(), Value::Object(target));
        }

        if !self.extra_info().is_empty() {
            map.insert(
                "extra_info".into(),
                self.extra_info().iter().map(String::as_str).collect(),
            );
        }

        for (key, children) in [
            ("sub_nodes", self.sub_nodes()),
            ("initplans", self.initplans()),
            ("subplans", self.subplans()),
        ] {
            if !children.is_empty() {
                map.insert(key.into(), children.iter().map(Node::snapshot).collect());
            }
        }

        if !self.ctes().is_empty() {
            let ctes: Map<String, Value> = self
                .ctes()
                .iter()
                .map(|(name, body)| (name.clone(), body.snapshot()))
                .collect();
            map.insert("ctes".into(), Value::Object(ctes));
        }

        map.insert("is_analyzed".into(), Value::Bool(self.is_analyzed()));

        Value::Object(map)
    }
}

/// Converts a float to JSON, dropping the fraction when the value is integral
pub(crate) fn number(value: f64) -> Value {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15 {
        return Value::from(value as i64);
    }
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}
