//! JSON Reader
//!
//! Reads `EXPLAIN (FORMAT JSON)` output. The structure is explicit here, so
//! this is a plain recursive walk over `Plan` / `Plans`. Node names are
//! rebuilt the way the text format prints them (`Hash Left Join`,
//! `HashAggregate`, `Parallel Seq Scan`, `CTE Scan on x t`) so that both
//! renditions of one plan produce the same tree.
//!
//! ```json
//! [
//!   {
//!     "Plan": {
//!       "Node Type": "Seq Scan",
//!       "Relation Name": "users",
//!       "Alias": "users",
//!       "Startup Cost": 0.00,
//!       "Total Cost": 10.50,
//!       "Plan Rows": 100,
//!       "Plan Width": 36
//!     },
//!     "Planning Time": 0.081
//!   }
//! ]
//! ```

use crate::config::ParserConfig;
use crate::error::{ExplainError, Result};
use crate::node::{ActualStats, Estimates, Execution, Node, ScanTarget};
use crate::summary::{StatementSummary, TriggerTiming};
use serde_json::Value;

/// Node types whose target is split into [`ScanTarget`] instead of the name
const SCAN_NODE_TYPES: &[&str] = &[
    "Seq Scan",
    "Bitmap Heap Scan",
    "Bitmap Index Scan",
    "Index Scan",
    "Index Only Scan",
];

/// Keys printed as `Key: value` lines under a node in text output
const DETAIL_KEYS: &[&str] = &[
    "Output",
    "Cache Key",
    "Index Cond",
    "Recheck Cond",
    "Rows Removed by Index Recheck",
    "TID Cond",
    "Merge Cond",
    "Hash Cond",
    "Join Filter",
    "Rows Removed by Join Filter",
    "One-Time Filter",
    "Filter",
    "Rows Removed by Filter",
    "Sort Key",
    "Presorted Key",
    "Group Key",
    "Function Call",
    "Heap Fetches",
    "Workers Planned",
    "Workers Launched",
];

/// Everything the JSON reader produces
#[derive(Debug)]
pub(crate) struct JsonPlan {
    pub root: Node,
    pub summary: StatementSummary,
}

/// Parses `EXPLAIN (FORMAT JSON)` output into a plan tree
#[tracing::instrument(level = "debug", skip_all, fields(bytes = source.len()))]
pub(crate) fn parse_json(source: &str, config: &ParserConfig) -> Result<JsonPlan> {
    let value: Value = serde_json::from_str(source)?;

    // PostgreSQL wraps the statement in a one-element array
    let statement = match &value {
        Value::Array(items) => items.first().ok_or(ExplainError::NoPlan)?,
        Value::Object(_) => &value,
        _ => return Err(ExplainError::NoPlan),
    };
    let plan = statement.get("Plan").ok_or(ExplainError::NoPlan)?;

    let root = match parse_plan_node(plan, config) {
        Ok(root) => root,
        Err(err) => {
            tracing::warn!(error = %err, "failed to read JSON plan");
            return Err(err);
        }
    };
    let summary = parse_summary(statement);

    tracing::debug!(nodes = root.node_count(), "read JSON plan");
    Ok(JsonPlan { root, summary })
}

fn parse_summary(statement: &Value) -> StatementSummary {
    let mut summary = StatementSummary {
        planning_time_ms: statement.get("Planning Time").and_then(Value::as_f64),
        execution_time_ms: statement
            .get("Execution Time")
            .or_else(|| statement.get("Total Runtime"))
            .and_then(Value::as_f64),
        triggers: Vec::new(),
    };

    if let Some(triggers) = statement.get("Triggers").and_then(Value::as_array) {
        for trigger in triggers {
            let name = match (
                trigger.get("Constraint Name").and_then(Value::as_str),
                trigger.get("Trigger Name").and_then(Value::as_str),
            ) {
                (Some(constraint), _) => format!("for constraint {constraint}"),
                (None, Some(name)) => name.to_string(),
                (None, None) => continue,
            };
            summary.triggers.push(TriggerTiming {
                name,
                time_ms: trigger.get("Time").and_then(Value::as_f64).unwrap_or(0.0),
                calls: trigger.get("Calls").and_then(as_count).unwrap_or(0),
            });
        }
    }

    summary
}

/// Parses a single plan node from JSON
fn parse_plan_node(value: &Value, config: &ParserConfig) -> Result<Node> {
    let node_type = value
        .get("Node Type")
        .and_then(Value::as_str)
        .ok_or_else(|| ExplainError::InvalidJsonPlan("node is missing \"Node Type\"".into()))?;

    let estimates = Estimates::new(
        required(value, node_type, "Startup Cost", Value::as_f64)?,
        required(value, node_type, "Total Cost", Value::as_f64)?,
        required(value, node_type, "Plan Rows", as_count)?,
        required(value, node_type, "Plan Width", as_count)?,
    );

    let (name, scan_on) = display_name(value, node_type);
    let mut node = Node::with_canonical_type(name, scan_on, estimates)
        .with_execution(parse_execution(value));

    if let Some(obj) = value.as_object() {
        for (key, detail) in obj {
            if DETAIL_KEYS.contains(&key.as_str())
                && let Some(text) = render_detail(detail)
            {
                node.push_extra_info(format!("{key}: {text}"));
            }
        }
    }

    // Parse child plans
    if let Some(plans) = value.get("Plans").and_then(Value::as_array) {
        for child_value in plans {
            let child = parse_plan_node(child_value, config)?;
            let relationship = child_value
                .get("Parent Relationship")
                .and_then(Value::as_str);
            let cte_name = child_value
                .get("Subplan Name")
                .and_then(Value::as_str)
                .and_then(|name| name.strip_prefix("CTE "))
                .filter(|_| config.cte_aware);

            match (cte_name, relationship) {
                (Some(name), _) => {
                    if !node.insert_cte(name.to_string(), child) {
                        return Err(ExplainError::InvalidJsonPlan(format!(
                            "CTE \"{name}\" appears twice under one node"
                        )));
                    }
                }
                (None, Some("InitPlan")) => node.push_initplan(child),
                (None, Some("SubPlan")) => node.push_subplan(child),
                (None, _) => node.push_sub_node(child),
            }
        }
    }

    Ok(node)
}

fn parse_execution(value: &Value) -> Execution {
    let Some(loops) = value.get("Actual Loops").and_then(as_count) else {
        return Execution::Estimated;
    };
    if loops == 0 {
        return Execution::NeverExecuted;
    }

    let first = value.get("Actual Startup Time").and_then(Value::as_f64);
    let last = value.get("Actual Total Time").and_then(Value::as_f64);
    let rows = value.get("Actual Rows").and_then(as_count);
    match (first, last, rows) {
        (Some(time_first), Some(time_last), Some(rows)) => Execution::Analyzed(ActualStats {
            time_first,
            time_last,
            rows,
            loops,
        }),
        // TIMING OFF reports rows and loops only
        _ => Execution::Estimated,
    }
}

/// Rebuilds the step phrase text output would print for this node
fn display_name(value: &Value, node_type: &str) -> (String, Option<ScanTarget>) {
    let text = |key: &str| value.get(key).and_then(Value::as_str);

    let mut name = match (node_type, text("Strategy"), text("Operation")) {
        ("Aggregate", Some("Hashed"), _) => "HashAggregate".to_string(),
        ("Aggregate", Some("Sorted"), _) => "GroupAggregate".to_string(),
        ("Aggregate", Some("Mixed"), _) => "MixedAggregate".to_string(),
        ("SetOp", Some("Hashed"), _) => "HashSetOp".to_string(),
        ("ModifyTable", _, Some(operation)) => operation.to_string(),
        _ => node_type.to_string(),
    };

    if let Some(mode @ ("Partial" | "Finalize")) = text("Partial Mode") {
        name = format!("{mode} {name}");
    }

    if let Some(join_type) = text("Join Type")
        && join_type != "Inner"
    {
        let base = name.strip_suffix(" Join").unwrap_or(&name);
        name = format!("{base} {join_type} Join");
    }

    if value.get("Parallel Aware").and_then(Value::as_bool) == Some(true) {
        name = format!("Parallel {name}");
    }

    if text("Scan Direction") == Some("Backward") {
        name.push_str(" Backward");
    }

    let relation = text("Relation Name");
    let alias = text("Alias");

    if SCAN_NODE_TYPES.contains(&node_type) {
        let scan_on = ScanTarget::from_parts(
            relation.map(str::to_string),
            alias.filter(|a| Some(*a) != relation).map(str::to_string),
            text("Index Name").map(str::to_string),
        );
        return (name, scan_on);
    }

    let target = relation
        .or_else(|| text("CTE Name"))
        .or_else(|| text("Function Name"))
        .or_else(|| text("Tuplestore Name"));
    match (target, alias) {
        (Some(target), Some(alias)) if alias != target => {
            name = format!("{name} on {target} {alias}");
        }
        (Some(target), _) => name = format!("{name} on {target}"),
        (None, Some(alias)) => name = format!("{name} on {alias}"),
        (None, None) => {}
    }

    (name, None)
}

fn render_detail(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(render_detail)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Value::Null | Value::Object(_) => None,
    }
}

fn required<T>(
    value: &Value,
    node_type: &str,
    key: &str,
    read: impl Fn(&Value) -> Option<T>,
) -> Result<T> {
    value.get(key).and_then(read).ok_or_else(|| {
        ExplainError::InvalidJsonPlan(format!("\"{node_type}\" node has no numeric \"{key}\""))
    })
}

/// Reads a row or loop count. Newer servers print fractional averages.
fn as_count(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f.round() as u64)
    })
}
