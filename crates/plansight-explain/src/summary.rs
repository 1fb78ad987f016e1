//! Statement Summary
//!
//! `EXPLAIN ANALYZE` ends with a few lines that describe the statement as a
//! whole rather than any plan node:
//!
//! ```text
//! Planning Time: 0.214 ms
//! Trigger for constraint orders_user_id_fkey: time=0.402 calls=3
//! Execution Time: 12.871 ms
//! ```
//!
//! Servers before 9.4 print `Total runtime: X ms` instead of the execution
//! time line.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static PHASE_TIME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(Planning|Execution)\s+[Tt]ime:\s+(\d+(?:\.\d+)?)\s*ms$").expect("valid regex")
});

static TOTAL_RUNTIME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Total\s+runtime:\s+(\d+(?:\.\d+)?)\s*ms$").expect("valid regex")
});

static TRIGGER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Trigger\s+(.+?):\s+time=(\d+(?:\.\d+)?)\s+calls=(\d+)$").expect("valid regex")
});

/// Time spent in one trigger during execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerTiming {
    /// Trigger name as printed, e.g. `for constraint orders_user_id_fkey`
    pub name: String,
    pub time_ms: f64,
    pub calls: u64,
}

/// Statement-level timings reported alongside the plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementSummary {
    pub planning_time_ms: Option<f64>,
    pub execution_time_ms: Option<f64>,
    pub triggers: Vec<TriggerTiming>,
}

/// A statement-level line recognized in text output
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SummaryLine {
    PlanningTime(f64),
    ExecutionTime(f64),
    Trigger(TriggerTiming),
}

impl SummaryLine {
    /// Recognizes a trimmed line of text output
    pub fn parse(text: &str) -> Option<Self> {
        if let Some(caps) = PHASE_TIME_REGEX.captures(text) {
            let ms = caps[2].parse().ok()?;
            return Some(match &caps[1] {
                "Planning" => Self::PlanningTime(ms),
                _ => Self::ExecutionTime(ms),
            });
        }

        if let Some(caps) = TOTAL_RUNTIME_REGEX.captures(text) {
            return Some(Self::ExecutionTime(caps[1].parse().ok()?));
        }

        if let Some(caps) = TRIGGER_REGEX.captures(text) {
            return Some(Self::Trigger(TriggerTiming {
                name: caps[1].to_string(),
                time_ms: caps[2].parse().ok()?,
                calls: caps[3].parse().ok()?,
            }));
        }

        None
    }
}

impl StatementSummary {
    pub(crate) fn record(&mut self, line: SummaryLine) {
        match line {
            SummaryLine::PlanningTime(ms) => self.planning_time_ms = Some(ms),
            SummaryLine::ExecutionTime(ms) => self.execution_time_ms = Some(ms),
            SummaryLine::Trigger(trigger) => self.triggers.push(trigger),
        }
    }

    /// Total time spent in triggers
    pub fn trigger_time_ms(&self) -> f64 {
        self.triggers.iter().map(|t| t.time_ms).sum()
    }
}
