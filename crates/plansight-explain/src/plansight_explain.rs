//! Plansight Explain - PostgreSQL EXPLAIN output as a plan tree
//!
//! This crate provides functionality for:
//! - Parsing text-format `EXPLAIN` / `EXPLAIN ANALYZE` output, including
//!   `InitPlan`, `SubPlan` and `CTE` fragments
//! - Parsing `EXPLAIN (FORMAT JSON)` output into the same tree
//! - Inclusive and exclusive timing per node, and plain snapshots of the tree
//!
//! # Examples
//!
//! ```
//! use plansight_explain::Explain;
//!
//! let text = "\
//! Hash Join  (cost=1.07..2.18 rows=3 width=8) (actual time=0.050..0.060 rows=3 loops=1)
//!   Hash Cond: (a.id = b.id)
//!   ->  Seq Scan on a  (cost=0.00..1.03 rows=3 width=4) (actual time=0.005..0.007 rows=3 loops=1)
//!   ->  Hash  (cost=1.03..1.03 rows=3 width=4) (actual time=0.020..0.021 rows=3 loops=1)
//!         ->  Seq Scan on b  (cost=0.00..1.03 rows=3 width=4) (actual time=0.004..0.006 rows=3 loops=1)
//! Execution Time: 0.100 ms
//! ";
//!
//! let explain = Explain::from_text(text).unwrap();
//! let root = explain.root();
//!
//! assert_eq!(root.node_type(), "Hash Join");
//! assert_eq!(root.sub_nodes().len(), 2);
//! assert_eq!(explain.execution_time_ms(), Some(0.1));
//! assert!(root.total_exclusive_time().unwrap() < 0.06);
//! ```

mod assembler;
pub mod classify;
pub mod config;
mod depth_stack;
pub mod error;
pub mod explain;
mod json;
mod metrics;
pub mod node;
pub mod summary;

pub use assembler::DiscardedLine;
pub use classify::{ClassifyOptions, LineKind, MarkerKind, NodeHeader, classify_line};
pub use config::{InputFormat, ParserConfig, SourceFormat};
pub use error::{ExplainError, Result};
pub use explain::{Explain, ExplainBuilder};
pub use node::{ActualStats, Estimates, Execution, Node, NodeIterator, ScanTarget};
pub use summary::{StatementSummary, TriggerTiming};
