//! Common test fixtures and helpers

#![allow(dead_code)]

use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Installs a test-writer subscriber once. Set `RUST_LOG=plansight_explain=trace`
/// to see how lines are attached.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Asserts two timings agree to within a microsecond
pub fn assert_ms(actual: Option<f64>, expected: f64) {
    let actual = actual.expect("timing is undefined");
    assert!(
        (actual - expected).abs() < 0.001,
        "expected {expected} ms, got {actual} ms"
    );
}

pub const HASH_JOIN_TEXT: &str = "\
Hash Join  (cost=1.09..2.19 rows=3 width=8) (actual time=0.040..0.050 rows=3 loops=1)
  Hash Cond: (a.id = bb.id)
  InitPlan 1 (returns $0)
    ->  Result  (cost=0.00..0.01 rows=1 width=4) (actual time=0.001..0.002 rows=1 loops=1)
  ->  Seq Scan on a  (cost=0.00..1.03 rows=3 width=4) (actual time=0.005..0.007 rows=3 loops=1)
        Filter: (x > $0)
        Rows Removed by Filter: 2
  ->  Hash  (cost=1.03..1.03 rows=3 width=4) (actual time=0.020..0.021 rows=3 loops=1)
        ->  Index Scan using b_pkey on b bb  (cost=0.00..1.03 rows=3 width=4) (actual time=0.004..0.006 rows=3 loops=1)
Planning Time: 0.080 ms
Execution Time: 0.100 ms
";

pub const HASH_JOIN_JSON: &str = r#"[
  {
    "Plan": {
      "Node Type": "Hash Join",
      "Parallel Aware": false,
      "Join Type": "Inner",
      "Startup Cost": 1.09,
      "Total Cost": 2.19,
      "Plan Rows": 3,
      "Plan Width": 8,
      "Actual Startup Time": 0.040,
      "Actual Total Time": 0.050,
      "Actual Rows": 3,
      "Actual Loops": 1,
      "Inner Unique": false,
      "Hash Cond": "(a.id = bb.id)",
      "Plans": [
        {
          "Node Type": "Result",
          "Parent Relationship": "InitPlan",
          "Subplan Name": "InitPlan 1 (returns $0)",
          "Parallel Aware": false,
          "Startup Cost": 0.00,
          "Total Cost": 0.01,
          "Plan Rows": 1,
          "Plan Width": 4,
          "Actual Startup Time": 0.001,
          "Actual Total Time": 0.002,
          "Actual Rows": 1,
          "Actual Loops": 1
        },
        {
          "Node Type": "Seq Scan",
          "Parent Relationship": "Outer",
          "Parallel Aware": false,
          "Relation Name": "a",
          "Alias": "a",
          "Startup Cost": 0.00,
          "Total Cost": 1.03,
          "Plan Rows": 3,
          "Plan Width": 4,
          "Actual Startup Time": 0.005,
          "Actual Total Time": 0.007,
          "Actual Rows": 3,
          "Actual Loops": 1,
          "Filter": "(x > $0)",
          "Rows Removed by Filter": 2
        },
        {
          "Node Type": "Hash",
          "Parent Relationship": "Inner",
          "Parallel Aware": false,
          "Startup Cost": 1.03,
          "Total Cost": 1.03,
          "Plan Rows": 3,
          "Plan Width": 4,
          "Actual Startup Time": 0.020,
          "Actual Total Time": 0.021,
          "Actual Rows": 3,
          "Actual Loops": 1,
          "Hash Buckets": 1024,
          "Plans": [
            {
              "Node Type": "Index Scan",
              "Parent Relationship": "Outer",
              "Parallel Aware": false,
              "Scan Direction": "Forward",
              "Index Name": "b_pkey",
              "Relation Name": "b",
              "Alias": "bb",
              "Startup Cost": 0.00,
              "Total Cost": 1.03,
              "Plan Rows": 3,
              "Plan Width": 4,
              "Actual Startup Time": 0.004,
              "Actual Total Time": 0.006,
              "Actual Rows": 3,
              "Actual Loops": 1
            }
          ]
        }
      ]
    },
    "Planning Time": 0.080,
    "Triggers": [],
    "Execution Time": 0.100
  }
]"#;

pub const CTE_TWICE_TEXT: &str = "\
Nested Loop  (cost=10.00..50040.00 rows=1000 width=8) (actual time=0.033..1001.087 rows=1 loops=1)
  Join Filter: (t1.i = t2.i)
  CTE test
    ->  Function Scan on generate_series i  (cost=0.00..10.00 rows=1000 width=4) (actual time=0.020..1000.001 rows=1000 loops=1)
  ->  CTE Scan on test t1  (cost=0.00..20.00 rows=1000 width=4) (actual time=0.030..1000.003 rows=1 loops=1)
  ->  CTE Scan on test t2  (cost=0.00..20.00 rows=1000 width=4) (actual time=0.001..1.082 rows=1 loops=1)
Planning Time: 0.112 ms
Execution Time: 1001.210 ms
";
