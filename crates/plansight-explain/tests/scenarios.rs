//! End-to-end parsing scenarios for text and JSON EXPLAIN output

mod common;

use common::{CTE_TWICE_TEXT, HASH_JOIN_JSON, HASH_JOIN_TEXT, assert_ms, init_tracing};
use indoc::indoc;
use plansight_explain::{Explain, ExplainError, ParserConfig, SourceFormat};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::io::Write;

// ============ Estimated Plans ============

#[test]
fn single_seq_scan_without_analyze() {
    init_tracing();
    let explain = Explain::from_text("Seq Scan on tenk1  (cost=0.00..333.00 rows=10000 width=148)")
        .expect("parse failed");
    let root = explain.root();

    assert_eq!(root.node_type(), "Seq Scan");
    assert_eq!(
        root.scan_on().and_then(|s| s.table_name.as_deref()),
        Some("tenk1")
    );
    assert_eq!(root.estimated_total_cost(), 333.0);
    assert_eq!(root.actual_loops(), None);
    assert_eq!(root.actual_time_last(), None);
    assert!(!explain.is_analyzed());
    assert_eq!(
        root.snapshot(),
        json!({
            "type": "Seq Scan",
            "estimated_startup_cost": 0,
            "estimated_total_cost": 333,
            "estimated_rows": 10000,
            "estimated_row_width": 148,
            "scan_on": { "table_name": "tenk1" },
            "is_analyzed": false
        })
    );
}

// ============ CTEs ============

#[test]
fn cte_referenced_twice() {
    init_tracing();
    let explain = Explain::from_text(CTE_TWICE_TEXT).expect("parse failed");
    let root = explain.root();

    assert_eq!(root.node_type(), "Nested Loop");
    assert_eq!(root.ctes().len(), 1);
    assert_eq!(
        root.ctes()["test"].node_type(),
        "Function Scan on generate_series i"
    );
    let scans: Vec<&str> = root.sub_nodes().iter().map(|n| n.node_type()).collect();
    assert_eq!(scans, vec!["CTE Scan on test t1", "CTE Scan on test t2"]);

    assert_ms(root.total_inclusive_time(), 1001.087);
    assert_ms(root.total_exclusive_time(), 0.002);
    assert_ms(explain.execution_time_ms(), 1001.210);
    assert_eq!(root.extra_info(), ["Join Filter: (t1.i = t2.i)"]);
}

// ============ Never Executed ============

#[test]
fn never_executed_branch() {
    init_tracing();
    let text = indoc! {"
        Nested Loop  (cost=0.29..16.34 rows=1 width=8) (actual time=0.012..0.013 rows=0 loops=1)
          ->  Seq Scan on a  (cost=0.00..8.00 rows=1 width=4) (actual time=0.010..0.010 rows=0 loops=1)
                Filter: (id = 42)
          ->  Index Scan using b_pkey on b  (cost=0.29..8.31 rows=1 width=4) (never executed)
                Index Cond: (id = a.id)
    "};

    let explain = Explain::from_text(text).expect("parse failed");
    let never = &explain.root().sub_nodes()[1];

    assert_eq!(never.node_type(), "Index Scan");
    assert_eq!(never.actual_loops(), Some(0));
    assert!(never.never_executed());
    assert!(never.is_analyzed());
    assert_eq!(never.total_inclusive_time(), None);
    assert_eq!(never.extra_info(), ["Index Cond: (id = a.id)"]);
    assert_ms(explain.root().total_exclusive_time(), 0.003);
}

// ============ Malformed Input ============

#[test]
fn initplan_marker_before_any_node() {
    init_tracing();
    let text = indoc! {"
        InitPlan 1 (returns $0)
          ->  Result  (cost=0.00..0.01 rows=1 width=4)
        Result  (cost=0.00..0.01 rows=1 width=4)
    "};

    let err = Explain::from_text(text).expect_err("orphan InitPlan accepted");

    assert!(err.is_structural());
    assert!(matches!(err, ExplainError::Structural { line: 2, .. }));
}

#[test]
fn empty_and_junk_input_has_no_plan() {
    for source in ["", "   \n\n", "QUERY PLAN\n----------\n(0 rows)\n"] {
        let err = Explain::from_text(source).expect_err("accepted input without a plan");
        assert!(matches!(err, ExplainError::NoPlan), "source {source:?}");
    }
}

// ============ Indentation ============

#[test]
fn deepening_chain_then_dedent() {
    init_tracing();
    let text = indoc! {"
        Limit  (cost=0.00..4.00 rows=1 width=4)
          ->  Sort  (cost=0.00..3.00 rows=1 width=4)
                Sort Key: a
                ->  Unique  (cost=0.00..2.00 rows=1 width=4)
                      ->  Seq Scan on a  (cost=0.00..1.00 rows=1 width=4)
                ->  Seq Scan on b  (cost=0.00..1.00 rows=1 width=4)
          ->  Seq Scan on c  (cost=0.00..1.00 rows=1 width=4)
    "};

    let explain = Explain::from_text(text).expect("parse failed");
    let root = explain.root();
    let table = |n: &plansight_explain::Node| {
        n.scan_on()
            .and_then(|s| s.table_name.clone())
            .unwrap_or_default()
    };

    assert_eq!(root.sub_nodes().len(), 2);
    let sort = &root.sub_nodes()[0];
    assert_eq!(sort.extra_info(), ["Sort Key: a"]);
    assert_eq!(sort.sub_nodes().len(), 2);
    assert_eq!(table(&sort.sub_nodes()[0].sub_nodes()[0]), "a");
    assert_eq!(table(&sort.sub_nodes()[1]), "b");
    assert_eq!(table(&root.sub_nodes()[1]), "c");
    assert_eq!(root.depth(), 4);
    assert_eq!(explain.iter_nodes().count(), 6);
}

#[test]
fn psql_output_with_header_and_quotes() {
    init_tracing();
    let text = concat!(
        "                         QUERY PLAN\n",
        "------------------------------------------------------------\n",
        " Sort  (cost=1.05..1.06 rows=3 width=8)\"\n",
        "   Sort Key: a\"\n",
        "   ->  Seq Scan on t  (cost=0.00..1.03 rows=3 width=8)\"\n",
        "(3 rows)\n",
    );

    let explain = Explain::from_text(text).expect("parse failed");

    assert_eq!(explain.root().extra_info(), ["Sort Key: a"]);
    assert_eq!(explain.root().sub_nodes().len(), 1);
    let discarded: Vec<usize> = explain
        .discarded_lines()
        .iter()
        .map(|l| l.line_number)
        .collect();
    assert_eq!(discarded, vec![1, 2, 6]);
}

// ============ JSON ============

#[test]
fn json_and_text_agree() {
    init_tracing();
    let text = Explain::from_text(HASH_JOIN_TEXT).expect("text parse failed");
    let json = Explain::from_text(HASH_JOIN_JSON).expect("JSON parse failed");

    assert_eq!(text.format(), SourceFormat::Text);
    assert_eq!(json.format(), SourceFormat::Json);
    assert_eq!(text.snapshot(), json.snapshot());
    assert_eq!(
        text.root().total_exclusive_time(),
        json.root().total_exclusive_time()
    );
}

#[test]
fn initplan_printed_before_children() {
    let explain = Explain::from_text(HASH_JOIN_TEXT).expect("parse failed");
    let root = explain.root();

    assert_eq!(root.initplans().len(), 1);
    assert_eq!(root.sub_nodes().len(), 2);
    assert_eq!(
        root.sub_nodes()[0].extra_info(),
        ["Filter: (x > $0)", "Rows Removed by Filter: 2"]
    );
    // 0.050 - 0.007 - 0.021 - 0.002
    assert_ms(root.total_exclusive_time(), 0.020);
}

// ============ Sources ============

#[test]
fn file_source_with_config() {
    init_tracing();
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(CTE_TWICE_TEXT.as_bytes()).expect("write plan");

    let explain = Explain::builder()
        .source_file(file.path())
        .config(ParserConfig::default().with_cte_aware(false))
        .parse()
        .expect("parse failed");

    assert!(explain.root().ctes().is_empty());
    assert!(explain.root().extra_info().contains(&"CTE test".to_string()));
}

#[test]
fn config_file_drives_parse() {
    let mut config_file = tempfile::NamedTempFile::new().expect("temp file");
    config_file
        .write_all(b"format = \"text\"\ncollect_discarded_lines = false\n")
        .expect("write config");
    let config = ParserConfig::from_file(config_file.path()).expect("config load failed");

    let explain = Explain::builder()
        .source("junk\nResult  (cost=0.00..0.01 rows=1 width=4)")
        .config(config)
        .parse()
        .expect("parse failed");

    assert_eq!(explain.discarded_count(), 1);
    assert!(explain.discarded_lines().is_empty());
}
