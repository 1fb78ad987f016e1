//! Tests for the depth stack

use super::*;
use pretty_assertions::assert_eq;

fn stack_with(depths: &[(usize, NodeId)]) -> DepthStack {
    let mut stack = DepthStack::new();
    for &(depth, node) in depths {
        stack.insert(depth, Context::plan_child(node));
    }
    stack
}

#[test]
fn test_new_stack_is_empty() {
    let stack = DepthStack::new();
    assert!(stack.is_empty());
    assert_eq!(stack.nearest_below(100), None);
}

#[test]
fn test_nearest_below_is_strict() {
    let stack = stack_with(&[(0, 0), (6, 1), (12, 2)]);

    assert_eq!(stack.nearest_below(12), Some((6, &Context::plan_child(1))));
    assert_eq!(stack.nearest_below(13), Some((12, &Context::plan_child(2))));
    assert_eq!(stack.nearest_below(0), None);
}

#[test]
fn test_prune_from_closes_same_and_deeper() {
    let mut stack = stack_with(&[(0, 0), (6, 1), (12, 2), (18, 3)]);

    stack.prune_from(12);

    assert_eq!(stack.nearest_below(usize::MAX), Some((6, &Context::plan_child(1))));
    stack.prune_from(0);
    assert!(stack.is_empty());
}

#[test]
fn test_close_markers_from_keeps_plan_children() {
    let mut stack = stack_with(&[(0, 0), (5, 1)]);
    stack.insert(
        2,
        Context {
            node: Some(0),
            kind: ContextKind::InitPlan,
        },
    );
    stack.insert(
        4,
        Context {
            node: Some(0),
            kind: ContextKind::Cte("x".to_string()),
        },
    );

    stack.close_markers_from(2);

    assert_eq!(stack.nearest_below(5), Some((0, &Context::plan_child(0))));
    assert_eq!(stack.nearest_below(6), Some((5, &Context::plan_child(1))));
}

#[test]
fn test_insert_replaces_same_depth() {
    let mut stack = stack_with(&[(4, 0)]);
    stack.insert(
        4,
        Context {
            node: Some(0),
            kind: ContextKind::InitPlan,
        },
    );

    let (_, context) = stack.nearest_below(5).expect("context");
    assert_eq!(context.kind, ContextKind::InitPlan);
}

#[test]
fn test_remove() {
    let mut stack = stack_with(&[(0, 0), (2, 1)]);

    assert_eq!(stack.remove(2), Some(Context::plan_child(1)));
    assert_eq!(stack.remove(2), None);
    assert_eq!(stack.nearest_below(10), Some((0, &Context::plan_child(0))));
}
