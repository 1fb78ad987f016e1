//! Depth Stack
//!
//! Open contexts of one text parse, keyed by indentation depth. A context is
//! a node that can still receive children, plus which of its child slots the
//! next node header goes into. Only the operations the assembler needs are
//! exposed; entries cannot be iterated.

use std::collections::BTreeMap;

/// Index of a node in the assembler's arena
pub(crate) type NodeId = usize;

/// Which child slot of a node the next attached node goes into
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ContextKind {
    PlanChild,
    InitPlan,
    SubPlan,
    /// Accepts exactly one body, then closes
    Cte(String),
}

/// One open context
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Context {
    /// `None` when a marker line appeared with no enclosing node
    pub node: Option<NodeId>,
    pub kind: ContextKind,
}

impl Context {
    pub fn plan_child(node: NodeId) -> Self {
        Self {
            node: Some(node),
            kind: ContextKind::PlanChild,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct DepthStack {
    entries: BTreeMap<usize, Context>,
}

impl DepthStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Closes every context opened at `depth` or deeper
    pub fn prune_from(&mut self, depth: usize) {
        let _closed = self.entries.split_off(&depth);
    }

    /// Closes the `InitPlan` / `SubPlan` / `CTE` contexts opened at `depth` or
    /// deeper; plan-child contexts stay open
    pub fn close_markers_from(&mut self, depth: usize) {
        self.entries
            .retain(|&key, context| key < depth || context.kind == ContextKind::PlanChild);
    }

    /// The deepest context strictly shallower than `depth`
    pub fn nearest_below(&self, depth: usize) -> Option<(usize, &Context)> {
        self.entries
            .range(..depth)
            .next_back()
            .map(|(&key, context)| (key, context))
    }

    pub fn insert(&mut self, depth: usize, context: Context) {
        self.entries.insert(depth, context);
    }

    pub fn remove(&mut self, depth: usize) -> Option<Context> {
        self.entries.remove(&depth)
    }
}

#[cfg(test)]
mod tests;
