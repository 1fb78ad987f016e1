//! Tree Assembler
//!
//! Rebuilds the plan tree from text-format EXPLAIN output in one pass. The
//! only structural signal is the depth of each line (see [`crate::classify`]),
//! so the assembler keeps a [`DepthStack`] of open contexts:
//!
//! - a node header closes every context at its depth or deeper, plus any
//!   marker context at its arrow column or deeper, attaches to the nearest
//!   shallower context, and opens a plan-child context of its own at its full
//!   depth (arrow included);
//! - an `InitPlan` / `SubPlan` / `CTE` marker closes the same way and opens a
//!   context that redirects the next node header into that child slot of the
//!   enclosing node (a CTE context closes after its single body);
//! - any other line becomes extra info of the nearest strictly shallower node.
//!
//! Nodes are held in an arena while the parse runs and moved into an owned
//! tree by [`TreeAssembler::finish`].

use crate::classify::{ClassifyOptions, LineKind, MarkerKind, classify_line};
use crate::config::ParserConfig;
use crate::depth_stack::{Context, ContextKind, DepthStack, NodeId};
use crate::error::{ExplainError, Result};
use crate::node::Node;
use crate::summary::{StatementSummary, SummaryLine};
use serde::{Deserialize, Serialize};

/// A non-blank line the text reader could not place in the tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscardedLine {
    /// 1-based line number in the source
    pub line_number: usize,
    pub text: String,
}

/// Everything the text reader produces
#[derive(Debug)]
pub(crate) struct TextPlan {
    pub root: Node,
    pub summary: StatementSummary,
    pub discarded_lines: Vec<DiscardedLine>,
    pub discarded_count: usize,
}

#[derive(Debug)]
struct Slot {
    line_number: usize,
    node: Node,
    sub_nodes: Vec<NodeId>,
    initplans: Vec<NodeId>,
    subplans: Vec<NodeId>,
    ctes: Vec<(String, NodeId)>,
}

impl Slot {
    fn new(line_number: usize, node: Node) -> Self {
        Self {
            line_number,
            node,
            sub_nodes: Vec::new(),
            initplans: Vec::new(),
            subplans: Vec::new(),
            ctes: Vec::new(),
        }
    }
}

/// Single-use builder for one text parse
#[derive(Debug)]
pub(crate) struct TreeAssembler {
    options: ClassifyOptions,
    collect_discarded: bool,
    stack: DepthStack,
    slots: Vec<Slot>,
    root: Option<NodeId>,
    summary: StatementSummary,
    discarded_lines: Vec<DiscardedLine>,
    discarded_count: usize,
}

impl TreeAssembler {
    pub fn new(config: &ParserConfig) -> Self {
        Self {
            options: ClassifyOptions {
                cte_aware: config.cte_aware,
                strip_trailing_quote: config.strip_trailing_quote,
            },
            collect_discarded: config.collect_discarded_lines,
            stack: DepthStack::new(),
            slots: Vec::new(),
            root: None,
            summary: StatementSummary::default(),
            discarded_lines: Vec::new(),
            discarded_count: 0,
        }
    }

    /// Feeds the next source line. `line_number` is 1-based.
    pub fn feed(&mut self, line_number: usize, line: &str) -> Result<()> {
        match classify_line(line, self.options) {
            LineKind::NodeHeader {
                depth,
                indent,
                header,
            } => self.on_node_header(line_number, depth, indent, header.into_node()),
            LineKind::StructureMarker { depth, kind } => {
                let kind = match kind {
                    MarkerKind::InitPlan => ContextKind::InitPlan,
                    MarkerKind::SubPlan => ContextKind::SubPlan,
                };
                self.on_marker(line_number, depth, kind);
                Ok(())
            }
            LineKind::CteMarker { depth, name } => {
                self.on_marker(line_number, depth, ContextKind::Cte(name.to_string()));
                Ok(())
            }
            LineKind::ExtraInfo { depth, text } => {
                self.on_extra_info(line_number, depth, text);
                Ok(())
            }
            LineKind::Ignore => Ok(()),
        }
    }

    fn on_node_header(
        &mut self,
        line_number: usize,
        depth: usize,
        indent: usize,
        node: Node,
    ) -> Result<()> {
        let id = self.slots.len();

        if self.stack.is_empty() {
            tracing::trace!(line = line_number, depth, node_type = node.node_type(), "root node");
            self.slots.push(Slot::new(line_number, node));
            self.root = Some(id);
            self.stack.insert(depth, Context::plan_child(id));
            return Ok(());
        }

        // A marker printed at or right of this node's arrow column is a sibling
        // of this node, not its parent.
        self.stack.prune_from(depth);
        self.stack.close_markers_from(indent);
        let Some((parent_depth, parent)) = self.stack.nearest_below(depth) else {
            return Err(ExplainError::structural(
                line_number,
                format!("\"{}\" has no enclosing plan node", node.node_type()),
            ));
        };
        let Context { node: parent_node, kind } = parent.clone();
        let Some(parent_id) = parent_node else {
            return Err(ExplainError::structural(
                line_number,
                format!(
                    "{} opened at depth {parent_depth} has no enclosing plan node",
                    kind_label(&kind)
                ),
            ));
        };

        tracing::trace!(
            line = line_number,
            depth,
            parent_depth,
            node_type = node.node_type(),
            slot = kind_label(&kind),
            "attaching plan node"
        );
        self.slots.push(Slot::new(line_number, node));
        self.stack.insert(depth, Context::plan_child(id));

        let parent = &mut self.slots[parent_id];
        match kind {
            ContextKind::PlanChild => parent.sub_nodes.push(id),
            ContextKind::InitPlan => parent.initplans.push(id),
            ContextKind::SubPlan => parent.subplans.push(id),
            ContextKind::Cte(name) => {
                if parent.ctes.iter().any(|(existing, _)| *existing == name) {
                    return Err(ExplainError::structural(
                        line_number,
                        format!("CTE \"{name}\" already has a body"),
                    ));
                }
                parent.ctes.push((name, id));
                self.stack.remove(parent_depth);
            }
        }

        Ok(())
    }

    fn on_marker(&mut self, line_number: usize, depth: usize, kind: ContextKind) {
        self.stack.prune_from(depth);
        let node = self
            .stack
            .nearest_below(depth)
            .and_then(|(_, context)| context.node);

        tracing::debug!(
            line = line_number,
            depth,
            marker = kind_label(&kind),
            enclosed = node.is_some(),
            "opening marker context"
        );
        self.stack.insert(depth, Context { node, kind });
    }

    fn on_extra_info(&mut self, line_number: usize, depth: usize, text: &str) {
        if let Some(summary_line) = SummaryLine::parse(text) {
            self.summary.record(summary_line);
            return;
        }

        let owner = self
            .stack
            .nearest_below(depth)
            .and_then(|(_, context)| context.node);

        match owner {
            Some(id) => self.slots[id].node.push_extra_info(text.to_string()),
            None => self.discard(line_number, text),
        }
    }

    fn discard(&mut self, line_number: usize, text: &str) {
        tracing::debug!(line = line_number, text, "discarding line outside any plan node");
        self.discarded_count += 1;
        if self.collect_discarded {
            self.discarded_lines.push(DiscardedLine {
                line_number,
                text: text.to_string(),
            });
        }
    }

    /// Moves the arena into an owned tree
    pub fn finish(self) -> Result<TextPlan> {
        let root_id = self.root.ok_or(ExplainError::NoPlan)?;
        let root_line = self.slots.get(root_id).map_or(1, |slot| slot.line_number);
        let mut slots: Vec<Option<Slot>> = self.slots.into_iter().map(Some).collect();
        let root = detach(&mut slots, root_id, root_line)?;

        Ok(TextPlan {
            root,
            summary: self.summary,
            discarded_lines: self.discarded_lines,
            discarded_count: self.discarded_count,
        })
    }
}

/// `referenced_at` is the line of the node that holds `id`, for error reports
fn detach(slots: &mut [Option<Slot>], id: NodeId, referenced_at: usize) -> Result<Node> {
    let slot = slots.get_mut(id).and_then(Option::take).ok_or_else(|| {
        ExplainError::structural(referenced_at, format!("node #{id} attached twice"))
    })?;
    let line = slot.line_number;

    let mut node = slot.node;
    for child in slot.sub_nodes {
        node.push_sub_node(detach(slots, child, line)?);
    }
    for child in slot.initplans {
        node.push_initplan(detach(slots, child, line)?);
    }
    for child in slot.subplans {
        node.push_subplan(detach(slots, child, line)?);
    }
    for (name, child) in slot.ctes {
        let body = detach(slots, child, line)?;
        if !node.insert_cte(name.clone(), body) {
            return Err(ExplainError::structural(
                slot.line_number,
                format!("CTE \"{name}\" already has a body"),
            ));
        }
    }

    Ok(node)
}

fn kind_label(kind: &ContextKind) -> &'static str {
    match kind {
        ContextKind::PlanChild => "plan child",
        ContextKind::InitPlan => "InitPlan",
        ContextKind::SubPlan => "SubPlan",
        ContextKind::Cte(_) => "CTE",
    }
}

/// Parses text-format EXPLAIN output into a plan tree
#[tracing::instrument(level = "debug", skip_all, fields(bytes = source.len()))]
pub(crate) fn parse_text(source: &str, config: &ParserConfig) -> Result<TextPlan> {
    let mut assembler = TreeAssembler::new(config);

    for (index, line) in source.lines().enumerate() {
        if let Err(err) = assembler.feed(index + 1, line) {
            tracing::warn!(error = %err, "failed to assemble plan tree");
            return Err(err);
        }
    }

    let plan = assembler.finish()?;
    tracing::debug!(
        nodes = plan.root.node_count(),
        discarded = plan.discarded_count,
        "assembled plan tree"
    );
    Ok(plan)
}
