// SPDX-License-Identifier: Apache-2.0

//! Traversals over the XAG arena.
//!
//! The arena is append-only and every gate's fan-ins point at strictly
//! smaller ids (checked by `XagFn::check_invariants_with_debug_assert`,
//! which doubles as the acyclicity proof), so ascending id order is
//! already a topological order. What remains here is the two traversals
//! that need more than id order: a postorder that tracks operand polarity,
//! and cone extraction limited to a set of roots.

use crate::gate::{XagNode, XagOperand, XagRef};
use std::collections::HashSet;

/// Postorder over operands (dedup by node-plus-polarity) reachable from
/// `starts`. Uses a two-phase stack: a frame is pushed once to expand its
/// dependencies and a second time to emit it.
pub fn post_order_operands(
    starts: &[XagOperand],
    nodes: &[XagNode],
    discard_inputs: bool,
) -> Vec<XagOperand> {
    debug_assert!(
        !starts.is_empty(),
        "post_order_operands: no start operands (degenerate graph)"
    );
    let mut emitted: HashSet<XagOperand> = HashSet::new();
    let mut postorder = Vec::new();
    let mut stack: Vec<(XagOperand, bool)> = starts.iter().rev().map(|s| (*s, false)).collect();
    while let Some((op, expand_done)) = stack.pop() {
        debug_assert!(
            op.node.id < nodes.len(),
            "post_order_operands: operand %{} out of bounds ({} nodes)",
            op.node.id,
            nodes.len()
        );
        if expand_done {
            let keep = match &nodes[op.node.id] {
                XagNode::Input { .. } => op.negated || !discard_inputs,
                _ => true,
            };
            if keep {
                postorder.push(op);
            }
            continue;
        }
        if !emitted.insert(op) {
            continue;
        }
        stack.push((op, true));
        for dep in nodes[op.node.id].get_operands().into_iter().rev() {
            if !emitted.contains(&dep) {
                stack.push((dep, false));
            }
        }
    }
    postorder
}

/// Transitive fan-in cones of `start_nodes`, split into internal nodes
/// (gates and literals, ascending id order) and the primary inputs feeding
/// them. Because fan-ins only point backwards, a single descending mark
/// sweep reaches the whole cone.
pub fn extract_cone(start_nodes: &[XagRef], gates: &[XagNode]) -> (Vec<XagRef>, Vec<XagRef>) {
    let mut marked = vec![false; gates.len()];
    for s in start_nodes {
        marked[s.id] = true;
    }
    for id in (0..gates.len()).rev() {
        if !marked[id] {
            continue;
        }
        for arg in gates[id].get_args() {
            marked[arg.id] = true;
        }
    }
    let mut cone = Vec::new();
    let mut inputs = Vec::new();
    for (id, node) in gates.iter().enumerate() {
        if !marked[id] {
            continue;
        }
        match node {
            XagNode::Input { .. } => inputs.push(XagRef { id }),
            _ => cone.push(XagRef { id }),
        }
    }
    (cone, inputs)
}
