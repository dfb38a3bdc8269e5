// SPDX-License-Identifier: Apache-2.0

//! Cleanup sweep: constant and duplicate-operand folding plus dead-node
//! compaction, in three array passes over the arena.
//!
//! The builder folds these identities as gates are created, but spliced or
//! externally loaded networks can reintroduce them (a substitution that
//! rewires a fan-in to the constant, an `x & x` from a no-fold load).
//! Fan-ins always point at smaller ids, so no pass needs a worklist:
//!
//! 1. forward, resolve every node to an alias operand -- `x & 0 = 0`,
//!    `x & 1 = x`, `x & x = x`, `x & !x = 0`, `x ^ 0 = x`, `x ^ 1 = !x`,
//!    `x ^ x = 0`, `x ^ !x = 1`, and stray `Literal` nodes collapse onto
//!    node 0 (possibly negated);
//! 2. backward, mark liveness through the resolved operands;
//! 3. forward again, emit the surviving gates with compacted ids.
//!
//! Primary inputs and the constant node are always kept so the I/O
//! signature of the network never changes.

use crate::gate::{Input, Output, XagBitVector, XagFn, XagNode, XagOperand, XagRef};

const FALSE: XagOperand = XagOperand {
    node: XagRef { id: 0 },
    negated: false,
};
const TRUE: XagOperand = XagOperand {
    node: XagRef { id: 0 },
    negated: true,
};

fn self_op(id: usize) -> XagOperand {
    XagOperand {
        node: XagRef { id },
        negated: false,
    }
}

/// Folds and sweeps: returns an equivalent network in which every gate is
/// reachable from an output, no gate reads the constant node, and node 0
/// is the only literal.
pub fn dce(orig_fn: &XagFn) -> XagFn {
    let n = orig_fn.gates.len();

    // Pass 1: aliases. An entry either points back at its own id (the node
    // survives folding) or at an earlier, already-resolved operand.
    // Resolution is single-step: alias targets are themselves self-aliased.
    let mut alias: Vec<XagOperand> = Vec::with_capacity(n);
    let resolve = |alias: &[XagOperand], op: &XagOperand| -> XagOperand {
        let target = alias[op.node.id];
        XagOperand {
            node: target.node,
            negated: target.negated ^ op.negated,
        }
    };
    for (id, node) in orig_fn.gates.iter().enumerate() {
        let folded = match node {
            XagNode::Literal(value) => {
                if *value {
                    TRUE
                } else {
                    FALSE
                }
            }
            XagNode::Input { .. } => self_op(id),
            XagNode::And2 { a, b } => {
                let (ra, rb) = (resolve(&alias, a), resolve(&alias, b));
                if ra == FALSE || rb == FALSE || ra == rb.negate() {
                    FALSE
                } else if ra == TRUE || ra == rb {
                    rb
                } else if rb == TRUE {
                    ra
                } else {
                    self_op(id)
                }
            }
            XagNode::Xor2 { a, b } => {
                let (ra, rb) = (resolve(&alias, a), resolve(&alias, b));
                if ra == rb {
                    FALSE
                } else if ra == rb.negate() {
                    TRUE
                } else if ra.node.id == 0 {
                    // x ^ 0 = x, x ^ 1 = !x.
                    if ra.negated {
                        rb.negate()
                    } else {
                        rb
                    }
                } else if rb.node.id == 0 {
                    if rb.negated {
                        ra.negate()
                    } else {
                        ra
                    }
                } else {
                    self_op(id)
                }
            }
        };
        alias.push(folded);
    }

    // Pass 2: liveness over the resolved graph, outputs downward. Every
    // consumer has a larger id than what it consumes, so one descending
    // sweep settles all counts.
    let mut live = vec![false; n];
    for op in orig_fn.output_operands() {
        live[resolve(&alias, &op).node.id] = true;
    }
    for id in (0..n).rev() {
        if !live[id] || alias[id] != self_op(id) {
            continue;
        }
        for op in orig_fn.gates[id].get_operands() {
            live[resolve(&alias, &op).node.id] = true;
        }
    }

    // Pass 3: compact. Node 0 and the inputs are unconditional; a gate
    // survives iff it is live and not folded away.
    let mut new_gates: Vec<XagNode> = Vec::new();
    let mut old_to_new: Vec<Option<usize>> = vec![None; n];
    let remap = |old_to_new: &[Option<usize>], op: XagOperand| -> XagOperand {
        XagOperand {
            node: XagRef {
                id: old_to_new[op.node.id].expect("resolved operand survives the sweep"),
            },
            negated: op.negated,
        }
    };
    for (id, node) in orig_fn.gates.iter().enumerate() {
        let keep = match node {
            XagNode::Literal(_) => id == 0,
            XagNode::Input { .. } => true,
            _ => live[id] && alias[id] == self_op(id),
        };
        if !keep {
            continue;
        }
        let new_node = match node {
            XagNode::And2 { a, b } => {
                let ra = remap(&old_to_new, resolve(&alias, a));
                let rb = remap(&old_to_new, resolve(&alias, b));
                debug_assert!(
                    ra.node.id != 0 && rb.node.id != 0,
                    "constant operand survived folding at %{}",
                    id
                );
                XagNode::And2 { a: ra, b: rb }
            }
            XagNode::Xor2 { a, b } => {
                let ra = remap(&old_to_new, resolve(&alias, a));
                let rb = remap(&old_to_new, resolve(&alias, b));
                debug_assert!(
                    ra.node.id != 0 && rb.node.id != 0,
                    "constant operand survived folding at %{}",
                    id
                );
                XagNode::Xor2 { a: ra, b: rb }
            }
            other => other.clone(),
        };
        old_to_new[id] = Some(new_gates.len());
        new_gates.push(new_node);
    }

    let remap_bits = |bits: &XagBitVector| -> XagBitVector {
        let new_bits: Vec<XagOperand> = bits
            .iter_lsb_to_msb()
            .map(|bit| remap(&old_to_new, resolve(&alias, bit)))
            .collect();
        XagBitVector::from_lsb_is_index_0(&new_bits)
    };
    let result = XagFn {
        name: orig_fn.name.clone(),
        inputs: orig_fn
            .inputs
            .iter()
            .map(|input| Input {
                name: input.name.clone(),
                bit_vector: remap_bits(&input.bit_vector),
            })
            .collect(),
        outputs: orig_fn
            .outputs
            .iter()
            .map(|output| Output {
                name: output.name.clone(),
                bit_vector: remap_bits(&output.bit_vector),
            })
            .collect(),
        gates: new_gates,
    };
    result.check_invariants_with_debug_assert();
    result
}
