// SPDX-License-Identifier: Apache-2.0

//! The outer optimization loop: balance, rewrite, resubstitute, clean up,
//! until a whole round stops paying.
//!
//! Balancing and rewriting are opaque `Pass` objects so callers can slot in
//! their own; the crate ships a depth-minimizing AND/XOR tree re-balancer
//! and leaves the rewrite slot empty by default. Resubstitution failures
//! inside a pass are recoverable; a pass returning an error aborts the loop
//! and the last-valid network is what the caller gets back alongside the
//! error.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::dce::dce;
use crate::divisors::fanout_counts;
use crate::gate::{XagBitVector, XagFn, XagNode, XagOperand, XagRef};
use crate::gate_builder::{BuilderOptions, XagBuilder};
use crate::stats::get_summary_stats;
use crate::window::{resub_pass, WindowOptions};

/// An opaque network-to-network transformation slotted into the driver.
pub trait Pass {
    fn name(&self) -> &'static str;
    fn run(&self, f: &XagFn) -> Result<XagFn, String>;
}

#[derive(Debug, Clone)]
pub struct OptimizeOptions {
    pub window: WindowOptions,
    /// Upper bound on driver rounds (each round is balance + rewrite +
    /// resub + cleanup); the fixed point usually lands much earlier.
    pub max_rounds: usize,
    /// Seed for the pattern-set RNG; fixed seed, reproducible run.
    pub seed: u64,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            window: WindowOptions::default(),
            max_rounds: 8,
            seed: 0,
        }
    }
}

/// Runs the driver with the default pass roster (tree balancing, no
/// rewrite).
pub fn optimize(f: &XagFn, opts: &OptimizeOptions) -> Result<XagFn, String> {
    optimize_with_passes(f, opts, &[&BalancePass])
}

pub fn optimize_with_passes(
    f: &XagFn,
    opts: &OptimizeOptions,
    passes: &[&dyn Pass],
) -> Result<XagFn, String> {
    let mut rng = StdRng::seed_from_u64(opts.seed);
    let mut best = dce(f);
    let mut current = best.clone();
    for round in 0..opts.max_rounds {
        let before = get_summary_stats(&current).live_gates;

        for pass in passes {
            match pass.run(&current) {
                Ok(next) => current = next,
                Err(e) => {
                    // Fatal pass failure: surface the error, keep the last
                    // valid network for the caller.
                    return Err(format!("pass '{}' failed: {}", pass.name(), e));
                }
            }
        }

        let (next, accepted) = resub_pass(&current, &opts.window, &mut rng)?;
        current = dce(&next);

        let after = get_summary_stats(&current).live_gates;
        log::info!(
            "[i] optimize round {}: {} -> {} live gates ({} substitutions)",
            round,
            before,
            after,
            accepted
        );
        if after < get_summary_stats(&best).live_gates {
            best = current.clone();
        }
        if after >= before {
            break;
        }
    }
    Ok(best)
}

/// Depth-minimizing re-association of AND and XOR chains.
///
/// Maximal single-fanout same-op subtrees are flattened to their leaves
/// and rebuilt as balanced trees (min-heap of depths, merge the two
/// shallowest). An AND chain only absorbs a child across a non-negated
/// edge; XOR chains absorb across either polarity since the negation
/// hoists to the output.
pub struct BalancePass;

#[derive(PartialEq, Eq, Clone, Copy)]
enum ChainOp {
    And,
    Xor,
}

impl Pass for BalancePass {
    fn name(&self) -> &'static str {
        "balance"
    }

    fn run(&self, f: &XagFn) -> Result<XagFn, String> {
        let counts = fanout_counts(f);
        let mut gb = XagBuilder::new(f.name.clone(), BuilderOptions::opt());

        let mut map: Vec<Option<XagOperand>> = vec![None; f.gates.len()];
        for input in &f.inputs {
            let bv = gb.add_input(input.name.clone(), input.get_bit_count());
            for (old, new) in input.bit_vector.iter_lsb_to_msb().zip(bv.iter_lsb_to_msb()) {
                map[old.node.id] = Some(*new);
            }
        }

        // Depth of each node in the new arena, for the balancing heap.
        let mut new_depth: HashMap<XagRef, usize> = HashMap::new();

        for (id, node) in f.gates.iter().enumerate() {
            if map[id].is_some() {
                continue;
            }
            let chain_op = match node {
                XagNode::Literal(false) => {
                    map[id] = Some(gb.get_false());
                    continue;
                }
                XagNode::Literal(true) => {
                    map[id] = Some(gb.get_true());
                    continue;
                }
                XagNode::Input { .. } => unreachable!("inputs are pre-mapped"),
                XagNode::And2 { .. } => ChainOp::And,
                XagNode::Xor2 { .. } => ChainOp::Xor,
            };
            // Gates absorbed into a later chain root never get asked for;
            // building them anyway is harmless (the builder hash-dedups and
            // DCE sweeps stragglers), so every gate is materialized.
            let (leaves, parity) = flatten_chain(f, XagRef { id }, chain_op, &counts);
            let mapped = build_balanced(&mut gb, &map, &mut new_depth, chain_op, &leaves);
            let mapped = if parity { mapped.negate() } else { mapped };
            map[id] = Some(mapped);
        }

        let translate = |op: &XagOperand| -> XagOperand {
            let mapped = map[op.node.id].expect("all nodes mapped");
            if op.negated {
                mapped.negate()
            } else {
                mapped
            }
        };
        for output in &f.outputs {
            let bits: Vec<XagOperand> = output
                .bit_vector
                .iter_lsb_to_msb()
                .map(|op| translate(op))
                .collect();
            gb.add_output(output.name.clone(), XagBitVector::from_lsb_is_index_0(&bits));
        }
        Ok(dce(&gb.build()))
    }
}

/// Gathers the leaf operands of the maximal same-op subtree rooted at
/// `root`. Returns the leaves (operands in the old arena) and, for XOR
/// chains, the net negation parity hoisted out of absorbed edges.
fn flatten_chain(
    f: &XagFn,
    root: XagRef,
    op: ChainOp,
    counts: &[usize],
) -> (Vec<XagOperand>, bool) {
    let mut leaves = Vec::new();
    let mut parity = false;
    let mut stack: Vec<XagOperand> = f.gates[root.id]
        .get_operands()
        .into_iter()
        .rev()
        .collect();
    while let Some(operand) = stack.pop() {
        let child = &f.gates[operand.node.id];
        let single_use = counts[operand.node.id] == 1;
        let absorbable = single_use
            && match (op, child) {
                (ChainOp::And, XagNode::And2 { .. }) => !operand.negated,
                (ChainOp::Xor, XagNode::Xor2 { .. }) => true,
                _ => false,
            };
        if absorbable {
            if operand.negated {
                parity = !parity; // only reachable for XOR chains
            }
            for sub in child.get_operands().into_iter().rev() {
                stack.push(sub);
            }
        } else {
            leaves.push(operand);
        }
    }
    (leaves, parity)
}

/// Merges mapped leaves into a balanced tree: repeatedly pop the two
/// shallowest and push the merged gate one level deeper.
fn build_balanced(
    gb: &mut XagBuilder,
    map: &[Option<XagOperand>],
    new_depth: &mut HashMap<XagRef, usize>,
    op: ChainOp,
    leaves: &[XagOperand],
) -> XagOperand {
    debug_assert!(!leaves.is_empty());
    let mut heap: BinaryHeap<Reverse<(usize, usize, XagOperand)>> = BinaryHeap::new();
    for (k, leaf) in leaves.iter().enumerate() {
        let mapped = map[leaf.node.id].expect("leaf precedes the chain root");
        let mapped = if leaf.negated { mapped.negate() } else { mapped };
        let depth = new_depth.get(&mapped.node).copied().unwrap_or(0);
        // Tie-break on arrival order to keep the merge deterministic.
        heap.push(Reverse((depth, k, mapped)));
    }
    let mut next_key = leaves.len();
    while heap.len() > 1 {
        let Reverse((d1, _, op1)) = heap.pop().unwrap();
        let Reverse((d2, _, op2)) = heap.pop().unwrap();
        let merged = match op {
            ChainOp::And => gb.add_and_binary(op1, op2),
            ChainOp::Xor => gb.add_xor_binary(op1, op2),
        };
        let depth = std::cmp::max(d1, d2) + 1;
        new_depth.insert(merged.node, depth);
        heap.push(Reverse((depth, next_key, merged)));
        next_key += 1;
    }
    let Reverse((_, _, result)) = heap.pop().unwrap();
    result
}
