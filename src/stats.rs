// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use crate::divisors::fanout_counts;
use crate::gate::{XagFn, XagNode, XagRef};

pub struct DepthStats {
    pub ref_to_depth: HashMap<XagRef, usize>,
    pub deepest_path: usize,
}

/// Computes the depth of every node in the arena (inputs and literals are
/// depth 0, gates are one more than their deepest operand) and the depth of
/// the deepest primary output.
pub fn get_gate_depth(xag_fn: &XagFn) -> DepthStats {
    let mut depths: HashMap<XagRef, usize> = HashMap::new();
    for (gate_id, gate) in xag_fn.gates.iter().enumerate() {
        let gate_ref = XagRef { id: gate_id };
        match gate {
            XagNode::Input { .. } | XagNode::Literal(_) => {
                depths.insert(gate_ref, 0);
            }
            XagNode::And2 { a, b } | XagNode::Xor2 { a, b } => {
                let depth = 1 + std::cmp::max(depths[&a.node], depths[&b.node]);
                depths.insert(gate_ref, depth);
            }
        }
    }

    let mut deepest_path = 0;
    for output in xag_fn.outputs.iter() {
        for operand in output.bit_vector.iter_lsb_to_msb() {
            deepest_path = std::cmp::max(deepest_path, depths[&operand.node]);
        }
    }

    DepthStats {
        ref_to_depth: depths,
        deepest_path,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryStats {
    /// Gates reachable from the outputs (inputs and literals excluded).
    pub live_gates: usize,
    pub deepest_path: usize,
}

pub fn get_summary_stats(xag_fn: &XagFn) -> SummaryStats {
    let counts = fanout_counts(xag_fn);
    let live_gates = counts
        .iter()
        .enumerate()
        .filter(|&(id, &c)| c > 0 && xag_fn.gates[id].is_gate())
        .count();
    let depth = get_gate_depth(xag_fn);
    SummaryStats {
        live_gates,
        deepest_path: depth.deepest_path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate_builder::{BuilderOptions, XagBuilder};

    #[test]
    fn test_depth_and_live_gates() {
        let mut gb = XagBuilder::new("t".to_string(), BuilderOptions::no_opt());
        let a = *gb.add_input("a".to_string(), 1).get_lsb(0);
        let b = *gb.add_input("b".to_string(), 1).get_lsb(0);
        let c = *gb.add_input("c".to_string(), 1).get_lsb(0);
        let x = gb.add_xor_binary(a, b);
        let g = gb.add_and_binary(x, c);
        let _dead = gb.add_and_binary(a, c);
        gb.add_output("o".to_string(), g.into());
        let f = gb.build();
        let stats = get_summary_stats(&f);
        assert_eq!(stats.live_gates, 2);
        assert_eq!(stats.deepest_path, 2);
    }
}
