// SPDX-License-Identifier: Apache-2.0

//! Pattern-parallel simulation: every node of an `XagFn` is evaluated over a
//! whole pattern set at once, yielding one truth table per node.
//!
//! The pattern set is either exhaustive (all `2^k` assignments, giving real
//! truth tables) or sampled (random patterns plus counterexamples fed back
//! by failed validations).

use std::collections::HashMap;

use rand::Rng;

use crate::gate::{XagFn, XagNode, XagOperand};
use crate::tt::Tt;

#[derive(Debug, Clone)]
pub struct PatternSet {
    /// One table per primary input bit, in global bundle order.
    inputs: Vec<Tt>,
}

impl PatternSet {
    /// All `2^num_pi_bits` assignments; input `k` gets its variable
    /// projection.
    pub fn exhaustive(num_pi_bits: usize) -> Self {
        let inputs = (0..num_pi_bits)
            .map(|k| Tt::nth_var(num_pi_bits, k))
            .collect();
        PatternSet { inputs }
    }

    pub fn random(num_pi_bits: usize, num_patterns: usize, rng: &mut impl Rng) -> Self {
        let mut inputs = Vec::with_capacity(num_pi_bits);
        for _ in 0..num_pi_bits {
            let mut tt = Tt::zeros(num_patterns);
            for i in 0..num_patterns {
                if rng.gen::<bool>() {
                    tt.set_bit(i);
                }
            }
            inputs.push(tt);
        }
        PatternSet { inputs }
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn num_patterns(&self) -> usize {
        self.inputs.first().map(|tt| tt.num_bits()).unwrap_or(0)
    }

    pub fn input_tt(&self, k: usize) -> &Tt {
        &self.inputs[k]
    }

    /// Appends one concrete assignment (e.g. a SAT counterexample) to the
    /// pattern space.
    pub fn add_pattern(&mut self, bits: &[bool]) {
        assert_eq!(
            bits.len(),
            self.inputs.len(),
            "pattern width {} does not match input count {}",
            bits.len(),
            self.inputs.len()
        );
        for (tt, bit) in self.inputs.iter_mut().zip(bits.iter()) {
            tt.push_bit(*bit);
        }
    }
}

/// Returns the table of an operand given the node-indexed tables.
pub fn operand_tt(tts: &[Tt], op: XagOperand) -> Tt {
    if op.negated {
        !&tts[op.node.id]
    } else {
        tts[op.node.id].clone()
    }
}

/// Simulates every node of `f` over the pattern set, returning tables
/// indexed by arena id. Fan-ins precede their gates in the arena, so a
/// single forward sweep suffices.
pub fn simulate(f: &XagFn, pats: &PatternSet) -> Vec<Tt> {
    let num_bits = pats.num_patterns();
    assert!(num_bits > 0, "empty pattern set");
    assert_eq!(
        pats.num_inputs(),
        f.num_input_bits(),
        "pattern set has {} inputs but network has {} input bits",
        pats.num_inputs(),
        f.num_input_bits()
    );

    let mut pi_index: HashMap<usize, usize> = HashMap::new();
    for (k, op) in f.input_operands().iter().enumerate() {
        pi_index.insert(op.node.id, k);
    }

    let mut tts: Vec<Tt> = Vec::with_capacity(f.gates.len());
    for (id, node) in f.gates.iter().enumerate() {
        let tt = match node {
            XagNode::Literal(value) => {
                if *value {
                    Tt::ones(num_bits)
                } else {
                    Tt::zeros(num_bits)
                }
            }
            XagNode::Input { .. } => pats.input_tt(pi_index[&id]).clone(),
            XagNode::And2 { a, b } => &operand_tt(&tts, *a) & &operand_tt(&tts, *b),
            XagNode::Xor2 { a, b } => &operand_tt(&tts, *a) ^ &operand_tt(&tts, *b),
        };
        tts.push(tt);
    }
    tts
}

/// Applies output negations to node tables, one table per output bit in
/// bundle order.
pub fn simulate_outputs(f: &XagFn, node_tts: &[Tt]) -> Vec<Tt> {
    f.output_operands()
        .iter()
        .map(|op| operand_tt(node_tts, *op))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate_builder::{BuilderOptions, XagBuilder};

    #[test]
    fn test_simulate_and_xor() {
        let mut gb = XagBuilder::new("t".to_string(), BuilderOptions::no_opt());
        let a = *gb.add_input("a".to_string(), 1).get_lsb(0);
        let b = *gb.add_input("b".to_string(), 1).get_lsb(0);
        let and = gb.add_and_binary(a, b);
        let xor = gb.add_xor_binary(a, b);
        gb.add_output("o0".to_string(), and.into());
        gb.add_output("o1".to_string(), xor.negate().into());
        let f = gb.build();

        let pats = PatternSet::exhaustive(2);
        let tts = simulate(&f, &pats);
        assert_eq!(tts[and.node.id].to_binary_str(), "1000");
        assert_eq!(tts[xor.node.id].to_binary_str(), "0110");

        let outs = simulate_outputs(&f, &tts);
        assert_eq!(outs[0].to_binary_str(), "1000");
        assert_eq!(outs[1].to_binary_str(), "1001"); // xnor via negated output
    }

    #[test]
    fn test_add_pattern_extends() {
        let mut pats = PatternSet::exhaustive(2);
        assert_eq!(pats.num_patterns(), 4);
        pats.add_pattern(&[true, false]);
        assert_eq!(pats.num_patterns(), 5);
        assert!(pats.input_tt(0).get_bit(4));
        assert!(!pats.input_tt(1).get_bit(4));
    }
}
