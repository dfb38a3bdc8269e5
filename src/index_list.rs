// SPDX-License-Identifier: Apache-2.0

//! Append-only encoding of a small gate network over divisor inputs.
//!
//! Literals follow the usual convention: bit 0 is the inversion flag, the
//! remaining bits are the node index. Node 0 is the constant (literal 0 =
//! false, literal 1 = true), nodes `1..=num_inputs` are the divisors, and
//! each appended entry creates the next node. An entry's operand ordering
//! doubles as its gate-type discriminator: AND entries satisfy `a < b`,
//! XOR entries satisfy `a > b`.
//!
//! Producers must guarantee well-formedness (fan-ins referencing earlier
//! nodes only); decoding a malformed list is a programmer error and
//! asserts. The 32-bit wire format (`to_words`/`from_words`) validates on
//! read since it crosses a trust boundary.

use std::fmt;

use crate::gate::{XagFn, XagOperand};
use crate::gate_builder::XagBuilder;
use crate::tt::Tt;

/// Word separating gate entries from output literals in the wire format.
const OUTPUT_MARKER: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    And(u32, u32),
    Xor(u32, u32),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XagIndexList {
    num_inputs: u32,
    entries: Vec<(u32, u32)>,
    outputs: Vec<u32>,
}

impl XagIndexList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.num_inputs = 0;
        self.entries.clear();
        self.outputs.clear();
    }

    pub fn add_inputs(&mut self, n: u32) {
        assert!(
            self.entries.is_empty(),
            "inputs must be declared before any gate entry"
        );
        self.num_inputs += n;
    }

    pub fn num_inputs(&self) -> u32 {
        self.num_inputs
    }

    pub fn num_gates(&self) -> usize {
        self.entries.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    pub fn outputs(&self) -> &[u32] {
        &self.outputs
    }

    /// Literal that the next appended entry will get.
    fn next_gate_lit(&self) -> u32 {
        (self.num_inputs + self.entries.len() as u32 + 1) << 1
    }

    fn check_fanin(&self, lit: u32) {
        let limit = self.next_gate_lit();
        assert!(
            lit < limit,
            "fan-in literal {} references a node at or past the one being created ({})",
            lit,
            limit >> 1
        );
    }

    /// Appends an AND entry; operands are stored in ascending order.
    /// Returns the (unnegated) literal of the new gate.
    pub fn add_and(&mut self, a: u32, b: u32) -> u32 {
        self.check_fanin(a);
        self.check_fanin(b);
        assert!(a != b, "AND entry with identical fan-ins {}", a);
        let lit = self.next_gate_lit();
        let (a, b) = if a < b { (a, b) } else { (b, a) };
        self.entries.push((a, b));
        lit
    }

    /// Appends an XOR entry; operands are stored in descending order (the
    /// ordering is the AND/XOR discriminator).
    pub fn add_xor(&mut self, a: u32, b: u32) -> u32 {
        self.check_fanin(a);
        self.check_fanin(b);
        assert!(a != b, "XOR entry with identical fan-ins {}", a);
        let lit = self.next_gate_lit();
        let (a, b) = if a > b { (a, b) } else { (b, a) };
        self.entries.push((a, b));
        lit
    }

    pub fn add_output(&mut self, lit: u32) {
        self.check_fanin(lit | 1); // any already-created literal is valid
        self.outputs.push(lit);
    }

    /// Flips the inversion bit of an already-declared output.
    pub fn negate_output(&mut self, idx: usize) {
        self.outputs[idx] ^= 1;
    }

    pub fn entries(&self) -> impl Iterator<Item = Entry> + '_ {
        self.entries.iter().map(|&(a, b)| {
            if a < b {
                Entry::And(a, b)
            } else {
                Entry::Xor(a, b)
            }
        })
    }

    /// Evaluates the list over divisor tables (`divs[v - 1]` is divisor `v`),
    /// returning one table per output.
    pub fn evaluate(&self, divs: &[Tt], num_bits: usize) -> Vec<Tt> {
        assert_eq!(
            divs.len(),
            self.num_inputs as usize,
            "divisor count {} does not match declared inputs {}",
            divs.len(),
            self.num_inputs
        );
        let mut values: Vec<Tt> = Vec::with_capacity(1 + divs.len() + self.entries.len());
        values.push(Tt::zeros(num_bits));
        for d in divs {
            assert_eq!(d.num_bits(), num_bits, "divisor table width mismatch");
            values.push(d.clone());
        }
        let lit_tt = |values: &[Tt], lit: u32| -> Tt {
            let tt = &values[(lit >> 1) as usize];
            if lit & 1 == 1 {
                !tt
            } else {
                tt.clone()
            }
        };
        for entry in self.entries() {
            let v = match entry {
                Entry::And(a, b) => &lit_tt(&values, a) & &lit_tt(&values, b),
                Entry::Xor(a, b) => &lit_tt(&values, a) ^ &lit_tt(&values, b),
            };
            values.push(v);
        }
        self.outputs
            .iter()
            .map(|&lit| lit_tt(&values, lit))
            .collect()
    }

    /// Materializes the list into a builder on top of the given leaf
    /// operands (`leaves[v - 1]` stands for divisor `v`). Returns one
    /// operand per output.
    pub fn insert(&self, gb: &mut XagBuilder, leaves: &[XagOperand]) -> Vec<XagOperand> {
        assert_eq!(
            leaves.len(),
            self.num_inputs as usize,
            "leaf count {} does not match declared inputs {}",
            leaves.len(),
            self.num_inputs
        );
        let mut node_ops: Vec<XagOperand> = Vec::with_capacity(1 + leaves.len());
        node_ops.push(gb.get_false());
        node_ops.extend_from_slice(leaves);
        let lit_op = |node_ops: &[XagOperand], lit: u32| -> XagOperand {
            let op = node_ops[(lit >> 1) as usize];
            if lit & 1 == 1 {
                op.negate()
            } else {
                op
            }
        };
        for entry in self.entries() {
            let op = match entry {
                Entry::And(a, b) => {
                    let (oa, ob) = (lit_op(&node_ops, a), lit_op(&node_ops, b));
                    gb.add_and_binary(oa, ob)
                }
                Entry::Xor(a, b) => {
                    let (oa, ob) = (lit_op(&node_ops, a), lit_op(&node_ops, b));
                    gb.add_xor_binary(oa, ob)
                }
            };
            node_ops.push(op);
        }
        self.outputs
            .iter()
            .map(|&lit| lit_op(&node_ops, lit))
            .collect()
    }

    /// Decodes into a standalone network with one input bundle of divisor
    /// bits and one single-bit output per output literal.
    pub fn decode(&self, name: &str) -> XagFn {
        use crate::gate_builder::BuilderOptions;
        let mut gb = XagBuilder::new(name.to_string(), BuilderOptions::no_opt());
        let leaves_bv = gb.add_input("i".to_string(), self.num_inputs as usize);
        let leaves: Vec<XagOperand> = leaves_bv.iter_lsb_to_msb().cloned().collect();
        let outs = self.insert(&mut gb, &leaves);
        for (k, op) in outs.iter().enumerate() {
            gb.add_output(format!("o{}", k), (*op).into());
        }
        gb.build()
    }

    /// Encodes a whole network: primary input bits become the divisors in
    /// bundle order, gates are appended in arena order, and each output bit
    /// becomes an output literal.
    pub fn encode(f: &XagFn) -> Result<XagIndexList, String> {
        use crate::gate::XagNode;
        let mut il = XagIndexList::new();
        il.add_inputs(f.num_input_bits() as u32);
        let mut node_to_lit: Vec<Option<u32>> = vec![None; f.gates.len()];
        for (k, op) in f.input_operands().iter().enumerate() {
            if op.negated {
                return Err("negated primary input operand".to_string());
            }
            node_to_lit[op.node.id] = Some((k as u32 + 1) << 1);
        }
        let op_lit = |node_to_lit: &[Option<u32>], op: &XagOperand| -> Result<u32, String> {
            let base = node_to_lit[op.node.id]
                .ok_or_else(|| format!("operand %{} has no literal yet", op.node.id))?;
            Ok(base ^ (op.negated as u32))
        };
        for (id, node) in f.gates.iter().enumerate() {
            match node {
                XagNode::Literal(value) => {
                    node_to_lit[id] = Some(*value as u32);
                }
                XagNode::Input { .. } => {
                    if node_to_lit[id].is_none() {
                        return Err(format!("input node %{} not in any input bundle", id));
                    }
                }
                XagNode::And2 { a, b } => {
                    let (la, lb) = (op_lit(&node_to_lit, a)?, op_lit(&node_to_lit, b)?);
                    node_to_lit[id] = Some(il.add_and(la, lb));
                }
                XagNode::Xor2 { a, b } => {
                    let (la, lb) = (op_lit(&node_to_lit, a)?, op_lit(&node_to_lit, b)?);
                    node_to_lit[id] = Some(il.add_xor(la, lb));
                }
            }
        }
        for op in f.output_operands() {
            il.add_output(op_lit(&node_to_lit, &op)?);
        }
        Ok(il)
    }

    /// Wire format: word 0 carries `(num_inputs, num_outputs)` in its low and
    /// high halves, gate entries follow as literal pairs, and a marker word
    /// introduces the trailing output literals.
    pub fn to_words(&self) -> Vec<u32> {
        assert!(self.num_inputs < (1 << 16), "too many inputs for wire format");
        assert!(
            self.outputs.len() < (1 << 16),
            "too many outputs for wire format"
        );
        let mut words = Vec::with_capacity(2 + 2 * self.entries.len() + self.outputs.len());
        words.push(self.num_inputs | (self.outputs.len() as u32) << 16);
        for &(a, b) in &self.entries {
            words.push(a);
            words.push(b);
        }
        words.push(OUTPUT_MARKER);
        words.extend_from_slice(&self.outputs);
        words
    }

    pub fn from_words(words: &[u32]) -> Result<XagIndexList, String> {
        if words.is_empty() {
            return Err("empty wire data".to_string());
        }
        let num_inputs = words[0] & 0xffff;
        let num_outputs = (words[0] >> 16) as usize;
        let marker_pos = words
            .iter()
            .position(|&w| w == OUTPUT_MARKER)
            .ok_or_else(|| "missing output marker word".to_string())?;
        if (marker_pos - 1) % 2 != 0 {
            return Err("odd number of entry literal words".to_string());
        }
        if words.len() - marker_pos - 1 != num_outputs {
            return Err(format!(
                "expected {} output literals, found {}",
                num_outputs,
                words.len() - marker_pos - 1
            ));
        }
        let mut il = XagIndexList::new();
        il.add_inputs(num_inputs);
        for pair in words[1..marker_pos].chunks(2) {
            let (a, b) = (pair[0], pair[1]);
            let limit = il.next_gate_lit();
            if a >= limit || b >= limit {
                return Err(format!(
                    "entry ({}, {}) references a literal at or past node {}",
                    a,
                    b,
                    limit >> 1
                ));
            }
            if a == b {
                return Err(format!("entry with identical fan-ins {}", a));
            }
            if a < b {
                il.add_and(a, b);
            } else {
                il.add_xor(a, b);
            }
        }
        for &lit in &words[marker_pos + 1..] {
            if lit >= il.next_gate_lit() {
                return Err(format!("output literal {} out of range", lit));
            }
            il.outputs.push(lit);
        }
        Ok(il)
    }
}

impl fmt::Display for XagIndexList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{} | ", self.num_inputs)?;
        for entry in self.entries() {
            match entry {
                Entry::And(a, b) => write!(f, "and({}, {}) ", a, b)?,
                Entry::Xor(a, b) => write!(f, "xor({}, {}) ", a, b)?,
            }
        }
        write!(f, "| ")?;
        for &o in &self.outputs {
            write!(f, "out({}) ", o)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tts(strs: &[&str]) -> Vec<Tt> {
        strs.iter()
            .map(|s| Tt::from_binary_str(s).unwrap())
            .collect()
    }

    #[test]
    fn test_literal_assignment() {
        let mut il = XagIndexList::new();
        il.add_inputs(3);
        // node 4 is the first gate: literal 8.
        let g = il.add_and(2, 4);
        assert_eq!(g, 8);
        let g2 = il.add_xor(g, 6);
        assert_eq!(g2, 10);
        il.add_output(g2 | 1);
        assert_eq!(il.num_gates(), 2);
        let decoded = il.decode("d");
        assert_eq!(decoded.gate_count(), 2);
    }

    #[test]
    fn test_entry_ordering_discriminates() {
        let mut il = XagIndexList::new();
        il.add_inputs(2);
        il.add_and(4, 2);
        il.add_xor(2, 4);
        let entries: Vec<Entry> = il.entries().collect();
        assert_eq!(entries[0], Entry::And(2, 4));
        assert_eq!(entries[1], Entry::Xor(4, 2));
    }

    #[test]
    fn test_evaluate() {
        let divs = tts(&["1100", "1010"]);
        let mut il = XagIndexList::new();
        il.add_inputs(2);
        let x = il.add_xor(4, 2);
        il.add_output(x);
        il.add_output(x | 1);
        let outs = il.evaluate(&divs, 4);
        assert_eq!(outs[0].to_binary_str(), "0110");
        assert_eq!(outs[1].to_binary_str(), "1001");
    }

    #[test]
    fn test_constant_outputs() {
        let mut il = XagIndexList::new();
        il.add_inputs(1);
        il.add_output(0);
        il.add_output(1);
        let outs = il.evaluate(&tts(&["10"]), 2);
        assert_eq!(outs[0].to_binary_str(), "00");
        assert_eq!(outs[1].to_binary_str(), "11");
    }

    #[test]
    fn test_wire_roundtrip() {
        let mut il = XagIndexList::new();
        il.add_inputs(3);
        let g = il.add_and(2, 5);
        let g2 = il.add_xor(g, 6);
        il.add_output(g2);
        let words = il.to_words();
        let rt = XagIndexList::from_words(&words).unwrap();
        assert_eq!(il, rt);
    }

    #[test]
    fn test_wire_rejects_forward_reference() {
        // Entry references node 5 with only 2 inputs and one prior entry.
        let words = vec![2 | 1 << 16, 2, 12, OUTPUT_MARKER, 6];
        assert!(XagIndexList::from_words(&words).is_err());
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        use crate::gate_builder::{BuilderOptions, XagBuilder};
        use crate::sim::{simulate, simulate_outputs, PatternSet};
        let mut gb = XagBuilder::new("t".to_string(), BuilderOptions::no_opt());
        let a = *gb.add_input("a".to_string(), 1).get_lsb(0);
        let b = *gb.add_input("b".to_string(), 1).get_lsb(0);
        let c = *gb.add_input("c".to_string(), 1).get_lsb(0);
        let x = gb.add_xor_binary(a, b);
        let g = gb.add_and_binary(x, c.negate());
        gb.add_output("o".to_string(), g.negate().into());
        let f = gb.build();

        let il = XagIndexList::encode(&f).unwrap();
        let decoded = il.decode("rt");
        assert_eq!(decoded.gate_count(), f.gate_count());

        let pats = PatternSet::exhaustive(3);
        let f_out = simulate_outputs(&f, &simulate(&f, &pats));
        let d_out = simulate_outputs(&decoded, &simulate(&decoded, &pats));
        assert_eq!(f_out, d_out);
    }
}
