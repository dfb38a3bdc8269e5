// SPDX-License-Identifier: Apache-2.0

//! The XAG (XOR-AND graph) arena: two-input AND and XOR nodes with
//! complemented edges, primary inputs grouped into named bit vectors, and
//! primary outputs that may be negated.
//!
//! Arena contract: node 0 is the constant-false literal, and every gate's
//! fan-ins reference strictly smaller ids. The second rule makes ascending
//! id order a topological order and is the graph's acyclicity proof, so
//! sweeps over the arena never need a visited set. "References" are plain
//! indices; the structure is trivially cloneable with no cyclic ownership.

use std::fmt;

use crate::topo::post_order_operands;

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct XagRef {
    pub id: usize,
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct XagOperand {
    pub node: XagRef,
    pub negated: bool,
}

impl XagOperand {
    #[must_use]
    pub fn negate(&self) -> Self {
        Self {
            node: self.node,
            negated: !self.negated,
        }
    }
}

impl From<XagRef> for XagOperand {
    fn from(node: XagRef) -> Self {
        XagOperand {
            node,
            negated: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XagNode {
    Input {
        name: String,
        /// Index where 0 is the least significant bit of the input.
        lsb_index: usize,
    },
    Literal(bool),
    And2 {
        a: XagOperand,
        b: XagOperand,
    },
    Xor2 {
        a: XagOperand,
        b: XagOperand,
    },
}

impl XagNode {
    pub fn get_operands(&self) -> Vec<XagOperand> {
        match self {
            XagNode::Input { .. } => vec![],
            XagNode::Literal(_) => vec![],
            XagNode::And2 { a, b } | XagNode::Xor2 { a, b } => vec![*a, *b],
        }
    }

    pub fn get_args(&self) -> Vec<XagRef> {
        match self {
            XagNode::Input { .. } => vec![],
            XagNode::Literal(_) => vec![],
            XagNode::And2 { a, b } | XagNode::Xor2 { a, b } => vec![a.node, b.node],
        }
    }

    pub fn is_gate(&self) -> bool {
        matches!(self, XagNode::And2 { .. } | XagNode::Xor2 { .. })
    }
}

#[derive(Debug, Clone)]
pub struct XagBitVector {
    /// Index 0 is the LSb, the last index is the MSb.
    operands: Vec<XagOperand>,
}

impl XagBitVector {
    pub fn from_bit(bit: XagOperand) -> Self {
        Self {
            operands: vec![bit],
        }
    }

    /// Creates a bit vector from a slice where index 0 of the slice is the
    /// least significant bit.
    pub fn from_lsb_is_index_0(operands: &[XagOperand]) -> Self {
        Self {
            operands: operands.to_vec(),
        }
    }

    pub fn iter_lsb_to_msb(&self) -> impl DoubleEndedIterator<Item = &XagOperand> {
        self.operands.iter()
    }

    pub fn get_lsb(&self, index: usize) -> &XagOperand {
        assert!(
            index < self.operands.len(),
            "index {} is out of bounds for bit vector of length {}",
            index,
            self.operands.len()
        );
        &self.operands[index]
    }

    pub fn get_bit_count(&self) -> usize {
        self.operands.len()
    }
}

impl From<XagOperand> for XagBitVector {
    fn from(op: XagOperand) -> Self {
        XagBitVector::from_bit(op)
    }
}

/// An input has a name (unique among inputs/outputs) and the vector of gate
/// references that make up this named entity.
#[derive(Debug, Clone)]
pub struct Input {
    pub name: String,
    pub bit_vector: XagBitVector,
}

impl Input {
    pub fn get_bit_count(&self) -> usize {
        self.bit_vector.get_bit_count()
    }
}

/// Similar to inputs, but references from the XAG can be negated.
#[derive(Debug, Clone)]
pub struct Output {
    pub name: String,
    pub bit_vector: XagBitVector,
}

impl Output {
    pub fn get_bit_count(&self) -> usize {
        self.bit_vector.get_bit_count()
    }
}

#[derive(Debug, Clone)]
pub struct XagFn {
    pub name: String,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    pub gates: Vec<XagNode>,
}

impl XagFn {
    pub fn get(&self, xag_ref: XagRef) -> &XagNode {
        &self.gates[xag_ref.id]
    }

    /// Number of AND/XOR gates in the arena (inputs and literals excluded;
    /// dead gates count until a DCE pass runs).
    pub fn gate_count(&self) -> usize {
        self.gates.iter().filter(|n| n.is_gate()).count()
    }

    /// Total number of primary input bits, over all input bundles.
    pub fn num_input_bits(&self) -> usize {
        self.inputs.iter().map(|i| i.get_bit_count()).sum()
    }

    pub fn num_output_bits(&self) -> usize {
        self.outputs.iter().map(|o| o.get_bit_count()).sum()
    }

    /// Primary input operands in bundle order, LSb first within a bundle.
    pub fn input_operands(&self) -> Vec<XagOperand> {
        self.inputs
            .iter()
            .flat_map(|i| i.bit_vector.iter_lsb_to_msb().copied())
            .collect()
    }

    pub fn output_operands(&self) -> Vec<XagOperand> {
        self.outputs
            .iter()
            .flat_map(|o| o.bit_vector.iter_lsb_to_msb().copied())
            .collect()
    }

    /// Worklist-free postorder from all outputs, operands with polarity.
    pub fn post_order_operands(&self, discard_inputs: bool) -> Vec<XagOperand> {
        let starts = self.output_operands();
        post_order_operands(&starts, &self.gates, discard_inputs)
    }

    /// Enforces the arena contract, panicking on violation: node 0 is the
    /// constant-false literal, gate fan-ins point strictly backwards (which
    /// is also what keeps the graph acyclic), and every I/O reference is in
    /// bounds. Compiled out of release builds.
    pub fn check_invariants_with_debug_assert(&self) {
        if !cfg!(debug_assertions) {
            return;
        }

        assert!(
            matches!(self.gates.first(), Some(XagNode::Literal(false))),
            "fn {}: node 0 must be the constant-false literal",
            self.name
        );
        for (i, node) in self.gates.iter().enumerate() {
            for op in node.get_operands() {
                assert!(
                    op.node.id < i,
                    "fn {}: gate %{} reads %{}, which does not precede it",
                    self.name,
                    i,
                    op.node.id
                );
            }
        }
        let io_bits = self
            .inputs
            .iter()
            .map(|i| (&i.name, &i.bit_vector))
            .chain(self.outputs.iter().map(|o| (&o.name, &o.bit_vector)));
        for (name, bits) in io_bits {
            for bit in bits.iter_lsb_to_msb() {
                assert!(
                    bit.node.id < self.gates.len(),
                    "fn {}: {} references %{} past the arena end ({})",
                    self.name,
                    name,
                    bit.node.id,
                    self.gates.len()
                );
            }
        }
    }

    /// Bounds-checks a reference against this arena.
    pub fn validate_ref(&self, xag_ref: XagRef) {
        assert!(
            xag_ref.id < self.gates.len(),
            "fn {}: %{} past the arena end ({})",
            self.name,
            xag_ref.id,
            self.gates.len()
        );
    }
}

/// Text dump: live gates in dependency order, then the output bindings.
impl fmt::Display for XagFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.check_invariants_with_debug_assert();

        let name_of = |r: XagRef| -> String {
            match &self.gates[r.id] {
                XagNode::Input { name, lsb_index } => format!("{}[{}]", name, lsb_index),
                _ => format!("%{}", r.id),
            }
        };
        let wire = |op: &XagOperand| -> String {
            if op.negated {
                format!("not({})", name_of(op.node))
            } else {
                name_of(op.node)
            }
        };
        let io_line = |bits: &XagBitVector| -> String {
            let guts = bits
                .iter_lsb_to_msb()
                .map(|b| wire(b))
                .collect::<Vec<String>>()
                .join(", ");
            format!("[{}]", guts)
        };

        let inputs = self
            .inputs
            .iter()
            .map(|i| format!("{}: bits[{}] = {}", i.name, i.get_bit_count(), io_line(&i.bit_vector)))
            .collect::<Vec<String>>()
            .join(", ");
        let outputs = self
            .outputs
            .iter()
            .map(|o| format!("{}: bits[{}] = {}", o.name, o.get_bit_count(), io_line(&o.bit_vector)))
            .collect::<Vec<String>>()
            .join(", ");
        writeln!(f, "fn {}({}) -> ({}) {{", self.name, inputs, outputs)?;

        for op in self.post_order_operands(true) {
            match self.get(op.node) {
                XagNode::And2 { a, b } => {
                    writeln!(f, "  %{} = and({}, {})", op.node.id, wire(a), wire(b))?;
                }
                XagNode::Xor2 { a, b } => {
                    writeln!(f, "  %{} = xor({}, {})", op.node.id, wire(a), wire(b))?;
                }
                XagNode::Literal(value) => {
                    writeln!(f, "  %{} = literal({})", op.node.id, value)?;
                }
                XagNode::Input { .. } => {}
            }
        }

        for output in &self.outputs {
            for (i, bit) in output.bit_vector.iter_lsb_to_msb().enumerate() {
                writeln!(f, "  {}[{}] = {}", output.name, i, wire(bit))?;
            }
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use crate::gate_builder::{BuilderOptions, XagBuilder};

    #[test]
    fn test_display_and_xor() {
        let mut gb = XagBuilder::new("t".to_string(), BuilderOptions::no_opt());
        let a = *gb.add_input("a".to_string(), 1).get_lsb(0);
        let b = *gb.add_input("b".to_string(), 1).get_lsb(0);
        let x = gb.add_xor_binary(a, b);
        let g = gb.add_and_binary(a, x);
        gb.add_output("o".to_string(), g.negate().into());
        let f = gb.build();
        let s = f.to_string();
        assert!(s.contains("xor(a[0], b[0])"), "{}", s);
        assert!(s.contains("and(a[0], "), "{}", s);
        assert!(s.contains("o[0] = not(%"), "{}", s);
        assert_eq!(f.gate_count(), 2);
        assert_eq!(f.num_input_bits(), 2);
    }

    #[test]
    #[should_panic(expected = "does not precede")]
    #[cfg(debug_assertions)]
    fn test_invariants_reject_forward_fanin() {
        use crate::gate::{XagFn, XagNode, XagOperand, XagRef};
        let fwd = XagOperand {
            node: XagRef { id: 2 },
            negated: false,
        };
        let f = XagFn {
            name: "bad".to_string(),
            inputs: vec![],
            outputs: vec![],
            gates: vec![
                XagNode::Literal(false),
                XagNode::And2 { a: fwd, b: fwd },
                XagNode::Literal(false),
            ],
        };
        f.check_invariants_with_debug_assert();
    }
}
