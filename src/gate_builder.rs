// SPDX-License-Identifier: Apache-2.0

//! The `XagBuilder` builds up an `XagFn` arena as operations are added.
//!
//! It tracks `Input` and `Output` nodes which are bundles of "primary
//! input" / "primary output" bits.
//!
//! It can be created with "folding" (opportunistic simplification) on or
//! off -- "off" is generally useful for testing there are no issues in the
//! simplification logic. With folding on, XOR operand negations are hoisted
//! onto the produced operand so that stored XOR nodes are negation-free.

use crate::gate::{Input, Output, XagBitVector, XagFn, XagNode, XagOperand, XagRef};
use crate::xag_hasher::XagHasher;

#[derive(Debug, Clone, Copy)]
pub struct BuilderOptions {
    pub fold: bool,
    pub hash: bool,
}

impl BuilderOptions {
    /// Returns a default "optimizing" configuration with folding and
    /// structural hashing enabled.
    pub fn opt() -> Self {
        Self {
            fold: true,
            hash: true,
        }
    }

    pub fn no_opt() -> Self {
        Self {
            fold: false,
            hash: false,
        }
    }
}

pub struct XagBuilder {
    pub name: String,
    pub gates: Vec<XagNode>,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    pub options: BuilderOptions,
    pub hasher: Option<XagHasher>,
}

impl XagBuilder {
    pub fn new(name: String, options: BuilderOptions) -> Self {
        Self {
            name,
            gates: vec![XagNode::Literal(false)],
            inputs: Vec::new(),
            outputs: Vec::new(),
            options,
            hasher: if options.hash {
                Some(XagHasher::new())
            } else {
                None
            },
        }
    }

    pub fn build(self) -> XagFn {
        debug_assert!(
            !self.outputs.is_empty(),
            "XagBuilder::build: graph must have at least one output (degenerate/empty graph)"
        );
        XagFn {
            name: self.name,
            inputs: self.inputs,
            outputs: self.outputs,
            gates: self.gates,
        }
    }

    pub fn get_false(&self) -> XagOperand {
        XagOperand {
            node: XagRef { id: 0 },
            negated: false,
        }
    }

    pub fn is_known_false(&self, operand: XagOperand) -> bool {
        operand.node.id == 0 && !operand.negated
    }

    pub fn get_true(&self) -> XagOperand {
        XagOperand {
            node: XagRef { id: 0 },
            negated: true,
        }
    }

    pub fn is_known_true(&self, operand: XagOperand) -> bool {
        operand.node.id == 0 && operand.negated
    }

    pub fn add_not(&self, operand: XagOperand) -> XagOperand {
        operand.negate()
    }

    pub fn add_input(&mut self, name: String, bit_count: usize) -> XagBitVector {
        let mut bits: Vec<XagOperand> = Vec::new();
        for lsb_i in 0..bit_count {
            let gate_ref = XagRef {
                id: self.gates.len(),
            };
            self.gates.push(XagNode::Input {
                name: name.clone(),
                lsb_index: lsb_i,
            });
            bits.push(gate_ref.into());
        }
        let bit_vector = XagBitVector::from_lsb_is_index_0(&bits);
        self.inputs.push(Input {
            name,
            bit_vector: bit_vector.clone(),
        });
        bit_vector
    }

    pub fn add_output(&mut self, name: String, bit_vector: XagBitVector) {
        for bit in bit_vector.iter_lsb_to_msb() {
            debug_assert!(
                bit.node.id < self.gates.len(),
                "add_output: output node index out of bounds: {} (gates.len() = {})",
                bit.node.id,
                self.gates.len()
            );
        }
        self.outputs.push(Output { name, bit_vector });
    }

    fn push_gate(&mut self, gate: XagNode) -> XagOperand {
        let gate_ref = XagRef {
            id: self.gates.len(),
        };
        self.gates.push(gate);
        if let Some(hasher) = &mut self.hasher {
            if let Some(existing) = hasher.feed_ref(&gate_ref, &self.gates) {
                // The freshly pushed duplicate stays in the arena as a dead
                // node; DCE sweeps it later.
                return existing.into();
            }
        }
        XagOperand {
            node: gate_ref,
            negated: false,
        }
    }

    pub fn add_and_binary(&mut self, lhs: XagOperand, rhs: XagOperand) -> XagOperand {
        if self.options.fold {
            if self.is_known_false(lhs) || self.is_known_false(rhs) {
                return self.get_false();
            }
            if self.is_known_true(lhs) {
                return rhs;
            }
            if self.is_known_true(rhs) {
                return lhs;
            }
            if lhs == rhs {
                return lhs;
            }
            if lhs == rhs.negate() {
                return self.get_false();
            }
        }
        self.push_gate(XagNode::And2 { a: lhs, b: rhs })
    }

    pub fn add_xor_binary(&mut self, lhs: XagOperand, rhs: XagOperand) -> XagOperand {
        if self.options.fold {
            if self.is_known_false(lhs) {
                return rhs;
            }
            if self.is_known_false(rhs) {
                return lhs;
            }
            if self.is_known_true(lhs) {
                return rhs.negate();
            }
            if self.is_known_true(rhs) {
                return lhs.negate();
            }
            if lhs == rhs {
                return self.get_false();
            }
            if lhs == rhs.negate() {
                return self.get_true();
            }
            // Hoist operand negations: xor(!a, b) == not(xor(a, b)).
            let parity = lhs.negated ^ rhs.negated;
            let a = XagOperand {
                node: lhs.node,
                negated: false,
            };
            let b = XagOperand {
                node: rhs.node,
                negated: false,
            };
            let result = self.push_gate(XagNode::Xor2 { a, b });
            return if parity { result.negate() } else { result };
        }
        self.push_gate(XagNode::Xor2 { a: lhs, b: rhs })
    }

    pub fn add_or_binary(&mut self, lhs: XagOperand, rhs: XagOperand) -> XagOperand {
        let nand = self.add_and_binary(lhs.negate(), rhs.negate());
        nand.negate()
    }

    /// Emits `sel ? on_true : on_false`.
    pub fn add_mux(
        &mut self,
        sel: XagOperand,
        on_true: XagOperand,
        on_false: XagOperand,
    ) -> XagOperand {
        let t = self.add_and_binary(sel, on_true);
        let f = self.add_and_binary(sel.negate(), on_false);
        self.add_or_binary(t, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_inputs(gb: &mut XagBuilder) -> (XagOperand, XagOperand) {
        let a = *gb.add_input("a".to_string(), 1).get_lsb(0);
        let b = *gb.add_input("b".to_string(), 1).get_lsb(0);
        (a, b)
    }

    #[test]
    fn test_and_folding() {
        let mut gb = XagBuilder::new("t".to_string(), BuilderOptions::opt());
        let (a, _b) = two_inputs(&mut gb);
        assert_eq!(gb.add_and_binary(a, gb.get_false()), gb.get_false());
        assert_eq!(gb.add_and_binary(gb.get_true(), a), a);
        assert_eq!(gb.add_and_binary(a, a), a);
        assert_eq!(gb.add_and_binary(a, a.negate()), gb.get_false());
        assert_eq!(gb.gates.len(), 3); // literal + 2 inputs, no gate emitted
    }

    #[test]
    fn test_xor_folding() {
        let mut gb = XagBuilder::new("t".to_string(), BuilderOptions::opt());
        let (a, b) = two_inputs(&mut gb);
        assert_eq!(gb.add_xor_binary(a, gb.get_false()), a);
        assert_eq!(gb.add_xor_binary(gb.get_true(), a), a.negate());
        assert_eq!(gb.add_xor_binary(a, a), gb.get_false());
        assert_eq!(gb.add_xor_binary(a, a.negate()), gb.get_true());
        // Negation hoisting: xor(!a, b) is not(xor(a, b)).
        let x = gb.add_xor_binary(a.negate(), b);
        assert!(x.negated);
        match gb.gates[x.node.id] {
            XagNode::Xor2 { a: xa, b: xb } => {
                assert!(!xa.negated && !xb.negated);
            }
            ref other => panic!("expected Xor2, got {:?}", other),
        }
    }

    #[test]
    fn test_hash_dedups_commuted_and() {
        let mut gb = XagBuilder::new("t".to_string(), BuilderOptions::opt());
        let (a, b) = two_inputs(&mut gb);
        let g1 = gb.add_and_binary(a, b);
        let g2 = gb.add_and_binary(b, a);
        assert_eq!(g1.node, g2.node);
    }
}
