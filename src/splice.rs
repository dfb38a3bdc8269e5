// SPDX-License-Identifier: Apache-2.0

//! Transactional substitution: rebuilds a network with one node's cone
//! replaced by a decoded index list over existing divisor nodes.
//!
//! The rebuild goes through the builder (so folding and structural hashing
//! apply to the re-emitted gates), the substituted root's fan-outs are
//! re-pointed at the replacement operand, and a DCE sweep drops the dead
//! cone. Either the whole edit lands or the original network stays as-is;
//! no partially-rewired state escapes.

use crate::dce::dce;
use crate::gate::{XagBitVector, XagFn, XagNode, XagOperand, XagRef};
use crate::gate_builder::{BuilderOptions, XagBuilder};
use crate::index_list::XagIndexList;

/// Rebuilds `orig` with `root` replaced by `il` evaluated over `leaves`
/// (existing nodes of `orig`, all preceding `root` in the arena). The index
/// list must have exactly one output.
pub fn splice_index_list(
    orig: &XagFn,
    root: XagRef,
    leaves: &[XagRef],
    il: &XagIndexList,
    options: BuilderOptions,
) -> XagFn {
    assert_eq!(il.num_outputs(), 1, "splice expects a single-output list");
    orig.validate_ref(root);
    for leaf in leaves {
        assert!(
            leaf.id < root.id,
            "leaf %{} does not precede the root %{}",
            leaf.id,
            root.id
        );
    }
    log::trace!(
        "splice: replacing %{} with {} over {} leaves",
        root.id,
        il,
        leaves.len()
    );

    let mut gb = XagBuilder::new(orig.name.clone(), options);

    // Input bundles first, mirroring the original declaration order.
    let mut map: Vec<Option<XagOperand>> = vec![None; orig.gates.len()];
    for input in &orig.inputs {
        let bv = gb.add_input(input.name.clone(), input.get_bit_count());
        for (old, new) in input.bit_vector.iter_lsb_to_msb().zip(bv.iter_lsb_to_msb()) {
            map[old.node.id] = Some(*new);
        }
    }

    let translate = |map: &[Option<XagOperand>], op: &XagOperand| -> XagOperand {
        let mapped = map[op.node.id].expect("operand maps to an emitted node");
        if op.negated {
            mapped.negate()
        } else {
            mapped
        }
    };

    for (id, node) in orig.gates.iter().enumerate() {
        if map[id].is_some() {
            continue; // input bit, already mapped
        }
        if id == root.id {
            let leaf_ops: Vec<XagOperand> = leaves
                .iter()
                .map(|l| map[l.id].expect("leaf precedes root, so it is mapped"))
                .collect();
            let outs = il.insert(&mut gb, &leaf_ops);
            map[id] = Some(outs[0]);
            continue;
        }
        let mapped = match node {
            XagNode::Literal(false) => gb.get_false(),
            XagNode::Literal(true) => gb.get_true(),
            XagNode::Input { .. } => unreachable!("inputs are pre-mapped"),
            XagNode::And2 { a, b } => {
                let (ta, tb) = (translate(&map, a), translate(&map, b));
                gb.add_and_binary(ta, tb)
            }
            XagNode::Xor2 { a, b } => {
                let (ta, tb) = (translate(&map, a), translate(&map, b));
                gb.add_xor_binary(ta, tb)
            }
        };
        map[id] = Some(mapped);
    }

    for output in &orig.outputs {
        let bits: Vec<XagOperand> = output
            .bit_vector
            .iter_lsb_to_msb()
            .map(|op| translate(&map, op))
            .collect();
        gb.add_output(output.name.clone(), XagBitVector::from_lsb_is_index_0(&bits));
    }

    let rebuilt = gb.build();
    rebuilt.check_invariants_with_debug_assert();
    let swept = dce(&rebuilt);
    debug_assert_eq!(swept.num_input_bits(), orig.num_input_bits());
    debug_assert_eq!(swept.num_output_bits(), orig.num_output_bits());
    swept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{simulate, simulate_outputs, PatternSet};

    #[test]
    fn test_splice_replaces_cone_and_sweeps() {
        // Build or(a, b) the long way: not(and(not a, not b)) plus a
        // redundant double negation chain, then replace the root cone by a
        // single equivalent AND-encoded OR over {a, b}.
        let mut gb = XagBuilder::new("t".to_string(), BuilderOptions::no_opt());
        let a = *gb.add_input("a".to_string(), 1).get_lsb(0);
        let b = *gb.add_input("b".to_string(), 1).get_lsb(0);
        let n1 = gb.add_and_binary(a.negate(), b.negate());
        let n2 = gb.add_and_binary(n1.negate(), n1.negate());
        gb.add_output("o".to_string(), n2.into());
        let f = gb.build();
        assert_eq!(f.gate_count(), 2);

        let mut il = XagIndexList::new();
        il.add_inputs(2);
        let g = il.add_and(3, 5); // and(!a, !b)
        il.add_output(g | 1); // or(a, b)

        let leaves = vec![a.node, b.node];
        let spliced = splice_index_list(&f, n2.node, &leaves, &il, BuilderOptions::no_opt());
        assert_eq!(spliced.gate_count(), 1);

        let pats = PatternSet::exhaustive(2);
        let old_out = simulate_outputs(&f, &simulate(&f, &pats));
        let new_out = simulate_outputs(&spliced, &simulate(&spliced, &pats));
        assert_eq!(old_out, new_out);
    }

    #[test]
    fn test_splice_negated_output_literal() {
        let mut gb = XagBuilder::new("t".to_string(), BuilderOptions::no_opt());
        let a = *gb.add_input("a".to_string(), 1).get_lsb(0);
        let b = *gb.add_input("b".to_string(), 1).get_lsb(0);
        let x = gb.add_xor_binary(a, b);
        let r = gb.add_and_binary(x, x); // silly identity wrapper
        gb.add_output("o".to_string(), r.negate().into());
        let f = gb.build();

        // Replace r by not(xor(a, b)) -- the output literal is negated, and
        // the enclosing output negation must compose with it.
        let mut il = XagIndexList::new();
        il.add_inputs(2);
        let g = il.add_xor(4, 2);
        il.add_output(g | 1);
        let spliced =
            splice_index_list(&f, r.node, &[a.node, b.node], &il, BuilderOptions::no_opt());

        let pats = PatternSet::exhaustive(2);
        let want = simulate_outputs(&f, &simulate(&f, &pats));
        let got = simulate_outputs(&spliced, &simulate(&spliced, &pats));
        assert_eq!(want, got);
    }
}
