// SPDX-License-Identifier: Apache-2.0

//! Boolean-relation solving: the multi-output case of resynthesis.
//!
//! The relation is given as `2^m` target rows over a shared minterm space:
//! row `i` marks the minterms for which the m-bit output vector `i` is
//! allowed. Outputs are synthesized one at a time in declaration order.
//! For each output bit, every unmasked minterm is projected: if all rows
//! still allowing the minterm agree on that bit, the bit is forced there,
//! otherwise it is don't-care. The projection goes through the
//! single-output engine, and the synthesized function then masks every row
//! whose required bit conflicts with it, pruning the space for the
//! remaining outputs.

use crate::gate::XagOperand;
use crate::gate_builder::{BuilderOptions, XagBuilder};
use crate::index_list::XagIndexList;
use crate::resyn::{ResynEngine, ResynOptions};
use crate::tt::Tt;

pub struct BrSolver {
    engine: ResynEngine,
}

impl BrSolver {
    pub fn new(opts: ResynOptions) -> Self {
        Self {
            engine: ResynEngine::new(opts),
        }
    }

    /// Solves the relation over the divisor tables. `targets.len()` must be
    /// a power of two; its log is the output count. Returns a multi-output
    /// index list over the divisors, or `None` if some output has no
    /// feasible projection.
    pub fn solve(&mut self, divs: &[Tt], targets: &[Tt]) -> Option<XagIndexList> {
        assert!(!divs.is_empty(), "relation solver needs at least one divisor");
        assert!(
            targets.len().is_power_of_two(),
            "target row count {} is not a power of two",
            targets.len()
        );
        let tt_size = divs[0].num_bits();
        for t in targets {
            assert_eq!(t.num_bits(), tt_size, "target row width mismatch");
        }
        let num_outputs = targets.len().trailing_zeros() as usize;

        let mut mask: Vec<Tt> = vec![Tt::zeros(tt_size); targets.len()];
        let mut gb = XagBuilder::new("relation".to_string(), BuilderOptions::opt());
        let pis = gb.add_input("d".to_string(), divs.len());
        let pi_ops: Vec<XagOperand> = pis.iter_lsb_to_msb().cloned().collect();

        for tid in 0..num_outputs {
            let (tt_out, care_out) = project_output(targets, &mask, tid, tt_size);
            log::info!(
                "[i] relation: output {} projection tt={:?} care={:?}",
                tid,
                tt_out,
                care_out
            );
            let il = self
                .engine
                .resynthesize(&tt_out, &care_out, divs, usize::MAX)?;
            let po_tt = il.evaluate(divs, tt_size).pop().expect("single output");
            let outs = il.insert(&mut gb, &pi_ops);
            gb.add_output(format!("o{}", tid), outs[0].into());

            propagate_and_mask(&mut mask, tid, &po_tt);
        }

        let f = gb.build();
        XagIndexList::encode(&crate::dce::dce(&f)).ok()
    }
}

/// Projects one output bit of the relation onto a (target, care) pair.
fn project_output(
    targets: &[Tt],
    mask: &[Tt],
    tid: usize,
    tt_size: usize,
) -> (Tt, Tt) {
    let mut tt_out = Tt::zeros(tt_size);
    let mut care_out = Tt::zeros(tt_size);
    for offset in 0..tt_size {
        let mut forced: Option<bool> = None;
        let mut conflict = false;
        for (i, row) in targets.iter().enumerate() {
            if row.get_bit(offset) && !mask[i].get_bit(offset) {
                let val = (i >> tid) & 1 == 1;
                if let Some(prev) = forced {
                    if prev != val {
                        conflict = true;
                        break;
                    }
                } else {
                    forced = Some(val);
                }
            }
        }
        if conflict {
            continue; // don't-care
        }
        if let Some(val) = forced {
            care_out.set_bit(offset);
            if val {
                tt_out.set_bit(offset);
            }
        }
    }
    (tt_out, care_out)
}

/// Masks every row whose bit `tid` conflicts with the freshly synthesized
/// output, pruning the relation for subsequent outputs.
fn propagate_and_mask(mask: &mut [Tt], tid: usize, po_tt: &Tt) {
    for offset in 0..po_tt.num_bits() {
        let val = po_tt.get_bit(offset);
        for (i, m) in mask.iter_mut().enumerate() {
            let ref_val = (i >> tid) & 1 == 1;
            if ref_val != val {
                m.set_bit(offset);
            }
        }
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

    /// Every minterm's produced output vector must be allowed by the
    /// relation.
    fn check_relation(il: &XagIndexList, divs: &[Tt], targets: &[Tt]) {
        let tt_size = divs[0].num_bits();
        let outs = il.evaluate(divs, tt_size);
        for offset in 0..tt_size {
            let mut vector = 0usize;
            for (t, out) in outs.iter().enumerate() {
                if out.get_bit(offset) {
                    vector |= 1 << t;
                }
            }
            assert!(
                targets[vector].get_bit(offset),
                "minterm {} produced disallowed output vector {}",
                offset,
                vector
            );
        }
    }

    #[test]
    fn test_single_output_relation() {
        // Two complementary rows fully determine one output: the majority
        // of the three divisor variables.
        let divs = tts(&["10101010", "11001100", "11110000"]);
        let targets = tts(&["00010111", "11101000"]);
        let mut solver = BrSolver::new(ResynOptions::default());
        let il = solver.solve(&divs, &targets).unwrap();
        assert_eq!(il.num_outputs(), 1);
        check_relation(&il, &divs, &targets);
        let out = il.evaluate(&divs, 8).pop().unwrap();
        assert_eq!(out.to_binary_str(), "11101000");
    }

    #[test]
    fn test_relation_with_choice() {
        // Four rows over two outputs; rows 01 and 10 both allow some
        // minterms, so the solver has freedom and any consistent pick is
        // fine as long as the relation holds everywhere.
        let divs = tts(&["1010", "1100"]);
        let targets = tts(&[
            "1000", // 00 allowed where both inputs are 1... (minterm 3)
            "0110", // 01 allowed on minterms 1, 2
            "0110", // 10 also allowed on minterms 1, 2
            "0001", // 11 allowed on minterm 0
        ]);
        let mut solver = BrSolver::new(ResynOptions::default());
        let il = solver.solve(&divs, &targets).unwrap();
        assert_eq!(il.num_outputs(), 2);
        check_relation(&il, &divs, &targets);
    }

    #[test]
    fn test_infeasible_projection_returns_none() {
        // A single divisor cannot express the forced output (XOR-like
        // pattern needs more), and the relation leaves no don't-care room.
        let divs = tts(&["1100"]);
        let targets = tts(&["1001", "0110"]);
        let mut solver = BrSolver::new(ResynOptions::default());
        assert!(solver.solve(&divs, &targets).is_none());
    }
}
