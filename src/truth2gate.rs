// SPDX-License-Identifier: Apache-2.0

//! Initial network synthesis from truth tables by Shannon expansion.
//!
//! Each output is decomposed on its topmost dependent variable into
//! cofactors; equal-complement cofactors come out as an XOR with the
//! variable, everything else as a mux. Subfunctions are memoized by truth
//! table (both polarities), so shared logic between outputs is reused.
//! The result is deliberately naive -- the optimizer driver is what makes
//! it small.

use std::collections::HashMap;

use crate::gate::{XagFn, XagOperand};
use crate::gate_builder::{BuilderOptions, XagBuilder};
use crate::truth::TruthSpec;
use crate::tt::Tt;

pub fn truth2gate(spec: &TruthSpec, name: &str) -> XagFn {
    let mut gb = XagBuilder::new(name.to_string(), BuilderOptions::opt());
    let bundle = gb.add_input("i".to_string(), spec.num_vars);
    let inputs: Vec<XagOperand> = bundle.iter_lsb_to_msb().cloned().collect();
    let mut memo: HashMap<Tt, XagOperand> = HashMap::new();
    for (k, tt) in spec.outputs.iter().enumerate() {
        let op = shannon(&mut gb, &mut memo, &inputs, tt, spec.num_vars);
        gb.add_output(format!("o{}", k), op.into());
    }
    gb.build()
}

/// Cofactor with variable `var` tied to `value`, still expressed over the
/// full minterm space.
fn cofactor(tt: &Tt, var: usize, value: bool) -> Tt {
    let num_bits = tt.num_bits();
    let mut out = Tt::zeros(num_bits);
    let bit = 1usize << var;
    for m in 0..num_bits {
        let src = if value { m | bit } else { m & !bit };
        if tt.get_bit(src) {
            out.set_bit(m);
        }
    }
    out
}

fn shannon(
    gb: &mut XagBuilder,
    memo: &mut HashMap<Tt, XagOperand>,
    inputs: &[XagOperand],
    tt: &Tt,
    top_var: usize,
) -> XagOperand {
    if tt.is_zero() {
        return gb.get_false();
    }
    if (!tt).is_zero() {
        return gb.get_true();
    }
    if let Some(&op) = memo.get(tt) {
        return op;
    }
    if let Some(&op) = memo.get(&!tt) {
        return op.negate();
    }

    // Skip variables the function does not depend on.
    let mut var = top_var;
    loop {
        debug_assert!(var > 0, "non-constant function must depend on something");
        var -= 1;
        if cofactor(tt, var, false) != cofactor(tt, var, true) {
            break;
        }
    }
    let f0 = cofactor(tt, var, false);
    let f1 = cofactor(tt, var, true);
    let x = inputs[var];

    let op = if f1 == !&f0 {
        let e0 = shannon(gb, memo, inputs, &f0, var);
        gb.add_xor_binary(x, e0)
    } else {
        let e1 = shannon(gb, memo, inputs, &f1, var);
        let e0 = shannon(gb, memo, inputs, &f0, var);
        gb.add_mux(x, e1, e0)
    };
    memo.insert(tt.clone(), op);
    op
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{simulate, simulate_outputs, PatternSet};
    use crate::truth::parse_truth;

    fn roundtrip(src: &str) {
        let spec = parse_truth(src).unwrap();
        let f = truth2gate(&spec, "t");
        let pats = PatternSet::exhaustive(spec.num_vars);
        let outs = simulate_outputs(&f, &simulate(&f, &pats));
        for (got, want) in outs.iter().zip(spec.outputs.iter()) {
            assert_eq!(got, want, "output mismatch for {:?}", src);
        }
    }

    #[test]
    fn test_synthesizes_simple_functions() {
        roundtrip("1000\n");
        roundtrip("0110\n");
        roundtrip("11101000\n");
        roundtrip("10010110\n11101000\n");
    }

    #[test]
    fn test_xor_decomposition_used() {
        // Parity decomposes into XORs, not muxes.
        let spec = parse_truth("10010110\n").unwrap();
        let f = truth2gate(&spec, "parity");
        assert!(f.gate_count() <= 2, "parity took {} gates", f.gate_count());
    }

    #[test]
    fn test_constant_output() {
        let spec = parse_truth("1111\n").unwrap();
        let f = truth2gate(&spec, "one");
        assert_eq!(f.gate_count(), 0);
        let pats = PatternSet::exhaustive(2);
        let outs = simulate_outputs(&f, &simulate(&f, &pats));
        assert_eq!(outs[0], Tt::ones(4));
    }
}
