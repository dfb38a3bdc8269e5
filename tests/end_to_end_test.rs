// SPDX-License-Identifier: Apache-2.0

//! End-to-end scenarios: engine contracts on concrete divisor pools, the
//! full truth-table-to-optimized-network pipeline, and reproducibility.

use xag8r::index_list::XagIndexList;
use xag8r::optimize::{optimize, OptimizeOptions};
use xag8r::resyn::{ResynEngine, ResynOptions};
use xag8r::sim::{simulate, simulate_outputs, PatternSet};
use xag8r::stats::get_summary_stats;
use xag8r::truth::parse_truth;
use xag8r::truth2gate::truth2gate;
use xag8r::tt::{equal_on, Tt};

fn tts(strs: &[&str]) -> Vec<Tt> {
    strs.iter()
        .map(|s| Tt::from_binary_str(s).unwrap())
        .collect()
}

/// Decoding and re-simulating a solution must reproduce the target on
/// every care bit, within budget (the engine's core contract).
fn assert_contract(il: &XagIndexList, divs: &[Tt], target: &Tt, care: &Tt, budget: usize) {
    let outs = il.evaluate(divs, target.num_bits());
    assert!(equal_on(&outs[0], target, care));
    assert!(il.num_gates() <= budget);
    // The decoded network has the same gate count as the list.
    let decoded = il.decode("check");
    assert_eq!(decoded.gate_count(), il.num_gates());
}

#[test]
fn test_zero_resub_by_wire() {
    let divs = tts(&["1100", "1010"]);
    let target = Tt::from_binary_str("1100").unwrap();
    let care = Tt::ones(4);
    let mut engine = ResynEngine::new(ResynOptions::default());
    let il = engine.resynthesize(&target, &care, &divs, 0).unwrap();
    assert_eq!(il.outputs(), &[2]);
    assert_contract(&il, &divs, &target, &care, 0);
}

#[test]
fn test_one_resub_or_as_inverted_and() {
    // Union of the first two divisors, with one minterm genuinely off.
    let divs = tts(&["1100", "0010", "0101"]);
    let target = Tt::from_binary_str("1110").unwrap();
    let care = Tt::ones(4);
    let mut engine = ResynEngine::new(ResynOptions::default());
    let il = engine.resynthesize(&target, &care, &divs, 1).unwrap();
    assert_eq!(il.num_gates(), 1);
    assert_contract(&il, &divs, &target, &care, 1);
}

#[test]
fn test_xor_resub() {
    let divs = tts(&["1100", "1010"]);
    let target = Tt::from_binary_str("0110").unwrap();
    let care = Tt::ones(4);
    let mut engine = ResynEngine::new(ResynOptions::default());
    let il = engine.resynthesize(&target, &care, &divs, 1).unwrap();
    assert_eq!(il.num_gates(), 1);
    assert_contract(&il, &divs, &target, &care, 1);
}

#[test]
fn test_care_masked_wire() {
    // d1 agrees with the target on the three low minterms; bit 3 is
    // don't-care, so the bare wire suffices.
    let divs = tts(&["1100", "1010"]);
    let target = Tt::from_binary_str("0100").unwrap();
    let care = Tt::from_binary_str("0111").unwrap();
    let mut engine = ResynEngine::new(ResynOptions::default());
    let il = engine.resynthesize(&target, &care, &divs, 0).unwrap();
    assert_eq!(il.outputs(), &[2]);
}

#[test]
fn test_budget_exhaustion_returns_none() {
    // Majority over its own variables with a unit budget.
    let divs = tts(&["10101010", "11001100", "11110000"]);
    let target = Tt::from_binary_str("11101000").unwrap();
    let care = Tt::ones(8);
    let mut engine = ResynEngine::new(ResynOptions::default());
    assert!(engine.resynthesize(&target, &care, &divs, 1).is_none());
}

#[test]
fn test_pipeline_multi_output_benchmark() {
    // Majority and parity sharing three inputs, like a small contest
    // benchmark row pair.
    let spec = parse_truth("11101000\n10010110\n").unwrap();
    let f = truth2gate(&spec, "bench");
    let optimized = optimize(&f, &OptimizeOptions::default()).unwrap();

    let pats = PatternSet::exhaustive(3);
    let outs = simulate_outputs(&optimized, &simulate(&optimized, &pats));
    assert_eq!(outs[0].to_binary_str(), "11101000");
    assert_eq!(outs[1].to_binary_str(), "10010110");
    // Majority takes 4 gates, parity 2; the driver must not do worse than
    // the direct decomposition.
    assert!(
        get_summary_stats(&optimized).live_gates <= get_summary_stats(&f).live_gates,
        "optimizer increased gate count"
    );
}

#[test]
fn test_pipeline_wide_benchmark() {
    // Five inputs: enough that the initial Shannon tree is clearly
    // non-minimal, while simulation stays exhaustive.
    let spec = parse_truth(concat!(
        "11101000111010001110100011101000\n",
        "00000000000000001111111111111111\n",
    ))
    .unwrap();
    let f = truth2gate(&spec, "wide");
    let optimized = optimize(&f, &OptimizeOptions::default()).unwrap();
    let pats = PatternSet::exhaustive(5);
    let outs = simulate_outputs(&optimized, &simulate(&optimized, &pats));
    for (got, want) in outs.iter().zip(spec.outputs.iter()) {
        assert_eq!(got, want);
    }
    assert!(get_summary_stats(&optimized).live_gates <= get_summary_stats(&f).live_gates);
}

#[test]
fn test_driver_is_deterministic() {
    let spec = parse_truth("1110100011101000\n0110100110010110\n").unwrap();
    let f = truth2gate(&spec, "det");
    let a = optimize(&f, &OptimizeOptions::default()).unwrap();
    let b = optimize(&f, &OptimizeOptions::default()).unwrap();
    let wa = XagIndexList::encode(&a).unwrap().to_words();
    let wb = XagIndexList::encode(&b).unwrap().to_words();
    assert_eq!(wa, wb);
}

#[test]
fn test_optimized_network_persists_through_wire_format() {
    let spec = parse_truth("11101000\n").unwrap();
    let f = truth2gate(&spec, "persist");
    let optimized = optimize(&f, &OptimizeOptions::default()).unwrap();

    let words = XagIndexList::encode(&optimized).unwrap().to_words();
    let restored = XagIndexList::from_words(&words).unwrap().decode("restored");

    let pats = PatternSet::exhaustive(3);
    let want = simulate_outputs(&optimized, &simulate(&optimized, &pats));
    let got = simulate_outputs(&restored, &simulate(&restored, &pats));
    assert_eq!(want, got);
}
