// SPDX-License-Identifier: Apache-2.0

//! Per-node resubstitution windows over a host network.
//!
//! For each gate, in topological order: collect divisors from its
//! transitive fan-in, present their simulated tables to the resynthesis
//! engine with a budget of `mffc + max_inserts - 1`, and splice the result
//! in when it strictly reduces the live gate count.
//!
//! Validation depends on the simulation mode. With exhaustive patterns the
//! engine's care-set guarantee is complete, so candidates are re-checked by
//! evaluation and the observability-don't-care mask may widen the care set.
//! With sampled patterns a candidate can be wrong off-sample; a SAT miter
//! between the old and new root cones settles it, and a satisfying
//! assignment flows back into the pattern set as a counterexample so the
//! same wrong candidate cannot come back. Rejection is recoverable: the
//! node is left intact and a per-node retry bound stops repeat offenders.

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use varisat::ExtendFormula;

use crate::dce::dce;
use crate::divisors::{collect_divisors, fanout_counts, mffc_nodes};
use crate::gate::{XagFn, XagNode, XagOperand, XagRef};
use crate::gate_builder::BuilderOptions;
use crate::index_list::XagIndexList;
use crate::resyn::{MaxSolutions, ResynEngine, ResynOptions};
use crate::search::{SearchEngine, SearchOptions};
use crate::sim::{simulate, PatternSet};
use crate::splice::splice_index_list;
use crate::stats::{get_gate_depth, DepthStats};
use crate::topo::extract_cone;
use crate::tt::{equal_on, Tt};

#[derive(Debug, Clone)]
pub struct WindowOptions {
    /// Extra gates a candidate may use beyond replacing the MFFC.
    pub max_inserts: usize,
    /// Cut-size bound: networks with at most this many primary inputs are
    /// simulated exhaustively.
    pub max_pis: usize,
    pub max_divisors: usize,
    /// Levels of fan-out explored for observability don't-cares
    /// (exhaustive simulation only; 0 disables).
    pub odc_levels: usize,
    pub max_binates: usize,
    pub use_xor: bool,
    pub max_solutions: MaxSolutions,
    /// Treat depth as a hard bound: candidates go through the cost-aware
    /// search and may not deepen the node they replace.
    pub preserve_depth: bool,
    /// Random patterns used when the input space is too wide to enumerate.
    pub num_patterns: usize,
    /// Recorded for parity with the SAT oracle's interface; the enforced
    /// resource bound is `max_clauses`.
    pub conflict_limit: usize,
    /// Hard cap on clauses emitted per validation; overflowing candidates
    /// are discarded.
    pub max_clauses: usize,
    /// Per-node bound on failed validations before the node is left alone.
    pub max_retries: usize,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            max_inserts: 3,
            max_pis: 8,
            max_divisors: 1000,
            odc_levels: 3,
            max_binates: 50,
            use_xor: true,
            max_solutions: MaxSolutions::First,
            preserve_depth: false,
            num_patterns: 256,
            conflict_limit: 1_000_000,
            max_clauses: 100_000,
            max_retries: 3,
        }
    }
}

enum Outcome {
    NoGain,
    Accepted(XagFn),
    /// Candidate disproved by SAT; carries the counterexample assignment.
    Cex(Vec<bool>),
    Rejected,
}

/// One resubstitution pass over all gates. Returns the improved network and
/// the number of accepted substitutions.
pub fn resub_pass(
    f: &XagFn,
    opts: &WindowOptions,
    rng: &mut StdRng,
) -> Result<(XagFn, usize), String> {
    let mut f = dce(f);
    let num_pis = f.num_input_bits();
    if num_pis == 0 {
        // Constant-only network; nothing to resubstitute.
        return Ok((f, 0));
    }
    let exhaustive = num_pis <= opts.max_pis && num_pis <= 16;
    let mut pats = if exhaustive {
        PatternSet::exhaustive(num_pis)
    } else {
        PatternSet::random(num_pis, opts.num_patterns, rng)
    };

    let mut engine = ResynEngine::new(ResynOptions {
        max_binates: opts.max_binates,
        use_xor: opts.use_xor,
        max_solutions: opts.max_solutions,
        copy_tts: false,
    });
    let mut search_engine = SearchEngine::new(SearchOptions {
        use_xor: opts.use_xor,
        ..SearchOptions::default()
    });

    let mut accepted = 0usize;
    let mut retries: HashMap<usize, usize> = HashMap::new();

    'outer: loop {
        let tts = simulate(&f, &pats);
        let counts = fanout_counts(&f);
        let depths = if opts.preserve_depth {
            Some(get_gate_depth(&f))
        } else {
            None
        };
        // Ascending arena ids are the topological visit order.
        let order: Vec<XagRef> = (0..f.gates.len())
            .filter(|&id| f.gates[id].is_gate() && counts[id] > 0)
            .map(|id| XagRef { id })
            .collect();

        for n in order {
            if retries.get(&n.id).copied().unwrap_or(0) >= opts.max_retries {
                continue;
            }
            match try_node(
                &f,
                n,
                &tts,
                &counts,
                depths.as_ref(),
                opts,
                exhaustive,
                &mut engine,
                &mut search_engine,
            )? {
                Outcome::NoGain | Outcome::Rejected => continue,
                Outcome::Accepted(new_f) => {
                    accepted += 1;
                    f = new_f;
                    // Node ids shifted; retry bookkeeping restarts with the
                    // new arena.
                    retries.clear();
                    continue 'outer;
                }
                Outcome::Cex(assignment) => {
                    log::trace!("resub: counterexample recorded for %{}", n.id);
                    pats.add_pattern(&assignment);
                    *retries.entry(n.id).or_insert(0) += 1;
                    continue 'outer;
                }
            }
        }
        break;
    }

    Ok((dce(&f), accepted))
}

#[allow(clippy::too_many_arguments)]
fn try_node(
    f: &XagFn,
    n: XagRef,
    tts: &[Tt],
    counts: &[usize],
    depths: Option<&DepthStats>,
    opts: &WindowOptions,
    exhaustive: bool,
    engine: &mut ResynEngine,
    search_engine: &mut SearchEngine,
) -> Result<Outcome, String> {
    let mffc = mffc_nodes(f, n, counts);
    let divisors = collect_divisors(f, n, &mffc, opts.max_divisors);
    if divisors.is_empty() {
        return Ok(Outcome::NoGain);
    }
    let div_tts: Vec<Tt> = divisors.iter().map(|d| tts[d.id].clone()).collect();

    let target = &tts[n.id];
    let care = if exhaustive && opts.odc_levels > 0 {
        odc_care(f, n, tts, opts.odc_levels)
    } else {
        Tt::ones(target.num_bits())
    };

    let budget = mffc.len() + opts.max_inserts - 1;
    let result = match depths {
        Some(stats) => {
            // Depth-preserving mode: divisors arrive at their current
            // depths and the replacement may not deepen the node.
            let depth_of = |v: u32| stats.ref_to_depth[&divisors[(v - 1) as usize]] as u32;
            let max_depth = stats.ref_to_depth[&n] as u32;
            search_engine.resynthesize_with_depth(
                target,
                &care,
                &div_tts,
                &depth_of,
                budget as u32,
                max_depth,
            )
        }
        None => engine.resynthesize(target, &care, &div_tts, budget),
    };
    let il = match result {
        Some(il) => il,
        None => return Ok(Outcome::NoGain),
    };
    if il.num_gates() >= mffc.len() {
        return Ok(Outcome::NoGain);
    }

    // The engine's contract covers the pattern space it saw; check it held
    // up anyway (a wrong candidate here is an engine bug, which is a
    // recoverable rejection, not a crash).
    let outs = il.evaluate(&div_tts, target.num_bits());
    if !equal_on(&outs[0], target, &care) {
        log::warn!("[w] resub: candidate for %{} fails its own care set, discarding", n.id);
        return Ok(Outcome::Rejected);
    }

    if !exhaustive {
        match sat_validate(f, n, &divisors, &il, opts.max_clauses)? {
            SatOutcome::Equiv => {}
            SatOutcome::Cex(assignment) => return Ok(Outcome::Cex(assignment)),
            SatOutcome::Overflow => {
                log::warn!("[w] resub: clause budget exceeded validating %{}, discarding", n.id);
                return Ok(Outcome::Rejected);
            }
        }
    }

    let new_f = splice_index_list(f, n, &divisors, &il, BuilderOptions::opt());

    // The splice must not regress: folding could in principle reconverge,
    // so compare live gate counts rather than trusting the budget math.
    let old_live = live_gate_count(f);
    let new_live = live_gate_count(&new_f);
    if new_live >= old_live {
        return Ok(Outcome::NoGain);
    }
    log::info!(
        "[i] resub: %{} rewritten, {} -> {} live gates",
        n.id,
        old_live,
        new_live
    );
    Ok(Outcome::Accepted(new_f))
}

fn live_gate_count(f: &XagFn) -> usize {
    fanout_counts(f)
        .iter()
        .enumerate()
        .filter(|&(id, &c)| c > 0 && f.gates[id].is_gate())
        .count()
}

/// Care mask from observability: flip `n`, propagate through its fan-out
/// cone for at most `levels` steps, and collect the patterns where any
/// signal crossing the cone boundary (or a primary output) changes. The
/// complement (patterns where the flip is invisible at the boundary) is
/// don't-care.
fn odc_care(f: &XagFn, n: XagRef, tts: &[Tt], levels: usize) -> Tt {
    let num_bits = tts[n.id].num_bits();

    // Fan-out adjacency.
    let mut fanouts: Vec<Vec<usize>> = vec![Vec::new(); f.gates.len()];
    for (id, node) in f.gates.iter().enumerate() {
        for arg in node.get_args() {
            fanouts[arg.id].push(id);
        }
    }

    // Affected nodes by BFS level.
    let mut level_of: HashMap<usize, usize> = HashMap::new();
    level_of.insert(n.id, 0);
    let mut frontier = vec![n.id];
    for level in 1..=levels {
        let mut next = Vec::new();
        for &id in &frontier {
            for &fo in &fanouts[id] {
                if !level_of.contains_key(&fo) {
                    level_of.insert(fo, level);
                    next.push(fo);
                }
            }
        }
        frontier = next;
    }

    // Re-simulate the affected set with the flip applied. Arena order is
    // topological, so one forward sweep over the affected ids suffices.
    let mut affected: Vec<usize> = level_of.keys().copied().collect();
    affected.sort_unstable();
    let mut flipped: HashMap<usize, Tt> = HashMap::new();
    flipped.insert(n.id, !&tts[n.id]);
    let lookup = |flipped: &HashMap<usize, Tt>, op: &XagOperand| -> Tt {
        let base = flipped
            .get(&op.node.id)
            .cloned()
            .unwrap_or_else(|| tts[op.node.id].clone());
        if op.negated {
            !&base
        } else {
            base
        }
    };
    for &id in &affected {
        if id == n.id {
            continue;
        }
        let tt = match &f.gates[id] {
            XagNode::And2 { a, b } => &lookup(&flipped, a) & &lookup(&flipped, b),
            XagNode::Xor2 { a, b } => &lookup(&flipped, a) ^ &lookup(&flipped, b),
            _ => continue,
        };
        flipped.insert(id, tt);
    }

    // Boundary: an affected signal read by an unaffected gate or a primary
    // output is observable; collect its difference.
    let affected_set: HashSet<usize> = level_of.keys().copied().collect();
    let mut care = Tt::zeros(num_bits);
    for &id in &affected {
        let observed_outside = fanouts[id]
            .iter()
            .any(|fo| !affected_set.contains(fo));
        let is_po = f
            .output_operands()
            .iter()
            .any(|op| op.node.id == id);
        if observed_outside || is_po {
            let diff = &flipped[&id] ^ &tts[id];
            care = &care | &diff;
        }
    }
    care
}

enum SatOutcome {
    Equiv,
    Cex(Vec<bool>),
    Overflow,
}

/// Counts clauses so a runaway encoding rejects instead of stalling.
struct BudgetedSolver<'a> {
    solver: varisat::Solver<'a>,
    clauses: usize,
    max_clauses: usize,
}

impl<'a> BudgetedSolver<'a> {
    fn new(max_clauses: usize) -> Self {
        Self {
            solver: varisat::Solver::new(),
            clauses: 0,
            max_clauses,
        }
    }

    fn add_clause(&mut self, lits: &[varisat::Lit]) -> bool {
        if self.clauses >= self.max_clauses {
            return false;
        }
        self.clauses += 1;
        self.solver.add_clause(lits);
        true
    }
}

// Tseitin clauses for output <=> a AND b:
// (!a | !b | out) & (a | !out) & (b | !out)
fn add_tseitin_and(
    s: &mut BudgetedSolver,
    a: varisat::Lit,
    b: varisat::Lit,
    output: varisat::Lit,
) -> bool {
    s.add_clause(&[!a, !b, output]) && s.add_clause(&[a, !output]) && s.add_clause(&[b, !output])
}

// Clauses for out = a XOR b:
// (!a | !b | !out) & (a | b | !out) & (a | !b | out) & (!a | b | out)
fn add_tseitin_xor(
    s: &mut BudgetedSolver,
    a: varisat::Lit,
    b: varisat::Lit,
    output: varisat::Lit,
) -> bool {
    s.add_clause(&[!a, !b, !output])
        && s.add_clause(&[a, b, !output])
        && s.add_clause(&[a, !b, output])
        && s.add_clause(&[!a, b, output])
}

/// Proves the candidate equivalent to the node it replaces, or extracts a
/// counterexample assignment over the primary inputs.
fn sat_validate(
    f: &XagFn,
    root: XagRef,
    divisors: &[XagRef],
    il: &XagIndexList,
    max_clauses: usize,
) -> Result<SatOutcome, String> {
    let mut s = BudgetedSolver::new(max_clauses);

    // Clauses for the combined cone of the root and every divisor.
    let mut starts: Vec<XagRef> = divisors.to_vec();
    starts.push(root);
    let (cone_gates, cone_inputs) = extract_cone(&starts, &f.gates);

    let mut node_lit: HashMap<XagRef, varisat::Lit> = HashMap::new();
    for r in cone_gates.iter().chain(cone_inputs.iter()) {
        node_lit.insert(*r, s.solver.new_lit());
    }
    let op_lit = |node_lit: &HashMap<XagRef, varisat::Lit>, op: &XagOperand| -> varisat::Lit {
        let l = node_lit[&op.node];
        if op.negated {
            !l
        } else {
            l
        }
    };
    for r in &cone_gates {
        let out = node_lit[r];
        let ok = match &f.gates[r.id] {
            XagNode::Literal(v) => {
                if *v {
                    s.add_clause(&[out])
                } else {
                    s.add_clause(&[!out])
                }
            }
            XagNode::And2 { a, b } => {
                let (la, lb) = (op_lit(&node_lit, a), op_lit(&node_lit, b));
                add_tseitin_and(&mut s, la, lb, out)
            }
            XagNode::Xor2 { a, b } => {
                let (la, lb) = (op_lit(&node_lit, a), op_lit(&node_lit, b));
                add_tseitin_xor(&mut s, la, lb, out)
            }
            XagNode::Input { .. } => true,
        };
        if !ok {
            return Ok(SatOutcome::Overflow);
        }
    }

    // Clauses for the candidate structure over the divisor literals.
    let mut il_lits: Vec<varisat::Lit> = Vec::new();
    let false_lit = s.solver.new_lit();
    if !s.add_clause(&[!false_lit]) {
        return Ok(SatOutcome::Overflow);
    }
    il_lits.push(false_lit);
    for d in divisors {
        il_lits.push(node_lit[d]);
    }
    let wire = |il_lits: &[varisat::Lit], lit: u32| -> varisat::Lit {
        let l = il_lits[(lit >> 1) as usize];
        if lit & 1 == 1 {
            !l
        } else {
            l
        }
    };
    for entry in il.entries() {
        let out = s.solver.new_lit();
        let ok = match entry {
            crate::index_list::Entry::And(a, b) => {
                let (la, lb) = (wire(&il_lits, a), wire(&il_lits, b));
                add_tseitin_and(&mut s, la, lb, out)
            }
            crate::index_list::Entry::Xor(a, b) => {
                let (la, lb) = (wire(&il_lits, a), wire(&il_lits, b));
                add_tseitin_xor(&mut s, la, lb, out)
            }
        };
        if !ok {
            return Ok(SatOutcome::Overflow);
        }
        il_lits.push(out);
    }
    let candidate = wire(&il_lits, il.outputs()[0]);

    // Miter: satisfiable iff the candidate differs from the root somewhere.
    let miter = s.solver.new_lit();
    if !add_tseitin_xor(&mut s, node_lit[&root], candidate, miter) {
        return Ok(SatOutcome::Overflow);
    }
    s.solver.assume(&[miter]);
    match s.solver.solve() {
        Ok(false) => Ok(SatOutcome::Equiv),
        Ok(true) => {
            let model = s
                .solver
                .model()
                .ok_or_else(|| "SAT model unavailable".to_string())?;
            let model_set: HashSet<varisat::Lit> = model.into_iter().collect();
            // Assignment over all primary inputs; inputs outside the cone
            // default to false.
            let assignment: Vec<bool> = f
                .input_operands()
                .iter()
                .map(|op| {
                    node_lit
                        .get(&op.node)
                        .map(|l| model_set.contains(l))
                        .unwrap_or(false)
                })
                .collect();
            Ok(SatOutcome::Cex(assignment))
        }
        Err(e) => Err(format!("SAT solver error: {:?}", e)),
    }
}
