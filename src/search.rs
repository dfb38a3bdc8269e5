// SPDX-License-Identifier: Apache-2.0

//! Cost-aware resynthesis: an A*-style best-first search over partial
//! decompositions, used when divisors carry non-uniform costs (e.g. depth).
//!
//! Each task holds the interned (off-set, on-set) remainder of the target,
//! a `(size, depth)` lower bound, and a back-pointer into an append-only
//! vector of dequeued tasks. Expanding a task commits one divisor's
//! unateness action (AND, OR, or XOR at the top) and shrinks the remainder
//! accordingly. Dominated subtasks (a known cheaper route to the same
//! remainder pair), commutative duplicates, and over-long XOR chains are
//! pruned. When a task's remainder collapses, the parent chain is
//! back-traced and runs of same-typed gates are re-merged as balanced
//! trees to minimize output depth.
//!
//! Scratch state (queue, memo, interner, dequeue vector) lives for a
//! single call; the engine itself is reusable.

use std::cmp::Reverse;
use std::collections::hash_map::Entry;
use std::collections::{BinaryHeap, HashMap};

use crate::index_list::XagIndexList;
use crate::tt::{intersection_is_empty, Tt};

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub use_xor: bool,
    /// Max XOR gates along any expansion branch.
    pub max_xor: u32,
    /// Queue-expansion cap per call.
    pub max_enqueue: usize,
    pub size_cost_of_and: u32,
    pub size_cost_of_xor: u32,
    pub depth_cost_of_and: u32,
    pub depth_cost_of_xor: u32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            use_xor: true,
            max_xor: 1,
            max_enqueue: 1000,
            size_cost_of_and: 1,
            size_cost_of_xor: 1,
            depth_cost_of_and: 1,
            depth_cost_of_xor: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateType {
    And,
    Or,
    Xor,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LitType {
    Equal,
    EqualInv,
    PosUnate,
    NegUnate,
    PosUnateInv,
    NegUnateInv,
    Binate,
    DontCare,
}

#[derive(Debug, Clone)]
struct Task {
    /// Interned (off-set, on-set) ids of the remainder.
    sets: [u32; 2],
    /// Lower-bound (size, depth) cost.
    cost: (u32, u32),
    /// Remaining minterm count; smaller means closer to terminal.
    score: u32,
    /// Index of the parent in the dequeued-task vector.
    prev: usize,
    done: bool,
    ntype: GateType,
    lit: u32,
    num_xor: u32,
}

// Heap ordering: size lower bound first, then the most-likely-terminal
// (smallest remainder) first.
impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.cost.0 == other.cost.0 && self.score == other.score
    }
}
impl Eq for Task {}
impl PartialOrd for Task {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Task {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.cost.0, self.score).cmp(&(other.cost.0, other.score))
    }
}

/// Retained form of a dequeued task, kept for back-tracing.
#[derive(Debug, Clone, Copy)]
struct DeqTask {
    cost: (u32, u32),
    prev: usize,
    ntype: GateType,
    lit: u32,
}

impl From<&Task> for DeqTask {
    fn from(t: &Task) -> Self {
        DeqTask {
            cost: t.cost,
            prev: t.prev,
            ntype: t.ntype,
            lit: t.lit,
        }
    }
}

/// Canonically-hashed truth table store; ids are stable for one call.
#[derive(Default)]
struct TtInterner {
    tt_to_id: HashMap<Tt, u32>,
    id_to_tt: Vec<Tt>,
    id_to_num: Vec<u32>,
}

impl TtInterner {
    fn clear(&mut self) {
        self.tt_to_id.clear();
        self.id_to_tt.clear();
        self.id_to_num.clear();
    }

    fn to_id(&mut self, tt: Tt) -> u32 {
        if let Some(&id) = self.tt_to_id.get(&tt) {
            return id;
        }
        let id = self.id_to_tt.len() as u32;
        self.id_to_num.push(tt.count_ones() as u32);
        self.tt_to_id.insert(tt.clone(), id);
        self.id_to_tt.push(tt);
        id
    }

    fn to_tt(&self, id: u32) -> &Tt {
        &self.id_to_tt[id as usize]
    }

    fn to_num(&self, id: u32) -> u32 {
        self.id_to_num[id as usize]
    }
}

pub struct SearchEngine {
    opts: SearchOptions,
    interner: TtInterner,
    /// Dequeued tasks, append-only; parent links are indices into this.
    mem: Vec<DeqTask>,
    /// `(off_id, on_id) -> best size cost` dominance memo (key normalized).
    best_cost: HashMap<(u32, u32), u32>,
    index_list: XagIndexList,
    upper_bound: u32,
}

impl SearchEngine {
    pub fn new(opts: SearchOptions) -> Self {
        Self {
            opts,
            interner: TtInterner::default(),
            mem: Vec::new(),
            best_cost: HashMap::new(),
            index_list: XagIndexList::new(),
            upper_bound: u32::MAX,
        }
    }

    /// Like `ResynEngine::resynthesize` but under a per-divisor depth cost:
    /// `depth_of(v)` is the arrival depth of divisor `v` (1-based; 0 names
    /// the constant and must return 0). Every output of the result respects
    /// `max_depth` in addition to the size bound.
    pub fn resynthesize_with_depth(
        &mut self,
        target: &Tt,
        care: &Tt,
        divs: &[Tt],
        depth_of: &dyn Fn(u32) -> u32,
        max_size: u32,
        max_depth: u32,
    ) -> Option<XagIndexList> {
        self.index_list.clear();
        self.index_list.add_inputs(divs.len() as u32);

        // Trivial solutions; the on-set test goes first so that an empty
        // care mask yields constant false.
        let off = &!target & care;
        let on = target & care;
        if on.count_ones() == 0 {
            self.index_list.add_output(0);
            return Some(self.index_list.clone());
        }
        if off.count_ones() == 0 {
            self.index_list.add_output(1);
            return Some(self.index_list.clone());
        }

        self.upper_bound = max_size;
        self.mem.clear();
        self.interner.clear();
        self.best_cost.clear();

        let mut init = Task {
            sets: [0, 0],
            cost: (0, 0),
            score: 0,
            prev: 0,
            done: false,
            ntype: GateType::None,
            lit: 0,
            num_xor: 0,
        };
        init.sets[0] = self.interner.to_id(off);
        init.sets[1] = self.interner.to_id(on);

        let mut queue: BinaryHeap<Reverse<Task>> = BinaryHeap::new();
        queue.push(Reverse(init));

        while let Some(Reverse(t)) = queue.pop() {
            self.mem.push(DeqTask::from(&t));
            // Back-trace succeeded tasks.
            if t.done {
                let (depth, output) = self.back_trace(self.mem.len() - 1, depth_of);
                if depth > max_depth {
                    log::trace!(
                        "search: balanced solution depth {} exceeds bound {}",
                        depth,
                        max_depth
                    );
                    return None;
                }
                self.index_list.add_output(output);
                return Some(self.index_list.clone());
            }
            if t.cost.0 >= self.upper_bound {
                break;
            }
            if queue.len() >= self.opts.max_enqueue {
                break;
            }

            self.add_neighbors(&t, divs, depth_of, max_depth, &mut queue);
        }
        None
    }

    fn add_neighbors(
        &mut self,
        t: &Task,
        divs: &[Tt],
        depth_of: &dyn Fn(u32) -> u32,
        max_depth: u32,
        queue: &mut BinaryHeap<Reverse<Task>>,
    ) {
        for v in 1..=divs.len() as u32 {
            if let Some(sub) = self.find_unate_subtask(t, divs, v, depth_of, max_depth) {
                if sub.done {
                    self.upper_bound = sub.cost.0;
                }
                queue.push(Reverse(sub));
            }
        }
    }

    fn check_unateness(&self, off: &Tt, on: &Tt, tt: &Tt) -> LitType {
        let u = [
            intersection_is_empty::<false, false>(tt, off),
            intersection_is_empty::<true, false>(tt, off),
            intersection_is_empty::<false, false>(tt, on),
            intersection_is_empty::<true, false>(tt, on),
        ];
        if (u[0] && u[2]) || (u[1] && u[3]) {
            return LitType::DontCare;
        }
        if u[0] && u[3] {
            return LitType::Equal;
        }
        if u[1] && u[2] {
            return LitType::EqualInv;
        }
        if u[0] {
            return LitType::PosUnate;
        }
        if u[1] {
            return LitType::PosUnateInv;
        }
        if u[2] {
            return LitType::NegUnateInv;
        }
        if u[3] {
            return LitType::NegUnate;
        }
        LitType::Binate
    }

    fn find_unate_subtask(
        &mut self,
        t: &Task,
        divs: &[Tt],
        v: u32,
        depth_of: &dyn Fn(u32) -> u32,
        max_depth: u32,
    ) -> Option<Task> {
        let tt = &divs[(v - 1) as usize];
        let off = t.sets[0];
        let on = t.sets[1];
        let ltype = self.check_unateness(self.interner.to_tt(off), self.interner.to_tt(on), tt);

        let mut lit = v << 1;
        let mut done = false;
        let ntype = match ltype {
            LitType::DontCare => return None,
            LitType::Equal => {
                done = true;
                GateType::None
            }
            LitType::EqualInv => {
                done = true;
                lit += 1;
                GateType::None
            }
            LitType::PosUnate => GateType::Or,
            LitType::PosUnateInv => {
                lit += 1;
                GateType::Or
            }
            LitType::NegUnate => GateType::And,
            LitType::NegUnateInv => {
                lit += 1;
                GateType::And
            }
            LitType::Binate => GateType::Xor,
        };

        if !self.opts.use_xor && ntype == GateType::Xor {
            return None;
        }

        // Commutativity: within a same-typed run, only expand divisors in
        // increasing index order.
        if ntype != GateType::None && ntype == t.ntype && (lit >> 1) <= (t.lit >> 1) {
            return None;
        }

        // The parent is always the most recently dequeued task.
        let cost = self.get_cost(self.mem.len() - 1, lit, ntype, depth_of);
        if cost.0 >= self.upper_bound || cost.1 > max_depth {
            return None;
        }

        let mut sub = Task {
            sets: [off, on],
            cost,
            score: 0,
            prev: self.mem.len() - 1,
            done,
            ntype,
            lit,
            num_xor: t.num_xor,
        };
        if ntype == GateType::Xor {
            if t.num_xor >= self.opts.max_xor {
                return None;
            }
            sub.num_xor = t.num_xor + 1;
        }
        if !done {
            let (new_off, new_on) = self.tt_move(off, on, divs, lit, ntype);
            if !self.check_cost(new_off, new_on, cost.0) {
                return None;
            }
            sub.sets = [new_off, new_on];
            sub.score = self.interner.to_num(new_off) + self.interner.to_num(new_on);
        }
        Some(sub)
    }

    /// Updates the remainder sets after committing `lit` with gate `ntype`
    /// at the top.
    fn tt_move(
        &mut self,
        off: u32,
        on: u32,
        divs: &[Tt],
        lit: u32,
        ntype: GateType,
    ) -> (u32, u32) {
        let d = &divs[((lit >> 1) - 1) as usize];
        let tt = if lit & 1 == 1 { !d } else { d.clone() };
        match ntype {
            GateType::Or => {
                let new_on = &!&tt & self.interner.to_tt(on);
                (off, self.interner.to_id(new_on))
            }
            GateType::And => {
                let new_off = &tt & self.interner.to_tt(off);
                (self.interner.to_id(new_off), on)
            }
            GateType::Xor => {
                let off_tt = self.interner.to_tt(off).clone();
                let on_tt = self.interner.to_tt(on).clone();
                let not_tt = !&tt;
                let new_off = &(&not_tt & &off_tt) | &(&tt & &on_tt);
                let new_on = &(&not_tt & &on_tt) | &(&tt & &off_tt);
                (self.interner.to_id(new_off), self.interner.to_id(new_on))
            }
            GateType::None => (off, on),
        }
    }

    /// Lower-bound cost of extending the chain at `pos` with `lit`.
    fn get_cost(
        &self,
        pos: usize,
        lit: u32,
        ntype: GateType,
        depth_of: &dyn Fn(u32) -> u32,
    ) -> (u32, u32) {
        let parent = &self.mem[pos];
        let mut size_cost = parent.cost.0;
        if parent.ntype != GateType::None {
            size_cost += match parent.ntype {
                GateType::Xor => self.opts.size_cost_of_xor,
                _ => self.opts.size_cost_of_and,
            };
        }
        let depth_step = match ntype {
            GateType::Xor => self.opts.depth_cost_of_xor,
            GateType::And | GateType::Or => self.opts.depth_cost_of_and,
            GateType::None => 1,
        };
        let lit_depth = if lit >> 1 == 0 { 0 } else { depth_of(lit >> 1) };
        let depth_cost = std::cmp::max(parent.cost.1, lit_depth) + depth_step;
        (size_cost, depth_cost)
    }

    /// Returns true when `(off, on) -> cost` improves on the memoized best.
    fn check_cost(&mut self, x: u32, y: u32, cost: u32) -> bool {
        let key = (x.min(y), x.max(y));
        match self.best_cost.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(cost);
                true
            }
            Entry::Occupied(mut best) => {
                if *best.get() > cost {
                    best.insert(cost);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Reconstructs the circuit from a terminal task: literals of each
    /// same-typed run are merged through a min-heap of depths (pop the two
    /// shallowest, push the merged gate one level deeper), which yields a
    /// balanced tree per run.
    fn back_trace(&mut self, pos: usize, depth_of: &dyn Fn(u32) -> u32) -> (u32, u32) {
        let lit_depth = |lit: u32| -> u32 {
            if lit >> 1 == 0 {
                0
            } else {
                depth_of(lit >> 1)
            }
        };
        let mut cand_q: BinaryHeap<Reverse<(u32, u32)>> = BinaryHeap::new();
        let mut p = pos;
        cand_q.push(Reverse((lit_depth(self.mem[p].lit), self.mem[p].lit)));
        while self.mem[p].prev != 0 {
            loop {
                p = self.mem[p].prev;
                cand_q.push(Reverse((lit_depth(self.mem[p].lit), self.mem[p].lit)));
                if self.mem[p].ntype != self.mem[self.mem[p].prev].ntype {
                    break;
                }
            }
            let run_type = self.mem[p].ntype;
            while cand_q.len() > 1 {
                let Reverse(fanin1) = cand_q.pop().unwrap();
                let Reverse(fanin2) = cand_q.pop().unwrap();
                let new_lit = match run_type {
                    GateType::And => self.index_list.add_and(fanin1.1, fanin2.1),
                    GateType::Or => self.index_list.add_and(fanin1.1 ^ 1, fanin2.1 ^ 1) ^ 1,
                    GateType::Xor => self.index_list.add_xor(fanin1.1, fanin2.1),
                    GateType::None => unreachable!("runs never have type None"),
                };
                let new_cost = fanin2.0 + 1;
                cand_q.push(Reverse((new_cost, new_lit)));
            }
        }
        let Reverse(top) = cand_q.pop().unwrap();
        top
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tt::equal_on;

    fn tts(strs: &[&str]) -> Vec<Tt> {
        strs.iter()
            .map(|s| Tt::from_binary_str(s).unwrap())
            .collect()
    }

    fn zero_depth(_v: u32) -> u32 {
        0
    }

    fn check_solution(il: &XagIndexList, divs: &[Tt], target: &Tt, care: &Tt) {
        let outs = il.evaluate(divs, target.num_bits());
        assert_eq!(outs.len(), 1);
        assert!(
            equal_on(&outs[0], target, care),
            "solution {} evaluates to {:?}, want {:?}",
            il,
            outs[0],
            target
        );
    }

    #[test]
    fn test_wire_through_search() {
        let divs = tts(&["1100", "1010"]);
        let target = Tt::from_binary_str("0011").unwrap();
        let care = Tt::ones(4);
        let mut engine = SearchEngine::new(SearchOptions::default());
        let il = engine
            .resynthesize_with_depth(&target, &care, &divs, &zero_depth, 10, 10)
            .unwrap();
        assert_eq!(il.num_gates(), 0);
        assert_eq!(il.outputs(), &[3]); // not(d1)
    }

    #[test]
    fn test_empty_care_is_constant_false() {
        let divs = tts(&["1100"]);
        let target = Tt::from_binary_str("0110").unwrap();
        let care = Tt::zeros(4);
        let mut engine = SearchEngine::new(SearchOptions::default());
        let il = engine
            .resynthesize_with_depth(&target, &care, &divs, &zero_depth, 10, 10)
            .unwrap();
        assert_eq!(il.outputs(), &[0]);
    }

    #[test]
    fn test_or_chain_is_balanced() {
        // Four disjoint divisors, target is their union (bit 15 stays off so
        // the constant does not win). The committed chain has four OR
        // literals; the balanced rebuild must come out at depth 2.
        let divs = tts(&[
            "0000000000001111",
            "0000000011110000",
            "0000111100000000",
            "0111000000000000",
        ]);
        let target = Tt::from_binary_str("0111111111111111").unwrap();
        let care = Tt::ones(16);
        let mut engine = SearchEngine::new(SearchOptions::default());
        let il = engine
            .resynthesize_with_depth(&target, &care, &divs, &zero_depth, 10, 10)
            .unwrap();
        check_solution(&il, &divs, &target, &care);
        assert_eq!(il.num_gates(), 3);
        let decoded = il.decode("balanced");
        let stats = crate::stats::get_gate_depth(&decoded);
        assert_eq!(stats.deepest_path, 2);
    }

    #[test]
    fn test_depth_cost_prefers_shallow_divisor() {
        // Both d2 and d3 complete the cover, but d3 arrives much deeper;
        // the returned solution must not use it.
        let divs = tts(&["11000000", "00110000", "00110000"]);
        let target = Tt::from_binary_str("11110000").unwrap();
        let care = Tt::ones(8);
        let depth_of = |v: u32| -> u32 {
            match v {
                3 => 10,
                _ => 0,
            }
        };
        let mut engine = SearchEngine::new(SearchOptions::default());
        let il = engine
            .resynthesize_with_depth(&target, &care, &divs, &depth_of, 10, 3)
            .unwrap();
        check_solution(&il, &divs, &target, &care);
        for entry in il.entries() {
            let (a, b) = match entry {
                crate::index_list::Entry::And(a, b) | crate::index_list::Entry::Xor(a, b) => (a, b),
            };
            assert_ne!(a >> 1, 3, "deep divisor used: {}", il);
            assert_ne!(b >> 1, 3, "deep divisor used: {}", il);
        }
    }

    #[test]
    fn test_xor_cap_forces_failure() {
        // Parity of three variables needs two XOR gates; with the chain
        // capped at one XOR and only three gates allowed there is no
        // solution.
        let divs = tts(&["10101010", "11001100", "11110000"]);
        let target = Tt::from_binary_str("10010110").unwrap();
        let care = Tt::ones(8);
        let mut engine = SearchEngine::new(SearchOptions::default());
        assert!(engine
            .resynthesize_with_depth(&target, &care, &divs, &zero_depth, 3, 10)
            .is_none());
    }

    #[test]
    fn test_deterministic_across_runs() {
        let divs = tts(&["10101010", "11001100", "11110000"]);
        let target = Tt::from_binary_str("11101000").unwrap();
        let care = Tt::ones(8);
        let mut e1 = SearchEngine::new(SearchOptions::default());
        let mut e2 = SearchEngine::new(SearchOptions::default());
        let r1 = e1.resynthesize_with_depth(&target, &care, &divs, &zero_depth, 10, 10);
        let r2 = e2.resynthesize_with_depth(&target, &care, &divs, &zero_depth, 10, 10);
        assert_eq!(r1, r2);
    }
}
