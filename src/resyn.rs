// SPDX-License-Identifier: Apache-2.0

//! Logic resynthesis by recursive decomposition.
//!
//! Given a target function, a care mask, and a pool of divisor truth
//! tables, finds a small AND/XOR expression over the divisors that agrees
//! with the target on every care bit, or reports that none exists within
//! the size budget.
//!
//! Divisors are classified as positive unate (not overlapping the target
//! off-set), negative unate (not overlapping the on-set), or binate
//! (overlapping both). Pairs of binate divisors are combined with AND under
//! all four polarities (and with XOR) and classified the same way. Simple
//! solutions of zero cost (one unate divisor), one node (two unate
//! divisors), two nodes (divisor + pair), and three nodes (two pairs) are
//! examined exhaustively; failing that, the highest-scoring unate divisor
//! or pair divides the target and the engine recurses on the remainder.
//!
//! A pair's stored operand ordering doubles as its gate-type discriminator
//! (`lit1 < lit2` is an AND pair, `lit1 > lit2` an XOR pair), and the XOR
//! polarity formulas are asymmetric in the two literals; both conventions
//! must be kept in sync with the index list's entry encoding.

use crate::index_list::XagIndexList;
use crate::tt::{intersection_is_empty_masked, Tt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxSolutions {
    /// Return the first solution the rule ladder finds.
    First,
    /// Accumulate candidates (including the negated-target dual) and return
    /// the one with the fewest gates.
    All,
}

#[derive(Debug, Clone)]
pub struct ResynOptions {
    /// Cap on binate divisors kept for pair collection.
    pub max_binates: usize,
    /// Whether XOR gates may be emitted.
    pub use_xor: bool,
    pub max_solutions: MaxSolutions,
    /// Whether the engine clones divisor tables up front instead of
    /// borrowing the caller's storage for the whole call.
    pub copy_tts: bool,
}

impl Default for ResynOptions {
    fn default() -> Self {
        Self {
            max_binates: 50,
            use_xor: true,
            max_solutions: MaxSolutions::First,
            copy_tts: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct UnateLit {
    lit: u32,
    score: usize,
}

#[derive(Debug, Clone, Copy)]
struct FaninPair {
    lit1: u32,
    lit2: u32,
    score: usize,
}

impl FaninPair {
    /// AND pair: stored ascending.
    fn and(l1: u32, l2: u32) -> Self {
        FaninPair {
            lit1: l1.min(l2),
            lit2: l1.max(l2),
            score: 0,
        }
    }

    /// XOR pair: stored descending; the ordering is the discriminator.
    fn xor(l1: u32, l2: u32) -> Self {
        FaninPair {
            lit1: l1.max(l2),
            lit2: l1.min(l2),
            score: 0,
        }
    }

    fn is_xor(&self) -> bool {
        self.lit1 > self.lit2
    }
}

/// One resynthesis call owns all of its scratch state; the engine is
/// reusable across calls and never allocates globally.
pub struct ResynEngine {
    opts: ResynOptions,
    /// `[0]` is the off-set, `[1]` the on-set of the current (sub)task.
    on_off_sets: [Tt; 2],
    num_bits: [usize; 2],
    pos_unate_lits: Vec<UnateLit>,
    neg_unate_lits: Vec<UnateLit>,
    binate_divs: Vec<u32>,
    pos_unate_pairs: Vec<FaninPair>,
    neg_unate_pairs: Vec<FaninPair>,
    index_list: XagIndexList,
}

impl ResynEngine {
    pub fn new(opts: ResynOptions) -> Self {
        Self {
            opts,
            on_off_sets: [Tt::zeros(1), Tt::zeros(1)],
            num_bits: [0, 0],
            pos_unate_lits: Vec::new(),
            neg_unate_lits: Vec::new(),
            binate_divs: Vec::new(),
            pos_unate_pairs: Vec::new(),
            neg_unate_pairs: Vec::new(),
            index_list: XagIndexList::new(),
        }
    }

    /// Finds an index list over `divs` that equals `target` wherever `care`
    /// is 1, using at most `max_size` gates. `divs[v - 1]` is divisor `v`
    /// (node 0 is the reserved constant).
    pub fn resynthesize(
        &mut self,
        target: &Tt,
        care: &Tt,
        divs: &[Tt],
        max_size: usize,
    ) -> Option<XagIndexList> {
        let owned;
        let divs = if self.opts.copy_tts {
            owned = divs.to_vec();
            &owned[..]
        } else {
            divs
        };
        match self.opts.max_solutions {
            MaxSolutions::First => self.compute_function(target, care, divs, max_size),
            MaxSolutions::All => {
                let direct = self.compute_function(target, care, divs, max_size);
                let dual = self
                    .compute_function(&!target, care, divs, max_size)
                    .map(negate_single_output);
                match (direct, dual) {
                    (Some(a), Some(b)) => Some(if b.num_gates() < a.num_gates() { b } else { a }),
                    (a, b) => a.or(b),
                }
            }
        }
    }

    fn compute_function(
        &mut self,
        target: &Tt,
        care: &Tt,
        divs: &[Tt],
        max_size: usize,
    ) -> Option<XagIndexList> {
        self.on_off_sets[0] = &!target & care;
        self.on_off_sets[1] = target & care;
        self.index_list.clear();
        self.index_list.add_inputs(divs.len() as u32);
        let lit = self.compute_function_rec(divs, max_size)?;
        debug_assert!(
            self.index_list.num_gates() <= max_size,
            "engine exceeded its own size budget: {} > {}",
            self.index_list.num_gates(),
            max_size
        );
        self.index_list.add_output(lit);
        Some(self.index_list.clone())
    }

    fn get_div<'a>(&self, divs: &'a [Tt], v: u32) -> &'a Tt {
        &divs[(v - 1) as usize]
    }

    /// Table of a literal: the divisor, complemented when bit 0 is set.
    fn lit_tt(&self, divs: &[Tt], lit: u32) -> Tt {
        let d = self.get_div(divs, lit >> 1);
        if lit & 1 == 1 {
            !d
        } else {
            d.clone()
        }
    }

    /// Complement of a literal's table.
    fn lit_tt_neg(&self, divs: &[Tt], lit: u32) -> Tt {
        let d = self.get_div(divs, lit >> 1);
        if lit & 1 == 1 {
            d.clone()
        } else {
            !d
        }
    }

    /// Complement of a pair's composite function. For an XOR pair
    /// `~(l1 ^ l2) = ~l1 ^ l2`: the first literal's polarity enters
    /// inverted, the second as-is. For an AND pair
    /// `~(l1 & l2) = ~l1 | ~l2`.
    fn pair_tt_neg(&self, divs: &[Tt], pair: &FaninPair) -> Tt {
        if self.opts.use_xor && pair.is_xor() {
            &self.lit_tt_neg(divs, pair.lit1) ^ &self.lit_tt(divs, pair.lit2)
        } else {
            &self.lit_tt_neg(divs, pair.lit1) | &self.lit_tt_neg(divs, pair.lit2)
        }
    }

    /// Appends the pair's gate to the index list and returns its literal.
    fn add_pair_gate(&mut self, pair: &FaninPair) -> u32 {
        if self.opts.use_xor && pair.is_xor() {
            self.index_list.add_xor(pair.lit1, pair.lit2)
        } else {
            self.index_list.add_and(pair.lit1, pair.lit2)
        }
    }

    fn compute_function_rec(&mut self, divs: &[Tt], num_inserts: usize) -> Option<u32> {
        self.pos_unate_lits.clear();
        self.neg_unate_lits.clear();
        self.binate_divs.clear();
        self.pos_unate_pairs.clear();
        self.neg_unate_pairs.clear();

        // Try 0-resub and collect unate literals.
        if let Some(res0) = self.find_one_unate(divs) {
            return Some(res0);
        }
        if num_inserts == 0 {
            return None;
        }

        // Sort unate literals and try 1-resub.
        self.sort_unate_lits(divs, true);
        self.sort_unate_lits(divs, false);
        if let Some(res) = self.find_div_div(divs, 1) {
            return Some(res);
        }
        if let Some(res) = self.find_div_div(divs, 0) {
            return Some(res);
        }

        if self.binate_divs.len() > self.opts.max_binates {
            self.binate_divs.truncate(self.opts.max_binates);
        }

        if self.opts.use_xor {
            // Collect XOR-type unate pairs and try 1-resub with XOR.
            if let Some(res) = self.find_xor(divs) {
                return Some(res);
            }
        }
        if num_inserts == 1 {
            return None;
        }

        // Collect AND-type unate pairs, sort both kinds, then try 2- and
        // 3-resub.
        self.collect_unate_pairs(divs);
        self.sort_unate_pairs(divs, true);
        self.sort_unate_pairs(divs, false);
        if let Some(res) = self.find_div_pair(divs, 1) {
            return Some(res);
        }
        if let Some(res) = self.find_div_pair(divs, 0) {
            return Some(res);
        }

        if num_inserts >= 3 {
            if let Some(res) = self.find_pair_pair(divs, 1) {
                return Some(res);
            }
            if let Some(res) = self.find_pair_pair(divs, 0) {
                return Some(res);
            }
        }

        // Choose something to divide with and recurse on the remainder.
        // Dividing ANDs the on-set (positive unate) or the off-set (negative
        // unate) with the *negation* of the chosen divisor or pair.
        let mut on_off_div = 0usize;
        let mut on_off_pair = 0usize;
        let mut score_div = 0usize;
        let mut score_pair = 0usize;

        if !self.pos_unate_lits.is_empty() {
            on_off_div = 1;
            score_div = self.pos_unate_lits[0].score;
            if !self.neg_unate_lits.is_empty() && self.neg_unate_lits[0].score > score_div {
                on_off_div = 0;
                score_div = self.neg_unate_lits[0].score;
            }
        } else if !self.neg_unate_lits.is_empty() {
            score_div = self.neg_unate_lits[0].score;
        }

        if num_inserts > 3 {
            if !self.pos_unate_pairs.is_empty() {
                on_off_pair = 1;
                score_pair = self.pos_unate_pairs[0].score;
                if !self.neg_unate_pairs.is_empty() && self.neg_unate_pairs[0].score > score_pair {
                    on_off_pair = 0;
                    score_pair = self.neg_unate_pairs[0].score;
                }
            } else if !self.neg_unate_pairs.is_empty() {
                score_pair = self.neg_unate_pairs[0].score;
            }
        }

        if score_div > score_pair / 2 {
            // Divide with a divisor: positive unate modifies the on-set with
            // an OR gate on top, negative unate the off-set with an AND.
            let lit = if on_off_div == 1 {
                self.pos_unate_lits[0].lit
            } else {
                self.neg_unate_lits[0].lit
            };
            let subtract = self.lit_tt_neg(divs, lit);
            self.on_off_sets[on_off_div] &= &subtract;

            if let Some(remainder) = self.compute_function_rec(divs, num_inserts - 1) {
                let new_lit = self
                    .index_list
                    .add_and(lit ^ 1, remainder ^ on_off_div as u32);
                return Some(new_lit + on_off_div as u32);
            }
        } else if score_pair > 0 {
            let pair = if on_off_pair == 1 {
                self.pos_unate_pairs[0]
            } else {
                self.neg_unate_pairs[0]
            };
            let subtract = self.pair_tt_neg(divs, &pair);
            self.on_off_sets[on_off_pair] &= &subtract;

            if let Some(remainder) = self.compute_function_rec(divs, num_inserts - 2) {
                let new_lit1 = self.add_pair_gate(&pair);
                let new_lit2 = self
                    .index_list
                    .add_and(new_lit1 ^ 1, remainder ^ on_off_pair as u32);
                return Some(new_lit2 + on_off_pair as u32);
            }
        }

        None
    }

    /// Constant/wire cases and unate-literal collection:
    /// 1. empty on-set returns constant false, empty off-set constant true
    ///    (on-set first, so an empty care mask yields literal 0);
    /// 2. a divisor equal (or inverse-equal) to the target on care is a
    ///    0-resub wire;
    /// 3. otherwise literals are binned as unate or binate.
    fn find_one_unate(&mut self, divs: &[Tt]) -> Option<u32> {
        self.num_bits[0] = self.on_off_sets[0].count_ones();
        self.num_bits[1] = self.on_off_sets[1].count_ones();
        if self.num_bits[1] == 0 {
            return Some(0);
        }
        if self.num_bits[0] == 0 {
            return Some(1);
        }

        for v in 1..=divs.len() as u32 {
            let div = self.get_div(divs, v);
            let mut unateness = [false; 4];
            // Intersection with the off-set.
            if crate::tt::intersection_is_empty::<false, false>(div, &self.on_off_sets[0]) {
                self.pos_unate_lits.push(UnateLit {
                    lit: v << 1,
                    score: 0,
                });
                unateness[0] = true;
            } else if crate::tt::intersection_is_empty::<true, false>(div, &self.on_off_sets[0]) {
                self.pos_unate_lits.push(UnateLit {
                    lit: (v << 1) | 1,
                    score: 0,
                });
                unateness[1] = true;
            }

            // Intersection with the on-set.
            if crate::tt::intersection_is_empty::<false, false>(div, &self.on_off_sets[1]) {
                self.neg_unate_lits.push(UnateLit {
                    lit: v << 1,
                    score: 0,
                });
                unateness[2] = true;
            } else if crate::tt::intersection_is_empty::<true, false>(div, &self.on_off_sets[1]) {
                self.neg_unate_lits.push(UnateLit {
                    lit: (v << 1) | 1,
                    score: 0,
                });
                unateness[3] = true;
            }

            // 0-resub.
            if unateness[0] && unateness[3] {
                return Some(v << 1);
            }
            if unateness[1] && unateness[2] {
                return Some((v << 1) + 1);
            }
            // Useless unate literal (constant on the care set).
            if (unateness[0] && unateness[2]) || (unateness[1] && unateness[3]) {
                self.pos_unate_lits.pop();
                self.neg_unate_lits.pop();
            }
            // Binate divisor.
            else if unateness.iter().all(|u| !u) {
                self.binate_divs.push(v);
            }
        }
        None
    }

    /// Scores unate literals by minterm coverage and sorts descending.
    /// Positive unate literals score against the on-set, negative against
    /// the off-set. Ties keep the lower divisor index first (stable sort
    /// over collection order).
    fn sort_unate_lits(&mut self, divs: &[Tt], positive: bool) {
        let on_off = positive as usize;
        let set = &self.on_off_sets[on_off];
        let lits = if positive {
            &mut self.pos_unate_lits
        } else {
            &mut self.neg_unate_lits
        };
        for l in lits.iter_mut() {
            let d = &divs[((l.lit >> 1) - 1) as usize];
            let covered = if l.lit & 1 == 1 { &!d & set } else { d & set };
            l.score = covered.count_ones();
        }
        lits.sort_by(|l1, l2| l2.score.cmp(&l1.score));
    }

    fn sort_unate_pairs(&mut self, divs: &[Tt], positive: bool) {
        let on_off = positive as usize;
        // The list is detached while scoring: lit_tt reads the engine while
        // the scores are written.
        let mut pairs = std::mem::take(if positive {
            &mut self.pos_unate_pairs
        } else {
            &mut self.neg_unate_pairs
        });
        for p in pairs.iter_mut() {
            let composite = if p.is_xor() {
                &self.lit_tt(divs, p.lit1) ^ &self.lit_tt(divs, p.lit2)
            } else {
                &self.lit_tt(divs, p.lit1) & &self.lit_tt(divs, p.lit2)
            };
            p.score = (&composite & &self.on_off_sets[on_off]).count_ones();
        }
        pairs.sort_by(|p1, p2| p2.score.cmp(&p1.score));
        if positive {
            self.pos_unate_pairs = pairs;
        } else {
            self.neg_unate_pairs = pairs;
        }
    }

    /// 1-resub: two unate literals covering the whole on-set (OR) or
    /// off-set (AND).
    fn find_div_div(&mut self, divs: &[Tt], on_off: usize) -> Option<u32> {
        let lits = if on_off == 1 {
            &self.pos_unate_lits
        } else {
            &self.neg_unate_lits
        };
        let mut hit: Option<(u32, u32)> = None;
        'outer: for i in 0..lits.len() {
            let lit1 = lits[i].lit;
            if lits[i].score * 2 < self.num_bits[on_off] {
                break;
            }
            for j in i + 1..lits.len() {
                let lit2 = lits[j].lit;
                if lits[i].score + lits[j].score < self.num_bits[on_off] {
                    break;
                }
                let ntt1 = self.lit_tt_neg(divs, lit1);
                let ntt2 = self.lit_tt_neg(divs, lit2);
                if intersection_is_empty_masked::<false, false>(
                    &ntt1,
                    &ntt2,
                    &self.on_off_sets[on_off],
                ) {
                    hit = Some((lit1, lit2));
                    break 'outer;
                }
            }
        }
        let (lit1, lit2) = hit?;
        let new_lit = self.index_list.add_and(lit1 ^ 1, lit2 ^ 1);
        Some(new_lit + on_off as u32)
    }

    /// 1-resub with an XOR of two binate divisors whose XOR is unate both
    /// ways; also collects XOR-type unate pairs for the later stages.
    fn find_xor(&mut self, divs: &[Tt]) -> Option<u32> {
        let mut result: Option<(u32, u32)> = None;
        for i in 0..self.binate_divs.len() {
            for j in i + 1..self.binate_divs.len() {
                let di = self.binate_divs[i];
                let dj = self.binate_divs[j];
                let tt_xor = &divs[(di - 1) as usize] ^ &divs[(dj - 1) as usize];
                let mut unateness = [false; 4];
                // Against the off-set; additionally require a non-empty
                // on-set intersection (otherwise the pair is useless).
                if crate::tt::intersection_is_empty::<false, false>(&tt_xor, &self.on_off_sets[0])
                    && !crate::tt::intersection_is_empty::<false, false>(
                        &tt_xor,
                        &self.on_off_sets[1],
                    )
                {
                    self.pos_unate_pairs.push(FaninPair::xor(di << 1, dj << 1));
                    unateness[0] = true;
                }
                if crate::tt::intersection_is_empty::<true, false>(&tt_xor, &self.on_off_sets[0])
                    && !crate::tt::intersection_is_empty::<true, false>(
                        &tt_xor,
                        &self.on_off_sets[1],
                    )
                {
                    self.pos_unate_pairs
                        .push(FaninPair::xor((di << 1) + 1, dj << 1));
                    unateness[1] = true;
                }
                // Against the on-set; require a non-empty off-set
                // intersection.
                if crate::tt::intersection_is_empty::<false, false>(&tt_xor, &self.on_off_sets[1])
                    && !crate::tt::intersection_is_empty::<false, false>(
                        &tt_xor,
                        &self.on_off_sets[0],
                    )
                {
                    self.neg_unate_pairs.push(FaninPair::xor(di << 1, dj << 1));
                    unateness[2] = true;
                }
                if crate::tt::intersection_is_empty::<true, false>(&tt_xor, &self.on_off_sets[1])
                    && !crate::tt::intersection_is_empty::<true, false>(
                        &tt_xor,
                        &self.on_off_sets[0],
                    )
                {
                    self.neg_unate_pairs
                        .push(FaninPair::xor((di << 1) + 1, dj << 1));
                    unateness[3] = true;
                }

                if unateness[0] && unateness[2] {
                    result = Some((di << 1, dj << 1));
                    break;
                }
                if unateness[1] && unateness[3] {
                    result = Some(((di << 1) + 1, dj << 1));
                    break;
                }
            }
            if result.is_some() {
                break;
            }
        }
        let (l1, l2) = result?;
        Some(self.index_list.add_xor(l1, l2))
    }

    /// Collects AND-type pairs of binate divisors under all four
    /// polarities.
    fn collect_unate_pairs(&mut self, divs: &[Tt]) {
        for i in 0..self.binate_divs.len() {
            for j in i + 1..self.binate_divs.len() {
                let (d1, d2) = (self.binate_divs[i], self.binate_divs[j]);
                self.collect_unate_pairs_detail::<false, false>(divs, d1, d2);
                self.collect_unate_pairs_detail::<true, false>(divs, d1, d2);
                self.collect_unate_pairs_detail::<false, true>(divs, d1, d2);
                self.collect_unate_pairs_detail::<true, true>(divs, d1, d2);
            }
        }
    }

    fn collect_unate_pairs_detail<const N1: bool, const N2: bool>(
        &mut self,
        divs: &[Tt],
        div1: u32,
        div2: u32,
    ) {
        let t1 = &divs[(div1 - 1) as usize];
        let t2 = &divs[(div2 - 1) as usize];
        let lit1 = (div1 << 1) + N1 as u32;
        let lit2 = (div2 << 1) + N2 as u32;
        // Unate against the off-set with a useful on-set intersection...
        if intersection_is_empty_masked::<N1, N2>(t1, t2, &self.on_off_sets[0])
            && !intersection_is_empty_masked::<N1, N2>(t1, t2, &self.on_off_sets[1])
        {
            self.pos_unate_pairs.push(FaninPair::and(lit1, lit2));
        }
        // ...or against the on-set with a useful off-set intersection.
        else if intersection_is_empty_masked::<N1, N2>(t1, t2, &self.on_off_sets[1])
            && !intersection_is_empty_masked::<N1, N2>(t1, t2, &self.on_off_sets[0])
        {
            self.neg_unate_pairs.push(FaninPair::and(lit1, lit2));
        }
    }

    /// 2-resub: one unate literal plus one unate pair covering the set.
    fn find_div_pair(&mut self, divs: &[Tt], on_off: usize) -> Option<u32> {
        let (lits, pairs) = if on_off == 1 {
            (&self.pos_unate_lits, &self.pos_unate_pairs)
        } else {
            (&self.neg_unate_lits, &self.neg_unate_pairs)
        };
        let mut hit: Option<(u32, FaninPair)> = None;
        'outer: for i in 0..lits.len() {
            let lit1 = lits[i].lit;
            for j in 0..pairs.len() {
                let pair2 = pairs[j];
                if lits[i].score + pair2.score < self.num_bits[on_off] {
                    break;
                }
                let ntt1 = self.lit_tt_neg(divs, lit1);
                let ntt2 = self.pair_tt_neg(divs, &pair2);
                if intersection_is_empty_masked::<false, false>(
                    &ntt1,
                    &ntt2,
                    &self.on_off_sets[on_off],
                ) {
                    hit = Some((lit1, pair2));
                    break 'outer;
                }
            }
        }
        let (lit1, pair2) = hit?;
        let new_lit1 = self.add_pair_gate(&pair2);
        let new_lit2 = self.index_list.add_and(lit1 ^ 1, new_lit1 ^ 1);
        Some(new_lit2 + on_off as u32)
    }

    /// 3-resub: two unate pairs covering the set.
    fn find_pair_pair(&mut self, divs: &[Tt], on_off: usize) -> Option<u32> {
        let pairs = if on_off == 1 {
            &self.pos_unate_pairs
        } else {
            &self.neg_unate_pairs
        };
        let mut hit: Option<(FaninPair, FaninPair)> = None;
        'outer: for i in 0..pairs.len() {
            let pair1 = pairs[i];
            if pair1.score * 2 < self.num_bits[on_off] {
                break;
            }
            for j in i + 1..pairs.len() {
                let pair2 = pairs[j];
                if pair1.score + pair2.score < self.num_bits[on_off] {
                    break;
                }
                let ntt1 = self.pair_tt_neg(divs, &pair1);
                let ntt2 = self.pair_tt_neg(divs, &pair2);
                if intersection_is_empty_masked::<false, false>(
                    &ntt1,
                    &ntt2,
                    &self.on_off_sets[on_off],
                ) {
                    hit = Some((pair1, pair2));
                    break 'outer;
                }
            }
        }
        let (pair1, pair2) = hit?;
        let fanin_lit1 = self.add_pair_gate(&pair1);
        let fanin_lit2 = self.add_pair_gate(&pair2);
        let output_lit = self.index_list.add_and(fanin_lit1 ^ 1, fanin_lit2 ^ 1);
        Some(output_lit + on_off as u32)
    }
}

/// Flips the single output literal of a list (used for the NOT-symmetric
/// dual: a solution for `!target` realizes `target` with its output
/// inverted).
fn negate_single_output(mut il: XagIndexList) -> XagIndexList {
    assert_eq!(il.num_outputs(), 1);
    il.negate_output(0);
    il
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

    fn check_solution(il: &XagIndexList, divs: &[Tt], target: &Tt, care: &Tt) {
        let outs = il.evaluate(divs, target.num_bits());
        assert_eq!(outs.len(), 1);
        assert!(
            equal_on(&outs[0], target, care),
            "solution {} evaluates to {:?}, want {:?} on care {:?}",
            il,
            outs[0],
            target,
            care
        );
    }

    #[test]
    fn test_zero_resub_wire() {
        let divs = tts(&["1100", "1010"]);
        let target = Tt::from_binary_str("1100").unwrap();
        let care = Tt::ones(4);
        let mut engine = ResynEngine::new(ResynOptions::default());
        let il = engine.resynthesize(&target, &care, &divs, 0).unwrap();
        assert_eq!(il.num_gates(), 0);
        assert_eq!(il.outputs(), &[2]);
    }

    #[test]
    fn test_constant_true_beats_or() {
        // An all-ones target has an empty off-set, so the constant wins
        // before any OR of divisors is considered.
        let divs = tts(&["1100", "0011", "0101"]);
        let target = Tt::ones(4);
        let care = Tt::ones(4);
        let mut engine = ResynEngine::new(ResynOptions::default());
        let il = engine.resynthesize(&target, &care, &divs, 1).unwrap();
        assert_eq!(il.num_gates(), 0);
        assert_eq!(il.outputs(), &[1]);
    }

    #[test]
    fn test_one_resub_or_nontrivial() {
        // d1 | d2 = 1110; bit 0 is off.
        let divs = tts(&["1100", "0010", "0101"]);
        let target = Tt::from_binary_str("1110").unwrap();
        let care = Tt::ones(4);
        let mut engine = ResynEngine::new(ResynOptions::default());
        let il = engine.resynthesize(&target, &care, &divs, 1).unwrap();
        assert_eq!(il.num_gates(), 1);
        check_solution(&il, &divs, &target, &care);
        // OR is encoded as an inverted AND of inverted literals.
        assert_eq!(il.outputs()[0] & 1, 1);
    }

    #[test]
    fn test_one_resub_xor() {
        let divs = tts(&["1100", "1010"]);
        let target = Tt::from_binary_str("0110").unwrap();
        let care = Tt::ones(4);
        let mut engine = ResynEngine::new(ResynOptions::default());
        let il = engine.resynthesize(&target, &care, &divs, 1).unwrap();
        assert_eq!(il.num_gates(), 1);
        check_solution(&il, &divs, &target, &care);
        let entries: Vec<_> = il.entries().collect();
        assert!(matches!(entries[0], crate::index_list::Entry::Xor(..)));
    }

    #[test]
    fn test_xor_disabled_never_emits_xor() {
        let divs = tts(&["1100", "1010"]);
        let target = Tt::from_binary_str("0110").unwrap();
        let care = Tt::ones(4);
        let mut engine = ResynEngine::new(ResynOptions {
            use_xor: false,
            ..ResynOptions::default()
        });
        // XOR of two variables needs 3 AND gates.
        let il = engine.resynthesize(&target, &care, &divs, 3).unwrap();
        check_solution(&il, &divs, &target, &care);
        for entry in il.entries() {
            assert!(
                matches!(entry, crate::index_list::Entry::And(..)),
                "XOR entry emitted with use_xor = false"
            );
        }
    }

    #[test]
    fn test_care_masked_wire() {
        let divs = tts(&["1100", "1010"]);
        let target = Tt::from_binary_str("0100").unwrap();
        let care = Tt::from_binary_str("0111").unwrap();
        let mut engine = ResynEngine::new(ResynOptions::default());
        let il = engine.resynthesize(&target, &care, &divs, 0).unwrap();
        assert_eq!(il.num_gates(), 0);
        assert_eq!(il.outputs(), &[2]);
    }

    #[test]
    fn test_budget_failure_on_maj() {
        // MAJ(x0, x1, x2) needs at least 2 gates even with XOR; with only
        // the variable divisors and budget 1 the engine must give up.
        let divs = tts(&["10101010", "11001100", "11110000"]);
        let target = Tt::from_binary_str("11101000").unwrap();
        let care = Tt::ones(8);
        let mut engine = ResynEngine::new(ResynOptions::default());
        assert!(engine.resynthesize(&target, &care, &divs, 1).is_none());
        // With a budget of 4 a solution exists.
        let il = engine.resynthesize(&target, &care, &divs, 4).unwrap();
        check_solution(&il, &divs, &target, &care);
    }

    #[test]
    fn test_empty_care_returns_constant_false() {
        let divs = tts(&["1100"]);
        let target = Tt::from_binary_str("1010").unwrap();
        let care = Tt::zeros(4);
        let mut engine = ResynEngine::new(ResynOptions::default());
        let il = engine.resynthesize(&target, &care, &divs, 5).unwrap();
        assert_eq!(il.num_gates(), 0);
        assert_eq!(il.outputs(), &[0]);
    }

    #[test]
    fn test_empty_on_set_one_step() {
        // on = 0 yields literal 0 regardless of the divisor pool.
        let divs = tts(&["1100", "1010", "0110"]);
        let target = Tt::zeros(4);
        let care = Tt::ones(4);
        let mut engine = ResynEngine::new(ResynOptions::default());
        let il = engine.resynthesize(&target, &care, &divs, 0).unwrap();
        assert_eq!(il.outputs(), &[0]);
    }

    #[test]
    fn test_empty_divisor_pool() {
        let divs: Vec<Tt> = vec![];
        let target = Tt::from_binary_str("1010").unwrap();
        let care = Tt::ones(4);
        let mut engine = ResynEngine::new(ResynOptions::default());
        assert!(engine.resynthesize(&target, &care, &divs, 10).is_none());
        // A constant target still succeeds with no divisors.
        let t0 = Tt::zeros(4);
        let il = engine.resynthesize(&t0, &care, &divs, 0).unwrap();
        assert_eq!(il.outputs(), &[0]);
    }

    #[test]
    fn test_not_symmetry_same_gate_count() {
        let divs = tts(&["10101010", "11001100", "11110000"]);
        let target = Tt::from_binary_str("11101000").unwrap();
        let care = Tt::ones(8);
        let mut engine = ResynEngine::new(ResynOptions::default());
        let il = engine.resynthesize(&target, &care, &divs, 6).unwrap();
        let il_neg = engine.resynthesize(&!&target, &care, &divs, 6).unwrap();
        assert_eq!(il.num_gates(), il_neg.num_gates());
        check_solution(&il_neg, &divs, &!&target, &care);
    }

    #[test]
    fn test_divide_and_recurse() {
        // Three-way OR forces a divide step under a tight pool.
        let divs = tts(&["11000000", "00110000", "00001100"]);
        let target = Tt::from_binary_str("11111100").unwrap();
        let care = Tt::ones(8);
        let mut engine = ResynEngine::new(ResynOptions::default());
        let il = engine.resynthesize(&target, &care, &divs, 2).unwrap();
        assert!(il.num_gates() <= 2);
        check_solution(&il, &divs, &target, &care);
    }

    #[test]
    fn test_max_solutions_all_not_worse() {
        let divs = tts(&["10101010", "11001100", "11110000"]);
        let target = Tt::from_binary_str("00010111").unwrap();
        let care = Tt::ones(8);
        let mut first = ResynEngine::new(ResynOptions::default());
        let mut all = ResynEngine::new(ResynOptions {
            max_solutions: MaxSolutions::All,
            ..ResynOptions::default()
        });
        let il_first = first.resynthesize(&target, &care, &divs, 8).unwrap();
        let il_all = all.resynthesize(&target, &care, &divs, 8).unwrap();
        assert!(il_all.num_gates() <= il_first.num_gates());
        check_solution(&il_all, &divs, &target, &care);
    }

    #[test]
    fn test_result_depends_only_on_tables() {
        let divs_a = tts(&["1100", "1010"]);
        let divs_b = tts(&["1100", "1010"]);
        let target = Tt::from_binary_str("1000").unwrap();
        let care = Tt::ones(4);
        let mut e1 = ResynEngine::new(ResynOptions::default());
        let mut e2 = ResynEngine::new(ResynOptions::default());
        let r1 = e1.resynthesize(&target, &care, &divs_a, 2).unwrap();
        let r2 = e2.resynthesize(&target, &care, &divs_b, 2).unwrap();
        assert_eq!(r1, r2);
    }
}
