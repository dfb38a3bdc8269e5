// SPDX-License-Identifier: Apache-2.0

//! Structural hashing over the XAG arena.
//!
//! Every node gets a blake3 signature of its function up to commutation,
//! plus its depth. Because fan-ins precede their gates, signatures are
//! filled by a single in-order sweep of the arena -- no recursion and no
//! memo lookups beyond a dense vector indexed by id.
//!
//! The two gate kinds canonicalize differently. AND operands carry their
//! polarity individually (`a & !b` and `!a & b` are distinct functions),
//! so each operand hashes as its node signature plus a polarity byte, and
//! the pair is sorted. XOR negation commutes to the output
//! (`!a ^ b = a ^ !b = !(a ^ b)`), so an XOR hashes its two node
//! signatures sorted with the combined parity folded in as a single byte;
//! this makes `!a ^ b` and `a ^ !b` hash identically, as they should,
//! which per-operand polarity hashing would miss.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::gate::{XagNode, XagRef};

#[derive(Clone, Copy)]
struct Sig {
    depth: usize,
    hash: blake3::Hash,
}

pub struct XagHasher {
    /// Signature per arena id, extended lazily in id order.
    sigs: Vec<Sig>,
    /// Shallowest known node per signature.
    best: HashMap<blake3::Hash, (usize, XagRef)>,
}

impl XagHasher {
    pub fn new() -> Self {
        Self {
            sigs: Vec::new(),
            best: HashMap::new(),
        }
    }

    /// Extends the signature vector up to and including `upto`. Operand
    /// ids are always smaller, so everything needed is already present.
    fn ensure_sigs(&mut self, upto: usize, nodes: &[XagNode]) {
        while self.sigs.len() <= upto {
            let id = self.sigs.len();
            let sig = match &nodes[id] {
                XagNode::Literal(value) => {
                    let mut h = blake3::Hasher::new();
                    h.update(&[b'L', *value as u8]);
                    Sig {
                        depth: 0,
                        hash: h.finalize(),
                    }
                }
                XagNode::Input { name, lsb_index } => {
                    let mut h = blake3::Hasher::new();
                    h.update(&[b'I']);
                    h.update(name.as_bytes());
                    h.update(&lsb_index.to_le_bytes());
                    Sig {
                        depth: 0,
                        hash: h.finalize(),
                    }
                }
                XagNode::And2 { a, b } => {
                    let (sa, sb) = (self.sigs[a.node.id], self.sigs[b.node.id]);
                    // Operand key: node signature plus polarity byte.
                    let ka = (sa.hash, a.negated as u8);
                    let kb = (sb.hash, b.negated as u8);
                    let (lo, hi) = if ka.0.as_bytes() <= kb.0.as_bytes() {
                        (ka, kb)
                    } else {
                        (kb, ka)
                    };
                    let mut h = blake3::Hasher::new();
                    h.update(&[b'&']);
                    h.update(lo.0.as_bytes());
                    h.update(&[lo.1]);
                    h.update(hi.0.as_bytes());
                    h.update(&[hi.1]);
                    Sig {
                        depth: sa.depth.max(sb.depth) + 1,
                        hash: h.finalize(),
                    }
                }
                XagNode::Xor2 { a, b } => {
                    let (sa, sb) = (self.sigs[a.node.id], self.sigs[b.node.id]);
                    // Polarity commutes to the output; only the parity of
                    // the two flags is functionally relevant here.
                    let parity = (a.negated ^ b.negated) as u8;
                    let (lo, hi) = if sa.hash.as_bytes() <= sb.hash.as_bytes() {
                        (sa.hash, sb.hash)
                    } else {
                        (sb.hash, sa.hash)
                    };
                    let mut h = blake3::Hasher::new();
                    h.update(&[b'^']);
                    h.update(lo.as_bytes());
                    h.update(hi.as_bytes());
                    h.update(&[parity]);
                    Sig {
                        depth: sa.depth.max(sb.depth) + 1,
                        hash: h.finalize(),
                    }
                }
            };
            self.sigs.push(sig);
        }
    }

    /// Feeds a freshly appended node. If a structurally identical node is
    /// already known at no greater depth, returns it so the caller can use
    /// it instead; otherwise the new node becomes the signature's best.
    pub fn feed_ref(&mut self, xag_ref: &XagRef, nodes: &[XagNode]) -> Option<XagRef> {
        self.ensure_sigs(xag_ref.id, nodes);
        let sig = self.sigs[xag_ref.id];
        match self.best.entry(sig.hash) {
            Entry::Occupied(mut entry) => {
                let (best_depth, best_ref) = *entry.get();
                if best_depth <= sig.depth {
                    Some(best_ref)
                } else {
                    entry.insert((sig.depth, *xag_ref));
                    None
                }
            }
            Entry::Vacant(slot) => {
                slot.insert((sig.depth, *xag_ref));
                None
            }
        }
    }
}
