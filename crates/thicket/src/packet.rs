//! trustee packets and their verification material
//!
//! every packet carries a salt, a handful of leaf shares and the material a
//! recovering client uses to recognise a correct reconstruction:
//!
//! | scheme      | hashes            | markers           |
//! |-------------|-------------------|-------------------|
//! | additive    | `1 + max`         | -                 |
//! | thresholded | -                 | `1 + max`         |
//! | hinted      | -                 | `1 + max`         |
//! | layered     | `max * depth`     | `max * depth`     |
//!
//! entries that would repeat within one packet (two leaves under the same
//! parent) are replaced by random filler of the same length, so the shape
//! depends only on the share count and the tree depth.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::{Params, Scheme};
use crate::crypto::{
    random_hash, random_marker, salt, salted_hash, seal_marker, Terminal, SALT_LEN,
};
use crate::field::{CoordSet, Field, Share};
use crate::layout::share_counts;
use crate::tree::{NodeId, ShareTree};
use crate::{Error, Result};

/// marker index reserved for the root secret
pub const ROOT_INDEX: u64 = 0;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet<E> {
    #[serde(with = "hex::serde")]
    pub salt: [u8; SALT_LEN],
    pub hashes: Vec<[u8; 32]>,
    pub markers: Vec<Vec<u8>>,
    pub shares: Vec<Share<E>>,
}

/// entry counts that must agree across an anonymity set
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Shape {
    pub shares: usize,
    pub hashes: usize,
    pub markers: usize,
}

impl<E> Packet<E> {
    pub fn shape(&self) -> Shape {
        Shape {
            shares: self.shares.len(),
            hashes: self.hashes.len(),
            markers: self.markers.len(),
        }
    }
}

/// real packets for every trustee, in trustee order
#[derive(Clone, Debug)]
pub struct Encoded<E> {
    pub packets: Vec<Packet<E>>,
    /// shares per packet after padding
    pub max_shares: usize,
    /// parent chain length of every leaf
    pub depth: usize,
    /// trustees whose index is handed out as a hint (hinted scheme)
    pub hinted: Vec<usize>,
}

/// builds one packet per trustee from a share tree
pub struct PacketEncoder<'a, F: Field> {
    tree: &'a ShareTree<F>,
    scheme: Scheme,
    trustees: usize,
    absolute_threshold: usize,
    hints: usize,
}

impl<'a, F: Field> PacketEncoder<'a, F> {
    pub fn new(tree: &'a ShareTree<F>, params: &Params) -> Self {
        Self {
            tree,
            scheme: params.scheme,
            trustees: params.trustees,
            absolute_threshold: params.absolute_threshold,
            hints: params.hints,
        }
    }

    /// distribute the shuffled leaves and seal the verification material.
    /// decoy shares draw their coordinates from `coords`.
    pub fn encode(&self, secret: &F::Elem, coords: &mut CoordSet) -> Result<Encoded<F::Elem>> {
        if self.absolute_threshold > self.trustees {
            return Err(Error::InvalidThreshold {
                threshold: self.absolute_threshold,
                parts: self.trustees,
            });
        }
        if self.trustees == 0 {
            return Err(Error::PacketsNotGenerated);
        }
        self.check_chains(secret)?;

        let mut rng = rand::thread_rng();
        let mut leaves = self.tree.leaves().to_vec();
        leaves.shuffle(&mut rng);
        let (counts, max_shares) = share_counts(self.trustees, leaves.len());

        let hinted = if self.scheme == Scheme::Hinted {
            let mut order: Vec<usize> = (0..self.trustees).collect();
            order.shuffle(&mut rng);
            order.truncate(self.hints);
            order
        } else {
            Vec::new()
        };

        let mut packets = Vec::with_capacity(self.trustees);
        let mut next = 0;
        for (trustee, &count) in counts.iter().enumerate() {
            let assigned = &leaves[next..next + count];
            next += count;
            let packet = self.encode_one(trustee, assigned, max_shares, &hinted, coords)?;
            trace!(trustee, real = count, "encoded packet");
            packets.push(packet);
        }

        debug!(
            scheme = %self.scheme,
            trustees = self.trustees,
            leaves = leaves.len(),
            max_shares,
            "encoded trustee packets"
        );
        Ok(Encoded {
            packets,
            max_shares,
            depth: self.tree.depth(),
            hinted,
        })
    }

    /// every leaf's parent chain must end at `secret`
    fn check_chains(&self, secret: &F::Elem) -> Result<()> {
        for &leaf in self.tree.leaves() {
            match self.tree.ancestors(leaf).last() {
                Some(end) if self.tree.node(end).value == *secret => {}
                _ => return Err(Error::BytesNotEqual),
            }
        }
        Ok(())
    }

    fn encode_one(
        &self,
        trustee: usize,
        assigned: &[NodeId],
        max_shares: usize,
        hinted: &[usize],
        coords: &mut CoordSet,
    ) -> Result<Packet<F::Elem>> {
        let field = self.tree.field();
        let mut packet = Packet {
            salt: salt(),
            hashes: Vec::new(),
            markers: Vec::new(),
            shares: assigned.iter().map(|&leaf| self.tree.share(leaf)).collect(),
        };
        let root_bytes = field.to_bytes(self.tree.secret());
        let mut seen = HashSet::new();

        match self.scheme {
            Scheme::Additive => {
                packet.hashes.push(salted_hash(&packet.salt, &root_bytes));
                for &leaf in assigned {
                    let parent = self.parent(leaf)?;
                    packet.hashes.push(if seen.insert(parent) {
                        salted_hash(&packet.salt, &field.to_bytes(&self.tree.node(parent).value))
                    } else {
                        random_hash()
                    });
                }
            }
            Scheme::Thresholded => {
                packet.markers.push(self.seal(&root_bytes, &packet.salt, ROOT_INDEX, Terminal::Absent));
                for &leaf in assigned {
                    let parent = self.parent(leaf)?;
                    packet.markers.push(if seen.insert(parent) {
                        let node = self.tree.node(parent);
                        self.seal(&field.to_bytes(&node.value), &packet.salt, node.x, Terminal::Absent)
                    } else {
                        random_marker(F::INDEX_BYTES, Terminal::Absent)
                    });
                }
            }
            Scheme::Hinted => {
                packet.markers.push(self.seal(&root_bytes, &packet.salt, ROOT_INDEX, Terminal::Absent));
                let hint = pick_hint(trustee, hinted, self.trustees) as u64 + 1;
                for &leaf in assigned {
                    let parent = self.parent(leaf)?;
                    packet.markers.push(if seen.insert(parent) {
                        let bytes = field.to_bytes(&self.tree.node(parent).value);
                        self.seal(&bytes, &packet.salt, hint, Terminal::Absent)
                    } else {
                        random_marker(F::INDEX_BYTES, Terminal::Absent)
                    });
                }
            }
            Scheme::Layered => {
                for &leaf in assigned {
                    for id in self.tree.ancestors(leaf) {
                        if seen.insert(id) {
                            let node = self.tree.node(id);
                            let bytes = field.to_bytes(&node.value);
                            let terminal = if node.is_root() { Terminal::Root } else { Terminal::Inner };
                            packet.hashes.push(salted_hash(&packet.salt, &bytes));
                            packet.markers.push(self.seal(&bytes, &packet.salt, node.x, terminal));
                        } else {
                            packet.hashes.push(random_hash());
                            packet.markers.push(random_marker(F::INDEX_BYTES, Terminal::Inner));
                        }
                    }
                }
            }
        }

        for _ in assigned.len()..max_shares {
            packet.shares.push(Share::new(coords.draw::<F>()?, field.random()));
            push_filler(&mut packet, self.scheme, self.tree.depth(), F::INDEX_BYTES);
        }
        Ok(packet)
    }

    fn parent(&self, leaf: NodeId) -> Result<NodeId> {
        self.tree.node(leaf).parent.ok_or(Error::BytesNotEqual)
    }

    fn seal(&self, key: &[u8], salt: &[u8; SALT_LEN], index: u64, terminal: Terminal) -> Vec<u8> {
        seal_marker(key, salt, index, F::INDEX_BYTES, terminal)
    }
}

/// random verification entries for one decoy share
pub(crate) fn push_filler<E>(packet: &mut Packet<E>, scheme: Scheme, depth: usize, index_bytes: usize) {
    match scheme {
        Scheme::Additive => packet.hashes.push(random_hash()),
        Scheme::Thresholded | Scheme::Hinted => {
            packet.markers.push(random_marker(index_bytes, Terminal::Absent))
        }
        Scheme::Layered => {
            for _ in 0..depth {
                packet.hashes.push(random_hash());
                packet.markers.push(random_marker(index_bytes, Terminal::Inner));
            }
        }
    }
}

/// hinted trustee for `trustee`, dealt round-robin over `hinted`. skips to
/// the next hinted entry instead of pointing a trustee at itself, and to the
/// next trustee when `hinted` holds nobody else.
fn pick_hint(trustee: usize, hinted: &[usize], trustees: usize) -> usize {
    if hinted.is_empty() {
        return (trustee + 1) % trustees.max(1);
    }
    let mut hint = hinted[trustee % hinted.len()];
    if hint == trustee {
        hint = hinted[(trustee + 1) % hinted.len()];
    }
    if hint == trustee {
        hint = (trustee + 1) % trustees.max(1);
    }
    hint
}
