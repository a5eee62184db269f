//! anonymity set: real trustee packets padded with decoys
//!
//! a decoy has the same salt length, share count and entry counts as a real
//! packet. its shares are random values at fresh coordinates and its entries
//! are random filler, so nothing short of a successful reconstruction tells
//! the two apart.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Scheme;
use crate::crypto::{random_hash, random_marker, salt, Terminal};
use crate::field::{CoordSet, Field, Share};
use crate::packet::{push_filler, Encoded, Packet, Shape};
use crate::{Error, Result};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymitySet<E> {
    pub scheme: Scheme,
    /// real packets first, then decoys
    pub packets: Vec<Packet<E>>,
    /// number of real packets at the front
    pub trustees: usize,
    pub max_shares: usize,
    pub depth: usize,
}

impl<E> AnonymitySet<E> {
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// common shape of all packets, `None` if they differ or the set is empty
    pub fn shape(&self) -> Option<Shape> {
        let first = self.packets.first()?.shape();
        self.packets.iter().all(|p| p.shape() == first).then_some(first)
    }

    pub fn is_real(&self, index: usize) -> bool {
        index < self.trustees
    }
}

/// one decoy packet of the given shape parameters
pub fn decoy_packet<F: Field>(
    field: &F,
    scheme: Scheme,
    max_shares: usize,
    depth: usize,
    coords: &mut CoordSet,
) -> Result<Packet<F::Elem>> {
    let mut packet = Packet {
        salt: salt(),
        hashes: Vec::new(),
        markers: Vec::new(),
        shares: Vec::with_capacity(max_shares),
    };
    match scheme {
        Scheme::Additive => packet.hashes.push(random_hash()),
        Scheme::Thresholded | Scheme::Hinted => {
            packet.markers.push(random_marker(F::INDEX_BYTES, Terminal::Absent))
        }
        Scheme::Layered => {}
    }
    for _ in 0..max_shares {
        packet.shares.push(Share::new(coords.draw::<F>()?, field.random()));
        push_filler(&mut packet, scheme, depth, F::INDEX_BYTES);
    }
    Ok(packet)
}

/// append decoys to the real packets until the set holds `size` packets
pub fn pad<F: Field>(
    field: &F,
    scheme: Scheme,
    encoded: Encoded<F::Elem>,
    size: usize,
    coords: &mut CoordSet,
) -> Result<AnonymitySet<F::Elem>> {
    if encoded.packets.is_empty() {
        return Err(Error::PacketsNotGenerated);
    }
    let trustees = encoded.packets.len();
    let mut packets = encoded.packets;
    while packets.len() < size {
        packets.push(decoy_packet(field, scheme, encoded.max_shares, encoded.depth, coords)?);
    }
    debug!(trustees, decoys = packets.len() - trustees, "padded anonymity set");
    Ok(AnonymitySet {
        scheme,
        packets,
        trustees,
        max_shares: encoded.max_shares,
        depth: encoded.depth,
    })
}
