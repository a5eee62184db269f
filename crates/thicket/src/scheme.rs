//! end-to-end generation and access-order helpers

use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::info;

use crate::anonymity::{pad, AnonymitySet};
use crate::config::Params;
use crate::field::{CoordSet, Field};
use crate::layout::TreeLayout;
use crate::packet::PacketEncoder;
use crate::tree::ShareTree;
use crate::Result;

/// a generated anonymity set plus facts about how it was built
#[derive(Clone, Debug)]
pub struct Deal<E> {
    pub set: AnonymitySet<E>,
    pub layout: TreeLayout,
    /// hinted trustees (hinted scheme only)
    pub hinted: Vec<usize>,
    /// coordinates drawn, decoys included
    pub coords: usize,
}

/// reporting view of a deal
#[derive(Clone, Debug, Serialize)]
pub struct DealStats {
    pub packets: usize,
    pub trustees: usize,
    pub leaves: usize,
    pub max_shares: usize,
    pub depth: usize,
    pub fanout: Vec<usize>,
    pub thresholds: Vec<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub leaf_fanout: Vec<usize>,
}

impl<E> Deal<E> {
    pub fn stats(&self) -> DealStats {
        DealStats {
            packets: self.set.len(),
            trustees: self.set.trustees,
            leaves: self.layout.leaves(),
            max_shares: self.set.max_shares,
            depth: self.layout.depth(),
            fanout: self.layout.fanout.clone(),
            thresholds: self.layout.thresholds.clone(),
            leaf_fanout: self.layout.leaf_fanout.clone(),
        }
    }
}

/// split `secret` into a padded anonymity set
pub fn generate<F: Field>(field: &F, params: &Params, secret: &F::Elem) -> Result<Deal<F::Elem>> {
    params.validate()?;
    let mut coords = CoordSet::new();
    let tree = ShareTree::build(field.clone(), secret, params, &mut coords)?;
    let encoded = PacketEncoder::new(&tree, params).encode(secret, &mut coords)?;
    let hinted = encoded.hinted.clone();
    let set = pad(field, params.scheme, encoded, params.anonymity_set_size(), &mut coords)?;

    info!(
        scheme = %params.scheme,
        backend = F::NAME,
        packets = set.len(),
        leaves = tree.leaves().len(),
        max_shares = set.max_shares,
        "generated anonymity set"
    );
    Ok(Deal {
        set,
        layout: tree.layout().clone(),
        hinted,
        coords: coords.len(),
    })
}

/// uniformly shuffled permutation of `0..size`
pub fn shuffled_order(size: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..size).collect();
    order.shuffle(&mut rand::thread_rng());
    order
}

/// real packets first, each group shuffled
pub fn trustees_first<E>(set: &AnonymitySet<E>) -> Vec<usize> {
    let mut rng = rand::thread_rng();
    let mut real: Vec<usize> = (0..set.trustees).collect();
    let mut decoys: Vec<usize> = (set.trustees..set.len()).collect();
    real.shuffle(&mut rng);
    decoys.shuffle(&mut rng);
    real.extend(decoys);
    real
}
