//! incremental recovery over an anonymity set
//!
//! packets are obtained one at a time in access order. after each one the
//! engine pools every share it has not used yet, searches the subsets that
//! touch the newest packet, and checks each interpolated candidate against
//! the verification material of the packet holding the subset's first share.
//!
//! ```text
//! obtain packet k ─► pool unused shares ─► reuse step ─► search t = 2..=bound
//!                                                            │
//!                      root verified ◄─ climb ◄─ subsecret ◄─┘
//! ```
//!
//! a candidate is only trusted once it verifies, so decoy shares cost search
//! time but never produce a wrong secret.

pub mod hints;

use std::collections::HashSet;

use tracing::{debug, info, trace};

use crate::anonymity::AnonymitySet;
use crate::config::{Params, Scheme};
use crate::crypto::{find_marker, hash_member, salted_hash};
use crate::field::{combine, sum, Field, Share};
use crate::packet::{Packet, ROOT_INDEX};
use crate::search::{Combinations, Search};
use crate::{Error, Result};

pub use hints::{HintPolicy, IgnoreHints, InsertionOrder};

/// what a verified candidate turned out to be
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// an intermediate value with its coordinate in the parent split (0 for
    /// additive terms) and, in the hinted scheme, the trustee it points at
    Subsecret { x: u64, hint: Option<usize> },
    Root,
}

/// check `value` against one packet's verification material
pub fn verify<F: Field>(
    field: &F,
    scheme: Scheme,
    packet: &Packet<F::Elem>,
    value: &F::Elem,
) -> Option<Verdict> {
    let bytes = field.to_bytes(value);
    match scheme {
        Scheme::Additive => {
            let h = salted_hash(&packet.salt, &bytes);
            if !hash_member(&packet.hashes, &h) {
                return None;
            }
            // the root hash leads every packet
            if hash_member(packet.hashes.get(..1)?, &h) {
                Some(Verdict::Root)
            } else {
                Some(Verdict::Subsecret { x: 0, hint: None })
            }
        }
        Scheme::Thresholded => {
            let m = find_marker(&bytes, &packet.salt, &packet.markers, F::INDEX_BYTES)?;
            Some(match m.index {
                ROOT_INDEX => Verdict::Root,
                x => Verdict::Subsecret { x, hint: None },
            })
        }
        Scheme::Hinted => {
            let m = find_marker(&bytes, &packet.salt, &packet.markers, F::INDEX_BYTES)?;
            Some(match m.index {
                ROOT_INDEX => Verdict::Root,
                hint => Verdict::Subsecret { x: 0, hint: usize::try_from(hint - 1).ok() },
            })
        }
        Scheme::Layered => {
            if !hash_member(&packet.hashes, &salted_hash(&packet.salt, &bytes)) {
                return None;
            }
            let m = find_marker(&bytes, &packet.salt, &packet.markers, F::INDEX_BYTES)?;
            Some(match m.root {
                Some(true) => Verdict::Root,
                _ => Verdict::Subsecret { x: m.index, hint: None },
            })
        }
    }
}

/// a verified intermediate value
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Obtained<E> {
    pub value: E,
    /// coordinate in the parent split, 0 for additive terms
    pub x: u64,
    /// packet whose material verified it
    pub packet: usize,
}

/// shares consumed by one reconstruction
#[derive(Clone, Debug)]
struct UsedSet<E> {
    shares: Vec<Share<E>>,
    /// subset size that first rebuilt the subsecret
    threshold: usize,
    /// index into the leaf-parent layer
    subsecret: usize,
}

#[derive(Clone, Debug)]
struct Pooled<E> {
    packet: usize,
    share: Share<E>,
}

/// state of one recovery attempt
#[derive(Clone, Debug)]
pub struct RecoverySession<E> {
    used: Vec<UsedSet<E>>,
    used_xs: HashSet<u64>,
    /// level 0 holds leaf parents, each level above one step closer to the root
    obtained: Vec<Vec<Obtained<E>>>,
    hints: Vec<usize>,
}

impl<E: Clone + PartialEq> Default for RecoverySession<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone + PartialEq> RecoverySession<E> {
    pub fn new() -> Self {
        Self {
            used: Vec::new(),
            used_xs: HashSet::new(),
            obtained: Vec::new(),
            hints: Vec::new(),
        }
    }

    pub fn obtained(&self, level: usize) -> &[Obtained<E>] {
        self.obtained.get(level).map(Vec::as_slice).unwrap_or(&[])
    }

    /// hinted trustees in the order their hints arrived
    pub fn hints(&self) -> &[usize] {
        &self.hints
    }

    /// number of shares consumed so far
    pub fn used_shares(&self) -> usize {
        self.used_xs.len()
    }

    pub fn is_used(&self, x: u64) -> bool {
        self.used_xs.contains(&x)
    }

    /// record `value` at `level` unless it is already known. returns its index
    /// and whether it is new.
    fn obtain(&mut self, level: usize, value: E, x: u64, packet: usize) -> (usize, bool) {
        if self.obtained.len() <= level {
            self.obtained.resize_with(level + 1, Vec::new);
        }
        let layer = &mut self.obtained[level];
        if let Some(i) = layer.iter().position(|o| o.value == value) {
            return (i, false);
        }
        layer.push(Obtained { value, x, packet });
        (layer.len() - 1, true)
    }

    fn mark_used(&mut self, subsecret: usize, shares: Vec<Share<E>>) {
        let fresh: Vec<Share<E>> = shares.iter().filter(|s| !self.used_xs.contains(&s.x)).cloned().collect();
        self.used_xs.extend(fresh.iter().map(|s| s.x));
        match self.used.iter().position(|u| u.subsecret == subsecret) {
            Some(i) => self.used[i].shares.extend(fresh),
            None => self.used.push(UsedSet { threshold: shares.len(), shares: fresh, subsecret }),
        }
    }

    fn note_hint(&mut self, hint: usize, packets: usize) -> bool {
        if hint >= packets || self.hints.contains(&hint) {
            return false;
        }
        self.hints.push(hint);
        true
    }
}

/// outcome of a successful recovery
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recovered<E> {
    pub secret: E,
    /// packets obtained when the root verified
    pub visited: usize,
    /// leaf-parent subsecrets rebuilt on the way
    pub subsecrets: usize,
    /// access order as finally walked
    pub order: Vec<usize>,
}

/// recovery engine over one anonymity set
pub struct Recovery<'a, F: Field> {
    field: &'a F,
    set: &'a AnonymitySet<F::Elem>,
    bound: usize,
    search: Search,
    policy: Box<dyn HintPolicy + 'a>,
}

impl<'a, F: Field> Recovery<'a, F> {
    pub fn new(field: &'a F, params: &Params, set: &'a AnonymitySet<F::Elem>) -> Self {
        Self {
            field,
            set,
            bound: params.search_bound(),
            search: Search::new(params.workers),
            policy: Box::new(InsertionOrder),
        }
    }

    /// replace the default [`InsertionOrder`] hint policy
    pub fn with_policy(mut self, policy: impl HintPolicy + 'a) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// walk `order` until the root verifies
    pub fn run(&self, order: &[usize]) -> Result<Recovered<F::Elem>> {
        if self.set.is_empty() {
            return Err(Error::PacketsNotGenerated);
        }
        check_order(order, self.set.len())?;

        let mut order = order.to_vec();
        let mut session = RecoverySession::new();
        for k in 2..=order.len() {
            // the first step has two new packets
            let fresh_packets = if k == 2 { 2 } else { 1 };
            let hints_before = session.hints.len();

            if let Some(secret) = self.step(&mut session, &order[..k], fresh_packets) {
                let subsecrets = session.obtained(0).len();
                info!(visited = k, subsecrets, used = session.used_shares(), "recovered secret");
                return Ok(Recovered { secret, visited: k, subsecrets, order });
            }

            if session.hints.len() > hints_before {
                self.policy.reorder(&mut order, k, &session.hints);
                debug!(hints = ?session.hints, "reordered access order");
            }
        }
        info!(visited = order.len(), subsecrets = session.obtained(0).len(), "secret not found");
        Err(Error::SecretNotFound)
    }

    fn step(
        &self,
        session: &mut RecoverySession<F::Elem>,
        visited: &[usize],
        fresh_packets: usize,
    ) -> Option<F::Elem> {
        let (pool, fresh) = self.pool(session, visited, fresh_packets);
        self.reuse(session, &pool[..fresh]);

        for size in 2..=self.bound {
            let (pool, fresh) = self.pool(session, visited, fresh_packets);
            if size > pool.len() {
                break;
            }
            let matches = self.search.run(pool.len(), fresh, size, |subset| self.check(&pool, subset));
            debug!(visited = visited.len(), pool = pool.len(), fresh, size, matches = matches.len(), "searched");

            for m in matches {
                let shares: Vec<Share<F::Elem>> = m.subset.iter().map(|&i| pool[i].share.clone()).collect();
                let packet = pool[m.subset[0]].packet;
                let (value, verdict) = m.found;
                if let Some(root) = self.absorb(session, shares, packet, value, verdict) {
                    return Some(root);
                }
            }
        }
        None
    }

    /// unused shares of the visited packets, newest packets first. returns the
    /// pool and how many of its shares belong to the newest packets.
    fn pool(
        &self,
        session: &RecoverySession<F::Elem>,
        visited: &[usize],
        fresh_packets: usize,
    ) -> (Vec<Pooled<F::Elem>>, usize) {
        let split = visited.len() - fresh_packets;
        let mut pool = Vec::new();
        let mut fresh = 0;
        for (n, &packet) in visited[split..].iter().chain(&visited[..split]).enumerate() {
            for share in &self.set.packets[packet].shares {
                if !session.is_used(share.x) {
                    pool.push(Pooled { packet, share: share.clone() });
                }
            }
            if n + 1 == fresh_packets {
                fresh = pool.len();
            }
        }
        (pool, fresh)
    }

    /// interpolate a subset and verify it against the first share's packet
    fn check(&self, pool: &[Pooled<F::Elem>], subset: &[usize]) -> Option<(F::Elem, Verdict)> {
        let shares: Vec<Share<F::Elem>> = subset.iter().map(|&i| pool[i].share.clone()).collect();
        let value = combine(self.field, &shares).ok()?;
        let packet = &self.set.packets[pool[subset[0]].packet];
        let verdict = verify(self.field, self.set.scheme, packet, &value)?;
        Some((value, verdict))
    }

    /// a new share of an already rebuilt subsecret interpolates back to it
    /// together with `threshold - 1` shares of that subsecret's used set
    fn reuse(&self, session: &mut RecoverySession<F::Elem>, fresh: &[Pooled<F::Elem>]) {
        for pooled in fresh {
            if session.is_used(pooled.share.x) {
                continue;
            }
            let hit = session.used.iter().position(|set| {
                if set.threshold < 2 || set.shares.len() < set.threshold - 1 {
                    return false;
                }
                let mut shares = set.shares[..set.threshold - 1].to_vec();
                shares.push(pooled.share.clone());
                combine(self.field, &shares)
                    .map(|v| v == session.obtained[0][set.subsecret].value)
                    .unwrap_or(false)
            });
            if let Some(i) = hit {
                session.used[i].shares.push(pooled.share.clone());
                session.used_xs.insert(pooled.share.x);
                trace!(packet = pooled.packet, subsecret = session.used[i].subsecret, "reused share");
            }
        }
    }

    fn absorb(
        &self,
        session: &mut RecoverySession<F::Elem>,
        shares: Vec<Share<F::Elem>>,
        packet: usize,
        value: F::Elem,
        verdict: Verdict,
    ) -> Option<F::Elem> {
        match verdict {
            Verdict::Root => Some(value),
            Verdict::Subsecret { x, hint } => {
                if let Some(h) = hint {
                    if session.note_hint(h, self.set.len()) {
                        trace!(hint = h, "hint received");
                    }
                }
                let (index, new) = session.obtain(0, value, x, packet);
                session.mark_used(index, shares);
                trace!(packet, index, new, "subsecret matched");
                if new {
                    self.climb(session, 0, index)
                } else {
                    None
                }
            }
        }
    }

    /// try to rebuild the layer above `level` now that `index` is known there
    fn climb(&self, session: &mut RecoverySession<F::Elem>, level: usize, index: usize) -> Option<F::Elem> {
        let layer = session.obtained(level);
        if layer.len() < 2 {
            return None;
        }
        let packet = &self.set.packets[layer[index].packet];
        match self.set.scheme {
            Scheme::Additive | Scheme::Hinted => {
                let values: Vec<F::Elem> = layer.iter().map(|o| o.value.clone()).collect();
                let candidate = sum(self.field, &values).ok()?;
                let verdict = verify(self.field, self.set.scheme, packet, &candidate);
                (verdict == Some(Verdict::Root)).then_some(candidate)
            }
            Scheme::Thresholded => {
                let shares: Vec<Share<F::Elem>> =
                    layer.iter().map(|o| Share::new(o.x, o.value.clone())).collect();
                let candidate = combine(self.field, &shares).ok()?;
                let verdict = verify(self.field, self.set.scheme, packet, &candidate);
                (verdict == Some(Verdict::Root)).then_some(candidate)
            }
            Scheme::Layered => self.climb_layered(session, level, index),
        }
    }

    /// full-threshold layers: every subset containing the new value is a
    /// candidate parent
    fn climb_layered(
        &self,
        session: &mut RecoverySession<F::Elem>,
        level: usize,
        index: usize,
    ) -> Option<F::Elem> {
        let peers = session.obtained(level).len();
        let others: Vec<usize> = (0..peers).filter(|&i| i != index).collect();
        let packet = session.obtained(level)[index].packet;

        for size in 2..=peers.min(self.bound) {
            let mut walk = Combinations::new(others.len(), size - 1);
            while walk.advance() {
                let layer = session.obtained(level);
                let shares: Vec<Share<F::Elem>> = std::iter::once(index)
                    .chain(walk.current().iter().map(|&j| others[j]))
                    .map(|i| Share::new(layer[i].x, layer[i].value.clone()))
                    .collect();
                let Ok(candidate) = combine(self.field, &shares) else {
                    continue;
                };
                match verify(self.field, Scheme::Layered, &self.set.packets[packet], &candidate) {
                    Some(Verdict::Root) => return Some(candidate),
                    Some(Verdict::Subsecret { x, .. }) => {
                        let (parent, new) = session.obtain(level + 1, candidate, x, packet);
                        trace!(level = level + 1, index = parent, new, "inner subsecret rebuilt");
                        if new {
                            if let Some(root) = self.climb_layered(session, level + 1, parent) {
                                return Some(root);
                            }
                        }
                    }
                    None => {}
                }
            }
        }
        None
    }
}

/// `order` must be a permutation of `0..size`
fn check_order(order: &[usize], size: usize) -> Result<()> {
    if order.len() != size {
        return Err(Error::InvalidAccessOrder { size });
    }
    let mut seen = vec![false; size];
    for &p in order {
        if p >= size || seen[p] {
            return Err(Error::InvalidAccessOrder { size });
        }
        seen[p] = true;
    }
    Ok(())
}

/// recover with the default hint policy
pub fn recover<F: Field>(
    field: &F,
    params: &Params,
    set: &AnonymitySet<F::Elem>,
    order: &[usize],
) -> Result<Recovered<F::Elem>> {
    Recovery::new(field, params, set).run(order)
}
