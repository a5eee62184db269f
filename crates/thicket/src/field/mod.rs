//! field backends for share arithmetic
//!
//! a [`Field`] evaluates fresh random polynomials at caller-chosen
//! coordinates and interpolates back at zero. everything above this module
//! (tree, packets, recovery) is generic over the backend.
//!
//! coordinates come from one [`CoordSet`] per generation run, so no two
//! shares collide even across unrelated subsecrets. coordinate 0 is reserved
//! for the value being shared.

pub mod gf16;
#[cfg(feature = "ristretto255")]
mod lagrange;
#[cfg(feature = "ristretto255")]
pub mod ristretto;

use std::collections::HashSet;
use std::fmt;

use rand::Rng;

use crate::{Error, Result};

pub use gf16::Gf16;
#[cfg(feature = "ristretto255")]
pub use ristretto::Ristretto;

/// a point on a sharing polynomial (or an additive term with its coordinate)
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Share<E> {
    /// x-coordinate, never 0
    pub x: u64,
    /// y-value
    pub y: E,
}

impl<E> Share<E> {
    pub fn new(x: u64, y: E) -> Self {
        Self { x, y }
    }
}

/// share arithmetic backend
pub trait Field: Clone + fmt::Debug + Send + Sync + 'static {
    /// one field value (a scalar, or a vector of gf(2^16) words)
    type Elem: Clone + PartialEq + Eq + fmt::Debug + Send + Sync;

    /// short backend name for logs
    const NAME: &'static str;

    /// width of the index field inside an encrypted marker
    const INDEX_BYTES: usize;

    /// largest usable coordinate
    const MAX_COORD: u64;

    fn zero(&self) -> Self::Elem;

    /// uniformly random value (csprng)
    fn random(&self) -> Self::Elem;

    fn add(&self, a: &Self::Elem, b: &Self::Elem) -> Result<Self::Elem>;

    fn sub(&self, a: &Self::Elem, b: &Self::Elem) -> Result<Self::Elem>;

    /// vector width of a value, used to reject mixed-length shares
    fn width(&self, a: &Self::Elem) -> usize;

    /// evaluate a fresh random polynomial of degree `threshold - 1` whose
    /// intercept is `secret` at every point of `xs`
    fn evaluate_random(
        &self,
        secret: &Self::Elem,
        threshold: usize,
        xs: &[u64],
    ) -> Result<Vec<Self::Elem>>;

    /// lagrange interpolation at x = 0. callers go through [`combine`],
    /// which validates the share set first
    fn interpolate_zero(&self, shares: &[Share<Self::Elem>]) -> Result<Self::Elem>;

    fn to_bytes(&self, a: &Self::Elem) -> Vec<u8>;

    fn from_bytes(&self, bytes: &[u8]) -> Result<Self::Elem>;
}

/// global set of coordinates already handed out during one generation run
#[derive(Clone, Debug)]
pub struct CoordSet {
    used: HashSet<u64>,
}

impl Default for CoordSet {
    fn default() -> Self {
        Self::new()
    }
}

impl CoordSet {
    /// new set with 0 reserved for the secret
    pub fn new() -> Self {
        let mut used = HashSet::new();
        used.insert(0);
        Self { used }
    }

    pub fn contains(&self, x: u64) -> bool {
        self.used.contains(&x)
    }

    /// number of coordinates handed out, excluding the reserved 0
    pub fn len(&self) -> usize {
        self.used.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// draw one fresh nonzero coordinate for backend `F`
    pub fn draw<F: Field>(&mut self) -> Result<u64> {
        if self.len() as u64 >= F::MAX_COORD {
            return Err(Error::CoordinatesExhausted { used: self.len() });
        }
        let mut rng = rand::thread_rng();
        loop {
            let x = rng.gen_range(1..=F::MAX_COORD);
            if self.used.insert(x) {
                return Ok(x);
            }
        }
    }

    /// draw `n` fresh coordinates
    pub fn draw_many<F: Field>(&mut self, n: usize) -> Result<Vec<u64>> {
        (0..n).map(|_| self.draw::<F>()).collect()
    }
}

/// split `secret` into `parts` polynomial shares, any `threshold` of which
/// reconstruct it
pub fn split<F: Field>(
    field: &F,
    secret: &F::Elem,
    parts: usize,
    threshold: usize,
    coords: &mut CoordSet,
) -> Result<Vec<Share<F::Elem>>> {
    if threshold == 0 || threshold > parts {
        return Err(Error::InvalidThreshold { threshold, parts });
    }
    let xs = coords.draw_many::<F>(parts)?;
    let ys = field.evaluate_random(secret, threshold, &xs)?;
    Ok(xs.into_iter().zip(ys).map(|(x, y)| Share::new(x, y)).collect())
}

/// reconstruct the intercept of the polynomial through `shares`
pub fn combine<F: Field>(field: &F, shares: &[Share<F::Elem>]) -> Result<F::Elem> {
    if shares.len() < 2 {
        return Err(Error::NotEnoughShares { have: shares.len(), need: 2 });
    }
    let width = field.width(&shares[0].y);
    for share in &shares[1..] {
        let other = field.width(&share.y);
        if other != width {
            return Err(Error::InvalidSliceLength { left: width, right: other });
        }
    }
    for (i, a) in shares.iter().enumerate() {
        if a.x == 0 {
            return Err(Error::InvalidInput("share at coordinate 0".into()));
        }
        if shares[i + 1..].iter().any(|b| b.x == a.x) {
            return Err(Error::DuplicateCoordinate(a.x));
        }
    }
    field.interpolate_zero(shares)
}

/// additive split: `parts - 1` random values plus one closing value so that
/// the sum of all parts equals `secret`
pub fn split_additive<F: Field>(field: &F, secret: &F::Elem, parts: usize) -> Result<Vec<F::Elem>> {
    if parts < 2 {
        return Err(Error::InvalidThreshold { threshold: parts, parts });
    }
    let mut values: Vec<F::Elem> = (0..parts - 1).map(|_| field.random()).collect();
    let mut closing = secret.clone();
    for v in &values {
        closing = field.sub(&closing, v)?;
    }
    values.push(closing);
    Ok(values)
}

/// field sum of all values
pub fn sum<F: Field>(field: &F, values: &[F::Elem]) -> Result<F::Elem> {
    let mut acc = field.zero();
    for v in values {
        acc = field.add(&acc, v)?;
    }
    Ok(acc)
}
