//! lagrange coefficients at x = 0 over the ristretto255 scalar field
//!
//! common denominator technique, one inversion per share set:
//!
//! λ_i = ξ · ρ_i · d̄^{-1}
//!
//! - ξ = Π_j x_j
//! - d_i = x_i · Π_{j ≠ i} (x_j - x_i)
//! - ρ_i = Π_{j ≠ i} d_j
//! - d̄ = Π_i d_i

use curve25519_dalek::scalar::Scalar;

use crate::{Error, Result};

/// coefficients λ_i, in input order, such that Σ λ_i f(x_i) = f(0)
pub fn coefficients_at_zero(xs: &[u64]) -> Result<Vec<Scalar>> {
    let k = xs.len();
    if k == 0 {
        return Err(Error::NotEnoughShares { have: 0, need: 1 });
    }
    if let Some(&x) = xs.iter().find(|&&x| x == 0) {
        return Err(Error::InvalidInput(format!("coordinate {x} is reserved")));
    }
    let mut sorted = xs.to_vec();
    sorted.sort_unstable();
    if let Some(pair) = sorted.windows(2).find(|w| w[0] == w[1]) {
        return Err(Error::DuplicateCoordinate(pair[0]));
    }
    if k == 1 {
        return Ok(vec![Scalar::ONE]);
    }

    let scalars: Vec<Scalar> = xs.iter().map(|&x| Scalar::from(x)).collect();
    let xi: Scalar = scalars.iter().product();

    let d: Vec<Scalar> = scalars
        .iter()
        .enumerate()
        .map(|(i, x_i)| {
            scalars
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .fold(*x_i, |acc, (_, x_j)| acc * (x_j - x_i))
        })
        .collect();

    // forward pass: rho[i] = Π_{j < i} d_j, then fold in the suffix
    let mut rho = vec![Scalar::ONE; k];
    for i in 1..k {
        rho[i] = rho[i - 1] * d[i - 1];
    }
    let mut suffix = Scalar::ONE;
    for i in (0..k).rev() {
        rho[i] *= suffix;
        suffix *= d[i];
    }

    let delta = xi * suffix.invert();
    Ok(rho.into_iter().map(|r| delta * r).collect())
}
