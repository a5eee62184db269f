//! ristretto255 scalar field backend

use curve25519_dalek::scalar::Scalar;

use super::{lagrange, Field, Share};
use crate::{Error, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Ristretto;

impl Field for Ristretto {
    type Elem = Scalar;

    const NAME: &'static str = "ristretto255";
    const INDEX_BYTES: usize = 8;
    const MAX_COORD: u64 = u32::MAX as u64;

    fn zero(&self) -> Scalar {
        Scalar::ZERO
    }

    fn random(&self) -> Scalar {
        Scalar::random(&mut rand::thread_rng())
    }

    fn add(&self, a: &Scalar, b: &Scalar) -> Result<Scalar> {
        Ok(a + b)
    }

    fn sub(&self, a: &Scalar, b: &Scalar) -> Result<Scalar> {
        Ok(a - b)
    }

    fn width(&self, _a: &Scalar) -> usize {
        1
    }

    fn evaluate_random(&self, secret: &Scalar, threshold: usize, xs: &[u64]) -> Result<Vec<Scalar>> {
        let mut coeffs = Vec::with_capacity(threshold);
        coeffs.push(*secret);
        coeffs.extend((1..threshold).map(|_| self.random()));
        Ok(xs
            .iter()
            .map(|&x| {
                let x = Scalar::from(x);
                coeffs.iter().rev().fold(Scalar::ZERO, |acc, c| acc * x + c)
            })
            .collect())
    }

    fn interpolate_zero(&self, shares: &[Share<Scalar>]) -> Result<Scalar> {
        let xs: Vec<u64> = shares.iter().map(|s| s.x).collect();
        let lambdas = lagrange::coefficients_at_zero(&xs)?;
        Ok(lambdas.iter().zip(shares).map(|(l, s)| l * s.y).sum())
    }

    fn to_bytes(&self, a: &Scalar) -> Vec<u8> {
        a.to_bytes().to_vec()
    }

    fn from_bytes(&self, bytes: &[u8]) -> Result<Scalar> {
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::InvalidSliceLength { left: bytes.len(), right: 32 })?;
        Option::from(Scalar::from_canonical_bytes(bytes))
            .ok_or_else(|| Error::InvalidInput("non-canonical scalar".into()))
    }
}
