//! GF(2^16) shamir backend using log/exp tables
//!
//! elements are vectors of 16-bit words; every word gets its own random
//! polynomial but all words of one share sit at the same x-coordinate.
//!
//! reducing polynomial: x^16 + x^12 + x^3 + x + 1 (0x1100b). the tables are
//! generated once per process and are read-only afterwards.

use std::sync::OnceLock;

use rand::RngCore;
use subtle::{ConditionallySelectable, ConstantTimeEq};

use super::{Field, Share};
use crate::{Error, Result};

/// reducing polynomial including the x^16 term
pub const POLYNOMIAL: u32 = 0x1100b;

/// multiplicative group order
const ORDER: usize = 65535;

const TABLE_LEN: usize = 65536;

struct Tables {
    exp: Box<[u16]>,
    log: Box<[u16]>,
}

static TABLES: OnceLock<Tables> = OnceLock::new();

fn tables() -> &'static Tables {
    TABLES.get_or_init(Tables::build)
}

/// carry-less multiply with reduction, only used to build the tables
fn mul_slow(a: u16, b: u16) -> u16 {
    let mut a = a as u32;
    let mut b = b;
    let mut acc = 0u32;
    while b != 0 {
        if b & 1 != 0 {
            acc ^= a;
        }
        b >>= 1;
        a <<= 1;
        if a & 0x1_0000 != 0 {
            a ^= POLYNOMIAL;
        }
    }
    acc as u16
}

/// multiplicative order of `g`, or 0 if `g` never returns to 1
fn order_of(g: u16) -> usize {
    let mut x = g;
    let mut n = 1;
    while x != 1 {
        x = mul_slow(x, g);
        n += 1;
        if x == 0 || n > ORDER {
            return 0;
        }
    }
    n
}

impl Tables {
    fn build() -> Self {
        // smallest primitive element at or above 3
        let generator = (3..=u16::MAX)
            .find(|&g| order_of(g) == ORDER)
            .unwrap_or(2);

        let mut exp = vec![0u16; TABLE_LEN];
        let mut log = vec![0u16; TABLE_LEN];
        let mut x = 1u16;
        for i in 0..ORDER {
            exp[i] = x;
            log[x as usize] = i as u16;
            x = mul_slow(x, generator);
        }
        // exp[65535] stays 0 and log[0] stays 0
        tracing::debug!(generator, "gf(2^16) tables ready");
        Self { exp: exp.into_boxed_slice(), log: log.into_boxed_slice() }
    }
}

/// addition (and subtraction) in GF(2^16)
#[inline]
pub fn add(a: u16, b: u16) -> u16 {
    a ^ b
}

/// multiplication, constant-time with respect to zero operands
pub fn mul(a: u16, b: u16) -> u16 {
    let t = tables();
    let sum = (t.log[a as usize] as usize + t.log[b as usize] as usize) % ORDER;
    let product = t.exp[sum];
    let either_zero = a.ct_eq(&0) | b.ct_eq(&0);
    u16::conditional_select(&product, &0, either_zero)
}

/// division, constant-time with respect to a zero dividend
pub fn div(a: u16, b: u16) -> Result<u16> {
    if b == 0 {
        return Err(Error::DivideByZero);
    }
    let t = tables();
    let diff = (t.log[a as usize] as usize + ORDER - t.log[b as usize] as usize) % ORDER;
    let quotient = t.exp[diff];
    Ok(u16::conditional_select(&quotient, &0, a.ct_eq(&0)))
}

/// horner evaluation of `coeffs` (lowest degree first) at `x`
fn evaluate(coeffs: &[u16], x: u16) -> u16 {
    if x == 0 {
        return coeffs[0];
    }
    coeffs.iter().rev().fold(0, |acc, &c| add(mul(acc, x), c))
}

/// gf(2^16) backend for values of a fixed number of words
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Gf16 {
    words: usize,
}

impl Gf16 {
    pub fn new(words: usize) -> Self {
        Self { words }
    }

    /// backend sized for `key` after [`key_to_words`]
    pub fn for_key(key: &[u8]) -> Self {
        Self::new(key_to_words(key).len())
    }

    pub fn words(&self) -> usize {
        self.words
    }

    fn coord(x: u64) -> Result<u16> {
        u16::try_from(x).map_err(|_| Error::InvalidInput(format!("coordinate {x} outside gf(2^16)")))
    }
}

impl Field for Gf16 {
    type Elem = Vec<u16>;

    const NAME: &'static str = "gf16";
    const INDEX_BYTES: usize = 2;
    const MAX_COORD: u64 = u16::MAX as u64;

    fn zero(&self) -> Vec<u16> {
        vec![0; self.words]
    }

    fn random(&self) -> Vec<u16> {
        let mut bytes = vec![0u8; 2 * self.words];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes_to_words(&bytes)
    }

    fn add(&self, a: &Vec<u16>, b: &Vec<u16>) -> Result<Vec<u16>> {
        if a.len() != b.len() {
            return Err(Error::InvalidSliceLength { left: a.len(), right: b.len() });
        }
        Ok(a.iter().zip(b).map(|(x, y)| add(*x, *y)).collect())
    }

    fn sub(&self, a: &Vec<u16>, b: &Vec<u16>) -> Result<Vec<u16>> {
        self.add(a, b)
    }

    fn width(&self, a: &Vec<u16>) -> usize {
        a.len()
    }

    fn evaluate_random(&self, secret: &Vec<u16>, threshold: usize, xs: &[u64]) -> Result<Vec<Vec<u16>>> {
        let xs: Vec<u16> = xs.iter().map(|&x| Self::coord(x)).collect::<Result<_>>()?;
        let mut rng = rand::thread_rng();
        let mut out = vec![Vec::with_capacity(secret.len()); xs.len()];
        let mut coeffs = vec![0u16; threshold];
        for &word in secret {
            coeffs[0] = word;
            for c in coeffs.iter_mut().skip(1) {
                *c = rng.next_u32() as u16;
            }
            for (ys, &x) in out.iter_mut().zip(&xs) {
                ys.push(evaluate(&coeffs, x));
            }
        }
        Ok(out)
    }

    fn interpolate_zero(&self, shares: &[Share<Vec<u16>>]) -> Result<Vec<u16>> {
        let xs: Vec<u16> = shares.iter().map(|s| Self::coord(s.x)).collect::<Result<_>>()?;
        // weight_i = prod_{j != i} x_j / (x_i + x_j), identical for every word
        let mut weights = Vec::with_capacity(xs.len());
        for (i, &xi) in xs.iter().enumerate() {
            let mut w = 1u16;
            for (j, &xj) in xs.iter().enumerate() {
                if i != j {
                    w = mul(w, div(xj, add(xi, xj))?);
                }
            }
            weights.push(w);
        }
        let width = shares[0].y.len();
        let mut out = vec![0u16; width];
        for (share, &w) in shares.iter().zip(&weights) {
            for (acc, &y) in out.iter_mut().zip(&share.y) {
                *acc = add(*acc, mul(w, y));
            }
        }
        Ok(out)
    }

    fn to_bytes(&self, a: &Vec<u16>) -> Vec<u8> {
        words_to_bytes(a)
    }

    fn from_bytes(&self, bytes: &[u8]) -> Result<Vec<u16>> {
        if bytes.len() != 2 * self.words {
            return Err(Error::InvalidSliceLength { left: bytes.len(), right: 2 * self.words });
        }
        Ok(bytes_to_words(bytes))
    }
}

/// big-endian bytes to words; a trailing odd byte is dropped
pub fn bytes_to_words(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect()
}

/// words to big-endian bytes
pub fn words_to_bytes(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_be_bytes()).collect()
}

/// key bytes to words. odd-length keys get a trailing 0x01, even-length keys
/// get 0x00 0x00, so the original length survives the round trip
pub fn key_to_words(key: &[u8]) -> Vec<u16> {
    let mut data = key.to_vec();
    if data.len() % 2 != 0 {
        data.push(0x01);
    } else {
        data.extend_from_slice(&[0x00, 0x00]);
    }
    bytes_to_words(&data)
}

/// inverse of [`key_to_words`]
pub fn words_to_key(words: &[u16]) -> Result<Vec<u8>> {
    let mut data = words_to_bytes(words);
    match data.as_slice() {
        [.., 0x00, 0x00] => data.truncate(data.len() - 2),
        [.., 0x01] => data.truncate(data.len() - 1),
        _ => return Err(Error::InvalidInput("key words carry no length suffix".into())),
    }
    Ok(data)
}
