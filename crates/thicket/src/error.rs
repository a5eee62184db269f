//! error types for thicket

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // === parameter errors ===
    #[error("invalid threshold: {threshold} of {parts}")]
    InvalidThreshold { threshold: usize, parts: usize },

    #[error("threshold {threshold} exceeds search bound {bound}")]
    VeryLargeThreshold { threshold: usize, bound: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid config: {0}")]
    Config(String),

    // === field errors ===
    #[error("field vectors have mismatched lengths: {left} vs {right}")]
    InvalidSliceLength { left: usize, right: usize },

    #[error("not enough shares: have {have}, need {need}")]
    NotEnoughShares { have: usize, need: usize },

    #[error("duplicate share coordinate {0}")]
    DuplicateCoordinate(u64),

    #[error("division by zero in gf(2^16)")]
    DivideByZero,

    #[error("coordinate space exhausted after {used} draws")]
    CoordinatesExhausted { used: usize },

    // === generation errors ===
    #[error("share tree does not lead back to the secret")]
    BytesNotEqual,

    #[error("packets were not generated")]
    PacketsNotGenerated,

    // === recovery errors ===
    #[error("access order is not a permutation of {size} packets")]
    InvalidAccessOrder { size: usize },

    #[error("secret not found in anonymity set")]
    SecretNotFound,
}
