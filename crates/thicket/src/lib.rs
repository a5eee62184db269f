//! # thicket
//!
//! hierarchical secret sharing for key recovery, hidden in an anonymity set.
//!
//! a secret is split into subsecrets, each subsecret into leaf shares, and the
//! leaves are handed to trustees in packets that also carry salted hashes or
//! encrypted markers of the values above them. real packets are padded with
//! decoys of the same shape. a user who later collects packets in some order
//! rebuilds subsecrets from whatever subsets verify, then the root.
//!
//! ## tree
//!
//! ```text
//!                  secret
//!         ┌──────────┼──────────┐        additive or t-of-n split
//!        s1         s2   ...   s5
//!     ┌───┼───┐                          t-of-n shamir split
//!    l1  l2 .. l8
//! ```
//!
//! the layered scheme generalises this to any depth with full thresholds per
//! layer.
//!
//! ## usage
//!
//! ```rust,ignore
//! use thicket::{generate, recover, shuffled_order, Gf16, Params, Scheme};
//!
//! let field = Gf16::new(16);
//! let secret = field.random();
//! let params = Params::default().with_scheme(Scheme::Thresholded);
//!
//! let deal = generate(&field, &params, &secret)?;
//! let order = shuffled_order(deal.set.len());
//! let out = recover(&field, &params, &deal.set, &order)?;
//! assert_eq!(out.secret, secret);
//! ```
//!
//! ## verification
//!
//! - additive: `sha256(value || salt)` membership
//! - thresholded / hinted: aes-256-cbc markers keyed by the candidate value
//! - layered: both, with an all-zero terminal section marking the root
//!
//! marker acceptance relies on salt, zero padding and pkcs7 padding checking
//! out after decryption. it is not authenticated encryption.

pub mod anonymity;
pub mod config;
pub mod crypto;
pub mod error;
pub mod field;
pub mod layout;
pub mod packet;
pub mod recovery;
pub mod scheme;
pub mod search;
pub mod tree;

pub use anonymity::AnonymitySet;
pub use config::{Backend, Params, Scheme};
pub use error::{Error, Result};
pub use field::{combine, split, split_additive, CoordSet, Field, Gf16, Share};
pub use layout::TreeLayout;
pub use packet::{Packet, Shape};
pub use recovery::{recover, HintPolicy, InsertionOrder, Recovered, Recovery, RecoverySession};
pub use scheme::{generate, shuffled_order, trustees_first, Deal, DealStats};
pub use tree::ShareTree;

#[cfg(feature = "ristretto255")]
pub use field::Ristretto;
