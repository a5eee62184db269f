//! cryptographic primitives for packet verification material
//!
//! - sha256 salted hashes of (sub)secret bytes
//! - aes-256-cbc encrypted markers keyed by a candidate value
//! - csprng helpers for salts, nonces and decoy filler
//!
//! marker plaintext layout:
//!
//! ```text
//! salt (32) || zero (8) || index (2 or 8, big-endian) || [terminal (8)]
//! ```
//!
//! the terminal section is all-zero iff the marker belongs to the root
//! secret. decrypting with the wrong value yields garbage, and a bad pkcs7
//! padding is simply "no match". the padding check is not a real mac.

use aes::cipher::{generic_array::GenericArray, BlockDecrypt, KeyInit};
use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

pub const SALT_LEN: usize = 32;

const ZERO_PAD_LEN: usize = 8;

pub const TERMINAL_LEN: usize = 8;

const BLOCK_LEN: usize = 16;

const IV_LEN: usize = 16;

/// generate random bytes
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// generate `n` random bytes
pub fn random_vec(n: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; n];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// fresh 32-byte salt or nonce
pub fn salt() -> [u8; SALT_LEN] {
    random_bytes()
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// sha256(data || salt)
pub fn salted_hash(salt: &[u8; SALT_LEN], data: &[u8]) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(data);
    h.update(salt);
    h.finalize().into()
}

/// hash of random bytes, indistinguishable from a real salted hash
pub fn random_hash() -> [u8; 32] {
    sha256(&random_bytes::<32>())
}

/// constant-time membership of `hash` in `hashes`
pub fn hash_member(hashes: &[[u8; 32]], hash: &[u8; 32]) -> bool {
    hashes.iter().fold(0u8, |acc, h| acc | h[..].ct_eq(&hash[..]).unwrap_u8()) == 1
}

/// cipher key for a value: its bytes if they are exactly 32 long, otherwise
/// their sha256
fn cipher_key(key: &[u8]) -> [u8; 32] {
    match <[u8; 32]>::try_from(key) {
        Ok(k) => k,
        Err(_) => sha256(key),
    }
}

/// aes-256-cbc with a random iv prepended and pkcs7 padding
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> Vec<u8> {
    let key = cipher_key(key);
    let iv: [u8; IV_LEN] = random_bytes();
    let body = Aes256CbcEnc::new(&key.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext);
    let mut out = Vec::with_capacity(IV_LEN + body.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&body);
    out
}

/// inverse of [`encrypt`]; `None` when the ciphertext is malformed or the
/// padding does not check out
pub fn decrypt(key: &[u8], ciphertext: &[u8]) -> Option<Vec<u8>> {
    decrypt_with(&cipher_key(key), ciphertext)
}

fn decrypt_with(key: &[u8; 32], ciphertext: &[u8]) -> Option<Vec<u8>> {
    if ciphertext.len() < IV_LEN + BLOCK_LEN || (ciphertext.len() - IV_LEN) % BLOCK_LEN != 0 {
        return None;
    }
    let key = *key;
    let (iv, body) = ciphertext.split_at(IV_LEN);
    let iv: [u8; IV_LEN] = iv.try_into().ok()?;
    Aes256CbcDec::new(&key.into(), &iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(body)
        .ok()
}

/// terminal section of a marker
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Terminal {
    /// no terminal bytes
    Absent,
    /// eight zero bytes
    Root,
    /// eight random bytes
    Inner,
}

/// decoded marker contents
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Marker {
    pub index: u64,
    /// `Some(true)` for an all-zero terminal section
    pub root: Option<bool>,
}

fn plaintext_len(index_bytes: usize, terminal: Terminal) -> usize {
    let tail = if terminal == Terminal::Absent { 0 } else { TERMINAL_LEN };
    SALT_LEN + ZERO_PAD_LEN + index_bytes + tail
}

/// ciphertext length of a sealed marker, used for decoy filler
pub fn marker_len(index_bytes: usize, terminal: Terminal) -> usize {
    IV_LEN + (plaintext_len(index_bytes, terminal) / BLOCK_LEN + 1) * BLOCK_LEN
}

/// random bytes of sealed-marker length
pub fn random_marker(index_bytes: usize, terminal: Terminal) -> Vec<u8> {
    random_vec(marker_len(index_bytes, terminal))
}

/// encrypt a marker for `index` under `key`
pub fn seal_marker(
    key: &[u8],
    salt: &[u8; SALT_LEN],
    index: u64,
    index_bytes: usize,
    terminal: Terminal,
) -> Vec<u8> {
    debug_assert!(index_bytes <= 8);
    debug_assert!(index_bytes == 8 || index < 1u64 << (8 * index_bytes));
    let mut pt = Vec::with_capacity(plaintext_len(index_bytes, terminal));
    pt.extend_from_slice(salt);
    pt.extend_from_slice(&[0u8; ZERO_PAD_LEN]);
    pt.extend_from_slice(&index.to_be_bytes()[8 - index_bytes..]);
    match terminal {
        Terminal::Absent => {}
        Terminal::Root => pt.extend_from_slice(&[0u8; TERMINAL_LEN]),
        Terminal::Inner => pt.extend_from_slice(&random_bytes::<TERMINAL_LEN>()),
    }
    encrypt(key, &pt)
}

/// try to open `ciphertext` as a marker sealed under `key` with `salt`
pub fn open_marker(key: &[u8], salt: &[u8; SALT_LEN], ciphertext: &[u8], index_bytes: usize) -> Option<Marker> {
    MarkerKey::new(key).open(salt, ciphertext, index_bytes)
}

/// first marker in `markers` that opens under `key`
pub fn find_marker(
    key: &[u8],
    salt: &[u8; SALT_LEN],
    markers: &[Vec<u8>],
    index_bytes: usize,
) -> Option<Marker> {
    let key = MarkerKey::new(key);
    markers.iter().find_map(|m| key.open(salt, m, index_bytes))
}

/// candidate key with its expanded block cipher, reused across markers
struct MarkerKey {
    key: [u8; 32],
    block: Aes256,
}

impl MarkerKey {
    fn new(key: &[u8]) -> Self {
        let key = cipher_key(key);
        Self { block: Aes256::new(&key.into()), key }
    }

    /// the first plaintext block is the head of the salt
    fn head_matches(&self, salt: &[u8; SALT_LEN], ciphertext: &[u8]) -> bool {
        if ciphertext.len() < IV_LEN + BLOCK_LEN {
            return false;
        }
        let mut first = GenericArray::clone_from_slice(&ciphertext[IV_LEN..IV_LEN + BLOCK_LEN]);
        self.block.decrypt_block(&mut first);
        for (b, iv) in first.iter_mut().zip(&ciphertext[..IV_LEN]) {
            *b ^= iv;
        }
        bool::from(first[..].ct_eq(&salt[..BLOCK_LEN]))
    }

    fn open(&self, salt: &[u8; SALT_LEN], ciphertext: &[u8], index_bytes: usize) -> Option<Marker> {
        if !self.head_matches(salt, ciphertext) {
            return None;
        }
        let pt = decrypt_with(&self.key, ciphertext)?;
        let head = SALT_LEN + ZERO_PAD_LEN;
        if pt.len() < head + index_bytes {
            return None;
        }
        let salt_ok = pt[..SALT_LEN].ct_eq(salt);
        let pad_ok = pt[SALT_LEN..head].ct_eq(&[0u8; ZERO_PAD_LEN]);
        if !bool::from(salt_ok & pad_ok) {
            return None;
        }
        let mut index = [0u8; 8];
        index[8 - index_bytes..].copy_from_slice(&pt[head..head + index_bytes]);
        let rest = &pt[head + index_bytes..];
        let root = (!rest.is_empty()).then(|| rest.iter().all(|b| *b == 0));
        Some(Marker { index: u64::from_be_bytes(index), root })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let key = random_bytes::<32>();
        let ct = encrypt(&key, b"thicket marker");
        assert_eq!(decrypt(&key, &ct).unwrap(), b"thicket marker");
        // wrong key fails padding or yields garbage
        let other = random_bytes::<32>();
        assert_ne!(decrypt(&other, &ct).as_deref(), Some(&b"thicket marker"[..]));
        assert!(decrypt(&key, &ct[..20]).is_none());
    }

    #[test]
    fn test_salted_hash_order() {
        let s = salt();
        let mut joined = b"abc".to_vec();
        joined.extend_from_slice(&s);
        assert_eq!(salted_hash(&s, b"abc"), sha256(&joined));
    }

    #[test]
    fn test_marker_roundtrip() {
        let key = random_bytes::<32>();
        let s = salt();
        for (bytes, index, terminal, root) in [
            (8, 0xdead_beef_u64, Terminal::Root, Some(true)),
            (8, 7, Terminal::Inner, Some(false)),
            (2, 0x1234, Terminal::Absent, None),
            (2, 0, Terminal::Absent, None),
        ] {
            let ct = seal_marker(&key, &s, index, bytes, terminal);
            assert_eq!(ct.len(), marker_len(bytes, terminal));
            let m = open_marker(&key, &s, &ct, bytes).unwrap();
            assert_eq!(m, Marker { index, root });
        }
    }

    #[test]
    fn test_marker_rejects_wrong_salt_or_key() {
        let key = random_bytes::<32>();
        let s = salt();
        let ct = seal_marker(&key, &s, 3, 2, Terminal::Absent);
        assert!(open_marker(&key, &salt(), &ct, 2).is_none());
        assert!(open_marker(&random_bytes::<32>(), &s, &ct, 2).is_none());
        assert!(open_marker(&key, &s, &random_marker(2, Terminal::Absent), 2).is_none());
    }

    #[test]
    fn test_short_keys_are_hashed() {
        let ct = encrypt(b"short", b"data");
        assert_eq!(decrypt(b"short", &ct).unwrap(), b"data");
    }

    #[test]
    fn test_hash_member() {
        let a = random_hash();
        let b = random_hash();
        assert!(hash_member(&[b, a], &a));
        assert!(!hash_member(&[b], &a));
        assert!(!hash_member(&[], &a));
    }
}
