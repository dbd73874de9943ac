//! Cryptographic Utilities

use base64::{Engine, engine::general_purpose};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

/// Generate cryptographically secure random bytes
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Compute SHA-256 hash
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute SHA-256 hash as lowercase hex
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Random token made of ICE characters (`ALPHA / DIGIT / "+" / "/"`)
///
/// Unpadded base64 of `len_bytes` random bytes, suitable for
/// `ice-ufrag` / `ice-pwd` SDP attributes.
pub fn random_token(len_bytes: usize) -> String {
    general_purpose::STANDARD_NO_PAD.encode(random_bytes(len_bytes))
}
