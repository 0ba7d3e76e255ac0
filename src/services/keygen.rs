//! Random object identifiers.
//!
//! 32 bytes from the thread-local CSPRNG, base64url-encoded without padding
//! (43 characters).

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;

pub const KEY_BYTES: usize = 32;

pub fn generate_key() -> [u8; KEY_BYTES] {
    let mut key = [0u8; KEY_BYTES];
    rand::rng().fill_bytes(&mut key);
    key
}

pub fn encode_key(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// A fresh URL-safe identifier for a stored object.
pub fn random_id() -> String {
    encode_key(&generate_key())
}
