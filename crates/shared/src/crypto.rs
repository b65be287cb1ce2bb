//! Cryptographic utilities for opaque token generation.

use rand::rngs::OsRng;
use rand::RngCore;

/// Number of random bytes behind an acceptance token.
pub const TOKEN_BYTES: usize = 32;

/// Generates a random token of `TOKEN_BYTES` bytes from the OS RNG, hex encoded.
///
/// The result is always `2 * TOKEN_BYTES` lowercase hex characters.
pub fn generate_token_hex() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Returns true if `token` looks like a token produced by [`generate_token_hex`].
pub fn is_token_hex(token: &str) -> bool {
    token.len() == TOKEN_BYTES * 2 && token.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Shortened form of a token that is safe to put in logs.
pub fn token_hint(token: &str) -> &str {
    let end = token
        .char_indices()
        .nth(8)
        .map(|(idx, _)| idx)
        .unwrap_or(token.len());
    &token[..end]
}
