//! PKCE (Proof Key for Code Exchange) verification.
//!
//! Implements the `S256` and `plain` methods of RFC 7636.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Compute the `S256` challenge for a verifier: `BASE64URL(SHA256(code_verifier))`.
#[must_use]
pub fn s256_challenge(code_verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(code_verifier.as_bytes()))
}

/// Verify a code verifier against a stored challenge.
///
/// Unknown methods never verify.
#[must_use]
pub fn verify(code_verifier: &str, code_challenge: &str, method: &str) -> bool {
    match method {
        "S256" => constant_time_eq(&s256_challenge(code_verifier), code_challenge),
        "plain" => constant_time_eq(code_verifier, code_challenge),
        _ => false,
    }
}

/// Byte comparison without early exit on the first mismatch.
pub(crate) fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
