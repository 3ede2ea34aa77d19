// crates/quota-gate-core/src/core/token.rs
// ============================================================================
// Module: Bearer Tokens
// Description: Raw token generation and one-way digest handling.
// Purpose: Guarantee tokens are random, unrecoverable, and compared by digest.
// Dependencies: rand, sha2, subtle
// ============================================================================

//! ## Overview
//! Bearer tokens are 256-bit CSPRNG values, hex-encoded for transport. Only
//! the SHA-256 digest of a token is ever persisted; the raw value is handed
//! to the caller exactly once at issuance and is unrecoverable thereafter.
//! Lookups compare digests, never raw tokens, and in-memory digest
//! comparison is constant-time.
//!
//! Security posture: neither [`RawToken`] nor [`TokenDigest`] implements
//! `Display`, and `Debug` output is redacted, so tokens cannot leak through
//! logging or error formatting.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Digest;
use sha2::Sha256;
use subtle::ConstantTimeEq;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Raw token entropy in bytes (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// Lowercase hex alphabet used for token and digest encoding.
const HEX_ALPHABET: &[u8; 16] = b"0123456789abcdef";

// ============================================================================
// SECTION: Raw Token
// ============================================================================

/// Freshly issued raw bearer token.
///
/// # Invariants
/// - Exactly `2 * TOKEN_BYTES` lowercase hex characters.
/// - Never persisted; the value exists only to be returned to the caller
///   once at issuance.
#[derive(Clone, PartialEq, Eq)]
pub struct RawToken(String);

impl RawToken {
    /// Returns the token text for one-time delivery to the caller.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RawToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RawToken(redacted)")
    }
}

/// Generates a fresh 256-bit raw bearer token.
#[must_use]
pub fn generate_raw_token() -> RawToken {
    let mut bytes = [0_u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    RawToken(hex_lower(&bytes))
}

// ============================================================================
// SECTION: Token Digest
// ============================================================================

/// One-way digest of a raw bearer token.
///
/// # Invariants
/// - Lowercase hex SHA-256 of the raw token text.
/// - Unique across principals (enforced by the store).
/// - Equality is constant-time.
#[derive(Clone)]
pub struct TokenDigest(String);

impl TokenDigest {
    /// Computes the digest of a raw token string.
    #[must_use]
    pub fn from_raw_token(raw: &str) -> Self {
        let digest = Sha256::digest(raw.as_bytes());
        Self(hex_lower(&digest))
    }

    /// Reconstructs a digest from its stored hex form.
    ///
    /// The store owns digest persistence; no validation beyond opacity is
    /// applied here.
    #[must_use]
    pub fn from_stored(stored: impl Into<String>) -> Self {
        Self(stored.into())
    }

    /// Returns the digest hex text for store persistence.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for TokenDigest {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl Eq for TokenDigest {}

impl fmt::Debug for TokenDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenDigest(redacted)")
    }
}

// ============================================================================
// SECTION: Hex Encoding
// ============================================================================

/// Encodes bytes as lowercase hex.
fn hex_lower(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(HEX_ALPHABET[usize::from(byte >> 4)]));
        out.push(char::from(HEX_ALPHABET[usize::from(byte & 0x0f)]));
    }
    out
}
