//! SHA-256 Hex Digests
//!
//! One hashing primitive shared by outcome generation and public
//! verification, so both sides of the fairness contract compute digests the
//! same way.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 digest of `input`.
pub fn sha256_hex(input: &[u8]) -> String {
    hex::encode(Sha256::digest(input))
}
