//! Deterministic Primitives
//!
//! Shared building blocks for the fairness algorithm:
//! - `rounding` - fixed-precision round-half-away-from-zero
//! - `hash`     - SHA-256 hex digests

pub mod hash;
pub mod rounding;
