//! Provably-Fair Outcome Generation
//!
//! Derives a crash multiplier from committed random seeds through a one-way
//! curve:
//!
//! 1. Fresh server seed: 24 bytes from the OS CSPRNG, base64-encoded.
//! 2. `SHA-256(server_seed)` is published before the round runs (commitment).
//! 3. `SHA-256(server_seed ++ client_seed)` is the game hash.
//! 4. The first 13 hex characters (52 bits) decode to an integer, normalized
//!    into `[0, 1]`.
//! 5. `1 / (1 - normalized)`, house edge, clamp -> final multiplier.
//!
//! The server seed is revealed after the round ends, so anyone can recompute
//! every step and confirm the outcome was fixed before bets closed.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::hash::sha256_hex;
use crate::core::rounding::{round2, RoundingError};

/// Tunables for the multiplier curve.
///
/// Defaults are the production values; every knob can be overridden through
/// [`crate::config::EngineConfig`].
#[derive(Debug, Clone)]
pub struct MultiplierConfig {
    /// Fractional house advantage applied to the raw fair multiplier.
    pub house_edge: f64,
    /// Lower clamp for the final multiplier.
    pub min_multiplier: f64,
    /// Upper clamp for the final multiplier.
    pub max_multiplier: f64,
    /// Hex characters taken from the front of the game hash (13 = 52 bits).
    pub hash_slice_len: usize,
    /// Server seed entropy in bytes.
    pub server_seed_bytes: usize,
}

impl Default for MultiplierConfig {
    fn default() -> Self {
        Self {
            house_edge: 0.03,
            min_multiplier: 1.0,
            max_multiplier: 4000.0,
            hash_slice_len: 13,
            server_seed_bytes: 24,
        }
    }
}

/// Errors from outcome generation and verification.
#[derive(Debug, Error)]
pub enum OutcomeError {
    /// Client seed was empty after trimming whitespace.
    #[error("client seed is empty")]
    InvalidClientSeed,

    /// Configured hash slice cannot be decoded into a u64.
    #[error("hash slice length {0} is not in 1..=16")]
    InvalidSliceLen(usize),

    /// Server seed does not hash to the published commitment.
    #[error("server seed does not match the published commitment")]
    CommitmentMismatch,

    /// Recomputed game hash differs from the published one.
    #[error("recomputed game hash does not match the published value")]
    GameHashMismatch,

    /// Hash slice failed to parse as hex.
    #[error("game hash slice is not valid hex: {0}")]
    HashSliceParse(#[from] std::num::ParseIntError),

    /// A derived value could not be rounded.
    #[error(transparent)]
    Rounding(#[from] RoundingError),
}

/// Provenance of one outcome.
///
/// The server seed stays sealed until the round coordinator reveals it after
/// every vehicle has crashed; only the hash commitment is public before then.
#[derive(Debug, Clone)]
pub struct SeedCommitment {
    server_seed: String,
    /// SHA-256 hex of the server seed, published before the round runs.
    pub server_seed_hash: String,
    /// Client-contributed randomness, immutable once combined.
    pub client_seed: String,
    /// SHA-256 hex of `server_seed ++ client_seed`.
    pub game_hash: String,
}

impl SeedCommitment {
    /// The secret seed. The coordinator only calls this once the round has
    /// fully crashed; revealing earlier would break the fairness ordering.
    pub(crate) fn server_seed(&self) -> &str {
        &self.server_seed
    }

    /// The exact preimage of the game hash: `server_seed ++ client_seed`.
    ///
    /// The concatenation order is part of the public verification contract.
    pub fn combined_seed(&self) -> String {
        format!("{}{}", self.server_seed, self.client_seed)
    }
}

/// Crash multiplier derived from a seed commitment.
///
/// Fully determined by `(server_seed, client_seed)`; all fields are published
/// after the round so verifiers can check the intermediate steps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultiplierOutcome {
    /// Integer decoded from the leading game-hash slice.
    pub hash_int_value: u64,
    /// `hash_int_value / (2^bits - 1)`, in `[0, 1]`.
    pub normalized_hash_value: f64,
    /// Inverse-curve multiplier before the house edge, 2 decimals.
    pub raw_multiplier: f64,
    /// Raw multiplier after house edge and clamping, 2 decimals.
    pub final_multiplier: f64,
}

/// Stateless generator for committed outcomes.
#[derive(Debug, Clone, Default)]
pub struct OutcomeGenerator {
    config: MultiplierConfig,
}

impl OutcomeGenerator {
    /// Create a generator with the given curve configuration.
    pub fn new(config: MultiplierConfig) -> Self {
        Self { config }
    }

    /// The curve configuration in use.
    pub fn config(&self) -> &MultiplierConfig {
        &self.config
    }

    /// Generate a fresh committed outcome for `client_seed`.
    ///
    /// The client seed is validated before any seed material is allocated,
    /// so a rejected call leaks nothing.
    pub fn generate(
        &self,
        client_seed: &str,
    ) -> Result<(SeedCommitment, MultiplierOutcome), OutcomeError> {
        let client_seed = normalize_client_seed(client_seed)?;
        let mut bytes = vec![0u8; self.config.server_seed_bytes];
        OsRng.fill_bytes(&mut bytes);
        let server_seed = BASE64.encode(&bytes);
        self.derive(server_seed, client_seed)
    }

    /// Deterministic path with an injected server seed.
    ///
    /// Used by verification and tests; produces results identical to
    /// [`generate`](Self::generate) for the same seed pair.
    pub fn generate_with_server_seed(
        &self,
        server_seed: &str,
        client_seed: &str,
    ) -> Result<(SeedCommitment, MultiplierOutcome), OutcomeError> {
        let client_seed = normalize_client_seed(client_seed)?;
        self.derive(server_seed.to_owned(), client_seed)
    }

    fn derive(
        &self,
        server_seed: String,
        client_seed: String,
    ) -> Result<(SeedCommitment, MultiplierOutcome), OutcomeError> {
        let server_seed_hash = sha256_hex(server_seed.as_bytes());
        let combined_seed = format!("{server_seed}{client_seed}");
        let game_hash = sha256_hex(combined_seed.as_bytes());
        let outcome = self.multiplier_from_hash(&game_hash)?;

        let commitment = SeedCommitment {
            server_seed,
            server_seed_hash,
            client_seed,
            game_hash,
        };
        Ok((commitment, outcome))
    }

    /// Steps 3-6 of the published algorithm: game hash -> multiplier.
    ///
    /// Exposed separately so verifiers can rerun just the curve on a hash
    /// they recomputed themselves.
    pub fn multiplier_from_hash(&self, game_hash: &str) -> Result<MultiplierOutcome, OutcomeError> {
        let len = self.config.hash_slice_len;
        if len == 0 || len > 16 || len > game_hash.len() {
            return Err(OutcomeError::InvalidSliceLen(len));
        }

        let hash_int_value = u64::from_str_radix(&game_hash[..len], 16)?;
        let bit_count = len as u32 * 4;
        let max_hash_value = if bit_count == 64 {
            u64::MAX
        } else {
            (1u64 << bit_count) - 1
        };
        let normalized_hash_value = hash_int_value as f64 / max_hash_value as f64;

        // An all-ones slice normalizes to exactly 1.0 and the curve blows up;
        // the max clamp owns that case.
        let ratio = 1.0 / (1.0 - normalized_hash_value);
        if !ratio.is_finite() {
            return Ok(MultiplierOutcome {
                hash_int_value,
                normalized_hash_value,
                raw_multiplier: self.config.max_multiplier,
                final_multiplier: self.config.max_multiplier,
            });
        }

        let raw_multiplier = round2(ratio)?;
        let adjusted = round2(raw_multiplier * (1.0 - self.config.house_edge))?;
        let final_multiplier = adjusted.clamp(self.config.min_multiplier, self.config.max_multiplier);

        Ok(MultiplierOutcome {
            hash_int_value,
            normalized_hash_value,
            raw_multiplier,
            final_multiplier,
        })
    }

    /// Sample the multiplier distribution over `rounds` fresh outcomes.
    ///
    /// Operator sanity check for the curve shape: buckets outcomes into the
    /// standard ranges and reports counts, percentages, and extremes.
    pub fn simulate_distribution(
        &self,
        rounds: u32,
        client_seed: &str,
    ) -> Result<DistributionReport, OutcomeError> {
        let mut buckets: Vec<DistributionBucket> = BUCKET_RANGES
            .iter()
            .map(|(label, _, _)| DistributionBucket {
                label,
                count: 0,
                percentage: 0.0,
            })
            .collect();
        let mut lowest = f64::INFINITY;
        let mut highest = f64::NEG_INFINITY;

        for _ in 0..rounds {
            let (_, outcome) = self.generate(client_seed)?;
            let multiplier = outcome.final_multiplier;
            lowest = lowest.min(multiplier);
            highest = highest.max(multiplier);

            for (bucket, (_, min, max)) in buckets.iter_mut().zip(BUCKET_RANGES) {
                if multiplier >= min && multiplier < max {
                    bucket.count += 1;
                    break;
                }
            }
        }

        for bucket in &mut buckets {
            bucket.percentage = round2(f64::from(bucket.count) / f64::from(rounds.max(1)) * 100.0)?;
        }

        Ok(DistributionReport {
            buckets,
            lowest,
            highest,
        })
    }
}

/// Recompute an outcome from revealed material, as a third party would.
///
/// Checks the seed against the published commitment, recomputes the game
/// hash, then rederives the multiplier. Any mismatch is an error.
pub fn verify_outcome(
    server_seed: &str,
    client_seed: &str,
    server_seed_hash: &str,
    game_hash: &str,
    config: &MultiplierConfig,
) -> Result<MultiplierOutcome, OutcomeError> {
    if sha256_hex(server_seed.as_bytes()) != server_seed_hash {
        return Err(OutcomeError::CommitmentMismatch);
    }

    let combined = format!("{server_seed}{client_seed}");
    if sha256_hex(combined.as_bytes()) != game_hash {
        return Err(OutcomeError::GameHashMismatch);
    }

    OutcomeGenerator::new(config.clone()).multiplier_from_hash(game_hash)
}

fn normalize_client_seed(client_seed: &str) -> Result<String, OutcomeError> {
    let trimmed = client_seed.trim();
    if trimmed.is_empty() {
        return Err(OutcomeError::InvalidClientSeed);
    }
    Ok(trimmed.to_owned())
}

/// Bucket labels and half-open ranges for distribution sampling.
const BUCKET_RANGES: [(&str, f64, f64); 10] = [
    ("1-1.5", 1.0, 1.5),
    ("1.5-2", 1.5, 2.0),
    ("2-3", 2.0, 3.0),
    ("3-4", 3.0, 4.0),
    ("4-5", 4.0, 5.0),
    ("5-10", 5.0, 10.0),
    ("10-30", 10.0, 30.0),
    ("30-50", 30.0, 50.0),
    ("50-100", 50.0, 100.0),
    ("100+", 100.0, f64::INFINITY),
];

/// One bucket of a distribution report.
#[derive(Debug, Clone, Serialize)]
pub struct DistributionBucket {
    /// Range label, e.g. `"1.5-2"`.
    pub label: &'static str,
    /// Outcomes that landed in this bucket.
    pub count: u32,
    /// Share of all sampled rounds, 2 decimals.
    pub percentage: f64,
}

/// Result of sampling the multiplier distribution.
#[derive(Debug, Clone, Serialize)]
pub struct DistributionReport {
    /// Buckets in ascending range order.
    pub buckets: Vec<DistributionBucket>,
    /// Smallest multiplier observed.
    pub lowest: f64,
    /// Largest multiplier observed.
    pub highest: f64,
}
