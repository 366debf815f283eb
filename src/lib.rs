//! # Crash Race Engine
//!
//! Provably-fair outcome engine and round lifecycle for the crash race game.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    CRASH RACE ENGINE                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/             - Deterministic primitives                │
//! │  ├── rounding.rs   - Round-half-away-from-zero               │
//! │  └── hash.rs       - SHA-256 hex digests                     │
//! │                                                              │
//! │  game/             - Round engine                            │
//! │  ├── outcome.rs    - Committed seeds -> crash multiplier     │
//! │  ├── vehicle.rs    - Per-vehicle growth simulation           │
//! │  ├── round.rs      - Coordinator owning one round            │
//! │  ├── scheduler.rs  - Betting -> Preparing -> Running -> End  │
//! │  └── events.rs     - Published snapshots and reveals         │
//! │                                                              │
//! │  config.rs         - Tunables + environment loading          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Fairness Guarantee
//!
//! Every round's crash multipliers are fixed before betting closes and
//! verifiable after it ends:
//! - The SHA-256 hash of each secret server seed is published before the
//!   round runs.
//! - The multiplier is a pure function of `(server_seed, client_seed)`.
//! - The plaintext server seed is revealed once every vehicle has crashed,
//!   so any third party can recompute the outcome.
//!
//! The engine emits all observable state over a broadcast channel; bets,
//! balances, persistence, and delivery to clients live outside this crate.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod game;

// Re-export commonly used types
pub use config::EngineConfig;
pub use game::events::{RoundEvent, RoundPhase, RoundSnapshot};
pub use game::outcome::{verify_outcome, MultiplierConfig, MultiplierOutcome, OutcomeGenerator};
pub use game::round::RoundCoordinator;
pub use game::scheduler::{RoundScheduler, SchedulerConfig};
pub use game::vehicle::{Vehicle, VehicleConfig, VehicleStatus, VehicleType};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
