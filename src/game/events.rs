//! Round Events
//!
//! Everything the engine publishes to the outside world. Delivery is the
//! transport layer's concern; the engine only guarantees that each event is
//! an immutable, internally consistent value.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::vehicle::{VehicleStatus, VehicleType};

/// Phases of one round, in loop order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundPhase {
    /// Players place bets; a countdown runs. No vehicle state exists yet.
    Betting,
    /// Outcomes are being seeded; ends as soon as seeding completes.
    Preparing,
    /// Vehicles tick until every one has crashed.
    Running,
    /// Results on display before the next round's betting opens.
    End,
}

/// Fairness commitment for one vehicle, published before outcomes lock in.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FairnessCommitment {
    /// SHA-256 hex of the still-secret server seed.
    pub server_seed_hash: String,
    /// The client seed that was combined with it.
    pub client_seed: String,
}

/// Post-round reveal for one vehicle.
///
/// Together with the earlier commitment this is sufficient for any third
/// party to recompute and verify the outcome.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutcomeReveal {
    /// The plaintext server seed.
    pub server_seed: String,
    /// SHA-256 hex of `server_seed ++ client_seed`.
    pub game_hash: String,
    /// Multiplier before the house edge.
    pub raw_multiplier: f64,
    /// The crash point the vehicle stopped at.
    pub final_multiplier: f64,
}

/// One vehicle's externally visible state within a tick frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleFrame {
    /// Current multiplier, rounded to 2 decimals for display.
    pub current_multiplier: f64,
    /// Lifecycle status.
    pub status: VehicleStatus,
}

/// Consistent frame of every vehicle after one tick.
///
/// Every vehicle in the map has been advanced the same number of times, so
/// clients always observe a coherent global frame.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoundSnapshot {
    /// Round this frame belongs to.
    pub round_id: Uuid,
    /// 1-based tick index within the running phase.
    pub tick: u64,
    /// Per-vehicle state, keyed in stable type order.
    pub vehicles: BTreeMap<VehicleType, VehicleFrame>,
}

/// Events broadcast by the engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoundEvent {
    /// The lifecycle moved to a new phase.
    PhaseChanged {
        /// Round the phase belongs to.
        round_id: Uuid,
        /// The phase just entered.
        phase: RoundPhase,
        /// Wall-clock time of the transition.
        at: DateTime<Utc>,
    },
    /// Betting window countdown, emitted at the countdown granularity.
    BettingCountdown {
        /// Round being bet on.
        round_id: Uuid,
        /// Milliseconds until betting closes.
        remaining_ms: u64,
    },
    /// Per-vehicle fairness commitments, published before the round runs.
    Commitments {
        /// Round the commitments bind.
        round_id: Uuid,
        /// Commitment per vehicle.
        commitments: BTreeMap<VehicleType, FairnessCommitment>,
    },
    /// One running-phase tick frame.
    Tick {
        /// The consistent per-vehicle frame.
        snapshot: RoundSnapshot,
    },
    /// Every vehicle has crashed; seeds and outcomes are revealed.
    RoundCrashed {
        /// Round that just finished.
        round_id: Uuid,
        /// Reveal per vehicle.
        reveals: BTreeMap<VehicleType, OutcomeReveal>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_serializes_with_vehicle_names_as_keys() {
        let mut vehicles = BTreeMap::new();
        vehicles.insert(
            VehicleType::BodaBoda,
            VehicleFrame {
                current_multiplier: 1.42,
                status: VehicleStatus::Running,
            },
        );
        vehicles.insert(
            VehicleType::Matatu,
            VehicleFrame {
                current_multiplier: 1.8,
                status: VehicleStatus::Crashed,
            },
        );

        let event = RoundEvent::Tick {
            snapshot: RoundSnapshot {
                round_id: Uuid::nil(),
                tick: 7,
                vehicles,
            },
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"tick\""));
        assert!(json.contains("\"bodaboda\""));
        assert!(json.contains("\"matatu\""));
        assert!(json.contains("\"crashed\""));

        let back: RoundEvent = serde_json::from_str(&json).unwrap();
        match back {
            RoundEvent::Tick { snapshot } => {
                assert_eq!(snapshot.tick, 7);
                assert_eq!(snapshot.vehicles.len(), 2);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_phase_serialization() {
        assert_eq!(
            serde_json::to_string(&RoundPhase::Betting).unwrap(),
            "\"betting\""
        );
        assert_eq!(serde_json::to_string(&RoundPhase::End).unwrap(), "\"end\"");
    }
}
