//! Racing Vehicles
//!
//! One vehicle per enumerated type races each round, compounding its
//! multiplier every tick until it reaches the crash point fixed by its
//! outcome. Vehicles are owned exclusively by the round coordinator; nothing
//! outside the engine mutates them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::game::outcome::{MultiplierOutcome, SeedCommitment};

/// Vehicle kinds racing in every round.
///
/// A closed enum rather than a string map: adding or removing a kind is a
/// compile-time-checked change. `Ord` gives the coordinator's `BTreeMap` a
/// stable tick order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    /// Motorbike taxi.
    BodaBoda,
    /// Minibus.
    Matatu,
}

impl VehicleType {
    /// Every vehicle type, in tick order.
    pub const ALL: [VehicleType; 2] = [VehicleType::BodaBoda, VehicleType::Matatu];

    /// Wire name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BodaBoda => "bodaboda",
            Self::Matatu => "matatu",
        }
    }

    /// Client seed used when no contribution arrived for this round.
    ///
    /// Deterministic and documented: it is part of the public verification
    /// contract, so players can recompute outcomes for uncontributed rounds.
    pub fn fallback_client_seed(self) -> String {
        format!("curix2013-{}", self.as_str())
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vehicle life within one round. `Crashed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    /// Created, not yet ticked.
    Idle,
    /// Multiplier climbing.
    Running,
    /// Reached its crash point; no further movement.
    Crashed,
}

/// Growth tunables.
#[derive(Debug, Clone)]
pub struct VehicleConfig {
    /// Per-tick compounding rate; 0.004 gives the slow-start,
    /// fast-acceleration curve at a 100 ms tick.
    pub growth_rate: f64,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self { growth_rate: 0.004 }
    }
}

/// One racing entity: a crash target and the multiplier climbing toward it.
#[derive(Debug)]
pub struct Vehicle {
    vehicle_type: VehicleType,
    commitment: SeedCommitment,
    outcome: MultiplierOutcome,
    current_multiplier: f64,
    status: VehicleStatus,
    growth_rate: f64,
}

impl Vehicle {
    /// Create an idle vehicle at 1.0x with a precomputed crash target.
    pub fn new(
        vehicle_type: VehicleType,
        commitment: SeedCommitment,
        outcome: MultiplierOutcome,
        config: &VehicleConfig,
    ) -> Self {
        Self {
            vehicle_type,
            commitment,
            outcome,
            current_multiplier: 1.0,
            status: VehicleStatus::Idle,
            growth_rate: config.growth_rate,
        }
    }

    /// Advance one tick. A no-op once crashed.
    ///
    /// Growth compounds (`current * rate`). The running value stays
    /// unrounded so sub-cent growth near 1.0x still makes progress; display
    /// rounding happens at snapshot time. On the crash edge the multiplier
    /// lands exactly on the target, never past it.
    pub fn tick(&mut self) {
        if self.status == VehicleStatus::Crashed {
            return;
        }

        let growth = self.current_multiplier * self.growth_rate;
        let next = self.current_multiplier + growth;

        if next >= self.outcome.final_multiplier {
            self.current_multiplier = self.outcome.final_multiplier;
            self.status = VehicleStatus::Crashed;
        } else {
            self.current_multiplier = next;
            self.status = VehicleStatus::Running;
        }
    }

    /// This vehicle's kind.
    pub fn vehicle_type(&self) -> VehicleType {
        self.vehicle_type
    }

    /// Current lifecycle status.
    pub fn status(&self) -> VehicleStatus {
        self.status
    }

    /// Current multiplier, unrounded.
    pub fn current_multiplier(&self) -> f64 {
        self.current_multiplier
    }

    /// The precomputed outcome this vehicle is racing toward.
    pub fn outcome(&self) -> &MultiplierOutcome {
        &self.outcome
    }

    /// Seed provenance for this vehicle's outcome.
    pub(crate) fn commitment(&self) -> &SeedCommitment {
        &self.commitment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::outcome::{MultiplierConfig, OutcomeGenerator};

    const SERVER_SEED: &str = "AAECAwQFBgcICQoLDA0ODxAREhMUFRYX";

    fn vehicle_with_target(target: f64) -> Vehicle {
        let generator = OutcomeGenerator::new(MultiplierConfig::default());
        let (commitment, mut outcome) = generator
            .generate_with_server_seed(SERVER_SEED, "curix2013-bodaboda")
            .unwrap();
        outcome.final_multiplier = target;
        Vehicle::new(
            VehicleType::BodaBoda,
            commitment,
            outcome,
            &VehicleConfig::default(),
        )
    }

    #[test]
    fn test_growth_is_monotonic_and_lands_exactly() {
        let mut vehicle = vehicle_with_target(1.8);
        let mut previous = vehicle.current_multiplier();
        let mut ticks = 0;

        while vehicle.status() != VehicleStatus::Crashed {
            vehicle.tick();
            ticks += 1;
            assert!(vehicle.current_multiplier() >= previous, "must never shrink");
            assert!(vehicle.current_multiplier() <= 1.8, "must never overshoot");
            previous = vehicle.current_multiplier();
            assert!(ticks < 10_000, "vehicle failed to crash");
        }

        assert_eq!(vehicle.current_multiplier(), 1.8);
        // ceil(ln(1.8) / ln(1.004)) = 148
        assert!(ticks <= 148, "crashed after {ticks} ticks");
    }

    #[test]
    fn test_crash_bound_for_larger_target() {
        let mut vehicle = vehicle_with_target(12.4);
        let mut ticks = 0;
        while vehicle.status() != VehicleStatus::Crashed {
            vehicle.tick();
            ticks += 1;
            assert!(ticks < 10_000, "vehicle failed to crash");
        }
        // ceil(ln(12.4) / ln(1.004)) = 631
        assert!(ticks <= 631, "crashed after {ticks} ticks");
        assert_eq!(vehicle.current_multiplier(), 12.4);
    }

    #[test]
    fn test_ticks_after_crash_are_noops() {
        let mut vehicle = vehicle_with_target(1.1);
        while vehicle.status() != VehicleStatus::Crashed {
            vehicle.tick();
        }

        let frozen = vehicle.current_multiplier();
        for _ in 0..50 {
            vehicle.tick();
        }
        assert_eq!(vehicle.status(), VehicleStatus::Crashed);
        assert_eq!(vehicle.current_multiplier(), frozen);
    }

    #[test]
    fn test_floor_target_crashes_on_first_tick() {
        // A 1.00x outcome (min clamp) crashes immediately at exactly 1.0.
        let mut vehicle = vehicle_with_target(1.0);
        assert_eq!(vehicle.status(), VehicleStatus::Idle);
        vehicle.tick();
        assert_eq!(vehicle.status(), VehicleStatus::Crashed);
        assert_eq!(vehicle.current_multiplier(), 1.0);
    }

    #[test]
    fn test_status_transitions() {
        let mut vehicle = vehicle_with_target(2.0);
        assert_eq!(vehicle.status(), VehicleStatus::Idle);
        vehicle.tick();
        assert_eq!(vehicle.status(), VehicleStatus::Running);
    }

    #[test]
    fn test_type_order_and_names() {
        assert!(VehicleType::BodaBoda < VehicleType::Matatu);
        assert_eq!(VehicleType::ALL, [VehicleType::BodaBoda, VehicleType::Matatu]);
        assert_eq!(VehicleType::Matatu.as_str(), "matatu");
        assert_eq!(
            VehicleType::BodaBoda.fallback_client_seed(),
            "curix2013-bodaboda"
        );
        assert_eq!(
            serde_json::to_string(&VehicleType::BodaBoda).unwrap(),
            "\"bodaboda\""
        );
    }
}
