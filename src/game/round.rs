//! Round Coordination
//!
//! The coordinator is the sole owner and mutator of one round's vehicles:
//! it seeds their outcomes, advances them together tick by tick, and guards
//! the seal on server seeds until every vehicle has crashed. The scheduler
//! above it only sequences phases; the transport layer below it only sees
//! immutable snapshots.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::rounding::{round2, RoundingError};
use crate::game::events::{FairnessCommitment, OutcomeReveal, RoundSnapshot, VehicleFrame};
use crate::game::outcome::{MultiplierConfig, OutcomeError, OutcomeGenerator};
use crate::game::vehicle::{Vehicle, VehicleConfig, VehicleStatus, VehicleType};

/// Errors from round coordination.
#[derive(Debug, Error)]
pub enum RoundError {
    /// An operation that needs a seeded round ran before `seed_round`.
    #[error("round {0} has not been seeded")]
    NotSeeded(Uuid),

    /// Reveal requested while server seeds are still sealed.
    #[error("round {0} is still live; server seeds stay sealed until every vehicle crashes")]
    StillLive(Uuid),

    /// Outcome generation failed; the round must not enter Running.
    #[error(transparent)]
    Outcome(#[from] OutcomeError),

    /// A snapshot value could not be rounded.
    #[error(transparent)]
    Rounding(#[from] RoundingError),
}

/// Owns and drives the set of vehicles racing one round.
pub struct RoundCoordinator {
    generator: OutcomeGenerator,
    vehicle_config: VehicleConfig,
    round_id: Uuid,
    started_at: DateTime<Utc>,
    tick: u64,
    vehicles: BTreeMap<VehicleType, Vehicle>,
    crash_handled: BTreeMap<VehicleType, bool>,
    client_seeds: BTreeMap<VehicleType, String>,
}

impl RoundCoordinator {
    /// Create a coordinator with no seeded round.
    pub fn new(multiplier_config: MultiplierConfig, vehicle_config: VehicleConfig) -> Self {
        Self {
            generator: OutcomeGenerator::new(multiplier_config),
            vehicle_config,
            round_id: Uuid::new_v4(),
            started_at: Utc::now(),
            tick: 0,
            vehicles: BTreeMap::new(),
            crash_handled: BTreeMap::new(),
            client_seeds: BTreeMap::new(),
        }
    }

    /// Identifier of the current (or upcoming) round.
    pub fn round_id(&self) -> Uuid {
        self.round_id
    }

    /// Wall-clock start of the current round cycle.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Rotate round identity for the next cycle.
    ///
    /// Called when betting opens. The previous round's vehicles stay
    /// readable (and revealable) until `seed_round` replaces them.
    pub fn begin_round(&mut self) -> Uuid {
        self.round_id = Uuid::new_v4();
        self.started_at = Utc::now();
        self.round_id
    }

    /// Record a client-seed contribution for one vehicle in the next seeding.
    ///
    /// Contributions are consumed by `seed_round`; collecting them from
    /// bettors is an external collaborator's job.
    pub fn set_client_seed(&mut self, vehicle_type: VehicleType, seed: impl Into<String>) {
        self.client_seeds.insert(vehicle_type, seed.into());
    }

    /// Seed every vehicle for this round. All-or-nothing.
    ///
    /// Each vehicle gets its contributed client seed, or the documented
    /// fallback, and a fresh committed outcome. Any generation failure
    /// propagates and leaves the previous state untouched; a partially
    /// seeded round never exists.
    pub fn seed_round(&mut self) -> Result<(), RoundError> {
        let contributions = std::mem::take(&mut self.client_seeds);

        let mut vehicles = BTreeMap::new();
        for vehicle_type in VehicleType::ALL {
            let client_seed = contributions
                .get(&vehicle_type)
                .cloned()
                .unwrap_or_else(|| vehicle_type.fallback_client_seed());

            let (commitment, outcome) = self.generator.generate(&client_seed)?;
            debug!(
                round = %self.round_id,
                vehicle = %vehicle_type,
                seed_hash = %commitment.server_seed_hash,
                "vehicle seeded"
            );
            vehicles.insert(
                vehicle_type,
                Vehicle::new(vehicle_type, commitment, outcome, &self.vehicle_config),
            );
        }

        // Replace the whole round in one step.
        self.vehicles = vehicles;
        self.crash_handled = VehicleType::ALL.iter().map(|t| (*t, false)).collect();
        self.tick = 0;
        Ok(())
    }

    /// Per-vehicle fairness commitments for the seeded round.
    pub fn commitments(&self) -> Result<BTreeMap<VehicleType, FairnessCommitment>, RoundError> {
        if self.vehicles.is_empty() {
            return Err(RoundError::NotSeeded(self.round_id));
        }

        Ok(self
            .vehicles
            .iter()
            .map(|(vehicle_type, vehicle)| {
                let commitment = vehicle.commitment();
                (
                    *vehicle_type,
                    FairnessCommitment {
                        server_seed_hash: commitment.server_seed_hash.clone(),
                        client_seed: commitment.client_seed.clone(),
                    },
                )
            })
            .collect())
    }

    /// Advance every non-crashed vehicle exactly once and snapshot the field.
    ///
    /// Vehicles tick in stable `VehicleType` order, and the snapshot is only
    /// built after the whole field has advanced, so every frame is globally
    /// consistent. A vehicle's crash transition is handled exactly once;
    /// from then on its multiplier is frozen at the crash point.
    ///
    /// Returns `(all_crashed, snapshot)`.
    pub fn tick_all(&mut self) -> Result<(bool, RoundSnapshot), RoundError> {
        if self.vehicles.is_empty() {
            return Err(RoundError::NotSeeded(self.round_id));
        }

        self.tick += 1;

        for (vehicle_type, vehicle) in self.vehicles.iter_mut() {
            if vehicle.status() == VehicleStatus::Crashed {
                continue;
            }
            vehicle.tick();
            if vehicle.status() == VehicleStatus::Crashed {
                self.crash_handled.insert(*vehicle_type, true);
                info!(
                    round = %self.round_id,
                    vehicle = %vehicle_type,
                    crash_point = vehicle.current_multiplier(),
                    tick = self.tick,
                    "vehicle crashed"
                );
            }
        }

        let mut frames = BTreeMap::new();
        let mut all_crashed = true;
        for (vehicle_type, vehicle) in &self.vehicles {
            if vehicle.status() != VehicleStatus::Crashed {
                all_crashed = false;
            }
            frames.insert(
                *vehicle_type,
                VehicleFrame {
                    current_multiplier: round2(vehicle.current_multiplier())?,
                    status: vehicle.status(),
                },
            );
        }

        Ok((
            all_crashed,
            RoundSnapshot {
                round_id: self.round_id,
                tick: self.tick,
                vehicles: frames,
            },
        ))
    }

    /// Whether `vehicle_type`'s crash has been processed this round.
    ///
    /// Set exactly once, on the tick where the vehicle crashes. Settlement
    /// consumers read it to process each crash a single time.
    pub fn crash_handled(&self, vehicle_type: VehicleType) -> bool {
        self.crash_handled
            .get(&vehicle_type)
            .copied()
            .unwrap_or(false)
    }

    /// Whether every vehicle in the seeded round has crashed.
    pub fn all_crashed(&self) -> bool {
        !self.vehicles.is_empty()
            && self
                .vehicles
                .values()
                .all(|v| v.status() == VehicleStatus::Crashed)
    }

    /// Reveal every vehicle's seed and outcome.
    ///
    /// Only available once the round has fully crashed; before that the
    /// server seeds are sealed and this returns an error.
    pub fn reveals(&self) -> Result<BTreeMap<VehicleType, OutcomeReveal>, RoundError> {
        if self.vehicles.is_empty() {
            return Err(RoundError::NotSeeded(self.round_id));
        }
        if !self.all_crashed() {
            return Err(RoundError::StillLive(self.round_id));
        }

        Ok(self
            .vehicles
            .iter()
            .map(|(vehicle_type, vehicle)| {
                let commitment = vehicle.commitment();
                let outcome = vehicle.outcome();
                (
                    *vehicle_type,
                    OutcomeReveal {
                        server_seed: commitment.server_seed().to_owned(),
                        game_hash: commitment.game_hash.clone(),
                        raw_multiplier: outcome.raw_multiplier,
                        final_multiplier: outcome.final_multiplier,
                    },
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::outcome::OutcomeGenerator;

    const SERVER_SEED: &str = "AAECAwQFBgcICQoLDA0ODxAREhMUFRYX";

    fn coordinator() -> RoundCoordinator {
        RoundCoordinator::new(MultiplierConfig::default(), VehicleConfig::default())
    }

    /// Replace the seeded vehicles with ones racing to fixed crash points.
    fn install_targets(coordinator: &mut RoundCoordinator, targets: &[(VehicleType, f64)]) {
        let generator = OutcomeGenerator::new(MultiplierConfig::default());
        let mut vehicles = BTreeMap::new();
        for (vehicle_type, target) in targets {
            let (commitment, mut outcome) = generator
                .generate_with_server_seed(SERVER_SEED, &vehicle_type.fallback_client_seed())
                .unwrap();
            outcome.final_multiplier = *target;
            vehicles.insert(
                *vehicle_type,
                Vehicle::new(*vehicle_type, commitment, outcome, &VehicleConfig::default()),
            );
        }
        coordinator.vehicles = vehicles;
        coordinator.crash_handled = VehicleType::ALL.iter().map(|t| (*t, false)).collect();
        coordinator.tick = 0;
    }

    #[test]
    fn test_seed_round_populates_every_vehicle() {
        let mut coordinator = coordinator();
        coordinator.seed_round().unwrap();

        let commitments = coordinator.commitments().unwrap();
        assert_eq!(commitments.len(), VehicleType::ALL.len());
        for (vehicle_type, commitment) in &commitments {
            assert_eq!(commitment.server_seed_hash.len(), 64);
            assert_eq!(
                commitment.client_seed,
                vehicle_type.fallback_client_seed()
            );
        }
    }

    #[test]
    fn test_contributed_client_seed_is_used_once() {
        let mut coordinator = coordinator();
        coordinator.set_client_seed(VehicleType::Matatu, "community-pick-42");
        coordinator.seed_round().unwrap();

        let commitments = coordinator.commitments().unwrap();
        assert_eq!(
            commitments[&VehicleType::Matatu].client_seed,
            "community-pick-42"
        );
        assert_eq!(
            commitments[&VehicleType::BodaBoda].client_seed,
            VehicleType::BodaBoda.fallback_client_seed()
        );

        // Contributions apply to one seeding only.
        coordinator.seed_round().unwrap();
        let commitments = coordinator.commitments().unwrap();
        assert_eq!(
            commitments[&VehicleType::Matatu].client_seed,
            VehicleType::Matatu.fallback_client_seed()
        );
    }

    #[test]
    fn test_blank_contribution_fails_whole_seeding() {
        let mut coordinator = coordinator();
        coordinator.set_client_seed(VehicleType::BodaBoda, "   ");

        assert!(matches!(
            coordinator.seed_round(),
            Err(RoundError::Outcome(OutcomeError::InvalidClientSeed))
        ));
        // No partially seeded round.
        assert!(matches!(
            coordinator.commitments(),
            Err(RoundError::NotSeeded(_))
        ));
    }

    #[test]
    fn test_tick_before_seeding_is_an_error() {
        let mut coordinator = coordinator();
        assert!(matches!(
            coordinator.tick_all(),
            Err(RoundError::NotSeeded(_))
        ));
    }

    #[test]
    fn test_reveals_sealed_until_all_crashed() {
        let mut coordinator = coordinator();
        assert!(matches!(
            coordinator.reveals(),
            Err(RoundError::NotSeeded(_))
        ));

        install_targets(
            &mut coordinator,
            &[(VehicleType::BodaBoda, 1.8), (VehicleType::Matatu, 12.4)],
        );
        coordinator.tick_all().unwrap();
        assert!(matches!(
            coordinator.reveals(),
            Err(RoundError::StillLive(_))
        ));

        while !coordinator.tick_all().unwrap().0 {}
        let reveals = coordinator.reveals().unwrap();
        assert_eq!(reveals.len(), 2);
        assert_eq!(reveals[&VehicleType::BodaBoda].server_seed, SERVER_SEED);
    }

    #[test]
    fn test_lower_target_crashes_first_then_freezes() {
        let mut coordinator = coordinator();
        install_targets(
            &mut coordinator,
            &[(VehicleType::BodaBoda, 1.8), (VehicleType::Matatu, 12.4)],
        );

        let mut boda_crash_tick = None;
        let mut frozen_value = None;
        let mut ticks = 0u64;

        loop {
            let (all_crashed, snapshot) = coordinator.tick_all().unwrap();
            ticks += 1;
            assert!(ticks < 10_000, "round failed to finish");

            // Every frame covers the whole field.
            assert_eq!(snapshot.vehicles.len(), 2);

            let boda = snapshot.vehicles[&VehicleType::BodaBoda];
            let matatu = snapshot.vehicles[&VehicleType::Matatu];

            if boda.status == VehicleStatus::Crashed {
                boda_crash_tick.get_or_insert(ticks);
                assert_eq!(boda.current_multiplier, 1.8);
                frozen_value = Some(boda.current_multiplier);
                // Lower target finishes strictly first.
                if matatu.status == VehicleStatus::Crashed {
                    assert!(ticks > boda_crash_tick.unwrap());
                }
            }

            if all_crashed {
                assert_eq!(matatu.current_multiplier, 12.4);
                break;
            }
        }

        assert!(boda_crash_tick.is_some());
        assert_eq!(frozen_value, Some(1.8));
        assert!(coordinator.crash_handled(VehicleType::BodaBoda));
        assert!(coordinator.crash_handled(VehicleType::Matatu));
    }

    #[test]
    fn test_crash_handled_marks_each_vehicle_once_crashed() {
        let mut coordinator = coordinator();
        assert!(!coordinator.crash_handled(VehicleType::BodaBoda));

        install_targets(
            &mut coordinator,
            &[(VehicleType::BodaBoda, 1.0), (VehicleType::Matatu, 2.0)],
        );
        coordinator.tick_all().unwrap();
        assert!(coordinator.crash_handled(VehicleType::BodaBoda));
        assert!(!coordinator.crash_handled(VehicleType::Matatu));

        while !coordinator.tick_all().unwrap().0 {}
        assert!(coordinator.crash_handled(VehicleType::Matatu));
    }

    #[test]
    fn test_all_crashed_only_when_every_vehicle_done() {
        let mut coordinator = coordinator();
        assert!(!coordinator.all_crashed());

        install_targets(
            &mut coordinator,
            &[(VehicleType::BodaBoda, 1.0), (VehicleType::Matatu, 2.0)],
        );
        let (all_crashed, _) = coordinator.tick_all().unwrap();
        assert!(!all_crashed, "matatu still running");
        assert!(!coordinator.all_crashed());

        while !coordinator.tick_all().unwrap().0 {}
        assert!(coordinator.all_crashed());
    }

    #[test]
    fn test_begin_round_rotates_identity() {
        let mut coordinator = coordinator();
        let first = coordinator.round_id();
        let second = coordinator.begin_round();
        assert_ne!(first, second);
        assert_eq!(coordinator.round_id(), second);
    }
}
