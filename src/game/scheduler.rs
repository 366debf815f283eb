//! Round Lifecycle
//!
//! The top-level loop: Betting -> Preparing -> Running -> End, repeating for
//! the lifetime of the process. Phase waits and the running tick loop are
//! timer-driven suspensions on the tokio runtime, so other work interleaves
//! between ticks; nothing here busy-waits or blocks a thread.
//!
//! There is no partial-failure recovery: any coordinator error is fatal to
//! the loop and surfaces to the process owner. Restarting is an operational
//! decision made outside the engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{error, info};
use uuid::Uuid;

use crate::game::events::{RoundEvent, RoundPhase};
use crate::game::round::{RoundCoordinator, RoundError};

/// Phase timing tunables, in milliseconds.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Length of the betting window.
    pub betting_ms: u64,
    /// Granularity of the betting countdown events.
    pub countdown_tick_ms: u64,
    /// Interval between running-phase ticks.
    pub tick_interval_ms: u64,
    /// Pause after a round ends, before the next betting window.
    pub end_ms: u64,
    /// Broadcast channel capacity for round events.
    pub event_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            betting_ms: 5_000,
            countdown_tick_ms: 100,
            tick_interval_ms: 100,
            end_ms: 2_000,
            event_capacity: 256,
        }
    }
}

/// A phase failed. Always fatal: the loop has stopped and will not restart
/// itself.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The coordinator faulted during a phase.
    #[error("round fault during {phase:?} phase: {source}")]
    Round {
        /// Phase that was active when the fault occurred.
        phase: RoundPhase,
        /// The underlying coordinator error.
        #[source]
        source: RoundError,
    },
}

/// Drives the infinite round lifecycle over one coordinator.
///
/// Owned by the process composition root and shared behind an `Arc`; there
/// is exactly one writer to round state (the loop itself), so the
/// coordinator sits behind a single async mutex that is never contended
/// during a phase.
pub struct RoundScheduler {
    config: SchedulerConfig,
    coordinator: Mutex<RoundCoordinator>,
    events: broadcast::Sender<RoundEvent>,
    shutdown: watch::Sender<bool>,
    running: AtomicBool,
}

impl RoundScheduler {
    /// Create a scheduler over `coordinator`. The loop does not start until
    /// [`start`](Self::start) or [`run`](Self::run) is called.
    pub fn new(coordinator: RoundCoordinator, config: SchedulerConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            coordinator: Mutex::new(coordinator),
            events,
            shutdown,
            running: AtomicBool::new(false),
        }
    }

    /// Subscribe to the engine's event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<RoundEvent> {
        self.events.subscribe()
    }

    /// Whether the lifecycle loop is currently alive.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Signal the loop to stop at its next suspension point.
    ///
    /// This is process-level teardown, not mid-round cancellation: the
    /// engine has no notion of resuming an interrupted round.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Spawn the lifecycle loop onto the runtime.
    ///
    /// Returns `None` if the loop is already alive; starting twice is a
    /// no-op, not an error.
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<Result<(), LifecycleError>>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return None;
        }

        // A stop signal from a previous run must not kill the new loop.
        self.shutdown.send_replace(false);

        let this = Arc::clone(self);
        Some(tokio::spawn(async move {
            let result = this.drive().await;
            this.running.store(false, Ordering::SeqCst);
            result
        }))
    }

    /// Run the lifecycle loop until shutdown or a fatal fault.
    ///
    /// Returns `Ok(())` only on shutdown; a coordinator fault stops the loop
    /// and is returned to the caller.
    async fn drive(&self) -> Result<(), LifecycleError> {
        let mut shutdown = self.shutdown.subscribe();
        info!("round lifecycle started");

        loop {
            tokio::select! {
                result = self.run_round() => {
                    if let Err(fault) = result {
                        error!(%fault, "round lifecycle halted");
                        return Err(fault);
                    }
                }
                _ = shutdown.wait_for(|stop| *stop) => {
                    info!("shutdown requested; round lifecycle stopping");
                    return Ok(());
                }
            }
        }
    }

    /// One full Betting -> Preparing -> Running -> End cycle.
    async fn run_round(&self) -> Result<(), LifecycleError> {
        let round_id = self.coordinator.lock().await.begin_round();

        self.betting_phase(round_id).await;
        self.preparing_phase(round_id).await?;
        self.running_phase(round_id).await?;
        self.end_phase(round_id).await?;

        info!(round = %round_id, "round complete");
        Ok(())
    }

    /// Betting window: a fixed-length countdown at fixed granularity.
    async fn betting_phase(&self, round_id: Uuid) {
        self.set_phase(round_id, RoundPhase::Betting);

        let step = self.config.countdown_tick_ms.max(1);
        let mut ticker = interval(Duration::from_millis(step));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately; countdown starts at full window.
        ticker.tick().await;

        let mut remaining = self.config.betting_ms;
        while remaining > 0 {
            self.emit(RoundEvent::BettingCountdown {
                round_id,
                remaining_ms: remaining,
            });
            ticker.tick().await;
            remaining = remaining.saturating_sub(step);
        }
    }

    /// Seed the round and publish fairness commitments. No fixed duration;
    /// the phase ends as soon as seeding completes.
    async fn preparing_phase(&self, round_id: Uuid) -> Result<(), LifecycleError> {
        self.set_phase(round_id, RoundPhase::Preparing);

        let mut coordinator = self.coordinator.lock().await;
        coordinator
            .seed_round()
            .map_err(|source| LifecycleError::Round {
                phase: RoundPhase::Preparing,
                source,
            })?;
        let commitments = coordinator
            .commitments()
            .map_err(|source| LifecycleError::Round {
                phase: RoundPhase::Preparing,
                source,
            })?;
        drop(coordinator);

        self.emit(RoundEvent::Commitments {
            round_id,
            commitments,
        });
        Ok(())
    }

    /// Tick all vehicles at the configured interval until every one has
    /// crashed, emitting a consistent snapshot per tick.
    async fn running_phase(&self, round_id: Uuid) -> Result<(), LifecycleError> {
        self.set_phase(round_id, RoundPhase::Running);

        let mut ticker = interval(Duration::from_millis(self.config.tick_interval_ms.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let (all_crashed, snapshot) = self
                .coordinator
                .lock()
                .await
                .tick_all()
                .map_err(|source| LifecycleError::Round {
                    phase: RoundPhase::Running,
                    source,
                })?;
            self.emit(RoundEvent::Tick { snapshot });

            if all_crashed {
                return Ok(());
            }
        }
    }

    /// Reveal seeds and outcomes, then hold so clients can observe results.
    async fn end_phase(&self, round_id: Uuid) -> Result<(), LifecycleError> {
        self.set_phase(round_id, RoundPhase::End);

        let reveals = self
            .coordinator
            .lock()
            .await
            .reveals()
            .map_err(|source| LifecycleError::Round {
                phase: RoundPhase::End,
                source,
            })?;
        self.emit(RoundEvent::RoundCrashed { round_id, reveals });

        sleep(Duration::from_millis(self.config.end_ms)).await;
        Ok(())
    }

    fn set_phase(&self, round_id: Uuid, phase: RoundPhase) {
        info!(round = %round_id, ?phase, "phase changed");
        self.emit(RoundEvent::PhaseChanged {
            round_id,
            phase,
            at: Utc::now(),
        });
    }

    /// Send an event to whoever is listening. A missing or slow transport
    /// layer never blocks the engine.
    fn emit(&self, event: RoundEvent) {
        let _ = self.events.send(event);
    }
}
