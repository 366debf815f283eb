//! Round Engine
//!
//! The provably-fair crash engine:
//! - `outcome`   - committed seeds -> crash multiplier
//! - `vehicle`   - per-vehicle multiplier growth simulation
//! - `round`     - coordinator owning one round's vehicles
//! - `scheduler` - infinite Betting -> Preparing -> Running -> End loop
//! - `events`    - types published to the transport layer

pub mod events;
pub mod outcome;
pub mod round;
pub mod scheduler;
pub mod vehicle;
