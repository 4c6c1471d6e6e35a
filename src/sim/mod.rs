//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Epoch-seeded RNG only
//! - Stable iteration order (by comet index)
//! - No rendering, network or platform dependencies

pub mod clock;
pub mod comet;
pub mod player;
pub mod rng;
pub mod shell;
pub mod state;
pub mod tick;

pub use clock::{
    FrameScheduler, SimulationClock, SystemClock, TimeSource, WaitStatus, next_epoch_boundary,
    resolve_epoch, unix_now, validate_epoch, wait_for_epoch,
};
pub use comet::{Comet, CometField, CometPhase, CometTickReport, ImpactTargets};
pub use player::{PlayerInput, PlayerState, ViewBasis};
pub use rng::{RandomSource, SequenceRng, WorldRng};
pub use shell::{DeformableShell, ImpactReport};
pub use state::{GameState, RoundStats};
pub use tick::{TickInput, TickReport, tick};
