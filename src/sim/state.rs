//! Game state and round bookkeeping
//!
//! Everything a client needs to reproduce the shared world lives here: the
//! epoch-seeded RNG, the comet pool and the planet shell. The local player is
//! the only part that differs between clients.

use serde::{Deserialize, Serialize};

use super::clock::SimulationClock;
use super::comet::{CometField, CometTickReport};
use super::player::PlayerState;
use super::rng::WorldRng;
use super::shell::DeformableShell;

/// Running score for the local client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundStats {
    /// Comets that struck the planet
    pub hits: u32,
    /// Comets popped by the local player
    pub popped: u32,
    /// Comets popped by peers (as seen locally)
    pub peer_pops: u32,
}

impl RoundStats {
    pub fn record(&mut self, report: &CometTickReport) {
        self.hits += report.planet_hits;
        self.popped += report.player_hits;
        self.peer_pops += report.peer_hits;
    }
}

/// Complete simulation state for one client
#[derive(Debug, Clone)]
pub struct GameState {
    /// Shared origin epoch; also the RNG seed
    pub origin_epoch: u64,
    pub rng: WorldRng,
    pub player: PlayerState,
    pub comets: CometField,
    pub shell: DeformableShell,
    pub stats: RoundStats,
    /// Seconds simulated since the epoch
    pub time: f64,
    pub time_ticks: u64,
}

impl GameState {
    /// Seed the world from the epoch and spawn the opening wave
    pub fn new(origin_epoch: u64, shell: DeformableShell) -> Self {
        Self::with_rng(origin_epoch, WorldRng::from_epoch(origin_epoch), shell)
    }

    /// Build the world on the clock's shared generator
    pub fn from_clock(clock: &SimulationClock, shell: DeformableShell) -> Self {
        Self::with_rng(clock.origin_epoch(), clock.seed_rng(), shell)
    }

    fn with_rng(origin_epoch: u64, mut rng: WorldRng, shell: DeformableShell) -> Self {
        let comets = CometField::new(&mut rng);
        Self {
            origin_epoch,
            rng,
            player: PlayerState::default(),
            comets,
            shell,
            stats: RoundStats::default(),
            time: 0.0,
            time_ticks: 0,
        }
    }

    pub fn is_round_over(&self) -> bool {
        self.comets.is_round_over()
    }
}
