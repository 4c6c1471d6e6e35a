//! Fixed timestep simulation tick
//!
//! One update in the order every client uses: player integration and shell
//! collision first, then comet physics against the shell, the player and the
//! latest peer snapshot.

use glam::Vec3;

use super::comet::{CometTickReport, ImpactTargets};
use super::player::{PlayerInput, ViewBasis};
use super::state::GameState;

/// Inputs for a single tick
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    pub player: PlayerInput,
    /// Camera orientation at the start of the tick
    pub basis: ViewBasis,
}

/// What happened during a tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// The player bounced off the shell
    pub bounced: bool,
    pub comets: CometTickReport,
}

/// Advance the game state by one frame
///
/// `peers` are the occupied roster positions in planet space, read from the
/// most recent snapshot (possibly stale).
pub fn tick(state: &mut GameState, input: &TickInput, peers: &[Vec3], dt: f32) -> TickReport {
    state.time_ticks += 1;
    state.time += f64::from(dt);

    let bounced = state.player.step(&input.player, &input.basis, dt);

    let mut targets = ImpactTargets {
        shell: &mut state.shell,
        player: state.player.position(),
        peers,
    };
    let comets = state.comets.step(dt, &mut targets, &mut state.rng);
    state.stats.record(&comets);

    TickReport { bounced, comets }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::sim::shell::DeformableShell;

    fn new_state(epoch: u64) -> GameState {
        GameState::new(epoch, DeformableShell::icosphere(2))
    }

    #[test]
    fn test_tick_advances_time() {
        let mut state = new_state(1000);
        tick(&mut state, &TickInput::default(), &[], TICK_DT);
        tick(&mut state, &TickInput::default(), &[], TICK_DT);
        assert_eq!(state.time_ticks, 2);
        assert!((state.time - 2.0 * f64::from(TICK_DT)).abs() < 1e-9);
    }

    #[test]
    fn test_determinism() {
        // Two clients with the same epoch and inputs stay in lockstep
        let mut a = new_state(1_700_000_040);
        let mut b = new_state(1_700_000_040);

        let inputs = [
            TickInput::default(),
            TickInput {
                player: PlayerInput {
                    forward: true,
                    ..Default::default()
                },
                ..Default::default()
            },
            TickInput {
                player: PlayerInput {
                    brake: true,
                    ..Default::default()
                },
                ..Default::default()
            },
        ];

        for i in 0..600 {
            let input = &inputs[i % inputs.len()];
            let ra = tick(&mut a, input, &[], TICK_DT);
            let rb = tick(&mut b, input, &[], TICK_DT);
            assert_eq!(ra, rb);
        }

        assert_eq!(a.comets.comets(), b.comets.comets());
        assert_eq!(a.shell.vertices(), b.shell.vertices());
        assert_eq!(a.stats, b.stats);
        assert_eq!(a.player.world_offset, b.player.world_offset);
    }

    #[test]
    fn test_player_never_ends_tick_inside_shell() {
        let mut state = new_state(5);
        let input = TickInput {
            player: PlayerInput {
                forward: true,
                ..Default::default()
            },
            ..Default::default()
        };
        // Default basis thrusts the world offset toward +Z, i.e. into the planet
        for _ in 0..2000 {
            tick(&mut state, &input, &[], TICK_DT);
            assert!(state.player.altitude() >= SHELL_COLLISION_RADIUS - 1e-5);
        }
    }

    #[test]
    fn test_peer_positions_pop_comets() {
        let mut state = new_state(77);
        // Put a peer right on top of every comet
        let peers: Vec<Vec3> = state.comets.comets().iter().map(|c| c.position).collect();
        let report = tick(&mut state, &TickInput::default(), &peers, 0.0);
        assert!(report.comets.peer_hits > 0);
        assert_eq!(state.stats.peer_pops, report.comets.peer_hits);
    }
}
