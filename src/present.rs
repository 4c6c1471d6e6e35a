//! Presentation feed
//!
//! Everything an external renderer needs for one frame, packed into
//! GPU-ready plain-old-data. The core never draws; it only hands this over.

use std::time::Instant;

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Quat, Vec3};

use crate::consts::*;
use crate::net::RosterSnapshot;
use crate::sim::{Comet, DeformableShell, GameState, RoundStats, ViewBasis};

/// Window title shown once the session is running
pub const CLIENT_NAME: &str = "Cometfall";

/// Shell vertex with position and color
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ShellVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

/// Per-comet instance data
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct CometInstance {
    /// Translation, spin and uniform scale
    pub model: [[f32; 4]; 4],
    pub opacity: f32,
    /// 0 once the round has frozen the comet
    pub active: u32,
}

/// Occupied roster slot
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct PeerMarker {
    /// Planet-space position
    pub position: [f32; 3],
    pub slot: u32,
}

/// Full shell upload
#[derive(Debug, Clone, PartialEq)]
pub struct ShellBuffers {
    pub vertices: Vec<ShellVertex>,
    pub indices: Vec<u32>,
}

impl ShellBuffers {
    pub fn from_shell(shell: &DeformableShell) -> Self {
        let vertices = shell
            .vertices()
            .iter()
            .zip(shell.colors())
            .map(|(p, c)| ShellVertex {
                position: p.to_array(),
                color: c.to_array(),
            })
            .collect();
        Self {
            vertices,
            indices: shell.indices().to_vec(),
        }
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

/// One frame of presentation data
#[derive(Debug, Clone)]
pub struct FrameFeed {
    /// Present only when the shell changed since the last feed
    pub shell: Option<ShellBuffers>,
    pub comets: Vec<CometInstance>,
    pub peers: Vec<PeerMarker>,
    /// Local player in planet space
    pub player_position: Vec3,
    pub view: Mat4,
    pub title: String,
}

impl FrameFeed {
    /// Collect the frame, clearing the shell's dirty flag
    pub fn build(
        state: &mut GameState,
        basis: &ViewBasis,
        roster: &RosterSnapshot,
        now: Instant,
        elapsed_secs: f64,
    ) -> Self {
        let shell = state
            .shell
            .take_dirty()
            .then(|| ShellBuffers::from_shell(&state.shell));

        let t = state.time as f32;
        let comets = state
            .comets
            .comets()
            .iter()
            .map(|c| comet_instance(c, t))
            .collect();

        let peers = (0..MAX_PEERS)
            .filter(|&i| roster.roster.is_occupied(i))
            .map(|i| PeerMarker {
                position: (-roster.display_offset(i, now)).to_array(),
                slot: i as u32,
            })
            .collect();

        Self {
            shell,
            comets,
            peers,
            player_position: state.player.position(),
            view: view_matrix(basis, state.player.world_offset),
            title: status_title(
                &state.stats,
                &state.shell,
                elapsed_secs,
                state.is_round_over(),
            ),
        }
    }
}

/// Cumulative spin: Y below 100, then Z below 200, then X below 300
pub fn comet_spin(comet: &Comet, t: f32) -> Quat {
    let angle = comet.spin_angle(t);
    let mut spin = Quat::IDENTITY;
    if comet.rotation < 100.0 {
        spin *= Quat::from_rotation_y(angle);
    }
    if comet.rotation < 200.0 {
        spin *= Quat::from_rotation_z(angle);
    }
    if comet.rotation < 300.0 {
        spin *= Quat::from_rotation_x(angle);
    }
    spin
}

pub fn comet_instance(comet: &Comet, t: f32) -> CometInstance {
    let model = Mat4::from_scale_rotation_translation(
        Vec3::splat(comet.scale),
        comet_spin(comet, t),
        comet.position,
    );
    CometInstance {
        model: model.to_cols_array_2d(),
        opacity: comet.opacity(),
        active: u32::from(!comet.is_disabled()),
    }
}

/// Camera at the origin looking down `forward`, with the world shifted by
/// the player's offset
pub fn view_matrix(basis: &ViewBasis, world_offset: Vec3) -> Mat4 {
    let rotation = Mat3::from_cols(basis.right, basis.up, basis.forward).transpose();
    Mat4::from_mat3(rotation) * Mat4::from_translation(world_offset)
}

/// Running title: name, hits/popped, damage and minutes played
pub fn status_title(
    stats: &RoundStats,
    shell: &DeformableShell,
    elapsed_secs: f64,
    round_over: bool,
) -> String {
    let mins = elapsed_secs / 60.0;
    if round_over {
        format!(
            "{CLIENT_NAME} | {}/{} | 100% | {mins:.2} mins | GAME END",
            stats.hits, stats.popped
        )
    } else {
        format!(
            "{CLIENT_NAME} | {}/{} | {:.2}% | {mins:.2} mins",
            stats.hits,
            stats.popped,
            shell.damage_fraction() * 100.0
        )
    }
}
