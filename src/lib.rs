//! Cometfall - an epoch-locked multiplayer comet defence client
//!
//! Core modules:
//! - `sim`: Deterministic simulation (clock, player, comets, planet shell)
//! - `net`: Peer position exchange over stateless HTTP
//! - `present`: Presentation feed consumed by an external renderer
//! - `settings`: Client configuration
//! - `error`: Startup, network and mesh errors

pub mod error;
pub mod net;
pub mod present;
pub mod settings;
pub mod sim;

pub use error::{MeshError, NetError, StartupError};
pub use settings::Settings;

use glam::Vec3;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation rate shared by every client
    pub const TICK_RATE: f64 = 60.0;
    /// Nominal fixed timestep (seconds)
    pub const TICK_DT: f32 = 1.0 / 60.0;

    /// Distance from planet center at which anything collides with the shell
    pub const SHELL_COLLISION_RADIUS: f32 = 1.14;
    /// Radius of the generated crust before settling
    pub const SHELL_BASE_RADIUS: f32 = 1.10;
    /// Shell vertices are pushed out by this factor after load
    pub const SHELL_INFLATE: f32 = 1.03;
    /// Per-channel color loss on each impact
    pub const SHELL_DARKEN: f32 = 0.2;
    /// Single-impact displacement above which a vertex counts as damaged
    pub const SHELL_DAMAGE_THRESHOLD: f32 = 0.03;

    /// Comet pool size
    pub const NUM_COMETS: usize = 64;
    /// Radius of the spawn sphere
    pub const COMET_SPAWN_RADIUS: f32 = 10.0;
    /// Maximum extra spawn distance along the inverse direction
    pub const COMET_SPAWN_STAGGER: f32 = 6.0;
    pub const COMET_MIN_SPEED: f32 = 0.16;
    pub const COMET_SPEED_RANGE: f32 = 0.08;
    pub const COMET_MIN_SCALE: f32 = 0.01;
    pub const COMET_SCALE_RANGE: f32 = 0.07;
    /// Upper bound of the cosmetic spin seed
    pub const COMET_ROTATION_RANGE: f32 = 300.0;
    /// Added to a comet's scale when testing against a player
    pub const PLAYER_HIT_RADIUS: f32 = 0.06;
    /// Explosion fade rate (per second)
    pub const EXPLOSION_FADE_RATE: f32 = 0.3;
    /// Explosion shrink rate (per second)
    pub const EXPLOSION_SHRINK_RATE: f32 = 0.03;
    /// How far a comet is pushed into the crater on planet impact
    pub const IMPACT_PENETRATION: f32 = 0.03;

    /// Player acceleration (units/s^2 per held key)
    pub const MOVE_SPEED: f32 = 0.5;
    /// Velocity kept after bouncing off the shell
    pub const BOUNCE_DAMPING: f32 = 0.3;
    /// Brake damping factor (scaled by `1 - dt`)
    pub const BRAKE_DAMPING: f32 = 0.99;
    /// Starting world offset (viewer sits 2.3 units from planet center)
    pub const PLAYER_START_OFFSET: [f32; 3] = [0.0, 0.0, -2.3];
    /// Below this distance roll is assisted toward the horizon
    pub const SELF_RIGHTING_RADIUS: f32 = 2.0;
    /// Mouse / roll sensitivity
    pub const LOOK_SENSITIVITY: f32 = 0.001;

    /// Peer roster capacity (server admits 32 clients, we never see ourselves)
    pub const MAX_PEERS: usize = 31;
    /// One peer position on the wire: three little-endian f32
    pub const POSITION_BYTES: usize = 12;
    /// Largest accepted roster response
    pub const MAX_ROSTER_BYTES: usize = MAX_PEERS * POSITION_BYTES;

    /// Epoch gate polling interval (milliseconds)
    pub const EPOCH_POLL_MS: u64 = 1;
    /// User supplied epochs must start at least this far in the future
    pub const MIN_EPOCH_LEAD_SECS: u64 = 3;
    /// Default epochs are aligned to this boundary
    pub const EPOCH_ALIGNMENT_SECS: u64 = 180;
}

/// Reflect a vector off a surface with the given unit normal
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect(v: Vec3, normal: Vec3) -> Vec3 {
    v - 2.0 * v.dot(normal) * normal
}

/// Map two uniform samples in [0, 1) onto the unit sphere
///
/// Uses the cylindrical equal-area projection, so every sample pair yields a
/// point and no draws are wasted on rejection.
#[inline]
pub fn unit_sphere_point(u: f32, v: f32) -> Vec3 {
    let z = 1.0 - 2.0 * u;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = std::f32::consts::TAU * v;
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}
