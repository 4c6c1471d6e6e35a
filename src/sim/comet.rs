//! Comet pool and lifecycle
//!
//! A fixed arena of comets that recycle in place:
//! Approaching -> Exploding -> (respawn) Approaching, until the round ends and
//! every comet is frozen as Disabled.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::rng::RandomSource;
use super::shell::DeformableShell;
use crate::consts::*;
use crate::unit_sphere_point;

/// Lifecycle state of a comet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CometPhase {
    /// Travelling toward the planet
    Approaching { speed: f32 },
    /// Fading debris; respawns when `fade` or the scale runs out
    Exploding { fade: f32 },
    /// Frozen after the round ended
    Disabled,
}

/// A single comet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Comet {
    pub position: Vec3,
    /// Unit travel direction, fixed at spawn
    pub direction: Vec3,
    /// Cosmetic spin seed in [0, 300)
    pub rotation: f32,
    pub scale: f32,
    pub phase: CometPhase,
}

impl Comet {
    /// Draw a fresh comet on the spawn sphere aimed at the planet
    ///
    /// Consumes exactly eight samples, always in the same order, so every
    /// client sharing a seed spawns the same wave.
    pub fn spawn<R: RandomSource + ?Sized>(rng: &mut R) -> Self {
        let origin = unit_sphere_point(rng.unit(), rng.unit()) * COMET_SPAWN_RADIUS;
        let aim = unit_sphere_point(rng.unit(), rng.unit());
        let direction = (aim - origin).normalize();

        // Stagger arrivals by pulling the comet back along its path
        let position = origin - direction * (rng.unit() * COMET_SPAWN_STAGGER);

        let rotation = rng.unit() * COMET_ROTATION_RANGE;
        let scale = COMET_MIN_SCALE + rng.unit() * COMET_SCALE_RANGE;
        let speed = COMET_MIN_SPEED + rng.unit() * COMET_SPEED_RANGE;

        Self {
            position,
            direction,
            rotation,
            scale,
            phase: CometPhase::Approaching { speed },
        }
    }

    pub fn is_approaching(&self) -> bool {
        matches!(self.phase, CometPhase::Approaching { .. })
    }

    pub fn is_exploding(&self) -> bool {
        matches!(self.phase, CometPhase::Exploding { .. })
    }

    pub fn is_disabled(&self) -> bool {
        self.phase == CometPhase::Disabled
    }

    /// Explosion opacity (1.0 while intact)
    pub fn opacity(&self) -> f32 {
        match self.phase {
            CometPhase::Exploding { fade } => fade.clamp(0.0, 1.0),
            _ => 1.0,
        }
    }

    /// Crater radius of a planet impact at `speed`
    pub fn blast_radius(&self, speed: f32) -> f32 {
        (self.scale + speed * 0.1) * 1.2
    }

    /// Visual spin angle at session time `t`
    pub fn spin_angle(&self, t: f32) -> f32 {
        self.rotation * 0.01 * t
    }

    /// Start exploding; only an approaching comet can be hit
    fn explode(&mut self) -> bool {
        if self.is_approaching() {
            self.phase = CometPhase::Exploding { fade: 1.0 };
            true
        } else {
            false
        }
    }

    fn touches(&self, point: Vec3) -> bool {
        let reach = self.scale + PLAYER_HIT_RADIUS;
        self.position.distance_squared(point) < reach * reach
    }
}

/// What a comet can hit this tick
pub struct ImpactTargets<'a> {
    pub shell: &'a mut DeformableShell,
    /// Local player position in planet space
    pub player: Vec3,
    /// Occupied peer positions in planet space
    pub peers: &'a [Vec3],
}

/// Per-tick summary of comet events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CometTickReport {
    pub planet_hits: u32,
    pub player_hits: u32,
    pub peer_hits: u32,
    pub comet_collisions: u32,
    pub respawned: u32,
    /// Set on the tick the shell crossed the damage limit
    pub round_ended: bool,
}

/// Fixed-size comet arena
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CometField {
    #[serde(with = "serde_comets")]
    comets: [Comet; NUM_COMETS],
    round_over: bool,
}

impl CometField {
    /// Spawn a full pool in index order
    pub fn new<R: RandomSource + ?Sized>(rng: &mut R) -> Self {
        Self {
            comets: std::array::from_fn(|_| Comet::spawn(rng)),
            round_over: false,
        }
    }

    pub fn comets(&self) -> &[Comet] {
        &self.comets
    }

    pub fn comets_mut(&mut self) -> &mut [Comet] {
        &mut self.comets
    }

    pub fn is_round_over(&self) -> bool {
        self.round_over
    }

    /// Count of comets still flying
    pub fn approaching(&self) -> usize {
        self.comets.iter().filter(|c| c.is_approaching()).count()
    }

    /// Advance every comet by `dt`, resolving impacts in index order
    pub fn step<R: RandomSource + ?Sized>(
        &mut self,
        dt: f32,
        targets: &mut ImpactTargets<'_>,
        rng: &mut R,
    ) -> CometTickReport {
        let mut report = CometTickReport::default();
        if self.round_over {
            return report;
        }

        for i in 0..NUM_COMETS {
            match self.comets[i].phase {
                CometPhase::Disabled => continue,
                CometPhase::Exploding { fade } => {
                    let fade = fade - EXPLOSION_FADE_RATE * dt;
                    let comet = &mut self.comets[i];
                    comet.scale -= EXPLOSION_SHRINK_RATE * dt;
                    comet.phase = CometPhase::Exploding { fade };
                    if fade <= 0.0 || comet.scale <= 0.0 {
                        *comet = Comet::spawn(rng);
                        report.respawned += 1;
                    }
                }
                CometPhase::Approaching { speed } => {
                    self.advance(i, speed, dt, targets, &mut report);
                    if report.round_ended {
                        return report;
                    }
                }
            }
        }

        report
    }

    fn advance(
        &mut self,
        i: usize,
        speed: f32,
        dt: f32,
        targets: &mut ImpactTargets<'_>,
        report: &mut CometTickReport,
    ) {
        let comet = &mut self.comets[i];
        comet.position += comet.direction * (speed * dt);

        // Planet impact
        if comet.position.length() < SHELL_COLLISION_RADIUS {
            let blast = comet.blast_radius(speed);
            targets.shell.apply_impact(comet.position, blast);
            comet.position += comet.direction * IMPACT_PENETRATION;
            comet.explode();
            comet.scale *= 2.0;
            report.planet_hits += 1;

            if targets.shell.is_destroyed() {
                self.end_round();
                report.round_ended = true;
            }
            return;
        }

        // Local player
        if comet.touches(targets.player) && comet.explode() {
            report.player_hits += 1;
        }

        // Other comets, mutual kill
        let position = self.comets[i].position;
        let reach = self.comets[i].scale;
        for k in 0..NUM_COMETS {
            if k == i || self.comets[k].is_disabled() {
                continue;
            }
            if self.comets[k].position.distance_squared(position) < reach * reach {
                let hit_self = self.comets[i].explode();
                let hit_other = self.comets[k].explode();
                if hit_self || hit_other {
                    report.comet_collisions += 1;
                }
            }
        }

        // Peers
        let comet = &mut self.comets[i];
        if comet.is_approaching() && targets.peers.iter().any(|&p| comet.touches(p)) {
            comet.explode();
            report.peer_hits += 1;
        }
    }

    /// Freeze the whole battlefield
    pub fn end_round(&mut self) {
        if !self.round_over {
            log::info!("Round over: shell damage limit reached");
        }
        self.round_over = true;
        for comet in &mut self.comets {
            comet.phase = CometPhase::Disabled;
            comet.rotation = 0.0;
        }
    }
}

/// Serde support for the fixed comet array
mod serde_comets {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{Comet, NUM_COMETS};

    pub fn serialize<S: Serializer>(comets: &[Comet; NUM_COMETS], s: S) -> Result<S::Ok, S::Error> {
        comets.as_slice().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[Comet; NUM_COMETS], D::Error> {
        let comets = Vec::<Comet>::deserialize(d)?;
        let len = comets.len();
        comets
            .try_into()
            .map_err(|_| D::Error::invalid_length(len, &"a full comet pool"))
    }
}
