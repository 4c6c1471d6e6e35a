//! Local player kinematics
//!
//! The viewer stays at the origin and the universe is translated instead, so
//! the player's state is a world offset: the player's actual position in
//! planet space is `-world_offset`. Keeping the camera at the origin avoids
//! precision loss in the view transform far from the planet.

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::reflect;

/// Orientation feed from the camera: right, up and forward axes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBasis {
    pub right: Vec3,
    pub up: Vec3,
    pub forward: Vec3,
}

impl Default for ViewBasis {
    fn default() -> Self {
        Self {
            right: Vec3::X,
            up: Vec3::Y,
            forward: Vec3::Z,
        }
    }
}

impl ViewBasis {
    /// Apply mouse look (yaw/pitch) and roll, then re-orthonormalize
    pub fn rotate(&mut self, yaw: f32, pitch: f32, roll: f32) {
        // Yaw about up, pitch about right
        self.right = Quat::from_axis_angle(self.up, yaw) * self.right;
        self.up = Quat::from_axis_angle(self.right, pitch) * self.up;
        self.forward = self.right.cross(self.up);
        self.up = self.forward.cross(self.right);

        // Roll about forward
        self.right = Quat::from_axis_angle(self.forward, roll) * self.right;
        self.up = self.forward.cross(self.right);

        self.right = self.right.normalize();
        self.up = self.up.normalize();
        self.forward = self.forward.normalize();
    }

    /// Turn by a tick's mouse delta and the player's current roll
    pub fn steer(&mut self, look: Vec2, roll: f32) {
        self.rotate(look.x * LOOK_SENSITIVITY, look.y * LOOK_SENSITIVITY, roll);
    }
}

/// Held inputs for a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerInput {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub roll_left: bool,
    pub roll_right: bool,
    pub brake: bool,
    /// Mouse delta in pixels since last tick
    pub look: Vec2,
}

/// Local player state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    /// Translation applied to the world (player sits at `-world_offset`)
    pub world_offset: Vec3,
    /// Velocity of the world offset
    pub velocity: Vec3,
    /// Current roll rate fed back to the camera
    pub roll: f32,
    pub brake_active: bool,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            world_offset: Vec3::from_array(PLAYER_START_OFFSET),
            velocity: Vec3::ZERO,
            roll: 0.0,
            brake_active: false,
        }
    }
}

impl PlayerState {
    /// The player's position in planet space
    pub fn position(&self) -> Vec3 {
        -self.world_offset
    }

    /// Distance from planet center, the only collision predicate
    pub fn altitude(&self) -> f32 {
        self.world_offset.length()
    }

    /// Advance one tick: thrust, brake, integrate, roll, then shell collision
    ///
    /// Returns true if the player bounced off the shell this tick.
    pub fn step(&mut self, input: &PlayerInput, basis: &ViewBasis, dt: f32) -> bool {
        self.apply_thrust(input, basis, dt);

        self.brake_active = input.brake;
        if self.brake_active {
            self.velocity *= BRAKE_DAMPING * (1.0 - dt);
        }

        self.world_offset += self.velocity * dt;

        let altitude = self.altitude();
        if altitude < SELF_RIGHTING_RADIUS {
            self.self_right(basis, altitude, dt);
        } else {
            self.update_roll(input, dt);
        }

        self.resolve_shell_collision()
    }

    fn apply_thrust(&mut self, input: &PlayerInput, basis: &ViewBasis, dt: f32) {
        let accel = MOVE_SPEED * dt;
        if input.forward {
            self.velocity += basis.forward * accel;
        } else if input.back {
            self.velocity -= basis.forward * accel;
        }
        if input.left {
            self.velocity += basis.right * accel;
        } else if input.right {
            self.velocity -= basis.right * accel;
        }
        if input.up {
            self.velocity -= basis.up * accel;
        } else if input.down {
            self.velocity += basis.up * accel;
        }
    }

    /// Nudge roll so the right axis lies along the horizon
    ///
    /// Cosmetic only; never touches the world offset.
    fn self_right(&mut self, basis: &ViewBasis, altitude: f32, dt: f32) {
        let outward = (-self.world_offset).normalize_or_zero();
        let tilt = basis.right.dot(outward);
        if tilt.abs() > 0.03 {
            // Full strength at the shell, fading to zero at the righting radius
            let band = SELF_RIGHTING_RADIUS - SHELL_COLLISION_RADIUS;
            let falloff = 1.0 - (altitude - SHELL_COLLISION_RADIUS) / band;
            self.roll -= tilt * 0.03 * falloff * dt;
        } else {
            self.roll = 0.0;
        }
    }

    fn update_roll(&mut self, input: &PlayerInput, dt: f32) {
        let step = dt * LOOK_SENSITIVITY * 10.0;
        if self.brake_active {
            self.roll *= BRAKE_DAMPING * (1.0 - dt);
        }

        match (input.roll_left, input.roll_right) {
            (true, false) => {
                if self.roll <= 0.0 {
                    self.roll *= 1.0 - dt * 0.02;
                }
                self.roll += step;
            }
            (false, true) => {
                if self.roll >= 0.0 {
                    self.roll *= 1.0 - dt * 0.02;
                }
                self.roll -= step;
            }
            (true, true) => self.roll = 0.0,
            (false, false) => {
                if self.roll.abs() > 0.09 {
                    self.roll *= 1.0 - dt * 0.91;
                } else if self.roll > 0.001 {
                    self.roll -= 0.001 * dt;
                } else if self.roll < -0.001 {
                    self.roll += 0.001 * dt;
                } else {
                    self.roll = 0.0;
                }
            }
        }
    }

    /// Single corrective step keeping the player outside the shell
    ///
    /// The velocity is reflected (only if it still points inward), damped,
    /// and the player is pushed back out to exactly the collision radius.
    pub fn resolve_shell_collision(&mut self) -> bool {
        let altitude = self.altitude();
        if altitude >= SHELL_COLLISION_RADIUS {
            return false;
        }

        let normal = self.world_offset.normalize_or(Vec3::NEG_Z);
        if self.velocity.dot(normal) < 0.0 {
            self.velocity = reflect(self.velocity, -normal);
        }
        self.velocity *= BOUNCE_DAMPING;

        // Re-project instead of adding the shortfall so rounding can't leave us inside
        self.world_offset = normal * SHELL_COLLISION_RADIUS;
        true
    }
}
