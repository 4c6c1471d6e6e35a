//! Peer roster and the cross-thread hand-off
//!
//! The peer sync worker builds a new immutable [`RosterSnapshot`] for every
//! accepted response and swaps it into a [`SharedRoster`]. The simulation
//! thread only ever clones the current `Arc`, so it always sees a whole
//! roster and never waits on the network.

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use glam::Vec3;

use super::wire::parse_roster;
use crate::consts::*;

/// Below this a peer is considered stationary
const MIN_PEER_STEP: f32 = 0.0001;

/// Fixed-capacity table of peer world offsets (zero = empty slot)
///
/// Slots hold what peers transmit: their world offset, so the peer itself is
/// at the negated value in planet space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeerRoster {
    slots: [Vec3; MAX_PEERS],
}

impl Default for PeerRoster {
    fn default() -> Self {
        Self {
            slots: [Vec3::ZERO; MAX_PEERS],
        }
    }
}

impl PeerRoster {
    /// Overwrite the leading slots with a server response
    ///
    /// Returns false (and changes nothing) for a badly framed body. Slots past
    /// the end of the response keep their previous values.
    pub fn apply_response(&mut self, body: &[u8]) -> bool {
        let Some(peers) = parse_roster(body) else {
            return false;
        };
        for (slot, peer) in self.slots.iter_mut().zip(peers) {
            *slot = peer;
        }
        true
    }

    pub fn slots(&self) -> &[Vec3; MAX_PEERS] {
        &self.slots
    }

    pub fn set_slot(&mut self, index: usize, offset: Vec3) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = offset;
        }
    }

    pub fn is_occupied(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(|s| *s != Vec3::ZERO)
    }

    /// Number of slots holding a peer
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| **s != Vec3::ZERO).count()
    }
}

/// Extrapolation side-table captured with a roster update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeerMotion {
    /// Predicted per-slot movement over one round trip
    pub steps: [Vec3; MAX_PEERS],
    pub received_at: Instant,
    /// Measured round trip of the request that produced this update
    pub latency: Duration,
}

impl PeerMotion {
    /// Infer each peer's continued motion from two consecutive rosters
    ///
    /// Peers that just appeared or left get no motion.
    pub fn infer(
        previous: &PeerRoster,
        current: &PeerRoster,
        received_at: Instant,
        latency: Duration,
    ) -> Self {
        let mut steps = [Vec3::ZERO; MAX_PEERS];
        for (i, step) in steps.iter_mut().enumerate() {
            let (prev, next) = (previous.slots[i], current.slots[i]);
            if prev == Vec3::ZERO || next == Vec3::ZERO {
                continue;
            }
            let delta = next - prev;
            if delta.length() > MIN_PEER_STEP {
                *step = delta;
            }
        }
        Self {
            steps,
            received_at,
            latency,
        }
    }

    /// Share of the predicted step to apply at `now`, ramping 0 -> 1 until
    /// the next update is due and then holding
    pub fn blend(&self, now: Instant) -> f32 {
        let latency = self.latency.as_secs_f32();
        if latency <= 0.0 {
            return 1.0;
        }
        let expiry = self.received_at + self.latency;
        let remaining = expiry.saturating_duration_since(now).as_secs_f32();
        (1.0 - remaining / latency).clamp(0.0, 1.0)
    }
}

/// One published roster state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RosterSnapshot {
    pub roster: PeerRoster,
    /// Present only when extrapolation is on
    pub motion: Option<PeerMotion>,
    /// Incremented per accepted response
    pub version: u64,
}

impl RosterSnapshot {
    /// Displayed world offset of a slot at `now`
    pub fn display_offset(&self, index: usize, now: Instant) -> Vec3 {
        let Some(&reported) = self.roster.slots.get(index) else {
            return Vec3::ZERO;
        };
        match &self.motion {
            Some(motion) if reported != Vec3::ZERO => {
                reported + motion.steps[index] * motion.blend(now)
            }
            _ => reported,
        }
    }

    /// Planet-space positions of every occupied slot at `now`
    pub fn peer_positions(&self, now: Instant) -> Vec<Vec3> {
        (0..MAX_PEERS)
            .filter(|&i| self.roster.is_occupied(i))
            .map(|i| -self.display_offset(i, now))
            .collect()
    }

    pub fn occupied(&self) -> usize {
        self.roster.occupied()
    }
}

/// Atomically swapped roster snapshot shared between threads
#[derive(Debug, Clone, Default)]
pub struct SharedRoster {
    inner: Arc<RwLock<Arc<RosterSnapshot>>>,
}

impl SharedRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest complete snapshot; never blocks on a network call
    pub fn snapshot(&self) -> Arc<RosterSnapshot> {
        Arc::clone(&self.inner.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace the current snapshot
    pub fn publish(&self, snapshot: RosterSnapshot) {
        let next = Arc::new(snapshot);
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

/// Local world offset handed from the simulation to the sync worker
#[derive(Debug, Clone, Default)]
pub struct SharedPosition {
    inner: Arc<Mutex<Vec3>>,
}

impl SharedPosition {
    pub fn new(initial: Vec3) -> Self {
        Self {
            inner: Arc::new(Mutex::new(initial)),
        }
    }

    pub fn set(&self, offset: Vec3) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = offset;
    }

    pub fn get(&self) -> Vec3 {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
