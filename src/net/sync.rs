//! Peer sync worker
//!
//! Runs on its own thread, exchanging the local world offset for the room
//! roster over and over. Failures are logged at debug and dropped; the only
//! output is a new [`RosterSnapshot`] after each accepted response.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use super::roster::{PeerMotion, PeerRoster, RosterSnapshot, SharedPosition, SharedRoster};
use super::transport::Transport;
use crate::error::StartupError;
use crate::settings::Settings;

/// Request pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Issue requests back to back, never closer than `min_spacing`
    BackToBack { min_spacing: Duration },
    /// High-latency mode: one request per `period`
    Interval { period: Duration },
}

impl Cadence {
    pub fn from_settings(settings: &Settings) -> Self {
        match settings.high_ping_interval_ms {
            Some(ms) if settings.high_ping() => Cadence::Interval {
                period: Duration::from_millis(ms),
            },
            _ => Cadence::BackToBack {
                min_spacing: Duration::from_millis(settings.min_update_spacing_ms),
            },
        }
    }

    /// Whether a new request is due given the time since the last one started
    pub fn should_issue(&self, since_last: Option<Duration>) -> bool {
        match (self, since_last) {
            (_, None) => true,
            (Cadence::BackToBack { .. }, Some(_)) => true,
            (Cadence::Interval { period }, Some(elapsed)) => elapsed >= *period,
        }
    }

    /// Sleep before the next attempt, given how long the last request took
    pub fn pause_after(&self, request_time: Duration) -> Duration {
        match self {
            Cadence::BackToBack { min_spacing } => min_spacing.saturating_sub(request_time),
            Cadence::Interval { period } => *period,
        }
    }
}

/// Result of one exchange attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A new snapshot was published
    Updated,
    /// Response had the wrong framing; roster unchanged
    Ignored,
    /// Request failed; roster unchanged
    Failed,
    /// Not due yet under the current cadence
    Skipped,
}

/// Handles the simulation thread keeps to talk to a running worker
#[derive(Debug, Clone)]
pub struct SyncLink {
    pub roster: SharedRoster,
    pub position: SharedPosition,
    stop: Arc<AtomicBool>,
}

impl SyncLink {
    /// Ask the worker to exit after its current request
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

/// Position exchange loop for one client in one room
pub struct PeerSync<T: Transport> {
    transport: T,
    room: u64,
    uid: u16,
    cadence: Cadence,
    extrapolate: bool,
    link: SyncLink,
    roster: PeerRoster,
    version: u64,
    last_issue: Option<Instant>,
}

impl<T: Transport> PeerSync<T> {
    pub fn new(transport: T, room: u64, uid: u16, settings: &Settings) -> Self {
        let link = SyncLink {
            roster: SharedRoster::new(),
            position: SharedPosition::default(),
            stop: Arc::new(AtomicBool::new(false)),
        };
        Self {
            transport,
            room,
            uid,
            cadence: Cadence::from_settings(settings),
            extrapolate: settings.extrapolation,
            link,
            roster: PeerRoster::default(),
            version: 0,
            last_issue: None,
        }
    }

    pub fn link(&self) -> SyncLink {
        self.link.clone()
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    /// Announce this client before the epoch
    ///
    /// Failure only means peers see us a little later, so it is logged and
    /// the session carries on.
    pub fn register(&mut self, timeout: Duration) -> bool {
        match self.transport.register(self.room, self.uid, timeout) {
            Ok(()) => {
                info!("Registered uid {} in room {}", self.uid, self.room);
                true
            }
            Err(e) => {
                warn!("Registration failed, continuing unannounced: {e}");
                false
            }
        }
    }

    /// One request/response cycle if the cadence allows it
    pub fn run_once(&mut self) -> SyncOutcome {
        let started = Instant::now();
        if !self
            .cadence
            .should_issue(self.last_issue.map(|t| started.duration_since(t)))
        {
            return SyncOutcome::Skipped;
        }
        self.last_issue = Some(started);

        let position = self.link.position.get();
        let body = match self.transport.exchange(self.room, self.uid, position) {
            Ok(body) => body,
            Err(e) => {
                debug!("Peer exchange failed: {e}");
                return SyncOutcome::Failed;
            }
        };
        let received_at = Instant::now();

        let previous = self.roster;
        if !self.roster.apply_response(&body) {
            debug!("Ignoring roster response of {} bytes", body.len());
            return SyncOutcome::Ignored;
        }

        let motion = self.extrapolate.then(|| {
            PeerMotion::infer(
                &previous,
                &self.roster,
                received_at,
                received_at.duration_since(started),
            )
        });
        self.version += 1;
        self.link.roster.publish(RosterSnapshot {
            roster: self.roster,
            motion,
            version: self.version,
        });
        SyncOutcome::Updated
    }

    /// Loop until the stop flag is raised
    pub fn run(mut self) {
        while !self.link.is_stopped() {
            let started = Instant::now();
            let outcome = self.run_once();
            let pause = match outcome {
                SyncOutcome::Skipped => self.cadence.pause_after(Duration::ZERO),
                _ => self.cadence.pause_after(started.elapsed()),
            };
            if !pause.is_zero() {
                std::thread::sleep(pause);
            }
        }
        debug!("Peer sync stopped after {} updates", self.version);
    }
}

impl<T: Transport + 'static> PeerSync<T> {
    /// Move the loop onto a named worker thread
    pub fn spawn(self) -> Result<(SyncLink, JoinHandle<()>), StartupError> {
        let link = self.link();
        let handle = std::thread::Builder::new()
            .name("peer-sync".to_string())
            .spawn(move || self.run())
            .map_err(StartupError::Worker)?;
        Ok((link, handle))
    }
}
