//! Epoch-locked simulation clock
//!
//! Every client blocks until the shared origin epoch, then runs one update
//! per frame at a fixed 60 Hz budget. Overrunning frames shrink the next wait
//! rather than queueing extra ticks, so ordering is never disturbed.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::rng::WorldRng;
use crate::consts::*;
use crate::error::StartupError;

/// Wall-clock access, injectable for tests
pub trait TimeSource {
    /// Seconds since the unix epoch
    fn unix_time(&self) -> f64;
    fn sleep(&self, duration: Duration);
}

/// The real system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn unix_time(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Current unix time in whole seconds
pub fn unix_now() -> Result<u64, StartupError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| StartupError::Clock)
}

/// Next aligned session boundary after `now` (every three minutes)
pub fn next_epoch_boundary(now: u64) -> u64 {
    (now / EPOCH_ALIGNMENT_SECS + 1) * EPOCH_ALIGNMENT_SECS
}

/// Reject epochs that leave too little time to gather peers
pub fn validate_epoch(epoch: u64, now: u64) -> Result<u64, StartupError> {
    if epoch < now + MIN_EPOCH_LEAD_SECS {
        return Err(StartupError::EpochTooSoon {
            epoch,
            suggested: now + 16,
        });
    }
    Ok(epoch)
}

/// Epoch to start on: a requested one (validated), or the next boundary
///
/// A requested epoch of 0 means "no preference".
pub fn resolve_epoch(requested: Option<u64>, now: u64) -> Result<u64, StartupError> {
    match requested {
        None | Some(0) => Ok(next_epoch_boundary(now)),
        Some(epoch) => validate_epoch(epoch, now),
    }
}

/// Progress report while waiting for the epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitStatus {
    pub remaining_secs: u64,
    /// Peers already transmitting, plus ourselves
    pub players_waiting: usize,
}

impl WaitStatus {
    pub fn title(&self) -> String {
        format!(
            "Please wait... {} seconds. Total players waiting {}.",
            self.remaining_secs, self.players_waiting
        )
    }
}

/// Block until wall-clock time reaches `origin_epoch`
///
/// Polls every `poll` and reports progress after each sleep. `waiting_peers`
/// should count occupied roster slots. Returns the unix time at release.
pub fn wait_for_epoch<T, P, S>(
    time: &T,
    origin_epoch: u64,
    poll: Duration,
    waiting_peers: P,
    mut status: S,
) -> f64
where
    T: TimeSource + ?Sized,
    P: Fn() -> usize,
    S: FnMut(WaitStatus),
{
    let target = origin_epoch as f64;
    loop {
        let now = time.unix_time();
        if now >= target {
            return now;
        }
        time.sleep(poll);
        status(WaitStatus {
            remaining_secs: (target - now).ceil() as u64,
            players_waiting: waiting_peers() + 1,
        });
    }
}

/// Monotonic simulation time since the session started
#[derive(Debug, Clone)]
pub struct SimulationClock {
    origin_epoch: u64,
    sim_time: f64,
    last_sim_time: Option<f64>,
    tick_count: u64,
}

impl SimulationClock {
    pub fn new(origin_epoch: u64) -> Self {
        Self {
            origin_epoch,
            sim_time: 0.0,
            last_sim_time: None,
            tick_count: 0,
        }
    }

    pub fn origin_epoch(&self) -> u64 {
        self.origin_epoch
    }

    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// The shared generator every client derives from the epoch
    pub fn seed_rng(&self) -> WorldRng {
        WorldRng::from_epoch(self.origin_epoch)
    }

    /// Start a frame at monotonic time `now`, returning the frame's `dt`
    ///
    /// The first frame has `dt = 0`. Time never runs backwards.
    pub fn begin_frame(&mut self, now: f64) -> f32 {
        let now = now.max(self.sim_time);
        let dt = match self.last_sim_time {
            Some(last) => (now - last) as f32,
            None => 0.0,
        };
        self.last_sim_time = Some(now);
        self.sim_time = now;
        self.tick_count += 1;
        dt
    }
}

/// Fixed-rate frame pacing and frame-rate reporting
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    budget: Duration,
    frames: u64,
    window_start: f64,
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new(TICK_RATE)
    }
}

impl FrameScheduler {
    pub fn new(rate: f64) -> Self {
        Self {
            budget: Duration::from_secs_f64(1.0 / rate),
            frames: 0,
            window_start: 0.0,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Sleep to apply before the next frame given this frame's work time
    ///
    /// Always within `[0, budget]`: an overrun frame gets no sleep but no
    /// catch-up ticks either.
    pub fn next_wait(&self, work: Duration) -> Duration {
        self.budget.saturating_sub(work)
    }

    /// Count a frame at time `now`; yields the average rate once at least
    /// two seconds have passed since the last report
    pub fn record_frame(&mut self, now: f64) -> Option<f64> {
        if self.frames == 0 && self.window_start == 0.0 {
            self.window_start = now;
        }
        self.frames += 1;
        let elapsed = now - self.window_start;
        if elapsed >= 2.0 {
            let fps = self.frames as f64 / elapsed;
            self.frames = 0;
            self.window_start = now;
            Some(fps)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Clock that only moves when slept on
    struct ManualClock {
        now: Cell<f64>,
        sleeps: Cell<u32>,
    }

    impl ManualClock {
        fn at(now: f64) -> Self {
            Self {
                now: Cell::new(now),
                sleeps: Cell::new(0),
            }
        }
    }

    impl TimeSource for ManualClock {
        fn unix_time(&self) -> f64 {
            self.now.get()
        }

        fn sleep(&self, duration: Duration) {
            self.now.set(self.now.get() + duration.as_secs_f64());
            self.sleeps.set(self.sleeps.get() + 1);
        }
    }

    #[test]
    fn test_epoch_gate_waits_until_epoch() {
        let clock = ManualClock::at(999.5);
        let poll = Duration::from_millis(1);
        let mut reports = Vec::new();
        let released = wait_for_epoch(&clock, 1000, poll, || 2, |s| reports.push(s));

        assert!(released >= 1000.0);
        assert!(released < 1000.0 + poll.as_secs_f64() + 1e-6);
        assert!(clock.sleeps.get() >= 499);
        assert_eq!(
            reports[0],
            WaitStatus {
                remaining_secs: 1,
                players_waiting: 3
            }
        );
    }

    #[test]
    fn test_epoch_gate_past_epoch_returns_immediately() {
        let clock = ManualClock::at(2000.0);
        let released = wait_for_epoch(&clock, 1000, Duration::from_millis(1), || 0, |_| {
            panic!("no status expected")
        });
        assert_eq!(released, 2000.0);
        assert_eq!(clock.sleeps.get(), 0);
    }

    #[test]
    fn test_wait_title() {
        let status = WaitStatus {
            remaining_secs: 12,
            players_waiting: 4,
        };
        assert_eq!(status.title(), "Please wait... 12 seconds. Total players waiting 4.");
    }

    #[test]
    fn test_next_epoch_boundary() {
        assert_eq!(next_epoch_boundary(0), 180);
        assert_eq!(next_epoch_boundary(179), 180);
        assert_eq!(next_epoch_boundary(180), 360);
        assert_eq!(next_epoch_boundary(1_700_000_000) % 180, 0);
    }

    #[test]
    fn test_validate_epoch() {
        assert!(validate_epoch(1010, 1000).is_ok());
        assert!(validate_epoch(1003, 1000).is_ok());
        match validate_epoch(1002, 1000) {
            Err(StartupError::EpochTooSoon { epoch, suggested }) => {
                assert_eq!(epoch, 1002);
                assert_eq!(suggested, 1016);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_resolve_epoch() {
        assert_eq!(resolve_epoch(None, 1000).unwrap(), 1080);
        assert_eq!(resolve_epoch(Some(0), 1000).unwrap(), 1080);
        assert_eq!(resolve_epoch(Some(1010), 1000).unwrap(), 1010);
        assert!(matches!(
            resolve_epoch(Some(1001), 1000),
            Err(StartupError::EpochTooSoon { .. })
        ));
    }

    #[test]
    fn test_begin_frame_dt() {
        let mut clock = SimulationClock::new(1000);
        assert_eq!(clock.begin_frame(5.0), 0.0);
        let dt = clock.begin_frame(5.016);
        assert!((dt - 0.016).abs() < 1e-6);
        // Time going backwards yields zero dt rather than negative
        assert_eq!(clock.begin_frame(4.0), 0.0);
        assert_eq!(clock.tick_count(), 3);
        assert!((clock.sim_time() - 5.016).abs() < 1e-9);
    }

    #[test]
    fn test_seed_matches_epoch() {
        let clock = SimulationClock::new(1_700_000_040);
        assert_eq!(clock.seed_rng().seed(), 1_700_000_040);
    }

    #[test]
    fn test_next_wait_is_clamped() {
        let scheduler = FrameScheduler::default();
        let budget = scheduler.budget();
        assert_eq!(scheduler.next_wait(Duration::ZERO), budget);
        assert_eq!(scheduler.next_wait(Duration::from_secs(1)), Duration::ZERO);
        let half = budget / 2;
        assert_eq!(scheduler.next_wait(half), budget - half);
    }

    #[test]
    fn test_fps_report_window() {
        let mut scheduler = FrameScheduler::default();
        let mut report = None;
        for i in 0..=120 {
            report = report.or(scheduler.record_frame(10.0 + i as f64 / 60.0));
        }
        let fps = report.unwrap();
        assert!((fps - 60.5).abs() < 1.0, "{fps}");
    }
}
