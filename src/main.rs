//! Cometfall headless client
//!
//! Joins a room keyed by the start epoch, waits for the epoch, then runs the
//! shared simulation at a fixed rate until the planet falls.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use env_logger::{Builder, Env};
use log::{LevelFilter, debug, error, info, warn};
use rand::TryRngCore;
use rand::rngs::OsRng;

use cometfall::consts::*;
use cometfall::net::{HttpTransport, PeerSync, RosterSnapshot};
use cometfall::present::FrameFeed;
use cometfall::sim::{
    DeformableShell, FrameScheduler, GameState, PlayerState, SimulationClock, SystemClock,
    TickInput, ViewBasis, resolve_epoch, tick, unix_now, wait_for_epoch,
};
use cometfall::{Settings, StartupError};

/// Epoch-locked multiplayer comet defence
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Start epoch (unix seconds); 0 or absent picks the next 3 minute boundary
    epoch: Option<u64>,

    /// Anti-aliasing samples (0-16)
    msaa: Option<u8>,

    /// High-latency mode: milliseconds between position exchanges
    high_ping_ms: Option<u64>,

    /// Position exchange endpoint (overrides the settings file)
    #[arg(long)]
    server: Option<String>,

    /// JSON settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Smooth peer motion between refreshes
    #[arg(long)]
    extrapolate: bool,

    /// Play alone without contacting the server
    #[arg(long)]
    offline: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let env = Env::default().default_filter_or(level.to_string());
    let _ = Builder::from_env(env).try_init();
}

fn load_settings(cli: &Cli) -> Result<Settings, StartupError> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(msaa) = cli.msaa {
        settings.msaa = msaa;
    }
    if let Some(ms) = cli.high_ping_ms {
        settings.high_ping_interval_ms = Some(ms);
    }
    if cli.extrapolate {
        settings.extrapolation = true;
    }
    if let Some(url) = &cli.server {
        settings.server_url = url.clone();
    }
    Ok(settings)
}

/// Random 16-bit client identity from the OS entropy source
fn client_uid() -> Result<u16, StartupError> {
    let raw = OsRng
        .try_next_u32()
        .map_err(|e| StartupError::Entropy(e.to_string()))?;
    Ok((raw & 0xFFFF) as u16)
}

fn run(cli: Cli) -> Result<(), StartupError> {
    let settings = load_settings(&cli)?;
    let uid = client_uid()?;
    let now = unix_now()?;
    let epoch = resolve_epoch(cli.epoch, now)?;

    info!("client uid:    {uid}");
    info!("start epoch:   {epoch}");
    info!(
        "msaa:          {} | high ping: {:?} | extrapolation: {}",
        settings.effective_msaa(),
        settings.high_ping_interval_ms,
        settings.extrapolation
    );

    let worker = if cli.offline {
        info!("Offline: peer sync disabled");
        None
    } else {
        if settings.uses_local_server() {
            warn!(
                "No server configured, using {}; pass --server for online play",
                settings.server_url
            );
        }
        let transport = HttpTransport::new(&settings)?;
        let mut sync = PeerSync::new(transport, epoch, uid, &settings);
        sync.link().position.set(PlayerState::default().world_offset);
        sync.register(Duration::from_secs(epoch.saturating_sub(now).max(1)));
        Some(sync.spawn()?)
    };
    let link = worker.as_ref().map(|(link, _)| link.clone());

    let mut last_reported = None;
    wait_for_epoch(
        &SystemClock,
        epoch,
        Duration::from_millis(EPOCH_POLL_MS),
        || link.as_ref().map_or(0, |l| l.roster.snapshot().occupied()),
        |status| {
            if last_reported != Some(status.remaining_secs) {
                last_reported = Some(status.remaining_secs);
                info!("{}", status.title());
            }
        },
    );

    let mut clock = SimulationClock::new(epoch);
    let shell = DeformableShell::icosphere(settings.shell_subdivisions);
    let mut state = GameState::from_clock(&clock, shell);
    info!(
        "Round started: {} comets, shell of {} vertices",
        NUM_COMETS,
        state.shell.vertex_count()
    );

    let started = Instant::now();
    let mut scheduler = FrameScheduler::default();
    let mut basis = ViewBasis::default();
    let mut input = TickInput::default();
    let mut last_title = String::new();

    loop {
        let frame_start = Instant::now();
        let dt = clock.begin_frame(started.elapsed().as_secs_f64());

        let snapshot = link
            .as_ref()
            .map(|l| l.roster.snapshot())
            .unwrap_or_default();
        let peers = snapshot.peer_positions(frame_start);
        input.basis = basis;
        let report = tick(&mut state, &input, &peers, dt);
        basis.steer(input.player.look, state.player.roll);
        if let Some(l) = &link {
            l.position.set(state.player.world_offset);
        }
        if report.bounced {
            debug!("Bounced off the shell at altitude {:.3}", state.player.altitude());
        }

        let feed = present_frame(&mut state, &basis, &snapshot, frame_start, clock.sim_time());
        if feed.title != last_title && report.comets.planet_hits + report.comets.player_hits > 0 {
            info!("{}", feed.title);
            last_title = feed.title;
        }

        if let Some(fps) = scheduler.record_frame(clock.sim_time()) {
            debug!(
                "{fps:.1} fps, {} peers, {} comets inbound",
                peers.len(),
                state.comets.approaching()
            );
        }

        if state.is_round_over() {
            break;
        }
        std::thread::sleep(scheduler.next_wait(frame_start.elapsed()));
    }

    info!(
        "Round over after {:.2} mins: {} hits, {} popped, {} popped by peers",
        clock.sim_time() / 60.0,
        state.stats.hits,
        state.stats.popped,
        state.stats.peer_pops
    );

    if let Some((link, handle)) = worker {
        link.stop();
        if handle.join().is_err() {
            warn!("Peer sync thread panicked");
        }
    }
    Ok(())
}

fn present_frame(
    state: &mut GameState,
    basis: &ViewBasis,
    snapshot: &RosterSnapshot,
    now: Instant,
    elapsed_secs: f64,
) -> FrameFeed {
    let feed = FrameFeed::build(state, basis, snapshot, now, elapsed_secs);
    if let Some(shell) = &feed.shell {
        debug!("Shell upload: {} bytes", shell.vertex_bytes().len());
    }
    feed
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
