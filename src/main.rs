//! Arc Breakout entry point
//!
//! Runs the engine on its own thread and drives it headless: an autopilot
//! moves the paddle, and an ASCII frame of the shadow world is printed every
//! couple of seconds.
//!
//! Usage: `arc-breakout [config.json] [seconds]`

use std::process::ExitCode;
use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};

use arc_breakout::EngineConfig;
use arc_breakout::sim::{Autopilot, Engine, OverflowPolicy, channel_observer};
use arc_breakout::view::{AsciiFrame, ShadowWorld};

const FEED_CAPACITY: usize = 256;
const FRAME_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_RUN_SECONDS: u64 = 30;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Arc Breakout (headless) starting...");

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run() -> arc_breakout::Result<()> {
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => {
            log::info!("Loading config from {}", path);
            EngineConfig::load(path)?
        }
        None => EngineConfig::default(),
    };
    let seconds = args
        .next()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_RUN_SECONDS);

    let engine = Engine::new(config)?;
    let (observer, feed) = channel_observer(FEED_CAPACITY, OverflowPolicy::DropAndResync);
    engine.state().subscribe(Box::new(observer));

    let handle = engine.spawn()?;
    let controller = handle.controller();
    let pilot = Autopilot::default();
    let mut world = ShadowWorld::new();

    let deadline = Instant::now() + Duration::from_secs(seconds);
    let mut next_frame = Instant::now();

    while Instant::now() < deadline {
        match feed.recv_timeout(Duration::from_millis(100)) {
            Ok(update) => world.apply(&update),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                log::warn!("State feed closed");
                break;
            }
        }

        if let (Some(ball), Some(paddle)) = (world.ball(), world.paddle()) {
            let dx = pilot.displacement(ball, paddle, world.tick());
            if dx != 0.0 {
                controller.move_paddle(dx);
            }
        }

        if Instant::now() >= next_frame {
            let frame = AsciiFrame::render(&world, 40, 32);
            if frame.skipped > 0 {
                log::debug!("{} entities not drawable", frame.skipped);
            }
            println!("{}", frame);
            next_frame += FRAME_INTERVAL;
        }
    }

    let stats = handle.join()?;
    log::info!(
        "Finished: {} ticks, {} rounds, {} bricks, {} overruns, {} updates dropped",
        stats.ticks,
        stats.rounds,
        stats.bricks_destroyed,
        stats.overruns,
        feed.dropped()
    );
    Ok(())
}
