//! Lane Runner headless driver.
//!
//! Runs a scripted session, records its inputs, and replays the recording
//! to check that the simulation is deterministic.
//!
//! Usage: `lane-runner [config.json]`. `LANE_RUNNER_SEED` overrides the
//! seed and `RUST_LOG` the log filter.

use std::cell::Cell;
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lane_runner::{
    TICK_RATE, VERSION,
    config::GameConfig,
    core::fixed::to_float,
    game::{
        events::{EventKind, GameEventData},
        input::{Gesture, InputRecording, PlayerInput},
        storage::JsonFileStore,
        tick::{replay_session, Session, SessionConfig},
    },
};

const DEFAULT_SEED: u64 = 12345;

/// Hard stop for the scripted run.
const MAX_TICKS: u32 = 240 * TICK_RATE;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Lane Runner v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);

    let config = load_config()?;
    let seed = match std::env::var("LANE_RUNNER_SEED") {
        Ok(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("LANE_RUNNER_SEED is not a number: {raw}"))?,
        Err(_) => DEFAULT_SEED,
    };

    demo_session(config, seed)
}

fn load_config() -> Result<SessionConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading config from {}", path);
            let settings = GameConfig::load(&path)?;
            Ok(settings.compile()?)
        }
        None => Ok(GameConfig::default().compile()?),
    }
}

/// Scripted gesture for tick `t`, if any.
///
/// Mostly forward taps with the occasional sidestep, spaced so each step
/// lands before the next gesture arrives.
fn scripted_gesture(t: u32) -> Option<Gesture> {
    if t % 15 != 0 {
        return None;
    }
    match (t / 15) % 12 {
        3 => Some(Gesture::swipe(80, 4)),
        4 => Some(Gesture::swipe(80, 4)),
        5 => Some(Gesture::swipe(0, 90)),
        8 => Some(Gesture::swipe(-80, -2)),
        9 => Some(Gesture::swipe(-80, -2)),
        10 => Some(Gesture::swipe(2, 90)),
        _ => Some(Gesture::tap()),
    }
}

fn demo_session(config: SessionConfig, seed: u64) -> Result<()> {
    info!("=== Starting Demo Session ===");
    info!("RNG Seed: {}", seed);

    let store_path = std::env::temp_dir().join("lane-runner").join("scores.json");
    let store = JsonFileStore::open(&store_path)?;
    info!("Score store: {}", store_path.display());

    let mut session = Session::new(config.clone(), seed, store);
    info!("Starting high score: {}", session.state().high_score);

    let score_seen = Rc::new(Cell::new(0));
    let score_sub = {
        let score_seen = Rc::clone(&score_seen);
        session.subscribe(
            EventKind::ScoreChanged,
            Box::new(move |event| {
                if let GameEventData::ScoreChanged(score) = event.data {
                    score_seen.set(score);
                }
            }),
        )
    };
    let over_sub = session.subscribe(
        EventKind::GameOver,
        Box::new(|event| info!("Game over at tick {}", event.tick)),
    );

    let mut recording = InputRecording::new(seed);
    let mut restarted = false;
    let mut total_events = 0;

    for _ in 0..MAX_TICKS {
        let next = session.tick_count() + 1;
        let mut inputs = Vec::new();

        if session.state().is_game_over {
            if restarted {
                break;
            }
            info!("Restarting after score {}", session.state().current_score);
            inputs.push(PlayerInput::Restart);
            restarted = true;
        } else if let Some(gesture) = scripted_gesture(next) {
            inputs.push(PlayerInput::Gesture(gesture));
        }

        for input in &inputs {
            recording.record(next, *input);
        }
        let result = session.apply_inputs(&inputs);
        total_events += result.events.len();

        if result.tick % (10 * TICK_RATE) == 0 {
            let state = session.state();
            let y = session.player_position().map_or(0.0, |p| to_float(p.y));
            info!(
                "Tick {}: score {}, stamina {}, y {:.1}, {} entities, lanes {}..{}",
                result.tick,
                state.current_score,
                state.stamina,
                y,
                session.world().len(),
                session.streamer().min_lane(),
                session.streamer().max_lane(),
            );
        }
    }

    let ticks = session.tick_count();
    recording.finalize(ticks);

    info!("=== Session Results ===");
    let state = session.state();
    info!("Ticks: {}", ticks);
    info!("Score: {} (observer saw {})", state.current_score, score_seen.get());
    info!("High score: {}", state.high_score);
    info!("Total events: {}", total_events);

    let hash = session.compute_hash();
    info!("Final State Hash: {}", hex::encode(hash));

    if !session.unsubscribe(score_sub) || !session.unsubscribe(over_sub) {
        warn!("Observer was already removed");
    }

    info!("=== Verifying Determinism ===");
    let bytes = recording.to_bytes()?;
    info!("Recording: {} inputs, {} bytes", recording.len(), bytes.len());
    let decoded = InputRecording::from_bytes(&bytes)?;

    let (replayed, _) = replay_session(&config, &decoded, decoded.end_tick);
    let replay_hash = replayed.compute_hash();
    info!("Replay State Hash: {}", hex::encode(replay_hash));

    if hash != replay_hash {
        bail!("determinism failure: replay hash differs");
    }
    info!("DETERMINISM VERIFIED: Hashes match!");
    Ok(())
}
