//! Application entry point — read text aloud with synchronized highlights.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Build the speech synthesizer ([`ApiSynthesizer`] behind a
//!    [`CachedSynthesizer`]) and the preference store.
//! 5. Spawn the playback context on its own thread.
//! 6. Spawn the coordinator.
//! 7. Spawn the stdin key reader thread.
//! 8. Send the speak request and run the surface context until `q`.

use std::io::BufRead;
use std::sync::Arc;

use anyhow::Context as _;
use tokio::sync::mpsc;

use readalong::{
    bus,
    clock::{SharedClock, SystemClock},
    config::{AppConfig, AppPaths, FilePreferenceStore, PreferenceStore},
    coordinator::Coordinator,
    playback::{spawn_playback_context, RodioOutput, MAX_SPEED, MIN_SPEED},
    surface::{highlight::TextDocument, Control, LogRenderer, SurfaceContext, UserInput},
    tts::{ApiSynthesizer, CachedSynthesizer},
};

/// Speed change per `+` / `-` key press.
const SPEED_STEP: f32 = 0.25;

/// Height of the simulated viewport the highlights scroll within.
const VIEWPORT_HEIGHT: f64 = 400.0;

// ---------------------------------------------------------------------------
// Key reader
// ---------------------------------------------------------------------------

/// Reads one command per line from stdin and forwards it as [`UserInput`].
///
/// The thread ends on `q`, end of input, or when the surface goes away;
/// dropping the sender then shuts the surface down.
fn spawn_key_reader(input: mpsc::Sender<UserInput>, mut speed: f32) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                let command = match line.trim() {
                    "p" => UserInput::Click(Control::PlayPause),
                    "s" => UserInput::Click(Control::Stop),
                    "+" => {
                        speed = (speed + SPEED_STEP).min(MAX_SPEED);
                        UserInput::Click(Control::Speed(speed))
                    }
                    "-" => {
                        speed = (speed - SPEED_STEP).max(MIN_SPEED);
                        UserInput::Click(Control::Speed(speed))
                    }
                    "n" => UserInput::ActivateNotice,
                    "x" => UserInput::DismissNotice,
                    "q" => break,
                    "" => continue,
                    other => {
                        log::warn!("unknown command {other:?} (p, s, +, -, n, x, q)");
                        continue;
                    }
                };
                if input.blocking_send(command).is_err() {
                    break;
                }
            }
        })?;
    Ok(())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

async fn run(config: AppConfig, text: String) -> anyhow::Result<()> {
    let clock: SharedClock = Arc::new(SystemClock);

    // 4. Collaborators
    let preferences: Arc<dyn PreferenceStore> =
        Arc::new(FilePreferenceStore::from_app_paths(&AppPaths::new()));
    let speed = preferences.load().map(|p| p.speed).unwrap_or(1.0);
    let synthesizer = Arc::new(CachedSynthesizer::new(
        ApiSynthesizer::from_config(&config.tts),
        config.tts.cache_entries,
    ));

    let (coordinator, coordinator_inbox) = bus::channel("coordinator", 64);
    let (surface, surface_inbox) = bus::channel("surface", 256);

    // 5. Playback context (detached; the process exits with the surface)
    let (engine, _playback) =
        spawn_playback_context(RodioOutput::new, &config, clock.clone(), coordinator.clone())
            .context("failed to spawn playback thread")?;

    // 6. Coordinator
    let hub = Coordinator::new(
        &config,
        engine,
        surface,
        synthesizer,
        preferences,
        clock.clone(),
    );
    tokio::spawn(hub.run(coordinator_inbox));

    // 7. Key reader
    let (input_tx, input_rx) = mpsc::channel::<UserInput>(16);
    spawn_key_reader(input_tx.clone(), speed).context("failed to spawn stdin thread")?;
    log::info!("keys: p play/pause, s stop, +/- speed, n accept notice, x dismiss, q quit");

    // 8. Surface
    let document = TextDocument::new(vec![vec![text.clone()]], VIEWPORT_HEIGHT);
    let context = SurfaceContext::new(&config, LogRenderer::default(), document, coordinator, clock);
    input_tx
        .send(UserInput::Speak { text, container: 0 })
        .await
        .context("surface closed before the first request")?;
    drop(input_tx);

    context.run(surface_inbox, input_rx).await;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let text = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if text.trim().is_empty() {
        anyhow::bail!("usage: readalong <text…>");
    }
    log::info!("readalong starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(run(config, text))
}
