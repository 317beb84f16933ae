//! The playback context: engine + inbox + progress cadence.
//!
//! [`PlaybackHost`] is the only owner of the [`PlaybackEngine`].  It serves
//! `engine-*` requests from the coordinator, ticks the engine at the
//! configured cadence and forwards engine events back to the coordinator as
//! envelopes.
//!
//! ```text
//!  coordinator ──engine-load/play/…──▶ PlaybackHost::handle ──▶ engine
//!       ▲                                                       │
//!       │        internal-state-changed / highlight-progress   │
//!       └──────────────────── Forwarder (observer) ◀────────────┘
//!                                   ▲
//!               interval(progress_interval) ──▶ engine.tick()
//! ```
//!
//! The audio device handle is not `Send`, so
//! [`spawn_playback_context`] builds the output *on* a dedicated OS thread
//! and drives the host there with a current-thread tokio runtime.

use std::thread::JoinHandle;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::bus::{self, answer, Delivery, Endpoint, Inbox, IntentResponse};
use crate::clock::SharedClock;
use crate::config::AppConfig;
use crate::error::SyncError;
use crate::message::{Envelope, ErrorCategory, Freshness, Message};

use super::engine::PlaybackEngine;
use super::events::PlaybackObserver;
use super::output::AudioOutput;
use super::state::{PlaybackState, PlaybackStatus};

/// Inbox capacity of the playback context.
const INBOX_CAPACITY: usize = 32;

// ---------------------------------------------------------------------------
// Forwarder
// ---------------------------------------------------------------------------

/// Observer that turns engine events into envelopes for the coordinator.
struct Forwarder {
    coordinator: Endpoint,
    clock: SharedClock,
}

impl Forwarder {
    fn send(&self, message: Message) {
        let envelope = Envelope::new(message, self.clock.as_ref());
        if let Err(e) = self.coordinator.broadcast(envelope) {
            log::warn!("playback: {e}");
        }
    }
}

impl PlaybackObserver for Forwarder {
    fn on_status_change(&mut self, previous: PlaybackStatus, state: &PlaybackState) {
        self.send(Message::InternalStateChanged {
            previous,
            status: state.status,
            position_ms: state.position_ms(),
            duration_ms: state.duration_ms(),
        });
    }

    fn on_progress(&mut self, state: &PlaybackState) {
        self.send(Message::HighlightProgress {
            current_time_ms: state.timeline_ms(),
        });
    }

    fn on_error(&mut self, error: &SyncError) {
        self.send(Message::PlaybackError {
            message: error.user_message(),
            category: ErrorCategory::Playback,
        });
    }
}

// ---------------------------------------------------------------------------
// PlaybackHost
// ---------------------------------------------------------------------------

pub struct PlaybackHost<O: AudioOutput> {
    engine: PlaybackEngine<O>,
    clock: SharedClock,
    freshness: Freshness,
    progress_interval: Duration,
}

impl<O: AudioOutput> PlaybackHost<O> {
    pub fn new(output: O, config: &AppConfig, clock: SharedClock, coordinator: Endpoint) -> Self {
        let mut engine = PlaybackEngine::new(output);
        engine.subscribe(Forwarder {
            coordinator,
            clock: clock.clone(),
        });
        Self {
            engine,
            clock,
            freshness: Freshness::from_config(&config.sync),
            progress_interval: Duration::from_millis(config.playback.progress_interval_ms.max(1)),
        }
    }

    /// Serve the inbox until every sender is gone, then release the audio.
    pub async fn run(mut self, mut inbox: Inbox) {
        let mut ticker = tokio::time::interval(self.progress_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        log::info!("playback: context started");
        loop {
            tokio::select! {
                delivery = inbox.recv() => match delivery {
                    Some(delivery) => self.handle(delivery),
                    None => break,
                },
                _ = ticker.tick() => self.engine.tick(),
            }
        }

        self.engine.stop();
        log::info!("playback: context stopped");
    }

    fn handle(&mut self, delivery: Delivery) {
        match delivery {
            Delivery::Request { envelope, reply } => {
                let response = match self.freshness.check(&envelope, self.clock.now_ms()) {
                    Ok(()) => self.execute(envelope.message),
                    Err(e) => {
                        log::warn!("playback: dropped {e}");
                        IntentResponse::failed(&e)
                    }
                };
                answer(reply, response);
            }
            Delivery::Broadcast(envelope) => {
                if let Err(e) = self.freshness.check(&envelope, self.clock.now_ms()) {
                    log::warn!("playback: dropped {e}");
                    return;
                }
                let response = self.execute(envelope.message);
                if !response.success {
                    log::debug!(
                        "playback: broadcast request failed: {}",
                        response.error.unwrap_or_default()
                    );
                }
            }
        }
    }

    fn execute(&mut self, message: Message) -> IntentResponse {
        match message {
            Message::EngineLoad { audio } => match self.engine.load(audio) {
                Ok(duration_ms) => IntentResponse::ok().with_duration(duration_ms),
                Err(e) => IntentResponse::failed(&e),
            },
            Message::EnginePlay => IntentResponse::from_result(self.engine.play()),
            Message::EnginePause => {
                self.engine.pause();
                IntentResponse::ok().with_state(self.engine.state())
            }
            Message::EngineResume => IntentResponse::from_result(self.engine.resume()),
            Message::EngineStop => {
                self.engine.stop();
                IntentResponse::ok()
            }
            Message::EngineSetSpeed { speed } => {
                if self.engine.set_speed(speed) {
                    IntentResponse::ok().with_state(self.engine.state())
                } else {
                    IntentResponse::failed(&SyncError::InvalidSpeed(speed))
                }
            }
            Message::EngineStatus => IntentResponse::ok().with_state(self.engine.state()),
            Message::Unhandled { kind } => {
                log::warn!("playback: unhandled message kind {kind:?}");
                IntentResponse::failed(&SyncError::MessageDelivery(format!(
                    "unknown kind {kind}"
                )))
            }
            Message::PlaybackStarted { .. }
            | Message::PlaybackPaused { .. }
            | Message::PlaybackResumed { .. }
            | Message::PlaybackStopped { .. }
            | Message::PlaybackError { .. }
            | Message::AutoplayBlocked
            | Message::SpeedChanged { .. }
            | Message::HighlightStart { .. }
            | Message::HighlightProgress { .. }
            | Message::ControlPause
            | Message::ControlResume
            | Message::ControlStop
            | Message::ControlSpeedChange { .. }
            | Message::SpeakRequest { .. }
            | Message::InternalStateChanged { .. } => {
                let kind = message.kind().to_string();
                log::warn!("playback: {kind} is not addressed to the engine");
                IntentResponse::failed(&SyncError::MessageDelivery(format!(
                    "{kind} is not an engine request"
                )))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// spawn_playback_context
// ---------------------------------------------------------------------------

/// Start the playback context on its own thread and return its endpoint.
///
/// `make_output` runs on the new thread, so the output type itself does not
/// need to be `Send`.
pub fn spawn_playback_context<O, F>(
    make_output: F,
    config: &AppConfig,
    clock: SharedClock,
    coordinator: Endpoint,
) -> std::io::Result<(Endpoint, JoinHandle<()>)>
where
    O: AudioOutput + 'static,
    F: FnOnce() -> O + Send + 'static,
{
    let (endpoint, inbox) = bus::channel("playback", INBOX_CAPACITY);
    let config = config.clone();

    let handle = std::thread::Builder::new()
        .name("playback".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    log::error!("playback: could not start runtime: {e}");
                    return;
                }
            };
            let host = PlaybackHost::new(make_output(), &config, clock, coordinator);
            runtime.block_on(host.run(inbox));
        })?;

    Ok((endpoint, handle))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
