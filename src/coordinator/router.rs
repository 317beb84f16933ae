//! The coordinator event loop.
//!
//! [`Coordinator`] holds no authoritative playback state.  It only relays:
//!
//! ```text
//! control-* (request)        ──▶ engine-* (request) ──▶ {success, error?} reply
//!   └─ stop ok               ──▶ playback-stopped(user)
//!   └─ speed ok              ──▶ store preference, speed-changed
//! internal-state-changed     ──▶ translate ──▶ playback-* broadcast
//! highlight-progress         ──▶ relayed unchanged
//! playback-error (engine)    ──▶ relayed unchanged
//! speak-request              ──▶ spawned session start (supersedes any running one)
//! ```
//!
//! Requests are handled one at a time, so the reply to an intent and any
//! notification it triggers leave in order.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::bus::{answer, Delivery, Endpoint, Inbox, IntentResponse};
use crate::clock::SharedClock;
use crate::config::{AppConfig, PreferenceStore};
use crate::error::SyncError;
use crate::message::{Freshness, Message, StopReason};
use crate::playback::is_valid_speed;
use crate::tts::SpeechSynthesizer;

use super::links::Links;
use super::translate::translate;

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

pub struct Coordinator {
    links: Links,
    freshness: Freshness,
    session: Option<JoinHandle<()>>,
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        if let Some(task) = self.session.take() {
            task.abort();
        }
    }
}

impl Coordinator {
    pub fn new(
        config: &AppConfig,
        engine: Endpoint,
        surface: Endpoint,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        preferences: Arc<dyn PreferenceStore>,
        clock: SharedClock,
    ) -> Self {
        Self {
            links: Links::new(
                engine,
                surface,
                synthesizer,
                preferences,
                clock,
                Duration::from_millis(config.playback.request_timeout_ms),
            ),
            freshness: Freshness::from_config(&config.sync),
            session: None,
        }
    }

    /// Serve the inbox until every sender is gone.
    pub async fn run(mut self, mut inbox: Inbox) {
        self.serve(&mut inbox).await;
        log::info!("coordinator: stopped");
    }

    /// Serve a borrowed inbox.  Dropping the future unloads the coordinator
    /// and leaves the inbox to whichever coordinator is built next.
    pub async fn serve(&mut self, inbox: &mut Inbox) {
        log::info!("coordinator: started");
        while let Some(delivery) = inbox.recv().await {
            self.handle(delivery).await;
        }
    }

    async fn handle(&mut self, delivery: Delivery) {
        let now = self.links.clock.now_ms();
        if let Err(e) = self.freshness.check(delivery.envelope(), now) {
            log::warn!("coordinator: dropped {e}");
            if let Delivery::Request { reply, .. } = delivery {
                answer(reply, IntentResponse::failed(&e));
            }
            return;
        }

        match delivery {
            Delivery::Request { envelope, reply } => {
                let response = self.dispatch(envelope.message).await;
                answer(reply, response);
            }
            Delivery::Broadcast(envelope) => {
                let response = self.dispatch(envelope.message).await;
                if !response.success {
                    log::debug!(
                        "coordinator: unanswered broadcast failed: {}",
                        response.error.unwrap_or_default()
                    );
                }
            }
        }
    }

    async fn dispatch(&mut self, message: Message) -> IntentResponse {
        match message {
            // ── intents ────────────────────────────────────────────────
            Message::ControlPause
            | Message::ControlResume
            | Message::ControlStop
            | Message::ControlSpeedChange { .. } => self.forward_intent(message).await,

            // ── session start ──────────────────────────────────────────
            Message::SpeakRequest { text } => {
                self.start_session(text);
                IntentResponse::ok()
            }

            // ── engine events ──────────────────────────────────────────
            Message::InternalStateChanged {
                previous,
                status,
                position_ms,
                duration_ms,
            } => {
                if let Some(note) = translate(previous, status, position_ms, duration_ms) {
                    self.links.notify(note);
                }
                IntentResponse::ok()
            }
            Message::HighlightProgress { .. } | Message::PlaybackError { .. } => {
                self.links.notify(message);
                IntentResponse::ok()
            }

            Message::Unhandled { kind } => {
                log::warn!("coordinator: unhandled message kind {kind:?}");
                IntentResponse::failed(&SyncError::MessageDelivery(format!("unknown kind {kind}")))
            }

            Message::PlaybackStarted { .. }
            | Message::PlaybackPaused { .. }
            | Message::PlaybackResumed { .. }
            | Message::PlaybackStopped { .. }
            | Message::AutoplayBlocked
            | Message::SpeedChanged { .. }
            | Message::HighlightStart { .. }
            | Message::EngineLoad { .. }
            | Message::EnginePlay
            | Message::EnginePause
            | Message::EngineResume
            | Message::EngineStop
            | Message::EngineSetSpeed { .. }
            | Message::EngineStatus => {
                let kind = message.kind().to_string();
                log::warn!("coordinator: {kind} is not addressed to the coordinator");
                IntentResponse::failed(&SyncError::MessageDelivery(format!(
                    "{kind} is not a coordinator message"
                )))
            }
        }
    }

    /// Forward one intent 1:1 to the engine and answer `{success, error?}`.
    async fn forward_intent(&self, intent: Message) -> IntentResponse {
        let request = match &intent {
            Message::ControlPause => Message::EnginePause,
            Message::ControlResume => Message::EngineResume,
            Message::ControlStop => Message::EngineStop,
            &Message::ControlSpeedChange { speed } => {
                if !is_valid_speed(speed) {
                    log::warn!("coordinator: rejected speed {speed}");
                    return IntentResponse::failed(&SyncError::InvalidSpeed(speed));
                }
                Message::EngineSetSpeed { speed }
            }
            other => {
                return IntentResponse::failed(&SyncError::MessageDelivery(format!(
                    "{} is not an intent",
                    other.kind()
                )))
            }
        };

        let response = match self.links.request_engine(request).await {
            Ok(resp) => resp,
            Err(e) => {
                log::warn!("coordinator: {e}");
                IntentResponse::failed(&e)
            }
        };

        if response.success {
            match intent {
                Message::ControlStop => self.links.notify(Message::PlaybackStopped {
                    reason: StopReason::User,
                }),
                Message::ControlSpeedChange { speed } => {
                    self.remember_speed(speed);
                    self.links.notify(Message::SpeedChanged { speed });
                }
                _ => {}
            }
        } else if response.is_autoplay_blocked() {
            self.links.notify(Message::AutoplayBlocked);
        }

        IntentResponse {
            success: response.success,
            error: response.error,
            code: response.code,
            ..IntentResponse::default()
        }
    }

    fn remember_speed(&self, speed: f32) {
        let result = self.links.preferences.load().and_then(|mut prefs| {
            prefs.speed = speed;
            self.links.preferences.store(&prefs)
        });
        if let Err(e) = result {
            log::warn!("coordinator: could not persist speed {speed}: {e:#}");
        }
    }

    /// Begin a new session, superseding one that is still starting.
    fn start_session(&mut self, text: String) {
        if let Some(previous) = self.session.take() {
            if !previous.is_finished() {
                log::info!("coordinator: superseding session still starting");
                previous.abort();
            }
        }
        self.session = Some(tokio::spawn(self.links.clone().start_session(text)));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
