//! The UI surface context: control panel + highlighting + user input.
//!
//! ```text
//!  coordinator ──playback-* / highlight-* / speed-changed──▶ inbox
//!                                                              │
//!                                  ControlPanel::apply ◀───────┤
//!                                  HighlightEngine     ◀───────┘ (unless stale)
//!
//!  UserInput ──▶ ControlPanel::click ──▶ control-* request (spawned)
//!                                            │
//!             ControlPanel::complete ◀── reply ┘
//!
//!  interval(housekeeping) ──▶ ControlPanel::expire
//! ```
//!
//! The context never blocks on the coordinator: intents are sent from
//! spawned tasks and their replies come back through a channel.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::bus::{answer, Delivery, Endpoint, Inbox, IntentResponse};
use crate::clock::SharedClock;
use crate::config::AppConfig;
use crate::error::SyncError;
use crate::message::{Envelope, Freshness, Message};

use super::highlight::{ContainerId, HighlightEngine, HighlightSurface};
use super::panel::{Applied, Control, ControlPanel};
use super::render::PanelRenderer;

/// How often unconfirmed optimistic state and expired notices are checked.
const HOUSEKEEPING_INTERVAL: Duration = Duration::from_millis(250);

type Completion = Result<IntentResponse, SyncError>;

/// Something the user did on the page.
#[derive(Debug, Clone, PartialEq)]
pub enum UserInput {
    Click(Control),
    ActivateNotice,
    DismissNotice,
    /// Read `text`, selected inside `container`, aloud.
    Speak { text: String, container: ContainerId },
}

pub struct SurfaceContext<R: PanelRenderer, S: HighlightSurface> {
    panel: ControlPanel<R>,
    highlight: HighlightEngine<S>,
    coordinator: Endpoint,
    clock: SharedClock,
    freshness: Freshness,
    request_timeout: Duration,
    selection: ContainerId,
}

impl<R: PanelRenderer, S: HighlightSurface> SurfaceContext<R, S> {
    pub fn new(
        config: &AppConfig,
        renderer: R,
        document: S,
        coordinator: Endpoint,
        clock: SharedClock,
    ) -> Self {
        Self {
            panel: ControlPanel::new(renderer, &config.panel),
            highlight: HighlightEngine::new(document, config.highlight.auto_scroll),
            coordinator,
            clock,
            freshness: Freshness::from_config(&config.sync),
            request_timeout: Duration::from_millis(config.playback.request_timeout_ms),
            selection: 0,
        }
    }

    pub fn panel(&self) -> &ControlPanel<R> {
        &self.panel
    }

    pub fn highlight(&self) -> &HighlightEngine<S> {
        &self.highlight
    }

    /// Serve notifications and user input until either source closes.
    pub async fn run(mut self, mut inbox: Inbox, mut input: mpsc::Receiver<UserInput>) {
        log::info!("surface: started");
        let (done_tx, mut done_rx) = mpsc::channel::<Completion>(8);
        let mut housekeeping = tokio::time::interval(HOUSEKEEPING_INTERVAL);
        housekeeping.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                delivery = inbox.recv() => match delivery {
                    Some(delivery) => self.handle(delivery),
                    None => break,
                },
                user = input.recv() => match user {
                    Some(user) => self.on_input(user, &done_tx),
                    None => break,
                },
                Some(result) = done_rx.recv() => {
                    let now = self.clock.now_ms();
                    self.panel.complete(result, now);
                }
                _ = housekeeping.tick() => {
                    let now = self.clock.now_ms();
                    self.panel.expire(now);
                }
            }
        }

        self.highlight.stop();
        log::info!("surface: stopped");
    }

    // -----------------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------------

    pub(crate) fn handle(&mut self, delivery: Delivery) {
        let now = self.clock.now_ms();
        if let Err(e) = self.freshness.check(delivery.envelope(), now) {
            log::warn!("surface: dropped {e}");
            if let Delivery::Request { reply, .. } = delivery {
                answer(reply, IntentResponse::failed(&e));
            }
            return;
        }

        let envelope = match delivery {
            Delivery::Broadcast(envelope) => envelope,
            Delivery::Request { envelope, reply } => {
                let e = SyncError::MessageDelivery(format!(
                    "{} is not a request the surface answers",
                    envelope.kind()
                ));
                answer(reply, IntentResponse::failed(&e));
                return;
            }
        };
        self.apply(envelope);
    }

    fn apply(&mut self, envelope: Envelope) {
        let Envelope { message, timestamp } = envelope;
        if self.panel.apply(&message, timestamp) == Applied::Stale {
            return;
        }

        match message {
            Message::PlaybackStarted { duration_ms } => self.highlight.set_duration(duration_ms),
            Message::PlaybackPaused { .. } => self.highlight.pause(),
            Message::PlaybackResumed { .. } => self.highlight.resume(),
            Message::PlaybackStopped { .. } => self.highlight.stop(),
            Message::SpeedChanged { speed } => self.highlight.set_speed(speed),
            Message::HighlightStart {
                text,
                duration_ms,
                speed,
            } => self
                .highlight
                .start(&text, self.selection, duration_ms, speed),
            Message::HighlightProgress { current_time_ms } => {
                self.highlight.on_progress(current_time_ms)
            }
            Message::PlaybackError { .. } | Message::AutoplayBlocked => {}

            Message::Unhandled { kind } => {
                log::warn!("surface: unhandled message kind {kind:?}");
            }
            other @ (Message::ControlPause
            | Message::ControlResume
            | Message::ControlStop
            | Message::ControlSpeedChange { .. }
            | Message::SpeakRequest { .. }
            | Message::EngineLoad { .. }
            | Message::EnginePlay
            | Message::EnginePause
            | Message::EngineResume
            | Message::EngineStop
            | Message::EngineSetSpeed { .. }
            | Message::EngineStatus
            | Message::InternalStateChanged { .. }) => {
                log::warn!("surface: {} is not addressed to the surface", other.kind());
            }
        }
    }

    // -----------------------------------------------------------------------
    // User input
    // -----------------------------------------------------------------------

    pub(crate) fn on_input(&mut self, input: UserInput, done: &mpsc::Sender<Completion>) {
        let now = self.clock.now_ms();
        let intent = match input {
            UserInput::Click(control) => self.panel.click(control, now),
            UserInput::ActivateNotice => self.panel.activate_notice(),
            UserInput::DismissNotice => {
                self.panel.dismiss_notice();
                None
            }
            UserInput::Speak { text, container } => {
                self.selection = container;
                self.speak(text);
                None
            }
        };
        if let Some(intent) = intent {
            self.send_intent(intent, done);
        }
    }

    fn speak(&self, text: String) {
        let envelope = Envelope::new(Message::SpeakRequest { text }, self.clock.as_ref());
        if let Err(e) = self.coordinator.broadcast(envelope) {
            log::warn!("surface: {e}");
        }
    }

    fn send_intent(&self, intent: Message, done: &mpsc::Sender<Completion>) {
        log::debug!("surface: → coordinator {}", intent.kind());
        let coordinator = self.coordinator.clone();
        let envelope = Envelope::new(intent, self.clock.as_ref());
        let timeout = self.request_timeout;
        let done = done.clone();
        tokio::spawn(async move {
            let result = coordinator.request(envelope, timeout).await;
            let _ = done.send(result).await;
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
