//! Session start: `speak-request` → synthesized audio playing.
//!
//! ```text
//! speak-request {text}
//!   └─▶ read preferences
//!   └─▶ synthesize (via cache)             ── Err → playback-error {category}
//!   └─▶ engine-status: active?             ── yes → playback-stopped(replaced)
//!   └─▶ engine-load                        ── Err → playback-error {playback}
//!   └─▶ engine-set-speed (preferred)      ── Ok → speed-changed
//!   └─▶ engine-play                        ── AutoplayBlocked → autoplay-blocked
//!   └─▶ highlight-start {text, durationMs, speed}   (if highlighting enabled)
//! ```
//!
//! The old audio keeps playing while the new clip is synthesized; it is
//! replaced only once there is something to replace it with.

use crate::config::Preferences;
use crate::message::{ErrorCategory, Message, StopReason};
use crate::playback::{is_valid_speed, PlaybackStatus};

use super::links::Links;

impl Links {
    pub async fn start_session(self, text: String) {
        let text = text.trim().to_string();
        if text.is_empty() {
            log::warn!("coordinator: ignoring speak request with empty text");
            return;
        }

        let prefs = match self.preferences.load() {
            Ok(p) => p,
            Err(e) => {
                log::warn!("coordinator: preferences unavailable, using defaults: {e:#}");
                Preferences::default()
            }
        };
        log::info!(
            "coordinator: new session ({} chars, voice {})",
            text.chars().count(),
            prefs.voice_id
        );

        let audio = match self.synthesizer.synthesize(&text, &prefs.voice_id).await {
            Ok(audio) => audio,
            Err(e) => {
                log::warn!("coordinator: synthesis failed: {e}");
                self.notify(Message::PlaybackError {
                    message: e.to_string(),
                    category: e.category(),
                });
                return;
            }
        };

        match self.request_engine(Message::EngineStatus).await {
            Ok(resp) => {
                let busy = resp.state.is_some_and(|s| {
                    matches!(
                        s.status,
                        PlaybackStatus::Loading | PlaybackStatus::Playing | PlaybackStatus::Paused
                    )
                });
                if busy {
                    self.notify(Message::PlaybackStopped {
                        reason: StopReason::Replaced,
                    });
                }
            }
            Err(e) => log::warn!("coordinator: {e}"),
        }

        let duration_ms = match self.request_engine(Message::EngineLoad { audio }).await {
            Ok(resp) if resp.success => resp.duration_ms.unwrap_or_default(),
            Ok(resp) => {
                self.notify(Message::PlaybackError {
                    message: resp.error.unwrap_or_else(|| "could not load audio".into()),
                    category: ErrorCategory::Playback,
                });
                return;
            }
            Err(e) => {
                log::warn!("coordinator: {e}");
                self.notify(Message::PlaybackError {
                    message: e.user_message(),
                    category: ErrorCategory::Playback,
                });
                return;
            }
        };

        let speed = if is_valid_speed(prefs.speed) {
            prefs.speed
        } else {
            log::warn!("coordinator: stored speed {} out of range, using 1.0", prefs.speed);
            1.0
        };
        match self.request_engine(Message::EngineSetSpeed { speed }).await {
            Ok(resp) if !resp.success => {
                log::warn!("coordinator: speed not applied: {:?}", resp.error)
            }
            Ok(_) => self.notify(Message::SpeedChanged { speed }),
            Err(e) => log::warn!("coordinator: {e}"),
        }

        match self.request_engine(Message::EnginePlay).await {
            Ok(resp) if resp.success => {}
            Ok(resp) if resp.is_autoplay_blocked() => {
                log::info!("coordinator: autoplay blocked, offering play affordance");
                self.notify(Message::AutoplayBlocked);
            }
            Ok(resp) => {
                self.notify(Message::PlaybackError {
                    message: resp.error.unwrap_or_else(|| "playback failed".into()),
                    category: ErrorCategory::Playback,
                });
                return;
            }
            Err(e) => {
                log::warn!("coordinator: {e}");
                return;
            }
        }

        if prefs.highlighting_enabled {
            self.notify(Message::HighlightStart {
                text,
                duration_ms,
                speed,
            });
        }
    }
}
