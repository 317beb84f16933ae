//! Error taxonomy shared by all three contexts.
//!
//! [`SyncError`] never crosses a context boundary as a Rust value: the
//! coordinator flattens it into an [`IntentResponse`](crate::bus::IntentResponse)
//! (`success = false`, `error = to_string()`, `code = code()`) or into a
//! `playback-error` notification.

use thiserror::Error;

use crate::playback::state::{MAX_SPEED, MIN_SPEED};

// ---------------------------------------------------------------------------
// SyncError
// ---------------------------------------------------------------------------

/// Everything that can go wrong while keeping the contexts in sync.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// `play` / `resume` was requested before any audio was loaded.
    #[error("no audio is loaded")]
    NoAudioLoaded,

    /// The host refused to start playback without a user gesture.
    ///
    /// Recoverable: the user can retry from the panel.
    #[error("playback is waiting for a user gesture")]
    AutoplayBlocked,

    /// The supplied audio bytes could not be decoded.
    #[error("could not load audio: {0}")]
    Load(String),

    /// Decode or device failure while audio was running.
    #[error("playback failed: {0}")]
    Playback(String),

    /// Speed outside the supported range.
    #[error("speed {0} is outside the supported range 0.5..=2.0")]
    InvalidSpeed(f32),

    /// The receiving context was unreachable or did not answer in time.
    #[error("message could not be delivered: {0}")]
    MessageDelivery(String),

    /// Timestamp outside the accepted window; logged and dropped.
    #[error("stale message: {0}")]
    StaleMessage(String),
}

impl SyncError {
    /// Stable machine-readable code carried in intent responses.
    pub fn code(&self) -> &'static str {
        match self {
            SyncError::NoAudioLoaded => "no-audio-loaded",
            SyncError::AutoplayBlocked => "autoplay-blocked",
            SyncError::Load(_) => "load-error",
            SyncError::Playback(_) => "playback-error",
            SyncError::InvalidSpeed(_) => "invalid-speed",
            SyncError::MessageDelivery(_) => "message-delivery-failure",
            SyncError::StaleMessage(_) => "stale-message",
        }
    }

    /// Sentence suitable for the transient notice shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            SyncError::NoAudioLoaded => "Nothing to play yet.".into(),
            SyncError::AutoplayBlocked => "Click play to start listening.".into(),
            SyncError::Load(_) => "The audio could not be opened.".into(),
            SyncError::Playback(detail) => format!("Playback stopped unexpectedly ({detail})."),
            SyncError::InvalidSpeed(speed) => {
                format!(
                    "Speed {speed}x is not supported (use {}x to {}x).",
                    MIN_SPEED, MAX_SPEED
                )
            }
            SyncError::MessageDelivery(_) => "The player is not responding.".into(),
            SyncError::StaleMessage(_) => "An outdated update was ignored.".into(),
        }
    }

    /// `true` when the user can fix the condition with a single action.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SyncError::AutoplayBlocked)
    }
}
