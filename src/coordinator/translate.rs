//! Engine status → UI notification mapping.
//!
//! | engine transition | notification |
//! |-------------------|--------------|
//! | `loading → playing` | `playback-started {durationMs}` |
//! | `* → playing` | `playback-resumed {positionMs}` |
//! | `* → paused` | `playback-paused {positionMs}` |
//! | `* → idle` | `playback-stopped {reason: ended}` |
//! | `* → error` | `playback-stopped {reason: error}` |
//! | `* → loading` | — |
//!
//! The first play of a clip is recognised from the engine's own transition,
//! so a coordinator started after the load still announces it correctly.

use crate::message::{Message, StopReason};
use crate::playback::PlaybackStatus;

/// Notification for one `internal-state-changed` event, if any.
pub fn translate(
    previous: PlaybackStatus,
    status: PlaybackStatus,
    position_ms: u64,
    duration_ms: u64,
) -> Option<Message> {
    match status {
        PlaybackStatus::Playing if previous == PlaybackStatus::Loading => {
            Some(Message::PlaybackStarted { duration_ms })
        }
        PlaybackStatus::Playing => Some(Message::PlaybackResumed { position_ms }),
        PlaybackStatus::Paused => Some(Message::PlaybackPaused { position_ms }),
        PlaybackStatus::Idle => Some(Message::PlaybackStopped {
            reason: StopReason::Ended,
        }),
        PlaybackStatus::Error => Some(Message::PlaybackStopped {
            reason: StopReason::Error,
        }),
        PlaybackStatus::Loading => None,
    }
}
