//! Closed set of message kinds exchanged between the three contexts.
//!
//! [`Message`] is matched exhaustively everywhere it is consumed.  A kind
//! that this build does not know decodes to [`Message::Unhandled`] rather
//! than being dropped by a catch-all branch, so receivers can log it.
//!
//! # Wire mapping
//!
//! | kind | payload |
//! |------|---------|
//! | `playback-started` | `{durationMs}` |
//! | `playback-paused` / `playback-resumed` | `{positionMs}` |
//! | `playback-stopped` | `{reason}` |
//! | `playback-error` | `{message, category}` |
//! | `autoplay-blocked` | `{}` |
//! | `speed-changed` | `{speed}` |
//! | `highlight-start` | `{text, durationMs, speed}` |
//! | `highlight-progress` | `{currentTimeMs}` |
//! | `control-pause` / `control-resume` / `control-stop` | `{}` |
//! | `control-speed-change` | `{speed}` |
//! | `speak-request` | `{text}` |
//! | `engine-load` | `{audio}` (base64) |
//! | `engine-play` / `engine-pause` / `engine-resume` / `engine-stop` / `engine-status` | `{}` |
//! | `engine-set-speed` | `{speed}` |
//! | `internal-state-changed` | `{previous, status, positionMs, durationMs}` |

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::playback::PlaybackStatus;

// ---------------------------------------------------------------------------
// Payload enums
// ---------------------------------------------------------------------------

/// Why the control surface should go away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopReason {
    /// The user pressed stop.
    User,
    /// The audio played to the end.
    Ended,
    /// A playback fault ended the session.
    Error,
    /// A newer session superseded this one.
    Replaced,
}

/// User-facing grouping of failures for the transient notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Missing or rejected API key.
    Authentication,
    /// Character quota or rate limit exhausted.
    Quota,
    /// The speech service could not be reached.
    Network,
    /// The speech service answered with an error.
    Service,
    /// Audio could not be decoded or played.
    Playback,
}

impl ErrorCategory {
    pub fn title(&self) -> &'static str {
        match self {
            ErrorCategory::Authentication => "Check your API key",
            ErrorCategory::Quota => "Speech quota reached",
            ErrorCategory::Network => "Speech service unreachable",
            ErrorCategory::Service => "Speech service error",
            ErrorCategory::Playback => "Playback problem",
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    // ── Coordinator → UI surface ────────────────────────────────────────
    PlaybackStarted { duration_ms: u64 },
    PlaybackPaused { position_ms: u64 },
    PlaybackResumed { position_ms: u64 },
    PlaybackStopped { reason: StopReason },
    PlaybackError { message: String, category: ErrorCategory },
    AutoplayBlocked,
    SpeedChanged { speed: f32 },
    HighlightStart { text: String, duration_ms: u64, speed: f32 },
    HighlightProgress { current_time_ms: u64 },

    // ── UI surface → coordinator (intents) ──────────────────────────────
    ControlPause,
    ControlResume,
    ControlStop,
    ControlSpeedChange { speed: f32 },

    // ── Text retrieval → coordinator ────────────────────────────────────
    SpeakRequest { text: String },

    // ── Coordinator → playback engine ───────────────────────────────────
    EngineLoad { audio: Vec<u8> },
    EnginePlay,
    EnginePause,
    EngineResume,
    EngineStop,
    EngineSetSpeed { speed: f32 },
    EngineStatus,

    // ── Playback engine → coordinator ───────────────────────────────────
    InternalStateChanged {
        /// Status the engine left; `loading` marks the first play of a clip.
        previous: PlaybackStatus,
        status: PlaybackStatus,
        position_ms: u64,
        duration_ms: u64,
    },

    /// A kind this build does not understand.
    Unhandled { kind: String },
}

impl Message {
    /// The wire `kind` string.
    pub fn kind(&self) -> &str {
        match self {
            Message::PlaybackStarted { .. } => "playback-started",
            Message::PlaybackPaused { .. } => "playback-paused",
            Message::PlaybackResumed { .. } => "playback-resumed",
            Message::PlaybackStopped { .. } => "playback-stopped",
            Message::PlaybackError { .. } => "playback-error",
            Message::AutoplayBlocked => "autoplay-blocked",
            Message::SpeedChanged { .. } => "speed-changed",
            Message::HighlightStart { .. } => "highlight-start",
            Message::HighlightProgress { .. } => "highlight-progress",
            Message::ControlPause => "control-pause",
            Message::ControlResume => "control-resume",
            Message::ControlStop => "control-stop",
            Message::ControlSpeedChange { .. } => "control-speed-change",
            Message::SpeakRequest { .. } => "speak-request",
            Message::EngineLoad { .. } => "engine-load",
            Message::EnginePlay => "engine-play",
            Message::EnginePause => "engine-pause",
            Message::EngineResume => "engine-resume",
            Message::EngineStop => "engine-stop",
            Message::EngineSetSpeed { .. } => "engine-set-speed",
            Message::EngineStatus => "engine-status",
            Message::InternalStateChanged { .. } => "internal-state-changed",
            Message::Unhandled { kind } => kind,
        }
    }

    /// `true` for the confirmed-state notifications the control panel
    /// orders by timestamp.
    pub fn is_playback_notification(&self) -> bool {
        matches!(
            self,
            Message::PlaybackStarted { .. }
                | Message::PlaybackPaused { .. }
                | Message::PlaybackResumed { .. }
                | Message::PlaybackStopped { .. }
        )
    }

    /// Encode the payload object for the wire.
    pub fn payload(&self) -> Value {
        match self {
            Message::PlaybackStarted { duration_ms } => json!({ "durationMs": duration_ms }),
            Message::PlaybackPaused { position_ms } | Message::PlaybackResumed { position_ms } => {
                json!({ "positionMs": position_ms })
            }
            Message::PlaybackStopped { reason } => json!({ "reason": reason }),
            Message::PlaybackError { message, category } => {
                json!({ "message": message, "category": category })
            }
            Message::SpeedChanged { speed }
            | Message::ControlSpeedChange { speed }
            | Message::EngineSetSpeed { speed } => json!({ "speed": speed }),
            Message::HighlightStart {
                text,
                duration_ms,
                speed,
            } => json!({ "text": text, "durationMs": duration_ms, "speed": speed }),
            Message::HighlightProgress { current_time_ms } => {
                json!({ "currentTimeMs": current_time_ms })
            }
            Message::SpeakRequest { text } => json!({ "text": text }),
            Message::EngineLoad { audio } => json!({
                "audio": base64::engine::general_purpose::STANDARD.encode(audio)
            }),
            Message::InternalStateChanged {
                previous,
                status,
                position_ms,
                duration_ms,
            } => json!({
                "previous": previous,
                "status": status,
                "positionMs": position_ms,
                "durationMs": duration_ms,
            }),
            Message::AutoplayBlocked
            | Message::ControlPause
            | Message::ControlResume
            | Message::ControlStop
            | Message::EnginePlay
            | Message::EnginePause
            | Message::EngineResume
            | Message::EngineStop
            | Message::EngineStatus
            | Message::Unhandled { .. } => json!({}),
        }
    }

    /// Decode a `(kind, payload)` pair.  Unknown kinds become
    /// [`Message::Unhandled`]; a known kind with a malformed payload is an
    /// error.
    pub fn from_parts(kind: &str, payload: Value) -> Result<Self, serde_json::Error> {
        let msg = match kind {
            "playback-started" => {
                let p: DurationPayload = serde_json::from_value(payload)?;
                Message::PlaybackStarted {
                    duration_ms: p.duration_ms,
                }
            }
            "playback-paused" => {
                let p: PositionPayload = serde_json::from_value(payload)?;
                Message::PlaybackPaused {
                    position_ms: p.position_ms,
                }
            }
            "playback-resumed" => {
                let p: PositionPayload = serde_json::from_value(payload)?;
                Message::PlaybackResumed {
                    position_ms: p.position_ms,
                }
            }
            "playback-stopped" => {
                let p: StoppedPayload = serde_json::from_value(payload)?;
                Message::PlaybackStopped { reason: p.reason }
            }
            "playback-error" => {
                let p: ErrorPayload = serde_json::from_value(payload)?;
                Message::PlaybackError {
                    message: p.message,
                    category: p.category,
                }
            }
            "autoplay-blocked" => Message::AutoplayBlocked,
            "speed-changed" => Message::SpeedChanged {
                speed: serde_json::from_value::<SpeedPayload>(payload)?.speed,
            },
            "highlight-start" => {
                let p: HighlightStartPayload = serde_json::from_value(payload)?;
                Message::HighlightStart {
                    text: p.text,
                    duration_ms: p.duration_ms,
                    speed: p.speed,
                }
            }
            "highlight-progress" => {
                let p: ProgressPayload = serde_json::from_value(payload)?;
                Message::HighlightProgress {
                    current_time_ms: p.current_time_ms,
                }
            }
            "control-pause" => Message::ControlPause,
            "control-resume" => Message::ControlResume,
            "control-stop" => Message::ControlStop,
            "control-speed-change" => Message::ControlSpeedChange {
                speed: serde_json::from_value::<SpeedPayload>(payload)?.speed,
            },
            "speak-request" => Message::SpeakRequest {
                text: serde_json::from_value::<TextPayload>(payload)?.text,
            },
            "engine-load" => {
                let p: AudioPayload = serde_json::from_value(payload)?;
                let audio = base64::engine::general_purpose::STANDARD
                    .decode(p.audio.as_bytes())
                    .map_err(serde::de::Error::custom)?;
                Message::EngineLoad { audio }
            }
            "engine-play" => Message::EnginePlay,
            "engine-pause" => Message::EnginePause,
            "engine-resume" => Message::EngineResume,
            "engine-stop" => Message::EngineStop,
            "engine-set-speed" => Message::EngineSetSpeed {
                speed: serde_json::from_value::<SpeedPayload>(payload)?.speed,
            },
            "engine-status" => Message::EngineStatus,
            "internal-state-changed" => {
                let p: StatePayload = serde_json::from_value(payload)?;
                Message::InternalStateChanged {
                    previous: p.previous,
                    status: p.status,
                    position_ms: p.position_ms,
                    duration_ms: p.duration_ms,
                }
            }
            other => Message::Unhandled {
                kind: other.to_string(),
            },
        };
        Ok(msg)
    }
}

// ---------------------------------------------------------------------------
// Payload shapes (decode side)
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DurationPayload {
    duration_ms: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PositionPayload {
    position_ms: u64,
}

#[derive(Deserialize)]
struct StoppedPayload {
    reason: StopReason,
}

#[derive(Deserialize)]
struct ErrorPayload {
    message: String,
    category: ErrorCategory,
}

#[derive(Deserialize)]
struct SpeedPayload {
    speed: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HighlightStartPayload {
    text: String,
    duration_ms: u64,
    speed: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProgressPayload {
    current_time_ms: u64,
}

#[derive(Deserialize)]
struct TextPayload {
    text: String,
}

#[derive(Deserialize)]
struct AudioPayload {
    audio: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatePayload {
    #[serde(default)]
    previous: PlaybackStatus,
    status: PlaybackStatus,
    position_ms: u64,
    duration_ms: u64,
}
