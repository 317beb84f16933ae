//! Read-aloud playback synchronisation.
//!
//! Three isolated contexts exchange timestamped [`message::Envelope`]s over
//! the [`bus`]:
//!
//! ```text
//!  surface (panel + highlight) ◀──notifications── coordinator ◀──events── playback
//!          │                                        │   ▲                    ▲
//!          └──────────── control-* intents ─────────┘   └──── engine-* ──────┘
//! ```
//!
//! * [`playback`]    — the authoritative audio state machine.
//! * [`coordinator`] — stateless relay and session start.
//! * [`surface`]     — control panel and sentence highlighting.
//! * [`tts`]         — network speech synthesis.

pub mod bus;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod message;
pub mod playback;
pub mod surface;
pub mod tts;
