//! Playback context: the audio state machine and the thread that hosts it.
//!
//! * [`state`]  — [`PlaybackState`] / [`PlaybackStatus`] and the speed range.
//! * [`output`] — the [`AudioOutput`] device seam and [`RodioOutput`].
//! * [`events`] — the [`PlaybackObserver`] interface.
//! * [`engine`] — [`PlaybackEngine`], the single source of truth for audio.
//! * [`host`]   — [`PlaybackHost`] and [`spawn_playback_context`].

pub mod engine;
pub mod events;
pub mod host;
pub mod output;
pub mod state;

pub use engine::PlaybackEngine;
pub use events::{BoxedObserver, PlaybackObserver};
pub use host::{spawn_playback_context, PlaybackHost};
pub use output::{AudioOutput, OutputError, OutputStatus, RodioOutput};
pub use state::{is_valid_speed, PlaybackState, PlaybackStatus, MAX_SPEED, MIN_SPEED};
