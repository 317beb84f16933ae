//! Sentence-level text highlighting synchronized with playback.
//!
//! * [`sentence`] — split the selection into [`Sentence`]s.
//! * [`timing`]   — proportional [`SentenceTiming`] map on the speed-scaled
//!   timeline.
//! * [`document`] — the [`HighlightSurface`] seam and [`TextDocument`].
//! * [`engine`]   — [`HighlightEngine`], walking timings on progress ticks.

pub mod document;
pub mod engine;
pub mod sentence;
pub mod timing;

pub use document::{ContainerId, HighlightHandle, HighlightSurface, TextDocument, Viewport};
pub use engine::{HighlightEngine, HighlightState};
pub use sentence::{split_sentences, Sentence};
pub use timing::{compute_timings, find_sentence_at, SentenceTiming};
