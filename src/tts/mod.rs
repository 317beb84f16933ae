//! Network text-to-speech collaborator.
//!
//! * [`SpeechSynthesizer`] — async trait implemented by every backend.
//! * [`ApiSynthesizer`] — hosted REST API backend.
//! * [`CachedSynthesizer`] — wraps any synthesizer with a bounded LRU.
//! * [`SynthError`] — failures, each mapped to a user-facing category.

pub mod cache;
pub mod synthesizer;

pub use cache::CachedSynthesizer;
pub use synthesizer::{ApiSynthesizer, SpeechSynthesizer, SynthError};
