//! Message envelopes and the closed set of message kinds.

pub mod envelope;
pub mod kinds;

pub use envelope::{Envelope, EnvelopeError, Freshness};
pub use kinds::{ErrorCategory, Message, StopReason};
