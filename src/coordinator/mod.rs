//! Stateless relay between the UI surface and the playback context.
//!
//! * [`Coordinator`] — the event loop: intent forwarding, event translation,
//!   session start.
//! * [`translate`] — engine status → UI notification mapping.
//! * [`Links`] — endpoints and collaborators shared with session tasks.
//!
//! Nothing here is authoritative.  Dropping the coordinator and building a
//! new one loses nothing: every notification is derived from the engine's
//! own transition.

pub mod links;
pub mod router;
pub mod session;
pub mod translate;

pub use links::Links;
pub use router::Coordinator;
pub use translate::translate;
