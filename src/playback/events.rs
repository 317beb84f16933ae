//! Typed observer interface for engine events.
//!
//! The engine exposes [`PlaybackEngine::subscribe`](super::PlaybackEngine::subscribe)
//! instead of public callback fields.  Each event class has its own handler;
//! all handlers default to no-ops so an observer only implements what it
//! cares about.

use crate::error::SyncError;

use super::state::{PlaybackState, PlaybackStatus};

/// Receives engine events.  Handlers run synchronously inside the engine
/// call that produced them and must not call back into the engine.
pub trait PlaybackObserver {
    /// Any status transition, including pause, resume and stop.  `previous`
    /// is the status the engine left.
    fn on_status_change(&mut self, _previous: PlaybackStatus, _state: &PlaybackState) {}

    /// Periodic position update, only while playing.
    fn on_progress(&mut self, _state: &PlaybackState) {}

    /// The audio reached its natural end.
    fn on_completion(&mut self, _state: &PlaybackState) {}

    /// A decode or device fault with a real cause.
    fn on_error(&mut self, _error: &SyncError) {}
}

/// Boxed observer as stored by the engine.
pub type BoxedObserver = Box<dyn PlaybackObserver + Send>;

#[cfg(test)]
pub(crate) mod recording {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// One recorded event.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Recorded {
        Status(PlaybackStatus),
        Progress(u64),
        Completion,
        Error(SyncError),
    }

    /// Observer that appends every event to a shared log.
    #[derive(Clone, Default)]
    pub struct RecordingObserver {
        pub log: Arc<Mutex<Vec<Recorded>>>,
    }

    impl RecordingObserver {
        pub fn events(&self) -> Vec<Recorded> {
            self.log.lock().unwrap().clone()
        }
    }

    impl PlaybackObserver for RecordingObserver {
        fn on_status_change(&mut self, _previous: PlaybackStatus, state: &PlaybackState) {
            self.log.lock().unwrap().push(Recorded::Status(state.status));
        }

        fn on_progress(&mut self, state: &PlaybackState) {
            self.log
                .lock()
                .unwrap()
                .push(Recorded::Progress(state.position_ms()));
        }

        fn on_completion(&mut self, _state: &PlaybackState) {
            self.log.lock().unwrap().push(Recorded::Completion);
        }

        fn on_error(&mut self, error: &SyncError) {
            self.log.lock().unwrap().push(Recorded::Error(error.clone()));
        }
    }
}
