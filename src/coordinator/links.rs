//! Handles the coordinator needs to reach everything else.

use std::sync::Arc;
use std::time::Duration;

use crate::bus::{Endpoint, IntentResponse};
use crate::clock::SharedClock;
use crate::config::PreferenceStore;
use crate::error::SyncError;
use crate::message::{Envelope, Message};
use crate::tts::SpeechSynthesizer;

/// Cloneable bundle of endpoints and collaborators.
///
/// Session-start tasks run detached from the main loop, so everything they
/// touch lives here rather than on [`Coordinator`](super::Coordinator).
#[derive(Clone)]
pub struct Links {
    pub engine: Endpoint,
    pub surface: Endpoint,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub clock: SharedClock,
    pub request_timeout: Duration,
}

impl Links {
    pub fn new(
        engine: Endpoint,
        surface: Endpoint,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        preferences: Arc<dyn PreferenceStore>,
        clock: SharedClock,
        request_timeout: Duration,
    ) -> Self {
        Self {
            engine,
            surface,
            synthesizer,
            preferences,
            clock,
            request_timeout,
        }
    }

    pub fn stamp(&self, message: Message) -> Envelope {
        Envelope::new(message, self.clock.as_ref())
    }

    /// Request/response exchange with the playback context.
    pub async fn request_engine(&self, message: Message) -> Result<IntentResponse, SyncError> {
        self.engine
            .request(self.stamp(message), self.request_timeout)
            .await
    }

    /// Broadcast to the UI surface.  Failures are logged, never raised.
    pub fn notify(&self, message: Message) {
        let kind = message.kind().to_string();
        match self.surface.broadcast(self.stamp(message)) {
            Ok(()) => log::debug!("coordinator: → surface {kind}"),
            Err(e) => log::warn!("coordinator: {e}"),
        }
    }
}
