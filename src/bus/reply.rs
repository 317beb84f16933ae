//! `{success, error?}` answers to intent and engine requests.

use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::playback::PlaybackState;

/// Direct answer to a request.
///
/// Intents from the UI surface only look at `success` / `error`.  Engine
/// requests may also carry the loaded duration or a state snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Stable [`SyncError::code`] of the failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<PlaybackState>,
}

impl IntentResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_state(mut self, state: PlaybackState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn failed(error: &SyncError) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            code: Some(error.code().to_string()),
            ..Self::default()
        }
    }

    pub fn from_result(result: Result<(), SyncError>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(e) => Self::failed(&e),
        }
    }

    pub fn is_autoplay_blocked(&self) -> bool {
        self.code.as_deref() == Some(SyncError::AutoplayBlocked.code())
    }
}
