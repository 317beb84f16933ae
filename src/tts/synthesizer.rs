//! Core `SpeechSynthesizer` trait and `ApiSynthesizer` implementation.
//!
//! `ApiSynthesizer` calls `POST {base_url}/v1/text-to-speech/{voice_id}` and
//! returns the encoded audio bytes.  All connection details come from
//! [`TtsConfig`]; nothing is hardcoded.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::TtsConfig;
use crate::message::ErrorCategory;

// ---------------------------------------------------------------------------
// SynthError
// ---------------------------------------------------------------------------

/// Errors that can occur while synthesizing speech.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SynthError {
    /// No API key is configured.
    #[error("no speech API key configured")]
    MissingApiKey,

    /// The service rejected the key (HTTP 401 / 403).
    #[error("speech service rejected the API key (HTTP {0})")]
    Unauthorized(u16),

    /// Character quota or rate limit exhausted (HTTP 402 / 429).
    #[error("speech quota exhausted (HTTP {0})")]
    Quota(u16),

    /// Any other non-success status.
    #[error("speech service error (HTTP {status}): {detail}")]
    Service { status: u16, detail: String },

    /// The request did not complete within the configured timeout.
    #[error("speech request timed out")]
    Timeout,

    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The service answered 2xx with an empty body.
    #[error("speech service returned no audio")]
    EmptyAudio,
}

impl SynthError {
    /// User-facing grouping for the error notice.
    pub fn category(&self) -> ErrorCategory {
        match self {
            SynthError::MissingApiKey | SynthError::Unauthorized(_) => {
                ErrorCategory::Authentication
            }
            SynthError::Quota(_) => ErrorCategory::Quota,
            SynthError::Timeout | SynthError::Request(_) => ErrorCategory::Network,
            SynthError::Service { .. } | SynthError::EmptyAudio => ErrorCategory::Service,
        }
    }

    /// Map a non-success HTTP status to an error.
    pub fn from_status(status: u16, detail: impl Into<String>) -> Self {
        match status {
            401 | 403 => SynthError::Unauthorized(status),
            402 | 429 => SynthError::Quota(status),
            _ => SynthError::Service {
                status,
                detail: detail.into(),
            },
        }
    }
}

impl From<reqwest::Error> for SynthError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SynthError::Timeout
        } else {
            SynthError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// SpeechSynthesizer trait
// ---------------------------------------------------------------------------

/// Async trait for text-to-speech backends.
///
/// Implementors must be `Send + Sync` so the coordinator can hold them as
/// `Arc<dyn SpeechSynthesizer>`.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Encoded audio (MP3 or WAV) for `text` spoken by `voice_id`.
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, SynthError>;
}

// ---------------------------------------------------------------------------
// ApiSynthesizer
// ---------------------------------------------------------------------------

/// Calls a hosted text-to-speech REST endpoint.
pub struct ApiSynthesizer {
    client: reqwest::Client,
    config: TtsConfig,
}

impl ApiSynthesizer {
    /// Build an `ApiSynthesizer` from application config.
    ///
    /// The HTTP client carries the per-request timeout from
    /// `config.timeout_secs`.
    pub fn from_config(config: &TtsConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    fn endpoint(&self, voice_id: &str) -> String {
        format!(
            "{}/v1/text-to-speech/{}",
            self.config.base_url.trim_end_matches('/'),
            voice_id
        )
    }
}

#[async_trait]
impl SpeechSynthesizer for ApiSynthesizer {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, SynthError> {
        let key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(SynthError::MissingApiKey)?;

        let body = serde_json::json!({
            "text":     text,
            "model_id": self.config.model,
        });

        log::debug!(
            "tts: requesting {} chars with voice {voice_id}",
            text.chars().count()
        );
        let response = self
            .client
            .post(self.endpoint(voice_id))
            .header("xi-api-key", key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SynthError::from_status(status.as_u16(), detail));
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(SynthError::EmptyAudio);
        }
        Ok(audio.to_vec())
    }
}

// ---------------------------------------------------------------------------
// ScriptedSynthesizer (test double)
// ---------------------------------------------------------------------------

/// Returns a fixed result and counts calls.
#[cfg(test)]
#[derive(Clone)]
pub struct ScriptedSynthesizer {
    pub result: std::sync::Arc<std::sync::Mutex<Result<Vec<u8>, SynthError>>>,
    pub calls: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

#[cfg(test)]
impl ScriptedSynthesizer {
    pub fn returning(result: Result<Vec<u8>, SynthError>) -> Self {
        Self {
            result: std::sync::Arc::new(std::sync::Mutex::new(result)),
            calls: Default::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl SpeechSynthesizer for ScriptedSynthesizer {
    async fn synthesize(&self, _text: &str, _voice_id: &str) -> Result<Vec<u8>, SynthError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.result.lock().unwrap().clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config(api_key: Option<&str>) -> TtsConfig {
        TtsConfig {
            base_url: "http://localhost:9/".into(),
            api_key: api_key.map(|s| s.to_string()),
            ..TtsConfig::default()
        }
    }

    #[test]
    fn status_mapping() {
        assert_eq!(SynthError::from_status(401, ""), SynthError::Unauthorized(401));
        assert_eq!(SynthError::from_status(403, ""), SynthError::Unauthorized(403));
        assert_eq!(SynthError::from_status(402, ""), SynthError::Quota(402));
        assert_eq!(SynthError::from_status(429, ""), SynthError::Quota(429));
        assert!(matches!(
            SynthError::from_status(503, "down"),
            SynthError::Service { status: 503, .. }
        ));
    }

    #[test]
    fn categories() {
        assert_eq!(SynthError::MissingApiKey.category(), ErrorCategory::Authentication);
        assert_eq!(SynthError::Quota(429).category(), ErrorCategory::Quota);
        assert_eq!(SynthError::Timeout.category(), ErrorCategory::Network);
        assert_eq!(
            SynthError::Request("refused".into()).category(),
            ErrorCategory::Network
        );
        assert_eq!(SynthError::EmptyAudio.category(), ErrorCategory::Service);
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let synth = ApiSynthesizer::from_config(&make_config(Some("k")));
        assert_eq!(
            synth.endpoint("voice-1"),
            "http://localhost:9/v1/text-to-speech/voice-1"
        );
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let synth = ApiSynthesizer::from_config(&make_config(Some("")));
        let err = synth.synthesize("hello", "v").await.unwrap_err();
        assert_eq!(err, SynthError::MissingApiKey);
    }

    #[test]
    fn synthesizer_is_object_safe() {
        let synth: Box<dyn SpeechSynthesizer> =
            Box::new(ApiSynthesizer::from_config(&make_config(None)));
        drop(synth);
    }
}
