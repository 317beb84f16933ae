//! `{kind, payload, timestamp}` envelopes and timestamp checks.
//!
//! Every message between contexts travels in an [`Envelope`].  Receivers run
//! [`Freshness::check`] before acting: envelopes older than the staleness
//! window, or stamped too far in the receiver's future, are logged and
//! dropped.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::clock::Clock;
use crate::config::SyncConfig;
use crate::error::SyncError;

use super::kinds::Message;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub message: Message,
    /// Sender clock, milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// Wire form of an envelope.
#[derive(Debug, Serialize, Deserialize)]
struct WireEnvelope {
    kind: String,
    #[serde(default)]
    payload: Value,
    timestamp: i64,
}

/// Failures decoding an envelope from JSON.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl Envelope {
    /// Stamp `message` with the sender's clock.
    pub fn new(message: Message, clock: &dyn Clock) -> Self {
        Self {
            message,
            timestamp: clock.now_ms(),
        }
    }

    pub fn kind(&self) -> &str {
        self.message.kind()
    }

    pub fn to_json(&self) -> Result<String, EnvelopeError> {
        let wire = WireEnvelope {
            kind: self.message.kind().to_string(),
            payload: self.message.payload(),
            timestamp: self.timestamp,
        };
        Ok(serde_json::to_string(&wire)?)
    }

    pub fn from_json(text: &str) -> Result<Self, EnvelopeError> {
        let wire: WireEnvelope = serde_json::from_str(text)?;
        let payload = match wire.payload {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        Ok(Self {
            message: Message::from_parts(&wire.kind, payload)?,
            timestamp: wire.timestamp,
        })
    }
}

// ---------------------------------------------------------------------------
// Freshness
// ---------------------------------------------------------------------------

/// Acceptance window for envelope timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Freshness {
    /// Envelopes older than this are stale.
    pub stale_after_ms: i64,
    /// Envelopes stamped further than this ahead of the receiver are
    /// rejected as clock skew.
    pub future_tolerance_ms: i64,
}

impl Freshness {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            stale_after_ms: config.stale_after_ms as i64,
            future_tolerance_ms: config.future_tolerance_ms as i64,
        }
    }

    /// `Ok(())` when `envelope` may be acted on at receiver time `now_ms`.
    ///
    /// Any `i64` stamp is accepted as input; extreme values saturate and are
    /// rejected.
    pub fn check(&self, envelope: &Envelope, now_ms: i64) -> Result<(), SyncError> {
        let age = now_ms.saturating_sub(envelope.timestamp);
        if age > self.stale_after_ms {
            return Err(SyncError::StaleMessage(format!(
                "{} is {age} ms old",
                envelope.kind()
            )));
        }
        let ahead = envelope.timestamp.saturating_sub(now_ms);
        if ahead > self.future_tolerance_ms {
            return Err(SyncError::StaleMessage(format!(
                "{} is stamped {ahead} ms in the future",
                envelope.kind()
            )));
        }
        Ok(())
    }
}

impl Default for Freshness {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::message::StopReason;

    #[test]
    fn json_shape_matches_wire_contract() {
        let env = Envelope {
            message: Message::PlaybackStarted { duration_ms: 3_000 },
            timestamp: 42,
        };
        let value: Value = serde_json::from_str(&env.to_json().unwrap()).unwrap();
        assert_eq!(value["kind"], "playback-started");
        assert_eq!(value["payload"]["durationMs"], 3_000);
        assert_eq!(value["timestamp"], 42);
    }

    #[test]
    fn decodes_envelope_without_payload() {
        let env = Envelope::from_json(r#"{"kind":"control-stop","timestamp":7}"#).unwrap();
        assert_eq!(env.message, Message::ControlStop);
        assert_eq!(env.timestamp, 7);
    }

    #[test]
    fn decodes_unknown_kind_as_unhandled() {
        let env =
            Envelope::from_json(r#"{"kind":"ping","payload":{"n":1},"timestamp":1}"#).unwrap();
        assert!(matches!(env.message, Message::Unhandled { .. }));
    }

    #[test]
    fn rejects_missing_timestamp() {
        assert!(Envelope::from_json(r#"{"kind":"control-stop","payload":{}}"#).is_err());
    }

    #[test]
    fn new_uses_sender_clock() {
        let clock = ManualClock::new(9_000);
        let env = Envelope::new(
            Message::PlaybackStopped {
                reason: StopReason::User,
            },
            &clock,
        );
        assert_eq!(env.timestamp, 9_000);
    }

    #[test]
    fn freshness_window() {
        let fresh = Freshness {
            stale_after_ms: 5_000,
            future_tolerance_ms: 1_000,
        };
        let env = |ts| Envelope {
            message: Message::ControlPause,
            timestamp: ts,
        };

        assert!(fresh.check(&env(10_000), 10_000).is_ok());
        assert!(fresh.check(&env(5_000), 10_000).is_ok());
        assert!(fresh.check(&env(4_999), 10_000).is_err());
        assert!(fresh.check(&env(11_000), 10_000).is_ok());
        assert!(matches!(
            fresh.check(&env(11_001), 10_000),
            Err(SyncError::StaleMessage(_))
        ));
    }

    #[test]
    fn freshness_rejects_extreme_stamps() {
        let fresh = Freshness::default();
        let env = |ts| Envelope {
            message: Message::ControlStop,
            timestamp: ts,
        };
        for now in [0, 1_700_000_000_000, i64::MAX] {
            assert!(fresh.check(&env(i64::MIN), now).is_err());
        }
        for now in [0, 1_700_000_000_000, i64::MIN] {
            assert!(matches!(
                fresh.check(&env(i64::MAX), now),
                Err(SyncError::StaleMessage(_))
            ));
        }
    }

    #[test]
    fn extreme_stamp_survives_the_wire() {
        let text = format!(r#"{{"kind":"control-stop","timestamp":{}}}"#, i64::MIN);
        let env = Envelope::from_json(&text).unwrap();
        assert!(Freshness::default().check(&env, 0).is_err());
    }
}
