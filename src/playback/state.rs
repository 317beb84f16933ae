//! Playback status machine and the engine-owned [`PlaybackState`].
//!
//! [`PlaybackState`] is the single source of truth for audio state.  Only
//! [`PlaybackEngine`](super::PlaybackEngine) mutates it; every other context
//! sees snapshots carried in `internal-state-changed` envelopes.

use serde::{Deserialize, Serialize};

/// Slowest accepted playback rate.
pub const MIN_SPEED: f32 = 0.5;
/// Fastest accepted playback rate.
pub const MAX_SPEED: f32 = 2.0;

/// `true` when `rate` lies in `[MIN_SPEED, MAX_SPEED]`.
pub fn is_valid_speed(rate: f32) -> bool {
    rate.is_finite() && (MIN_SPEED..=MAX_SPEED).contains(&rate)
}

// ---------------------------------------------------------------------------
// PlaybackStatus
// ---------------------------------------------------------------------------

/// Status of the single audio session.
///
/// ```text
/// Idle ──load──▶ Loading ──play──▶ Playing ⇄ Paused
///                                    │         │
///          ◀──────stop / completion──┴─────────┘
/// Playing | Paused ──fault──▶ Error ──load──▶ Loading
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    Error,
}

impl PlaybackStatus {
    /// Returns `true` when audio is loaded and either running or held.
    ///
    /// ```
    /// use readalong::playback::PlaybackStatus;
    ///
    /// assert!(PlaybackStatus::Playing.is_active());
    /// assert!(PlaybackStatus::Paused.is_active());
    /// assert!(!PlaybackStatus::Loading.is_active());
    /// assert!(!PlaybackStatus::Idle.is_active());
    /// ```
    pub fn is_active(&self) -> bool {
        matches!(self, PlaybackStatus::Playing | PlaybackStatus::Paused)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PlaybackStatus::Idle => "idle",
            PlaybackStatus::Loading => "loading",
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Paused => "paused",
            PlaybackStatus::Error => "error",
        }
    }
}

// ---------------------------------------------------------------------------
// PlaybackState
// ---------------------------------------------------------------------------

/// Snapshot of the audio session.
///
/// `duration_secs > 0` whenever `status` is `Playing`, `Paused` or `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub status: PlaybackStatus,
    pub position_secs: f64,
    pub duration_secs: f64,
    pub speed: f32,
}

impl PlaybackState {
    pub fn position_ms(&self) -> u64 {
        secs_to_ms(self.position_secs)
    }

    pub fn duration_ms(&self) -> u64 {
        secs_to_ms(self.duration_secs)
    }

    /// Position on the speed-scaled timeline that sentence timings use.
    ///
    /// A sentence boundary at media time `t` is reached at `t / speed` on
    /// this timeline, so highlights stay aligned at any playback rate.
    pub fn timeline_ms(&self) -> u64 {
        let speed = f64::from(self.speed.max(MIN_SPEED));
        secs_to_ms(self.position_secs / speed)
    }

    /// Forget the loaded audio while keeping the user's speed.
    pub(crate) fn reset(&mut self) {
        self.status = PlaybackStatus::Idle;
        self.position_secs = 0.0;
        self.duration_secs = 0.0;
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            status: PlaybackStatus::Idle,
            position_secs: 0.0,
            duration_secs: 0.0,
            speed: 1.0,
        }
    }
}

fn secs_to_ms(secs: f64) -> u64 {
    (secs.max(0.0) * 1000.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_idle_at_normal_speed() {
        let st = PlaybackState::default();
        assert_eq!(st.status, PlaybackStatus::Idle);
        assert_eq!(st.position_ms(), 0);
        assert!((st.speed - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn speed_bounds_are_inclusive() {
        assert!(is_valid_speed(0.5));
        assert!(is_valid_speed(2.0));
        assert!(is_valid_speed(1.25));
        assert!(!is_valid_speed(0.49));
        assert!(!is_valid_speed(2.01));
        assert!(!is_valid_speed(f32::NAN));
    }

    #[test]
    fn reset_keeps_speed() {
        let mut st = PlaybackState {
            status: PlaybackStatus::Paused,
            position_secs: 4.2,
            duration_secs: 10.0,
            speed: 1.5,
        };
        st.reset();
        assert_eq!(st.status, PlaybackStatus::Idle);
        assert_eq!(st.position_ms(), 0);
        assert_eq!(st.duration_ms(), 0);
        assert!((st.speed - 1.5).abs() < f32::EPSILON);
    }

    #[test]
    fn timeline_scales_with_speed() {
        let st = PlaybackState {
            status: PlaybackStatus::Playing,
            position_secs: 2.0,
            duration_secs: 10.0,
            speed: 2.0,
        };
        assert_eq!(st.position_ms(), 2_000);
        assert_eq!(st.timeline_ms(), 1_000);
    }

    #[test]
    fn status_serialises_lowercase() {
        let json = serde_json::to_string(&PlaybackStatus::Paused).unwrap();
        assert_eq!(json, "\"paused\"");
    }
}
