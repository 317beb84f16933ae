//! Floating control panel state machine.
//!
//! ```text
//!            started                 paused
//!  Hidden ───────────▶ ShowingPlaying ───────▶ ShowingPaused
//!    ▲                      ▲      ◀─────────        │
//!    │                      │        resumed         │
//!    └──────── stopped ─────┴────────────────────────┘
//! ```
//!
//! Transitions come from two sources:
//!
//! * **Confirmed notifications** from the coordinator.  They are
//!   authoritative, idempotent and ordered by envelope timestamp: one older
//!   than the last applied notification is discarded.
//! * **Optimistic clicks.**  The button flips immediately and an intent goes
//!   out; clicks are ignored (not queued) until the reply arrives.  A failed
//!   reply reverts the flip.  A flip that no notification confirms within
//!   the confirmation window reverts too.

use crate::bus::IntentResponse;
use crate::config::PanelConfig;
use crate::error::SyncError;
use crate::message::{ErrorCategory, Message};

use super::notice::{Notice, NoticeBoard};
use super::render::{Glyph, PanelRenderer};

// ---------------------------------------------------------------------------
// PanelState / Control
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    Hidden,
    ShowingPlaying,
    ShowingPaused,
}

impl PanelState {
    /// Button glyph, `None` while hidden.
    pub fn glyph(&self) -> Option<Glyph> {
        match self {
            PanelState::Hidden => None,
            PanelState::ShowingPlaying => Some(Glyph::Pause),
            PanelState::ShowingPaused => Some(Glyph::Play),
        }
    }
}

/// A clickable control on the panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Control {
    PlayPause,
    Stop,
    Speed(f32),
}

/// What [`ControlPanel::apply`] did with a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Accepted; state is now consistent with it.
    Yes,
    /// Older than the last applied notification; discarded.
    Stale,
    /// Not meaningful in the current state.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Optimistic {
    previous: PanelState,
    expected: PanelState,
    since_ms: i64,
}

// ---------------------------------------------------------------------------
// ControlPanel
// ---------------------------------------------------------------------------

pub struct ControlPanel<R: PanelRenderer> {
    renderer: R,
    state: PanelState,
    action_pending: bool,
    optimistic: Option<Optimistic>,
    last_applied_ms: Option<i64>,
    speed: f32,
    confirm_timeout_ms: i64,
    notices: NoticeBoard,
}

impl<R: PanelRenderer> ControlPanel<R> {
    pub fn new(renderer: R, config: &PanelConfig) -> Self {
        Self {
            renderer,
            state: PanelState::Hidden,
            action_pending: false,
            optimistic: None,
            last_applied_ms: None,
            speed: 1.0,
            confirm_timeout_ms: config.confirm_timeout_ms as i64,
            notices: NoticeBoard::new(config.notice_ttl_ms),
        }
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    pub fn is_action_pending(&self) -> bool {
        self.action_pending
    }

    pub fn glyph(&self) -> Option<Glyph> {
        self.state.glyph()
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notices.current()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    // -----------------------------------------------------------------------
    // Optimistic clicks
    // -----------------------------------------------------------------------

    /// Handle a click and return the intent to send, if any.
    pub fn click(&mut self, control: Control, now_ms: i64) -> Option<Message> {
        if self.action_pending {
            log::debug!("surface: click ignored, action pending");
            return None;
        }
        if self.state == PanelState::Hidden {
            log::debug!("surface: click ignored, panel hidden");
            return None;
        }

        let (intent, expected) = match (control, self.state) {
            (Control::PlayPause, PanelState::ShowingPlaying) => {
                (Message::ControlPause, Some(PanelState::ShowingPaused))
            }
            (Control::PlayPause, _) => (Message::ControlResume, Some(PanelState::ShowingPlaying)),
            (Control::Stop, _) => (Message::ControlStop, Some(PanelState::Hidden)),
            (Control::Speed(speed), _) => (Message::ControlSpeedChange { speed }, None),
        };

        if let Some(expected) = expected {
            self.optimistic = Some(Optimistic {
                previous: self.state,
                expected,
                since_ms: now_ms,
            });
            self.set_state(expected);
        }
        self.action_pending = true;
        Some(intent)
    }

    /// The reply to the last intent arrived (or the request failed).
    pub fn complete(&mut self, result: Result<IntentResponse, SyncError>, now_ms: i64) {
        self.action_pending = false;

        let error = match result {
            Ok(resp) if resp.success => return,
            Ok(resp) if resp.is_autoplay_blocked() => None,
            Ok(resp) => Some(resp.error.unwrap_or_else(|| "request failed".into())),
            Err(e) if e.is_recoverable() => None,
            Err(e) => Some(e.user_message()),
        };

        self.revert("intent failed");
        if let Some(message) = error {
            self.post_failure(ErrorCategory::Playback, &message, now_ms);
        }
    }

    /// Revert unconfirmed optimistic state and drop expired notices.
    pub fn expire(&mut self, now_ms: i64) {
        if let Some(opt) = self.optimistic {
            if now_ms - opt.since_ms >= self.confirm_timeout_ms {
                self.revert("no confirmation");
            }
        }
        if self.notices.expire(now_ms) {
            self.renderer.clear_notice();
        }
    }

    fn revert(&mut self, why: &str) {
        let Some(opt) = self.optimistic.take() else {
            return;
        };
        if self.state == opt.expected {
            log::info!("surface: reverting optimistic update ({why})");
            self.set_state(opt.previous);
        }
    }

    // -----------------------------------------------------------------------
    // Confirmed notifications
    // -----------------------------------------------------------------------

    /// Apply a notification stamped `timestamp` by the coordinator.
    pub fn apply(&mut self, message: &Message, timestamp: i64) -> Applied {
        if message.is_playback_notification() {
            if let Some(last) = self.last_applied_ms {
                if timestamp < last {
                    log::debug!(
                        "surface: discarding {} older than last applied ({} ms)",
                        message.kind(),
                        last - timestamp
                    );
                    return Applied::Stale;
                }
            }
            self.last_applied_ms = Some(timestamp);
        }

        match message {
            Message::PlaybackStarted { .. } => {
                self.optimistic = None;
                self.state = PanelState::ShowingPlaying;
                self.renderer.mount(Glyph::Pause, self.speed);
                if self.notices.clear_autoplay() {
                    self.renderer.clear_notice();
                }
                Applied::Yes
            }
            Message::PlaybackPaused { .. } => self.confirm(PanelState::ShowingPaused),
            Message::PlaybackResumed { .. } => self.confirm(PanelState::ShowingPlaying),
            Message::PlaybackStopped { reason } => {
                log::debug!("surface: stopped ({reason:?})");
                self.optimistic = None;
                self.set_state(PanelState::Hidden);
                if self.notices.clear_autoplay() {
                    self.renderer.clear_notice();
                }
                Applied::Yes
            }
            Message::SpeedChanged { speed } => {
                self.speed = *speed;
                if self.state != PanelState::Hidden {
                    self.renderer.set_speed(*speed);
                }
                Applied::Yes
            }
            Message::PlaybackError { message, category } => {
                self.post_failure(*category, message, timestamp);
                Applied::Yes
            }
            Message::AutoplayBlocked => {
                let notice = self.notices.post_autoplay().clone();
                self.renderer.show_notice(&notice);
                Applied::Yes
            }
            _ => Applied::Ignored,
        }
    }

    fn confirm(&mut self, next: PanelState) -> Applied {
        if self.state == PanelState::Hidden {
            log::debug!("surface: ignoring {next:?} while hidden");
            return Applied::Ignored;
        }
        self.optimistic = None;
        self.set_state(next);
        Applied::Yes
    }

    // -----------------------------------------------------------------------
    // Notices
    // -----------------------------------------------------------------------

    /// The user clicked the notice.  Returns the intent to send, if any.
    ///
    /// While an action is pending the autoplay affordance stays up so it
    /// can be used once the reply lands.
    pub fn activate_notice(&mut self) -> Option<Message> {
        if self.action_pending && self.notices.current() == Some(&Notice::Autoplay) {
            log::debug!("surface: notice kept, action pending");
            return None;
        }
        let intent = self.notices.activate();
        self.renderer.clear_notice();
        if intent.is_some() {
            self.action_pending = true;
        }
        intent
    }

    pub fn dismiss_notice(&mut self) {
        if self.notices.dismiss() {
            self.renderer.clear_notice();
        }
    }

    fn post_failure(&mut self, category: ErrorCategory, message: &str, now_ms: i64) {
        let notice = self.notices.post_failure(category, message, now_ms).clone();
        self.renderer.show_notice(&notice);
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    fn set_state(&mut self, next: PanelState) {
        let prev = self.state;
        if prev == next {
            return;
        }
        self.state = next;
        match (prev.glyph(), next.glyph()) {
            (_, None) => self.renderer.unmount(),
            (None, Some(glyph)) => self.renderer.mount(glyph, self.speed),
            (Some(_), Some(glyph)) => self.renderer.set_glyph(glyph),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::StopReason;
    use crate::surface::render::recording::RecordingRenderer;

    fn panel() -> (ControlPanel<RecordingRenderer>, RecordingRenderer) {
        let renderer = RecordingRenderer::default();
        let panel = ControlPanel::new(renderer.clone(), &PanelConfig::default());
        (panel, renderer)
    }

    fn started() -> Message {
        Message::PlaybackStarted { duration_ms: 3_000 }
    }

    fn paused() -> Message {
        Message::PlaybackPaused { position_ms: 500 }
    }

    fn resumed() -> Message {
        Message::PlaybackResumed { position_ms: 500 }
    }

    fn stopped() -> Message {
        Message::PlaybackStopped {
            reason: StopReason::User,
        }
    }

    fn playing_panel() -> (ControlPanel<RecordingRenderer>, RecordingRenderer) {
        let (mut p, r) = panel();
        p.apply(&started(), 100);
        (p, r)
    }

    // ---- notifications ----------------------------------------------------

    #[test]
    fn started_shows_playing_panel() {
        let (p, r) = playing_panel();
        assert_eq!(p.state(), PanelState::ShowingPlaying);
        assert_eq!(r.glyph(), Some(Glyph::Pause));
        assert_eq!(r.containers(), 1);
    }

    #[test]
    fn paused_twice_equals_paused_once() {
        let (mut p, r) = playing_panel();
        assert_eq!(p.apply(&paused(), 200), Applied::Yes);
        let once = (p.state(), r.glyph());
        assert_eq!(p.apply(&paused(), 200), Applied::Yes);
        assert_eq!((p.state(), r.glyph()), once);
        assert_eq!(p.state(), PanelState::ShowingPaused);
    }

    #[test]
    fn older_notification_is_discarded() {
        let (mut p, _r) = playing_panel();
        p.apply(&resumed(), 300);
        assert_eq!(p.apply(&paused(), 250), Applied::Stale);
        assert_eq!(p.state(), PanelState::ShowingPlaying);
    }

    #[test]
    fn new_session_replaces_container() {
        let (mut p, r) = playing_panel();
        p.apply(&started(), 200);
        assert_eq!(r.containers(), 1);
        assert_eq!(r.screen.lock().unwrap().mounts, 2);
    }

    #[test]
    fn stopped_removes_container() {
        let (mut p, r) = playing_panel();
        p.apply(&stopped(), 200);
        assert_eq!(p.state(), PanelState::Hidden);
        assert_eq!(r.containers(), 0);
        assert_eq!(p.glyph(), None);
    }

    #[test]
    fn paused_while_hidden_is_ignored() {
        let (mut p, r) = panel();
        assert_eq!(p.apply(&paused(), 100), Applied::Ignored);
        assert_eq!(p.state(), PanelState::Hidden);
        assert_eq!(r.containers(), 0);
    }

    // ---- optimistic clicks --------------------------------------------------

    #[test]
    fn double_click_sends_one_pause() {
        let (mut p, _r) = playing_panel();
        assert_eq!(p.click(Control::PlayPause, 1_000), Some(Message::ControlPause));
        assert_eq!(p.click(Control::PlayPause, 1_010), None);
        assert!(p.is_action_pending());
        assert_eq!(p.state(), PanelState::ShowingPaused);
    }

    #[test]
    fn failed_intent_reverts_and_clears_pending() {
        let (mut p, r) = playing_panel();
        p.click(Control::PlayPause, 1_000);
        p.complete(Err(SyncError::MessageDelivery("timeout".into())), 1_100);

        assert!(!p.is_action_pending());
        assert_eq!(p.state(), PanelState::ShowingPlaying);
        assert_eq!(r.glyph(), Some(Glyph::Pause));
        assert!(matches!(r.notice(), Some(Notice::Failure { .. })));
    }

    #[test]
    fn successful_intent_keeps_flip_until_confirmed() {
        let (mut p, _r) = playing_panel();
        p.click(Control::PlayPause, 1_000);
        p.complete(Ok(IntentResponse::ok()), 1_050);
        assert!(!p.is_action_pending());
        assert_eq!(p.state(), PanelState::ShowingPaused);

        p.apply(&paused(), 1_060);
        p.expire(10_000);
        assert_eq!(p.state(), PanelState::ShowingPaused);
    }

    #[test]
    fn unconfirmed_flip_reverts_after_window() {
        let (mut p, _r) = playing_panel();
        p.click(Control::PlayPause, 1_000);
        p.complete(Ok(IntentResponse::ok()), 1_050);

        p.expire(3_999);
        assert_eq!(p.state(), PanelState::ShowingPaused);
        p.expire(4_000);
        assert_eq!(p.state(), PanelState::ShowingPlaying);
    }

    #[test]
    fn optimistic_stop_hides_and_revert_remounts() {
        let (mut p, r) = playing_panel();
        assert_eq!(p.click(Control::Stop, 1_000), Some(Message::ControlStop));
        assert_eq!(r.containers(), 0);

        p.complete(Ok(IntentResponse::failed(&SyncError::NoAudioLoaded)), 1_100);
        assert_eq!(p.state(), PanelState::ShowingPlaying);
        assert_eq!(r.containers(), 1);
    }

    #[test]
    fn revert_does_not_undo_a_newer_confirmation() {
        let (mut p, _r) = playing_panel();
        p.click(Control::PlayPause, 1_000);
        p.apply(&stopped(), 1_010);
        p.complete(Err(SyncError::NoAudioLoaded), 1_020);
        assert_eq!(p.state(), PanelState::Hidden);
    }

    #[test]
    fn clicks_while_hidden_do_nothing() {
        let (mut p, _r) = panel();
        assert_eq!(p.click(Control::PlayPause, 0), None);
        assert!(!p.is_action_pending());
    }

    #[test]
    fn speed_click_has_no_flip() {
        let (mut p, r) = playing_panel();
        assert_eq!(
            p.click(Control::Speed(1.5), 1_000),
            Some(Message::ControlSpeedChange { speed: 1.5 })
        );
        assert_eq!(p.state(), PanelState::ShowingPlaying);
        p.complete(Ok(IntentResponse::ok()), 1_010);
        p.apply(&Message::SpeedChanged { speed: 1.5 }, 1_020);
        assert!((p.speed() - 1.5).abs() < f32::EPSILON);
        assert_eq!(r.screen.lock().unwrap().speed, Some(1.5));
    }

    #[test]
    fn speed_announced_before_start_is_mounted() {
        let (mut p, r) = panel();
        assert_eq!(p.apply(&Message::SpeedChanged { speed: 1.5 }, 90), Applied::Yes);
        assert_eq!(r.containers(), 0);

        p.apply(&started(), 100);
        assert!((p.speed() - 1.5).abs() < f32::EPSILON);
        assert_eq!(r.screen.lock().unwrap().speed, Some(1.5));
    }

    // ---- notices ------------------------------------------------------------

    #[test]
    fn autoplay_affordance_sends_resume_and_clears_on_start() {
        let (mut p, r) = panel();
        p.apply(&Message::AutoplayBlocked, 50);
        assert_eq!(r.notice(), Some(Notice::Autoplay));

        assert_eq!(p.activate_notice(), Some(Message::ControlResume));
        assert!(p.is_action_pending());
        p.complete(Ok(IntentResponse::ok()), 60);

        p.apply(&started(), 70);
        assert_eq!(p.state(), PanelState::ShowingPlaying);
        assert_eq!(r.notice(), None);
    }

    #[test]
    fn autoplay_affordance_survives_a_pending_click() {
        let (mut p, r) = playing_panel();
        assert_eq!(p.click(Control::PlayPause, 200), Some(Message::ControlPause));
        p.apply(&Message::AutoplayBlocked, 210);

        assert_eq!(p.activate_notice(), None);
        assert_eq!(p.notice(), Some(&Notice::Autoplay));
        assert_eq!(r.notice(), Some(Notice::Autoplay));

        p.complete(Ok(IntentResponse::ok()), 220);
        assert_eq!(p.activate_notice(), Some(Message::ControlResume));
        assert_eq!(r.notice(), None);
    }

    #[test]
    fn playback_error_notice_expires() {
        let (mut p, r) = panel();
        p.apply(
            &Message::PlaybackError {
                message: "offline".into(),
                category: ErrorCategory::Network,
            },
            1_000,
        );
        assert!(matches!(r.notice(), Some(Notice::Failure { .. })));
        p.expire(6_000);
        assert_eq!(r.notice(), None);
    }
}
