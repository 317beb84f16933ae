//! The playback state machine.
//!
//! [`PlaybackEngine`] owns the only [`PlaybackState`] in the system and the
//! single audio resource behind an [`AudioOutput`].  Every mutation goes
//! through one of its operations, and every status transition is reported to
//! subscribed [`PlaybackObserver`]s.
//!
//! # Failure policy
//!
//! Operations return `Result` to their direct caller (the playback context
//! host turns that into an intent response), while asynchronous faults found
//! by [`tick`](PlaybackEngine::tick) surface only as events.  A device fault
//! without any detail is a teardown artefact and is dropped with a debug log.

use crate::error::SyncError;

use super::events::{BoxedObserver, PlaybackObserver};
use super::output::{AudioOutput, OutputError, OutputStatus};
use super::state::{is_valid_speed, PlaybackState, PlaybackStatus};

// ---------------------------------------------------------------------------
// PlaybackEngine
// ---------------------------------------------------------------------------

pub struct PlaybackEngine<O: AudioOutput> {
    output: O,
    state: PlaybackState,
    loaded: bool,
    observers: Vec<BoxedObserver>,
}

impl<O: AudioOutput> PlaybackEngine<O> {
    pub fn new(output: O) -> Self {
        Self {
            output,
            state: PlaybackState::default(),
            loaded: false,
            observers: Vec::new(),
        }
    }

    /// Register an observer for all event classes.
    pub fn subscribe(&mut self, observer: impl PlaybackObserver + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn has_audio(&self) -> bool {
        self.loaded
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Replace any loaded audio with `bytes` and return the duration in ms.
    ///
    /// The previous session is stopped and released first.  On success the
    /// status is `Loading` and the engine is ready to [`play`](Self::play).
    pub fn load(&mut self, bytes: Vec<u8>) -> Result<u64, SyncError> {
        if self.loaded || self.state.status != PlaybackStatus::Idle {
            log::debug!("playback: releasing previous audio before load");
            self.output.stop();
            self.loaded = false;
            self.state.reset();
        }

        match self.output.load(bytes) {
            Ok(duration) => {
                self.loaded = true;
                self.state.position_secs = 0.0;
                self.state.duration_secs = duration.as_secs_f64();
                self.output.set_speed(self.state.speed);
                self.transition(PlaybackStatus::Loading);
                log::info!(
                    "playback: loaded {:.2}s of audio",
                    self.state.duration_secs
                );
                Ok(self.state.duration_ms())
            }
            Err(e) => {
                log::warn!("playback: load failed: {e}");
                self.state.reset();
                self.transition(PlaybackStatus::Idle);
                Err(SyncError::Load(e.to_string()))
            }
        }
    }

    pub fn play(&mut self) -> Result<(), SyncError> {
        if !self.loaded {
            return Err(SyncError::NoAudioLoaded);
        }
        if self.state.status == PlaybackStatus::Playing {
            return Ok(());
        }
        self.start_output()
    }

    /// Hold playback.  Not playing → warning, no state change.
    pub fn pause(&mut self) {
        if self.state.status != PlaybackStatus::Playing {
            log::warn!(
                "playback: pause ignored while {}",
                self.state.status.label()
            );
            return;
        }
        self.output.pause();
        self.state.position_secs = self.output.position().as_secs_f64();
        self.transition(PlaybackStatus::Paused);
    }

    /// Continue from the preserved position.
    pub fn resume(&mut self) -> Result<(), SyncError> {
        if !self.loaded {
            return Err(SyncError::NoAudioLoaded);
        }
        match self.state.status {
            PlaybackStatus::Playing => Ok(()),
            _ => self.start_output(),
        }
    }

    /// Reset to idle and release the audio.
    pub fn stop(&mut self) {
        if !self.loaded && self.state.status == PlaybackStatus::Idle {
            log::debug!("playback: stop ignored, nothing loaded");
            return;
        }
        self.release();
        self.transition(PlaybackStatus::Idle);
    }

    /// Apply `rate` immediately.  Out-of-range rates are rejected without
    /// touching any state.
    pub fn set_speed(&mut self, rate: f32) -> bool {
        if !is_valid_speed(rate) {
            log::warn!("playback: rejected speed {rate}");
            return false;
        }
        self.output.set_speed(rate);
        self.state.speed = rate;
        true
    }

    /// Advance the engine by one cadence step.
    ///
    /// Detects natural completion and device faults, refreshes the position
    /// and emits a progress event while playing.
    pub fn tick(&mut self) {
        match self.output.poll() {
            OutputStatus::Finished if self.state.status.is_active() => {
                self.state.position_secs = self.state.duration_secs;
                let state = self.state;
                for obs in &mut self.observers {
                    obs.on_completion(&state);
                }
                log::info!("playback: reached end of audio");
                self.release();
                self.transition(PlaybackStatus::Idle);
                return;
            }
            OutputStatus::Fault(None) => {
                log::debug!("playback: suppressed fault without detail");
            }
            OutputStatus::Fault(Some(detail)) => {
                self.fail(SyncError::Playback(detail));
                return;
            }
            _ => {}
        }

        if self.state.status == PlaybackStatus::Playing {
            self.state.position_secs = self.output.position().as_secs_f64();
            let state = self.state;
            for obs in &mut self.observers {
                obs.on_progress(&state);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn start_output(&mut self) -> Result<(), SyncError> {
        match self.output.play() {
            Ok(()) => {
                self.transition(PlaybackStatus::Playing);
                Ok(())
            }
            Err(OutputError::Blocked) => {
                log::info!("playback: output blocked, waiting for user gesture");
                Err(SyncError::AutoplayBlocked)
            }
            Err(OutputError::NothingLoaded) => Err(SyncError::NoAudioLoaded),
            Err(e) => {
                let err = SyncError::Playback(e.to_string());
                self.fail(err.clone());
                Err(err)
            }
        }
    }

    fn fail(&mut self, error: SyncError) {
        log::error!("playback: {error}");
        self.output.stop();
        self.loaded = false;
        for obs in &mut self.observers {
            obs.on_error(&error);
        }
        self.transition(PlaybackStatus::Error);
    }

    fn release(&mut self) {
        self.output.stop();
        self.loaded = false;
        self.state.position_secs = 0.0;
        self.state.duration_secs = 0.0;
    }

    fn transition(&mut self, next: PlaybackStatus) {
        let prev = self.state.status;
        self.state.status = next;
        if prev == next {
            return;
        }
        log::debug!("playback: {} → {}", prev.label(), next.label());
        let state = self.state;
        for obs in &mut self.observers {
            obs.on_status_change(prev, &state);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::events::recording::{Recorded, RecordingObserver};
    use crate::playback::output::MockOutput;

    fn engine() -> (PlaybackEngine<MockOutput>, MockOutput, RecordingObserver) {
        let output = MockOutput::new();
        let mut engine = PlaybackEngine::new(output.clone());
        let rec = RecordingObserver::default();
        engine.subscribe(rec.clone());
        (engine, output, rec)
    }

    fn statuses(rec: &RecordingObserver) -> Vec<PlaybackStatus> {
        rec.events()
            .into_iter()
            .filter_map(|e| match e {
                Recorded::Status(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    // ---- load -------------------------------------------------------------

    #[test]
    fn load_reports_duration_and_enters_loading() {
        let (mut eng, _out, rec) = engine();
        let ms = eng.load(vec![0; 3_000]).unwrap();
        assert_eq!(ms, 3_000);
        assert_eq!(eng.state().status, PlaybackStatus::Loading);
        assert_eq!(statuses(&rec), vec![PlaybackStatus::Loading]);
    }

    #[test]
    fn load_undecodable_is_load_error() {
        let (mut eng, _out, _rec) = engine();
        let err = eng.load(Vec::new()).unwrap_err();
        assert!(matches!(err, SyncError::Load(_)));
        assert_eq!(eng.state().status, PlaybackStatus::Idle);
        assert!(!eng.has_audio());
    }

    #[test]
    fn load_replaces_running_session() {
        let (mut eng, out, _rec) = engine();
        eng.load(vec![0; 3_000]).unwrap();
        eng.play().unwrap();
        out.advance(1_000);
        eng.tick();

        let ms = eng.load(vec![0; 5_000]).unwrap();
        assert_eq!(ms, 5_000);
        assert_eq!(eng.state().position_ms(), 0);
        assert!(!out.deck.lock().unwrap().playing);
    }

    // ---- play / pause / resume -------------------------------------------

    #[test]
    fn play_without_audio_fails() {
        let (mut eng, _out, _rec) = engine();
        assert_eq!(eng.play().unwrap_err(), SyncError::NoAudioLoaded);
        assert_eq!(eng.resume().unwrap_err(), SyncError::NoAudioLoaded);
    }

    #[test]
    fn autoplay_block_keeps_engine_ready() {
        let (mut eng, out, _rec) = engine();
        eng.load(vec![0; 1_000]).unwrap();
        out.deck.lock().unwrap().block_play = true;

        assert_eq!(eng.play().unwrap_err(), SyncError::AutoplayBlocked);
        assert_eq!(eng.state().status, PlaybackStatus::Loading);

        out.deck.lock().unwrap().block_play = false;
        eng.play().unwrap();
        assert_eq!(eng.state().status, PlaybackStatus::Playing);
    }

    #[test]
    fn pause_preserves_position_and_resume_continues() {
        let (mut eng, out, rec) = engine();
        eng.load(vec![0; 4_000]).unwrap();
        eng.play().unwrap();
        out.advance(1_500);
        eng.pause();

        assert_eq!(eng.state().status, PlaybackStatus::Paused);
        assert_eq!(eng.state().position_ms(), 1_500);

        out.advance(1_000); // paused: device clock does not move
        eng.resume().unwrap();
        eng.tick();
        assert_eq!(eng.state().position_ms(), 1_500);
        assert_eq!(
            statuses(&rec),
            vec![
                PlaybackStatus::Loading,
                PlaybackStatus::Playing,
                PlaybackStatus::Paused,
                PlaybackStatus::Playing
            ]
        );
    }

    #[test]
    fn pause_when_not_playing_is_a_noop() {
        let (mut eng, _out, rec) = engine();
        eng.pause();
        eng.load(vec![0; 1_000]).unwrap();
        eng.pause();
        assert_eq!(eng.state().status, PlaybackStatus::Loading);
        assert_eq!(statuses(&rec), vec![PlaybackStatus::Loading]);
    }

    // ---- stop -------------------------------------------------------------

    #[test]
    fn stop_resets_position_and_keeps_speed() {
        let (mut eng, out, rec) = engine();
        eng.load(vec![0; 4_000]).unwrap();
        assert!(eng.set_speed(1.5));
        eng.play().unwrap();
        out.advance(1_000);
        eng.tick();
        eng.stop();

        let st = eng.state();
        assert_eq!(st.status, PlaybackStatus::Idle);
        assert_eq!(st.position_ms(), 0);
        assert!((st.speed - 1.5).abs() < f32::EPSILON);
        assert_eq!(statuses(&rec).last(), Some(&PlaybackStatus::Idle));
    }

    #[test]
    fn stop_when_idle_emits_nothing() {
        let (mut eng, _out, rec) = engine();
        eng.stop();
        assert!(rec.events().is_empty());
    }

    // ---- speed ------------------------------------------------------------

    #[test]
    fn set_speed_rejects_out_of_range() {
        let (mut eng, out, _rec) = engine();
        assert!(!eng.set_speed(0.25));
        assert!(!eng.set_speed(2.5));
        assert!((eng.state().speed - 1.0).abs() < f32::EPSILON);
        assert!((out.deck.lock().unwrap().speed - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn speed_survives_pause_resume() {
        let (mut eng, _out, _rec) = engine();
        eng.load(vec![0; 4_000]).unwrap();
        eng.play().unwrap();
        assert!(eng.set_speed(0.75));
        eng.pause();
        eng.resume().unwrap();
        assert!((eng.state().speed - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn speed_applies_to_next_load() {
        let (mut eng, out, _rec) = engine();
        assert!(eng.set_speed(2.0));
        eng.load(vec![0; 1_000]).unwrap();
        assert!((out.deck.lock().unwrap().speed - 2.0).abs() < f32::EPSILON);
    }

    // ---- tick -------------------------------------------------------------

    #[test]
    fn progress_only_while_playing() {
        let (mut eng, out, rec) = engine();
        eng.load(vec![0; 4_000]).unwrap();
        eng.tick();
        eng.play().unwrap();
        out.advance(100);
        eng.tick();
        eng.pause();
        eng.tick();

        let progress: Vec<_> = rec
            .events()
            .into_iter()
            .filter(|e| matches!(e, Recorded::Progress(_)))
            .collect();
        assert_eq!(progress, vec![Recorded::Progress(100)]);
    }

    #[test]
    fn natural_end_emits_completion_then_idle() {
        let (mut eng, out, rec) = engine();
        eng.load(vec![0; 500]).unwrap();
        eng.play().unwrap();
        out.advance(600);
        eng.tick();

        let events = rec.events();
        let n = events.len();
        assert_eq!(events[n - 2], Recorded::Completion);
        assert_eq!(events[n - 1], Recorded::Status(PlaybackStatus::Idle));
        assert!(!eng.has_audio());
    }

    #[test]
    fn fault_with_detail_enters_error() {
        let (mut eng, out, rec) = engine();
        eng.load(vec![0; 2_000]).unwrap();
        eng.play().unwrap();
        out.inject_fault(Some("device unplugged"));
        eng.tick();

        assert_eq!(eng.state().status, PlaybackStatus::Error);
        assert!(eng.state().duration_ms() > 0);
        assert!(rec
            .events()
            .contains(&Recorded::Error(SyncError::Playback("device unplugged".into()))));
    }

    #[test]
    fn fault_without_detail_is_suppressed() {
        let (mut eng, out, rec) = engine();
        eng.load(vec![0; 2_000]).unwrap();
        eng.play().unwrap();
        out.inject_fault(None);
        eng.tick();

        assert_eq!(eng.state().status, PlaybackStatus::Playing);
        assert!(!rec.events().iter().any(|e| matches!(e, Recorded::Error(_))));
    }

    #[test]
    fn error_recovers_with_fresh_load() {
        let (mut eng, out, _rec) = engine();
        eng.load(vec![0; 2_000]).unwrap();
        eng.play().unwrap();
        out.inject_fault(Some("glitch"));
        eng.tick();
        assert_eq!(eng.resume().unwrap_err(), SyncError::NoAudioLoaded);

        eng.load(vec![0; 2_000]).unwrap();
        eng.play().unwrap();
        assert_eq!(eng.state().status, PlaybackStatus::Playing);
    }
}
