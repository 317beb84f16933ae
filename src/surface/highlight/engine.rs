//! Drives sentence highlights off the progress stream.
//!
//! [`HighlightEngine`] owns the [`HighlightState`] and one
//! [`HighlightSurface`].  Each progress tick maps `currentTimeMs` to a
//! sentence; when the sentence changes the old highlight is retired before
//! the new one is rendered, so at most one highlight exists at any time.
//!
//! Highlighting never interferes with audio: a sentence that cannot be
//! placed is skipped and the walk continues with the next one.

use super::document::{ContainerId, HighlightHandle, HighlightSurface};
use super::sentence::{split_sentences, Sentence};
use super::timing::{compute_timings, find_sentence_at, SentenceTiming};

// ---------------------------------------------------------------------------
// HighlightState
// ---------------------------------------------------------------------------

/// In-memory highlight bookkeeping for the current session.
///
/// `timings` is empty while `audio_duration_ms` is `0`: a zero duration
/// cannot give every sentence a positive span, so nothing is highlighted
/// until [`HighlightEngine::set_duration`] supplies one.  From then on
/// `sentences.len() == timings.len()`.  `active_highlight` is `None`
/// whenever `is_playing` is false.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HighlightState {
    pub sentences: Vec<Sentence>,
    pub timings: Vec<SentenceTiming>,
    pub current_sentence_index: Option<usize>,
    pub audio_duration_ms: u64,
    pub speed: f32,
    pub is_playing: bool,
    pub is_paused: bool,
    pub active_highlight: Option<HighlightHandle>,
    pub container: ContainerId,
}

// ---------------------------------------------------------------------------
// HighlightEngine
// ---------------------------------------------------------------------------

pub struct HighlightEngine<S: HighlightSurface> {
    surface: S,
    state: HighlightState,
    auto_scroll: bool,
}

impl<S: HighlightSurface> HighlightEngine<S> {
    pub fn new(surface: S, auto_scroll: bool) -> Self {
        Self {
            surface,
            state: HighlightState {
                speed: 1.0,
                ..HighlightState::default()
            },
            auto_scroll,
        }
    }

    pub fn state(&self) -> &HighlightState {
        &self.state
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Begin highlighting `text`, found in `container`, for audio of
    /// `duration_ms` played at `speed`.  Any previous session is cleaned up
    /// first.
    pub fn start(&mut self, text: &str, container: ContainerId, duration_ms: u64, speed: f32) {
        self.stop();

        let sentences = split_sentences(text);
        let timings = compute_timings(&sentences, duration_ms, speed);
        log::debug!(
            "highlight: {} sentences over {duration_ms} ms at {speed}x",
            sentences.len()
        );

        self.state = HighlightState {
            sentences,
            timings,
            current_sentence_index: None,
            audio_duration_ms: duration_ms,
            speed,
            is_playing: true,
            is_paused: false,
            active_highlight: None,
            container,
        };
    }

    /// Map a progress tick to a sentence.  Ticks while paused or stopped
    /// change nothing.
    pub fn on_progress(&mut self, current_time_ms: u64) {
        if !self.state.is_playing || self.state.is_paused {
            return;
        }
        let index = find_sentence_at(&self.state.timings, current_time_ms as f64);
        if index == self.state.current_sentence_index {
            return;
        }

        self.retire();
        self.state.current_sentence_index = index;

        let Some(i) = index else {
            return;
        };
        let Some(sentence) = self.state.sentences.get(i) else {
            return;
        };
        match self.surface.render(self.state.container, &sentence.text, i) {
            Some(handle) => {
                self.state.active_highlight = Some(handle);
                if self.auto_scroll && !self.surface.is_fully_visible(handle) {
                    self.surface.scroll_to_center(handle);
                }
            }
            None => log::debug!("highlight: sentence {i} not found, skipping"),
        }
    }

    pub fn pause(&mut self) {
        if self.state.is_playing {
            self.state.is_paused = true;
        }
    }

    pub fn resume(&mut self) {
        if self.state.is_playing {
            self.state.is_paused = false;
        }
    }

    /// Recompute every timing from the original duration at `speed`.
    pub fn set_speed(&mut self, speed: f32) {
        self.state.speed = speed;
        self.recompute();
    }

    /// Recompute timings once the real duration is known.
    pub fn set_duration(&mut self, duration_ms: u64) {
        if duration_ms == self.state.audio_duration_ms {
            return;
        }
        self.state.audio_duration_ms = duration_ms;
        self.recompute();
    }

    /// Retire the active highlight, sweep leftovers and reset.  Safe to call
    /// repeatedly.
    pub fn stop(&mut self) {
        self.retire();
        let swept = self.surface.sweep_orphans();
        if swept > 0 {
            log::debug!("highlight: swept {swept} orphaned markers");
        }
        let speed = self.state.speed;
        self.state = HighlightState {
            speed,
            ..HighlightState::default()
        };
    }

    fn recompute(&mut self) {
        self.state.timings = compute_timings(
            &self.state.sentences,
            self.state.audio_duration_ms,
            self.state.speed,
        );
    }

    fn retire(&mut self) {
        if let Some(handle) = self.state.active_highlight.take() {
            self.surface.unrender(handle);
        }
    }
}
