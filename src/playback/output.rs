//! Audio device layer underneath the [`PlaybackEngine`](super::PlaybackEngine).
//!
//! [`AudioOutput`] is the seam between the state machine and the concrete
//! audio backend.  [`RodioOutput`] is the production implementation; tests
//! use `MockOutput`, an in-memory device whose clock is advanced by hand.
//!
//! Implementations are **not** required to be `Send`: the rodio output
//! stream is tied to the thread that opened it, so the playback context owns
//! its device on a dedicated thread (see [`spawn_playback_context`]).
//!
//! [`spawn_playback_context`]: super::spawn_playback_context

use std::io::Cursor;
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source, StreamError};
use thiserror::Error;

// ---------------------------------------------------------------------------
// OutputError / OutputStatus
// ---------------------------------------------------------------------------

/// Failures reported by an [`AudioOutput`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OutputError {
    /// The bytes are not a supported audio format, or contain no audio.
    #[error("cannot decode audio: {0}")]
    Decode(String),

    /// `play` was called with nothing loaded.
    #[error("no audio loaded")]
    NothingLoaded,

    /// The host will not start audio until the user acts (no output device,
    /// device claimed by another application, autoplay policy).
    #[error("audio output is blocked")]
    Blocked,

    /// Any other device failure.
    #[error("audio device error: {0}")]
    Device(String),
}

/// Result of polling the device between ticks.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputStatus {
    /// Nothing is queued.
    Idle,
    /// Audio is queued (running or paused).
    Running,
    /// The queued audio drained naturally.
    Finished,
    /// The device reported a fault.  `None` means the fault carried no
    /// detail, which backends emit as a side effect of teardown.
    Fault(Option<String>),
}

// ---------------------------------------------------------------------------
// AudioOutput trait
// ---------------------------------------------------------------------------

/// A single-track audio device.
pub trait AudioOutput {
    /// Decode `bytes`, replacing anything previously loaded, and return the
    /// media duration.  Must not start playback.
    fn load(&mut self, bytes: Vec<u8>) -> Result<Duration, OutputError>;

    /// Start or continue playback from the current position.
    fn play(&mut self) -> Result<(), OutputError>;

    /// Hold playback, keeping the position.
    fn pause(&mut self);

    /// Halt playback and release the loaded audio.
    fn stop(&mut self);

    /// Apply a playback rate immediately, without restarting.
    fn set_speed(&mut self, rate: f32);

    /// Media position of the current track.
    fn position(&self) -> Duration;

    fn poll(&mut self) -> OutputStatus;
}

// ---------------------------------------------------------------------------
// RodioOutput
// ---------------------------------------------------------------------------

/// [`AudioOutput`] backed by the default rodio output device.
///
/// The device is opened lazily on the first `play`, so constructing a
/// `RodioOutput` never fails and a missing device surfaces as
/// [`OutputError::Blocked`] at the moment the user asks for audio.
pub struct RodioOutput {
    // Keep the stream alive for as long as the sink exists.
    device: Option<(OutputStream, OutputStreamHandle)>,
    sink: Option<Sink>,
    audio: Option<Vec<u8>>,
    speed: f32,
}

impl RodioOutput {
    pub fn new() -> Self {
        Self {
            device: None,
            sink: None,
            audio: None,
            speed: 1.0,
        }
    }

    fn open_device(&mut self) -> Result<&OutputStreamHandle, OutputError> {
        if self.device.is_none() {
            let pair = OutputStream::try_default().map_err(|e| match e {
                StreamError::NoDevice => OutputError::Blocked,
                other => OutputError::Device(other.to_string()),
            })?;
            log::info!("playback: opened default audio output");
            self.device = Some(pair);
        }
        match &self.device {
            Some((_, handle)) => Ok(handle),
            None => Err(OutputError::Device("output stream unavailable".into())),
        }
    }
}

impl Default for RodioOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for RodioOutput {
    fn load(&mut self, bytes: Vec<u8>) -> Result<Duration, OutputError> {
        self.stop();

        let decoder = Decoder::new(Cursor::new(bytes.clone()))
            .map_err(|e| OutputError::Decode(e.to_string()))?;

        // MP3 streams often carry no length header; count frames instead.
        let duration = match decoder.total_duration() {
            Some(d) => d,
            None => {
                let channels = u64::from(decoder.channels().max(1));
                let rate = u64::from(decoder.sample_rate().max(1));
                let samples = decoder.count() as u64;
                Duration::from_secs_f64(samples as f64 / (channels * rate) as f64)
            }
        };

        if duration.is_zero() {
            return Err(OutputError::Decode("audio contains no samples".into()));
        }

        self.audio = Some(bytes);
        Ok(duration)
    }

    fn play(&mut self) -> Result<(), OutputError> {
        if let Some(sink) = &self.sink {
            sink.play();
            return Ok(());
        }

        let bytes = self.audio.clone().ok_or(OutputError::NothingLoaded)?;
        let speed = self.speed;
        let handle = self.open_device()?;

        let sink = Sink::try_new(handle).map_err(|e| OutputError::Device(e.to_string()))?;
        let decoder =
            Decoder::new(Cursor::new(bytes)).map_err(|e| OutputError::Decode(e.to_string()))?;
        sink.set_speed(speed);
        sink.append(decoder);
        sink.play();

        self.sink = Some(sink);
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.audio = None;
    }

    fn set_speed(&mut self, rate: f32) {
        self.speed = rate;
        if let Some(sink) = &self.sink {
            sink.set_speed(rate);
        }
    }

    fn position(&self) -> Duration {
        self.sink.as_ref().map(Sink::get_pos).unwrap_or_default()
    }

    fn poll(&mut self) -> OutputStatus {
        match &self.sink {
            Some(sink) if sink.empty() => OutputStatus::Finished,
            Some(_) => OutputStatus::Running,
            None => OutputStatus::Idle,
        }
    }
}

// ---------------------------------------------------------------------------
// MockOutput  (test-only)
// ---------------------------------------------------------------------------

/// Observable state of a [`MockOutput`], shared with the test that drives it.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockDeck {
    pub duration: Option<Duration>,
    pub position: Duration,
    pub playing: bool,
    pub speed: f32,
    pub block_play: bool,
    pub fail_decode: bool,
    pub pending_fault: Option<Option<String>>,
    pub play_calls: usize,
}

/// In-memory audio device.  Time only moves through [`MockOutput::advance`].
///
/// Any non-empty byte buffer "decodes"; its duration is one second per
/// 1 000 bytes, so `vec![0; 3_000]` is a three-second clip.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MockOutput {
    pub deck: std::sync::Arc<std::sync::Mutex<MockDeck>>,
}

#[cfg(test)]
impl MockOutput {
    pub fn new() -> Self {
        let out = Self::default();
        out.deck.lock().unwrap().speed = 1.0;
        out
    }

    /// Move the device clock forward by `wall_ms` of real time.
    pub fn advance(&self, wall_ms: u64) {
        let mut deck = self.deck.lock().unwrap();
        if !deck.playing {
            return;
        }
        let media = Duration::from_secs_f64(wall_ms as f64 / 1000.0 * f64::from(deck.speed));
        deck.position += media;
        if let Some(total) = deck.duration {
            if deck.position > total {
                deck.position = total;
            }
        }
    }

    pub fn inject_fault(&self, detail: Option<&str>) {
        self.deck.lock().unwrap().pending_fault = Some(detail.map(str::to_string));
    }
}

#[cfg(test)]
impl AudioOutput for MockOutput {
    fn load(&mut self, bytes: Vec<u8>) -> Result<Duration, OutputError> {
        let mut deck = self.deck.lock().unwrap();
        deck.playing = false;
        deck.position = Duration::ZERO;
        if deck.fail_decode || bytes.is_empty() {
            deck.duration = None;
            return Err(OutputError::Decode("unrecognised format".into()));
        }
        let d = Duration::from_millis(bytes.len() as u64);
        deck.duration = Some(d);
        Ok(d)
    }

    fn play(&mut self) -> Result<(), OutputError> {
        let mut deck = self.deck.lock().unwrap();
        deck.play_calls += 1;
        if deck.duration.is_none() {
            return Err(OutputError::NothingLoaded);
        }
        if deck.block_play {
            return Err(OutputError::Blocked);
        }
        deck.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.deck.lock().unwrap().playing = false;
    }

    fn stop(&mut self) {
        let mut deck = self.deck.lock().unwrap();
        deck.playing = false;
        deck.position = Duration::ZERO;
        deck.duration = None;
    }

    fn set_speed(&mut self, rate: f32) {
        self.deck.lock().unwrap().speed = rate;
    }

    fn position(&self) -> Duration {
        self.deck.lock().unwrap().position
    }

    fn poll(&mut self) -> OutputStatus {
        let mut deck = self.deck.lock().unwrap();
        if let Some(fault) = deck.pending_fault.take() {
            return OutputStatus::Fault(fault);
        }
        match deck.duration {
            None => OutputStatus::Idle,
            Some(total) if deck.playing && deck.position >= total => {
                deck.playing = false;
                OutputStatus::Finished
            }
            Some(_) => OutputStatus::Running,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rodio_output_rejects_garbage_bytes() {
        let mut out = RodioOutput::new();
        let err = out.load(vec![0x13, 0x37, 0x00, 0x42]).unwrap_err();
        assert!(matches!(err, OutputError::Decode(_)));
    }

    #[test]
    fn rodio_output_play_without_audio_is_nothing_loaded() {
        let mut out = RodioOutput::new();
        assert_eq!(out.play().unwrap_err(), OutputError::NothingLoaded);
        assert_eq!(out.poll(), OutputStatus::Idle);
        assert_eq!(out.position(), Duration::ZERO);
    }

    #[test]
    fn mock_output_finishes_at_duration() {
        let mut out = MockOutput::new();
        out.load(vec![0; 1_000]).unwrap();
        out.play().unwrap();
        out.advance(600);
        assert_eq!(out.poll(), OutputStatus::Running);
        out.advance(600);
        assert_eq!(out.poll(), OutputStatus::Finished);
    }

    #[test]
    fn mock_output_speed_scales_media_time() {
        let mut out = MockOutput::new();
        out.load(vec![0; 5_000]).unwrap();
        out.set_speed(2.0);
        out.play().unwrap();
        out.advance(1_000);
        assert_eq!(out.position(), Duration::from_secs(2));
    }
}
