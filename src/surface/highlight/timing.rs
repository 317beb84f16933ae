//! Proportional sentence timing.
//!
//! Each sentence gets a share of the audio proportional to its character
//! count.  Timings live on the speed-scaled timeline, so at speed `s` the
//! intervals tile `[0, total / s)` exactly and sum to `total / s`.
//!
//! ```text
//! "Hello world." (12)  "This is a test!" (15)  "How are you?" (12)   total 3000 ms
//! [0 ──── 923) [923 ──────── 2077) [2077 ──── 3000)
//! ```

use super::sentence::Sentence;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentenceTiming {
    pub sentence_index: usize,
    pub start_time_ms: f64,
    pub end_time_ms: f64,
    pub duration_ms: f64,
}

impl SentenceTiming {
    pub fn contains(&self, t_ms: f64) -> bool {
        self.start_time_ms <= t_ms && t_ms < self.end_time_ms
    }
}

/// Timings for `sentences` over `total_ms` of audio played at `speed`.
///
/// Returns an empty map while the duration is unknown (`total_ms == 0`) or
/// the text has no weight.
pub fn compute_timings(sentences: &[Sentence], total_ms: u64, speed: f32) -> Vec<SentenceTiming> {
    let weight: usize = sentences.iter().map(Sentence::weight).sum();
    if total_ms == 0 || weight == 0 {
        return Vec::new();
    }

    let speed = if speed > 0.0 { f64::from(speed) } else { 1.0 };
    let span = total_ms as f64 / speed;
    let last = sentences.len() - 1;

    let mut timings = Vec::with_capacity(sentences.len());
    let mut cursor = 0.0;
    for (i, sentence) in sentences.iter().enumerate() {
        let end = if i == last {
            span
        } else {
            cursor + sentence.weight() as f64 / weight as f64 * span
        };
        timings.push(SentenceTiming {
            sentence_index: sentence.index,
            start_time_ms: cursor,
            end_time_ms: end,
            duration_ms: end - cursor,
        });
        cursor = end;
    }
    timings
}

/// Index of the sentence whose interval contains `t_ms`.
pub fn find_sentence_at(timings: &[SentenceTiming], t_ms: f64) -> Option<usize> {
    timings
        .iter()
        .find(|t| t.contains(t_ms))
        .map(|t| t.sentence_index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::highlight::sentence::split_sentences;

    const SAMPLE: &str = "Hello world. This is a test! How are you?";

    fn total(t: &[SentenceTiming]) -> f64 {
        t.iter().map(|t| t.duration_ms).sum()
    }

    #[test]
    fn proportional_split_of_sample() {
        let sentences = split_sentences(SAMPLE);
        let t = compute_timings(&sentences, 3_000, 1.0);
        assert_eq!(t.len(), 3);

        // 12 + 15 + 12 = 39 characters
        assert!((t[0].duration_ms - 12.0 / 39.0 * 3_000.0).abs() < 1e-6);
        assert!((t[1].duration_ms - 15.0 / 39.0 * 3_000.0).abs() < 1e-6);
        assert!((t[2].duration_ms - 12.0 / 39.0 * 3_000.0).abs() < 1e-6);
    }

    #[test]
    fn intervals_tile_the_timeline_at_every_speed() {
        let sentences = split_sentences(SAMPLE);
        for speed in [0.5_f32, 0.75, 1.0, 1.25, 1.5, 2.0] {
            let t = compute_timings(&sentences, 3_000, speed);
            let span = 3_000.0 / f64::from(speed);
            assert_eq!(t.len(), sentences.len());
            assert_eq!(t[0].start_time_ms, 0.0);
            assert_eq!(t.last().unwrap().end_time_ms, span);
            for pair in t.windows(2) {
                assert_eq!(pair[0].end_time_ms, pair[1].start_time_ms);
            }
            assert!(t.iter().all(|t| t.duration_ms > 0.0));
            assert!((total(&t) - span).abs() < 1e-6);
        }
    }

    #[test]
    fn double_speed_halves_every_duration() {
        let sentences = split_sentences(SAMPLE);
        let normal = compute_timings(&sentences, 3_000, 1.0);
        let fast = compute_timings(&sentences, 3_000, 2.0);
        for (n, f) in normal.iter().zip(&fast) {
            assert!((f.duration_ms - n.duration_ms / 2.0).abs() < 1e-6);
        }
        assert!((total(&fast) - 1_500.0).abs() < 1e-6);
    }

    #[test]
    fn unknown_duration_yields_no_timings() {
        let sentences = split_sentences(SAMPLE);
        assert!(compute_timings(&sentences, 0, 1.0).is_empty());
        assert!(compute_timings(&[], 3_000, 1.0).is_empty());
    }

    #[test]
    fn lookup_uses_half_open_intervals() {
        let sentences = split_sentences(SAMPLE);
        let t = compute_timings(&sentences, 3_000, 1.0);
        assert_eq!(find_sentence_at(&t, 0.0), Some(0));
        assert_eq!(find_sentence_at(&t, t[0].end_time_ms), Some(1));
        assert_eq!(find_sentence_at(&t, 2_999.9), Some(2));
        assert_eq!(find_sentence_at(&t, 3_000.0), None);
    }
}
