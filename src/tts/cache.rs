//! Caching synthesizer — wraps any [`SpeechSynthesizer`] with a bounded LRU.
//!
//! Replaying the same selection with the same voice skips the network call.
//! Only successful results are cached; a failure is always retried.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use super::synthesizer::{SpeechSynthesizer, SynthError};

type CacheKey = (String, String);

/// Least-recently-used clip store.
#[derive(Debug, Default)]
struct Lru {
    order: VecDeque<CacheKey>,
    clips: HashMap<CacheKey, Vec<u8>>,
}

impl Lru {
    fn get(&mut self, key: &CacheKey) -> Option<Vec<u8>> {
        let clip = self.clips.get(key)?.clone();
        self.touch(key);
        Some(clip)
    }

    fn insert(&mut self, key: CacheKey, clip: Vec<u8>, capacity: usize) {
        if self.clips.insert(key.clone(), clip).is_some() {
            self.touch(&key);
            return;
        }
        self.order.push_back(key);
        while self.order.len() > capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.clips.remove(&evicted);
            }
        }
    }

    fn touch(&mut self, key: &CacheKey) {
        if let Some(i) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(i) {
                self.order.push_back(k);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// CachedSynthesizer
// ---------------------------------------------------------------------------

/// # Example
/// ```rust
/// use readalong::config::TtsConfig;
/// use readalong::tts::{ApiSynthesizer, CachedSynthesizer};
///
/// let config = TtsConfig::default();
/// let synth = CachedSynthesizer::new(ApiSynthesizer::from_config(&config), config.cache_entries);
/// assert_eq!(synth.len(), 0);
/// ```
pub struct CachedSynthesizer<S: SpeechSynthesizer> {
    inner: S,
    capacity: usize,
    lru: Mutex<Lru>,
}

impl<S: SpeechSynthesizer> CachedSynthesizer<S> {
    /// Wrap `inner`, keeping at most `capacity` clips.  `0` disables caching.
    pub fn new(inner: S, capacity: usize) -> Self {
        Self {
            inner,
            capacity,
            lru: Mutex::new(Lru::default()),
        }
    }

    /// Number of cached clips.
    pub fn len(&self) -> usize {
        self.lru.lock().map(|l| l.clips.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl<S: SpeechSynthesizer> SpeechSynthesizer for CachedSynthesizer<S> {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, SynthError> {
        let key = (voice_id.to_string(), text.to_string());

        if self.capacity > 0 {
            if let Some(clip) = self.lru.lock().ok().and_then(|mut l| l.get(&key)) {
                log::debug!("tts: cache hit ({} bytes)", clip.len());
                return Ok(clip);
            }
        }

        let clip = self.inner.synthesize(text, voice_id).await?;

        if self.capacity > 0 {
            if let Ok(mut lru) = self.lru.lock() {
                lru.insert(key, clip.clone(), self.capacity);
            }
        }
        Ok(clip)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tts::synthesizer::ScriptedSynthesizer;

    #[tokio::test]
    async fn second_request_is_served_from_cache() {
        let inner = ScriptedSynthesizer::returning(Ok(vec![1, 2, 3]));
        let synth = CachedSynthesizer::new(inner.clone(), 4);

        assert_eq!(synth.synthesize("hi", "v").await.unwrap(), vec![1, 2, 3]);
        assert_eq!(synth.synthesize("hi", "v").await.unwrap(), vec![1, 2, 3]);
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test]
    async fn key_includes_voice() {
        let inner = ScriptedSynthesizer::returning(Ok(vec![9]));
        let synth = CachedSynthesizer::new(inner.clone(), 4);

        synth.synthesize("hi", "a").await.unwrap();
        synth.synthesize("hi", "b").await.unwrap();
        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let inner = ScriptedSynthesizer::returning(Err(SynthError::Timeout));
        let synth = CachedSynthesizer::new(inner.clone(), 4);

        assert!(synth.synthesize("hi", "v").await.is_err());
        *inner.result.lock().unwrap() = Ok(vec![7]);
        assert_eq!(synth.synthesize("hi", "v").await.unwrap(), vec![7]);
        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test]
    async fn evicts_least_recently_used() {
        let inner = ScriptedSynthesizer::returning(Ok(vec![0]));
        let synth = CachedSynthesizer::new(inner.clone(), 2);

        synth.synthesize("one", "v").await.unwrap();
        synth.synthesize("two", "v").await.unwrap();
        synth.synthesize("one", "v").await.unwrap(); // refresh "one"
        synth.synthesize("three", "v").await.unwrap(); // evicts "two"
        assert_eq!(inner.calls(), 3);
        assert_eq!(synth.len(), 2);

        synth.synthesize("one", "v").await.unwrap();
        assert_eq!(inner.calls(), 3);
        synth.synthesize("two", "v").await.unwrap();
        assert_eq!(inner.calls(), 4);
    }

    #[tokio::test]
    async fn zero_capacity_disables_cache() {
        let inner = ScriptedSynthesizer::returning(Ok(vec![0]));
        let synth = CachedSynthesizer::new(inner.clone(), 0);
        synth.synthesize("hi", "v").await.unwrap();
        synth.synthesize("hi", "v").await.unwrap();
        assert_eq!(inner.calls(), 2);
        assert!(synth.is_empty());
    }
}
