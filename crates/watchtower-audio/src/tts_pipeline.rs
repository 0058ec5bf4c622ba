use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{info, warn};
use watchtower_core::config::AudioConfig;
use watchtower_dispatch::clients::tts::{TtsClient, TtsEngine};

use crate::error::AudioError;
use crate::types::{AudioChunk, DrainDone, QueuedSentence};

/// Tracks primary-engine health across responses: a failure marks it
/// unhealthy for `RECOVERY_INTERVAL`, during which the primary is bypassed
/// entirely (§4.6 step 4).
struct EngineHealth {
    unhealthy_since: Mutex<Option<Instant>>,
    recovery_interval: Duration,
}

impl EngineHealth {
    fn new(recovery_interval: Duration) -> Self {
        Self {
            unhealthy_since: Mutex::new(None),
            recovery_interval,
        }
    }

    fn should_try_primary(&self) -> bool {
        let guard = self.unhealthy_since.lock().unwrap();
        match *guard {
            Some(since) => since.elapsed() >= self.recovery_interval,
            None => true,
        }
    }

    fn mark_unhealthy(&self) {
        *self.unhealthy_since.lock().unwrap() = Some(Instant::now());
    }

    fn mark_healthy(&self) {
        *self.unhealthy_since.lock().unwrap() = None;
    }
}

/// Per-response lock enforcing voice-consistency (§4.6 step 3): once any
/// sentence falls back, every subsequent sentence in the same response
/// skips the primary engine directly.
#[derive(Default)]
struct EngineLock(AtomicBool);

impl EngineLock {
    fn is_fallback(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn set_fallback(&self) {
        self.0.store(true, Ordering::Release);
    }
}

type SynthCache = DashMap<(String, TtsEngine), (Vec<u8>, String)>;

/// Sentence-streamed TTS with primary/fallback routing (§4.6 Outbound).
/// One instance serves the whole process; [`drain_response`] is invoked
/// once per response and owns that response's sequential drain task.
pub struct TtsPipeline {
    primary: Arc<dyn TtsClient>,
    fallback: Arc<dyn TtsClient>,
    cfg: AudioConfig,
    health: EngineHealth,
    cache: SynthCache,
}

impl TtsPipeline {
    pub fn new(primary: Arc<dyn TtsClient>, fallback: Arc<dyn TtsClient>, cfg: AudioConfig) -> Self {
        let recovery_interval = Duration::from_secs(cfg.tts_recovery_interval_secs);
        Self {
            primary,
            fallback,
            health: EngineHealth::new(recovery_interval),
            cache: DashMap::new(),
            cfg,
        }
    }

    /// Drain a response's sentence queue strictly in order, emitting each
    /// synthesized chunk on `chunks_tx` and a final `DrainDone` on
    /// `done_tx`. Stops early (without recalling already-emitted chunks) if
    /// the subscriber disconnects — the caller's cancellation of the
    /// response drops `sentences_rx`, which ends this loop naturally.
    pub async fn drain_response(
        &self,
        mut sentences_rx: mpsc::Receiver<QueuedSentence>,
        chunks_tx: mpsc::Sender<AudioChunk>,
        done_tx: tokio::sync::oneshot::Sender<DrainDone>,
    ) {
        let lock = EngineLock::default();
        let mut total_chunks = 0u64;

        while let Some(sentence) = sentences_rx.recv().await {
            match self.synthesize_one(&sentence, &lock).await {
                Ok(chunk) => {
                    total_chunks += 1;
                    if chunks_tx.send(chunk).await.is_err() {
                        return; // subscriber gone, stop producing further sentences
                    }
                }
                Err(err) => {
                    warn!(index = sentence.index, error = %err, "sentence synthesis exhausted, skipping");
                }
            }
        }

        let _ = done_tx.send(DrainDone { total_chunks });
    }

    async fn synthesize_one(&self, sentence: &QueuedSentence, lock: &EngineLock) -> crate::error::Result<AudioChunk> {
        if !lock.is_fallback() && self.health.should_try_primary() {
            if let Some(cached) = self.cache.get(&(sentence.text.clone(), TtsEngine::Primary)) {
                let (audio, content_type) = cached.clone();
                return Ok(AudioChunk { index: sentence.index, audio, content_type, engine: TtsEngine::Primary });
            }

            let deadline = Duration::from_millis(self.cfg.tts_primary_deadline_ms);
            match tokio::time::timeout(deadline, self.primary.synthesize(&sentence.text)).await {
                Ok(Ok((audio, content_type))) => {
                    self.health.mark_healthy();
                    self.cache
                        .insert((sentence.text.clone(), TtsEngine::Primary), (audio.clone(), content_type.clone()));
                    return Ok(AudioChunk { index: sentence.index, audio, content_type, engine: TtsEngine::Primary });
                }
                Ok(Err(err)) => {
                    warn!(error = %err, "primary tts engine errored, falling back");
                    self.health.mark_unhealthy();
                }
                Err(_) => {
                    warn!(deadline_ms = self.cfg.tts_primary_deadline_ms, "primary tts engine timed out, falling back");
                    self.health.mark_unhealthy();
                }
            }
        }

        if let Some(cached) = self.cache.get(&(sentence.text.clone(), TtsEngine::Fallback)) {
            let (audio, content_type) = cached.clone();
            lock.set_fallback();
            return Ok(AudioChunk { index: sentence.index, audio, content_type, engine: TtsEngine::Fallback });
        }

        let deadline = Duration::from_millis(self.cfg.tts_fallback_deadline_ms);
        match tokio::time::timeout(deadline, self.fallback.synthesize(&sentence.text)).await {
            Ok(Ok((audio, content_type))) => {
                lock.set_fallback();
                self.cache
                    .insert((sentence.text.clone(), TtsEngine::Fallback), (audio.clone(), content_type.clone()));
                Ok(AudioChunk { index: sentence.index, audio, content_type, engine: TtsEngine::Fallback })
            }
            Ok(Err(err)) => {
                info!(error = %err, index = sentence.index, "fallback tts engine also errored");
                Err(AudioError::SynthesisExhausted { index: sentence.index })
            }
            Err(_) => {
                info!(index = sentence.index, "fallback tts engine also timed out");
                Err(AudioError::SynthesisExhausted { index: sentence.index })
            }
        }
    }
}
