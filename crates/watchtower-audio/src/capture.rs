use std::collections::VecDeque;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use watchtower_core::config::AudioConfig;

use crate::error::Result;
use crate::types::{CaptureState, Utterance};
use crate::vad::VoiceActivityDetector;
use crate::wakeword::WakeWordDetector;

/// Frame-by-frame utterance boundary detection (§4.6 Inbound). Pure and
/// synchronous; [`run`] wraps it in the async capture task.
pub struct CaptureMachine {
    cfg: AudioConfig,
    state: CaptureState,
    pre_roll: VecDeque<Vec<i16>>,
    pre_roll_capacity: usize,
    pending: Vec<i16>,
    silence_frames: u32,
    capturing_frames: u32,
    silence_limit_frames: u32,
    ceiling_frames: u32,
}

impl CaptureMachine {
    pub fn new(cfg: AudioConfig) -> Self {
        let frame_duration_ms = (cfg.frame_samples as f64 * 1000.0) / cfg.sample_rate_hz as f64;
        let pre_roll_capacity = ((cfg.pre_roll_ms as f64 / frame_duration_ms).ceil() as usize).max(1);
        let silence_limit_frames = ((cfg.trailing_silence_ms as f64 / frame_duration_ms).ceil() as u32).max(1);
        let ceiling_frames = (((cfg.max_utterance_secs * 1000) as f64 / frame_duration_ms).ceil() as u32).max(1);

        Self {
            cfg,
            state: CaptureState::Idle,
            pre_roll: VecDeque::with_capacity(pre_roll_capacity),
            pre_roll_capacity,
            pending: Vec::new(),
            silence_frames: 0,
            capturing_frames: 0,
            silence_limit_frames,
            ceiling_frames,
        }
    }

    /// Feed one PCM frame through the VAD/wake-word/boundary pipeline.
    /// Returns `Some(Utterance)` when a trailing-silence or hard-ceiling
    /// boundary completes the current capture.
    pub fn process_frame(
        &mut self,
        frame: &[i16],
        vad: &mut dyn VoiceActivityDetector,
        wakeword: &mut dyn WakeWordDetector,
    ) -> Option<Utterance> {
        let is_speech = vad.is_speech(frame);

        match self.state {
            CaptureState::Idle => {
                self.push_pre_roll(frame);
                if is_speech && wakeword.detect(frame) {
                    debug!("wake word detected, draining pre-roll into utterance");
                    self.pending = self.pre_roll.iter().flatten().copied().collect();
                    self.pre_roll.clear();
                    self.silence_frames = 0;
                    self.capturing_frames = 0;
                    self.state = CaptureState::Capturing;
                }
                None
            }
            CaptureState::Capturing => {
                self.pending.extend_from_slice(frame);
                self.capturing_frames += 1;

                if is_speech {
                    self.silence_frames = 0;
                } else {
                    self.silence_frames += 1;
                }

                let trailing_silence_hit = self.silence_frames >= self.silence_limit_frames;
                let ceiling_hit = self.capturing_frames >= self.ceiling_frames;

                if trailing_silence_hit || ceiling_hit {
                    if ceiling_hit {
                        warn!(
                            frames = self.capturing_frames,
                            "utterance hit the hard ceiling, ending capture"
                        );
                    }
                    let utterance = self.finish_utterance();
                    self.state = CaptureState::Idle;
                    self.pre_roll.clear();
                    Some(utterance)
                } else {
                    None
                }
            }
        }
    }

    fn push_pre_roll(&mut self, frame: &[i16]) {
        if self.pre_roll.len() >= self.pre_roll_capacity {
            self.pre_roll.pop_front();
        }
        self.pre_roll.push_back(frame.to_vec());
    }

    fn finish_utterance(&mut self) -> Utterance {
        let samples = std::mem::take(&mut self.pending);
        let duration_ms = (samples.len() as u64 * 1000) / self.cfg.sample_rate_hz as u64;
        let wav_bytes = encode_wav(&samples, self.cfg.sample_rate_hz).unwrap_or_default();
        Utterance {
            wav_bytes,
            sample_rate_hz: self.cfg.sample_rate_hz,
            duration_ms,
        }
    }
}

fn encode_wav(samples: &[i16], sample_rate_hz: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: sample_rate_hz,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &s in samples {
            writer.write_sample(s)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Background capture task: reads PCM frames off `frames_rx`, feeds the
/// state machine, and forwards completed utterances on `utterances_tx`.
/// Shutdown-signal aware; a dropped `frames_rx` (backend disconnect) ends
/// the task without discarding whatever is already captured — a reconnect
/// simply starts a fresh task.
pub async fn run(
    cfg: AudioConfig,
    mut vad: Box<dyn VoiceActivityDetector>,
    mut wakeword: Box<dyn WakeWordDetector>,
    mut frames_rx: mpsc::Receiver<Vec<i16>>,
    utterances_tx: mpsc::Sender<Utterance>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut machine = CaptureMachine::new(cfg);
    loop {
        tokio::select! {
            frame = frames_rx.recv() => {
                match frame {
                    Some(frame) => {
                        if let Some(utterance) = machine.process_frame(&frame, vad.as_mut(), wakeword.as_mut()) {
                            info!(duration_ms = utterance.duration_ms, "utterance captured");
                            if utterances_tx.send(utterance).await.is_err() {
                                return;
                            }
                        }
                    }
                    None => {
                        debug!("frame source disconnected, ending capture task");
                        return;
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("capture task shutting down");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vad::EnergyVad;
    use crate::wakeword::AlwaysTrigger;

    fn test_cfg() -> AudioConfig {
        AudioConfig {
            tts_primary_deadline_ms: 3_000,
            tts_fallback_deadline_ms: 10_000,
            tts_recovery_interval_secs: 30,
            sample_rate_hz: 16_000,
            frame_samples: 512,
            pre_roll_ms: 64, // 2 frames at 32ms/frame
            trailing_silence_ms: 64,
            max_utterance_secs: 1,
        }
    }

    #[test]
    fn idle_to_capturing_on_wake_word_preserves_pre_roll() {
        let mut machine = CaptureMachine::new(test_cfg());
        let mut vad = EnergyVad::new(500.0);
        let mut wakeword = AlwaysTrigger;

        let silence = vec![0i16; 512];
        let loud = vec![20_000i16; 512];

        assert!(machine.process_frame(&silence, &mut vad, &mut wakeword).is_none());
        assert!(machine.process_frame(&loud, &mut vad, &mut wakeword).is_none());
        assert_eq!(machine.state, CaptureState::Capturing);
        assert!(machine.pending.len() >= 512, "pre-roll should seed the pending buffer");
    }

    #[test]
    fn trailing_silence_ends_utterance() {
        let mut machine = CaptureMachine::new(test_cfg());
        let mut vad = EnergyVad::new(500.0);
        let mut wakeword = AlwaysTrigger;
        let loud = vec![20_000i16; 512];
        let silence = vec![0i16; 512];

        machine.process_frame(&loud, &mut vad, &mut wakeword);
        assert_eq!(machine.state, CaptureState::Capturing);

        let mut result = None;
        for _ in 0..5 {
            result = machine.process_frame(&silence, &mut vad, &mut wakeword);
            if result.is_some() {
                break;
            }
        }
        assert!(result.is_some());
        assert_eq!(machine.state, CaptureState::Idle);
    }
}
