use watchtower_dispatch::clients::tts::TtsEngine;

/// One synthesized sentence, ready for delivery to the subscriber in order
/// (§4.6 step 2).
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub index: u64,
    pub audio: Vec<u8>,
    pub content_type: String,
    pub engine: TtsEngine,
}

/// Sentence queued for synthesis, produced by the sentence detector as the
/// LLM streams tokens.
#[derive(Debug, Clone)]
pub struct QueuedSentence {
    pub index: u64,
    pub text: String,
}

/// Terminal event for a response's sentence-drain task (§4.6 step 5).
#[derive(Debug, Clone)]
pub struct DrainDone {
    pub total_chunks: u64,
}

/// One completed inbound utterance, WAV-wrapped and ready to hand to the
/// session's voice-in path (§4.6 Inbound).
#[derive(Debug, Clone)]
pub struct Utterance {
    pub wav_bytes: Vec<u8>,
    pub sample_rate_hz: u32,
    pub duration_ms: u64,
}

/// Capture state machine states (§4.6 Inbound).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Capturing,
}
