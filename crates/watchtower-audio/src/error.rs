use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("tts error: {0}")]
    Tts(String),

    #[error("stt error: {0}")]
    Stt(String),

    #[error("wav encoding error: {0}")]
    Wav(#[from] hound::Error),

    #[error("both synthesis engines failed for sentence {index}")]
    SynthesisExhausted { index: u64 },
}

impl AudioError {
    pub fn code(&self) -> &'static str {
        match self {
            AudioError::Tts(_) => "TTS_ERROR",
            AudioError::Stt(_) => "STT_ERROR",
            AudioError::Wav(_) => "WAV_ENCODING_ERROR",
            AudioError::SynthesisExhausted { .. } => "SYNTHESIS_EXHAUSTED",
        }
    }
}

pub type Result<T> = std::result::Result<T, AudioError>;
