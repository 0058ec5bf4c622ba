pub mod capture;
pub mod error;
pub mod sentence;
pub mod tts_pipeline;
pub mod types;
pub mod vad;
pub mod wakeword;

pub use error::{AudioError, Result};
pub use sentence::SentenceDetector;
pub use tts_pipeline::TtsPipeline;
pub use types::{AudioChunk, CaptureState, DrainDone, QueuedSentence, Utterance};
pub use vad::{EnergyVad, VoiceActivityDetector};
pub use wakeword::{AlwaysTrigger, WakeWordDetector};
