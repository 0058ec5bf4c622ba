/// Runs on speech frames only (§4.6 Inbound, wake-word detector). The
/// pipeline is deployment-specific (a local keyword model, a cloud hint
/// endpoint); this trait keeps the capture state machine decoupled from
/// whichever backend is configured.
pub trait WakeWordDetector: Send + Sync {
    /// Returns true if `frame` contains the wake phrase.
    fn detect(&mut self, frame: &[i16]) -> bool;
}

/// Always-on detector useful for push-to-talk deployments where the wake
/// word stage is a no-op and every speech frame starts an utterance.
pub struct AlwaysTrigger;

impl WakeWordDetector for AlwaysTrigger {
    fn detect(&mut self, _frame: &[i16]) -> bool {
        true
    }
}
