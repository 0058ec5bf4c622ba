use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Monotonic marks recorded across one request's lifecycle, relative to
/// `t0_received` (§4.5 RequestTimer).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TimerBreakdown {
    pub t0_received: u64,
    pub t1_routed: Option<u64>,
    pub t2_llm_start: Option<u64>,
    pub t3_first_token: Option<u64>,
    pub t4_llm_done: Option<u64>,
    pub t5_tts_queued: Option<u64>,
    pub t6_tts_first: Option<u64>,
    pub t7_audio_delivered: Option<u64>,
    pub total: Option<u64>,
}

/// Records mark timestamps in milliseconds since the timer was created.
/// One `RequestTimer` per request; attached to the response-done event on
/// completion.
pub struct RequestTimer {
    start: Instant,
    marks: TimerBreakdown,
}

impl RequestTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            marks: TimerBreakdown {
                t0_received: 0,
                ..Default::default()
            },
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    pub fn mark_routed(&mut self) {
        self.marks.t1_routed = Some(self.elapsed_ms());
    }

    pub fn mark_llm_start(&mut self) {
        self.marks.t2_llm_start = Some(self.elapsed_ms());
    }

    pub fn mark_first_token(&mut self) {
        self.marks.t3_first_token = Some(self.elapsed_ms());
    }

    pub fn mark_llm_done(&mut self) {
        self.marks.t4_llm_done = Some(self.elapsed_ms());
    }

    pub fn mark_tts_queued(&mut self) {
        self.marks.t5_tts_queued = Some(self.elapsed_ms());
    }

    pub fn mark_tts_first(&mut self) {
        self.marks.t6_tts_first = Some(self.elapsed_ms());
    }

    pub fn mark_audio_delivered(&mut self) {
        self.marks.t7_audio_delivered = Some(self.elapsed_ms());
    }

    /// Finalise the timer: stamps `total`, logs a single human-readable line,
    /// and returns the breakdown for attachment to the response-done event.
    pub fn finish(mut self, request_id: &str) -> TimerBreakdown {
        let total = self.elapsed_ms();
        self.marks.total = Some(total);
        tracing::info!(
            request_id,
            routed_ms = self.marks.t1_routed,
            llm_start_ms = self.marks.t2_llm_start,
            first_token_ms = self.marks.t3_first_token,
            llm_done_ms = self.marks.t4_llm_done,
            tts_queued_ms = self.marks.t5_tts_queued,
            tts_first_ms = self.marks.t6_tts_first,
            audio_delivered_ms = self.marks.t7_audio_delivered,
            total_ms = total,
            "request timing breakdown"
        );
        self.marks
    }
}
