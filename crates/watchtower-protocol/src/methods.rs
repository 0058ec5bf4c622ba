// Realtime namespace method/event names (§6 Connection surface).
//
// `/chat` — client sends user message; server emits timing, first-token
// marker, text deltas, tool_call, done{timing}.
pub mod chat {
    pub const SEND: &str = "chat.send";
    pub const ABORT: &str = "chat.abort";
    pub const CONFIRM: &str = "chat.confirm";

    pub const EV_TIMING: &str = "timing";
    pub const EV_FIRST_TOKEN: &str = "first_token";
    pub const EV_TEXT_DELTA: &str = "text_delta";
    pub const EV_TOOL_CALL: &str = "tool_call";
    pub const EV_DONE: &str = "done";
}

/// `/voice` — client streams base64 WAV chunks; server emits transcript and
/// ordered TTS chunks.
pub mod voice {
    pub const AUDIO_START: &str = "audio_start";
    pub const AUDIO_CHUNK: &str = "audio_chunk";
    pub const AUDIO_END: &str = "audio_end";

    pub const EV_LISTENING: &str = "listening";
    pub const EV_PROCESSING: &str = "processing";
    pub const EV_TRANSCRIPT: &str = "transcript";
    pub const EV_THINKING: &str = "thinking";
    pub const EV_TTS_CHUNK: &str = "tts_chunk";
    pub const EV_TTS_DONE: &str = "tts_done";
    pub const EV_ERROR: &str = "error";
}

/// `/events` — server-pushed cluster/runbook/kill-switch events.
pub mod events {
    pub const EV_EVENT: &str = "event";
}

pub const CONNECT: &str = "connect";
