pub mod broadcast;
pub mod chat;
pub mod connection;
pub mod handshake;
pub mod voice;

/// A `connect` request must arrive within this window or the socket closes.
pub const HANDSHAKE_TIMEOUT_MS: u64 = 5_000;
/// Idle keepalive tick once a connection is authenticated.
pub const HEARTBEAT_INTERVAL_SECS: u64 = 30;

pub use connection::ws_handler;
