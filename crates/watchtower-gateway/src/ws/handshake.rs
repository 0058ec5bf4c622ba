use uuid::Uuid;
use watchtower_protocol::frames::EventFrame;
use watchtower_protocol::handshake::{ClientPolicy, ConnectParams, HelloOk, ServerInfo};

use crate::app::AppState;

/// A fresh per-connection nonce, included in the challenge event purely so a
/// client can correlate its connect attempt with the socket it opened —
/// there is nothing to sign it against in the single bearer-token auth mode.
pub fn make_nonce() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn challenge_event(nonce: &str) -> String {
    let frame = EventFrame::new("connect.challenge", serde_json::json!({ "nonce": nonce }));
    serde_json::to_string(&frame).unwrap_or_default()
}

/// Verify the bearer token carried in a `connect` request's `auth.token`.
pub fn verify_auth(params: &ConnectParams, app: &AppState) -> Result<(), String> {
    if app.auth.verify(&params.auth.token) {
        Ok(())
    } else {
        Err("invalid or expired token".to_string())
    }
}

pub fn hello_ok_payload() -> HelloOk {
    HelloOk {
        protocol: 1,
        server: ServerInfo {
            name: "watchtower-gateway".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        policy: ClientPolicy {
            max_payload_bytes: watchtower_core::config::MAX_PAYLOAD_BYTES,
        },
    }
}
