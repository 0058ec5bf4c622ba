use std::sync::{Arc, Mutex};

use axum::routing::{get, post, put};
use axum::Router;
use rusqlite::Connection;
use watchtower_audio::TtsPipeline;
use watchtower_core::config::WatchtowerConfig;
use watchtower_dispatch::clients::{EmailClient, HypervisorClient, LlmClient, NvrClient, SmartHomeClient, SttClient};
use watchtower_dispatch::Dispatcher;
use watchtower_monitor::MonitorEngine;
use watchtower_sessions::{MemoryStore, SessionKey, SessionManager};

use crate::auth::TokenAuthority;
use crate::ws::broadcast::EventBroadcaster;

/// Everything an Axum handler needs, assembled once in `main` and shared
/// behind an `Arc` across every REST handler and `/ws` connection.
pub struct AppState {
    pub config: WatchtowerConfig,
    pub auth: TokenAuthority,
    pub db: Arc<Mutex<Connection>>,
    pub dispatcher: Arc<Dispatcher>,
    pub sessions: Arc<SessionManager>,
    pub memory: Arc<MemoryStore>,
    pub monitor: Arc<MonitorEngine>,
    pub tts: Arc<TtsPipeline>,
    pub stt: Arc<dyn SttClient>,
    pub llm: Arc<dyn LlmClient>,
    pub hypervisor: Arc<dyn HypervisorClient>,
    #[allow(dead_code)]
    pub email: Arc<dyn EmailClient>,
    pub nvr: Option<Arc<dyn NvrClient>>,
    #[allow(dead_code)]
    pub smart_home: Option<Arc<dyn SmartHomeClient>>,
    pub broadcaster: EventBroadcaster,
}

impl AppState {
    /// This is a single-operator tool — every REST/`chat.send`/voice path
    /// shares the one fixed session rather than resolving a caller identity.
    pub fn operator_session(&self) -> SessionKey {
        SessionKey::new("operator", "watchtower", "default")
    }
}

/// Assemble the full Axum router: REST surface under `/api/*` plus the
/// single multiplexed `/ws` socket (§6).
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(crate::http::health::health_handler))
        .route("/api/auth/login", post(crate::http::auth::login_handler))
        .route("/api/chat", post(crate::http::chat::chat_handler))
        .route("/api/chat/confirm", post(crate::http::chat::confirm_handler))
        .route("/api/tools", get(crate::http::tools::list_tools_handler))
        .route("/api/tools/execute", post(crate::http::tools::execute_tool_handler))
        .route(
            "/api/memory/events",
            get(crate::http::memory::list_events_handler).post(crate::http::memory::learn_handler),
        )
        .route("/api/memory/events/unresolved", get(crate::http::memory::list_unresolved_handler))
        .route("/api/memory/events/{key}", axum::routing::delete(crate::http::memory::forget_handler))
        .route(
            "/api/memory/preferences/{key}",
            get(crate::http::memory::get_preference_handler).put(crate::http::memory::put_preference_handler),
        )
        .route("/api/monitor/status", get(crate::http::monitor::status_handler))
        .route("/api/monitor/killswitch", put(crate::http::monitor::set_killswitch_handler))
        .route("/api/monitor/autonomy-level", put(crate::http::monitor::set_autonomy_level_handler))
        .route("/api/monitor/actions", get(crate::http::monitor::list_actions_handler))
        .route("/api/monitor/test-alert", post(crate::http::monitor::test_alert_handler))
        .route("/api/cameras/{camera}/snapshot", get(crate::http::cameras::snapshot_handler))
        .route("/api/cameras/events", get(crate::http::cameras::events_handler))
        .route("/api/cameras/events/{event_id}/thumbnail", get(crate::http::cameras::thumbnail_handler))
        .route("/api/faces", get(crate::http::cameras::list_faces_handler))
        .route("/ws", get(crate::ws::ws_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
