use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct HealthQuery {
    #[serde(default)]
    liveness: Option<String>,
}

async fn component_status<F>(check: F) -> &'static str
where
    F: std::future::Future<Output = bool>,
{
    match tokio::time::timeout(Duration::from_secs(3), check).await {
        Ok(true) => "ok",
        Ok(false) => "down",
        Err(_) => "timeout",
    }
}

/// `GET /api/health` — component vector `{tts,llm,database,hypervisor}`.
/// `?liveness` short-circuits to a minimal probe with no outbound calls.
pub async fn health_handler(State(state): State<Arc<AppState>>, Query(q): Query<HealthQuery>) -> Json<Value> {
    if q.liveness.is_some() {
        return Json(json!({ "status": "ok" }));
    }

    let db_ok = {
        let conn = state.db.lock().unwrap();
        conn.query_row("SELECT 1", [], |_| Ok(())).is_ok()
    };

    let llm = component_status(async { state.llm.tokenize("ping").await.is_ok() }).await;
    let hypervisor = component_status(async { state.hypervisor.cluster_status().await.is_ok() }).await;
    // The TTS clients have no cheap liveness probe in their trait surface;
    // reporting "ok" here just means the provider is configured, not reachable.
    let tts = "ok";

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": 1,
        "components": {
            "database": if db_ok { "ok" } else { "down" },
            "llm": llm,
            "tts": tts,
            "hypervisor": hypervisor,
        },
    }))
}
