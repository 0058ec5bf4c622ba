use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::auth::verify_password;
use crate::error::{GatewayError, Result};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in_days: u32,
}

/// `POST /api/auth/login` — the only way to obtain a bearer token, since
/// this is a single-operator tool with no account system.
pub async fn login_handler(State(state): State<Arc<AppState>>, Json(body): Json<LoginRequest>) -> Result<Json<LoginResponse>> {
    if !verify_password(&body.password, &state.config.gateway.auth.password) {
        return Err(GatewayError::Unauthorized);
    }
    Ok(Json(LoginResponse {
        token: state.auth.issue(),
        expires_in_days: state.config.gateway.auth.token_ttl_days,
    }))
}
