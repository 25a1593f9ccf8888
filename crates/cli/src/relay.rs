//! HTTP relay in front of the engine.
//!
//! `POST /api/totp` issues the current code for a secret and
//! `POST /api/totp/verify` checks one. There is no rate limiting: a caller
//! can try codes as fast as it likes.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use totp_engine::{generate, remaining_at, unix_now, verify, OtpError, TotpConfig};

use crate::input::{clean_token, read_secret, SecretFormat};

pub type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

#[derive(Clone)]
pub struct RelayState {
    config: Arc<TotpConfig>,
    clock: Clock,
}

impl RelayState {
    pub fn new(config: TotpConfig) -> Self {
        RelayState::with_clock(config, Arc::new(unix_now))
    }

    pub fn with_clock(config: TotpConfig, clock: Clock) -> Self {
        RelayState {
            config: Arc::new(config),
            clock,
        }
    }
}

pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/api/totp", post(generate_token))
        .route("/api/totp/verify", post(verify_token))
        .with_state(state)
}

/// Serve the relay until the process is stopped.
pub async fn serve(addr: SocketAddr, state: RelayState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    log::info!("TOTP relay listening on http://{addr}");
    axum::serve(listener, router(state))
        .await
        .context("relay server stopped")?;
    Ok(())
}

#[derive(Deserialize)]
struct GenerateRequest {
    secret: Option<String>,
    #[serde(default)]
    format: SecretFormat,
}

#[derive(Serialize)]
struct GenerateResponse {
    token: String,
    remaining: u64,
}

#[derive(Deserialize)]
struct VerifyRequest {
    secret: Option<String>,
    token: Option<String>,
    #[serde(default)]
    format: SecretFormat,
}

#[derive(Serialize)]
struct VerifyResponse {
    success: bool,
    message: &'static str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

enum RelayError {
    Missing(&'static str),
    BadRequest(String),
    Engine(OtpError),
}

impl From<OtpError> for RelayError {
    fn from(e: OtpError) -> Self {
        RelayError::Engine(e)
    }
}

impl From<JsonRejection> for RelayError {
    fn from(rejection: JsonRejection) -> Self {
        RelayError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            RelayError::Missing(field) => (StatusCode::BAD_REQUEST, format!("{field} required")),
            RelayError::BadRequest(error) => (StatusCode::BAD_REQUEST, error),
            RelayError::Engine(e) if e.is_secret_error() => (StatusCode::BAD_REQUEST, e.to_string()),
            RelayError::Engine(e) => {
                log::error!("engine failure: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, RelayError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(RelayError::Missing(field))
}

async fn generate_token(
    State(state): State<RelayState>,
    req: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, RelayError> {
    let Json(req) = req?;
    let secret = required(req.secret, "secret")?;
    let secret = read_secret(&secret, req.format, &state.config)?;
    let now = (state.clock)();
    let code = generate(&secret, now, &state.config)?;
    let remaining = remaining_at(now, &state.config)?;
    log::info!("issued code, {remaining}s remaining");
    Ok(Json(GenerateResponse {
        token: code.to_string(),
        remaining,
    }))
}

async fn verify_token(
    State(state): State<RelayState>,
    req: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<VerifyResponse>), RelayError> {
    let Json(req) = req?;
    let secret = required(req.secret, "secret")?;
    let token = required(req.token, "token")?;
    let secret = read_secret(&secret, req.format, &state.config)?;
    let now = (state.clock)();

    if verify(&secret, &clean_token(&token), now, &state.config)? {
        log::info!("code verified");
        Ok((
            StatusCode::OK,
            Json(VerifyResponse {
                success: true,
                message: "TOTP verified!",
            }),
        ))
    } else {
        log::info!("code rejected");
        Ok((
            StatusCode::UNAUTHORIZED,
            Json(VerifyResponse {
                success: false,
                message: "Invalid TOTP",
            }),
        ))
    }
}
