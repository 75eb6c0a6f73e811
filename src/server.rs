//! HTTP surface: liveness probes for every deployment, plus the webhook and
//! external tick routes for the webhook deployment.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::bot::{dispatch, CommandHandler};
use crate::monitor::{Monitor, TickOutcome};
use crate::notify::Notifier;
use crate::telegram::Update;

pub const SERVICE_NAME: &str = "fundwatch";
pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

async fn root() -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// `GET /` and `GET /health`.
pub fn health_router() -> Router {
    Router::new().route("/", get(root)).route("/health", get(health))
}

#[derive(Clone)]
pub struct WebhookState {
    pub handler: Arc<CommandHandler>,
    pub notifier: Arc<dyn Notifier>,
    pub monitor: Arc<Monitor>,
    pub secret: Option<String>,
}

/// Health routes plus `POST /webhook` and `POST /tick`.
pub fn webhook_router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/tick", post(tick))
        .with_state(state)
        .merge(health_router())
}

fn secret_matches(expected: Option<&str>, headers: &HeaderMap) -> bool {
    let Some(expected) = expected else {
        return true;
    };
    headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|got| got == expected)
        .unwrap_or(false)
}

async fn webhook(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    if !secret_matches(state.secret.as_deref(), &headers) {
        warn!("webhook call with missing or wrong secret");
        return Err(StatusCode::UNAUTHORIZED);
    }
    // unparseable updates are acknowledged so Telegram does not redeliver them
    match serde_json::from_value::<Update>(body) {
        Ok(update) => dispatch(&state.handler, state.notifier.as_ref(), &update).await,
        Err(e) => warn!(error = %e, "ignoring malformed update"),
    }
    Ok(Json(json!({ "status": "ok" })))
}

/// Runs one monitoring tick; meant for an external scheduler. Each call
/// hits the exchange, so it takes the same secret header as `/webhook`.
async fn tick(State(state): State<WebhookState>, headers: HeaderMap) -> Result<Json<TickOutcome>, StatusCode> {
    if !secret_matches(state.secret.as_deref(), &headers) {
        warn!("tick call with missing or wrong secret");
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(state.monitor.tick().await))
}

pub async fn serve(router: Router, port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "http server listening");
    axum::serve(listener, router).await?;
    Ok(())
}
