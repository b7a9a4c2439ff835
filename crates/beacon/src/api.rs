//! HTTP surface of the beacon
//!
//! The public router carries the simulation endpoints that drive the
//! pressure counters; the internal router carries liveness, readiness and
//! the prometheus exposition that peer gearsmith instances scrape.

use crate::config::{BeaconConfig, Role};
use crate::{clerk, courier, scribe};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use beacon_lib::{
    pressure::{self, CounterKind, TripError},
    BeaconMetrics, ChanceProvider, ClockReading, PressureHandle,
};
use prometheus::{Encoder, TextEncoder};
use rand::Rng;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: BeaconConfig,
    pub pressure: PressureHandle,
    pub chances: ChanceProvider,
    pub metrics: BeaconMetrics,
    pub client: reqwest::Client,
}

impl AppState {
    pub fn new(
        config: BeaconConfig,
        pressure: PressureHandle,
        chances: ChanceProvider,
        metrics: BeaconMetrics,
    ) -> Self {
        Self {
            config,
            pressure,
            chances,
            metrics,
            client: reqwest::Client::new(),
        }
    }
}

/// Error answer carrying the status code and the condition's message
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn not_my_job() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Not my job!")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

/// Whether the caller asked for JSON; plain text otherwise
fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|accept| accept.contains("application/json"))
        .unwrap_or(false)
}

/// Gate a request on one counter, surfacing the resource-exhausted error
async fn gate(state: &AppState, kind: CounterKind) -> Result<(), ApiError> {
    pressure::guard(&state.pressure, kind)
        .await
        .map_err(|err: TripError| {
            state.metrics.inc_gate_trips(kind.as_str());
            error!(error = %err, counter = kind.as_str(), "Trip gate fired");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        })
}

async fn register_load(state: &AppState, kind: CounterKind) -> Result<(), ApiError> {
    state.pressure.apply(kind, 1).await.map_err(|e| {
        error!(error = %e, "Pressure actor unavailable");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "pressure actor unavailable")
    })
}

async fn root() -> &'static str {
    "Genteel Beacon 🚨"
}

/// `/timestamp`: grease-gated clock answer
async fn timestamp(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    if !state.config.role.serves_clock() {
        return Err(ApiError::not_my_job());
    }

    gate(&state, CounterKind::Grease).await?;
    register_load(&state, CounterKind::Grease).await?;

    let reading = ClockReading {
        time_reading: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        clock_name: state.config.node_name.clone(),
    };

    Ok(Json(reading).into_response())
}

/// `/telegram`: ink-gated message composition with optional remote clock
async fn telegram(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if !state.config.role.serves_telegram() {
        return Err(ApiError::not_my_job());
    }

    gate(&state, CounterKind::Ink).await?;
    register_load(&state, CounterKind::Ink).await?;

    let (clock_reading, use_clock) = match &state.config.clock {
        Some(clock) => {
            let reading = courier::check_clock(&state.client, clock).await.map_err(|e| {
                error!(error = %e, "Error checking clock!");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Error checking clock!")
            })?;
            (reading, true)
        }
        None => (
            ClockReading {
                time_reading: chrono::Utc::now().format("%Y-%m-%d").to_string(),
                clock_name: "local".to_string(),
            },
            false,
        ),
    };

    let request_id = Uuid::new_v4().to_string();
    let telegram = clerk::compose_telegram(
        &state.config.name,
        &state.config.node_name,
        state.chances.current(),
        &clock_reading,
        use_clock,
        &request_id,
    )
    .await
    .map_err(|(_, err)| {
        let status = match err {
            clerk::ClerkError::Break => StatusCode::IM_A_TEAPOT,
            clerk::ClerkError::Indisposed => StatusCode::SERVICE_UNAVAILABLE,
        };
        ApiError::new(status, err.to_string())
    })?;

    if wants_json(&headers) {
        return Ok(Json(telegram).into_response());
    }
    Ok(format!(
        "{} {} provided by {}\nBuild {}, »{}« running on {} 🙋 {}",
        telegram.emoji,
        telegram.message,
        telegram.clock_reference,
        telegram.form_version,
        telegram.service,
        telegram.telegraphist,
        telegram.identifier
    )
    .into_response())
}

/// `/emission`: request headers, genteel environment and a calling card
async fn emission(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if !state.config.role.serves_lightkeeper() {
        return Err(ApiError::not_my_job());
    }

    info!("Emanating local information with request headers");

    let request_headers: HashMap<String, String> = headers
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_string(),
                v.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect();

    let genteel_env: HashMap<String, String> = std::env::vars()
        .filter(|(k, _)| k.to_uppercase().starts_with("GENTEEL_"))
        .collect();

    let request_id = Uuid::new_v4().to_string();
    let card = scribe::compose_calling_card(
        &state.config.name,
        &state.config.node_name,
        state.chances.current(),
        &request_id,
    )
    .await;

    if wants_json(&headers) {
        return Ok(Json(json!({
            "Request-Headers": request_headers,
            "Genteel-Environment": genteel_env,
            "Calling-Card": card,
        }))
        .into_response());
    }
    Ok(format!(
        "»{}« 👩🏻 {} 💌 Sincerely, {}\n✉️ Card version {} 🙋 {}",
        card.salutation, card.attendant, card.signature, card.card_version, card.identifier
    )
    .into_response())
}

/// `/calamity`: deliberate failure; the agitator role goes further
async fn calamity(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    if state.config.role == Role::Agitator {
        error!("Disrupt!");
        std::process::exit(133);
    }
    if !state.config.role.serves_lightkeeper() {
        return Err(ApiError::not_my_job());
    }

    error!("Calamity has been invoked!");
    Ok((
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"message": "Oh, no! A most dreadful calamity has occured! 💥"})),
    )
        .into_response())
}

/// Liveness: always healthy, except for the agitator's dice roll
async fn livez(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.config.role == Role::Agitator {
        let roll = rand::thread_rng().gen_range(0..100);
        if roll >= state.config.agitation {
            warn!(agitation = state.config.agitation, "Agitated liveness probe failing");
            return StatusCode::SERVICE_UNAVAILABLE;
        }
    }
    StatusCode::OK
}

/// Readiness: not ready once either counter is close to tripping
async fn readyz(State(state): State<Arc<AppState>>) -> StatusCode {
    let levels = state.pressure.levels();
    if levels.grease < 95 && levels.ink < 95 {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder.encode(&metric_families, &mut buffer).unwrap();

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Router for the public port
pub fn public_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/timestamp", get(timestamp))
        .route("/telegram", get(telegram))
        .route("/emission", get(emission))
        .route("/calamity", get(calamity))
        .with_state(state)
}

/// Router for the internal port
pub fn internal_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/livez", get(livez))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Bind and serve one router
pub async fn serve(addr: String, app: Router) -> anyhow::Result<()> {
    info!(addr = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
