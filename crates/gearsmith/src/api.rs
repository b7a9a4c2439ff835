//! Custom-metrics API surface
//!
//! A minimal clone of the custom.metrics.k8s.io/v1beta1 shape, enough for a
//! HorizontalPodAutoscaler to consume, served over TLS. No request
//! authentication; the cluster's network policy is the boundary.

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use axum_server::tls_rustls::RustlsConfig;
use beacon_lib::{GaugeSample, SnapshotReader};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared state of the custom-metrics handlers
#[derive(Clone)]
pub struct GearState {
    pub namespace: String,
    pub snapshots: SnapshotReader,
}

/// Liveness payload on the API root
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({"status": "healthy"}))
}

/// Debugging dump of the current snapshot
async fn stats(State(state): State<Arc<GearState>>) -> Json<beacon_lib::Snapshot> {
    Json((*state.snapshots.latest()).clone())
}

/// One beacon metric in the MetricValueList envelope
async fn metric_value(
    State(state): State<Arc<GearState>>,
    Path((_namespace, beacon, metric)): Path<(String, String, String)>,
) -> impl IntoResponse {
    let sample = state.snapshots.latest().sample(&beacon);
    let (gauge, noun) = match metric.as_str() {
        "gearvalue" => (sample.grease, "gear"),
        "inkvalue" => (sample.ink, "ink"),
        _ => {
            warn!(metric = %metric, "Queried unknown metric name");
            return (StatusCode::NOT_FOUND, "unknown metric").into_response();
        }
    };

    if gauge.count == 0 {
        warn!(beacon = %beacon, "Queried non-existent {noun}");
    }

    Json(envelope(&state.namespace, &beacon, &metric, gauge)).into_response()
}

/// The single-item MetricValueList answer; the value is the rounded sum
fn envelope(
    namespace: &str,
    beacon: &str,
    metric: &str,
    gauge: GaugeSample,
) -> serde_json::Value {
    json!({
        "kind": "MetricValueList",
        "apiVersion": "custom.metrics.k8s.io/v1beta1",
        "metadata": {
            "selfLink": "/apis/custom.metrics.k8s.io/v1beta1",
        },
        "items": [{
            "describedObject": {
                "kind": "Service",
                "namespace": namespace,
                "name": beacon,
                "apiVersion": "v1beta1",
            },
            "metricName": metric,
            "timestamp": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            "value": format!("{}", gauge.sum.round() as i64),
        }],
    })
}

/// Router for the custom-metrics port
pub fn router(state: Arc<GearState>) -> Router {
    Router::new()
        .route("/stats", get(stats))
        .route("/apis/custom.metrics.k8s.io/v1beta1", get(health_check))
        .route(
            "/apis/custom.metrics.k8s.io/v1beta1/namespaces/:namespace/services/:beacon/:metric",
            get(metric_value),
        )
        .with_state(state)
}

/// Bind the TLS listener and serve; missing credentials are fatal
pub async fn serve_tls(addr: SocketAddr, cert: String, key: String, app: Router) -> Result<()> {
    let tls = RustlsConfig::from_pem_file(&cert, &key)
        .await
        .with_context(|| format!("could not load TLS credentials from {cert} and {key}"))?;

    info!(addr = %addr, "Starting custom-metrics server");
    axum_server::bind_rustls(addr, tls)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
