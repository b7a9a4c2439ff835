//! Integration tests for the custom-metrics API

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use beacon_lib::{CycleReadings, EmptyCyclePolicy, Snapshot, SnapshotPublisher, SnapshotReader};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

#[path = "../src/api.rs"]
mod api;

use api::GearState;

fn reader_with(beacon: &str, grease: &[f64], ink: &[f64]) -> SnapshotReader {
    let (publisher, reader) = SnapshotPublisher::new();
    let mut cycle = HashMap::new();
    cycle.insert(
        beacon.to_string(),
        CycleReadings {
            grease: grease.to_vec(),
            ink: ink.to_vec(),
        },
    );
    publisher.publish(Snapshot::next_cycle(
        &Snapshot::default(),
        &cycle,
        EmptyCyclePolicy::Zero,
    ));
    reader
}

fn app(snapshots: SnapshotReader) -> axum::Router {
    api::router(Arc::new(GearState {
        namespace: "genteelbeacon".to_string(),
        snapshots,
    }))
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_api_root_reports_healthy() {
    let app = app(reader_with("gildedgateway", &[], &[]));
    let (status, body) = get(app, "/apis/custom.metrics.k8s.io/v1beta1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_gearvalue_reports_the_rounded_grease_sum() {
    let app = app(reader_with("gildedgateway", &[10.2, 20.4], &[1.0]));
    let (status, body) = get(
        app,
        "/apis/custom.metrics.k8s.io/v1beta1/namespaces/genteelbeacon/services/gildedgateway/gearvalue",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "MetricValueList");
    assert_eq!(body["apiVersion"], "custom.metrics.k8s.io/v1beta1");

    let item = &body["items"][0];
    assert_eq!(item["describedObject"]["kind"], "Service");
    assert_eq!(item["describedObject"]["namespace"], "genteelbeacon");
    assert_eq!(item["describedObject"]["name"], "gildedgateway");
    assert_eq!(item["metricName"], "gearvalue");
    assert_eq!(item["value"], "31");
    assert!(item["timestamp"].is_string());
}

#[tokio::test]
async fn test_inkvalue_reports_the_ink_sum() {
    let app = app(reader_with("velvettimepiece", &[1.0], &[2.5, 3.5]));
    let (status, body) = get(
        app,
        "/apis/custom.metrics.k8s.io/v1beta1/namespaces/genteelbeacon/services/velvettimepiece/inkvalue",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["metricName"], "inkvalue");
    assert_eq!(body["items"][0]["value"], "6");
}

#[tokio::test]
async fn test_unknown_beacon_answers_with_a_zero_envelope() {
    let app = app(reader_with("gildedgateway", &[10.0], &[1.0]));
    let (status, body) = get(
        app,
        "/apis/custom.metrics.k8s.io/v1beta1/namespaces/genteelbeacon/services/nosuchbeacon/gearvalue",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["describedObject"]["name"], "nosuchbeacon");
    assert_eq!(body["items"][0]["value"], "0");
}

#[tokio::test]
async fn test_unknown_ink_answers_with_a_zero_envelope() {
    let app = app(reader_with("gildedgateway", &[10.0], &[1.0]));
    let (status, body) = get(
        app,
        "/apis/custom.metrics.k8s.io/v1beta1/namespaces/genteelbeacon/services/nosuchbeacon/inkvalue",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["metricName"], "inkvalue");
    assert_eq!(body["items"][0]["value"], "0");
}

#[tokio::test]
async fn test_unknown_metric_name_is_not_found() {
    let app = app(reader_with("gildedgateway", &[10.0], &[1.0]));
    let (status, _) = get(
        app,
        "/apis/custom.metrics.k8s.io/v1beta1/namespaces/genteelbeacon/services/gildedgateway/steamvalue",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stats_dumps_the_snapshot() {
    let app = app(reader_with("gaslightparlour", &[5.0, 7.0], &[2.0]));
    let (status, body) = get(app, "/stats").await;

    assert_eq!(status, StatusCode::OK);
    let sample = &body["beacons"]["gaslightparlour"];
    assert_eq!(sample["grease"]["count"], 2);
    assert_eq!(sample["grease"]["sum"], 12.0);
    assert_eq!(sample["ink"]["average"], 2.0);
}
