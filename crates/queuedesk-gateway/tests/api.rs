// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Route-level tests driving the router in-process.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use queuedesk_gateway::auth::{ACCOUNT_HEADER, LOCATION_HEADER};
use queuedesk_gateway::{GatewaySettings, QueueGateway};
use queuedesk_test_utils::harness::{DUKCAPIL, IMIGRASI, KTP};
use queuedesk_test_utils::TestHarness;

const TOKEN: &str = "test-token";

fn app_with(h: &TestHarness, prometheus: Option<Arc<dyn Fn() -> String + Send + Sync>>) -> Router {
    QueueGateway::new(
        GatewaySettings {
            host: "127.0.0.1".into(),
            port: 0,
            bearer_token: Some(TOKEN.into()),
            read_timeout: Duration::from_secs(60),
            prometheus_render: prometheus,
        },
        h.machine.clone(),
        h.hub.clone(),
        Some(h.store.clone()),
    )
    .router()
}

fn app(h: &TestHarness) -> Router {
    app_with(h, None)
}

struct Call {
    method: Method,
    uri: String,
    body: Option<Value>,
    token: Option<&'static str>,
    account: Option<&'static str>,
    location: Option<&'static str>,
}

impl Call {
    fn new(method: Method, uri: &str) -> Self {
        Self {
            method,
            uri: uri.to_string(),
            body: None,
            token: Some(TOKEN),
            account: Some("100"),
            location: None,
        }
    }

    fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    fn staff_of(mut self, location: &'static str) -> Self {
        self.account = Some("1001");
        self.location = Some(location);
        self
    }

    fn without_token(mut self) -> Self {
        self.token = None;
        self
    }

    fn without_account(mut self) -> Self {
        self.account = None;
        self
    }

    async fn send(self, app: &Router) -> (StatusCode, Value) {
        let mut req = Request::builder().method(self.method).uri(self.uri);
        if let Some(token) = self.token {
            req = req.header("authorization", format!("Bearer {token}"));
        }
        if let Some(account) = self.account {
            req = req.header(ACCOUNT_HEADER, account);
        }
        if let Some(location) = self.location {
            req = req.header(LOCATION_HEADER, location);
        }
        let body = match self.body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };

        let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }
}

async fn take(app: &Router) -> (StatusCode, Value) {
    Call::new(Method::POST, "/api/queue/take")
        .json(json!({"location_id": DUKCAPIL.0, "service_id": KTP.0}))
        .send(app)
        .await
}

#[tokio::test]
async fn health_is_public() {
    let h = TestHarness::new();
    let (status, body) = Call::new(Method::GET, "/health")
        .without_token()
        .send(&app(&h))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["display_clients"], 0);
}

#[tokio::test]
async fn metrics_render_only_when_enabled() {
    let h = TestHarness::new();
    let (status, _) = Call::new(Method::GET, "/metrics")
        .without_token()
        .send(&app(&h))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let render: Arc<dyn Fn() -> String + Send + Sync> =
        Arc::new(|| "queuedesk_display_clients 0\n".to_string());
    let (status, body) = Call::new(Method::GET, "/metrics")
        .without_token()
        .send(&app_with(&h, Some(render)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "queuedesk_display_clients 0\n");
}

#[tokio::test]
async fn api_requires_bearer_token() {
    let h = TestHarness::new();
    let (status, _) = Call::new(Method::POST, "/api/queue/take")
        .json(json!({"location_id": 1, "service_id": 10}))
        .without_token()
        .send(&app(&h))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(h.store.tickets().is_empty());
}

#[tokio::test]
async fn api_requires_account_header() {
    let h = TestHarness::new();
    let (status, body) = Call::new(Method::POST, "/api/queue/take")
        .json(json!({"location_id": 1, "service_id": 10}))
        .without_account()
        .send(&app(&h))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "unauthorized");
}

#[tokio::test]
async fn take_returns_created_receipt() {
    let h = TestHarness::new();
    let (status, body) = take(&app(&h)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["ticket"]["code"], "KTP001");
    assert_eq!(body["data"]["ticket"]["status"], "waiting");
    assert_eq!(body["data"]["queue_number"], 1);
    assert_eq!(body["data"]["quota"], 3);
    assert_eq!(body["data"]["remaining"], 2);
}

#[tokio::test]
async fn take_past_quota_is_rejected() {
    let h = TestHarness::new();
    let app = app(&h);
    for _ in 0..3 {
        assert_eq!(take(&app).await.0, StatusCode::CREATED);
    }

    let (status, body) = take(&app).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["kind"], "quota_exceeded");
    assert!(body.get("current_status").is_none());
}

#[tokio::test]
async fn malformed_body_uses_error_envelope() {
    let h = TestHarness::new();
    let (status, body) = Call::new(Method::POST, "/api/queue/take")
        .json(json!({"location_id": "one"}))
        .send(&app(&h))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "bad_request");
}

#[tokio::test]
async fn call_next_needs_a_staff_location() {
    let h = TestHarness::new();
    let app = app(&h);
    take(&app).await;

    let (status, body) = Call::new(Method::POST, "/api/queue/call-next")
        .json(json!({"service_id": KTP.0}))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "forbidden");
}

#[tokio::test]
async fn call_next_calls_oldest_waiting() {
    let h = TestHarness::new();
    let app = app(&h);
    take(&app).await;
    take(&app).await;

    let (status, body) = Call::new(Method::POST, "/api/queue/call-next")
        .json(json!({"service_id": KTP.0}))
        .staff_of("1")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["code"], "KTP001");
    assert_eq!(body["data"]["status"], "called");
}

#[tokio::test]
async fn staff_of_another_location_is_forbidden() {
    let h = TestHarness::new();
    let app = app(&h);
    take(&app).await;

    let (status, _) = Call::new(Method::POST, "/api/queue/skip-and-next")
        .json(json!({"service_id": KTP.0}))
        .staff_of("2")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn empty_queue_is_not_found() {
    let h = TestHarness::new();
    let (status, body) = Call::new(Method::POST, "/api/queue/call-next")
        .json(json!({"service_id": KTP.0}))
        .staff_of("1")
        .send(&app(&h))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "none_waiting");
}

#[tokio::test]
async fn resolving_a_waiting_ticket_conflicts() {
    let h = TestHarness::new();
    let app = app(&h);
    let (_, taken) = take(&app).await;
    let id = taken["data"]["ticket"]["id"].clone();

    let (status, body) = Call::new(Method::POST, "/api/queue/update-status")
        .json(json!({"ticket_id": id, "status": "done"}))
        .staff_of("1")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");
    assert_eq!(body["current_status"], "waiting");
}

#[tokio::test]
async fn unknown_status_is_bad_request() {
    let h = TestHarness::new();
    let (status, body) = Call::new(Method::POST, "/api/queue/update-status")
        .json(json!({"ticket_id": 1, "status": "waiting"}))
        .staff_of("1")
        .send(&app(&h))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "bad_request");
}

#[tokio::test]
async fn recall_and_history_round_out_the_lifecycle() {
    let h = TestHarness::new();
    let app = app(&h);
    let (_, taken) = take(&app).await;
    let id = taken["data"]["ticket"]["id"].as_i64().unwrap();

    Call::new(Method::POST, "/api/queue/call-next")
        .json(json!({"service_id": KTP.0}))
        .staff_of("1")
        .send(&app)
        .await;
    Call::new(Method::POST, "/api/queue/update-status")
        .json(json!({"ticket_id": id, "status": "skipped"}))
        .staff_of("1")
        .send(&app)
        .await;

    let (status, body) = Call::new(Method::POST, &format!("/api/queue/recall/{id}"))
        .staff_of("1")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "waiting");

    let (status, body) = Call::new(Method::POST, &format!("/api/queue/recall/{id}"))
        .staff_of("1")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "already_waiting");

    let (status, body) = Call::new(Method::GET, &format!("/api/queue/tickets/{id}"))
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    let events: Vec<&str> = body["data"]["log"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["event"].as_str())
        .collect();
    assert_eq!(events, ["take", "call", "skip", "recall"]);
}

#[tokio::test]
async fn unknown_ticket_is_not_found() {
    let h = TestHarness::new();
    let (status, body) = Call::new(Method::GET, "/api/queue/tickets/999")
        .send(&app(&h))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn availability_reports_remaining_quota() {
    let h = TestHarness::new();
    let app = app(&h);
    take(&app).await;

    let (status, body) = Call::new(
        Method::GET,
        &format!("/api/services/status?location_id={}", DUKCAPIL.0),
    )
    .send(&app)
    .await;
    assert_eq!(status, StatusCode::OK);
    let ktp = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["service_id"] == KTP.0)
        .cloned()
        .unwrap();
    assert_eq!(ktp["issued_today"], 1);
    assert_eq!(ktp["remaining"], 2);
    assert_eq!(ktp["status"], "available");
}

#[tokio::test]
async fn availability_needs_location_id() {
    let h = TestHarness::new();
    let (status, body) = Call::new(Method::GET, "/api/services/status")
        .send(&app(&h))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "bad_request");
}

#[tokio::test]
async fn display_board_is_public_and_cached() {
    let h = TestHarness::new();
    let app = app(&h);

    let (status, body) = Call::new(Method::GET, "/api/queue/display")
        .without_token()
        .without_account()
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "queue_update");
    let services: Vec<i64> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["service_id"].as_i64())
        .collect();
    assert!(services.contains(&KTP.0));
    assert!(body["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r["location_id"] == IMIGRASI.0));

    Call::new(Method::GET, "/api/queue/display")
        .without_token()
        .send(&app)
        .await;
    assert_eq!(h.store.board_reads(), 1);
}
