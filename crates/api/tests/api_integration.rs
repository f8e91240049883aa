//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use api::AppState;
use api::config::Config;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use domain::{StatusFact, SubStatus};
use messaging::{InMemoryEventBus, OrderPublisher};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::InMemoryOrderStore;
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: Router,
    state: Arc<AppState<InMemoryOrderStore, InMemoryEventBus>>,
    bus: InMemoryEventBus,
}

impl TestApp {
    async fn new() -> Self {
        let config = Config::default();
        let bus = InMemoryEventBus::new();
        let state = api::create_state(
            InMemoryOrderStore::new(),
            InMemoryOrderStore::new(),
            bus.clone(),
            "memory",
            &config,
        );
        api::spawn_consumers(&state, &bus, &config, std::future::pending::<()>)
            .await
            .unwrap();
        let app = api::create_app(state.clone(), get_metrics_handle());

        Self { app, state, bus }
    }

    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    async fn send_json(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, bytes) = self.send(method, uri, body).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    /// Creates an order and waits for the kitchen to learn about it.
    async fn create_order(&self) -> String {
        let (status, json) = self
            .send_json(
                "POST",
                "/orders",
                Some(json!({ "amount": 23.5, "detail": "2x katsu curry" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = json["id"].as_str().unwrap().to_string();

        self.wait_for(&format!("/kitchen/orders/{id}"), |json| {
            json["status"] == "CREATED"
        })
        .await;
        id
    }

    async fn pay(&self, id: &str) {
        OrderPublisher::new(self.bus.clone(), Duration::from_secs(5))
            .raise_status(&StatusFact::new(id.parse().unwrap(), SubStatus::PaymentPaid))
            .await
            .unwrap();
        self.wait_for(&format!("/orders/{id}"), |json| {
            json["status"] == "PROCESSING"
        })
        .await;
    }

    async fn wait_for(&self, uri: &str, condition: impl Fn(&Value) -> bool) -> Value {
        for _ in 0..200 {
            let (status, bytes) = self.send("GET", uri, None).await;
            if status == StatusCode::OK {
                let json: Value = serde_json::from_slice(&bytes).unwrap();
                if condition(&json) {
                    return json;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("{uri} never reached the expected state");
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;

    let (status, json) = app.send_json("GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["storage"], "memory");
}

#[tokio::test]
async fn test_create_and_get_order() {
    let app = TestApp::new().await;

    let (status, created) = app
        .send_json(
            "POST",
            "/orders",
            Some(json!({ "amount": 12.0, "detail": "miso soup" })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["amount"], 12.0);
    assert_eq!(created["detail"], "miso soup");
    assert_eq!(created["status"], "CREATED");

    let id = created["id"].as_str().unwrap();
    let (status, order) = app.send_json("GET", &format!("/orders/{id}"), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["id"], id);
    assert_eq!(order["status"], "CREATED");
    assert_eq!(order["subStatus"], Value::Null);
    assert!(order["createdAt"].is_string());
    assert!(order["updatedAt"].is_string());
}

#[tokio::test]
async fn test_negative_amount_is_rejected() {
    let app = TestApp::new().await;

    let (status, json) = app
        .send_json(
            "POST",
            "/orders",
            Some(json!({ "amount": -4.0, "detail": "refund me" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("amount"));
    assert_eq!(app.state.orders.store().order_count().await, 0);
}

#[tokio::test]
async fn test_get_nonexistent_order() {
    let app = TestApp::new().await;

    let (status, json) = app
        .send_json(
            "GET",
            "/orders/00000000-0000-0000-0000-000000000000",
            None,
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_invalid_order_id_format() {
    let app = TestApp::new().await;

    let (status, _) = app.send_json("GET", "/orders/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send_json("GET", "/kitchen/orders/not-a-uuid", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_kitchen_success_completes_order() {
    let app = TestApp::new().await;
    let id = app.create_order().await;
    app.pay(&id).await;

    let (status, body) = app
        .send("POST", "/kitchen/success", Some(json!({ "orderId": id })))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());

    let order = app
        .wait_for(&format!("/orders/{id}"), |json| json["status"] == "DONE")
        .await;
    assert_eq!(order["subStatus"], "DELIVERED");
}

#[tokio::test]
async fn test_kitchen_failure_requests_refund() {
    let app = TestApp::new().await;
    let id = app.create_order().await;
    app.pay(&id).await;

    let (status, _) = app
        .send(
            "POST",
            "/kitchen/failed",
            Some(json!({ "orderId": id, "failureReason": "oven offline" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let order = app
        .wait_for(&format!("/orders/{id}"), |json| json["status"] == "REFUNDING")
        .await;
    assert_eq!(order["subStatus"], "KITCHEN_PREPARATION_FAILED");
    assert_eq!(order["failureReason"], "oven offline");

    // The kitchen already reported a failure; success is now a regression.
    let (status, json) = app
        .send_json("POST", "/kitchen/success", Some(json!({ "orderId": id })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_kitchen_requires_order_id() {
    let app = TestApp::new().await;

    let (status, json) = app
        .send_json("POST", "/kitchen/failed", Some(json!({ "failureReason": "x" })))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("orderId"));
}

#[tokio::test]
async fn test_kitchen_unknown_order() {
    let app = TestApp::new().await;

    let (status, _) = app
        .send_json(
            "POST",
            "/kitchen/success",
            Some(json!({ "orderId": "00000000-0000-0000-0000-000000000000" })),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = TestApp::new().await;
    app.create_order().await;

    let (status, body) = app.send("GET", "/metrics", None).await;

    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("orders_created_total"));
}
