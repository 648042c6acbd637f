//! End-to-end tests against the live mock server.
//!
//! # Design
//! Each test starts the mock server on a random port and drives the real
//! reqwest transport through `ApiClient`, so URL composition, header
//! placement, form encoding and status handling are checked on the wire.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use console_core::{
    ApiClient, ApiError, ClientConfig, HttpMethod, NewOrder, NewOrderItem, NewProduct, NoSession,
    RequestBody, SessionProvider, StaticSession,
};
use mock_server::AuthPolicy;
use serde_json::Value;
use tokio::net::TcpListener;

async fn start_server(auth: AuthPolicy) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(mock_server::run_with_auth(listener, auth));
    format!("http://{addr}/")
}

fn config(base_url: &str) -> ClientConfig {
    ClientConfig::new(base_url)
        .with_max_retries(1)
        .with_retry_delay(Duration::from_millis(10))
        .with_timeout(Duration::from_secs(5))
}

/// Hands out a stale token unless asked to refresh.
struct RotatingSession {
    stale: String,
    fresh: String,
    refreshes: AtomicUsize,
}

impl RotatingSession {
    fn new(stale: &str, fresh: &str) -> Self {
        Self {
            stale: stale.to_string(),
            fresh: fresh.to_string(),
            refreshes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SessionProvider for RotatingSession {
    async fn is_signed_in(&self) -> bool {
        true
    }

    async fn token(&self, force_refresh: bool) -> Option<String> {
        if force_refresh {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            Some(self.fresh.clone())
        } else {
            Some(self.stale.clone())
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn console_lifecycle() {
    let base = start_server(AuthPolicy::bearer(["token-1"])).await;
    let client = ApiClient::new(config(&base), StaticSession::new("token-1")).unwrap();

    // Step 1: catalog starts empty, units are seeded.
    assert!(client.get_products().await.unwrap().is_empty());
    let uoms = client.get_uoms().await.unwrap();
    let kg = uoms.iter().find(|u| u.uom_name == "kg").unwrap().uom_id;

    // Step 2: add two products.
    let rice = client
        .insert_product(&NewProduct {
            product_name: "Rice".to_string(),
            uom_id: kg,
            price_per_unit: 50.0,
        })
        .await
        .unwrap();
    let sugar = client
        .insert_product(&NewProduct {
            product_name: "Sugar".to_string(),
            uom_id: kg,
            price_per_unit: 40.0,
        })
        .await
        .unwrap();
    let products = client.get_products().await.unwrap();
    assert_eq!(products.len(), 2);
    assert!(products.iter().all(|p| p.uom_name.as_deref() == Some("kg")));

    // Step 3: order 2 kg of rice.
    let rice_product = products.iter().find(|p| p.product_id == rice.product_id).unwrap();
    let order = NewOrder::from_items("Jane", vec![NewOrderItem::for_product(rice_product, 2.0)]);
    assert_eq!(order.grand_total, 100.0);
    let order_id = client.insert_order(&order).await.unwrap().order_id;

    // Step 4: order views agree.
    assert_eq!(client.get_order_count().await.unwrap().order_count, 1);
    let details = client.get_order_details(order_id).await.unwrap();
    assert_eq!(details.len(), 1);
    assert_eq!(details[0].name, "Rice");
    assert_eq!(details[0].total_price, 100.0);

    let summaries = client.get_orders().await.unwrap();
    assert_eq!(summaries[0].order_id, order_id);
    assert_eq!(summaries[0].item_count, 1);

    let lines = client.get_all_orders().await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 2.0);

    // Step 5: dashboard aggregates.
    let stats = client.fetch_dashboard().await.unwrap();
    assert_eq!(stats.total_products, 2);
    assert_eq!(stats.total_orders, 1);
    assert_eq!(stats.total_revenue, 100.0);
    assert_eq!(stats.recent_orders.len(), 1);
    assert_eq!(stats.recent_orders[0].customer_name, "Jane");

    // Step 6: unreferenced product can be deleted; the id comes back as text.
    let deleted = client.delete_product(sugar.product_id).await.unwrap();
    assert_eq!(deleted.product_id, sugar.product_id);
    assert_eq!(client.get_products().await.unwrap().len(), 1);

    // Step 7: referenced product cannot.
    let err = client.delete_product(rice.product_id).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
}

#[tokio::test(flavor = "multi_thread")]
async fn stale_token_is_refreshed_once() {
    let base = start_server(AuthPolicy::bearer(["fresh"])).await;
    let session = Arc::new(RotatingSession::new("stale", "fresh"));
    let client = ApiClient::new(config(&base), session.clone()).unwrap();

    let uoms = client.get_uoms().await.unwrap();
    assert_eq!(uoms.len(), 2);
    assert_eq!(session.refreshes.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn unauthorized_after_budget_is_http_401() {
    let base = start_server(AuthPolicy::bearer(["never-issued"])).await;
    let session = Arc::new(RotatingSession::new("a", "b"));
    let client = ApiClient::new(config(&base).with_max_retries(2), session.clone()).unwrap();

    let err = client.get_products().await.unwrap_err();
    match err {
        ApiError::Http { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("Unauthorized"));
        }
        other => panic!("expected 401, got {other:?}"),
    }
    assert_eq!(session.refreshes.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn signed_out_client_reaches_open_server() {
    let base = start_server(AuthPolicy::Open).await;
    let client = ApiClient::new(config(&base), NoSession).unwrap();

    let count: Value = client
        .call("/getOrderCount", HttpMethod::Get, None, &[])
        .await
        .unwrap();
    assert_eq!(count["order_count"], 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn signed_out_client_is_rejected_by_protected_server() {
    let base = start_server(AuthPolicy::bearer(["secret"])).await;
    let client = ApiClient::new(config(&base), NoSession).unwrap();

    let err = client.get_uoms().await.unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_body_is_carried_in_the_error() {
    let base = start_server(AuthPolicy::Open).await;
    let client = ApiClient::new(config(&base), NoSession).unwrap();

    let err = client
        .insert_product(&NewProduct {
            product_name: "Ghost".to_string(),
            uom_id: 99,
            price_per_unit: 1.0,
        })
        .await
        .unwrap_err();
    match err {
        ApiError::Http { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("unknown uom_id"));
        }
        other => panic!("expected 500, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn raw_body_reaches_server_unmodified() {
    let base = start_server(AuthPolicy::Open).await;
    let client = ApiClient::new(config(&base), NoSession).unwrap();
    let bytes: Vec<u8> = vec![0, 159, 146, 150, 255, b'{', b'\n'];

    let echoed: Value = client
        .call("echo", HttpMethod::Post, Some(RequestBody::Raw(bytes.clone())), &[])
        .await
        .unwrap();
    assert!(echoed["content_type"].is_null(), "got {}", echoed["content_type"]);
    let received: Vec<u8> = serde_json::from_value(echoed["body"].clone()).unwrap();
    assert_eq!(received, bytes);

    // a caller-supplied content type is kept as given
    let extra = vec![("content-type".to_string(), "image/png".to_string())];
    let echoed: Value = client
        .call("echo", HttpMethod::Post, Some(RequestBody::Raw(bytes)), &extra)
        .await
        .unwrap();
    assert_eq!(echoed["content_type"], "image/png");
}

#[tokio::test(flavor = "multi_thread")]
async fn json_body_reaches_server_with_json_content_type() {
    let base = start_server(AuthPolicy::Open).await;
    let client = ApiClient::new(config(&base), NoSession).unwrap();

    let echoed: Value = client
        .post_json("echo", &serde_json::json!({"customer_name": "Jane", "grand_total": 100}))
        .await
        .unwrap();
    assert_eq!(echoed["content_type"], "application/json");
    let received: Vec<u8> = serde_json::from_value(echoed["body"].clone()).unwrap();
    assert_eq!(received, br#"{"customer_name":"Jane","grand_total":100}"#.to_vec());
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_extra_header_fails_before_sending() {
    let base = start_server(AuthPolicy::Open).await;
    let client = ApiClient::new(config(&base), NoSession).unwrap();

    let extra = vec![("bad header".to_string(), "x".to_string())];
    let err = client
        .call::<Value>("getUOM", HttpMethod::Get, None, &extra)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidRequest(_)), "got {err:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn closed_port_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ApiClient::new(config(&format!("http://{addr}")), NoSession).unwrap();
    let err = client.get_products().await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn hung_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let config = config(&format!("http://{addr}")).with_timeout(Duration::from_millis(200));
    let client = ApiClient::new(config, NoSession).unwrap();
    let err = client.get_products().await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}
