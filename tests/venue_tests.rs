use chrono::DateTime;
use rust_decimal::Decimal;
use serde_json::json;
use wiremock::matchers::{header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mirrorbot::models::Side;
use mirrorbot::ports::{ExecutionError, OrderExecution, ScaledOrder, VenueQuery};
use mirrorbot::venue::{VenueAuth, VenueClient};

fn order() -> ScaledOrder {
    ScaledOrder {
        execution_account_key: "acct-1".into(),
        market: "SUI_USDC".into(),
        price: Decimal::new(90, 2),
        quantity: Decimal::from(500),
        side: Side::Bid,
        client_token: "token-123".into(),
    }
}

fn client(server: &MockServer) -> VenueClient {
    VenueClient::new(reqwest::Client::new(), server.uri(), None)
}

#[tokio::test]
async fn test_activity_query_passes_cursor_and_accepts_wrapped_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/markets/SUI_USDC/activity"))
        .and(query_param("since", "1700000000000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "id": "o-1", "maker": "0xabc", "side": "BUY", "price": "0.9", "size": "10", "timestamp": 1700000000001i64 }
            ]
        })))
        .mount(&server)
        .await;

    let since = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
    let records = client(&server).query_recent_activity("SUI_USDC", since).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id.as_deref(), Some("o-1"));
    assert_eq!(records[0].quantity, Some(Decimal::from(10)));
}

#[tokio::test]
async fn test_activity_query_error_surfaces() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let since = DateTime::from_timestamp(0, 0).unwrap();
    let err = client(&server)
        .query_recent_activity("SUI_USDC", since)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_order_carries_idempotency_key_and_maps_ack() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(header("Idempotency-Key", "token-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "orderID": "venue-9",
            "transaction_id": "0xtx"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ack = client(&server).submit_scaled_order(&order()).await.unwrap();
    assert_eq!(ack.order_id, "venue-9");
    assert_eq!(ack.external_reference.as_deref(), Some("0xtx"));
}

#[tokio::test]
async fn test_signed_requests_carry_auth_headers() {
    use base64::Engine;

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(header("X-API-KEY", "key-1"))
        .and(header_exists("X-SIGNATURE"))
        .and(header_exists("X-TIMESTAMP"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true, "order_id": "v-1" })))
        .expect(1)
        .mount(&server)
        .await;

    let secret = base64::engine::general_purpose::STANDARD.encode(b"secret");
    let auth = VenueAuth::new("key-1".into(), secret, "pass".into());
    let client = VenueClient::new(reqwest::Client::new(), server.uri(), Some(auth));

    assert_eq!(client.submit_scaled_order(&order()).await.unwrap().order_id, "v-1");
}

fn kind(e: &ExecutionError) -> &'static str {
    match e {
        ExecutionError::Timeout(_) => "timeout",
        ExecutionError::Network(_) => "network",
        ExecutionError::RateLimited(_) => "rate_limited",
        ExecutionError::Rejected(_) => "rejected",
        ExecutionError::Unauthorized(_) => "unauthorized",
        ExecutionError::Invalid(_) => "invalid",
    }
}

#[tokio::test]
async fn test_order_status_classification() {
    for (status, expected) in [
        (429u16, "rate_limited"),
        (502, "network"),
        (401, "unauthorized"),
        (422, "invalid"),
        (409, "rejected"),
    ] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
            .mount(&server)
            .await;

        let err = client(&server).submit_scaled_order(&order()).await.unwrap_err();
        assert_eq!(kind(&err), expected, "status {status}");
        assert_eq!(err.is_transient(), status == 429 || status == 502);
    }
}

#[tokio::test]
async fn test_unsuccessful_ack_is_a_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "errorMsg": "insufficient balance"
        })))
        .mount(&server)
        .await;

    let err = client(&server).submit_scaled_order(&order()).await.unwrap_err();
    assert_eq!(err, ExecutionError::Rejected("insufficient balance".into()));
}

#[tokio::test]
async fn test_balance_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/accounts/alice/balance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "available": "1234.5" })))
        .mount(&server)
        .await;

    let balance = client(&server).get_balance("alice").await.unwrap();
    assert_eq!(balance, Decimal::new(12345, 1));
}
