mod utils;

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use utils::Upstreams;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ADDRESS: &str = "0xabc0000000000000000000000000000000000123";

async fn spawn_with_stripe(stripe: &MockServer) -> String {
    let config = utils::test_config(
        &Upstreams {
            stripe: Some(stripe.uri()),
            ..Default::default()
        },
        &[],
    );
    utils::spawn_server_with(&config).await
}

#[tokio::test]
async fn test_stripe_session_is_passed_through() {
    let stripe = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/crypto/onramp_sessions"))
        .and(header("authorization", "Bearer sk_test_123"))
        .and(body_string_contains(format!("wallet_address={ADDRESS}")))
        .and(body_string_contains("source_amount=50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cos_123",
            "object": "crypto.onramp_session",
            "client_secret": "cos_123_secret_abc",
            "redirect_url": "https://crypto.link.com?session_hash=abc",
            "status": "initialized"
        })))
        .expect(1)
        .mount(&stripe)
        .await;

    let addr = spawn_with_stripe(&stripe).await;
    let client = Client::new();

    let response = client
        .post(format!("{addr}/api/create-onramp-session"))
        .json(&json!({"provider": "stripe", "address": ADDRESS, "amount": "50"}))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["session"], "cos_123");
    assert_eq!(body["redirect_url"], "https://crypto.link.com?session_hash=abc");
    assert_eq!(body["client_secret"], "cos_123_secret_abc");
    assert_eq!(body["status"], "initialized");

    // The issued session can be polled
    let session: Value = client
        .get(format!("{addr}/api/onramp-session/cos_123"))
        .send()
        .await
        .expect("Failed to execute request.")
        .json()
        .await
        .expect("json body");
    assert_eq!(session["status"], "pending");
    assert_eq!(session["provider"], "stripe");
    assert_eq!(session["wallet_address"], ADDRESS);
}

#[tokio::test]
async fn test_legacy_body_defaults_to_stripe() {
    let stripe = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/crypto/onramp_sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "cos_9"})))
        .expect(1)
        .mount(&stripe)
        .await;

    let addr = spawn_with_stripe(&stripe).await;
    let response = Client::new()
        .post(format!("{addr}/api/create-onramp-session"))
        .json(&json!({"address": ADDRESS}))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["session"], "cos_9");
}

#[tokio::test]
async fn test_upstream_error_is_mirrored() {
    let stripe = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/crypto/onramp_sessions"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": {"message": "Invalid wallet"}})),
        )
        .expect(1)
        .mount(&stripe)
        .await;

    let addr = spawn_with_stripe(&stripe).await;
    let response = Client::new()
        .post(format!("{addr}/api/create-onramp-session"))
        .json(&json!({"provider": "stripe", "address": ADDRESS}))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(
        body,
        json!({
            "error": "Stripe API error",
            "details": {"error": {"message": "Invalid wallet"}}
        })
    );
}

#[tokio::test]
async fn test_invalid_requests_make_no_provider_calls() {
    let stripe = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "cos_1"})))
        .expect(0)
        .mount(&stripe)
        .await;

    let addr = spawn_with_stripe(&stripe).await;
    let client = Client::new();

    for body in [
        json!({"provider": "paypal", "address": ADDRESS}),
        json!({"provider": "stripe", "address": "0x123"}),
        json!({"provider": "stripe"}),
        json!({"provider": "stripe", "address": ADDRESS, "amount": "-5"}),
        json!({"provider": "coinbase", "address": ADDRESS}),
    ] {
        let response = client
            .post(format!("{addr}/api/create-onramp-session"))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
        let error: Value = response.json().await.expect("json body");
        assert!(error["error"].is_string(), "{body}");
    }

    let response = client
        .post(format!("{addr}/api/create-onramp-session"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let addr = utils::spawn_server().await;
    let response = Client::new()
        .get(format!("{addr}/api/onramp-session/cos_missing"))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_quotes_survive_a_slow_provider() {
    let stripe = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/crypto/onramp/quotes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "destination_network_quotes": {
                "ethereum": [{
                    "destination_amount": "95.12",
                    "source_total_amount": "100.00"
                }]
            }
        })))
        .mount(&stripe)
        .await;

    let coinbase = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/onramp/v1/buy/quote"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(3))
                .set_body_json(json!({
                    "payment_total": {"value": "100.00"},
                    "purchase_amount": {"value": "96.00"}
                })),
        )
        .mount(&coinbase)
        .await;

    let config = utils::test_config(
        &Upstreams {
            stripe: Some(stripe.uri()),
            coinbase: Some(coinbase.uri()),
            ..Default::default()
        },
        &[("stripe.display_name", "Card (Stripe)")],
    );
    let addr = utils::spawn_server_with(&config).await;

    let response = Client::new()
        .get(format!("{addr}/api/onramp-providers"))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("json body");
    let providers = body["providers"].as_array().expect("provider list");
    assert_eq!(providers.len(), 2);

    assert_eq!(providers[0]["name"], "stripe");
    assert_eq!(providers[0]["display_name"], "Card (Stripe)");
    assert_eq!(
        providers[0]["quote"],
        json!({"price": "100.00", "amount": "95.12"})
    );

    assert_eq!(providers[1]["name"], "coinbase");
    assert!(providers[1]["logo_url"].is_string());
    assert_eq!(providers[1]["quote"], Value::Null);
}

#[tokio::test]
async fn test_coinbase_session_redirects_to_checkout() {
    let coinbase = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/onramp/v1/token"))
        .and(header("authorization", "Bearer cb_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok_1"})))
        .expect(1)
        .mount(&coinbase)
        .await;

    let config = utils::test_config(
        &Upstreams {
            coinbase: Some(coinbase.uri()),
            ..Default::default()
        },
        &[("coinbase.pay_base_url", "https://pay.example.com")],
    );
    let addr = utils::spawn_server_with(&config).await;

    let response = Client::new()
        .post(format!("{addr}/api/create-onramp-session"))
        .json(&json!({"provider": "coinbase", "address": ADDRESS, "amount": "20"}))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("json body");
    let session = body["session"].as_str().expect("session id");
    let redirect_url = body["redirect_url"].as_str().expect("redirect url");
    assert!(redirect_url.starts_with("https://pay.example.com/buy/select-asset?sessionToken=tok_1"));
    assert!(redirect_url.contains(&format!("partnerUserRef={session}")));
    assert!(redirect_url.ends_with("presetFiatAmount=20"));
}
