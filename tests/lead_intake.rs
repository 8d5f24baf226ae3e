mod common;

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{client, start_server, start_webhook, test_config};

#[tokio::test]
async fn test_health_check() {
    let addr = "127.0.0.1:28201".parse().unwrap();
    let server = start_server(test_config(addr)).await;

    let res = client()
        .get(format!("{}/health", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_validation_errors() {
    let addr = "127.0.0.1:28202".parse().unwrap();
    let server = start_server(test_config(addr)).await;
    let client = client();

    let cases = [
        ("/api/subscribe", json!({ "email": "not-an-email" }), "Invalid email address"),
        (
            "/api/artist-signup",
            json!({ "email": "a@example.com", "artistName": "  " }),
            "Artist name and your name are required",
        ),
        (
            "/api/artist-signup",
            json!({
                "email": "a@example.com",
                "artistName": "Band",
                "yourName": "Sam",
                "musicLink": "javascript:alert(1)"
            }),
            "Invalid URL protocol",
        ),
        (
            "/api/investor-investment",
            json!({ "fullName": "Ada", "email": "ada@example.com" }),
            "All required fields must be provided",
        ),
        (
            "/api/investor-investment",
            json!({
                "fullName": "Ada",
                "email": "ada@example.com",
                "phone": "555-0100",
                "investmentAmount": "$10,000",
                "investmentType": "SAFE",
                "accreditedInvestor": "no",
                "agreeToTerms": true
            }),
            "You must agree to the terms and disclosures",
        ),
    ];

    for (i, (path, body, message)) in cases.iter().enumerate() {
        let res = client
            .post(format!("{}{}", server.base_url, path))
            .header("x-forwarded-for", format!("192.0.2.{}", i + 1))
            .json(body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{path}");
        let json: Value = res.json().await.unwrap();
        assert_eq!(json["error"], *message, "{path}");
    }
}

#[tokio::test]
async fn test_malformed_body() {
    let addr = "127.0.0.1:28203".parse().unwrap();
    let server = start_server(test_config(addr)).await;

    let res = client()
        .post(format!("{}/api/listener-signup", server.base_url))
        .header("content-type", "application/json")
        .body("{\"email\":")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    // Quota headers are still attached to handler errors.
    assert_eq!(res.headers()["x-ratelimit-remaining"], "4");

    let json: Value = res.json().await.unwrap();
    assert_eq!(json["error"], "Invalid request body");
}

#[tokio::test]
async fn test_body_rejections_keep_their_status() {
    let addr = "127.0.0.1:28207".parse().unwrap();
    let mut config = test_config(addr);
    config.security.max_body_size = 1024;
    let server = start_server(config).await;
    let client = client();
    let url = format!("{}/api/subscribe", server.base_url);

    let res = client
        .post(&url)
        .header("content-type", "text/plain")
        .body("{\"email\":\"fan@example.com\"}")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let json: Value = res.json().await.unwrap();
    assert_eq!(json["error"], "Expected a JSON request body");

    let oversized = json!({ "email": "fan@example.com", "source": "x".repeat(4096) });
    let res = client.post(&url).json(&oversized).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let addr = "127.0.0.1:28204".parse().unwrap();
    let server = start_server(test_config(addr)).await;

    let res = client()
        .post(format!("{}/api/subscribe", server.base_url))
        .header("x-request-id", "req-abc-123")
        .json(&json!({ "email": "fan@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-request-id"], "req-abc-123");

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Subscribed successfully");
}

#[tokio::test]
async fn test_lead_is_relayed_to_webhook() {
    let webhook_addr = "127.0.0.1:28211".parse().unwrap();
    let mut deliveries = start_webhook(webhook_addr, |_| 200).await;

    let addr = "127.0.0.1:28205".parse().unwrap();
    let mut config = test_config(addr);
    config.notifications.webhook_url = Some(format!("http://{}/hook", webhook_addr));
    config.notifications.recipients.investor = Some("invest@example.com".into());
    let server = start_server(config).await;

    let res = client()
        .post(format!("{}/api/subscribe", server.base_url))
        .header("x-forwarded-for", "203.0.113.9")
        .json(&json!({ "email": "  Fan@Example.COM ", "source": "investors-<hero>" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = tokio::time::timeout(Duration::from_secs(5), deliveries.recv())
        .await
        .unwrap()
        .unwrap();
    let envelope: Value = serde_json::from_str(&body).unwrap();

    assert_eq!(envelope["recipient"], "invest@example.com");
    assert_eq!(envelope["subject"], "New Investor Lead: fan@example.com");
    assert_eq!(envelope["lead"]["kind"]["type"], "subscribe");
    assert_eq!(envelope["lead"]["kind"]["category"], "investor");
    assert_eq!(envelope["lead"]["email"], "fan@example.com");
    assert_eq!(envelope["lead"]["client"], "203.0.113.9");
    assert_eq!(envelope["lead"]["fields"]["source"], "investors-&lt;hero&gt;");
}

#[tokio::test]
async fn test_webhook_delivery_retries_on_server_error() {
    let webhook_addr = "127.0.0.1:28212".parse().unwrap();
    let mut deliveries = start_webhook(webhook_addr, |n| if n == 0 { 503 } else { 200 }).await;

    let addr = "127.0.0.1:28206".parse().unwrap();
    let mut config = test_config(addr);
    config.notifications.webhook_url = Some(format!("http://{}/hook", webhook_addr));
    config.notifications.base_delay_ms = 10;
    let server = start_server(config).await;

    let res = client()
        .post(format!("{}/api/artist-signup", server.base_url))
        .json(&json!({
            "artistName": "Night & Day",
            "yourName": "Sam",
            "email": "sam@example.com",
            "musicLink": "https://example.com/track",
            "betaAccess": true
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let first = tokio::time::timeout(Duration::from_secs(5), deliveries.recv())
        .await
        .unwrap()
        .unwrap();
    let second = tokio::time::timeout(Duration::from_secs(5), deliveries.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first, second);

    let envelope: Value = serde_json::from_str(&second).unwrap();
    assert_eq!(envelope["recipient"], "leads@localhost");
    assert_eq!(envelope["subject"], "New Artist Signup: Night & Day");
    assert_eq!(envelope["lead"]["fields"]["artistName"], "Night &amp; Day");
    assert_eq!(envelope["lead"]["fields"]["betaAccess"], "Yes");
    assert_eq!(envelope["lead"]["client"], "unknown");
}
