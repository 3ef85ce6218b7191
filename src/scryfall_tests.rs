//! Tests for the Scryfall API client.

use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::config::SyncConfig;
use crate::error::PriceError;
use crate::scryfall::{ScryfallApi, ScryfallPrices};

/// Helper: creates a minimal ScryfallCard JSON value for mock responses.
fn card_json(id: &str, eur: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": "Test Card",
        "set": "tst",
        "set_name": "Test Set",
        "prices": { "eur": eur, "eur_foil": null, "usd": "2.00", "usd_foil": null }
    })
}

/// Helper: API handle pointed at the mock server, with a tiny cooldown so
/// tests are not slowed down by call spacing.
fn test_api(base_url: &str) -> ScryfallApi {
    let mut config = SyncConfig::with_base_url(base_url);
    config.cooldown = Duration::from_millis(1);
    ScryfallApi::new(&config)
}

// ── single-card lookup ───────────────────────────────────────────────

#[tokio::test]
async fn card_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cards/abc-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(card_json("abc-123", "1.50")))
        .mount(&mock_server)
        .await;

    let api = test_api(&mock_server.uri());
    let card = api.card("abc-123").await.unwrap();

    assert_eq!(card.id, "abc-123");
    assert_eq!(card.name, "Test Card");
    assert_eq!(card.prices.eur.as_deref(), Some("1.50"));
}

#[tokio::test]
async fn card_404_returns_http_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cards/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let api = test_api(&mock_server.uri());
    match api.card("missing").await {
        Err(PriceError::HttpStatus(status)) => {
            assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
        }
        other => panic!("Expected PriceError::HttpStatus, got: {other:?}"),
    }
}

#[tokio::test]
async fn card_429_returns_rate_limited() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cards/busy"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let api = test_api(&mock_server.uri());
    match api.card("busy").await {
        Err(PriceError::RateLimited) => {}
        other => panic!("Expected PriceError::RateLimited, got: {other:?}"),
    }
}

// ── price string parsing ─────────────────────────────────────────────

#[test]
fn prices_parse_decimal_strings() {
    let prices = ScryfallPrices {
        eur: Some("3.50".to_string()),
        eur_foil: Some("12.00".to_string()),
        usd: Some("4.25".to_string()),
        usd_foil: None,
    };

    assert_eq!(prices.eur(), 3.50);
    assert_eq!(prices.eur_foil(), 12.00);
    assert_eq!(prices.usd(), 4.25);
    assert_eq!(prices.usd_foil(), 0.0);
}

#[test]
fn unparseable_price_reads_as_zero() {
    // "no listed price" rather than a malformed response
    let prices = ScryfallPrices {
        eur: Some("not-a-number".to_string()),
        eur_foil: Some(String::new()),
        usd: None,
        usd_foil: None,
    };

    assert_eq!(prices.eur(), 0.0);
    assert_eq!(prices.eur_foil(), 0.0);
    assert_eq!(prices.usd(), 0.0);
}

// ── collection lookup ────────────────────────────────────────────────

#[tokio::test]
async fn collection_merges_results_by_id() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/cards/collection"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [card_json("id-1", "1.00"), card_json("id-2", "2.00")]
        })))
        .mount(&mock_server)
        .await;

    let api = test_api(&mock_server.uri());
    let ids = vec!["id-1".to_string(), "id-2".to_string()];
    let (cards, err) = api.collection(&ids).await;

    assert!(err.is_none());
    assert_eq!(cards.len(), 2);
    assert_eq!(cards["id-1"].prices.eur.as_deref(), Some("1.00"));
    assert_eq!(cards["id-2"].prices.eur.as_deref(), Some("2.00"));
}

#[tokio::test]
async fn collection_sends_identifier_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/cards/collection"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })))
        .mount(&mock_server)
        .await;

    let api = test_api(&mock_server.uri());
    let ids = vec!["id-1".to_string(), "id-2".to_string()];
    let _ = api.collection(&ids).await;

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(
        body,
        serde_json::json!({ "identifiers": [{ "id": "id-1" }, { "id": "id-2" }] })
    );
}

#[tokio::test]
async fn collection_chunks_above_the_cap() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/cards/collection"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })))
        .mount(&mock_server)
        .await;

    let api = test_api(&mock_server.uri());
    let ids: Vec<String> = (0..80).map(|i| format!("id-{i}")).collect();
    let (_, err) = api.collection(&ids).await;
    assert!(err.is_none());

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2, "80 identifiers need two calls");
    for request in &requests {
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        let count = body["identifiers"].as_array().unwrap().len();
        assert!(count <= 75, "chunk of {count} exceeds the cap");
    }
}

#[tokio::test]
async fn collection_missing_ids_are_absent_from_map() {
    let mock_server = MockServer::start().await;

    // Scryfall omits unknown identifiers from the data array.
    Mock::given(method("POST"))
        .and(path("/cards/collection"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [card_json("known", "1.00")]
        })))
        .mount(&mock_server)
        .await;

    let api = test_api(&mock_server.uri());
    let ids = vec!["known".to_string(), "unknown".to_string()];
    let (cards, err) = api.collection(&ids).await;

    assert!(err.is_none());
    assert!(cards.contains_key("known"));
    assert!(!cards.contains_key("unknown"));
}

#[tokio::test]
async fn collection_failure_returns_error_with_empty_map() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/cards/collection"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let api = test_api(&mock_server.uri());
    let ids = vec!["id-1".to_string()];
    let (cards, err) = api.collection(&ids).await;

    assert!(cards.is_empty());
    match err {
        Some(PriceError::HttpStatus(status)) => {
            assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        }
        other => panic!("Expected PriceError::HttpStatus, got: {other:?}"),
    }
}

#[tokio::test]
async fn collection_429_maps_to_rate_limited() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/cards/collection"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let api = test_api(&mock_server.uri());
    let ids = vec!["id-1".to_string()];
    let (cards, err) = api.collection(&ids).await;

    assert!(cards.is_empty());
    assert!(matches!(err, Some(PriceError::RateLimited)));
}
