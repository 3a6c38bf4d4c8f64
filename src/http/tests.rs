//! Tests for the HTTP module

use super::*;
use crate::auth::Credential;
use crate::config::HttpConfig;
use crate::decode::PageDecoder;
use crate::error::Error;
use crate::types::BackoffType;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Config
// ============================================================================

#[test]
fn test_http_client_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.max_retries, 0);
    assert!(config.rate_limit.is_none());
    assert!(config.user_agent.starts_with("hrms-extract/"));
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder()
        .timeout(Duration::from_secs(60))
        .max_retries(2)
        .backoff(
            BackoffType::Linear,
            Duration::from_millis(200),
            Duration::from_secs(5),
        )
        .rate_limit(RateLimiterConfig::per_second(4))
        .user_agent("test-agent/1.0")
        .build();

    assert_eq!(config.timeout, Duration::from_secs(60));
    assert_eq!(config.max_retries, 2);
    assert_eq!(config.backoff_type, BackoffType::Linear);
    assert_eq!(config.initial_backoff, Duration::from_millis(200));
    assert_eq!(config.max_backoff, Duration::from_secs(5));
    assert_eq!(config.rate_limit, Some(RateLimiterConfig::new(4, 4)));
    assert_eq!(config.user_agent, "test-agent/1.0");
}

#[test]
fn test_http_client_config_from_yaml_section() {
    let http = HttpConfig {
        timeout_secs: 90,
        transport_retries: 3,
        requests_per_second: Some(2),
        ..HttpConfig::default()
    };

    let config = HttpClientConfig::from(&http);
    assert_eq!(config.timeout, Duration::from_secs(90));
    assert_eq!(config.max_retries, 3);
    assert_eq!(config.rate_limit, Some(RateLimiterConfig::per_second(2)));

    let client = HttpClient::with_config(config).unwrap();
    assert!(client.has_rate_limiter());
}

// ============================================================================
// Backoff
// ============================================================================

fn client_with_backoff(backoff_type: BackoffType, max: Duration) -> HttpClient {
    let config = HttpClientConfig::builder()
        .backoff(backoff_type, Duration::from_millis(100), max)
        .build();
    HttpClient::with_config(config).unwrap()
}

#[test]
fn test_calculate_backoff_constant() {
    let client = client_with_backoff(BackoffType::Constant, Duration::from_secs(60));
    assert_eq!(client.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(client.calculate_backoff(5), Duration::from_millis(100));
}

#[test]
fn test_calculate_backoff_linear() {
    let client = client_with_backoff(BackoffType::Linear, Duration::from_secs(60));
    assert_eq!(client.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(client.calculate_backoff(2), Duration::from_millis(300));
}

#[test]
fn test_calculate_backoff_exponential() {
    let client = client_with_backoff(BackoffType::Exponential, Duration::from_secs(60));
    assert_eq!(client.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(client.calculate_backoff(1), Duration::from_millis(200));
    assert_eq!(client.calculate_backoff(3), Duration::from_millis(800));
}

#[test]
fn test_calculate_backoff_respects_max() {
    let client = client_with_backoff(BackoffType::Exponential, Duration::from_secs(1));
    assert_eq!(client.calculate_backoff(10), Duration::from_secs(1));
    assert_eq!(client.calculate_backoff(64), Duration::from_secs(1));
}

// ============================================================================
// Transport behavior
// ============================================================================

#[tokio::test]
async fn test_send_returns_any_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap();
    let url = format!("{}/gone", server.uri());
    let response = client.send(|c| c.get(&url)).await.unwrap();
    assert_eq!(response.status(), 410);
}

#[tokio::test]
async fn test_send_status_errors_are_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let config = HttpClientConfig::builder()
        .max_retries(3)
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(1),
            Duration::from_millis(1),
        )
        .build();
    let client = HttpClient::with_config(config).unwrap();
    let url = format!("{}/flaky", server.uri());

    let response = client.send(|c| c.get(&url)).await.unwrap();
    assert_eq!(response.status(), 503);
}

#[tokio::test]
async fn test_send_timeout_is_fatal_without_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let config = HttpClientConfig::builder()
        .timeout(Duration::from_millis(50))
        .build();
    let client = HttpClient::with_config(config).unwrap();
    let url = format!("{}/slow", server.uri());

    let err = client.send(|c| c.get(&url)).await.unwrap_err();
    assert!(matches!(err, Error::Timeout { timeout_ms: 50 }));
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_send_never_resends_timed_out_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .expect(1)
        .mount(&server)
        .await;

    let config = HttpClientConfig::builder()
        .timeout(Duration::from_millis(100))
        .max_retries(3)
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(1),
            Duration::from_millis(1),
        )
        .build();
    let client = HttpClient::with_config(config).unwrap();
    let url = format!("{}/page", server.uri());

    let err = client.send(|c| c.post(&url)).await.unwrap_err();
    assert!(matches!(err, Error::Timeout { timeout_ms: 100 }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_send_retries_refused_connection_then_fails() {
    let config = HttpClientConfig::builder()
        .max_retries(2)
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(1),
            Duration::from_millis(1),
        )
        .build();
    let client = HttpClient::with_config(config).unwrap();

    let err = client
        .send(|c| c.post("http://127.0.0.1:1/page"))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_send_connection_refused_is_transport() {
    let client = HttpClient::new().unwrap();
    let err = client
        .send(|c| c.get("http://127.0.0.1:1/unreachable"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Transport(_)));
    assert!(err.is_transport());
    assert!(err.is_retryable());
}

#[test]
fn test_http_client_debug() {
    let client = HttpClient::new().unwrap();
    let debug = format!("{client:?}");
    assert!(debug.contains("HttpClient"));
    assert!(debug.contains("has_rate_limiter"));
}

// ============================================================================
// Page source
// ============================================================================

fn page_body(codes: &[&str], complete: bool) -> serde_json::Value {
    let records: Vec<_> = codes
        .iter()
        .map(|c| json!({"BasicDetails": {"BasicDetail": {"EmpCode": c}}}))
        .collect();
    json!({
        "root": {"EmployeeMaster": {"EmployeeMasterData": records}},
        "isLoadComplete": complete
    })
}

fn page_source(server: &MockServer) -> HttpPageSource {
    let request = DataRequest::new(
        format!("{}/api/employees", server.uri()),
        "key-123",
        r#"{"EmployeeMaster":{"Type":"Full"}}"#,
    );
    HttpPageSource::new(request, PageDecoder::default(), HttpClient::new().unwrap())
}

#[tokio::test]
async fn test_page_source_sends_expected_headers_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/employees"))
        .and(header("apikey", "key-123"))
        .and(header("Authorization", "Bearer tok-1"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({"EmployeeMaster": {"Type": "Full"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&["E1", "E2"], false)))
        .expect(1)
        .mount(&server)
        .await;

    let fetched = page_source(&server)
        .fetch(&Credential::new("tok-1"))
        .await
        .unwrap();

    let Fetched::Page(page) = fetched else {
        panic!("expected a page, got {fetched:?}");
    };
    assert_eq!(page.len(), 2);
    assert!(!page.is_load_complete);
}

#[tokio::test]
async fn test_page_source_accepts_201() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/employees"))
        .respond_with(ResponseTemplate::new(201).set_body_json(page_body(&[], true)))
        .mount(&server)
        .await;

    let fetched = page_source(&server)
        .fetch(&Credential::new("tok"))
        .await
        .unwrap();
    assert!(matches!(fetched, Fetched::Page(ref p) if p.is_terminal()));
}

#[tokio::test]
async fn test_page_source_401_is_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/employees"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .mount(&server)
        .await;

    let fetched = page_source(&server)
        .fetch(&Credential::new("stale"))
        .await
        .unwrap();
    assert_eq!(fetched, Fetched::Unauthorized);
}

#[tokio::test]
async fn test_page_source_500_is_http_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/employees"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let err = page_source(&server)
        .fetch(&Credential::new("tok"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 500, ref body } if body == "boom"));
}

#[tokio::test]
async fn test_page_source_bad_shape_is_schema_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/employees"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"root": {}})))
        .mount(&server)
        .await;

    let err = page_source(&server)
        .fetch(&Credential::new("tok"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Schema { .. }));
}

#[tokio::test]
async fn test_page_source_custom_api_key_header() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/employees"))
        .and(header("X-Api-Key", "key-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&["E1"], true)))
        .expect(1)
        .mount(&server)
        .await;

    let mut request = DataRequest::new(format!("{}/api/employees", server.uri()), "key-123", "{}");
    request.api_key_header = "X-Api-Key".to_string();
    let source = HttpPageSource::new(request, PageDecoder::default(), HttpClient::new().unwrap());

    let fetched = source.fetch(&Credential::new("tok")).await.unwrap();
    assert!(matches!(fetched, Fetched::Page(ref p) if p.len() == 1));
}

#[test]
fn test_data_request_debug_hides_api_key() {
    let request = DataRequest::new("https://hr.example.com/api", "secret-key", "{}");
    assert!(!format!("{request:?}").contains("secret-key"));
}
