//! Tests for HttpProvider header construction.

use rcore::{Error, ProviderId, Secret};
use ragllm_provider::{HttpProvider, http};
use reqwest::Client;

#[test]
fn bearer_sets_authorization_header() {
    let provider = HttpProvider::bearer(
        ProviderId::OpenAi,
        Client::new(),
        &Secret::new("test-key"),
        "http://example.com/v1/",
    )
    .expect("bearer provider");

    let auth = provider
        .headers()
        .get("authorization")
        .expect("authorization header");
    assert_eq!(auth.to_str().unwrap(), "Bearer test-key");
    assert!(auth.is_sensitive());
    assert_eq!(provider.endpoint(), "http://example.com/v1");
    assert_eq!(provider.url("chat/completions"), "http://example.com/v1/chat/completions");
}

#[test]
fn no_auth_omits_authorization_header() {
    let provider = HttpProvider::no_auth(ProviderId::Ollama, Client::new(), "http://localhost:11434");

    assert!(provider.headers().get("authorization").is_none());
    assert_eq!(provider.provider(), ProviderId::Ollama);
    assert_eq!(provider.url("/api/chat"), "http://localhost:11434/api/chat");
}

#[test]
fn sets_content_type_and_accept() {
    let provider = HttpProvider::no_auth(ProviderId::Vllm, Client::new(), "http://localhost:8000");

    let ct = provider
        .headers()
        .get("content-type")
        .expect("content-type");
    assert_eq!(ct.to_str().unwrap(), "application/json");
    let accept = provider.headers().get("accept").expect("accept");
    assert_eq!(accept.to_str().unwrap(), "application/json");
}

#[test]
fn custom_header_sets_named_header() {
    let provider = HttpProvider::custom_header(
        ProviderId::Anthropic,
        Client::new(),
        "x-api-key",
        &Secret::new("sk-123"),
        "http://example.com",
    )
    .expect("custom header provider")
    .with_header("anthropic-version", "2023-06-01");

    let key = provider.headers().get("x-api-key").expect("x-api-key");
    assert_eq!(key.to_str().unwrap(), "sk-123");
    assert!(key.is_sensitive());
    assert!(provider.headers().get("authorization").is_none());
    assert_eq!(
        provider.headers().get("anthropic-version").unwrap(),
        "2023-06-01"
    );
}

#[test]
fn invalid_credential_is_authentication_error() {
    let err = HttpProvider::bearer(
        ProviderId::Cohere,
        Client::new(),
        &Secret::new("line\nbreak"),
        "http://example.com",
    )
    .err()
    .expect("header value rejected");
    assert!(matches!(err, Error::Authentication { .. }));
    assert!(!err.to_string().contains("line"));
}

#[test]
fn error_message_shapes() {
    assert_eq!(
        http::error_message(r#"{"error":{"message":"bad key","type":"invalid_request_error"}}"#),
        Some("bad key".into())
    );
    assert_eq!(
        http::error_message(r#"{"message":"throttled"}"#),
        Some("throttled".into())
    );
    assert_eq!(
        http::error_message(r#"{"error":"Model is loading"}"#),
        Some("Model is loading".into())
    );
    assert_eq!(
        http::error_message(r#"[{"error":{"code":400,"message":"invalid argument"}}]"#),
        Some("invalid argument".into())
    );
    assert_eq!(
        http::error_message(r#"{"detail":"Not found"}"#),
        Some("Not found".into())
    );
    assert_eq!(http::error_message("<html>502</html>"), None);
}
