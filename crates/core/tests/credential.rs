//! Credential resolution through injected sources.

extern crate ragllm_core as rcore;

use rcore::{CredentialSource, Credentials, Error, Layered, ProviderId, Secret, StaticSource};

#[test]
fn explicit_key_wins_over_source() {
    let source = StaticSource::new().with("OPENAI_API_KEY", "from-source");
    let explicit = Secret::new("from-config");
    let creds = Credentials::new(ProviderId::OpenAi, &source, Some(&explicit));
    assert_eq!(creds.key("OPENAI_API_KEY").unwrap().expose(), "from-config");
    assert_eq!(creds.provider(), ProviderId::OpenAi);
}

#[test]
fn blank_explicit_key_falls_back() {
    let source = StaticSource::new().with("OPENAI_API_KEY", "from-source");
    let explicit = Secret::new("   ");
    let creds = Credentials::new(ProviderId::OpenAi, &source, Some(&explicit));
    assert_eq!(creds.key("OPENAI_API_KEY").unwrap().expose(), "from-source");
}

#[test]
fn missing_key_is_authentication_error() {
    let source = StaticSource::new().with("OTHER", "x");
    let creds = Credentials::new(ProviderId::MistralAi, &source, None);
    let err = creds.key("MISTRAL_API_KEY").unwrap_err();
    let Error::Authentication { provider, message } = err else {
        panic!("expected authentication error, got {err}");
    };
    assert_eq!(provider, ProviderId::MistralAi);
    assert_eq!(message, "environment variable MISTRAL_API_KEY is not set");
    assert!(creds.key_opt("MISTRAL_API_KEY").is_none());
}

#[test]
fn optional_treats_blank_as_unset() {
    let source = StaticSource::new().with("AWS_REGION", "");
    let creds = Credentials::new(ProviderId::AwsBedrock, &source, None);
    assert_eq!(creds.optional("AWS_REGION"), None);
}

#[test]
fn layered_prefers_first_source() {
    let overrides = StaticSource::new().with("COHERE_API_KEY", "override");
    let base: StaticSource = [("COHERE_API_KEY", "base"), ("OLLAMA_HOST", "gpu:11434")]
        .into_iter()
        .collect();
    let layered = Layered(overrides, base);
    assert_eq!(layered.var("COHERE_API_KEY").as_deref(), Some("override"));
    assert_eq!(layered.var("OLLAMA_HOST").as_deref(), Some("gpu:11434"));
    assert_eq!(layered.var("UNSET"), None);
}

#[test]
fn secrets_never_print() {
    let secret = Secret::new("sk-live-123");
    assert_eq!(format!("{secret:?}"), "Secret(***)");

    let source = StaticSource::new().with("ANTHROPIC_API_KEY", "sk-live-123");
    let debug = format!("{source:?}");
    assert!(debug.contains("ANTHROPIC_API_KEY"));
    assert!(!debug.contains("sk-live-123"));
}
