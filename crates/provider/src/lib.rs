//! Provider adapters for ragllm.
//!
//! [`Registry`] maps a provider identifier to its [`Constructor`];
//! [`Completions`] is the facade that constructs, caches and calls the
//! resulting [`Provider`].

pub use {
    anthropic::Anthropic,
    bedrock::Bedrock,
    cohere::Cohere,
    facade::Completions,
    gemini::Gemini,
    http::HttpProvider,
    huggingface::HuggingFace,
    ollama::Ollama,
    openai::OpenAi,
    provider::Provider,
    registry::{Constructor, Registry},
    replicate::Replicate,
};

mod anthropic;
mod bedrock;
mod cohere;
mod facade;
mod gemini;
pub mod http;
mod huggingface;
mod ollama;
mod openai;
mod provider;
mod registry;
mod replicate;
pub mod stream;
