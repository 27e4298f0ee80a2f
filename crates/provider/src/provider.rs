//! Enum dispatch over the concrete adapters.

use crate::{
    anthropic::Anthropic, bedrock::Bedrock, cohere::Cohere, gemini::Gemini,
    huggingface::HuggingFace, ollama::Ollama, openai::OpenAi, replicate::Replicate,
};
use rcore::{Capabilities, CompletionRequest, Generation, Llm, ProviderId, Result, TextStream};

/// A constructed adapter.
///
/// Several providers share a wire dialect and therefore a variant: the
/// OpenAI variant also serves Azure, Together, vLLM, GPT4All, Jina and
/// Mistral; the Gemini variant also serves Vertex AI.
#[derive(Clone)]
pub enum Provider {
    /// OpenAI chat completions and compatible servers.
    OpenAi(OpenAi),
    /// Anthropic Messages API.
    Anthropic(Anthropic),
    /// Google Generative Language and Vertex AI.
    Gemini(Gemini),
    /// Cohere chat.
    Cohere(Cohere),
    /// Ollama chat.
    Ollama(Ollama),
    /// Hugging Face text generation.
    HuggingFace(HuggingFace),
    /// Llama 2 on Replicate.
    Replicate(Replicate),
    /// Amazon Bedrock Converse.
    Bedrock(Bedrock),
}

impl Llm for Provider {
    fn id(&self) -> ProviderId {
        match self {
            Self::OpenAi(p) => p.id(),
            Self::Anthropic(p) => p.id(),
            Self::Gemini(p) => p.id(),
            Self::Cohere(p) => p.id(),
            Self::Ollama(p) => p.id(),
            Self::HuggingFace(p) => p.id(),
            Self::Replicate(p) => p.id(),
            Self::Bedrock(p) => p.id(),
        }
    }

    fn capabilities(&self) -> Capabilities {
        match self {
            Self::OpenAi(p) => p.capabilities(),
            Self::Anthropic(p) => p.capabilities(),
            Self::Gemini(p) => p.capabilities(),
            Self::Cohere(p) => p.capabilities(),
            Self::Ollama(p) => p.capabilities(),
            Self::HuggingFace(p) => p.capabilities(),
            Self::Replicate(p) => p.capabilities(),
            Self::Bedrock(p) => p.capabilities(),
        }
    }

    async fn generate(&self, request: &CompletionRequest) -> Result<Generation> {
        match self {
            Self::OpenAi(p) => p.generate(request).await,
            Self::Anthropic(p) => p.generate(request).await,
            Self::Gemini(p) => p.generate(request).await,
            Self::Cohere(p) => p.generate(request).await,
            Self::Ollama(p) => p.generate(request).await,
            Self::HuggingFace(p) => p.generate(request).await,
            Self::Replicate(p) => p.generate(request).await,
            Self::Bedrock(p) => p.generate(request).await,
        }
    }

    fn stream(&self, request: &CompletionRequest) -> TextStream {
        match self {
            Self::OpenAi(p) => p.stream(request),
            Self::Anthropic(p) => p.stream(request),
            Self::Gemini(p) => p.stream(request),
            Self::Cohere(p) => p.stream(request),
            Self::Ollama(p) => p.stream(request),
            Self::HuggingFace(p) => p.stream(request),
            Self::Replicate(p) => p.stream(request),
            Self::Bedrock(p) => p.stream(request),
        }
    }
}
