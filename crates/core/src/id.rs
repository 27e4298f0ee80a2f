//! Provider identifiers and capability sets.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The fixed set of supported providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProviderId {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "azure_openai")]
    AzureOpenAi,
    #[serde(rename = "google")]
    Google,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "cohere")]
    Cohere,
    #[serde(rename = "together")]
    Together,
    #[serde(rename = "ollama")]
    Ollama,
    #[serde(rename = "vllm")]
    Vllm,
    #[serde(rename = "gpt4all")]
    Gpt4All,
    #[serde(rename = "jina")]
    Jina,
    #[serde(rename = "huggingface")]
    HuggingFace,
    #[serde(rename = "llama2")]
    Llama2,
    #[serde(rename = "vertexai")]
    VertexAi,
    #[serde(rename = "mistralai")]
    MistralAi,
    #[serde(rename = "aws_bedrock")]
    AwsBedrock,
}

impl ProviderId {
    /// Every supported provider, in registry order.
    pub const ALL: [ProviderId; 15] = [
        Self::OpenAi,
        Self::AzureOpenAi,
        Self::Google,
        Self::Anthropic,
        Self::Cohere,
        Self::Together,
        Self::Ollama,
        Self::Vllm,
        Self::Gpt4All,
        Self::Jina,
        Self::HuggingFace,
        Self::Llama2,
        Self::VertexAi,
        Self::MistralAi,
        Self::AwsBedrock,
    ];

    /// The identifier as written in configuration.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::AzureOpenAi => "azure_openai",
            Self::Google => "google",
            Self::Anthropic => "anthropic",
            Self::Cohere => "cohere",
            Self::Together => "together",
            Self::Ollama => "ollama",
            Self::Vllm => "vllm",
            Self::Gpt4All => "gpt4all",
            Self::Jina => "jina",
            Self::HuggingFace => "huggingface",
            Self::Llama2 => "llama2",
            Self::VertexAi => "vertexai",
            Self::MistralAi => "mistralai",
            Self::AwsBedrock => "aws_bedrock",
        }
    }
}

impl FromStr for ProviderId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| Error::UnknownProvider(s.into()))
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an adapter can do beyond plain generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Capabilities {
    /// Incremental text delivery.
    pub stream: bool,
    /// Function / tool calling.
    pub functions: bool,
}

impl Capabilities {
    /// Generation and streaming.
    pub const STREAM: Self = Self {
        stream: true,
        functions: false,
    };

    /// Generation, streaming and function calling.
    pub const ALL: Self = Self {
        stream: true,
        functions: true,
    };
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("generate")?;
        if self.stream {
            f.write_str(", stream")?;
        }
        if self.functions {
            f.write_str(", functions")?;
        }
        Ok(())
    }
}
