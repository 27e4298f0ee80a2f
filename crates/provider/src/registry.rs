//! Provider identifier to adapter constructor.

use crate::{
    Provider, anthropic, bedrock, cohere, gemini, huggingface, ollama, openai, replicate,
};
use rcore::{
    Capabilities, CredentialSource, Credentials, Error, ParamTable, ProviderConfig, ProviderId,
    Result,
};
use reqwest::Client;

type Build = fn(&ProviderConfig, &Credentials<'_>, Client) -> Result<Provider>;

/// Everything needed to construct one provider's adapter.
#[derive(Debug)]
pub struct Constructor {
    pub id: ProviderId,
    pub capabilities: Capabilities,
    /// Credential variables read at construction, required ones first.
    pub credentials: &'static [&'static str],
    pub params: &'static ParamTable,
    build: Build,
}

impl Constructor {
    /// Validate `config` and construct the adapter.
    ///
    /// Checks provider identity, stream capability, the parameter table and
    /// credentials. Never touches the network.
    pub fn build(
        &self,
        config: &ProviderConfig,
        source: &dyn CredentialSource,
        client: Client,
    ) -> Result<Provider> {
        if config.provider != self.id {
            return Err(Error::config(format!(
                "configuration for {} passed to the {} constructor",
                config.provider, self.id
            )));
        }
        config.validate()?;
        if config.stream && !self.capabilities.stream {
            return Err(Error::unsupported(self.id, "stream"));
        }
        let creds = Credentials::new(self.id, source, config.api_key.as_ref());
        let provider = (self.build)(config, &creds, client)?;
        tracing::info!(
            provider = %self.id,
            model = config.model.as_deref().unwrap_or("default"),
            stream = config.stream,
            "constructed adapter"
        );
        Ok(provider)
    }
}

static REGISTRY: [Constructor; 15] = [
    Constructor {
        id: ProviderId::OpenAi,
        capabilities: openai::OPENAI.capabilities,
        credentials: &["OPENAI_API_KEY", "OPENAI_API_BASE"],
        params: &openai::OPENAI.table,
        build: openai::build,
    },
    Constructor {
        id: ProviderId::AzureOpenAi,
        capabilities: Capabilities::ALL,
        credentials: &["AZURE_OPENAI_API_KEY", "AZURE_OPENAI_ENDPOINT", "OPENAI_API_VERSION"],
        params: &openai::AZURE,
        build: openai::build,
    },
    Constructor {
        id: ProviderId::Google,
        capabilities: gemini::CAPABILITIES,
        credentials: &["GOOGLE_API_KEY"],
        params: &gemini::GOOGLE,
        build: gemini::build,
    },
    Constructor {
        id: ProviderId::Anthropic,
        capabilities: anthropic::CAPABILITIES,
        credentials: &["ANTHROPIC_API_KEY"],
        params: &anthropic::PARAMS,
        build: anthropic::build,
    },
    Constructor {
        id: ProviderId::Cohere,
        capabilities: cohere::CAPABILITIES,
        credentials: &["COHERE_API_KEY"],
        params: &cohere::PARAMS,
        build: cohere::build,
    },
    Constructor {
        id: ProviderId::Together,
        capabilities: openai::TOGETHER.capabilities,
        credentials: &["TOGETHER_API_KEY"],
        params: &openai::TOGETHER.table,
        build: openai::build,
    },
    Constructor {
        id: ProviderId::Ollama,
        capabilities: ollama::CAPABILITIES,
        credentials: &["OLLAMA_HOST"],
        params: &ollama::PARAMS,
        build: ollama::build,
    },
    Constructor {
        id: ProviderId::Vllm,
        capabilities: openai::VLLM.capabilities,
        credentials: &["VLLM_API_KEY"],
        params: &openai::VLLM.table,
        build: openai::build,
    },
    Constructor {
        id: ProviderId::Gpt4All,
        capabilities: openai::GPT4ALL.capabilities,
        credentials: &[],
        params: &openai::GPT4ALL.table,
        build: openai::build,
    },
    Constructor {
        id: ProviderId::Jina,
        capabilities: openai::JINA.capabilities,
        credentials: &["JINACHAT_API_KEY"],
        params: &openai::JINA.table,
        build: openai::build,
    },
    Constructor {
        id: ProviderId::HuggingFace,
        capabilities: huggingface::CAPABILITIES,
        credentials: &["HUGGINGFACE_ACCESS_TOKEN"],
        params: &huggingface::PARAMS,
        build: huggingface::build,
    },
    Constructor {
        id: ProviderId::Llama2,
        capabilities: replicate::CAPABILITIES,
        credentials: &["REPLICATE_API_TOKEN"],
        params: &replicate::PARAMS,
        build: replicate::build,
    },
    Constructor {
        id: ProviderId::VertexAi,
        capabilities: gemini::CAPABILITIES,
        credentials: &[
            "GOOGLE_CLOUD_PROJECT",
            "GOOGLE_CLOUD_ACCESS_TOKEN",
            "GOOGLE_CLOUD_LOCATION",
        ],
        params: &gemini::VERTEX,
        build: gemini::build,
    },
    Constructor {
        id: ProviderId::MistralAi,
        capabilities: openai::MISTRAL.capabilities,
        credentials: &["MISTRAL_API_KEY"],
        params: &openai::MISTRAL.table,
        build: openai::build,
    },
    Constructor {
        id: ProviderId::AwsBedrock,
        capabilities: bedrock::CAPABILITIES,
        credentials: &["AWS_BEARER_TOKEN_BEDROCK", "AWS_REGION"],
        params: &bedrock::PARAMS,
        build: bedrock::build,
    },
];

/// The fixed set of providers.
pub struct Registry;

impl Registry {
    /// Look up the constructor for `identifier`.
    pub fn resolve(identifier: &str) -> Result<&'static Constructor> {
        identifier.parse().map(Self::get)
    }

    /// The constructor for a known provider.
    pub fn get(id: ProviderId) -> &'static Constructor {
        &REGISTRY[id as usize]
    }

    /// All constructors, in identifier order.
    pub fn entries() -> &'static [Constructor] {
        &REGISTRY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_order_matches_ids() {
        for (entry, id) in REGISTRY.iter().zip(ProviderId::ALL) {
            assert_eq!(entry.id, id);
            assert_eq!(entry.params.provider, id);
        }
    }
}
