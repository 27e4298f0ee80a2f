//! OpenAI chat completions and the providers that speak it.
//!
//! OpenAI, Azure OpenAI, Together, JinaChat, vLLM, GPT4All's local API
//! server and Mistral share this wire family. They differ in endpoint,
//! authentication and parameter tables, captured by a [`Profile`] each.

use crate::{HttpProvider, Provider};
use compact_str::CompactString;
use rcore::{
    Capabilities, Credentials, Error, Extras, MappedParams, Mapping, ParamTable, ProviderConfig,
    ProviderId, Result,
};
use reqwest::Client;

mod provider;
mod request;

const OPENAI_EXTRAS: Extras = Extras::Only(&[
    "frequency_penalty",
    "presence_penalty",
    "stop",
    "logit_bias",
    "response_format",
    "user",
    "n",
]);

/// How a provider authenticates.
enum Key {
    /// Required bearer key.
    Required(&'static str),
    /// Bearer key when the variable is set.
    Optional(&'static str),
    /// Local server, no key.
    None,
}

/// Per-provider constants.
pub(crate) struct Profile {
    pub(crate) table: ParamTable,
    pub(crate) capabilities: Capabilities,
    model: Option<&'static str>,
    base: &'static str,
    /// Variable that overrides `base` when set.
    base_var: Option<&'static str>,
    key: Key,
}

/// An OpenAI table with `top_k` and `seed` handled as given.
const fn table(
    provider: ProviderId,
    top_k: Mapping,
    seed: Mapping,
    extras: Extras,
) -> ParamTable {
    ParamTable {
        top_k,
        seed,
        ..ParamTable::passthrough(provider, extras)
    }
}

pub(crate) const OPENAI: Profile = Profile {
    table: table(ProviderId::OpenAi, Mapping::Drop, Mapping::Wire("seed"), OPENAI_EXTRAS),
    capabilities: Capabilities::ALL,
    model: Some("gpt-4o-mini"),
    base: "https://api.openai.com/v1",
    base_var: Some("OPENAI_API_BASE"),
    key: Key::Required("OPENAI_API_KEY"),
};

pub(crate) const AZURE: ParamTable = ParamTable {
    options: &["deployment_name", "api_version"],
    ..table(ProviderId::AzureOpenAi, Mapping::Drop, Mapping::Wire("seed"), OPENAI_EXTRAS)
};

pub(crate) const TOGETHER: Profile = Profile {
    table: ParamTable {
        extras: Extras::Only(&["stop", "repetition_penalty", "frequency_penalty", "presence_penalty"]),
        ..ParamTable::passthrough(ProviderId::Together, Extras::Any)
    },
    capabilities: Capabilities::ALL,
    model: Some("mistralai/Mixtral-8x7B-Instruct-v0.1"),
    base: "https://api.together.xyz/v1",
    base_var: None,
    key: Key::Required("TOGETHER_API_KEY"),
};

pub(crate) const JINA: Profile = Profile {
    table: table(ProviderId::Jina, Mapping::Drop, Mapping::Drop, OPENAI_EXTRAS),
    capabilities: Capabilities::STREAM,
    model: Some("jina-chat"),
    base: "https://api.chat.jina.ai/v1",
    base_var: None,
    key: Key::Required("JINACHAT_API_KEY"),
};

pub(crate) const VLLM: Profile = Profile {
    table: ParamTable::passthrough(ProviderId::Vllm, Extras::Any),
    capabilities: Capabilities::ALL,
    model: Some("mosaicml/mpt-7b"),
    base: "http://localhost:8000/v1",
    base_var: None,
    key: Key::Optional("VLLM_API_KEY"),
};

pub(crate) const GPT4ALL: Profile = Profile {
    table: table(ProviderId::Gpt4All, Mapping::Drop, Mapping::Drop, Extras::Only(&["stop", "n"])),
    capabilities: Capabilities::STREAM,
    model: Some("orca-mini-3b-gguf2-q4_0.gguf"),
    base: "http://localhost:4891/v1",
    base_var: None,
    key: Key::None,
};

pub(crate) const MISTRAL: Profile = Profile {
    table: table(
        ProviderId::MistralAi,
        Mapping::Drop,
        Mapping::Wire("random_seed"),
        Extras::Only(&["safe_prompt", "stop", "response_format"]),
    ),
    capabilities: Capabilities::ALL,
    model: Some("open-mistral-7b"),
    base: "https://api.mistral.ai/v1",
    base_var: None,
    key: Key::Required("MISTRAL_API_KEY"),
};

/// Default Azure OpenAI API version.
const AZURE_API_VERSION: &str = "2024-02-01";

/// An adapter for an OpenAI-compatible chat completions API.
#[derive(Clone)]
pub struct OpenAi {
    id: ProviderId,
    pub(crate) capabilities: Capabilities,
    http: HttpProvider,
    /// Full chat completions URL.
    url: String,
    /// Sent in the body; Azure addresses the model by deployment instead.
    model: Option<CompactString>,
    params: MappedParams,
    system: Option<String>,
}

impl OpenAi {
    /// Construct from a validated configuration.
    pub fn new(config: &ProviderConfig, creds: &Credentials<'_>, client: Client) -> Result<Self> {
        if config.provider == ProviderId::AzureOpenAi {
            return Self::azure(config, creds, client);
        }
        let profile = match config.provider {
            ProviderId::OpenAi => &OPENAI,
            ProviderId::Together => &TOGETHER,
            ProviderId::Jina => &JINA,
            ProviderId::Vllm => &VLLM,
            ProviderId::Gpt4All => &GPT4ALL,
            ProviderId::MistralAi => &MISTRAL,
            other => {
                return Err(Error::config(format!(
                    "{other} is not an OpenAI-compatible provider"
                )));
            }
        };

        let params = profile.table.apply(&config.sampling, &config.extra)?;
        let base = config
            .endpoint
            .clone()
            .or_else(|| profile.base_var.and_then(|var| creds.optional(var)))
            .unwrap_or_else(|| profile.base.to_owned());
        let http = match profile.key {
            Key::Required(var) => HttpProvider::bearer(config.provider, client, &creds.key(var)?, &base)?,
            Key::Optional(var) => match creds.key_opt(var) {
                Some(key) => HttpProvider::bearer(config.provider, client, &key, &base)?,
                None => HttpProvider::no_auth(config.provider, client, &base),
            },
            Key::None => HttpProvider::no_auth(config.provider, client, &base),
        }
        .with_timeout(config.timeout);

        Ok(Self {
            id: config.provider,
            capabilities: profile.capabilities,
            url: http.url("chat/completions"),
            http,
            model: config.model.clone().or(profile.model.map(CompactString::from)),
            params,
            system: config.system_prompt.clone(),
        })
    }

    /// Azure OpenAI addresses a deployment and authenticates with `api-key`.
    fn azure(config: &ProviderConfig, creds: &Credentials<'_>, client: Client) -> Result<Self> {
        let params = AZURE.apply(&config.sampling, &config.extra)?;
        let key = creds.key("AZURE_OPENAI_API_KEY")?;
        let endpoint = match &config.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => creds.require("AZURE_OPENAI_ENDPOINT")?,
        };
        let deployment = config
            .option("deployment_name")
            .map(CompactString::from)
            .or_else(|| config.model.clone())
            .ok_or_else(|| {
                Error::config("azure_openai requires `deployment_name` or `model`")
            })?;
        let version = config
            .option("api_version")
            .map(str::to_owned)
            .or_else(|| creds.optional("OPENAI_API_VERSION"))
            .unwrap_or_else(|| AZURE_API_VERSION.to_owned());

        let http = HttpProvider::custom_header(
            ProviderId::AzureOpenAi,
            client,
            "api-key",
            &key,
            &endpoint,
        )?
        .with_timeout(config.timeout);
        let mut url = url::Url::parse(&http.url("openai/deployments"))
            .map_err(|e| Error::config(format!("invalid azure endpoint '{endpoint}': {e}")))?;
        url.path_segments_mut()
            .map_err(|_| Error::config(format!("invalid azure endpoint '{endpoint}'")))?
            .push(&deployment)
            .extend(["chat", "completions"]);
        url.query_pairs_mut().append_pair("api-version", &version);

        Ok(Self {
            id: ProviderId::AzureOpenAi,
            capabilities: Capabilities::ALL,
            url: url.into(),
            http,
            model: None,
            params,
            system: config.system_prompt.clone(),
        })
    }

    /// The full chat completions URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The mapped sampling parameters sent with every request.
    pub fn params(&self) -> &MappedParams {
        &self.params
    }
}

/// Registry entry point for the whole family.
pub fn build(config: &ProviderConfig, creds: &Credentials<'_>, client: Client) -> Result<Provider> {
    OpenAi::new(config, creds, client).map(Provider::OpenAi)
}
