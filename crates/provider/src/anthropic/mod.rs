//! Anthropic Messages API.

use crate::{HttpProvider, Provider};
use compact_str::CompactString;
use rcore::{
    Capabilities, Credentials, Extras, MappedParams, Mapping, ParamTable, ProviderConfig,
    ProviderId, Result, Sampling,
};
use reqwest::Client;

mod provider;
mod stream;

/// The Anthropic API base URL.
pub const ENDPOINT: &str = "https://api.anthropic.com/v1";

/// The Anthropic API version header value.
const API_VERSION: &str = "2023-06-01";

const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";

/// Anthropic requires `max_tokens` and has no `seed`.
pub(crate) const PARAMS: ParamTable = ParamTable {
    seed: Mapping::Drop,
    defaults: Sampling {
        max_tokens: Some(1024),
        ..Sampling::NONE
    },
    ..ParamTable::passthrough(
        ProviderId::Anthropic,
        Extras::Only(&["stop_sequences", "metadata"]),
    )
};

/// The Anthropic adapter.
#[derive(Clone)]
pub struct Anthropic {
    http: HttpProvider,
    url: String,
    model: CompactString,
    params: MappedParams,
    system: Option<String>,
}

impl Anthropic {
    pub fn new(config: &ProviderConfig, creds: &Credentials<'_>, client: Client) -> Result<Self> {
        let params = PARAMS.apply(&config.sampling, &config.extra)?;
        let key = creds.key("ANTHROPIC_API_KEY")?;
        let base = config.endpoint.as_deref().unwrap_or(ENDPOINT);
        let http = HttpProvider::custom_header(ProviderId::Anthropic, client, "x-api-key", &key, base)?
            .with_header("anthropic-version", API_VERSION)
            .with_timeout(config.timeout);
        Ok(Self {
            url: http.url("messages"),
            http,
            model: config.model.clone().unwrap_or_else(|| DEFAULT_MODEL.into()),
            params,
            system: config.system_prompt.clone(),
        })
    }
}

pub fn build(config: &ProviderConfig, creds: &Credentials<'_>, client: Client) -> Result<Provider> {
    Anthropic::new(config, creds, client).map(Provider::Anthropic)
}

pub(crate) const CAPABILITIES: Capabilities = Capabilities::ALL;
