//! Gemini `generateContent`, on Google AI Studio and on Vertex AI.

use crate::{HttpProvider, Provider};
use compact_str::CompactString;
use rcore::{
    Capabilities, Credentials, Extras, MappedParams, Mapping, ParamTable, ProviderConfig,
    ProviderId, Result, Sampling,
};
use reqwest::Client;

mod provider;

/// The Google AI Studio base URL.
pub const ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

const DEFAULT_MODEL: &str = "gemini-1.5-flash";

const DEFAULT_LOCATION: &str = "us-central1";

/// Sampling parameters live under `generationConfig`, camel-cased.
const fn table(provider: ProviderId, options: &'static [&'static str]) -> ParamTable {
    ParamTable {
        provider,
        temperature: Mapping::Wire("temperature"),
        top_p: Mapping::Wire("topP"),
        top_k: Mapping::Wire("topK"),
        max_tokens: Mapping::Wire("maxOutputTokens"),
        seed: Mapping::Wire("seed"),
        defaults: Sampling::NONE,
        options,
        extras: Extras::Only(&["safetySettings", "cachedContent", "labels"]),
    }
}

pub(crate) const GOOGLE: ParamTable = table(ProviderId::Google, &[]);

pub(crate) const VERTEX: ParamTable = table(ProviderId::VertexAi, &["project", "location"]);

pub(crate) const CAPABILITIES: Capabilities = Capabilities::ALL;

/// The Gemini adapter.
#[derive(Clone)]
pub struct Gemini {
    id: ProviderId,
    http: HttpProvider,
    model: CompactString,
    params: MappedParams,
    system: Option<String>,
}

impl Gemini {
    pub fn new(config: &ProviderConfig, creds: &Credentials<'_>, client: Client) -> Result<Self> {
        let http = match config.provider {
            ProviderId::VertexAi => Self::vertex(config, creds, client)?,
            _ => {
                let key = creds.key("GOOGLE_API_KEY")?;
                let base = config.endpoint.as_deref().unwrap_or(ENDPOINT);
                HttpProvider::custom_header(ProviderId::Google, client, "x-goog-api-key", &key, base)?
            }
        };
        let table = match config.provider {
            ProviderId::VertexAi => &VERTEX,
            _ => &GOOGLE,
        };
        Ok(Self {
            id: config.provider,
            http: http.with_timeout(config.timeout),
            model: config.model.clone().unwrap_or_else(|| DEFAULT_MODEL.into()),
            params: table.apply(&config.sampling, &config.extra)?,
            system: config.system_prompt.clone(),
        })
    }

    /// Vertex AI takes an OAuth access token and a project-scoped base.
    fn vertex(config: &ProviderConfig, creds: &Credentials<'_>, client: Client) -> Result<HttpProvider> {
        let token = creds.key("GOOGLE_CLOUD_ACCESS_TOKEN")?;
        let base = match &config.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => {
                let project = match config.option("project") {
                    Some(project) => project.to_owned(),
                    None => creds.require("GOOGLE_CLOUD_PROJECT")?,
                };
                let location = config
                    .option("location")
                    .map(str::to_owned)
                    .or_else(|| creds.optional("GOOGLE_CLOUD_LOCATION"))
                    .unwrap_or_else(|| DEFAULT_LOCATION.to_owned());
                format!(
                    "https://{location}-aiplatform.googleapis.com/v1/projects/{project}/locations/{location}/publishers/google"
                )
            }
        };
        HttpProvider::bearer(ProviderId::VertexAi, client, &token, &base)
    }

    /// The `models/{model}:{method}` URL.
    fn url(&self, method: &str) -> String {
        self.http.url(&format!("models/{}:{method}", self.model))
    }
}

pub fn build(config: &ProviderConfig, creds: &Credentials<'_>, client: Client) -> Result<Provider> {
    Gemini::new(config, creds, client).map(Provider::Gemini)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcore::StaticSource;

    fn vertex(source: &StaticSource, config: ProviderConfig) -> Gemini {
        let creds = Credentials::new(ProviderId::VertexAi, source, None);
        Gemini::new(&config, &creds, Client::new()).unwrap()
    }

    #[test]
    fn vertex_base_from_project_and_location() {
        let source = StaticSource::new()
            .with("GOOGLE_CLOUD_ACCESS_TOKEN", "token")
            .with("GOOGLE_CLOUD_PROJECT", "rag-prod")
            .with("GOOGLE_CLOUD_LOCATION", "europe-west4");
        let gemini = vertex(&source, ProviderConfig::new(ProviderId::VertexAi));
        assert_eq!(
            gemini.url("generateContent"),
            "https://europe-west4-aiplatform.googleapis.com/v1/projects/rag-prod/locations/europe-west4/publishers/google/models/gemini-1.5-flash:generateContent"
        );

        let config = ProviderConfig::new(ProviderId::VertexAi)
            .with_model("gemini-1.5-pro")
            .with_extra("project", "other")
            .with_extra("location", "asia-northeast1");
        assert_eq!(
            vertex(&source, config).url("streamGenerateContent"),
            "https://asia-northeast1-aiplatform.googleapis.com/v1/projects/other/locations/asia-northeast1/publishers/google/models/gemini-1.5-pro:streamGenerateContent"
        );
    }

    #[test]
    fn vertex_location_defaults() {
        let source = StaticSource::new()
            .with("GOOGLE_CLOUD_ACCESS_TOKEN", "token")
            .with("GOOGLE_CLOUD_PROJECT", "rag-prod");
        let gemini = vertex(&source, ProviderConfig::new(ProviderId::VertexAi));
        assert!(
            gemini
                .url("generateContent")
                .starts_with("https://us-central1-aiplatform.googleapis.com/v1/projects/rag-prod/locations/us-central1/")
        );
    }
}
