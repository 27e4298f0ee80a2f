//! Hugging Face text-generation inference.
//!
//! Targets the serverless Inference API by model id, or a dedicated
//! Inference Endpoint when the endpoint override is set. Dedicated
//! endpoints are addressed directly, so the override is the full URL.

use crate::{
    HttpProvider, Provider,
    stream::{self, Frame},
};
use compact_str::CompactString;
use rcore::{
    Capabilities, CompletionRequest, Credentials, Error, Extras, Generation, Llm, MappedParams,
    Mapping, ParamTable, ProviderConfig, ProviderId, Result, Sampling, TextStream,
};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};

/// The serverless Inference API, suffixed with the model id.
pub const ENDPOINT: &str = "https://api-inference.huggingface.co/models";

const DEFAULT_MODEL: &str = "google/flan-t5-xxl";

/// Sampling parameters live under `parameters`.
pub(crate) const PARAMS: ParamTable = ParamTable {
    provider: ProviderId::HuggingFace,
    temperature: Mapping::Wire("temperature"),
    top_p: Mapping::Wire("top_p"),
    top_k: Mapping::Wire("top_k"),
    max_tokens: Mapping::Wire("max_new_tokens"),
    seed: Mapping::Wire("seed"),
    defaults: Sampling::NONE,
    options: &[],
    extras: Extras::Only(&["options"]),
};

pub(crate) const CAPABILITIES: Capabilities = Capabilities::STREAM;

/// The Hugging Face adapter.
#[derive(Clone)]
pub struct HuggingFace {
    http: HttpProvider,
    params: MappedParams,
    system: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Response {
    Batch(Vec<Output>),
    Single(Output),
}

#[derive(Deserialize)]
struct Output {
    generated_text: String,
}

#[derive(Deserialize)]
struct StreamEvent {
    #[serde(default)]
    token: Option<Token>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct Token {
    #[serde(default)]
    text: String,
    #[serde(default)]
    special: bool,
}

impl HuggingFace {
    pub fn new(config: &ProviderConfig, creds: &Credentials<'_>, client: Client) -> Result<Self> {
        let params = PARAMS.apply(&config.sampling, &config.extra)?;
        let key = creds.key("HUGGINGFACE_ACCESS_TOKEN")?;
        let url = match &config.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => {
                let model = config
                    .model
                    .clone()
                    .unwrap_or_else(|| CompactString::from(DEFAULT_MODEL));
                format!("{ENDPOINT}/{model}")
            }
        };
        let http = HttpProvider::bearer(ProviderId::HuggingFace, client, &key, &url)?
            .with_timeout(config.timeout);
        Ok(Self {
            http,
            params,
            system: config.system_prompt.clone(),
        })
    }

    fn body(&self, request: &CompletionRequest, stream: bool) -> Value {
        let inputs = match request.system_or(self.system.as_deref()) {
            Some(system) => format!("{system}\n\n{}", request.prompt),
            None => request.prompt.clone(),
        };
        let mut parameters = self.params.sampling.clone();
        parameters.insert("return_full_text".into(), false.into());

        let mut body = Map::new();
        body.insert("inputs".into(), inputs.into());
        body.insert("parameters".into(), Value::Object(parameters));
        for (key, value) in &self.params.extra {
            body.insert(key.clone(), value.clone());
        }
        if stream {
            body.insert("stream".into(), true.into());
        }
        Value::Object(body)
    }
}

impl Llm for HuggingFace {
    fn id(&self) -> ProviderId {
        ProviderId::HuggingFace
    }

    fn capabilities(&self) -> Capabilities {
        CAPABILITIES
    }

    async fn generate(&self, request: &CompletionRequest) -> Result<Generation> {
        let body = self.body(request, false);
        let (response, raw): (Response, _) = self
            .http
            .send_raw(self.http.post(self.http.endpoint(), &body))
            .await?;
        let output = match response {
            Response::Batch(outputs) => outputs.into_iter().next(),
            Response::Single(output) => Some(output),
        };
        let Some(output) = output else {
            return Err(Error::response(
                ProviderId::HuggingFace,
                None,
                "response has no outputs",
                raw,
            ));
        };
        Ok(Generation::text(output.generated_text))
    }

    fn stream(&self, request: &CompletionRequest) -> TextStream {
        let body = self.body(request, true);
        let request = self.http.post(self.http.endpoint(), &body);
        stream::sse(ProviderId::HuggingFace, request, |event| {
            let data = event.data.trim();
            if data.is_empty() {
                return Ok(Frame::Skip);
            }
            let event: StreamEvent = match serde_json::from_str(data) {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!("failed to parse huggingface token: {e}, data: {data}");
                    return Ok(Frame::Skip);
                }
            };
            if let Some(error) = event.error {
                return Err(Error::response(ProviderId::HuggingFace, None, error, data));
            }
            Ok(match event.token {
                Some(token) if !token.special => Frame::Text(token.text),
                _ => Frame::Skip,
            })
        })
    }
}

pub fn build(config: &ProviderConfig, creds: &Credentials<'_>, client: Client) -> Result<Provider> {
    HuggingFace::new(config, creds, client).map(Provider::HuggingFace)
}
