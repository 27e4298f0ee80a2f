//! Cohere chat (v1).
//!
//! Streams newline-delimited JSON events: `text-generation` carries text,
//! `stream-end` closes the stream with a finish reason.

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

/// The Cohere API base URL.
pub const ENDPOINT: &str = "https://api.cohere.ai/v1";

const DEFAULT_MODEL: &str = "command-r";

pub(crate) const PARAMS: ParamTable = ParamTable {
    provider: ProviderId::Cohere,
    temperature: Mapping::Wire("temperature"),
    top_p: Mapping::Wire("p"),
    top_k: Mapping::Wire("k"),
    max_tokens: Mapping::Wire("max_tokens"),
    seed: Mapping::Wire("seed"),
    defaults: Sampling::NONE,
    options: &[],
    extras: Extras::Only(&[
        "preamble",
        "stop_sequences",
        "frequency_penalty",
        "presence_penalty",
        "documents",
        "connectors",
    ]),
};

pub(crate) const CAPABILITIES: Capabilities = Capabilities::STREAM;

/// The Cohere adapter.
#[derive(Clone)]
pub struct Cohere {
    http: HttpProvider,
    url: String,
    model: CompactString,
    params: MappedParams,
    system: Option<String>,
}

#[derive(Deserialize)]
struct Response {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
#[serde(tag = "event_type")]
enum Event {
    #[serde(rename = "text-generation")]
    TextGeneration { text: String },
    #[serde(rename = "stream-end")]
    StreamEnd {
        #[serde(default)]
        finish_reason: String,
        #[serde(default)]
        response: Value,
    },
    #[serde(other)]
    Other,
}

impl Cohere {
    pub fn new(config: &ProviderConfig, creds: &Credentials<'_>, client: Client) -> Result<Self> {
        let params = PARAMS.apply(&config.sampling, &config.extra)?;
        let key = creds.key("COHERE_API_KEY")?;
        let base = config.endpoint.as_deref().unwrap_or(ENDPOINT);
        let http = HttpProvider::bearer(ProviderId::Cohere, client, &key, base)?
            .with_timeout(config.timeout);
        Ok(Self {
            url: http.url("chat"),
            http,
            model: config.model.clone().unwrap_or_else(|| DEFAULT_MODEL.into()),
            params,
            system: config.system_prompt.clone(),
        })
    }

    fn body(&self, request: &CompletionRequest, stream: bool) -> Value {
        let mut body = Map::new();
        body.insert("model".into(), self.model.as_str().into());
        body.insert("message".into(), request.prompt.as_str().into());
        if let Some(system) = request.system_or(self.system.as_deref()) {
            body.insert("preamble".into(), system.into());
        }
        self.params.merge_into(&mut body);
        body.insert("stream".into(), stream.into());
        Value::Object(body)
    }
}

impl Llm for Cohere {
    fn id(&self) -> ProviderId {
        ProviderId::Cohere
    }

    fn capabilities(&self) -> Capabilities {
        CAPABILITIES
    }

    async fn generate(&self, request: &CompletionRequest) -> Result<Generation> {
        let body = self.body(request, false);
        let response: Response = self.http.send(self.http.post(&self.url, &body)).await?;
        Ok(Generation::text(response.text))
    }

    fn stream(&self, request: &CompletionRequest) -> TextStream {
        let body = self.body(request, true);
        stream::ndjson(ProviderId::Cohere, self.http.post(&self.url, &body), parse)
    }
}

fn parse(line: String) -> Result<Frame> {
    let event: Event = match serde_json::from_str(&line) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("failed to parse cohere event: {e}, data: {line}");
            return Ok(Frame::Skip);
        }
    };
    Ok(match event {
        Event::TextGeneration { text } => Frame::Text(text),
        Event::StreamEnd {
            finish_reason,
            response,
        } if finish_reason.starts_with("ERROR") => {
            let message = response
                .get("text")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(str::to_owned)
                .unwrap_or_else(|| format!("stream ended with {finish_reason}"));
            return Err(Error::response(ProviderId::Cohere, None, message, line));
        }
        Event::StreamEnd { .. } => Frame::Done,
        Event::Other => Frame::Skip,
    })
}

pub fn build(config: &ProviderConfig, creds: &Credentials<'_>, client: Client) -> Result<Provider> {
    Cohere::new(config, creds, client).map(Provider::Cohere)
}
