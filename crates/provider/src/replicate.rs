//! Llama 2 through Replicate predictions.
//!
//! Official models are run by name; `owner/name:version` runs a specific
//! version. Generation asks the server to wait for the prediction and
//! polls when it returns early. Streaming follows the prediction's
//! `urls.stream` event source, whose `output` events carry raw text.

use crate::{
    HttpProvider, Provider,
    stream::{self, Frame},
};
use compact_str::CompactString;
use rcore::{
    Capabilities, CompletionRequest, Credentials, Error, Extras, Generation, Llm, MappedParams,
    Mapping, ParamTable, ProviderConfig, ProviderId, Result, Sampling, TextStream,
};
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;

/// The Replicate API base URL.
pub const ENDPOINT: &str = "https://api.replicate.com/v1";

const DEFAULT_MODEL: &str = "meta/llama-2-13b-chat";

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Sampling parameters live under `input`.
pub(crate) const PARAMS: ParamTable = ParamTable {
    provider: ProviderId::Llama2,
    temperature: Mapping::Wire("temperature"),
    top_p: Mapping::Wire("top_p"),
    top_k: Mapping::Wire("top_k"),
    max_tokens: Mapping::Wire("max_new_tokens"),
    seed: Mapping::Wire("seed"),
    defaults: Sampling::NONE,
    options: &[],
    extras: Extras::Only(&["webhook", "webhook_events_filter"]),
};

pub(crate) const CAPABILITIES: Capabilities = Capabilities::STREAM;

/// The Replicate adapter.
#[derive(Clone)]
pub struct Replicate {
    http: HttpProvider,
    model: CompactString,
    params: MappedParams,
    system: Option<String>,
    timeout: Option<Duration>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(default)]
    status: String,
    #[serde(default)]
    output: Value,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    urls: Urls,
}

#[derive(Debug, Default, Deserialize)]
struct Urls {
    #[serde(default)]
    get: Option<String>,
    #[serde(default)]
    stream: Option<String>,
}

impl Prediction {
    fn is_terminal(&self) -> bool {
        matches!(self.status.as_str(), "succeeded" | "failed" | "canceled")
    }

    /// Output is a list of tokens for language models.
    fn into_text(self, raw: &str) -> Result<String> {
        if let Some(error) = self.error.filter(|e| !e.is_null()) {
            let message = error.as_str().map(str::to_owned).unwrap_or_else(|| error.to_string());
            return Err(Error::response(ProviderId::Llama2, None, message, raw));
        }
        if self.status != "succeeded" {
            return Err(Error::response(
                ProviderId::Llama2,
                None,
                format!("prediction {}", self.status),
                raw,
            ));
        }
        match self.output {
            Value::String(text) => Ok(text),
            Value::Array(tokens) => Ok(tokens.iter().filter_map(Value::as_str).collect()),
            _ => Err(Error::response(
                ProviderId::Llama2,
                None,
                "prediction has no output",
                raw,
            )),
        }
    }
}

impl Replicate {
    pub fn new(config: &ProviderConfig, creds: &Credentials<'_>, client: Client) -> Result<Self> {
        let params = PARAMS.apply(&config.sampling, &config.extra)?;
        let key = creds.key("REPLICATE_API_TOKEN")?;
        let base = config.endpoint.as_deref().unwrap_or(ENDPOINT);
        let http = HttpProvider::bearer(ProviderId::Llama2, client, &key, base)?
            .with_timeout(config.timeout);
        Ok(Self {
            http,
            model: config.model.clone().unwrap_or_else(|| DEFAULT_MODEL.into()),
            params,
            system: config.system_prompt.clone(),
            timeout: config.timeout.map(Duration::from_secs),
        })
    }

    /// The prediction URL and body for `request`.
    fn prediction(&self, request: &CompletionRequest, stream: bool) -> (String, Value) {
        let mut input = Map::new();
        input.insert("prompt".into(), request.prompt.as_str().into());
        if let Some(system) = request.system_or(self.system.as_deref()) {
            input.insert("system_prompt".into(), system.into());
        }
        input.extend(self.params.sampling.clone());

        let mut body = Map::new();
        let url = match self.model.split_once(':') {
            Some((_, version)) => {
                body.insert("version".into(), version.into());
                self.http.url("predictions")
            }
            None => self.http.url(&format!("models/{}/predictions", self.model)),
        };
        body.insert("input".into(), Value::Object(input));
        for (key, value) in &self.params.extra {
            body.insert(key.clone(), value.clone());
        }
        if stream {
            body.insert("stream".into(), true.into());
        }
        (url, Value::Object(body))
    }
}

impl Llm for Replicate {
    fn id(&self) -> ProviderId {
        ProviderId::Llama2
    }

    fn capabilities(&self) -> Capabilities {
        CAPABILITIES
    }

    async fn generate(&self, request: &CompletionRequest) -> Result<Generation> {
        let (url, body) = self.prediction(request, false);
        let started = tokio::time::Instant::now();
        let (mut prediction, mut raw): (Prediction, _) = self
            .http
            .send_raw(self.http.post(&url, &body).header("prefer", "wait"))
            .await?;

        while !prediction.is_terminal() {
            let Some(get) = prediction.urls.get.clone() else {
                return Err(Error::response(
                    ProviderId::Llama2,
                    None,
                    "pending prediction has no polling url",
                    raw,
                ));
            };
            if let Some(timeout) = self.timeout
                && started.elapsed() >= timeout
            {
                return Err(Error::response(
                    ProviderId::Llama2,
                    None,
                    format!("prediction still {} after {}s", prediction.status, timeout.as_secs()),
                    raw,
                ));
            }
            tracing::debug!(status = %prediction.status, "polling replicate prediction");
            tokio::time::sleep(POLL_INTERVAL).await;
            (prediction, raw) = self
                .http
                .send_raw::<Prediction>(self.http.request(Method::GET, &get))
                .await?;
        }
        prediction.into_text(&raw).map(Generation::text)
    }

    fn stream(&self, request: &CompletionRequest) -> TextStream {
        let (url, body) = self.prediction(request, true);
        let http = self.http.clone();
        Box::pin(async_stream::try_stream! {
            let (prediction, raw): (Prediction, _) = http.send_raw(http.post(&url, &body)).await?;
            let stream_url = prediction.urls.stream.ok_or_else(|| {
                Error::response(ProviderId::Llama2, None, "prediction has no stream url", raw)
            })?;
            let request = http
                .request(Method::GET, &stream_url)
                .header(reqwest::header::CACHE_CONTROL, "no-store");
            let mut events = stream::sse(ProviderId::Llama2, request, parse);
            while let Some(fragment) = futures_util::StreamExt::next(&mut events).await {
                yield fragment?;
            }
        })
    }
}

fn parse(event: stream::SseEvent) -> Result<Frame> {
    match event.event.as_deref() {
        Some("output") | None => Ok(Frame::Text(event.data)),
        Some("error") => {
            let message = crate::http::error_message(&event.data)
                .unwrap_or_else(|| event.data.clone());
            Err(Error::response(ProviderId::Llama2, None, message, event.data))
        }
        Some("done") => Ok(Frame::Done),
        Some(_) => Ok(Frame::Skip),
    }
}

pub fn build(config: &ProviderConfig, creds: &Credentials<'_>, client: Client) -> Result<Provider> {
    Replicate::new(config, creds, client).map(Provider::Replicate)
}
