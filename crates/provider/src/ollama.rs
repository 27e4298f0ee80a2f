//! Ollama `/api/chat`.

use crate::{
    HttpProvider, Provider,
    stream::{self, Frame},
};
use compact_str::CompactString;
use rcore::{
    Capabilities, CompletionRequest, Credentials, Error, Extras, FunctionCall, Generation, Llm,
    MappedParams, Mapping, ParamTable, ProviderConfig, ProviderId, Result, Sampling, TextStream,
};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value, json};

/// The default local Ollama server.
pub const ENDPOINT: &str = "http://localhost:11434";

const DEFAULT_MODEL: &str = "llama3";

/// Sampling parameters live under `options`.
pub(crate) const PARAMS: ParamTable = ParamTable {
    provider: ProviderId::Ollama,
    temperature: Mapping::Wire("temperature"),
    top_p: Mapping::Wire("top_p"),
    top_k: Mapping::Wire("top_k"),
    max_tokens: Mapping::Wire("num_predict"),
    seed: Mapping::Wire("seed"),
    defaults: Sampling::NONE,
    options: &[],
    extras: Extras::Only(&["format", "keep_alive"]),
};

pub(crate) const CAPABILITIES: Capabilities = Capabilities::ALL;

/// The Ollama adapter.
#[derive(Clone)]
pub struct Ollama {
    http: HttpProvider,
    url: String,
    model: CompactString,
    params: MappedParams,
    system: Option<String>,
}

#[derive(Deserialize)]
struct Response {
    #[serde(default)]
    message: Option<Message>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct Message {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Deserialize)]
struct ToolCall {
    function: Call,
}

#[derive(Deserialize)]
struct Call {
    name: CompactString,
    #[serde(default)]
    arguments: Value,
}

impl Ollama {
    pub fn new(config: &ProviderConfig, creds: &Credentials<'_>, client: Client) -> Result<Self> {
        let params = PARAMS.apply(&config.sampling, &config.extra)?;
        let base = match &config.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => creds
                .optional("OLLAMA_HOST")
                .map(|host| host_url(&host))
                .unwrap_or_else(|| ENDPOINT.to_owned()),
        };
        let http =
            HttpProvider::no_auth(ProviderId::Ollama, client, &base).with_timeout(config.timeout);
        Ok(Self {
            url: http.url("api/chat"),
            http,
            model: config.model.clone().unwrap_or_else(|| DEFAULT_MODEL.into()),
            params,
            system: config.system_prompt.clone(),
        })
    }

    fn body(&self, request: &CompletionRequest, stream: bool) -> Result<Value> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system_or(self.system.as_deref()) {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": request.prompt }));

        let mut body = Map::new();
        body.insert("model".into(), self.model.as_str().into());
        body.insert("messages".into(), messages.into());
        body.insert("stream".into(), stream.into());
        if !self.params.sampling.is_empty() {
            body.insert("options".into(), Value::Object(self.params.sampling.clone()));
        }
        for (key, value) in &self.params.extra {
            body.insert(key.clone(), value.clone());
        }
        if !request.functions.is_empty() {
            let tools = request
                .functions
                .iter()
                .map(|f| Ok(json!({ "type": "function", "function": f.normalize()? })))
                .collect::<Result<Vec<_>>>()?;
            body.insert("tools".into(), tools.into());
        }
        Ok(Value::Object(body))
    }
}

/// `OLLAMA_HOST` may omit the scheme (`0.0.0.0:11434`).
fn host_url(host: &str) -> String {
    if host.contains("://") {
        host.to_owned()
    } else {
        format!("http://{host}")
    }
}

impl Llm for Ollama {
    fn id(&self) -> ProviderId {
        ProviderId::Ollama
    }

    fn capabilities(&self) -> Capabilities {
        CAPABILITIES
    }

    async fn generate(&self, request: &CompletionRequest) -> Result<Generation> {
        let body = self.body(request, false)?;
        let (response, raw): (Response, _) =
            self.http.send_raw(self.http.post(&self.url, &body)).await?;
        if let Some(error) = response.error {
            return Err(Error::response(ProviderId::Ollama, None, error, raw));
        }
        let Some(message) = response.message else {
            return Err(Error::response(
                ProviderId::Ollama,
                None,
                "response has no message",
                raw,
            ));
        };
        let calls = message
            .tool_calls
            .into_iter()
            .map(|call| FunctionCall::parse(call.function.name, &call.function.arguments))
            .collect::<Result<Vec<_>>>()?;
        Ok(Generation {
            text: message.content,
            calls,
        })
    }

    fn stream(&self, request: &CompletionRequest) -> TextStream {
        let body = match self.body(request, true) {
            Ok(body) => body,
            Err(e) => return stream::fail(e),
        };
        stream::ndjson(ProviderId::Ollama, self.http.post(&self.url, &body), parse)
    }
}

fn parse(line: String) -> Result<Frame> {
    let response: Response = match serde_json::from_str(&line) {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("failed to parse ollama chunk: {e}, data: {line}");
            return Ok(Frame::Skip);
        }
    };
    if let Some(error) = response.error {
        return Err(Error::response(ProviderId::Ollama, None, error, line));
    }
    let text = response.message.map(|m| m.content).unwrap_or_default();
    if response.done && text.is_empty() {
        return Ok(Frame::Done);
    }
    Ok(Frame::Text(text))
}

pub fn build(config: &ProviderConfig, creds: &Credentials<'_>, client: Client) -> Result<Provider> {
    Ollama::new(config, creds, client).map(Provider::Ollama)
}

#[cfg(test)]
mod tests {
    use super::host_url;

    #[test]
    fn host_without_scheme() {
        assert_eq!(host_url("0.0.0.0:11434"), "http://0.0.0.0:11434");
        assert_eq!(host_url("https://ollama.local"), "https://ollama.local");
    }
}
