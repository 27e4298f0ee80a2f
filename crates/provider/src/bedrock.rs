//! Amazon Bedrock through the Converse API.
//!
//! Authenticates with a Bedrock API key (bearer). The runtime endpoint is
//! regional; the model id is a path segment and may contain `:`.

use crate::{HttpProvider, Provider, stream};
use compact_str::CompactString;
use rcore::{
    Capabilities, CompletionRequest, Credentials, Error, Extras, FunctionCall, Generation, Llm,
    MappedParams, Mapping, ParamTable, ProviderConfig, ProviderId, Result, Sampling, TextStream,
};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value, json};

const DEFAULT_MODEL: &str = "amazon.titan-text-express-v1";

const DEFAULT_REGION: &str = "us-east-1";

/// Sampling parameters live under `inferenceConfig`.
pub(crate) const PARAMS: ParamTable = ParamTable {
    provider: ProviderId::AwsBedrock,
    temperature: Mapping::Wire("temperature"),
    top_p: Mapping::Wire("topP"),
    top_k: Mapping::Reject,
    max_tokens: Mapping::Wire("maxTokens"),
    seed: Mapping::Drop,
    defaults: Sampling::NONE,
    options: &["region"],
    extras: Extras::Only(&["additionalModelRequestFields", "guardrailConfig"]),
};

pub(crate) const CAPABILITIES: Capabilities = Capabilities {
    stream: false,
    functions: true,
};

/// The Bedrock adapter.
#[derive(Clone)]
pub struct Bedrock {
    http: HttpProvider,
    url: String,
    params: MappedParams,
    system: Option<String>,
}

#[derive(Deserialize)]
struct Response {
    output: Output,
}

#[derive(Deserialize)]
struct Output {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    #[serde(default)]
    content: Vec<Block>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Block {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    tool_use: Option<ToolUse>,
}

#[derive(Deserialize)]
struct ToolUse {
    name: CompactString,
    #[serde(default)]
    input: Value,
}

impl Bedrock {
    pub fn new(config: &ProviderConfig, creds: &Credentials<'_>, client: Client) -> Result<Self> {
        let params = PARAMS.apply(&config.sampling, &config.extra)?;
        let key = creds.key("AWS_BEARER_TOKEN_BEDROCK")?;
        let base = match &config.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => {
                let region = config
                    .option("region")
                    .map(str::to_owned)
                    .or_else(|| creds.optional("AWS_REGION"))
                    .unwrap_or_else(|| DEFAULT_REGION.to_owned());
                format!("https://bedrock-runtime.{region}.amazonaws.com")
            }
        };
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        let mut url = url::Url::parse(&base)
            .map_err(|e| Error::config(format!("invalid bedrock endpoint {base}: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| Error::config(format!("invalid bedrock endpoint {base}")))?
            .pop_if_empty()
            .extend(["model", model, "converse"]);

        let http = HttpProvider::bearer(ProviderId::AwsBedrock, client, &key, &base)?
            .with_timeout(config.timeout);
        Ok(Self {
            http,
            url: url.into(),
            params,
            system: config.system_prompt.clone(),
        })
    }

    fn body(&self, request: &CompletionRequest) -> Result<Value> {
        let mut body = Map::new();
        body.insert(
            "messages".into(),
            json!([{ "role": "user", "content": [{ "text": request.prompt }] }]),
        );
        if let Some(system) = request.system_or(self.system.as_deref()) {
            body.insert("system".into(), json!([{ "text": system }]));
        }
        if !self.params.sampling.is_empty() {
            body.insert(
                "inferenceConfig".into(),
                Value::Object(self.params.sampling.clone()),
            );
        }
        for (key, value) in &self.params.extra {
            body.insert(key.clone(), value.clone());
        }
        if !request.functions.is_empty() {
            let tools = request
                .functions
                .iter()
                .map(|f| {
                    let spec = f.normalize()?;
                    Ok(json!({
                        "toolSpec": {
                            "name": spec.name,
                            "description": spec.description,
                            "inputSchema": { "json": spec.parameters },
                        }
                    }))
                })
                .collect::<Result<Vec<_>>>()?;
            body.insert("toolConfig".into(), json!({ "tools": tools }));
        }
        Ok(Value::Object(body))
    }
}

impl Llm for Bedrock {
    fn id(&self) -> ProviderId {
        ProviderId::AwsBedrock
    }

    fn capabilities(&self) -> Capabilities {
        CAPABILITIES
    }

    async fn generate(&self, request: &CompletionRequest) -> Result<Generation> {
        let body = self.body(request)?;
        let response: Response = self.http.send(self.http.post(&self.url, &body)).await?;
        let mut generation = Generation::default();
        for block in response.output.message.content {
            if let Some(text) = block.text {
                generation.text.push_str(&text);
            }
            if let Some(tool) = block.tool_use {
                generation.calls.push(FunctionCall::parse(tool.name, &tool.input)?);
            }
        }
        Ok(generation)
    }

    /// Converse streaming uses the binary event-stream encoding.
    fn stream(&self, _request: &CompletionRequest) -> TextStream {
        stream::fail(Error::unsupported(ProviderId::AwsBedrock, "stream"))
    }
}

pub fn build(config: &ProviderConfig, creds: &Credentials<'_>, client: Client) -> Result<Provider> {
    Bedrock::new(config, creds, client).map(Provider::Bedrock)
}
