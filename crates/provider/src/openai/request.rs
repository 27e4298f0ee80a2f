//! OpenAI chat completions wire types.

use super::OpenAi;
use compact_str::CompactString;
use rcore::{CompletionRequest, FunctionCall, Generation, ProviderId, Result};
use serde::Deserialize;
use serde_json::{Map, Value, json};

impl OpenAi {
    /// The request body for `request`.
    pub(crate) fn body(&self, request: &CompletionRequest, stream: bool) -> Result<Value> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system_or(self.system.as_deref()) {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": request.prompt }));

        let mut body = Map::new();
        if let Some(model) = &self.model {
            body.insert("model".into(), model.as_str().into());
        }
        body.insert("messages".into(), messages.into());
        self.params.merge_into(&mut body);
        if !request.functions.is_empty() {
            let tools = request
                .functions
                .iter()
                .map(|f| Ok(json!({ "type": "function", "function": f.normalize()? })))
                .collect::<Result<Vec<_>>>()?;
            body.insert("tools".into(), tools.into());
        }
        if stream {
            body.insert("stream".into(), true.into());
        }
        Ok(Value::Object(body))
    }
}

/// A non-streaming chat completion.
#[derive(Deserialize)]
pub(crate) struct Completion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Deserialize)]
struct ToolCall {
    function: FunctionPayload,
}

#[derive(Deserialize)]
struct FunctionPayload {
    name: CompactString,
    #[serde(default)]
    arguments: Value,
}

impl Completion {
    pub(crate) fn into_generation(self, provider: ProviderId, raw: &str) -> Result<Generation> {
        let Some(choice) = self.choices.into_iter().next() else {
            let message = crate::http::error_message(raw)
                .unwrap_or_else(|| "response has no choices".to_owned());
            return Err(rcore::Error::response(provider, None, message, raw));
        };
        let calls = choice
            .message
            .tool_calls
            .into_iter()
            .map(|call| FunctionCall::parse(call.function.name, &call.function.arguments))
            .collect::<Result<Vec<_>>>()?;
        Ok(Generation {
            text: choice.message.content.unwrap_or_default(),
            calls,
        })
    }
}

/// One streamed chunk.
#[derive(Deserialize)]
pub(crate) struct Chunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Deserialize)]
pub(crate) struct ChunkChoice {
    #[serde(default)]
    pub delta: Delta,
}

#[derive(Default, Deserialize)]
pub(crate) struct Delta {
    #[serde(default)]
    pub content: Option<String>,
}
