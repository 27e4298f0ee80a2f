//! Llm implementation for Anthropic.

use super::{Anthropic, CAPABILITIES, stream::Event};
use crate::stream::{self, Frame};
use compact_str::CompactString;
use rcore::{
    Capabilities, CompletionRequest, FunctionCall, Generation, Llm, ProviderId, Result,
    TextStream,
};
use serde::Deserialize;
use serde_json::{Map, Value, json};

/// Raw Anthropic non-streaming response.
#[derive(Deserialize)]
struct Message {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse { name: CompactString, input: Value },
    #[serde(other)]
    Other,
}

impl Anthropic {
    fn body(&self, request: &CompletionRequest, stream: bool) -> Result<Value> {
        let mut body = Map::new();
        body.insert("model".into(), self.model.as_str().into());
        body.insert(
            "messages".into(),
            json!([{ "role": "user", "content": request.prompt }]),
        );
        if let Some(system) = request.system_or(self.system.as_deref()) {
            body.insert("system".into(), system.into());
        }
        self.params.merge_into(&mut body);
        if !request.functions.is_empty() {
            let tools = request
                .functions
                .iter()
                .map(|f| {
                    let spec = f.normalize()?;
                    Ok(json!({
                        "name": spec.name,
                        "description": spec.description,
                        "input_schema": spec.parameters,
                    }))
                })
                .collect::<Result<Vec<_>>>()?;
            body.insert("tools".into(), tools.into());
        }
        if stream {
            body.insert("stream".into(), true.into());
        }
        Ok(Value::Object(body))
    }
}

impl Llm for Anthropic {
    fn id(&self) -> ProviderId {
        ProviderId::Anthropic
    }

    fn capabilities(&self) -> Capabilities {
        CAPABILITIES
    }

    async fn generate(&self, request: &CompletionRequest) -> Result<Generation> {
        let body = self.body(request, false)?;
        let message: Message = self.http.send(self.http.post(&self.url, &body)).await?;

        let mut generation = Generation::default();
        for block in message.content {
            match block {
                ContentBlock::Text { text } => generation.text.push_str(&text),
                ContentBlock::ToolUse { name, input } => {
                    generation.calls.push(FunctionCall::parse(name, &input)?)
                }
                ContentBlock::Other => {}
            }
        }
        Ok(generation)
    }

    fn stream(&self, request: &CompletionRequest) -> TextStream {
        let body = match self.body(request, true) {
            Ok(body) => body,
            Err(e) => return stream::fail(e),
        };
        let request = self.http.post(&self.url, &body);
        stream::sse(ProviderId::Anthropic, request, |event| {
            if event.data.is_empty() {
                return Ok(Frame::Skip);
            }
            Event::parse(&event.data)
        })
    }
}
