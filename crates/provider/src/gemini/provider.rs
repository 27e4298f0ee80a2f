//! Llm implementation for Gemini.

use super::{CAPABILITIES, Gemini};
use crate::{
    http,
    stream::{self, Frame},
};
use compact_str::CompactString;
use rcore::{
    Capabilities, CompletionRequest, Error, FunctionCall, Generation, Llm, ProviderId, Result,
    TextStream,
};
use serde::Deserialize;
use serde_json::{Map, Value, json};

/// A `generateContent` response, whole or streamed.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Response {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    function_call: Option<Call>,
}

#[derive(Deserialize)]
struct Call {
    name: CompactString,
    #[serde(default)]
    args: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl Response {
    /// Fail on error payloads and blocked prompts.
    fn check(&self, provider: ProviderId, raw: &str) -> Result<()> {
        if let Some(error) = &self.error {
            let message = http::error_message(&json!({ "error": error }).to_string())
                .unwrap_or_else(|| error.to_string());
            return Err(Error::response(provider, None, message, raw));
        }
        if self.candidates.is_empty()
            && let Some(reason) = self
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.as_deref())
        {
            return Err(Error::response(
                provider,
                None,
                format!("prompt blocked: {reason}"),
                raw,
            ));
        }
        Ok(())
    }

    fn into_generation(self) -> Result<Generation> {
        let mut generation = Generation::default();
        let parts = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default();
        for part in parts {
            if let Some(text) = part.text {
                generation.text.push_str(&text);
            }
            if let Some(call) = part.function_call {
                generation.calls.push(FunctionCall::parse(call.name, &call.args)?);
            }
        }
        Ok(generation)
    }
}

impl Gemini {
    fn body(&self, request: &CompletionRequest) -> Result<Value> {
        let mut body = Map::new();
        body.insert(
            "contents".into(),
            json!([{ "role": "user", "parts": [{ "text": request.prompt }] }]),
        );
        if let Some(system) = request.system_or(self.system.as_deref()) {
            body.insert(
                "systemInstruction".into(),
                json!({ "parts": [{ "text": system }] }),
            );
        }
        if !self.params.sampling.is_empty() {
            body.insert(
                "generationConfig".into(),
                Value::Object(self.params.sampling.clone()),
            );
        }
        for (key, value) in &self.params.extra {
            body.insert(key.clone(), value.clone());
        }
        if !request.functions.is_empty() {
            let declarations = request
                .functions
                .iter()
                .map(|f| {
                    let spec = f.normalize()?;
                    Ok(json!({
                        "name": spec.name,
                        "description": spec.description,
                        "parameters": openapi(spec.parameters),
                    }))
                })
                .collect::<Result<Vec<_>>>()?;
            body.insert(
                "tools".into(),
                json!([{ "functionDeclarations": declarations }]),
            );
        }
        Ok(Value::Object(body))
    }
}

/// Gemini schemas are OpenAPI objects with upper-case type names.
fn openapi(mut schema: Value) -> Value {
    if let Some(map) = schema.as_object_mut() {
        if let Some(Value::String(ty)) = map.get_mut("type") {
            *ty = ty.to_uppercase();
        }
        if let Some(items) = map.remove("items") {
            map.insert("items".into(), openapi(items));
        }
        if let Some(Value::Object(props)) = map.get_mut("properties") {
            for prop in props.values_mut() {
                *prop = openapi(prop.take());
            }
        }
    }
    schema
}

impl Llm for Gemini {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn capabilities(&self) -> Capabilities {
        CAPABILITIES
    }

    async fn generate(&self, request: &CompletionRequest) -> Result<Generation> {
        let body = self.body(request)?;
        let (response, raw): (Response, _) = self
            .http
            .send_raw(self.http.post(&self.url("generateContent"), &body))
            .await?;
        response.check(self.id, &raw)?;
        if response.candidates.is_empty() {
            return Err(Error::response(
                self.id,
                None,
                "response has no candidates",
                raw,
            ));
        }
        response.into_generation()
    }

    fn stream(&self, request: &CompletionRequest) -> TextStream {
        let body = match self.body(request) {
            Ok(body) => body,
            Err(e) => return stream::fail(e),
        };
        let provider = self.id;
        let request = self
            .http
            .post(&self.url("streamGenerateContent"), &body)
            .query(&[("alt", "sse")]);
        stream::sse(provider, request, move |event| {
            if event.data.trim().is_empty() {
                return Ok(Frame::Skip);
            }
            let response: Response = match serde_json::from_str(&event.data) {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(%provider, "failed to parse chunk: {e}, data: {}", event.data);
                    return Ok(Frame::Skip);
                }
            };
            response.check(provider, &event.data)?;
            let generation = response.into_generation()?;
            Ok(Frame::Text(generation.text))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::openapi;
    use serde_json::json;

    #[test]
    fn openapi_uppercases_types() {
        let schema = json!({
            "type": "object",
            "properties": {
                "tags": {"type": "array", "items": {"type": "string"}},
                "days": {"type": "integer"}
            },
            "required": ["days"]
        });
        assert_eq!(
            openapi(schema),
            json!({
                "type": "OBJECT",
                "properties": {
                    "tags": {"type": "ARRAY", "items": {"type": "STRING"}},
                    "days": {"type": "INTEGER"}
                },
                "required": ["days"]
            })
        );
    }
}
