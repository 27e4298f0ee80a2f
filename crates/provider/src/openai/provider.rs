//! Llm implementation for the OpenAI family.

use super::{
    OpenAi,
    request::{Chunk, Completion},
};
use crate::{
    http,
    stream::{self, Frame},
};
use rcore::{
    Capabilities, CompletionRequest, Error, Generation, Llm, ProviderId, Result, TextStream,
};

impl Llm for OpenAi {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn generate(&self, request: &CompletionRequest) -> Result<Generation> {
        let body = self.body(request, false)?;
        let (completion, raw): (Completion, _) =
            self.http.send_raw(self.http.post(&self.url, &body)).await?;
        completion.into_generation(self.id, &raw)
    }

    fn stream(&self, request: &CompletionRequest) -> TextStream {
        let body = match self.body(request, true) {
            Ok(body) => body,
            Err(e) => return stream::fail(e),
        };
        let provider = self.id;
        let request = self.http.post(&self.url, &body);
        stream::sse(provider, request, move |event| parse(provider, &event.data))
    }
}

fn parse(provider: ProviderId, data: &str) -> Result<Frame> {
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(Frame::Done);
    }
    let chunk: Chunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            tracing::warn!(%provider, "failed to parse chunk: {e}, data: {data}");
            return Ok(Frame::Skip);
        }
    };
    if let Some(error) = chunk.error {
        let message = http::error_message(&serde_json::json!({ "error": error }).to_string())
            .unwrap_or_else(|| error.to_string());
        return Err(Error::response(provider, None, message, data));
    }
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .map_or(Frame::Skip, Frame::Text))
}
