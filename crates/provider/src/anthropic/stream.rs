//! Anthropic streaming events.
//!
//! Text arrives as `content_block_delta` events carrying a `text_delta`;
//! `message_stop` ends the message and `error` reports an in-band failure.

use crate::stream::Frame;
use rcore::{Error, ProviderId, Result};
use serde::Deserialize;

/// A streamed event.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "content_block_delta")]
    ContentBlockDelta { delta: BlockDelta },
    #[serde(rename = "message_stop")]
    MessageStop,
    #[serde(rename = "error")]
    Error { error: ErrorBody },
    /// `message_start`, `ping`, `content_block_start`, ...
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum BlockDelta {
    #[serde(rename = "text_delta")]
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub message: String,
}

impl Event {
    /// Parse one SSE data payload.
    pub fn parse(data: &str) -> Result<Frame> {
        let event = match serde_json::from_str::<Event>(data) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("failed to parse anthropic event: {e}, data: {data}");
                return Ok(Frame::Skip);
            }
        };
        Ok(match event {
            Event::ContentBlockDelta {
                delta: BlockDelta::TextDelta { text },
            } => Frame::Text(text),
            Event::MessageStop => Frame::Done,
            Event::Error { error } => {
                let provider = ProviderId::Anthropic;
                return Err(match error.kind.as_str() {
                    "rate_limit_error" | "overloaded_error" => Error::RateLimit {
                        provider,
                        message: error.message,
                        retry_after: None,
                    },
                    "authentication_error" | "permission_error" => {
                        Error::auth(provider, error.message)
                    }
                    _ => Error::response(provider, None, error.message, data),
                });
            }
            _ => Frame::Skip,
        })
    }
}
