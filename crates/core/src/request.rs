//! Completion requests and results.

use crate::{FunctionCall, FunctionDescriptor, Result};
use futures_core::Stream;
use futures_util::StreamExt;
use std::{fmt, pin::Pin};

/// A lazy, finite, non-restartable sequence of text fragments.
///
/// Dropping the stream releases the underlying connection.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send + 'static>>;

/// A fully resolved prompt with optional callable functions.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub prompt: String,
    /// Overrides the configured system prompt.
    pub system: Option<String>,
    pub functions: Vec<FunctionDescriptor>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_function(mut self, function: impl Into<FunctionDescriptor>) -> Self {
        self.functions.push(function.into());
        self
    }

    /// The system prompt to send, preferring the request's own.
    pub fn system_or<'a>(&'a self, configured: Option<&'a str>) -> Option<&'a str> {
        self.system.as_deref().or(configured)
    }
}

/// A materialized completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generation {
    pub text: String,
    pub calls: Vec<FunctionCall>,
}

impl Generation {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            calls: Vec::new(),
        }
    }
}

/// What a completion call hands back.
pub enum CompletionResult {
    /// The complete text.
    Text(String),
    /// The model asked for one or more function calls.
    Calls {
        text: String,
        calls: Vec<FunctionCall>,
    },
    /// Text fragments, drained in order.
    Stream(TextStream),
}

impl CompletionResult {
    /// Drain any shape into a single string. Function calls are rendered
    /// as one JSON object per line after the text.
    pub async fn collect(self) -> Result<String> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Calls { mut text, calls } => {
                for call in calls {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(&call.to_string());
                }
                Ok(text)
            }
            Self::Stream(mut stream) => {
                let mut text = String::new();
                while let Some(fragment) = stream.next().await {
                    text.push_str(&fragment?);
                }
                Ok(text)
            }
        }
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }
}

impl From<Generation> for CompletionResult {
    fn from(generation: Generation) -> Self {
        if generation.calls.is_empty() {
            Self::Text(generation.text)
        } else {
            Self::Calls {
                text: generation.text,
                calls: generation.calls,
            }
        }
    }
}

impl fmt::Debug for CompletionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Calls { text, calls } => f
                .debug_struct("Calls")
                .field("text", text)
                .field("calls", calls)
                .finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}
