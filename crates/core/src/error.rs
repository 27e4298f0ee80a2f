//! Error taxonomy shared by every adapter.
//!
//! Adapters translate provider-native failures into this fixed set and
//! never retry internally; the caller decides what to do with each kind.

use crate::ProviderId;
use compact_str::CompactString;
use std::time::Duration;

/// Result alias used across the adapter layer.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the adapter layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The provider identifier is not in the registry.
    #[error("unknown provider '{0}'")]
    UnknownProvider(CompactString),

    /// A required credential is missing, or the provider rejected it.
    #[error("authentication failed for {provider}: {message}")]
    Authentication {
        /// The provider that failed authentication.
        provider: ProviderId,
        /// What went wrong. Never contains the credential itself.
        message: String,
    },

    /// The provider signalled throttling.
    #[error("rate limited by {provider}: {message}")]
    RateLimit {
        /// The throttling provider.
        provider: ProviderId,
        /// The provider's message, passed through.
        message: String,
        /// Backoff hint from the `retry-after` header, if any.
        retry_after: Option<Duration>,
    },

    /// The provider answered with an error status or a malformed body.
    #[error("{provider} returned an invalid response: {message}")]
    ProviderResponse {
        /// The responding provider.
        provider: ProviderId,
        /// HTTP status, when the failure came with one.
        status: Option<u16>,
        /// A readable summary extracted from the payload.
        message: String,
        /// The raw payload, for diagnostics.
        payload: String,
    },

    /// A sampling parameter or capability is not available on the provider.
    #[error("{provider} does not support {parameter}")]
    UnsupportedParameter {
        /// The selected provider.
        provider: ProviderId,
        /// The offending parameter or feature.
        parameter: CompactString,
    },

    /// The configuration is invalid or could not be read.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A function descriptor could not be normalized.
    #[error("invalid function descriptor: {0}")]
    InvalidFunction(String),

    /// The request never produced a response.
    #[error("transport error talking to {provider}: {source}")]
    Transport {
        /// The provider being contacted.
        provider: ProviderId,
        /// The underlying I/O or HTTP failure.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    /// Missing or rejected credential.
    pub fn auth(provider: ProviderId, message: impl Into<String>) -> Self {
        Self::Authentication {
            provider,
            message: message.into(),
        }
    }

    /// Parameter or feature not available on `provider`.
    pub fn unsupported(provider: ProviderId, parameter: impl Into<CompactString>) -> Self {
        Self::UnsupportedParameter {
            provider,
            parameter: parameter.into(),
        }
    }

    /// Malformed or error response carrying the raw payload.
    pub fn response(
        provider: ProviderId,
        status: Option<u16>,
        message: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self::ProviderResponse {
            provider,
            status,
            message: message.into(),
            payload: payload.into(),
        }
    }

    /// Configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether the caller may reasonably retry after backing off.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimit { .. } | Self::Transport { .. })
    }
}
