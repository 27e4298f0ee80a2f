//! Declarative configuration.
//!
//! The application file carries an `llm` section and an optional sibling
//! `embedder` section, each shaped `{ provider, config: {...} }`:
//!
//! ```yaml
//! llm:
//!   provider: openai
//!   config:
//!     model: gpt-3.5-turbo
//!     temperature: 0.5
//!     stream: false
//! ```
//!
//! String values may reference credential variables as `${VAR}`.

use crate::{CredentialSource, Error, ProviderId, Result, Sampling, Secret};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    collections::BTreeMap,
    hash::{DefaultHasher, Hash, Hasher},
    path::Path,
};

/// The application configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// The completion provider.
    pub llm: Section,
    /// The embedding provider, kept opaque.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedder: Option<Section>,
}

/// One `{ provider, config }` record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub provider: String,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl AppConfig {
    /// Load from a YAML, TOML or JSON file, chosen by extension.
    pub fn load(path: impl AsRef<Path>, source: &dyn CredentialSource) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("failed to read {}: {e}", path.display())))?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        Self::parse(&text, ext, source)
    }

    /// Parse `text` in the format named by `ext` (`yaml`, `yml`, `toml`
    /// or `json`), then expand `${VAR}` references in string values.
    pub fn parse(text: &str, ext: &str, source: &dyn CredentialSource) -> Result<Self> {
        let mut value: Value = match ext {
            "yaml" | "yml" => serde_yml::from_str(text).map_err(|e| Error::config(e.to_string()))?,
            "toml" => toml::from_str(text).map_err(|e| Error::config(e.to_string()))?,
            "json" => serde_json::from_str(text).map_err(|e| Error::config(e.to_string()))?,
            other => {
                return Err(Error::config(format!(
                    "unsupported config format '{other}', expected yaml, toml or json"
                )));
            }
        };
        expand_value(&mut value, source);
        serde_json::from_value(value).map_err(|e| Error::config(e.to_string()))
    }

    /// The validated completion provider configuration.
    pub fn llm(&self) -> Result<ProviderConfig> {
        ProviderConfig::from_section(&self.llm)
    }
}

/// A validated, immutable per-provider configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderConfig {
    pub provider: ProviderId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<CompactString>,
    #[serde(flatten)]
    pub sampling: Sampling,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip)]
    pub api_key: Option<Secret>,
    /// Per-request timeout in seconds. No timeout when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Provider-specific options and passthrough body keys.
    pub extra: BTreeMap<String, Value>,
}

#[derive(Deserialize)]
struct RawConfig {
    model: Option<CompactString>,
    temperature: Option<f64>,
    top_p: Option<f64>,
    top_k: Option<u32>,
    max_tokens: Option<u32>,
    seed: Option<u64>,
    #[serde(default)]
    stream: bool,
    #[serde(alias = "base_url")]
    endpoint: Option<String>,
    api_key: Option<Secret>,
    timeout: Option<u64>,
    system_prompt: Option<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

impl ProviderConfig {
    /// A configuration with every optional field unset.
    pub fn new(provider: ProviderId) -> Self {
        Self {
            provider,
            model: None,
            sampling: Sampling::NONE,
            stream: false,
            endpoint: None,
            api_key: None,
            timeout: None,
            system_prompt: None,
            extra: BTreeMap::new(),
        }
    }

    /// Build from a declarative section. The identifier is checked first.
    pub fn from_section(section: &Section) -> Result<Self> {
        let provider: ProviderId = section.provider.parse()?;
        let raw: RawConfig = serde_json::from_value(Value::Object(section.config.clone()))
            .map_err(|e| Error::config(format!("{provider}: {e}")))?;

        let config = Self {
            provider,
            model: raw.model,
            sampling: Sampling {
                temperature: raw.temperature,
                top_p: raw.top_p,
                top_k: raw.top_k,
                max_tokens: raw.max_tokens,
                seed: raw.seed,
            },
            stream: raw.stream,
            endpoint: raw.endpoint,
            api_key: raw.api_key,
            timeout: raw.timeout,
            system_prompt: raw.system_prompt,
            extra: raw.extra,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_model(mut self, model: impl Into<CompactString>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(Secret::new(key));
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Some(secs);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Check sampling ranges and the endpoint override.
    pub fn validate(&self) -> Result<()> {
        self.sampling.validate()?;
        if let Some(endpoint) = &self.endpoint {
            let url = url::Url::parse(endpoint)
                .map_err(|e| Error::config(format!("invalid endpoint '{endpoint}': {e}")))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::config(format!(
                    "endpoint '{endpoint}' must be an http(s) URL"
                )));
            }
        }
        if self.timeout == Some(0) {
            return Err(Error::config("timeout must be >= 1 second"));
        }
        Ok(())
    }

    /// A string option from `extra`.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    /// Identity used to cache adapters. Two configs share an adapter only
    /// when every field, the credential included, is equal; the credential
    /// contributes a hash, not its value.
    pub fn fingerprint(&self) -> Result<String> {
        let mut key = serde_json::to_string(self)
            .map_err(|e| Error::config(format!("failed to fingerprint config: {e}")))?;
        if let Some(secret) = &self.api_key {
            let mut hasher = DefaultHasher::new();
            secret.expose().hash(&mut hasher);
            key.push_str(&format!("#{:016x}", hasher.finish()));
        }
        Ok(key)
    }
}

/// Expand `${VAR}` patterns through `source`. Unset variables expand to
/// an empty string; an unterminated `${` is kept as written.
pub fn expand_vars(input: &str, source: &dyn CredentialSource) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let name_start = &rest[start + 2..];
        let Some(end) = name_start.find('}') else {
            result.push_str(&rest[start..]);
            return result;
        };
        if let Some(val) = source.var(&name_start[..end]) {
            result.push_str(&val);
        }
        rest = &name_start[end + 1..];
    }

    result.push_str(rest);
    result
}

fn expand_value(value: &mut Value, source: &dyn CredentialSource) {
    match value {
        Value::String(s) if s.contains("${") => *s = expand_vars(s, source),
        Value::Array(items) => items.iter_mut().for_each(|v| expand_value(v, source)),
        Value::Object(map) => map.values_mut().for_each(|v| expand_value(v, source)),
        _ => {}
    }
}
