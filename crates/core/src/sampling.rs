//! Sampling parameters and per-provider mapping tables.
//!
//! Every adapter declares a static [`ParamTable`]. The table is applied
//! once, when the adapter is constructed, and the mapped result is stored
//! on the adapter, so an unsupported parameter fails before any request
//! is sent.

use crate::{Error, ProviderId, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Provider-neutral sampling parameters. Unset fields fall back to the
/// provider's own defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Sampling {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Sampling {
    /// No parameters set.
    pub const NONE: Self = Self {
        temperature: None,
        top_p: None,
        top_k: None,
        max_tokens: None,
        seed: None,
    };

    /// The value of `param`, if set.
    pub fn get(&self, param: Param) -> Option<Value> {
        match param {
            Param::Temperature => self.temperature.map(Value::from),
            Param::TopP => self.top_p.map(Value::from),
            Param::TopK => self.top_k.map(Value::from),
            Param::MaxTokens => self.max_tokens.map(Value::from),
            Param::Seed => self.seed.map(Value::from),
        }
    }

    /// Check the value ranges every provider agrees on.
    pub fn validate(&self) -> Result<()> {
        if let Some(t) = self.temperature
            && !(t.is_finite() && t >= 0.0)
        {
            return Err(Error::config(format!("temperature must be >= 0, got {t}")));
        }
        if let Some(p) = self.top_p
            && !(0.0..=1.0).contains(&p)
        {
            return Err(Error::config(format!("top_p must be within [0, 1], got {p}")));
        }
        if self.top_k == Some(0) {
            return Err(Error::config("top_k must be >= 1"));
        }
        if self.max_tokens == Some(0) {
            return Err(Error::config("max_tokens must be >= 1"));
        }
        Ok(())
    }

    fn or(self, defaults: Sampling) -> Self {
        Self {
            temperature: self.temperature.or(defaults.temperature),
            top_p: self.top_p.or(defaults.top_p),
            top_k: self.top_k.or(defaults.top_k),
            max_tokens: self.max_tokens.or(defaults.max_tokens),
            seed: self.seed.or(defaults.seed),
        }
    }
}

/// A sampling parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    Temperature,
    TopP,
    TopK,
    MaxTokens,
    Seed,
}

impl Param {
    pub const ALL: [Param; 5] = [
        Self::Temperature,
        Self::TopP,
        Self::TopK,
        Self::MaxTokens,
        Self::Seed,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::TopP => "top_p",
            Self::TopK => "top_k",
            Self::MaxTokens => "max_tokens",
            Self::Seed => "seed",
        }
    }
}

/// How a provider handles one sampling parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mapping {
    /// Sent under the given wire name.
    Wire(&'static str),
    /// Accepted and silently dropped.
    Drop,
    /// Refused at construction.
    Reject,
}

/// Which keys of the open `extra` mapping reach the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extras {
    /// Anything, for self-hosted servers with open-ended options.
    Any,
    /// Only the listed top-level body keys.
    Only(&'static [&'static str]),
}

/// A provider's parameter mapping table.
#[derive(Debug, Clone, Copy)]
pub struct ParamTable {
    pub provider: ProviderId,
    pub temperature: Mapping,
    pub top_p: Mapping,
    pub top_k: Mapping,
    pub max_tokens: Mapping,
    pub seed: Mapping,
    /// Values used when the configuration leaves a parameter unset.
    pub defaults: Sampling,
    /// `extra` keys the adapter consumes itself (deployment, region, ...).
    pub options: &'static [&'static str],
    pub extras: Extras,
}

/// Sampling parameters and passthrough extras after mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedParams {
    /// Sampling values keyed by wire name.
    pub sampling: Map<String, Value>,
    /// Passthrough body keys.
    pub extra: Map<String, Value>,
}

impl MappedParams {
    /// Merge the sampling values and extras into `body`.
    pub fn merge_into(&self, body: &mut Map<String, Value>) {
        for (k, v) in self.sampling.iter().chain(self.extra.iter()) {
            body.insert(k.clone(), v.clone());
        }
    }
}

impl ParamTable {
    /// An OpenAI-shaped table: every parameter under its own name.
    pub const fn passthrough(provider: ProviderId, extras: Extras) -> Self {
        Self {
            provider,
            temperature: Mapping::Wire("temperature"),
            top_p: Mapping::Wire("top_p"),
            top_k: Mapping::Wire("top_k"),
            max_tokens: Mapping::Wire("max_tokens"),
            seed: Mapping::Wire("seed"),
            defaults: Sampling::NONE,
            options: &[],
            extras,
        }
    }

    pub fn mapping(&self, param: Param) -> Mapping {
        match param {
            Param::Temperature => self.temperature,
            Param::TopP => self.top_p,
            Param::TopK => self.top_k,
            Param::MaxTokens => self.max_tokens,
            Param::Seed => self.seed,
        }
    }

    /// Validate and map `sampling` and `extra` for this provider.
    pub fn apply(
        &self,
        sampling: &Sampling,
        extra: &BTreeMap<String, Value>,
    ) -> Result<MappedParams> {
        sampling.validate()?;
        let sampling = sampling.or(self.defaults);

        let mut mapped = MappedParams::default();
        for param in Param::ALL {
            let Some(value) = sampling.get(param) else {
                continue;
            };
            match self.mapping(param) {
                Mapping::Wire(name) => {
                    mapped.sampling.insert(name.to_owned(), value);
                }
                Mapping::Drop => {
                    tracing::debug!(
                        provider = %self.provider,
                        param = param.as_str(),
                        "dropping parameter the provider does not support"
                    );
                }
                Mapping::Reject => {
                    return Err(Error::unsupported(self.provider, param.as_str()));
                }
            }
        }

        for (key, value) in extra {
            if self.options.contains(&key.as_str()) {
                continue;
            }
            let allowed = match self.extras {
                Extras::Any => true,
                Extras::Only(keys) => keys.contains(&key.as_str()),
            };
            if !allowed {
                return Err(Error::unsupported(self.provider, key.as_str()));
            }
            mapped.extra.insert(key.clone(), value.clone());
        }

        Ok(mapped)
    }
}
