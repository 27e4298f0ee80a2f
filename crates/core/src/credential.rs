//! Credential resolution.
//!
//! Adapters never read the process environment directly. They resolve
//! named variables through a [`CredentialSource`], which is the real
//! environment in production and an in-memory map in tests.

use crate::{Error, ProviderId, Result};
use std::{collections::BTreeMap, fmt};

/// A source of named credential variables.
pub trait CredentialSource: Send + Sync {
    /// Look up `name`, returning `None` when it is unset.
    fn var(&self, name: &str) -> Option<String>;
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct Env;

impl CredentialSource for Env {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// A fixed in-memory set of variables.
#[derive(Clone, Default)]
pub struct StaticSource(BTreeMap<String, String>);

impl StaticSource {
    /// An empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StaticSource {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl CredentialSource for StaticSource {
    fn var(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}

impl fmt::Debug for StaticSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

/// Two sources, the first one winning.
pub struct Layered<A, B>(pub A, pub B);

impl<A: CredentialSource, B: CredentialSource> CredentialSource for Layered<A, B> {
    fn var(&self, name: &str) -> Option<String> {
        self.0.var(name).or_else(|| self.1.var(name))
    }
}

/// A credential value. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap a raw value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value, for building request headers.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl<'de> serde::Deserialize<'de> for Secret {
    fn deserialize<D: serde::Deserializer<'de>>(de: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(de).map(Self)
    }
}

/// Credential lookups for one adapter under construction.
///
/// An explicit key from configuration satisfies the adapter's primary
/// variable and takes precedence over the source.
pub struct Credentials<'a> {
    provider: ProviderId,
    source: &'a dyn CredentialSource,
    explicit: Option<&'a Secret>,
}

impl<'a> Credentials<'a> {
    pub fn new(
        provider: ProviderId,
        source: &'a dyn CredentialSource,
        explicit: Option<&'a Secret>,
    ) -> Self {
        Self {
            provider,
            source,
            explicit,
        }
    }

    /// Resolve the primary key, failing with [`Error::Authentication`]
    /// when it is unset or empty.
    pub fn key(&self, var: &str) -> Result<Secret> {
        if let Some(secret) = self.explicit.filter(|s| !s.is_empty()) {
            return Ok(secret.clone());
        }
        self.require(var).map(Secret)
    }

    /// Resolve the primary key if present.
    pub fn key_opt(&self, var: &str) -> Option<Secret> {
        self.explicit
            .filter(|s| !s.is_empty())
            .cloned()
            .or_else(|| self.optional(var).map(Secret))
    }

    /// Resolve a required non-secret variable (endpoint, project).
    pub fn require(&self, var: &str) -> Result<String> {
        self.optional(var).ok_or_else(|| {
            Error::auth(
                self.provider,
                format!("environment variable {var} is not set"),
            )
        })
    }

    /// Resolve an optional variable, treating blank values as unset.
    pub fn optional(&self, var: &str) -> Option<String> {
        self.source.var(var).filter(|v| !v.trim().is_empty())
    }

    pub fn provider(&self) -> ProviderId {
        self.provider
    }
}
