//! The completion facade.
//!
//! `Completions` resolves the provider, constructs the adapter once per
//! distinct configuration and delegates each call to it. Results are never
//! cached and nothing is retried.

use crate::{Provider, Registry};
use parking_lot::RwLock;
use rcore::{
    CompletionRequest, CompletionResult, CredentialSource, Env, Llm, ProviderConfig, Result,
};
use reqwest::Client;
use std::{collections::BTreeMap, sync::Arc};

/// Single entry point for completions.
///
/// Adapters are cached by [`ProviderConfig::fingerprint`]; callers receive
/// clones and never hold the lock across a provider call.
pub struct Completions {
    source: Arc<dyn CredentialSource>,
    client: Client,
    adapters: RwLock<BTreeMap<String, Provider>>,
}

impl Default for Completions {
    fn default() -> Self {
        Self::new(Arc::new(Env))
    }
}

impl Completions {
    /// A facade resolving credentials through `source`.
    pub fn new(source: Arc<dyn CredentialSource>) -> Self {
        Self {
            source,
            client: Client::new(),
            adapters: RwLock::new(BTreeMap::new()),
        }
    }

    /// Use `client` for every adapter constructed from now on.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// The adapter for `config`, constructing it on first use.
    pub fn adapter(&self, config: &ProviderConfig) -> Result<Provider> {
        let key = config.fingerprint()?;
        if let Some(provider) = self.adapters.read().get(&key) {
            return Ok(provider.clone());
        }

        let provider =
            Registry::get(config.provider).build(config, &*self.source, self.client.clone())?;
        Ok(self
            .adapters
            .write()
            .entry(key)
            .or_insert(provider)
            .clone())
    }

    /// Run `request` against the provider `config` selects.
    ///
    /// Returns a stream when `config.stream` is set, the function calls when
    /// the model requested any, and the text otherwise.
    pub async fn complete(
        &self,
        config: &ProviderConfig,
        request: &CompletionRequest,
    ) -> Result<CompletionResult> {
        let provider = self.adapter(config)?;
        provider.check(request, config.stream)?;
        if config.stream {
            return Ok(CompletionResult::Stream(provider.stream(request)));
        }
        provider.generate(request).await.map(Into::into)
    }

    /// Number of constructed adapters.
    pub fn cached(&self) -> usize {
        self.adapters.read().len()
    }

    /// Drop every cached adapter; credentials are resolved again on next use.
    pub fn clear(&self) {
        self.adapters.write().clear();
    }
}
