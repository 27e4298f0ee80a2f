//! Check command

use anyhow::Result;
use clap::Args;
use provider::Completions;
use rcore::{AppConfig, CredentialSource, Llm};
use std::{path::PathBuf, sync::Arc};

/// Check command arguments
#[derive(Debug, Args)]
pub struct Check {
    /// Application config (yaml, toml or json)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Credential override, layered over the environment (repeatable)
    #[arg(short, long = "env", value_name = "NAME=VALUE")]
    pub env: Vec<String>,
}

impl Check {
    /// Validate against the environment and any overrides.
    pub fn run(&self) -> Result<()> {
        let summary = self.validate(crate::credentials(&self.env)?)?;
        println!("{summary}");
        Ok(())
    }

    /// Load the config and construct its adapter, returning a one-line
    /// summary. Nothing is sent to the provider.
    pub fn validate(&self, source: Arc<dyn CredentialSource>) -> Result<String> {
        let app = AppConfig::load(&self.config, &*source)?;
        let config = app.llm()?;
        let adapter = Completions::new(source).adapter(&config)?;
        if let Some(embedder) = &app.embedder {
            tracing::debug!(provider = %embedder.provider, "embedder section is not used by completions");
        }
        Ok(format!(
            "ok: {} (model {}, stream {}) supports {}",
            adapter.id(),
            config.model.as_deref().unwrap_or("default"),
            config.stream,
            adapter.capabilities()
        ))
    }
}
