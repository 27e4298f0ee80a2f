//! Complete command

use anyhow::Result;
use clap::Args;
use futures_util::StreamExt;
use provider::Completions;
use rcore::{AppConfig, CompletionRequest, CompletionResult};
use std::{io::Write, path::PathBuf};

/// Complete command arguments
#[derive(Debug, Args)]
pub struct Complete {
    /// Application config (yaml, toml or json)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Stream fragments as they arrive, overriding the config
    #[arg(short, long)]
    pub stream: bool,

    /// System prompt for this request
    #[arg(long)]
    pub system: Option<String>,

    /// Credential override, layered over the environment (repeatable)
    #[arg(short, long = "env", value_name = "NAME=VALUE")]
    pub env: Vec<String>,

    /// The prompt to complete
    pub prompt: String,
}

impl Complete {
    /// Run the completion and print it to stdout.
    pub async fn run(self) -> Result<()> {
        let source = crate::credentials(&self.env)?;
        let app = AppConfig::load(&self.config, &*source)?;
        let mut config = app.llm()?;
        config.stream |= self.stream;

        let mut request = CompletionRequest::new(self.prompt);
        if let Some(system) = self.system {
            request = request.with_system(system);
        }

        let result = Completions::new(source).complete(&config, &request).await?;
        let mut stdout = std::io::stdout();
        match result {
            CompletionResult::Stream(mut stream) => {
                while let Some(fragment) = stream.next().await {
                    stdout.write_all(fragment?.as_bytes())?;
                    stdout.flush()?;
                }
                writeln!(stdout)?;
            }
            result => writeln!(stdout, "{}", result.collect().await?)?,
        }
        Ok(())
    }
}
