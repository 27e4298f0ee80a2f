//! ragllm CLI

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use rcore::{CredentialSource, Env, Layered, StaticSource};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt};
pub use {check::Check, complete::Complete, providers::Providers};

mod check;
mod complete;
mod providers;

/// Run completions against any supported LLM provider
#[derive(Debug, Parser)]
#[command(name = "ragllm", version, about)]
pub struct App {
    /// Verbosity level (use -v, -vv, -vvv, etc.)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Complete a prompt with the configured provider
    Complete(Complete),

    /// List the supported providers
    Providers(Providers),

    /// Validate a configuration and its credentials without calling the provider
    Check(Check),
}

impl App {
    /// Initialize tracing subscriber based on verbosity.
    ///
    /// Logs go to stderr so completions on stdout stay clean.
    pub fn init_tracing(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let directive = match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "ragllm=debug,ragllm_core=debug,ragllm_provider=debug",
                3 => "ragllm=trace,ragllm_core=trace,ragllm_provider=trace",
                _ => "trace",
            };
            EnvFilter::new(directive)
        });

        fmt()
            .without_time()
            .with_env_filter(filter)
            .with_target(self.verbose > 1)
            .with_writer(std::io::stderr)
            .init();
    }

    /// Run the selected command.
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Complete(cmd) => cmd.run().await,
            Command::Providers(cmd) => cmd.run(),
            Command::Check(cmd) => cmd.run(),
        }
    }
}

/// The process environment, overridden by `NAME=VALUE` pairs.
pub fn credentials(overrides: &[String]) -> Result<Arc<dyn CredentialSource>> {
    let mut vars = StaticSource::new();
    for pair in overrides {
        let Some((name, value)) = pair.split_once('=') else {
            bail!("invalid --env '{pair}', expected NAME=VALUE");
        };
        vars = vars.with(name.trim(), value);
    }
    Ok(Arc::new(Layered(vars, Env)))
}
