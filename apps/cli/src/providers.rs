//! Providers command

use anyhow::Result;
use clap::Args;
use provider::Registry;
use rcore::{Capabilities, ProviderId};
use serde::Serialize;

/// Providers command arguments
#[derive(Debug, Args)]
pub struct Providers {
    /// Print the catalogue as JSON
    #[arg(long)]
    pub json: bool,
}

/// One row of the catalogue.
#[derive(Debug, Serialize)]
pub struct Entry {
    pub id: ProviderId,
    pub capabilities: Capabilities,
    pub credentials: &'static [&'static str],
}

impl Providers {
    /// The catalogue, in registry order.
    pub fn entries() -> Vec<Entry> {
        Registry::entries()
            .iter()
            .map(|c| Entry {
                id: c.id,
                capabilities: c.capabilities,
                credentials: c.credentials,
            })
            .collect()
    }

    /// Print the catalogue.
    pub fn run(&self) -> Result<()> {
        let entries = Self::entries();
        if self.json {
            println!("{}", serde_json::to_string_pretty(&entries)?);
            return Ok(());
        }

        for entry in entries {
            let credentials = match entry.credentials {
                [] => "-".to_owned(),
                vars => vars.join(", "),
            };
            println!(
                "{:<14} {:<28} {credentials}",
                entry.id.as_str(),
                entry.capabilities.to_string()
            );
        }
        Ok(())
    }
}
