use anyhow::{Context, bail};
use clap::Parser;
use finnbar_core::{Config, client_from_config};
use std::io::IsTerminal;

use crate::{app::App, logging, tui};

/// Top-level CLI struct. The tool takes no arguments beyond `--help` and
/// `--version`; everything else happens inside the interface.
#[derive(Debug, Parser)]
#[command(
    name = "finnbar",
    version,
    about = "Check IKEA store stock from the terminal",
    long_about = "Pick a country, optionally a store, enter one or more product IDs \
                  and see current stock levels.\n\n\
                  Settings are read from the platform config directory (config.toml)."
)]
pub struct Cli {}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        if !std::io::stdout().is_terminal() {
            bail!("finnbar needs an interactive terminal");
        }

        let config = Config::load()?;
        logging::init(&config)?;

        let client = client_from_config(&config)?;
        let countries = client
            .list_countries()
            .await
            .context("Failed to load the country list")?;
        if countries.is_empty() {
            bail!("No supported countries available");
        }
        tracing::info!(countries = countries.len(), "starting interface");

        let mut app = App::new(client, countries);
        let mut terminal = tui::setup_terminal()?;
        let result = app.run(&mut terminal).await;
        tui::restore_terminal(&mut terminal)?;

        if let Err(err) = &result {
            tracing::error!(error = %err, "interface exited with an error");
        }
        result
    }
}
