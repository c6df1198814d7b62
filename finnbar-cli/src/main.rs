//! Binary crate for the `finnbar` terminal interface.
//!
//! This crate focuses on:
//! - Parsing the (tiny) command line
//! - Terminal setup and the event loop
//! - Rendering the form and results

use clap::Parser;

mod app;
mod cli;
mod logging;
mod results;
mod theme;
mod tui;
mod ui;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    cmd.run().await
}
