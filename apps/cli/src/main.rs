//! iodschema CLI — DICOM IOD schema extraction.
//!
//! Reads the DocBook edition of the DICOM standard and writes a JSON schema
//! of its information object definitions and their modules.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
