//! Tastypie OpenAPI - Command-line tool for documenting Tastypie-style REST APIs.
//!
//! Reads a settings file and the resource registries it names, then produces an
//! OpenAPI 3.0 document describing every registered resource.
//!
//! # Usage
//!
//! ```bash
//! tastypie-openapi [--settings FILE] [-v] <COMMAND>
//! ```
//!
//! # Examples
//!
//! Print the document as JSON:
//! ```bash
//! tastypie-openapi --settings docs.yaml generate
//! ```
//!
//! Write YAML with an explicit server URL:
//! ```bash
//! tastypie-openapi generate -f yaml -o openapi.yaml --server-url https://api.example.com/
//! ```
//!
//! Serve the Swagger UI:
//! ```bash
//! tastypie-openapi serve --bind 0.0.0.0:8000
//! ```
//!
//! Build a static docs directory:
//! ```bash
//! tastypie-openapi build-docs -v
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use tastypie_openapi::cli;

fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("Tastypie OpenAPI starting...");

    cli::run(args)?;

    Ok(())
}
