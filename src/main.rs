//! OpenAPI from routes - Command-line tool for generating OpenAPI documentation.
//!
//! This binary loads an application's route registry from a manifest and
//! prints (or writes) the OpenAPI 3.0 document generated from it.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-routes [OPTIONS] [APP]
//! ```
//!
//! # Examples
//!
//! Generate JSON documentation:
//! ```bash
//! openapi-from-routes app.yaml -o openapi.json
//! ```
//!
//! Generate a Redoc page for the internal zone, with an overlay:
//! ```bash
//! openapi-from-routes app.yaml --zone internal --merge security.yaml -f html -o docs/index.html
//! ```
//!
//! Load the application through the legacy config file:
//! ```bash
//! openapi-from-routes --config openapi.toml -f yaml
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_from_routes::cli;

fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    // Initialize logger based on verbose flag
    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("OpenAPI from routes starting...");

    let args = cli::parse_args_from_parsed(args)?;

    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
