//! veap-watch CLI Binary
//!
//! Command-line client for VEAP servers.

use anyhow::Context;
use clap::Parser;
use std::process;
use veap_watch::logging::init_logging;
use veap_watch::tooling::cli::{Cli, CliContext};

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = cli.load_config().context("Error loading configuration")?;
    init_logging(Some(&config.logging)).context("Error initializing logging")?;

    let context = CliContext::new(config).context("Error initializing client")?;
    let mut print_frame = |frame: &str| println!("{}\n", frame);
    let output = context.execute_streaming(&cli.command, &mut print_frame)?;
    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
