//! cmpack CLI entry point.

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cmpack::ops::split_arg_sets;
use cmpack::util::diagnostic::emit;
use cmpack::SetupError;

mod cli;
mod commands;

use cli::Cli;

fn main() {
    if let Err(e) = run() {
        report(&e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let sets = split_arg_sets(std::env::args().skip(1))?;
    let (ours, setup_args) = cli::partition_args(&sets.setup);
    let cli = Cli::parse_from(std::iter::once("cmpack".to_string()).chain(ours));

    // Logs go to stderr; stdout carries the setup document.
    let filter = if cli.verbose {
        EnvFilter::new("cmpack=debug")
    } else if cli.quiet {
        EnvFilter::new("cmpack=error")
    } else {
        EnvFilter::new("cmpack=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    commands::setup::execute(cli, setup_args, sets)
}

fn report(e: &anyhow::Error) {
    match e.downcast_ref::<SetupError>() {
        Some(err) => emit(&err.to_diagnostic(), std::io::stderr().is_terminal()),
        None => eprintln!("error: {:#}", e),
    }
}
