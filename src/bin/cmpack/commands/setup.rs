//! `cmpack [OPTIONS] [SETUP ARGS]...`

use std::sync::Arc;

use anyhow::Result;

use crate::cli::Cli;
use cmpack::ops::{ArgSets, SetupOptions};
use cmpack::util::{GlobalContext, Shell};

pub fn execute(cli: Cli, setup_args: Vec<String>, sets: ArgSets) -> Result<()> {
    let shell = Arc::new(Shell::from_flags(cli.quiet, cli.verbose, cli.color));
    let mut ctx = GlobalContext::new()?;
    ctx.set_verbose(cli.verbose);

    if setup_args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!("{}", Cli::help_text());
    }

    let opts = SetupOptions {
        build_type: cli.build_type,
        generator: cli.generator,
        jobs: cli.jobs,
        manifest_path: cli.manifest_path,
        emit: cli.emit,
        setup_args,
        cmake_args: sets.cmake,
        build_tool_args: sets.build_tool,
    };

    cmpack::setup(&ctx, &shell, &opts)
}
