//! CLI definitions using clap.
//!
//! cmpack's own options come first. Everything from the first argument that
//! is not one of them belongs to the packaging tool, so `--help` and
//! `--version` are passed through instead of being handled here.

use std::path::PathBuf;

use clap::{Arg, Command, CommandFactory, Parser};

use cmpack::util::shell::ColorChoice;

/// cmpack - build a CMake project into a Python distribution
#[derive(Parser, Debug)]
#[command(name = "cmpack")]
#[command(author, version, about, long_about = None)]
#[command(disable_help_flag = true, disable_version_flag = true)]
#[command(override_usage = "cmpack [OPTIONS] [SETUP ARGS]... [-- CMAKE ARGS... [-- BUILD TOOL ARGS...]]")]
pub struct Cli {
    /// CMake build type (e.g. Debug or Release)
    #[arg(long, value_name = "TYPE")]
    pub build_type: Option<String>,

    /// CMake build system generator
    #[arg(short = 'G', long, value_name = "NAME")]
    pub generator: Option<String>,

    /// Allow N build jobs at once
    #[arg(short = 'j', value_name = "N")]
    pub jobs: Option<usize>,

    /// Path to Cmpack.toml
    #[arg(long, value_name = "PATH")]
    pub manifest_path: Option<PathBuf>,

    /// Write the setup document to PATH instead of stdout
    #[arg(long, value_name = "PATH")]
    pub emit: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// When to use colors: auto, always, never
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorChoice,
}

impl Cli {
    /// Help text, printed alongside the packaging tool's own help.
    pub fn help_text() -> String {
        Cli::command().render_help().to_string()
    }
}

/// Split the packaging segment into cmpack's leading options and the rest.
pub fn partition_args(args: &[String]) -> (Vec<String>, Vec<String>) {
    let cmd = Cli::command();
    let mut ours = Vec::new();
    let mut i = 0;

    while i < args.len() {
        let Some(needs_value) = option_needs_value(&cmd, &args[i]) else {
            break;
        };
        ours.push(args[i].clone());
        if needs_value {
            if let Some(value) = args.get(i + 1) {
                ours.push(value.clone());
                i += 1;
            }
        }
        i += 1;
    }

    (ours, args[i..].to_vec())
}

/// `Some(true)` if `arg` is one of our options and its value is the next
/// argument, `Some(false)` if it is ours and complete, `None` otherwise.
fn option_needs_value(cmd: &Command, arg: &str) -> Option<bool> {
    let (found, inline) = if let Some(long) = arg.strip_prefix("--") {
        let (name, value) = match long.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (long, None),
        };
        let found = find_arg(cmd, |a| a.get_long() == Some(name))?;
        (found, value.is_some())
    } else if let Some(short) = arg.strip_prefix('-') {
        let mut chars = short.chars();
        let c = chars.next()?;
        let found = find_arg(cmd, |a| a.get_short() == Some(c))?;
        (found, !chars.as_str().is_empty())
    } else {
        return None;
    };

    Some(found.get_action().takes_values() && !inline)
}

fn find_arg<'a>(cmd: &'a Command, pred: impl Fn(&Arg) -> bool) -> Option<&'a Arg> {
    cmd.get_arguments().find(|a| pred(*a))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_partition_leading_options() {
        let (ours, rest) = partition_args(&strings(&[
            "--build-type",
            "Debug",
            "-GNinja",
            "-j",
            "4",
            "-v",
            "build",
            "-j",
            "2",
        ]));
        assert_eq!(ours, strings(&["--build-type", "Debug", "-GNinja", "-j", "4", "-v"]));
        assert_eq!(rest, strings(&["build", "-j", "2"]));

        let cli = Cli::try_parse_from(std::iter::once("cmpack".to_string()).chain(ours)).unwrap();
        assert_eq!(cli.build_type.as_deref(), Some("Debug"));
        assert_eq!(cli.generator.as_deref(), Some("Ninja"));
        assert_eq!(cli.jobs, Some(4));
        assert!(cli.verbose);
    }

    #[test]
    fn test_help_and_version_pass_through() {
        let (ours, rest) = partition_args(&strings(&["--emit=out.json", "--help", "--version"]));
        assert_eq!(ours, strings(&["--emit=out.json"]));
        assert_eq!(rest, strings(&["--help", "--version"]));
    }
}
