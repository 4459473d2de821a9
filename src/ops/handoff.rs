//! The final packaging configuration and how it reaches the packaging tool.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;

use crate::core::layout::CMAKE_INSTALL_DIR;
use crate::core::manifest::Manifest;
use crate::ops::classify::{Classification, PackagePrefix};
use crate::util::fs::{ensure_dir, join_unix};
use crate::util::process::ProcessBuilder;

/// Environment variable pointing the packaging command at the document.
pub const SETUP_JSON_ENV: &str = "CMPACK_SETUP_JSON";

/// Keyword arguments for the packaging tool's `setup()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SetupOutput {
    /// `[package]` metadata, untouched
    pub package: BTreeMap<String, toml::Value>,
    pub packages: Vec<String>,
    pub package_dir: BTreeMap<String, String>,
    pub package_data: BTreeMap<String, Vec<String>>,
    pub py_modules: Vec<String>,
    pub scripts: Vec<String>,
    /// `(install directory, files)` pairs
    pub data_files: Vec<(String, Vec<String>)>,
    /// Forces a platform-specific distribution
    pub has_ext_modules: bool,
    /// Packaging arguments to run with
    pub argv: Vec<String>,
}

impl SetupOutput {
    /// The declared configuration, for runs that skip the native build.
    pub fn declared(manifest: &Manifest, argv: &[String]) -> Self {
        let setup = &manifest.setup;
        SetupOutput {
            package: manifest.package.clone(),
            packages: setup.packages.clone(),
            package_dir: setup.package_dir.clone(),
            package_data: setup.package_data.clone(),
            py_modules: setup.py_modules.clone(),
            scripts: setup.scripts.clone(),
            data_files: data_file_pairs(&setup.declared_data_files()),
            has_ext_modules: false,
            argv: argv.to_vec(),
        }
    }

    /// The configuration after a native build.
    ///
    /// Package directories point at the staged copy when one exists; modules
    /// and scripts found in the install tree are taken from there.
    pub fn from_build(
        manifest: &Manifest,
        prefixes: &[PackagePrefix],
        classification: &Classification,
        package_data: BTreeMap<String, Vec<String>>,
        argv: &[String],
    ) -> Self {
        let staging = manifest.root().join(CMAKE_INSTALL_DIR);

        let package_dir = prefixes
            .iter()
            .map(|PackagePrefix { prefix, package }| {
                let dir = if staging.join(prefix).is_dir() {
                    join_unix(CMAKE_INSTALL_DIR, prefix)
                } else {
                    prefix.clone()
                };
                (package.clone(), dir)
            })
            .collect();

        let staged_if_found = |entries: &BTreeMap<String, bool>| -> Vec<String> {
            entries
                .iter()
                .map(|(name, found)| {
                    if *found {
                        join_unix(CMAKE_INSTALL_DIR, name)
                    } else {
                        name.clone()
                    }
                })
                .collect()
        };

        SetupOutput {
            package: manifest.package.clone(),
            packages: manifest.setup.packages.clone(),
            package_dir,
            package_data,
            py_modules: staged_if_found(&classification.py_modules),
            scripts: staged_if_found(&classification.scripts),
            data_files: data_file_pairs(&classification.data_files),
            has_ext_modules: true,
            argv: argv.to_vec(),
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize setup configuration")
    }
}

fn data_file_pairs<S>(data_files: &BTreeMap<String, S>) -> Vec<(String, Vec<String>)>
where
    for<'a> &'a S: IntoIterator<Item = &'a String>,
{
    data_files
        .iter()
        .map(|(parent, files)| (parent.clone(), files.into_iter().cloned().collect()))
        .collect()
}

/// Somewhere the final configuration can be delivered.
pub trait Handoff {
    /// Deliver `output`.
    fn deliver(&self, output: &SetupOutput) -> Result<()>;

    /// Short description for status lines.
    fn describe(&self) -> String;
}

/// Print the document on stdout.
#[derive(Debug, Default)]
pub struct StdoutHandoff;

impl Handoff for StdoutHandoff {
    fn deliver(&self, output: &SetupOutput) -> Result<()> {
        let json = output.to_json()?;
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", json).context("failed to write to stdout")?;
        Ok(())
    }

    fn describe(&self) -> String {
        "stdout".to_string()
    }
}

/// Write the document to a file.
#[derive(Debug)]
pub struct FileHandoff {
    path: PathBuf,
}

impl FileHandoff {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileHandoff { path: path.into() }
    }
}

impl Handoff for FileHandoff {
    fn deliver(&self, output: &SetupOutput) -> Result<()> {
        write_atomic(&self.path, &output.to_json()?)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Write the document to a file and run the packaging command with it.
///
/// The command receives the document path in [`SETUP_JSON_ENV`] and the
/// packaging arguments appended to its own.
#[derive(Debug)]
pub struct CommandHandoff {
    command: Vec<String>,
    document: PathBuf,
    cwd: PathBuf,
}

impl CommandHandoff {
    pub fn new(command: Vec<String>, document: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        CommandHandoff {
            command,
            document: document.into(),
            cwd: cwd.into(),
        }
    }

    fn process(&self, output: &SetupOutput) -> Result<ProcessBuilder> {
        let Some((program, args)) = self.command.split_first() else {
            bail!("`setup.command` is empty");
        };
        Ok(ProcessBuilder::new(program)
            .args(args)
            .args(&output.argv)
            .env(SETUP_JSON_ENV, self.document.display().to_string())
            .cwd(&self.cwd))
    }
}

impl Handoff for CommandHandoff {
    fn deliver(&self, output: &SetupOutput) -> Result<()> {
        let cmd = self.process(output)?;
        write_atomic(&self.document, &output.to_json()?)?;

        tracing::info!("running {}", cmd.display_command());
        let status = cmd.status()?;
        if !status.success() {
            bail!(
                "packaging command {} failed with exit code {:?}",
                cmd.display_quoted(),
                status.code()
            );
        }
        Ok(())
    }

    fn describe(&self) -> String {
        self.command.join(" ")
    }
}

/// Replace `path` with `contents` without leaving a partial file behind.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_dir(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temporary file in {}", dir.display()))?;
    tmp.write_all(contents.as_bytes())
        .and_then(|_| tmp.write_all(b"\n"))
        .with_context(|| format!("failed to write {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
