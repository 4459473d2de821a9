//! CMake generator selection.
//!
//! A generator is only accepted after it configured a throwaway project
//! that enables every required language. Candidates are tried strictly in
//! order and the first that works wins.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::errors::SetupError;
use crate::util::fs::{ensure_dir, remove_dir_all_if_exists, write_string};
use crate::util::process::ProcessBuilder;

/// Generators tried on this host when none is requested.
pub fn default_generators() -> Vec<String> {
    let names: &[&str] = if cfg!(windows) {
        &[
            "Ninja",
            "Visual Studio 17 2022",
            "Visual Studio 16 2019",
            "NMake Makefiles",
            "MinGW Makefiles",
        ]
    } else {
        &["Ninja", "Unix Makefiles"]
    };
    names.iter().map(|s| s.to_string()).collect()
}

/// Contents of the probe project's CMakeLists.txt.
pub fn test_cmakelists(languages: &[String]) -> String {
    let mut contents = String::from("cmake_minimum_required(VERSION 3.5)\n");
    contents.push_str("project(compiler_test NONE)\n");
    for language in languages {
        contents.push_str(&format!("enable_language({})\n", language));
    }
    contents
}

/// Probe project directory, removed when dropped unless kept.
struct TestProject {
    dir: PathBuf,
    keep: bool,
}

impl TestProject {
    fn create(dir: &Path, languages: &[String], keep: bool) -> Result<Self> {
        // Guard first so a failed write still cleans up.
        let project = TestProject {
            dir: dir.to_path_buf(),
            keep,
        };
        write_string(&dir.join("CMakeLists.txt"), &test_cmakelists(languages))?;
        Ok(project)
    }
}

impl Drop for TestProject {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        if let Err(e) = remove_dir_all_if_exists(&self.dir) {
            tracing::warn!("failed to clean up {}: {:#}", self.dir.display(), e);
        }
    }
}

/// Host-specific generator knowledge plus the probe.
#[derive(Debug, Clone)]
pub struct CMakePlatform {
    cmake: PathBuf,
    default_generators: Vec<String>,
    keep_probe: bool,
    verbose: bool,
}

impl CMakePlatform {
    /// Platform for the current host using the given cmake executable.
    pub fn for_host(cmake: impl Into<PathBuf>) -> Self {
        CMakePlatform {
            cmake: cmake.into(),
            default_generators: default_generators(),
            keep_probe: false,
            verbose: false,
        }
    }

    /// Override the default candidate list.
    pub fn with_default_generators(mut self, generators: Vec<String>) -> Self {
        self.default_generators = generators;
        self
    }

    /// Keep the probe project on disk for debugging.
    pub fn keep_probe(mut self, keep: bool) -> Self {
        self.keep_probe = keep;
        self
    }

    /// Show CMake's output while probing.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Default candidates for this platform.
    pub fn default_generators(&self) -> &[String] {
        &self.default_generators
    }

    /// Find a working generator.
    ///
    /// With `requested` set only that generator is tried; otherwise the
    /// platform defaults are tried in order. Returns
    /// [`SetupError::GeneratorSelection`] if none works.
    pub fn best_generator(
        &self,
        requested: Option<&str>,
        languages: &[String],
        probe_dir: &Path,
    ) -> Result<String> {
        let candidates: Vec<String> = match requested {
            Some(generator) => vec![generator.to_string()],
            None => self.default_generators.clone(),
        };

        let _project = TestProject::create(probe_dir, languages, self.keep_probe)?;
        match self.first_working(&candidates, probe_dir)? {
            Some(generator) => Ok(generator),
            None => Err(SetupError::GeneratorSelection { tried: candidates }.into()),
        }
    }

    fn first_working(&self, candidates: &[String], probe_dir: &Path) -> Result<Option<String>> {
        let build_dir = probe_dir.join("build");

        for generator in candidates {
            // Fresh cache for every attempt.
            remove_dir_all_if_exists(&build_dir)?;
            ensure_dir(&build_dir)?;

            tracing::debug!("trying generator `{}`", generator);
            let status = ProcessBuilder::new(&self.cmake)
                .arg("..")
                .arg("-G")
                .arg(generator)
                .cwd(&build_dir)
                .quiet(!self.verbose)
                .stdout_to_stderr(true)
                .status();

            match status {
                Ok(status) if status.success() => {
                    tracing::debug!("using generator `{}`", generator);
                    return Ok(Some(generator.clone()));
                }
                Ok(status) => {
                    tracing::debug!("generator `{}` failed with {:?}", generator, status.code());
                }
                Err(e) => {
                    tracing::debug!("generator `{}` could not run: {:#}", generator, e);
                }
            }
        }

        Ok(None)
    }
}
