//! Global context for cmpack operations.
//!
//! Provides centralized access to the working directory, user-level paths
//! and the merged configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::errors::SetupError;
use crate::core::manifest::MANIFEST_NAME;
use crate::util::config::{self, Config};
use crate::util::diagnostic::suggestions;

/// Process-wide settings resolved once at startup.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Directory the tool was invoked from
    cwd: PathBuf,

    /// User-level cmpack directory (~/.cmpack)
    home: PathBuf,

    /// Verbose output requested
    verbose: bool,
}

impl GlobalContext {
    /// Create a new GlobalContext rooted at the current directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        let home = config::global_config_dir().unwrap_or_else(|| PathBuf::from(".cmpack"));
        GlobalContext {
            cwd,
            home,
            verbose: false,
        }
    }

    /// Set verbose mode.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Check if verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the cmpack home directory (~/.cmpack/).
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Get the global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Load the global config merged with the project's overrides.
    pub fn load_config(&self, project_root: &Path) -> Config {
        config::load_config(&self.config_path(), &config::project_config_path(project_root))
    }

    /// Find `Cmpack.toml` starting from cwd and searching upward.
    pub fn find_manifest(&self) -> Result<PathBuf, SetupError> {
        let mut current = self.cwd.clone();
        loop {
            let candidate = current.join(MANIFEST_NAME);
            if candidate.is_file() {
                return Ok(candidate);
            }
            if !current.pop() {
                return Err(SetupError::configuration(
                    format!(
                        "could not find `{}` in `{}` or any parent directory",
                        MANIFEST_NAME,
                        self.cwd.display()
                    ),
                    self.cwd.clone(),
                )
                .with_suggestion(suggestions::NO_MANIFEST));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_manifest_upward() {
        let tmp = TempDir::new().unwrap();
        let manifest = tmp.path().join(MANIFEST_NAME);
        std::fs::write(&manifest, "[setup]\n").unwrap();
        let nested = tmp.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        let ctx = GlobalContext::with_cwd(nested);
        assert_eq!(ctx.find_manifest().ok(), Some(manifest));
    }

    #[test]
    fn test_find_manifest_missing() {
        let tmp = TempDir::new().unwrap();
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf());

        let err = ctx.find_manifest().unwrap_err();
        assert!(matches!(err, SetupError::Configuration { .. }));
    }

    #[test]
    fn test_config_path_under_home() {
        let ctx = GlobalContext::with_cwd(PathBuf::from("/work"));
        assert!(ctx.config_path().ends_with("config.toml"));
        assert!(ctx.home().to_string_lossy().contains("cmpack"));
    }
}
