//! Output directory layout under the project root.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::util::fs::{ensure_dir, normalize_lexically};

/// Tool root, relative to the project root.
pub const CMPACK_DIR: &str = "_cmpack";

/// Build scratch directory, relative to the project root.
pub const CMAKE_BUILD_DIR: &str = "_cmpack/cmake-build";

/// Install staging directory, relative to the project root.
pub const CMAKE_INSTALL_DIR: &str = "_cmpack/cmake-install";

/// Final consolidated output directory, relative to the project root.
pub const SETUPTOOLS_INSTALL_DIR: &str = "_cmpack/setuptools";

/// Generator probe project, relative to the project root.
pub const TEST_COMPILE_DIR: &str = "_cmpack/cmake-test-compile";

/// Hand-off document, relative to the project root.
pub const HANDOFF_FILE: &str = "_cmpack/setup.json";

/// Absolute locations of the fixed output directories for one project.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    /// Create a layout for the project rooted at `root`.
    ///
    /// The root is normalized lexically so every derived path compares
    /// equal to what CMake writes back.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ProjectLayout {
            root: normalize_lexically(&root.into()),
        }
    }

    /// Project root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Native project directory for a `/`-form subdirectory (`""` is the root).
    pub fn source_dir(&self, rel: &str) -> PathBuf {
        normalize_lexically(&self.root.join(rel))
    }

    /// `_cmpack`
    pub fn cmpack_dir(&self) -> PathBuf {
        self.root.join(CMPACK_DIR)
    }

    /// `_cmpack/cmake-build`
    pub fn build_dir(&self) -> PathBuf {
        self.root.join(CMAKE_BUILD_DIR)
    }

    /// `_cmpack/cmake-install`
    pub fn install_dir(&self) -> PathBuf {
        self.root.join(CMAKE_INSTALL_DIR)
    }

    /// `_cmpack/setuptools`
    pub fn setuptools_dir(&self) -> PathBuf {
        self.root.join(SETUPTOOLS_INSTALL_DIR)
    }

    /// `_cmpack/cmake-test-compile`
    pub fn test_compile_dir(&self) -> PathBuf {
        self.root.join(TEST_COMPILE_DIR)
    }

    /// `_cmpack/setup.json`
    pub fn handoff_path(&self) -> PathBuf {
        self.root.join(HANDOFF_FILE)
    }

    /// Create the build, staging and output directories if absent.
    pub fn ensure_dirs(&self) -> Result<()> {
        ensure_dir(&self.build_dir())?;
        ensure_dir(&self.install_dir())?;
        ensure_dir(&self.setuptools_dir())?;
        Ok(())
    }
}
