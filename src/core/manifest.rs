//! Cmpack.toml manifest parsing and schema.
//!
//! The manifest is the project-level declaration: package metadata that is
//! passed through untouched, the `[setup]` packaging declaration, and the
//! `[cmake]` parameters for the native build.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::errors::SetupError;
use crate::core::setup::SetupSpec;
use crate::util::fs::{normalize_rel_dir, relative_path, to_unix_path};

/// Canonical manifest file name.
pub const MANIFEST_NAME: &str = "Cmpack.toml";

/// The `[cmake]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CMakeSection {
    /// Extra configure arguments; command-line ones are appended after these
    pub args: Vec<String>,

    /// Native project subdirectory (empty = project root)
    pub source_dir: String,

    /// Subdirectory of the install staging directory used as install prefix
    pub install_dir: String,

    /// Languages the generator probe must be able to enable
    pub languages: Vec<String>,
}

impl Default for CMakeSection {
    fn default() -> Self {
        CMakeSection {
            args: Vec::new(),
            source_dir: String::new(),
            install_dir: String::new(),
            languages: vec!["CXX".to_string(), "C".to_string()],
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(default)]
    package: BTreeMap<String, toml::Value>,
    #[serde(default)]
    setup: SetupSpec,
    #[serde(default)]
    cmake: CMakeSection,
}

/// The parsed Cmpack.toml manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Free-form package metadata, forwarded to the hand-off
    pub package: BTreeMap<String, toml::Value>,

    /// Packaging declaration
    pub setup: SetupSpec,

    /// Native build parameters
    pub cmake: CMakeSection,

    /// The directory containing this manifest
    pub manifest_dir: PathBuf,
}

/// Validated CMake parameters, relative to the project root in `/`-form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CMakeParams {
    /// Native project subdirectory, `""` for the root
    pub source_dir: String,

    /// Install prefix subdirectory, `""` for the staging root
    pub install_dir: String,
}

impl Manifest {
    /// Load a manifest from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;

        let dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        Self::parse(&contents, dir)
            .with_context(|| format!("failed to parse manifest: {}", path.display()))
    }

    /// Parse manifest contents for a project rooted at `manifest_dir`.
    pub fn parse(contents: &str, manifest_dir: PathBuf) -> Result<Self> {
        let raw: RawManifest = toml::from_str(contents)?;
        Ok(Manifest {
            package: raw.package,
            setup: raw.setup,
            cmake: raw.cmake,
            manifest_dir,
        })
    }

    /// Project root (the manifest's directory).
    pub fn root(&self) -> &Path {
        &self.manifest_dir
    }

    /// Validate `[cmake]` parameters before anything is built.
    ///
    /// The install directory must be relative; the source directory must
    /// exist. An absolute source directory is made relative to the root and
    /// `"."` collapses to `""`.
    pub fn cmake_params(&self) -> Result<CMakeParams, SetupError> {
        let root = self.root();

        let install_dir = &self.cmake.install_dir;
        if Path::new(install_dir).is_absolute() {
            return Err(SetupError::configuration(
                format!(
                    "setup parameter 'cmake.install-dir' is set to an absolute path. \
                     A relative path is expected.\n    CMake Install Directory: {}",
                    install_dir
                ),
                root,
            ));
        }

        let source_dir = &self.cmake.source_dir;
        let source_path = root.join(source_dir);
        if !source_path.exists() {
            return Err(SetupError::configuration(
                format!(
                    "setup parameter 'cmake.source-dir' set to a nonexistent directory.\n    \
                     CMake Source Directory: {}",
                    source_dir
                ),
                root,
            ));
        }

        let source_dir = if Path::new(source_dir).is_absolute() {
            to_unix_path(&relative_path(root, Path::new(source_dir)))
        } else {
            source_dir.clone()
        };

        Ok(CMakeParams {
            source_dir: normalize_rel_dir(&source_dir),
            install_dir: normalize_rel_dir(install_dir),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FULL: &str = r#"
[package]
name = "hello"
version = "1.2.3"

[setup]
packages = ["hello", "hello.sub"]
package-dir = { hello = "hello" }
package-data = { hello = ["*.txt"] }
py-modules = ["tool"]
scripts = ["scripts/hello-cli"]
data-files = { "share/hello" = ["README.md"] }

[cmake]
args = ["-DFOO:BOOL=ON"]
source-dir = "native"
"#;

    #[test]
    fn test_parse_full_manifest() {
        let manifest = Manifest::parse(FULL, PathBuf::from("/proj")).unwrap();

        assert_eq!(manifest.package["name"].as_str(), Some("hello"));
        assert_eq!(manifest.setup.packages, vec!["hello", "hello.sub"]);
        assert_eq!(manifest.setup.package_dir["hello"], "hello");
        assert_eq!(manifest.setup.package_data["hello"], vec!["*.txt"]);
        assert_eq!(manifest.setup.py_modules, vec!["tool"]);
        assert_eq!(manifest.setup.scripts, vec!["scripts/hello-cli"]);
        assert_eq!(manifest.cmake.args, vec!["-DFOO:BOOL=ON"]);
        assert_eq!(manifest.cmake.source_dir, "native");
        assert_eq!(manifest.cmake.languages, vec!["CXX", "C"]);
    }

    #[test]
    fn test_parse_empty_manifest() {
        let manifest = Manifest::parse("", PathBuf::from("/proj")).unwrap();
        assert!(manifest.setup.packages.is_empty());
        assert!(manifest.cmake.install_dir.is_empty());
        assert!(manifest.package.is_empty());
    }

    #[test]
    fn test_rejects_unknown_types() {
        let result = Manifest::parse("[setup]\npackages = \"hello\"\n", PathBuf::from("/proj"));
        assert!(result.is_err());
    }

    #[test]
    fn test_absolute_install_dir_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut manifest = Manifest::parse("", tmp.path().to_path_buf()).unwrap();
        manifest.cmake.install_dir = tmp.path().join("abs").display().to_string();

        let err = manifest.cmake_params().unwrap_err();
        assert!(matches!(err, SetupError::Configuration { .. }));
        assert!(err.to_string().contains("absolute path"));
    }

    #[test]
    fn test_missing_source_dir_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut manifest = Manifest::parse("", tmp.path().to_path_buf()).unwrap();
        manifest.cmake.source_dir = "does-not-exist".to_string();

        let err = manifest.cmake_params().unwrap_err();
        assert!(err.to_string().contains("nonexistent directory"));
    }

    #[test]
    fn test_source_dir_normalization() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("native")).unwrap();
        let mut manifest = Manifest::parse("", tmp.path().to_path_buf()).unwrap();

        manifest.cmake.source_dir = ".".to_string();
        assert_eq!(manifest.cmake_params().unwrap().source_dir, "");

        manifest.cmake.source_dir = tmp.path().join("native").display().to_string();
        assert_eq!(manifest.cmake_params().unwrap().source_dir, "native");
    }
}
