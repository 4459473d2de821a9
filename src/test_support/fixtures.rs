//! Project fixtures.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::layout::{CMAKE_BUILD_DIR, CMAKE_INSTALL_DIR};
use crate::core::manifest::MANIFEST_NAME;

/// A project to write into a temporary directory.
#[derive(Debug, Clone)]
pub struct ProjectFixture {
    /// Directory name under the base path.
    pub name: String,
    /// Cmpack.toml content.
    pub manifest: String,
    /// Project files (path relative to project root -> content).
    pub sources: BTreeMap<PathBuf, String>,
    /// Files already in the install staging tree (path relative to it).
    pub installed: BTreeMap<PathBuf, String>,
}

impl ProjectFixture {
    /// Create a new empty project fixture.
    pub fn new(name: impl Into<String>) -> Self {
        ProjectFixture {
            name: name.into(),
            manifest: String::new(),
            sources: BTreeMap::new(),
            installed: BTreeMap::new(),
        }
    }

    /// A single pure-Python package with an `__init__.py`.
    pub fn python_package(name: impl Into<String>) -> Self {
        let name = name.into();
        let manifest = manifests::package(&name);
        ProjectFixture::new(name.clone())
            .with_manifest(manifest)
            .with_source(format!("{}/__init__.py", name), "")
    }

    /// Set the manifest content.
    pub fn with_manifest(mut self, manifest: impl Into<String>) -> Self {
        self.manifest = manifest.into();
        self
    }

    /// Add a project file.
    pub fn with_source(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.sources.insert(path.into(), content.into());
        self
    }

    /// Add a minimal `CMakeLists.txt` at the project root.
    pub fn with_cmakelists(self) -> Self {
        let name = self.name.clone();
        self.with_source("CMakeLists.txt", sources::cmakelists(&name))
    }

    /// Add a file to the install staging tree.
    pub fn with_installed(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.installed.insert(path.into(), content.into());
        self
    }

    /// Write this fixture under `base_path` and return the project root.
    ///
    /// Installed files are also listed in `install_manifest.txt` inside the
    /// build directory, the way CMake leaves them.
    pub fn write_to(&self, base_path: &Path) -> std::io::Result<PathBuf> {
        let project_path = base_path.join(&self.name);
        std::fs::create_dir_all(&project_path)?;

        std::fs::write(project_path.join(MANIFEST_NAME), &self.manifest)?;

        for (rel_path, content) in &self.sources {
            write_file(&project_path.join(rel_path), content)?;
        }

        if !self.installed.is_empty() {
            let install_root = project_path.join(CMAKE_INSTALL_DIR);
            let mut listing = String::new();
            for (rel_path, content) in &self.installed {
                let full_path = install_root.join(rel_path);
                write_file(&full_path, content)?;
                listing.push_str(&format!("{}\n", full_path.display()));
            }
            write_file(
                &project_path.join(CMAKE_BUILD_DIR).join("install_manifest.txt"),
                &listing,
            )?;
        }

        Ok(project_path)
    }
}

fn write_file(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)
}

/// Common manifest templates.
pub mod manifests {
    /// One package with default directory.
    pub fn package(name: &str) -> String {
        format!(
            r#"[package]
name = "{name}"
version = "1.0.0"

[setup]
packages = ["{name}"]
"#
        )
    }
}

/// Common source file templates.
pub mod sources {
    /// A CMakeLists.txt installing one module into the package.
    pub fn cmakelists(name: &str) -> String {
        format!(
            r#"cmake_minimum_required(VERSION 3.5)
project({name} NONE)
install(FILES {name}/__init__.py DESTINATION {name})
"#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fixture_writes_install_manifest() {
        let tmp = TempDir::new().unwrap();
        let root = ProjectFixture::python_package("hello")
            .with_installed("hello/_hello.so", "")
            .write_to(tmp.path())
            .unwrap();

        assert!(root.join("Cmpack.toml").is_file());
        assert!(root.join("hello/__init__.py").is_file());
        assert!(root.join("_cmpack/cmake-install/hello/_hello.so").is_file());

        let listing =
            std::fs::read_to_string(root.join("_cmpack/cmake-build/install_manifest.txt")).unwrap();
        assert!(listing.contains("_cmpack/cmake-install/hello/_hello.so"));
    }
}
