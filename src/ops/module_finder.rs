//! Enumerating importable modules across the source tree and the install
//! staging tree.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::core::errors::SetupError;
use crate::core::layout::CMAKE_INSTALL_DIR;
use crate::core::module::{ModuleOrigin, ModuleRecord};
use crate::core::setup::SetupSpec;
use crate::util::fs::join_unix;

/// Finds modules in two trees rooted at the same project.
///
/// A module present in both trees is reported once, as coming from the
/// install tree.
#[derive(Debug)]
pub struct ModuleFinder<'a> {
    spec: &'a SetupSpec,
    source_base: PathBuf,
    install_base: PathBuf,
}

impl<'a> ModuleFinder<'a> {
    /// Finder for the project at `project_root` using the standard
    /// staging directory.
    pub fn new(spec: &'a SetupSpec, project_root: &Path) -> Self {
        ModuleFinder {
            spec,
            source_base: project_root.to_path_buf(),
            install_base: project_root.join(CMAKE_INSTALL_DIR),
        }
    }

    /// Every module of the declared packages followed by the declared
    /// standalone modules.
    pub fn find_all_modules(&self) -> Result<Vec<ModuleRecord>, SetupError> {
        let mut modules = Vec::new();
        for package in &self.spec.packages {
            modules.extend(self.find_package_modules(package)?);
        }
        modules.extend(self.find_standalone_modules());
        Ok(modules)
    }

    /// Top-level `*.py` files of one package directory, merged over both
    /// trees.
    pub fn find_package_modules(&self, package: &str) -> Result<Vec<ModuleRecord>, SetupError> {
        let package_dir = self.spec.package_directory(package);
        let source_dir = self.source_base.join(&package_dir);
        let install_dir = self.install_base.join(&package_dir);

        check_package_dir(package, &source_dir)?;
        check_package_dir(package, &install_dir)?;
        if !source_dir.is_dir() && !install_dir.is_dir() {
            return Err(SetupError::ModuleDiscovery {
                message: format!("package directory '{}' does not exist", package_dir),
            });
        }

        let in_source = python_files(&source_dir)?;
        let in_install = python_files(&install_dir)?;

        if !package.is_empty() && !in_source.contains("__init__") && !in_install.contains("__init__") {
            tracing::warn!(
                "package init file '{}' not found (or not a regular file)",
                join_unix(&package_dir, "__init__.py")
            );
        }

        let modules = in_source
            .union(&in_install)
            .map(|module| {
                let origin = if in_install.contains(module) {
                    ModuleOrigin::Install
                } else {
                    ModuleOrigin::Source
                };
                let file = join_unix(&package_dir, &format!("{}.py", module));
                ModuleRecord::new(package, module.clone(), file, origin)
            })
            .collect();
        Ok(modules)
    }

    /// Declared `py-modules`, each resolved through its package's directory.
    ///
    /// Modules whose file exists in neither tree are skipped with a warning.
    pub fn find_standalone_modules(&self) -> Vec<ModuleRecord> {
        let mut modules = Vec::new();
        for name in &self.spec.py_modules {
            let (package, module) = match name.rsplit_once('.') {
                Some((package, module)) => (package, module),
                None => ("", name.as_str()),
            };

            let file = join_unix(
                &self.spec.package_directory(package),
                &format!("{}.py", module),
            );

            let origin = if self.install_base.join(&file).is_file() {
                ModuleOrigin::Install
            } else if self.source_base.join(&file).is_file() {
                ModuleOrigin::Source
            } else {
                tracing::warn!("file {} (for module {}) not found", file, name);
                continue;
            };

            modules.push(ModuleRecord::new(package, module, file, origin));
        }
        modules
    }
}

fn check_package_dir(package: &str, dir: &Path) -> Result<(), SetupError> {
    if dir.exists() && !dir.is_dir() {
        return Err(SetupError::ModuleDiscovery {
            message: format!(
                "supposed package directory '{}' for package '{}' exists, but is not a directory",
                dir.display(),
                package
            ),
        });
    }
    Ok(())
}

/// Module names of the `*.py` files directly inside `dir`.
fn python_files(dir: &Path) -> Result<BTreeSet<String>, SetupError> {
    let mut names = BTreeSet::new();
    if !dir.is_dir() {
        return Ok(names);
    }

    let entries = std::fs::read_dir(dir).map_err(|e| SetupError::ModuleDiscovery {
        message: format!("failed to list {}: {}", dir.display(), e),
    })?;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("py") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            names.insert(stem.to_string());
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }

    #[test]
    fn test_modules_merged_across_trees() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("pkg/__init__.py"));
        touch(&root.join("pkg/shared.py"));
        touch(&root.join("pkg/notes.txt"));
        touch(&root.join("_cmpack/cmake-install/pkg/helper.py"));
        touch(&root.join("_cmpack/cmake-install/pkg/shared.py"));

        let spec = SetupSpec {
            packages: vec!["pkg".to_string()],
            ..Default::default()
        };
        let modules = ModuleFinder::new(&spec, root).find_all_modules().unwrap();

        assert_eq!(
            modules,
            vec![
                ModuleRecord::new("pkg", "__init__", "pkg/__init__.py", ModuleOrigin::Source),
                ModuleRecord::new("pkg", "helper", "pkg/helper.py", ModuleOrigin::Install),
                ModuleRecord::new("pkg", "shared", "pkg/shared.py", ModuleOrigin::Install),
            ]
        );
    }

    #[test]
    fn test_missing_package_dir_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let spec = SetupSpec {
            packages: vec!["ghost".to_string()],
            ..Default::default()
        };

        let err = ModuleFinder::new(&spec, tmp.path()).find_all_modules().unwrap_err();
        assert!(matches!(err, SetupError::ModuleDiscovery { .. }));
        assert!(err.to_string().contains("package directory 'ghost' does not exist"));
    }

    #[test]
    fn test_standalone_modules() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("tool.py"));
        touch(&root.join("_cmpack/cmake-install/top/gen.py"));

        let spec = SetupSpec {
            py_modules: vec!["tool".to_string(), "top.gen".to_string(), "missing".to_string()],
            ..Default::default()
        };
        let modules = ModuleFinder::new(&spec, root).find_standalone_modules();

        assert_eq!(
            modules,
            vec![
                ModuleRecord::new("", "tool", "tool.py", ModuleOrigin::Source),
                ModuleRecord::new("top", "gen", "top/gen.py", ModuleOrigin::Install),
            ]
        );
    }
}
