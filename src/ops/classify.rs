//! Sorting installed files into packaging buckets.
//!
//! Every path from the install manifest ends up in exactly one place:
//! a declared package's data list, a standalone module, a script, or the
//! generic data files keyed by parent directory. The classifier reads the
//! declared configuration and returns a fresh [`Classification`]; it never
//! touches the filesystem.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::core::errors::SetupError;
use crate::core::layout::CMAKE_INSTALL_DIR;
use crate::core::manifest::CMakeParams;
use crate::core::setup::SetupSpec;
use crate::util::fs::{join_unix, starts_with_segments, strip_segment_prefix, to_unix_path, unix_parent};

/// A package together with the directory its files live in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagePrefix {
    /// `/`-form directory, relative to the project root
    pub prefix: String,
    /// Dotted package name
    pub package: String,
}

/// Build the package prefixes, deepest directory first.
///
/// Sorting by decreasing length means a child package always claims its
/// files before any ancestor gets a chance to. Ties are broken by package
/// name so the order is stable.
pub fn collect_package_prefixes(package_dirs: &BTreeMap<String, String>) -> Vec<PackagePrefix> {
    let mut prefixes: Vec<PackagePrefix> = package_dirs
        .iter()
        .map(|(package, dir)| PackagePrefix {
            prefix: dir.clone(),
            package: package.clone(),
        })
        .collect();
    prefixes.sort_by(|a, b| {
        (Reverse(a.prefix.len()), &a.package).cmp(&(Reverse(b.prefix.len()), &b.package))
    });
    prefixes
}

/// Result of classifying an install manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Package -> files relative to the package directory (declared entries
    /// first, installed ones appended)
    pub package_data: BTreeMap<String, Vec<String>>,
    /// Standalone module -> found in the install tree
    pub py_modules: BTreeMap<String, bool>,
    /// Script path -> found in the install tree
    pub scripts: BTreeMap<String, bool>,
    /// Install directory -> files relative to the project root
    pub data_files: BTreeMap<String, BTreeSet<String>>,
}

impl Classification {
    /// Seed from the declared configuration, with nothing found yet.
    pub fn from_declared(spec: &SetupSpec) -> Self {
        Classification {
            package_data: spec.package_data.clone(),
            py_modules: spec.py_modules.iter().map(|m| (m.clone(), false)).collect(),
            scripts: spec.normalized_scripts().into_iter().map(|s| (s, false)).collect(),
            data_files: spec.declared_data_files(),
        }
    }
}

/// Where a single path was sorted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bucket {
    /// Data of `package`, stored relative to its directory
    Package { package: String, file: String },
    /// A standalone module found in the install tree
    Module(String),
    /// A script found in the install tree
    Script(String),
    /// Generic data installed from the staging directory
    DataFile { parent: String, file: String },
}

/// Classifies install paths against one declared configuration.
#[derive(Debug, Clone)]
pub struct Classifier<'a> {
    spec: &'a SetupSpec,
    prefixes: Vec<PackagePrefix>,
    scripts: BTreeSet<String>,
    params: CMakeParams,
    project_root: PathBuf,
}

impl<'a> Classifier<'a> {
    /// Prepare a classifier for the project at `project_root`.
    pub fn new(spec: &'a SetupSpec, params: CMakeParams, project_root: &Path) -> Self {
        Classifier {
            spec,
            prefixes: collect_package_prefixes(&spec.resolved_package_dirs()),
            scripts: spec.normalized_scripts().into_iter().collect(),
            params,
            project_root: project_root.to_path_buf(),
        }
    }

    /// Package prefixes in matching order.
    pub fn package_prefixes(&self) -> &[PackagePrefix] {
        &self.prefixes
    }

    /// Classify every path.
    ///
    /// Paths must lie strictly inside the install staging directory. All
    /// that don't are collected into one
    /// [`SetupError::BoundaryViolation`].
    pub fn classify(&self, install_paths: &[PathBuf]) -> Result<Classification, SetupError> {
        let mut staged = Vec::with_capacity(install_paths.len());
        let mut violations = Vec::new();

        for path in install_paths {
            let unix = to_unix_path(path);
            match strip_segment_prefix(&unix, CMAKE_INSTALL_DIR) {
                Some(rest) => staged.push(rest.to_string()),
                None => violations.push(path.display().to_string()),
            }
        }

        if !violations.is_empty() {
            return Err(SetupError::BoundaryViolation {
                install_root: self.project_root.join(CMAKE_INSTALL_DIR),
                paths: violations,
            });
        }

        let mut result = Classification::from_declared(self.spec);
        for path in &staged {
            match self.bucket_for(path) {
                Bucket::Package { package, file } => {
                    let files = result.package_data.entry(package).or_default();
                    if !files.contains(&file) {
                        files.push(file);
                    }
                }
                Bucket::Module(module) => {
                    result.py_modules.insert(module, true);
                }
                Bucket::Script(script) => {
                    result.scripts.insert(script, true);
                }
                Bucket::DataFile { parent, file } => {
                    result.data_files.entry(parent).or_default().insert(file);
                }
            }
        }

        tracing::debug!("classified {} installed files", staged.len());
        Ok(result)
    }

    /// Decide the bucket of a path already stripped of the staging prefix.
    pub fn bucket_for(&self, staged_path: &str) -> Bucket {
        let path = self.reanchor(staged_path);

        for PackagePrefix { prefix, package } in &self.prefixes {
            if let Some(rest) = strip_segment_prefix(&path, prefix) {
                return Bucket::Package {
                    package: package.clone(),
                    file: rest.to_string(),
                };
            }
        }

        if let Some(stem) = path.strip_suffix(".py") {
            let dotted = stem.replace('/', ".");
            if self.spec.py_modules.iter().any(|m| *m == dotted) {
                return Bucket::Module(dotted);
            }
        }

        if self.scripts.contains(&path) {
            return Bucket::Script(path);
        }

        let parent = match unix_parent(&path) {
            "" => ".".to_string(),
            parent => parent.to_string(),
        };
        Bucket::DataFile {
            parent,
            file: join_unix(CMAKE_INSTALL_DIR, &path),
        }
    }

    /// Install rules of a project living in a subdirectory are relative to
    /// that subdirectory unless an install directory was configured.
    fn reanchor(&self, path: &str) -> String {
        let CMakeParams {
            source_dir,
            install_dir,
        } = &self.params;

        if install_dir.is_empty() && !source_dir.is_empty() && !starts_with_segments(path, source_dir) {
            join_unix(source_dir, path)
        } else {
            path.to_string()
        }
    }
}
