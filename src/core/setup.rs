//! The packaging declaration: packages, modules, scripts and data files as
//! the packaging tool's `setup()` call would receive them.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::util::fs::{join_unix, normalize_rel_dir};

/// Declared packaging configuration, read from the `[setup]` table.
///
/// This is an immutable snapshot: classification and consolidation read it
/// and return fresh results instead of editing it in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SetupSpec {
    /// Dotted package names
    pub packages: Vec<String>,

    /// Package name -> source directory (`""` key is the root package dir)
    pub package_dir: BTreeMap<String, String>,

    /// Package name -> files relative to the package directory
    pub package_data: BTreeMap<String, Vec<String>>,

    /// Standalone module names
    pub py_modules: Vec<String>,

    /// Script paths relative to the project root
    pub scripts: Vec<String>,

    /// Install directory -> files relative to the project root
    pub data_files: BTreeMap<String, Vec<String>>,

    /// Packaging command to hand the final configuration to
    pub command: Vec<String>,
}

impl SetupSpec {
    /// Directory holding `package`, relative to the project root.
    ///
    /// An explicit entry wins. Otherwise the nearest declared ancestor
    /// (down to the root entry `""`) is extended with the remaining name
    /// segments, and without any ancestor the dotted name maps to a path.
    pub fn package_directory(&self, package: &str) -> String {
        if let Some(dir) = self.package_dir.get(package) {
            return normalize_rel_dir(dir);
        }

        let parts: Vec<&str> = package.split('.').filter(|p| !p.is_empty()).collect();
        for split in (0..parts.len()).rev() {
            let ancestor = parts[..split].join(".");
            if let Some(dir) = self.package_dir.get(&ancestor) {
                return join_unix(&normalize_rel_dir(dir), &parts[split..].join("/"));
            }
        }

        parts.join("/")
    }

    /// Directory of every declared package.
    pub fn resolved_package_dirs(&self) -> BTreeMap<String, String> {
        self.packages
            .iter()
            .map(|package| (package.clone(), self.package_directory(package)))
            .collect()
    }

    /// Declared data files keyed by parent directory, with the empty parent
    /// spelled `"."`.
    pub fn declared_data_files(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut data_files: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (parent, files) in &self.data_files {
            let key = if parent.is_empty() { "." } else { parent.as_str() };
            data_files
                .entry(key.to_string())
                .or_default()
                .extend(files.iter().cloned());
        }
        data_files
    }

    /// Scripts normalized to `/`-form.
    pub fn normalized_scripts(&self) -> Vec<String> {
        self.scripts.iter().map(|s| normalize_rel_dir(s)).collect()
    }
}
