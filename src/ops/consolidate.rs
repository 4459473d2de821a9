//! Folding source-tree modules into the install staging tree.
//!
//! The packaging tool knows one directory per package. Once the install
//! tree is picked as that directory, every module that only exists in the
//! source tree has to be copied over and listed in the package data.
//!
//! Planning is pure: [`plan_consolidation`] returns the copies to make and
//! the resulting package data. [`ConsolidationPlan::apply`] performs the
//! copies. Copies already made are not rolled back if a later one fails.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::errors::SetupError;
use crate::core::layout::CMAKE_INSTALL_DIR;
use crate::core::module::{ModuleOrigin, ModuleRecord};
use crate::core::setup::SetupSpec;
use crate::ops::module_finder::ModuleFinder;
use crate::util::fs::{copy_file_with_parents, join_unix, strip_segment_prefix};

/// One module file to copy from the source tree into the install tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyAction {
    pub module: ModuleRecord,
    /// Absolute source file
    pub from: PathBuf,
    /// Absolute destination under the install staging directory
    pub to: PathBuf,
}

/// Copies to perform and the package data once they are done.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsolidationPlan {
    pub copies: Vec<CopyAction>,
    pub package_data: BTreeMap<String, Vec<String>>,
}

impl ConsolidationPlan {
    /// Nothing to copy.
    pub fn is_empty(&self) -> bool {
        self.copies.is_empty()
    }

    /// Perform the copies in order, reporting each through `on_copy`
    /// together with whether a destination directory had to be created.
    pub fn apply(&self, mut on_copy: impl FnMut(&CopyAction, bool)) -> Result<()> {
        for copy in &self.copies {
            let created_dir = copy_file_with_parents(&copy.from, &copy.to)?;
            on_copy(copy, created_dir);
        }
        Ok(())
    }
}

/// Path of a module file relative to its package directory, as package
/// data lists it.
///
/// Files are stripped of the package directory first and, failing that, of
/// the native source directory plus the package name segments.
/// Standalone modules are not stripped.
pub fn strip_package(
    record: &ModuleRecord,
    package_dir: &str,
    source_dir: &str,
) -> String {
    if record.package.is_empty() {
        return record.file.clone();
    }

    if let Some(rest) = strip_segment_prefix(&record.file, package_dir) {
        return rest.to_string();
    }

    let package_path = join_unix(source_dir, &record.package.replace('.', "/"));
    match strip_segment_prefix(&record.file, &package_path) {
        Some(rest) => rest.to_string(),
        None => record.file.clone(),
    }
}

/// Work out which modules to copy so every package is complete in the
/// install tree.
///
/// `package_data` is the classifier's output; the returned plan carries an
/// updated copy.
pub fn plan_consolidation(
    spec: &SetupSpec,
    project_root: &Path,
    source_dir: &str,
    package_data: &BTreeMap<String, Vec<String>>,
) -> Result<ConsolidationPlan, SetupError> {
    let modules = ModuleFinder::new(spec, project_root).find_all_modules()?;
    Ok(plan_for_modules(spec, project_root, source_dir, package_data, modules))
}

fn plan_for_modules(
    spec: &SetupSpec,
    project_root: &Path,
    source_dir: &str,
    package_data: &BTreeMap<String, Vec<String>>,
    modules: Vec<ModuleRecord>,
) -> ConsolidationPlan {
    let mut plan = ConsolidationPlan {
        copies: Vec::new(),
        package_data: package_data.clone(),
    };

    for module in modules {
        let package_dir = spec.package_directory(&module.package);
        let stripped = strip_package(&module, &package_dir, source_dir);

        let listed = plan
            .package_data
            .get(&module.package)
            .is_some_and(|files| files.contains(&stripped));
        if listed {
            continue;
        }

        match module.origin {
            ModuleOrigin::Source => {
                tracing::debug!("{} is missing from the install tree", module);
                plan.copies.push(CopyAction {
                    from: project_root.join(&module.file),
                    to: project_root.join(CMAKE_INSTALL_DIR).join(&module.file),
                    module: module.clone(),
                });
            }
            ModuleOrigin::Install => {
                tracing::debug!("{} already staged, listing it", module);
            }
        }

        plan.package_data
            .entry(module.package.clone())
            .or_default()
            .push(stripped);
    }

    plan
}
