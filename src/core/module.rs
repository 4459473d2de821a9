//! Importable module records produced by scanning the source and install
//! trees.

use std::fmt;

/// Which tree a module file was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ModuleOrigin {
    /// The original project sources
    Source,
    /// The CMake install staging tree (canonical)
    Install,
}

/// One importable module.
///
/// `file` is relative to the project root and identical for both trees;
/// `origin` says where it was found. A module present in both trees is
/// recorded once with [`ModuleOrigin::Install`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ModuleRecord {
    /// Owning package, empty for standalone modules
    pub package: String,
    /// Module name without extension
    pub module: String,
    /// `/`-separated path relative to the project root
    pub file: String,
    /// Tree holding the file
    pub origin: ModuleOrigin,
}

impl ModuleRecord {
    /// Create a record.
    pub fn new(
        package: impl Into<String>,
        module: impl Into<String>,
        file: impl Into<String>,
        origin: ModuleOrigin,
    ) -> Self {
        ModuleRecord {
            package: package.into(),
            module: module.into(),
            file: file.into(),
            origin,
        }
    }

    /// Fully qualified dotted name.
    pub fn qualified_name(&self) -> String {
        if self.package.is_empty() {
            self.module.clone()
        } else {
            format!("{}.{}", self.package, self.module)
        }
    }
}

impl fmt::Display for ModuleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.qualified_name(), self.file)
    }
}
