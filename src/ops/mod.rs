//! High-level operations.
//!
//! This module contains the setup pipeline: argument handling, install
//! classification, module consolidation and the final hand-off.

pub mod args;
pub mod classify;
pub mod consolidate;
pub mod handoff;
pub mod module_finder;
pub mod setup;

pub use args::{split_arg_sets, ArgSets, SetupCommandLine};
pub use classify::{collect_package_prefixes, Classification, Classifier, PackagePrefix};
pub use consolidate::{plan_consolidation, ConsolidationPlan, CopyAction};
pub use handoff::{Handoff, SetupOutput};
pub use module_finder::ModuleFinder;
pub use setup::{setup, SetupOptions};
