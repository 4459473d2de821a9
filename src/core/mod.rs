//! Core data structures for cmpack.
//!
//! - The `Cmpack.toml` manifest and its packaging declaration
//! - The fixed output directory layout
//! - Module records and the fatal error taxonomy

pub mod errors;
pub mod layout;
pub mod manifest;
pub mod module;
pub mod setup;

pub use errors::{BuildPhase, SetupError};
pub use layout::ProjectLayout;
pub use manifest::{CMakeParams, CMakeSection, Manifest, MANIFEST_NAME};
pub use module::{ModuleOrigin, ModuleRecord};
pub use setup::SetupSpec;
