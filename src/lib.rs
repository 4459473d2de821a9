//! cmpack - CMake-driven builds for Python distributions
//!
//! This crate provides the library behind the `cmpack` binary: it runs a
//! project's CMake build, sorts what the build installed into the
//! packaging configuration and hands that configuration to the packaging
//! tool.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

/// Test utilities for cmpack unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides on-disk project fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{errors::SetupError, layout::ProjectLayout, manifest::Manifest, setup::SetupSpec};

pub use ops::{setup, SetupOptions};
pub use util::context::GlobalContext;
