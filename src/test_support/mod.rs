//! Test utilities for cmpack unit tests.
//!
//! Fixtures lay out small projects on disk: a `Cmpack.toml`, Python
//! sources and, when a test needs it, a pre-populated install staging tree
//! with the matching install manifest.
//!
//! # Example
//!
//! ```rust,ignore
//! use cmpack::test_support::ProjectFixture;
//!
//! let tmp = tempfile::TempDir::new()?;
//! let root = ProjectFixture::python_package("hello")
//!     .with_installed("hello/_hello.so", "")
//!     .write_to(tmp.path())?;
//! ```

pub mod fixtures;

pub use fixtures::*;
