//! Native build driver.
//!
//! This module runs CMake against the project: picking a generator that
//! works on this host, describing the Python interpreter to the build,
//! configuring, building the `install` target and reading back what was
//! installed.

pub mod cmake;
pub mod generator;
pub mod install_manifest;
pub mod python;

pub use cmake::{pop_arg, CMaker, ConfigureOptions};
pub use generator::CMakePlatform;
pub use python::PythonInfo;
