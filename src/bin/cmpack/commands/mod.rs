//! Command implementations

pub mod setup;
