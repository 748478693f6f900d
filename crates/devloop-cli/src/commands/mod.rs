//! Command implementations for the devloop CLI.
//!
//! - [`dev`] - Watch, rebuild and serve with hot reload
//! - [`build`] - Run the build pipeline once
//!
//! Each command provides an `execute` function that takes the parsed
//! command arguments and returns a Result.

pub mod build;
pub mod dev;
pub(crate) mod utils;

pub use build::execute as build_execute;
pub use dev::execute as dev_execute;
