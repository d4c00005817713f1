//! Tooling & Integration
//!
//! Command-line front end over the object client, the live value poller and
//! the watch registry.

pub mod cli;

pub use cli::{Cli, CliContext, Commands};
