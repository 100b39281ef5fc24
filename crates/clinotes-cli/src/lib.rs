//! Clinotes CLI library.
//!
//! This library provides the core functionality for the clinotes command-line
//! interface: configuration resolution, note loading, batch execution,
//! result export and output formatting.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod export;
pub mod input;
pub mod output;

pub use cli::{Cli, Command};
pub use config::Config;
pub use error::{CliError, Result};
pub use output::Formatter;
