//! Command-line front end for EConBadge.
//!
//! Parses arguments with clap, loads a [`ecb_client::ClientConfig`] and runs
//! one badge operation per invocation.

pub mod args;
pub mod commands;
pub mod error;

pub use args::{CliArgs, CliCommand, LedAction};
pub use commands::{execute, load_config, run};
pub use error::CliError;
