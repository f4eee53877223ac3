//! grocerymate CLI library
//!
//! Helpers around the GroceryMate E2E suite: show the resolved settings,
//! dump the locator table and run a one-page smoke probe without going
//! through `cargo test`.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

mod commands;
mod config;
mod error;
pub mod handlers;
mod output;

pub use commands::{
    CheckConfigArgs, Cli, ColorArg, Commands, FormatArg, LocatorsArgs, SmokeArgs,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{render, OutputFormat, Reporter};
