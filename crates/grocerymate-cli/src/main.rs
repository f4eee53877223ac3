//! grocerymate: command-line helpers for the GroceryMate E2E suite
//!
//! ## Usage
//!
//! ```bash
//! grocerymate check-config                 # Resolved settings, credentials redacted
//! grocerymate locators --page checkout     # Locator table as YAML
//! grocerymate smoke --headed               # Open the home page in a browser
//! ```

use clap::Parser;
use grocerymate_cli::{handlers, Cli, CliConfig, CliResult, Commands, Reporter, Verbosity};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    grocerymate_e2e::logging::init_with(config.verbosity.log_directive());
    let reporter = Reporter::new(config.color.should_color(), config.verbosity.is_quiet());

    match cli.command {
        Commands::CheckConfig(args) => handlers::check_config(&config, &args, &reporter),
        Commands::Locators(args) => handlers::locators(&config, &args, &reporter),
        Commands::Smoke(args) => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(handlers::smoke(&config, &args, &reporter))
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.into())
        .with_config_file(cli.config.clone())
}
