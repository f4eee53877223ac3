//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use grocerymate_e2e::{Backend, PageName};
use std::path::PathBuf;

/// grocerymate: inspect and probe the GroceryMate E2E suite setup
#[derive(Parser, Debug)]
#[command(name = "grocerymate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Suite settings file (overrides GROCERYMATE_CONFIG)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve suite settings and print them with credentials redacted
    CheckConfig(CheckConfigArgs),

    /// Print the effective locator table
    Locators(LocatorsArgs),

    /// Open the home page in a browser and check title and heading
    Smoke(SmokeArgs),
}

/// Arguments for the check-config command
#[derive(Parser, Debug)]
pub struct CheckConfigArgs {
    /// Output format
    #[arg(long, default_value = "yaml")]
    pub format: FormatArg,
}

/// Arguments for the locators command
#[derive(Parser, Debug)]
pub struct LocatorsArgs {
    /// Only locators scoped to this page (shared locators are always listed)
    #[arg(long, value_parser = parse_page)]
    pub page: Option<PageName>,

    /// Output format
    #[arg(long, default_value = "yaml")]
    pub format: FormatArg,
}

/// Arguments for the smoke command
#[derive(Parser, Debug)]
pub struct SmokeArgs {
    /// Storefront origin
    #[arg(long, env = "GROCERYMATE_BASE_URL")]
    pub base_url: Option<String>,

    /// Browser backend
    #[arg(long, value_parser = parse_backend)]
    pub backend: Option<Backend>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,
}

fn parse_page(raw: &str) -> Result<PageName, String> {
    raw.parse().map_err(|e: grocerymate_e2e::E2eError| e.to_string())
}

fn parse_backend(raw: &str) -> Result<Backend, String> {
    raw.parse().map_err(|e: grocerymate_e2e::E2eError| e.to_string())
}

/// Structured output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormatArg {
    /// YAML
    #[default]
    Yaml,
    /// JSON
    Json,
}

impl From<FormatArg> for crate::output::OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Yaml => Self::Yaml,
            FormatArg::Json => Self::Json,
        }
    }
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
