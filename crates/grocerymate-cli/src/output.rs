//! Status lines and document output

use console::{style, Term};
use serde::Serialize;

use crate::error::CliResult;

/// Format for structured output on stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// YAML, the same shape the suite reads
    #[default]
    Yaml,
    /// Pretty-printed JSON
    Json,
}

/// Render a value in the requested format
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> CliResult<String> {
    Ok(match format {
        OutputFormat::Yaml => serde_yaml_ng::to_string(value)?,
        OutputFormat::Json => {
            let mut out = serde_json::to_string_pretty(value)?;
            out.push('\n');
            out
        }
    })
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Pass,
    Fail,
    Warn,
    Info,
}

fn prefix(kind: Kind, use_color: bool) -> String {
    match (kind, use_color) {
        (Kind::Pass, true) => style("✓").green().bold().to_string(),
        (Kind::Fail, true) => style("✗").red().bold().to_string(),
        (Kind::Warn, true) => style("⚠").yellow().bold().to_string(),
        (Kind::Info, true) => style("ℹ").blue().bold().to_string(),
        (Kind::Pass, false) => "PASS".to_string(),
        (Kind::Fail, false) => "FAIL".to_string(),
        (Kind::Warn, false) => "WARN".to_string(),
        (Kind::Info, false) => "INFO".to_string(),
    }
}

/// Writes status lines to stderr, documents to stdout
#[derive(Debug)]
pub struct Reporter {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Reporter {
    /// Create a new reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            use_color,
            quiet,
        }
    }

    fn line(&self, kind: Kind, message: &str) {
        let _ = self
            .term
            .write_line(&format!("{} {message}", prefix(kind, self.use_color)));
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if !self.quiet {
            self.line(Kind::Pass, message);
        }
    }

    /// Print a failure message, even in quiet mode
    pub fn failure(&self, message: &str) {
        self.line(Kind::Fail, message);
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if !self.quiet {
            self.line(Kind::Warn, message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if !self.quiet {
            self.line(Kind::Info, message);
        }
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }
        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };
        let _ = self.term.write_line(&styled);
    }

    /// Write a rendered document to stdout
    pub fn document(&self, text: &str) -> CliResult<()> {
        Term::stdout().write_str(text)?;
        Ok(())
    }
}
