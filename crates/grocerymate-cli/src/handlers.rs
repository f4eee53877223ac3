//! Subcommand implementations

use crate::commands::{CheckConfigArgs, LocatorsArgs, SmokeArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{render, Reporter};
use grocerymate_e2e::{
    script, E2eError, E2eResult, Locator, LocatorTable, PageName, ScenarioRunner, Session,
    SuiteConfig,
};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};

/// Words one of which the storefront title must contain
pub const TITLE_KEYWORDS: [&str; 3] = ["grocery", "market", "mate"];

fn load_suite(config: &CliConfig) -> CliResult<SuiteConfig> {
    Ok(SuiteConfig::load_from(config.config_file.as_deref())?)
}

#[derive(Debug, Serialize)]
struct EffectiveConfig<'a> {
    #[serde(flatten)]
    settings: &'a SuiteConfig,
    credentials: &'static str,
    backend_available: bool,
    locator_count: usize,
}

/// Resolve settings the way the suite does and print them
pub fn check_config(config: &CliConfig, args: &CheckConfigArgs, reporter: &Reporter) -> CliResult<()> {
    let suite = load_suite(config)?;
    let locators = LocatorTable::load(suite.locators_file.as_deref())?;
    tracing::debug!(
        base_url = %suite.base_url,
        backend = %suite.backend,
        locators = locators.len(),
        "Settings resolved"
    );

    let effective = EffectiveConfig {
        settings: &suite,
        credentials: if suite.credentials().is_some() { "set" } else { "not set" },
        backend_available: suite.backend.is_available(),
        locator_count: locators.len(),
    };
    reporter.document(&render(&effective, args.format.into())?)?;

    if suite.credentials().is_none() {
        reporter.warning("USER_EMAIL / USER_PASSWORD not set; authenticated scenarios will skip");
    }
    if !suite.backend.is_available() {
        reporter.warning(&format!(
            "backend {} is not compiled into this build",
            suite.backend
        ));
    }
    reporter.success(&format!("Settings valid for {}", suite.base_url));
    Ok(())
}

#[derive(Debug, Serialize)]
struct LocatorDump<'a> {
    locators: Vec<&'a Locator>,
}

/// Locators visible from `page`: its own plus the shared ones
pub fn visible_locators(table: &LocatorTable, page: Option<PageName>) -> Vec<&Locator> {
    table
        .iter()
        .filter(|l| page.is_none() || l.scope.is_none() || l.scope == page)
        .collect()
}

/// Print the built-in table with overrides applied
pub fn locators(config: &CliConfig, args: &LocatorsArgs, reporter: &Reporter) -> CliResult<()> {
    let suite = load_suite(config)?;
    let table = LocatorTable::load(suite.locators_file.as_deref())?;
    let dump = LocatorDump {
        locators: visible_locators(&table, args.page),
    };
    reporter.document(&render(&dump, args.format.into())?)?;
    if config.verbosity.is_verbose() {
        reporter.info(&format!("{} of {} locators", dump.locators.len(), table.len()));
    }
    Ok(())
}

/// What the home page probe saw
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmokeReport {
    /// URL after navigation
    pub url: String,
    /// `document.title`
    pub title: String,
    /// Number of `h1` elements
    pub headings: usize,
}

/// Open `/`, wait for a heading and check the title
pub async fn home_page_probe(session: &Session) -> E2eResult<SmokeReport> {
    session.goto("/").await?;
    let headings = session
        .wait_for_present(PageName::Home, "heading", &session.waits().long)
        .await?;
    let title = session.driver().execute_script(script::DOCUMENT_TITLE).await?;
    let title = title.as_str().unwrap_or_default().to_string();
    let lowered = title.to_lowercase();
    if !TITLE_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return Err(E2eError::parse("storefront title", title));
    }
    let report = SmokeReport {
        url: session.current_url().await?,
        title,
        headings: headings.len(),
    };
    tracing::info!(title = %report.title, headings = report.headings, "Home page looks right");
    Ok(report)
}

/// Launch a browser and run [`home_page_probe`]
pub async fn smoke(config: &CliConfig, args: &SmokeArgs, reporter: &Reporter) -> CliResult<()> {
    let mut suite = load_suite(config)?;
    if let Some(ref url) = args.base_url {
        suite = suite.with_base_url(url.clone());
    }
    if let Some(backend) = args.backend {
        suite = suite.with_backend(backend);
    }
    if args.headed {
        suite.headless = false;
    }
    suite.validate()?;
    if !suite.backend.is_available() {
        return Err(CliError::config(format!(
            "backend {} is not compiled in; rebuild with --features {}",
            suite.backend,
            match suite.backend {
                grocerymate_e2e::Backend::Chromium => "browser",
                grocerymate_e2e::Backend::Playwright => "playwright",
            }
        )));
    }

    reporter.header(&format!("Smoke: {}", suite.base_url));
    tracing::info!(base_url = %suite.base_url, backend = %suite.backend, headless = suite.headless, "Starting smoke probe");
    let runner = ScenarioRunner::new(suite)?;
    let seen: Arc<Mutex<Option<SmokeReport>>> = Arc::default();
    let slot = Arc::clone(&seen);
    let outcome = runner
        .run("cli::smoke", move |s| {
            Box::pin(async move {
                let report = home_page_probe(s).await?;
                *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(report);
                Ok(())
            })
        })
        .await;
    runner.finish().await?;
    outcome.map_err(|e| CliError::smoke_failed(e.to_string()))?;

    let report = seen.lock().unwrap_or_else(PoisonError::into_inner).take();
    if let Some(report) = report {
        reporter.success(&format!(
            "{:?} with {} heading(s) at {}",
            report.title, report.headings, report.url
        ));
    }
    Ok(())
}
