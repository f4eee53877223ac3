//! Browser sessions and the scenario harness.
//!
//! A [`Session`] bundles the driver, the shared locator table and the suite
//! settings. Page objects borrow it. [`run_scenario`] owns the lifecycle:
//! launch, reset, run the body, screenshot on failure, close on every exit
//! path (including panics from assertions, which are resumed afterwards).

use crate::artifacts;
use crate::config::SuiteConfig;
use crate::dom::ElementSnapshot;
use crate::driver::{self, BrowserDriver};
use crate::locator::{Locator, LocatorTable, PageName};
use crate::result::{E2eError, E2eResult};
use crate::wait::{wait_optional, wait_until, WaitOptions, WaitProfile};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed scenario body borrowing the session
pub type ScenarioFuture<'s> = Pin<Box<dyn Future<Output = E2eResult<()>> + 's>>;

/// How scenarios get their browser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Fresh browser per scenario
    #[default]
    Isolated,
    /// One browser for a group of scenarios, state reset between them
    Shared,
}

/// Driver, locators and settings for one browser
pub struct Session {
    driver: Box<dyn BrowserDriver>,
    locators: Arc<LocatorTable>,
    config: SuiteConfig,
    waits: WaitProfile,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("driver", &self.driver.name())
            .field("base_url", &self.config.base_url)
            .field("locators", &self.locators.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Wrap an already launched driver
    #[must_use]
    pub fn new(driver: Box<dyn BrowserDriver>, locators: Arc<LocatorTable>, config: SuiteConfig) -> Self {
        let waits = config.wait_profile();
        Self {
            driver,
            locators,
            config,
            waits,
        }
    }

    /// Launch the configured backend
    pub async fn launch(config: &SuiteConfig, locators: Arc<LocatorTable>) -> E2eResult<Self> {
        let driver = driver::launch(config.backend, &config.driver_config()).await?;
        Ok(Self::new(driver, locators, config.clone()))
    }

    /// The browser driver
    #[must_use]
    pub fn driver(&self) -> &dyn BrowserDriver {
        self.driver.as_ref()
    }

    /// Suite settings
    #[must_use]
    pub const fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Wait presets
    #[must_use]
    pub const fn waits(&self) -> &WaitProfile {
        &self.waits
    }

    /// Look up a locator
    pub fn locator(&self, page: PageName, name: &str) -> E2eResult<&Locator> {
        self.locators.get(page, name)
    }

    /// Absolute URL for an app path
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        self.config.url(path)
    }

    /// Navigate to an app path
    pub async fn goto(&self, path: &str) -> E2eResult<()> {
        let url = self.url(path);
        tracing::debug!(%url, "Navigating");
        self.driver.navigate(&url).await
    }

    /// Current page URL
    pub async fn current_url(&self) -> E2eResult<String> {
        self.driver.current_url().await
    }

    /// Current matches of a locator, no waiting
    pub async fn query(&self, page: PageName, name: &str) -> E2eResult<Vec<ElementSnapshot>> {
        let locator = self.locator(page, name)?;
        self.driver.query_all(locator).await
    }

    /// Wait until the locator matches at least one element
    pub async fn wait_for_present(
        &self,
        page: PageName,
        name: &str,
        options: &WaitOptions,
    ) -> E2eResult<Vec<ElementSnapshot>> {
        let locator = self.locator(page, name)?;
        let description = format!("{} present", locator.qualified_name());
        wait_until(options, &description, || async move {
            self.driver
                .query_all(locator)
                .await
                .map(|found| (!found.is_empty()).then_some(found))
        })
        .await
    }

    /// Wait until some match is visible; returns its index and snapshot
    pub async fn wait_for_visible(
        &self,
        page: PageName,
        name: &str,
        options: &WaitOptions,
    ) -> E2eResult<(usize, ElementSnapshot)> {
        let locator = self.locator(page, name)?;
        let description = format!("{} visible", locator.qualified_name());
        wait_until(options, &description, || async move {
            self.driver
                .query_all(locator)
                .await
                .map(|found| found.into_iter().enumerate().find(|(_, el)| el.visible))
        })
        .await
    }

    /// Wait until the locator matches nothing
    pub async fn wait_for_absent(
        &self,
        page: PageName,
        name: &str,
        options: &WaitOptions,
    ) -> E2eResult<()> {
        let locator = self.locator(page, name)?;
        let description = format!("{} absent", locator.qualified_name());
        wait_until(options, &description, || async move {
            self.driver
                .query_all(locator)
                .await
                .map(|found| found.is_empty().then_some(()))
        })
        .await
    }

    /// Wait until any of `targets` matches; returns the index of the first hit
    pub async fn wait_for_any(
        &self,
        targets: &[(PageName, &str)],
        options: &WaitOptions,
    ) -> E2eResult<usize> {
        let locators = targets
            .iter()
            .map(|(page, name)| self.locator(*page, name))
            .collect::<E2eResult<Vec<_>>>()?;
        let description = locators
            .iter()
            .map(|l| l.qualified_name())
            .collect::<Vec<_>>()
            .join(" or ");
        let locators = &locators;
        wait_until(options, &description, || async move {
            for (index, locator) in locators.iter().enumerate() {
                match self.driver.query_all(locator).await {
                    Ok(found) if !found.is_empty() => return Ok(Some(index)),
                    Ok(_) => {}
                    Err(e) => return Err(e),
                }
            }
            Ok(None)
        })
        .await
    }

    /// Probe for an element that may legitimately be missing
    pub async fn is_present(&self, page: PageName, name: &str) -> E2eResult<bool> {
        self.is_present_within(page, name, &self.waits.probe).await
    }

    /// Like [`Session::is_present`] with an explicit budget, for markers that
    /// render late
    pub async fn is_present_within(
        &self,
        page: PageName,
        name: &str,
        options: &WaitOptions,
    ) -> E2eResult<bool> {
        let locator = self.locator(page, name)?;
        let description = format!("{} present", locator.qualified_name());
        let found = wait_optional(options, &description, || async move {
            self.driver
                .query_all(locator)
                .await
                .map(|found| (!found.is_empty()).then_some(()))
        })
        .await?;
        Ok(found.is_some())
    }

    /// Wait until the current URL satisfies `accept`; returns it
    pub async fn wait_for_url<P>(
        &self,
        options: &WaitOptions,
        description: &str,
        accept: P,
    ) -> E2eResult<String>
    where
        P: Fn(&str) -> bool,
    {
        let accept = &accept;
        wait_until(options, description, || async move {
            self.driver
                .current_url()
                .await
                .map(|url| accept(&url).then_some(url))
        })
        .await
    }

    /// Click the `index`-th match, retrying while it is missing, detached or
    /// disabled. A budget spent only on such failures becomes
    /// [`E2eError::InteractionFailed`].
    pub async fn click_when_ready(
        &self,
        page: PageName,
        name: &str,
        index: usize,
        options: &WaitOptions,
    ) -> E2eResult<()> {
        let locator = self.locator(page, name)?;
        let mut attempts = 0u32;
        let description = format!("click {}[{index}]", locator.qualified_name());
        let result = wait_until(options, &description, || {
            attempts += 1;
            async move { self.driver.click(locator, index).await.map(Some) }
        })
        .await;
        promote_timeout(result, locator, attempts)
    }

    /// Fill the `index`-th match, retrying like [`Self::click_when_ready`]
    pub async fn fill_when_ready(
        &self,
        page: PageName,
        name: &str,
        index: usize,
        text: &str,
        options: &WaitOptions,
    ) -> E2eResult<()> {
        let locator = self.locator(page, name)?;
        let mut attempts = 0u32;
        let description = format!("fill {}[{index}]", locator.qualified_name());
        let result = wait_until(options, &description, || {
            attempts += 1;
            async move { self.driver.fill(locator, index, text).await.map(Some) }
        })
        .await;
        promote_timeout(result, locator, attempts)
    }

    /// Scroll the `index`-th match into view
    pub async fn scroll_into_view(&self, page: PageName, name: &str, index: usize) -> E2eResult<()> {
        let locator = self.locator(page, name)?;
        self.driver.scroll_into_view(locator, index).await
    }

    /// Wait for a dialog to have been accepted; `None` if none opened
    pub async fn accept_dialog(&self, options: &WaitOptions) -> E2eResult<Option<String>> {
        let message = wait_optional(options, "confirmation dialog", || async move {
            self.driver.take_dialog().await
        })
        .await?;
        if let Some(ref text) = message {
            tracing::info!(%text, "Dialog accepted");
        }
        Ok(message)
    }

    /// Delete cookies and clear local storage of the current origin
    pub async fn reset_state(&self) -> E2eResult<()> {
        self.driver.clear_cookies().await?;
        if let Err(e) = self.driver.clear_local_storage().await {
            tracing::debug!(error = %e, "localStorage not cleared");
        }
        Ok(())
    }

    /// Screenshot into the artifacts directory, bounded by the artifact
    /// timeout. Failures are logged and swallowed.
    pub async fn capture_failure_artifact(&self, test_id: &str) -> Option<PathBuf> {
        let capture = artifacts::capture(self.driver(), &self.config.artifacts_dir, test_id);
        match tokio::time::timeout(self.config.artifact_timeout(), capture).await {
            Ok(Ok(path)) => {
                tracing::info!(test_id, path = %path.display(), "Saved failure screenshot");
                Some(path)
            }
            Ok(Err(e)) => {
                tracing::warn!(test_id, error = %e, "Failure screenshot not saved");
                None
            }
            Err(_) => {
                tracing::warn!(test_id, "Failure screenshot timed out");
                None
            }
        }
    }

    /// Close the browser
    pub async fn close(&self) -> E2eResult<()> {
        self.driver.close().await
    }
}

fn promote_timeout(result: E2eResult<()>, locator: &Locator, attempts: u32) -> E2eResult<()> {
    match result {
        Err(E2eError::Timeout { last_outcome, .. }) => Err(E2eError::InteractionFailed {
            target: locator.qualified_name(),
            attempts,
            message: last_outcome,
        }),
        other => other,
    }
}

async fn run_body<F>(session: &Session, test_id: &str, body: F) -> E2eResult<()>
where
    F: for<'s> FnOnce(&'s Session) -> ScenarioFuture<'s>,
{
    let outcome = AssertUnwindSafe(async {
        session.reset_state().await?;
        body(session).await
    })
    .catch_unwind()
    .await;

    match outcome {
        Ok(Ok(())) => {
            tracing::info!(test_id, "Scenario passed");
            Ok(())
        }
        Ok(Err(e)) => {
            tracing::warn!(test_id, error = %e, "Scenario failed");
            session.capture_failure_artifact(test_id).await;
            Err(e)
        }
        Err(panic) => {
            tracing::warn!(test_id, "Scenario panicked");
            session.capture_failure_artifact(test_id).await;
            std::panic::resume_unwind(panic)
        }
    }
}

/// Run `body` on `session`, then close it whatever happened
pub async fn run_with<F>(session: Session, test_id: &str, body: F) -> E2eResult<()>
where
    F: for<'s> FnOnce(&'s Session) -> ScenarioFuture<'s>,
{
    tracing::info!(test_id, backend = session.driver().name(), "Scenario started");
    let outcome = AssertUnwindSafe(run_body(&session, test_id, body))
        .catch_unwind()
        .await;
    if let Err(e) = session.close().await {
        tracing::warn!(test_id, error = %e, "Browser did not close cleanly");
    }
    match outcome {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

/// Launch a fresh browser, run `body`, close the browser
pub async fn run_scenario<F>(
    config: &SuiteConfig,
    locators: Arc<LocatorTable>,
    test_id: &str,
    body: F,
) -> E2eResult<()>
where
    F: for<'s> FnOnce(&'s Session) -> ScenarioFuture<'s>,
{
    let session = Session::launch(config, locators).await?;
    run_with(session, test_id, body).await
}

/// One browser reused by a group of scenarios.
///
/// Launched lazily on first use. Each scenario starts with cookies and
/// local storage cleared; cart and review state are the scenario's job.
/// The session lives on the runtime that launched it, so a group must run
/// inside a single test function.
pub struct SharedSession {
    config: SuiteConfig,
    locators: Arc<LocatorTable>,
    slot: tokio::sync::Mutex<Option<Session>>,
}

impl fmt::Debug for SharedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSession")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl SharedSession {
    /// Shared session launched on first use
    #[must_use]
    pub fn new(config: SuiteConfig, locators: Arc<LocatorTable>) -> Self {
        Self {
            config,
            locators,
            slot: tokio::sync::Mutex::new(None),
        }
    }

    /// Shared session around an existing browser
    #[must_use]
    pub fn from_session(session: Session) -> Self {
        Self {
            config: session.config.clone(),
            locators: Arc::clone(&session.locators),
            slot: tokio::sync::Mutex::new(Some(session)),
        }
    }

    /// Run one scenario on the shared browser
    pub async fn run<F>(&self, test_id: &str, body: F) -> E2eResult<()>
    where
        F: for<'s> FnOnce(&'s Session) -> ScenarioFuture<'s>,
    {
        let mut slot = self.slot.lock().await;
        let session = match slot.take() {
            Some(session) => session,
            None => Session::launch(&self.config, Arc::clone(&self.locators)).await?,
        };
        let session = slot.insert(session);
        tracing::info!(test_id, backend = session.driver().name(), "Shared scenario started");
        run_body(session, test_id, body).await
    }

    /// Close the browser if it was launched
    pub async fn close(&self) -> E2eResult<()> {
        match self.slot.lock().await.take() {
            Some(session) => session.close().await,
            None => Ok(()),
        }
    }
}

/// Runs scenarios in the configured [`SessionMode`]
#[derive(Debug)]
pub struct ScenarioRunner {
    config: SuiteConfig,
    locators: Arc<LocatorTable>,
    shared: SharedSession,
}

impl ScenarioRunner {
    /// Runner with locators loaded from the configured overrides file
    pub fn new(config: SuiteConfig) -> E2eResult<Self> {
        let locators = Arc::new(LocatorTable::load(config.locators_file.as_deref())?);
        Ok(Self::with_locators(config, locators))
    }

    /// Runner with an explicit locator table
    #[must_use]
    pub fn with_locators(config: SuiteConfig, locators: Arc<LocatorTable>) -> Self {
        let shared = SharedSession::new(config.clone(), Arc::clone(&locators));
        Self {
            config,
            locators,
            shared,
        }
    }

    /// Suite settings
    #[must_use]
    pub const fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Run one scenario
    pub async fn run<F>(&self, test_id: &str, body: F) -> E2eResult<()>
    where
        F: for<'s> FnOnce(&'s Session) -> ScenarioFuture<'s>,
    {
        match self.config.session_mode {
            SessionMode::Isolated => {
                run_scenario(&self.config, Arc::clone(&self.locators), test_id, body).await
            }
            SessionMode::Shared => self.shared.run(test_id, body).await,
        }
    }

    /// Close the shared browser, if any
    pub async fn finish(&self) -> E2eResult<()> {
        self.shared.close().await
    }
}
