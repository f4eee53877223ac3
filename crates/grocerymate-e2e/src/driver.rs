//! BrowserDriver - backend-neutral browser automation trait
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  BrowserDriver (object-safe, &self)                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ChromiumDriver      PlaywrightDriver        MockDriver          │
//! │  CDP via             Playwright server       scripted DOM for    │
//! │  chromiumoxide       via playwright-rs       unit tests          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Page objects only ever see `&dyn BrowserDriver`. Elements are addressed by
//! [`Locator`] plus match index and come back as [`ElementSnapshot`]s, so no
//! backend-specific handle leaks into the page layer.

use crate::dom::ElementSnapshot;
use crate::locator::Locator;
use crate::result::{E2eError, E2eResult};
use crate::script;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Which automation library drives the browser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Chrome DevTools Protocol (feature `browser`)
    #[default]
    Chromium,
    /// Playwright server (feature `playwright`)
    Playwright,
}

impl Backend {
    /// Whether this build can launch the backend
    #[must_use]
    pub const fn is_available(self) -> bool {
        match self {
            Self::Chromium => cfg!(feature = "browser"),
            Self::Playwright => cfg!(feature = "playwright"),
        }
    }

    /// Cargo feature that enables the backend
    #[must_use]
    pub const fn feature(self) -> &'static str {
        match self {
            Self::Chromium => "browser",
            Self::Playwright => "playwright",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chromium => f.write_str("chromium"),
            Self::Playwright => f.write_str("playwright"),
        }
    }
}

impl FromStr for Backend {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chromium" | "chrome" | "cdp" => Ok(Self::Chromium),
            "playwright" | "pw" => Ok(Self::Playwright),
            other => Err(E2eError::config(format!("unknown backend {other:?}"))),
        }
    }
}

/// Browser launch settings
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Run without a visible window
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Browser executable override
    pub executable_path: Option<PathBuf>,
    /// Budget for launching the browser
    pub launch_timeout: Duration,
    /// Budget for a single navigation
    pub navigation_timeout: Duration,
    /// Pass `--no-sandbox` (containers, CI)
    pub no_sandbox: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1366,
            viewport_height: 820,
            executable_path: None,
            launch_timeout: Duration::from_secs(30),
            navigation_timeout: Duration::from_secs(30),
            no_sandbox: true,
        }
    }
}

impl DriverConfig {
    /// Create new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set headless mode
    #[must_use]
    pub const fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set browser executable
    #[must_use]
    pub fn executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable_path = Some(path.into());
        self
    }

    /// Set navigation timeout
    #[must_use]
    pub const fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// Toggle `--no-sandbox`
    #[must_use]
    pub const fn no_sandbox(mut self, no_sandbox: bool) -> Self {
        self.no_sandbox = no_sandbox;
        self
    }
}

/// Browser operations the page objects need.
///
/// Actions on a missing, detached or disabled element fail with
/// [`E2eError::TransientInteraction`] so polling waits can retry them.
/// JavaScript dialogs are accepted as they open; their messages queue up
/// for [`BrowserDriver::take_dialog`].
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Navigate to an absolute URL
    async fn navigate(&self, url: &str) -> E2eResult<()>;

    /// Current page URL
    async fn current_url(&self) -> E2eResult<String>;

    /// Reload the current page
    async fn reload(&self) -> E2eResult<()>;

    /// Snapshot every element the locator currently matches
    async fn query_all(&self, locator: &Locator) -> E2eResult<Vec<ElementSnapshot>>;

    /// Click the `index`-th match
    async fn click(&self, locator: &Locator, index: usize) -> E2eResult<()>;

    /// Replace the value of the `index`-th match
    async fn fill(&self, locator: &Locator, index: usize, text: &str) -> E2eResult<()>;

    /// Scroll the `index`-th match into view
    async fn scroll_into_view(&self, locator: &Locator, index: usize) -> E2eResult<()>;

    /// Evaluate a JavaScript expression
    async fn execute_script(&self, script: &str) -> E2eResult<serde_json::Value>;

    /// Delete all cookies
    async fn clear_cookies(&self) -> E2eResult<()>;

    /// Clear `localStorage` of the current origin
    async fn clear_local_storage(&self) -> E2eResult<()> {
        let outcome = self.execute_script(script::CLEAR_LOCAL_STORAGE).await?;
        match outcome.as_str() {
            Some("ok") => Ok(()),
            _ => Err(E2eError::driver("localStorage unavailable on this page")),
        }
    }

    /// Pop the oldest accepted dialog message
    async fn take_dialog(&self) -> E2eResult<Option<String>>;

    /// PNG of the whole page
    async fn screenshot_full_page(&self) -> E2eResult<Vec<u8>>;

    /// Close the browser
    async fn close(&self) -> E2eResult<()>;
}

/// Launch the configured backend
pub async fn launch(backend: Backend, config: &DriverConfig) -> E2eResult<Box<dyn BrowserDriver>> {
    tracing::info!(%backend, headless = config.headless, "Launching browser");
    match backend {
        #[cfg(feature = "browser")]
        Backend::Chromium => Ok(Box::new(crate::cdp::ChromiumDriver::launch(config).await?)),
        #[cfg(feature = "playwright")]
        Backend::Playwright => Ok(Box::new(
            crate::playwright::PlaywrightDriver::launch(config).await?,
        )),
        #[allow(unreachable_patterns)]
        other => Err(E2eError::BrowserLaunch {
            message: format!(
                "backend {other} needs the `{}` feature of grocerymate-e2e",
                other.feature()
            ),
        }),
    }
}

// =============================================================================
// MOCK DRIVER
// =============================================================================

/// Mutation applied to the mock page when an element is clicked or filled.
/// Receives the index of the element acted on.
pub type MockEffect = Arc<dyn Fn(&mut MockPage, usize) + Send + Sync>;

#[derive(Debug, Clone)]
struct Delayed {
    key: String,
    elements: Vec<ElementSnapshot>,
    queries_left: u32,
}

/// Scripted DOM behind [`MockDriver`], keyed by qualified locator name
#[derive(Default)]
pub struct MockPage {
    url: String,
    elements: HashMap<String, Vec<ElementSnapshot>>,
    delayed: Vec<Delayed>,
    on_click: HashMap<String, Vec<MockEffect>>,
    on_fill: HashMap<String, Vec<MockEffect>>,
    failing_clicks: HashMap<String, u32>,
    dialogs: VecDeque<String>,
    scripts: Vec<(String, serde_json::Value)>,
    screenshot: Option<Vec<u8>>,
    screenshot_delay: Option<Duration>,
    history: Vec<String>,
    closed: bool,
}

impl fmt::Debug for MockPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockPage")
            .field("url", &self.url)
            .field("elements", &self.elements.keys().collect::<Vec<_>>())
            .field("dialogs", &self.dialogs)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl MockPage {
    /// Current URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Change the URL, as a redirect would
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    /// Replace the matches of a locator
    pub fn set(&mut self, key: &str, elements: Vec<ElementSnapshot>) {
        self.delayed.retain(|d| d.key != key);
        self.elements.insert(key.to_string(), elements);
    }

    /// Make elements appear after the locator has been queried `queries` more times
    pub fn set_after(&mut self, key: &str, elements: Vec<ElementSnapshot>, queries: u32) {
        self.delayed.push(Delayed {
            key: key.to_string(),
            elements,
            queries_left: queries,
        });
    }

    /// Remove every match of a locator
    pub fn clear(&mut self, key: &str) {
        self.elements.remove(key);
    }

    /// Current matches of a locator
    #[must_use]
    pub fn get(&self, key: &str) -> &[ElementSnapshot] {
        self.elements.get(key).map_or(&[], Vec::as_slice)
    }

    /// Mutable matches of a locator
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Vec<ElementSnapshot>> {
        self.elements.get_mut(key)
    }

    /// Queue a dialog as if the page had opened one
    pub fn open_dialog(&mut self, message: impl Into<String>) {
        self.dialogs.push_back(message.into());
    }

    fn query(&mut self, key: &str) -> Vec<ElementSnapshot> {
        let mut ready = Vec::new();
        for d in &mut self.delayed {
            if d.key == key {
                d.queries_left = d.queries_left.saturating_sub(1);
            }
        }
        self.delayed.retain(|d| {
            if d.key == key && d.queries_left == 0 {
                ready.push(d.clone());
                false
            } else {
                true
            }
        });
        for d in ready {
            self.elements.insert(d.key, d.elements);
        }
        self.elements.get(key).cloned().unwrap_or_default()
    }

    fn target(&self, key: &str, index: usize) -> E2eResult<&ElementSnapshot> {
        self.elements
            .get(key)
            .and_then(|els| els.get(index))
            .ok_or_else(|| E2eError::transient(key, "element detached or not found"))
    }
}

/// In-memory driver for unit tests.
///
/// Cloning yields another handle to the same page, so a test can keep one
/// handle for inspection after moving the driver into a session.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    page: Arc<Mutex<MockPage>>,
}

impl MockDriver {
    /// Create an empty page at `about:blank`
    #[must_use]
    pub fn new() -> Self {
        let driver = Self::default();
        driver.lock().url = "about:blank".to_string();
        driver
    }

    fn lock(&self) -> MutexGuard<'_, MockPage> {
        self.page.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inspect or mutate the page
    pub fn with_page<R>(&self, f: impl FnOnce(&mut MockPage) -> R) -> R {
        f(&mut self.lock())
    }

    /// Set matches for a locator key
    #[must_use]
    pub fn with_elements(self, key: &str, elements: Vec<ElementSnapshot>) -> Self {
        self.lock().set(key, elements);
        self
    }

    /// Elements that appear after `queries` lookups
    #[must_use]
    pub fn with_delayed(self, key: &str, elements: Vec<ElementSnapshot>, queries: u32) -> Self {
        self.lock().set_after(key, elements, queries);
        self
    }

    /// Run `effect` whenever a match of `key` is clicked
    #[must_use]
    pub fn on_click<F>(self, key: &str, effect: F) -> Self
    where
        F: Fn(&mut MockPage, usize) + Send + Sync + 'static,
    {
        self.lock()
            .on_click
            .entry(key.to_string())
            .or_default()
            .push(Arc::new(effect));
        self
    }

    /// Run `effect` after a match of `key` is filled
    #[must_use]
    pub fn on_fill<F>(self, key: &str, effect: F) -> Self
    where
        F: Fn(&mut MockPage, usize) + Send + Sync + 'static,
    {
        self.lock()
            .on_fill
            .entry(key.to_string())
            .or_default()
            .push(Arc::new(effect));
        self
    }

    /// Fail the next `times` clicks on `key` as detached
    #[must_use]
    pub fn failing_clicks(self, key: &str, times: u32) -> Self {
        self.lock().failing_clicks.insert(key.to_string(), times);
        self
    }

    /// Set the current URL
    #[must_use]
    pub fn with_url(self, url: &str) -> Self {
        self.lock().url = url.to_string();
        self
    }

    /// Answer scripts containing `needle` with `value`
    #[must_use]
    pub fn with_script_result(self, needle: &str, value: serde_json::Value) -> Self {
        self.lock().scripts.push((needle.to_string(), value));
        self
    }

    /// Screenshot bytes; without this screenshots fail
    #[must_use]
    pub fn with_screenshot(self, png: Vec<u8>) -> Self {
        self.lock().screenshot = Some(png);
        self
    }

    /// Delay before a screenshot resolves
    #[must_use]
    pub fn with_screenshot_delay(self, delay: Duration) -> Self {
        self.lock().screenshot_delay = Some(delay);
        self
    }

    /// Recorded calls, e.g. `click:store.card_add_to_cart[0]`
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().history.clone()
    }

    /// Whether any recorded call starts with `prefix`
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.lock().history.iter().any(|h| h.starts_with(prefix))
    }

    /// Number of recorded calls starting with `prefix`
    #[must_use]
    pub fn count_calls(&self, prefix: &str) -> usize {
        self.lock()
            .history
            .iter()
            .filter(|h| h.starts_with(prefix))
            .count()
    }

    /// Whether `close` was called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn record(&self, call: String) {
        self.lock().history.push(call);
    }

    fn run_effects(&self, effects: Vec<MockEffect>, index: usize) {
        let mut page = self.lock();
        for effect in effects {
            effect(&mut page, index);
        }
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn navigate(&self, url: &str) -> E2eResult<()> {
        let mut page = self.lock();
        page.history.push(format!("navigate:{url}"));
        page.url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> E2eResult<String> {
        Ok(self.lock().url.clone())
    }

    async fn reload(&self) -> E2eResult<()> {
        self.record("reload".to_string());
        Ok(())
    }

    async fn query_all(&self, locator: &Locator) -> E2eResult<Vec<ElementSnapshot>> {
        Ok(self.lock().query(&locator.qualified_name()))
    }

    async fn click(&self, locator: &Locator, index: usize) -> E2eResult<()> {
        let key = locator.qualified_name();
        let effects = {
            let mut page = self.lock();
            page.history.push(format!("click:{key}[{index}]"));
            if let Some(left) = page.failing_clicks.get_mut(&key) {
                if *left > 0 {
                    *left -= 1;
                    return Err(E2eError::transient(key, "element detached from DOM"));
                }
            }
            if !page.target(&key, index)?.enabled {
                return Err(E2eError::transient(key, "element is disabled"));
            }
            page.on_click.get(&key).cloned().unwrap_or_default()
        };
        self.run_effects(effects, index);
        Ok(())
    }

    async fn fill(&self, locator: &Locator, index: usize, text: &str) -> E2eResult<()> {
        let key = locator.qualified_name();
        let effects = {
            let mut page = self.lock();
            page.history.push(format!("fill:{key}[{index}]={text}"));
            page.target(&key, index)?;
            if let Some(el) = page.elements.get_mut(&key).and_then(|els| els.get_mut(index)) {
                let max = el
                    .attr("maxlength")
                    .and_then(|m| m.parse::<usize>().ok())
                    .unwrap_or(usize::MAX);
                el.value = Some(text.chars().take(max).collect());
            }
            page.on_fill.get(&key).cloned().unwrap_or_default()
        };
        self.run_effects(effects, index);
        Ok(())
    }

    async fn scroll_into_view(&self, locator: &Locator, index: usize) -> E2eResult<()> {
        let key = locator.qualified_name();
        let page = self.lock();
        page.target(&key, index)?;
        drop(page);
        self.record(format!("scroll:{key}[{index}]"));
        Ok(())
    }

    async fn execute_script(&self, script: &str) -> E2eResult<serde_json::Value> {
        let mut page = self.lock();
        page.history.push("script".to_string());
        if script == script::CLEAR_LOCAL_STORAGE {
            let available = page.url.starts_with("http");
            return Ok(serde_json::Value::from(if available { "ok" } else { "unavailable" }));
        }
        Ok(page
            .scripts
            .iter()
            .find(|(needle, _)| script.contains(needle.as_str()))
            .map_or(serde_json::Value::Null, |(_, v)| v.clone()))
    }

    async fn clear_cookies(&self) -> E2eResult<()> {
        self.record("clear_cookies".to_string());
        Ok(())
    }

    async fn take_dialog(&self) -> E2eResult<Option<String>> {
        Ok(self.lock().dialogs.pop_front())
    }

    async fn screenshot_full_page(&self) -> E2eResult<Vec<u8>> {
        let delay = {
            let mut page = self.lock();
            page.history.push("screenshot".to_string());
            page.screenshot_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.lock()
            .screenshot
            .clone()
            .ok_or_else(|| E2eError::driver("no screenshot scripted"))
    }

    async fn close(&self) -> E2eResult<()> {
        let mut page = self.lock();
        page.history.push("close".to_string());
        page.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::PageName;

    fn button() -> ElementSnapshot {
        ElementSnapshot::new("button")
    }

    mod backend_tests {
        use super::*;

        #[test]
        fn test_backend_from_str() {
            assert_eq!("chromium".parse::<Backend>().unwrap(), Backend::Chromium);
            assert_eq!("Playwright".parse::<Backend>().unwrap(), Backend::Playwright);
            assert!("firefox".parse::<Backend>().is_err());
        }

        #[test]
        fn test_backend_display_matches_serde() {
            let yaml = serde_yaml_ng::to_string(&Backend::Playwright).unwrap();
            assert_eq!(yaml.trim(), Backend::Playwright.to_string());
        }

        #[cfg(not(feature = "playwright"))]
        #[tokio::test]
        async fn test_launch_without_feature_fails() {
            let err = launch(Backend::Playwright, &DriverConfig::default())
                .await
                .err()
                .unwrap();
            assert!(matches!(err, E2eError::BrowserLaunch { .. }));
            assert!(err.to_string().contains("playwright"));
        }
    }

    mod driver_config_tests {
        use super::*;

        #[test]
        fn test_config_default() {
            let config = DriverConfig::default();
            assert!(config.headless);
            assert_eq!((config.viewport_width, config.viewport_height), (1366, 820));
        }

        #[test]
        fn test_config_builder() {
            let config = DriverConfig::new()
                .headless(false)
                .viewport(1920, 1080)
                .executable("/usr/bin/chromium")
                .no_sandbox(false);
            assert!(!config.headless);
            assert_eq!(config.viewport_width, 1920);
            assert_eq!(config.executable_path, Some(PathBuf::from("/usr/bin/chromium")));
            assert!(!config.no_sandbox);
        }
    }

    mod mock_driver_tests {
        use super::*;

        #[tokio::test]
        async fn test_click_runs_effect_with_index() {
            let loc = Locator::css("remove", "a.remove-icon").with_scope(PageName::Checkout);
            let driver = MockDriver::new()
                .with_elements("checkout.remove", vec![button(), button()])
                .on_click("checkout.remove", |page, index| {
                    if let Some(els) = page.get_mut("checkout.remove") {
                        els.remove(index);
                    }
                });
            driver.click(&loc, 1).await.unwrap();
            assert_eq!(driver.query_all(&loc).await.unwrap().len(), 1);
            assert!(driver.was_called("click:checkout.remove[1]"));
        }

        #[tokio::test]
        async fn test_click_missing_or_disabled_is_transient() {
            let loc = Locator::css("send", ".send").with_scope(PageName::Product);
            let driver = MockDriver::new();
            assert!(driver.click(&loc, 0).await.unwrap_err().is_transient());

            let driver = driver.with_elements("product.send", vec![button().with_enabled(false)]);
            assert!(driver.click(&loc, 0).await.unwrap_err().is_transient());
        }

        #[tokio::test]
        async fn test_failing_clicks_then_success() {
            let loc = Locator::css("plus", "button.plus");
            let driver = MockDriver::new()
                .with_elements("plus", vec![button()])
                .failing_clicks("plus", 2);
            assert!(driver.click(&loc, 0).await.is_err());
            assert!(driver.click(&loc, 0).await.is_err());
            assert!(driver.click(&loc, 0).await.is_ok());
            assert_eq!(driver.count_calls("click:plus"), 3);
        }

        #[tokio::test]
        async fn test_fill_honours_maxlength() {
            let loc = Locator::css("review", "textarea");
            let driver = MockDriver::new().with_elements(
                "review",
                vec![ElementSnapshot::new("textarea").with_attr("maxlength", "5")],
            );
            driver.fill(&loc, 0, "abcdefgh").await.unwrap();
            let els = driver.query_all(&loc).await.unwrap();
            assert_eq!(els[0].value.as_deref(), Some("abcde"));
        }

        #[tokio::test]
        async fn test_delayed_elements_appear() {
            let loc = Locator::css("toast", ".toast");
            let driver = MockDriver::new().with_delayed(
                "toast",
                vec![ElementSnapshot::new("div").with_text("You are of age")],
                3,
            );
            assert!(driver.query_all(&loc).await.unwrap().is_empty());
            assert!(driver.query_all(&loc).await.unwrap().is_empty());
            assert_eq!(driver.query_all(&loc).await.unwrap().len(), 1);
        }

        #[tokio::test]
        async fn test_dialog_queue() {
            let driver = MockDriver::new();
            driver.with_page(|p| p.open_dialog("Delete review?"));
            assert_eq!(driver.take_dialog().await.unwrap().as_deref(), Some("Delete review?"));
            assert_eq!(driver.take_dialog().await.unwrap(), None);
        }

        #[tokio::test]
        async fn test_local_storage_unavailable_on_blank() {
            let driver = MockDriver::new();
            assert!(driver.clear_local_storage().await.is_err());
            driver.navigate("https://grocerymate.masterschool.com/").await.unwrap();
            assert!(driver.clear_local_storage().await.is_ok());
        }

        #[tokio::test]
        async fn test_script_results_and_close() {
            let driver = MockDriver::new()
                .with_script_result("document.title", serde_json::json!("GroceryMate"));
            let title = driver.execute_script(script::DOCUMENT_TITLE).await.unwrap();
            assert_eq!(title, serde_json::json!("GroceryMate"));
            driver.close().await.unwrap();
            assert!(driver.is_closed());
        }
    }
}
