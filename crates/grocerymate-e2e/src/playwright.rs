//! Playwright server backend (feature `playwright`).
//!
//! One browser context per driver, recreated when cookies are cleared since
//! a fresh context is the only complete cookie reset the protocol offers.

use crate::dom::ElementSnapshot;
use crate::driver::{BrowserDriver, DriverConfig};
use crate::locator::Locator;
use crate::result::{E2eError, E2eResult};
use crate::script::{self, ActionOutcome};
use async_trait::async_trait;
use playwright_rs::protocol::Dialog;
use playwright_rs::{
    Browser, BrowserContext, BrowserContextOptions, GotoOptions, LaunchOptions, Page, Playwright,
    ScreenshotOptions, Viewport,
};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

fn driver_err(e: impl fmt::Display) -> E2eError {
    E2eError::driver(e.to_string())
}

struct Tab {
    context: BrowserContext,
    page: Page,
}

/// A chromium page driven through the Playwright server
pub struct PlaywrightDriver {
    _playwright: Playwright,
    browser: Browser,
    tab: tokio::sync::Mutex<Tab>,
    dialogs: Arc<Mutex<VecDeque<String>>>,
    viewport: (u32, u32),
    navigation_timeout: Duration,
}

impl fmt::Debug for PlaywrightDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaywrightDriver")
            .field("viewport", &self.viewport)
            .field("navigation_timeout", &self.navigation_timeout)
            .finish_non_exhaustive()
    }
}

impl PlaywrightDriver {
    /// Start the Playwright server and launch chromium
    pub async fn launch(config: &DriverConfig) -> E2eResult<Self> {
        let launch_err = |e: playwright_rs::Error| E2eError::BrowserLaunch {
            message: e.to_string(),
        };

        let playwright = Playwright::launch().await.map_err(launch_err)?;
        let mut options = LaunchOptions::new().headless(config.headless);
        if let Some(ref path) = config.executable_path {
            options = options.executable_path(path.display().to_string());
        }
        let browser = playwright
            .chromium()
            .launch_with_options(options)
            .await
            .map_err(launch_err)?;

        let dialogs = Arc::new(Mutex::new(VecDeque::new()));
        let viewport = (config.viewport_width, config.viewport_height);
        let tab = open_tab(&browser, viewport, &dialogs).await?;

        Ok(Self {
            _playwright: playwright,
            browser,
            tab: tokio::sync::Mutex::new(tab),
            dialogs,
            viewport,
            navigation_timeout: config.navigation_timeout,
        })
    }

    async fn page(&self) -> Page {
        self.tab.lock().await.page.clone()
    }

    async fn evaluate_string(&self, expr: &str) -> E2eResult<String> {
        self.page()
            .await
            .evaluate::<(), String>(expr, None)
            .await
            .map_err(driver_err)
    }

    async fn act(&self, locator: &Locator, expr: String) -> E2eResult<()> {
        let raw = self.evaluate_string(&expr).await?;
        ActionOutcome::parse(&raw)?.into_result(locator)
    }
}

async fn open_tab(
    browser: &Browser,
    (width, height): (u32, u32),
    dialogs: &Arc<Mutex<VecDeque<String>>>,
) -> E2eResult<Tab> {
    let options = BrowserContextOptions::builder()
        .viewport(Viewport { width, height })
        .build();
    let context = browser
        .new_context_with_options(options)
        .await
        .map_err(driver_err)?;
    let page = context.new_page().await.map_err(driver_err)?;

    let queue = Arc::clone(dialogs);
    page.on_dialog(move |dialog: Dialog| {
        let queue = Arc::clone(&queue);
        async move {
            tracing::info!(text = dialog.message(), "Accepting dialog");
            queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(dialog.message().to_string());
            dialog.accept(None).await
        }
    })
    .await
    .map_err(driver_err)?;

    Ok(Tab { context, page })
}

#[async_trait]
impl BrowserDriver for PlaywrightDriver {
    fn name(&self) -> &'static str {
        "playwright"
    }

    async fn navigate(&self, url: &str) -> E2eResult<()> {
        let options = GotoOptions::new().timeout(self.navigation_timeout);
        self.page()
            .await
            .goto(url, Some(options))
            .await
            .map_err(|e| E2eError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn current_url(&self) -> E2eResult<String> {
        Ok(self.page().await.url())
    }

    async fn reload(&self) -> E2eResult<()> {
        self.page().await.reload(None).await.map_err(driver_err)?;
        Ok(())
    }

    async fn query_all(&self, locator: &Locator) -> E2eResult<Vec<ElementSnapshot>> {
        let raw = self.evaluate_string(&script::query_all(locator)).await?;
        script::parse_snapshots(&raw)
    }

    async fn click(&self, locator: &Locator, index: usize) -> E2eResult<()> {
        self.act(locator, script::click(locator, index)).await
    }

    async fn fill(&self, locator: &Locator, index: usize, text: &str) -> E2eResult<()> {
        self.act(locator, script::fill(locator, index, text)).await
    }

    async fn scroll_into_view(&self, locator: &Locator, index: usize) -> E2eResult<()> {
        self.act(locator, script::scroll_into_view(locator, index)).await
    }

    async fn execute_script(&self, script: &str) -> E2eResult<serde_json::Value> {
        self.page()
            .await
            .evaluate::<(), serde_json::Value>(script, None)
            .await
            .map_err(driver_err)
    }

    async fn clear_cookies(&self) -> E2eResult<()> {
        let mut tab = self.tab.lock().await;
        let url = tab.page.url();
        let fresh = open_tab(&self.browser, self.viewport, &self.dialogs).await?;
        let old = std::mem::replace(&mut *tab, fresh);
        if let Err(e) = old.context.close().await {
            tracing::debug!(error = %e, "Old browser context did not close cleanly");
        }
        if url.starts_with("http") {
            tab.page.goto(&url, None).await.map_err(|e| E2eError::Navigation {
                url: url.clone(),
                message: e.to_string(),
            })?;
        }
        Ok(())
    }

    async fn take_dialog(&self) -> E2eResult<Option<String>> {
        Ok(self
            .dialogs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front())
    }

    async fn screenshot_full_page(&self) -> E2eResult<Vec<u8>> {
        let options = ScreenshotOptions::builder().full_page(true).build();
        self.page()
            .await
            .screenshot(Some(options))
            .await
            .map_err(driver_err)
    }

    async fn close(&self) -> E2eResult<()> {
        let tab = self.tab.lock().await;
        if let Err(e) = tab.context.close().await {
            tracing::debug!(error = %e, "Browser context did not close cleanly");
        }
        self.browser.close().await.map_err(driver_err)
    }
}
