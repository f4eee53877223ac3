//! Chrome DevTools Protocol backend (feature `browser`).
//!
//! Launches chromium through chromiumoxide, drives one tab, and evaluates the
//! shared scripts from [`crate::script`] for every element operation.
//! JavaScript dialogs are accepted by a listener task as soon as they open.

use crate::dom::ElementSnapshot;
use crate::driver::{BrowserDriver, DriverConfig};
use crate::locator::Locator;
use crate::result::{E2eError, E2eResult};
use crate::script::{self, ActionOutcome};
use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::ClearBrowserCookiesParams;
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams, EventJavascriptDialogOpening,
    GetLayoutMetricsParams, HandleJavaScriptDialogParams, Viewport,
};
use chromiumoxide::handler::viewport::Viewport as WindowViewport;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

fn driver_err(e: impl std::fmt::Display) -> E2eError {
    E2eError::driver(e.to_string())
}

/// A chromium tab controlled over CDP
#[derive(Debug)]
pub struct ChromiumDriver {
    browser: tokio::sync::Mutex<Browser>,
    page: Page,
    dialogs: Arc<Mutex<VecDeque<String>>>,
    navigation_timeout: Duration,
    handler: tokio::task::JoinHandle<()>,
    dialog_listener: tokio::task::JoinHandle<()>,
}

impl ChromiumDriver {
    /// Launch chromium and open a blank tab
    pub async fn launch(config: &DriverConfig) -> E2eResult<Self> {
        let launch_err = |message: String| E2eError::BrowserLaunch { message };

        let mut builder = BrowserConfig::builder()
            .window_size(config.viewport_width, config.viewport_height)
            .viewport(Some(WindowViewport {
                width: config.viewport_width,
                height: config.viewport_height,
                ..WindowViewport::default()
            }))
            .launch_timeout(config.launch_timeout);
        if !config.headless {
            builder = builder.with_head();
        }
        if config.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = config.executable_path {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder.build().map_err(launch_err)?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| launch_err(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "CDP handler stopped");
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| launch_err(e.to_string()))?;

        let dialogs = Arc::new(Mutex::new(VecDeque::new()));
        let mut events = page
            .event_listener::<EventJavascriptDialogOpening>()
            .await
            .map_err(driver_err)?;
        let queue = Arc::clone(&dialogs);
        let dialog_page = page.clone();
        let dialog_listener = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                tracing::info!(text = %event.message, "Accepting dialog");
                queue
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push_back(event.message.clone());
                if let Err(e) = dialog_page
                    .execute(HandleJavaScriptDialogParams::new(true))
                    .await
                {
                    tracing::warn!(error = %e, "Dialog could not be accepted");
                }
            }
        });

        Ok(Self {
            browser: tokio::sync::Mutex::new(browser),
            page,
            dialogs,
            navigation_timeout: config.navigation_timeout,
            handler,
            dialog_listener,
        })
    }

    async fn evaluate_string(&self, expr: &str) -> E2eResult<String> {
        self.page
            .evaluate(expr)
            .await
            .map_err(driver_err)?
            .into_value::<String>()
            .map_err(driver_err)
    }

    async fn act(&self, locator: &Locator, expr: String) -> E2eResult<()> {
        let raw = self.evaluate_string(&expr).await?;
        ActionOutcome::parse(&raw)?.into_result(locator)
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    fn name(&self) -> &'static str {
        "chromium"
    }

    async fn navigate(&self, url: &str) -> E2eResult<()> {
        let nav_err = |message: String| E2eError::Navigation {
            url: url.to_string(),
            message,
        };
        tokio::time::timeout(self.navigation_timeout, self.page.goto(url))
            .await
            .map_err(|_| nav_err("navigation timed out".to_string()))?
            .map_err(|e| nav_err(e.to_string()))?;
        Ok(())
    }

    async fn current_url(&self) -> E2eResult<String> {
        Ok(self
            .page
            .url()
            .await
            .map_err(driver_err)?
            .unwrap_or_default())
    }

    async fn reload(&self) -> E2eResult<()> {
        self.page.reload().await.map_err(driver_err)?;
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
        let result = self.page.evaluate(script).await.map_err(driver_err)?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn clear_cookies(&self) -> E2eResult<()> {
        self.page
            .execute(ClearBrowserCookiesParams::default())
            .await
            .map_err(driver_err)?;
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
        let metrics = self
            .page
            .execute(GetLayoutMetricsParams::default())
            .await
            .map_err(driver_err)?;
        let size = &metrics.result.css_content_size;
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .capture_beyond_viewport(true)
            .clip(Viewport {
                x: 0.0,
                y: 0.0,
                width: size.width,
                height: size.height,
                scale: 1.0,
            })
            .build();
        let shot = self.page.execute(params).await.map_err(driver_err)?;
        base64::engine::general_purpose::STANDARD
            .decode(&shot.result.data)
            .map_err(driver_err)
    }

    async fn close(&self) -> E2eResult<()> {
        self.dialog_listener.abort();
        let mut browser = self.browser.lock().await;
        browser.close().await.map_err(driver_err)?;
        if let Err(e) = browser.wait().await {
            tracing::debug!(error = %e, "Browser process did not exit cleanly");
        }
        self.handler.abort();
        Ok(())
    }
}
