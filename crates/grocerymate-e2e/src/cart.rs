//! Bounded cart clearing.
//!
//! Removes every line from the server-side cart by clicking `×` controls
//! one at a time. Controls are re-queried on every pass because the
//! checkout view re-renders after each removal. A detached control is
//! skipped in favour of the next one. The loop is capped by a pass count and
//! a wall-clock deadline and fails with [`E2eError::CleanupExhausted`] when
//! either runs out.

use crate::locator::PageName;
use crate::pages::checkout::REMOVE_GLYPH;
use crate::pages::CheckoutPage;
use crate::result::{E2eError, E2eResult};
use crate::session::Session;
use crate::wait::wait_optional;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

const PAGE: PageName = PageName::Checkout;

/// Outcome of a cart clearing run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CartReport {
    /// Lines whose removal was observed
    pub removed: u32,
    /// Passes over the remove controls
    pub passes: u32,
    /// Clicks that hit a detached or disabled control
    pub failed_clicks: u32,
}

/// Empties the cart of the logged-in user
#[derive(Debug, Clone, Copy)]
pub struct CartCleaner<'s> {
    session: &'s Session,
    max_passes: u32,
    deadline: Duration,
}

impl<'s> CartCleaner<'s> {
    /// Cleaner with the limits from the suite settings
    #[must_use]
    pub fn new(session: &'s Session) -> Self {
        let cart = &session.config().cart;
        Self {
            session,
            max_passes: cart.max_passes,
            deadline: cart.deadline(),
        }
    }

    /// Override the pass and time limits
    #[must_use]
    pub const fn with_limits(mut self, max_passes: u32, deadline: Duration) -> Self {
        self.max_passes = max_passes;
        self.deadline = deadline;
        self
    }

    /// Indices of remove controls showing `×`
    async fn remove_controls(&self) -> E2eResult<Vec<usize>> {
        Ok(self
            .session
            .query(PAGE, "remove")
            .await?
            .iter()
            .enumerate()
            .filter(|(_, el)| el.text_trimmed() == REMOVE_GLYPH)
            .map(|(i, _)| i)
            .collect())
    }

    /// Open checkout and remove lines until none are left
    pub async fn clear_cart(&self) -> E2eResult<CartReport> {
        CheckoutPage::open(self.session).await?;

        let start = Instant::now();
        let locator = self.session.locator(PAGE, "remove")?;
        let driver = self.session.driver();
        let waits = self.session.waits();
        let mut report = CartReport::default();

        loop {
            let controls = self.remove_controls().await?;
            if controls.is_empty() {
                tracing::info!(
                    removed = report.removed,
                    passes = report.passes,
                    failed_clicks = report.failed_clicks,
                    "Cart cleared"
                );
                return Ok(report);
            }
            if report.passes >= self.max_passes || start.elapsed() >= self.deadline {
                tracing::warn!(passes = report.passes, remaining = controls.len(), "Cart cleanup exhausted");
                return Err(E2eError::CleanupExhausted {
                    passes: report.passes,
                    remaining: controls.len(),
                });
            }
            report.passes += 1;

            let before = controls.len();
            let mut clicked = false;
            for index in controls {
                match driver.click(locator, index).await {
                    Ok(()) => {
                        clicked = true;
                        break;
                    }
                    Err(e) if e.is_transient() => {
                        report.failed_clicks += 1;
                        tracing::warn!(index, error = %e, "Remove control click failed, trying next");
                    }
                    Err(e) => return Err(e),
                }
            }
            if !clicked {
                continue;
            }

            let dropped = wait_optional(&waits.short, "remove controls to drop", || async move {
                self.remove_controls()
                    .await
                    .map(|left| (left.len() < before).then_some(()))
            })
            .await?;
            if dropped.is_some() {
                report.removed += 1;
            }
        }
    }
}
