//! Date-of-birth modal guarding the store.

use crate::extract::{classify_toast, AgeVerdict};
use crate::locator::PageName;
use crate::result::{E2eError, E2eResult};
use crate::session::Session;
use crate::wait::wait_until;

const PAGE: PageName = PageName::AgeGate;

/// Age verification modal
#[derive(Debug, Clone, Copy)]
pub struct AgeGate<'s> {
    session: &'s Session,
}

impl<'s> AgeGate<'s> {
    /// Wrap the session
    #[must_use]
    pub const fn new(session: &'s Session) -> Self {
        Self { session }
    }

    /// Click SHOP in the navigation and wait for the DOB input
    pub async fn open_from_nav(&self) -> E2eResult<()> {
        let waits = self.session.waits();
        self.session
            .click_when_ready(PAGE, "nav_shop", 0, &waits.short)
            .await?;
        self.session
            .wait_for_visible(PAGE, "dob_input", &waits.short)
            .await?;
        Ok(())
    }

    /// Whether the modal is showing
    pub async fn is_open(&self) -> E2eResult<bool> {
        Ok(self
            .session
            .query(PAGE, "dob_input")
            .await?
            .iter()
            .any(|el| el.visible))
    }

    /// Type a `DD-MM-YYYY` date, or `""` to leave it blank
    pub async fn enter_dob(&self, dob: &str) -> E2eResult<()> {
        let waits = self.session.waits();
        let (index, _) = self
            .session
            .wait_for_visible(PAGE, "dob_input", &waits.short)
            .await?;
        self.session
            .fill_when_ready(PAGE, "dob_input", index, dob, &waits.short)
            .await
    }

    /// Press Confirm
    pub async fn confirm(&self) -> E2eResult<()> {
        self.session
            .click_when_ready(PAGE, "confirm", 0, &self.session.waits().short)
            .await
    }

    /// Text of the first visible age toast
    pub async fn toast_message(&self) -> E2eResult<String> {
        let locator = self.session.locator(PAGE, "toast")?;
        let driver = self.session.driver();
        wait_until(&self.session.waits().toast, "age toast", || async move {
            driver.query_all(locator).await.map(|found| {
                found
                    .iter()
                    .filter(|el| el.visible)
                    .map(|el| el.text_trimmed().to_string())
                    .find(|text| !text.is_empty())
            })
        })
        .await
    }

    /// Whether a toast containing `expected` appears, case-insensitive.
    /// No toast within the toast budget counts as `false`.
    pub async fn toast_contains(&self, expected: &str) -> E2eResult<bool> {
        match self.toast_message().await {
            Ok(text) => Ok(text.to_lowercase().contains(&expected.to_lowercase())),
            Err(e) if e.is_timeout() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Enter a date, confirm, and classify the toast
    pub async fn verify(&self, dob: &str) -> E2eResult<AgeVerdict> {
        self.enter_dob(dob).await?;
        self.confirm().await?;
        let text = self.toast_message().await?;
        let verdict = classify_toast(&text).ok_or_else(|| E2eError::parse("age toast", &text))?;
        tracing::info!(dob, ?verdict, "Age gate answered");
        Ok(verdict)
    }

    /// Pass the modal if it shows up within the probe budget.
    /// Returns whether it was shown.
    pub async fn pass_if_present(&self, dob: &str) -> E2eResult<bool> {
        if !self.session.is_present(PAGE, "dob_input").await? {
            return Ok(false);
        }
        self.enter_dob(dob).await?;
        self.confirm().await?;
        self.session
            .wait_for_absent(PAGE, "dob_input", &self.session.waits().short)
            .await?;
        tracing::debug!("Age gate passed");
        Ok(true)
    }
}
