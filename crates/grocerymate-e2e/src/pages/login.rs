//! `/auth` login form.

use super::{path_of, PageObject};
use crate::config::Credentials;
use crate::locator::PageName;
use crate::result::E2eResult;
use crate::session::Session;

/// Login page
#[derive(Debug, Clone, Copy)]
pub struct LoginPage<'s> {
    session: &'s Session,
}

impl<'s> PageObject<'s> for LoginPage<'s> {
    const PAGE: PageName = PageName::Login;
    const URL_PATTERN: &'static str = "/auth";

    fn session(&self) -> &'s Session {
        self.session
    }
}

impl<'s> LoginPage<'s> {
    /// App path of the login form
    pub const PATH: &'static str = "/auth";

    /// Wrap the session without navigating
    #[must_use]
    pub const fn new(session: &'s Session) -> Self {
        Self { session }
    }

    /// Navigate to `/auth` and wait for the form
    pub async fn open(session: &'s Session) -> E2eResult<Self> {
        session.goto(Self::PATH).await?;
        session
            .wait_for_visible(Self::PAGE, "email", &session.waits().short)
            .await?;
        Ok(Self::new(session))
    }

    /// Submit credentials and wait until the app navigates away from `/auth`.
    /// Returns the URL it landed on.
    pub async fn login(&self, credentials: &Credentials) -> E2eResult<String> {
        let waits = self.session.waits();
        let (index, _) = self
            .session
            .wait_for_visible(Self::PAGE, "email", &waits.short)
            .await?;
        self.session
            .fill_when_ready(Self::PAGE, "email", index, &credentials.email, &waits.short)
            .await?;
        self.session
            .fill_when_ready(Self::PAGE, "password", 0, &credentials.password, &waits.short)
            .await?;
        self.session
            .click_when_ready(Self::PAGE, "submit", 0, &waits.short)
            .await?;

        let url = self
            .session
            .wait_for_url(&waits.long, "login to leave /auth", |u| {
                !path_of(u).starts_with(Self::PATH)
            })
            .await?;
        tracing::info!(email = %credentials.email, %url, "Logged in");
        Ok(url)
    }

    /// Open the form and log in
    pub async fn sign_in(session: &'s Session, credentials: &Credentials) -> E2eResult<String> {
        Self::open(session).await?.login(credentials).await
    }

    /// On `/auth` with the form rendered
    pub async fn is_displayed(&self) -> E2eResult<bool> {
        let url = self.session.current_url().await?;
        if !path_of(&url).starts_with(Self::PATH) {
            return Ok(false);
        }
        Ok(!self.session.query(Self::PAGE, "email").await?.is_empty())
    }

    /// Error text shown after a rejected login, if any
    pub async fn error_message(&self) -> E2eResult<Option<String>> {
        if !self.session.is_present(Self::PAGE, "error").await? {
            return Ok(None);
        }
        Ok(self
            .session
            .query(Self::PAGE, "error")
            .await?
            .iter()
            .map(|el| el.text_trimmed().to_string())
            .find(|text| !text.is_empty()))
    }
}
