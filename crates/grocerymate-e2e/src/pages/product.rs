//! `/product/{id}` detail page: rating widget, reviews and the review form.

use super::{landing_after_click, path_of, Landing, PageObject, UrlMatcher};
use crate::dom::ElementSnapshot;
use crate::extract::{
    average_from_review_ratings, average_rating_from_stars, parse_price, parse_review_count,
    review_comment_from_block, ProductSnapshot, ReviewComment,
};
use crate::locator::PageName;
use crate::result::{E2eError, E2eResult};
use crate::session::Session;
use crate::wait::wait_until;
use std::time::Duration;
use uuid::Uuid;

/// Longest review body the form is meant to accept
pub const MAX_REVIEW_CHARS: usize = 500;

/// Budget for the delete confirmation dialog
const DELETE_DIALOG_TIMEOUT: Duration = Duration::from_secs(5);

/// The "already reviewed" marker renders after the review list
const REVIEWED_MARKER_TIMEOUT: Duration = Duration::from_secs(15);

/// A review to post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewSubmission {
    /// Stars to select, `None` to leave the rating untouched
    pub star_rating: Option<u8>,
    /// Review body
    pub body: String,
    /// Display name the review will be shown under
    pub author: String,
}

impl ReviewSubmission {
    /// Review with a body unique to this run
    #[must_use]
    pub fn new(author: impl Into<String>, label: &str) -> Self {
        let author = author.into();
        Self {
            star_rating: None,
            body: unique_body(&author, label),
            author,
        }
    }

    /// Select `stars` before submitting
    #[must_use]
    pub const fn with_rating(mut self, stars: u8) -> Self {
        self.star_rating = Some(stars);
        self
    }

    /// Replace the body verbatim
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }
}

/// `"{author} - {label} - {6 hex chars}"`
#[must_use]
pub fn unique_body(author: &str, label: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{author} - {label} - {}", &suffix[..6])
}

/// Product page
#[derive(Debug, Clone, Copy)]
pub struct ProductPage<'s> {
    session: &'s Session,
}

impl<'s> PageObject<'s> for ProductPage<'s> {
    const PAGE: PageName = PageName::Product;
    const URL_PATTERN: &'static str = "/product/:id";

    fn session(&self) -> &'s Session {
        self.session
    }
}

impl<'s> ProductPage<'s> {
    /// Wrap the session without navigating
    #[must_use]
    pub const fn new(session: &'s Session) -> Self {
        Self { session }
    }

    /// Navigate to `/product/{id}` and wait for it to render
    pub async fn open(session: &'s Session, product_id: &str) -> E2eResult<Self> {
        session.goto(&format!("/product/{product_id}")).await?;
        Self::wait_until_loaded(session).await
    }

    /// Wait for the rating widget, review form or cart button
    pub async fn wait_until_loaded(session: &'s Session) -> E2eResult<Self> {
        session
            .wait_for_any(
                &[
                    (Self::PAGE, "interactive_rating"),
                    (Self::PAGE, "rating_widget"),
                    (Self::PAGE, "add_to_cart"),
                ],
                &session.waits().long,
            )
            .await?;
        Ok(Self::new(session))
    }

    /// Id segment of the current URL
    pub async fn product_id(&self) -> E2eResult<Option<String>> {
        let url = self.session.current_url().await?;
        Ok(UrlMatcher::new(Self::URL_PATTERN)
            .extract_params(path_of(&url))
            .remove("id"))
    }

    /// On a product URL with the page rendered
    pub async fn is_displayed(&self) -> E2eResult<bool> {
        let url = self.session.current_url().await?;
        if !self.matches_url(&url) {
            return Ok(false);
        }
        for name in ["interactive_rating", "rating_widget", "add_to_cart"] {
            if !self.session.query(Self::PAGE, name).await?.is_empty() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    // =========================================================================
    // REVIEW FORM
    // =========================================================================

    /// Wait for the review textarea
    pub async fn wait_for_review_form(&self) -> E2eResult<()> {
        self.session
            .wait_for_visible(Self::PAGE, "review_textarea", &self.session.waits().short)
            .await
            .map(|_| ())
    }

    /// Click the `stars`-th star of the interactive rating.
    ///
    /// Fails with [`E2eError::InvalidInput`] when `stars` is outside
    /// `1..=N` and with [`E2eError::NotAllowed`] when the user already
    /// reviewed the product. Both are checked before anything is clicked.
    pub async fn select_star_rating(&self, stars: u8) -> E2eResult<()> {
        if stars == 0 {
            return Err(E2eError::invalid_input("star rating must be at least 1"));
        }
        if self.has_reviewed().await? {
            return Err(E2eError::not_allowed("product already reviewed by this user"));
        }

        let waits = self.session.waits();
        let options = self
            .session
            .wait_for_present(Self::PAGE, "star_option", &waits.short)
            .await?;
        if usize::from(stars) > options.len() {
            return Err(E2eError::invalid_input(format!(
                "star rating {stars} out of range 1..={}",
                options.len()
            )));
        }

        let index = usize::from(stars - 1);
        self.session
            .scroll_into_view(Self::PAGE, "star_option", index)
            .await?;
        self.session
            .click_when_ready(Self::PAGE, "star_option", index, &waits.short)
            .await?;
        self.session
            .wait_for_visible(Self::PAGE, "send", &waits.short)
            .await?;
        tracing::debug!(stars, "Star rating selected");
        Ok(())
    }

    /// Type the review body
    pub async fn enter_review_text(&self, text: &str) -> E2eResult<()> {
        let waits = self.session.waits();
        let (index, _) = self
            .session
            .wait_for_visible(Self::PAGE, "review_textarea", &waits.short)
            .await?;
        self.session
            .fill_when_ready(Self::PAGE, "review_textarea", index, text, &waits.short)
            .await
    }

    /// Current content of the review textarea
    pub async fn review_text_value(&self) -> E2eResult<String> {
        let found = self
            .session
            .wait_for_present(Self::PAGE, "review_textarea", &self.session.waits().short)
            .await?;
        Ok(found
            .first()
            .map(|el| el.value.clone().unwrap_or_default())
            .unwrap_or_default())
    }

    /// Whether the send button is shown and clickable
    pub async fn is_send_enabled(&self) -> E2eResult<bool> {
        Ok(self
            .session
            .query(Self::PAGE, "send")
            .await?
            .iter()
            .any(|el| el.visible && el.enabled))
    }

    /// Press send
    pub async fn submit_review(&self) -> E2eResult<()> {
        self.session
            .click_when_ready(Self::PAGE, "send", 0, &self.session.waits().short)
            .await
    }

    /// Rate, type and send a review, then wait for it to be listed
    pub async fn submit(&self, review: &ReviewSubmission) -> E2eResult<ReviewComment> {
        self.wait_for_review_form().await?;
        if let Some(stars) = review.star_rating {
            self.select_star_rating(stars).await?;
        }
        self.enter_review_text(&review.body).await?;
        self.submit_review().await?;

        let description = format!("review by {} listed", review.author);
        let comment = wait_until(&self.session.waits().long, &description, || async move {
            self.visible_comments()
                .await
                .map(|found| found.into_iter().find(|c| c.text.contains(&review.body)))
        })
        .await?;
        tracing::info!(author = %review.author, rating = ?review.star_rating, "Review posted");
        Ok(comment)
    }

    // =========================================================================
    // EXISTING REVIEWS
    // =========================================================================

    async fn has_reviewed(&self) -> E2eResult<bool> {
        let options = self
            .session
            .waits()
            .short
            .with_timeout(REVIEWED_MARKER_TIMEOUT);
        self.session
            .is_present_within(Self::PAGE, "already_reviewed", &options)
            .await
    }

    /// Delete the user's review if there is one. Returns whether one was
    /// deleted; calling it again is a no-op.
    pub async fn remove_existing_review(&self) -> E2eResult<bool> {
        if !self.has_reviewed().await? {
            tracing::debug!("No existing review to remove");
            return Ok(false);
        }

        let waits = self.session.waits();
        self.session
            .click_when_ready(Self::PAGE, "menu_icon", 0, &waits.short)
            .await?;
        self.session
            .click_when_ready(Self::PAGE, "delete", 0, &waits.short)
            .await?;
        self.session
            .accept_dialog(&waits.probe.with_timeout(DELETE_DIALOG_TIMEOUT))
            .await?;
        self.session
            .wait_for_absent(Self::PAGE, "already_reviewed", &waits.long)
            .await?;
        tracing::info!("Existing review removed");
        Ok(true)
    }

    async fn visible_comments(&self) -> E2eResult<Vec<ReviewComment>> {
        let mut blocks = self.session.query(Self::PAGE, "comment").await?;
        blocks.extend(self.session.query(Self::PAGE, "review_container").await?);
        Ok(blocks.iter().filter_map(review_comment_from_block).collect())
    }

    /// Rendered reviews. Empty when none show up within the short wait.
    pub async fn review_comments(&self) -> E2eResult<Vec<ReviewComment>> {
        let listed = self
            .session
            .wait_for_any(
                &[(Self::PAGE, "comment"), (Self::PAGE, "review_container")],
                &self.session.waits().short,
            )
            .await;
        match listed {
            Ok(_) => self.visible_comments().await,
            Err(e) if e.is_timeout() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Body of the first review by `author`
    pub async fn user_comment_text(&self, author: &str) -> E2eResult<Option<String>> {
        Ok(self
            .review_comments()
            .await?
            .into_iter()
            .find(|c| c.author.eq_ignore_ascii_case(author.trim()))
            .map(|c| c.text))
    }

    /// Whether `author` has a review listed
    pub async fn user_has_comment(&self, author: &str) -> E2eResult<bool> {
        Ok(self.user_comment_text(author).await?.is_some())
    }

    // =========================================================================
    // DERIVED VALUES
    // =========================================================================

    async fn first(&self, name: &str) -> E2eResult<ElementSnapshot> {
        self.session
            .wait_for_present(Self::PAGE, name, &self.session.waits().short)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| E2eError::parse("product page element", name))
    }

    /// Average shown by the star widget
    pub async fn average_rating(&self) -> E2eResult<f64> {
        Ok(average_rating_from_stars(&self.first("rating_widget").await?))
    }

    /// Review count shown as `(n)`
    pub async fn review_count(&self) -> E2eResult<u32> {
        parse_review_count(&self.first("review_count").await?.text)
    }

    /// Mean of the ratings printed beside each review
    pub async fn average_from_visible_reviews(&self) -> E2eResult<f64> {
        let ratings: Vec<u8> = self
            .review_comments()
            .await?
            .iter()
            .filter_map(|c| c.rating)
            .collect();
        average_from_review_ratings(&ratings)
    }

    /// Price, average rating and review count
    pub async fn snapshot(&self) -> E2eResult<ProductSnapshot> {
        let prices = self
            .session
            .wait_for_present(Self::PAGE, "price", &self.session.waits().short)
            .await?;
        let raw = prices
            .iter()
            .map(ElementSnapshot::text_trimmed)
            .find(|t| !t.is_empty())
            .unwrap_or_default();
        let snapshot = ProductSnapshot {
            price: parse_price(raw)?,
            average_rating: self.average_rating().await?,
            review_count: self.review_count().await?,
        };
        tracing::debug!(?snapshot, "Product snapshot");
        Ok(snapshot)
    }

    /// Text of the length warning under the form, if shown
    pub async fn char_limit_warning(&self) -> E2eResult<Option<String>> {
        if !self.session.is_present(Self::PAGE, "char_limit_warning").await? {
            return Ok(None);
        }
        Ok(self
            .session
            .query(Self::PAGE, "char_limit_warning")
            .await?
            .iter()
            .filter(|el| el.visible)
            .map(|el| el.text_trimmed().to_string())
            .find(|t| !t.is_empty()))
    }

    // =========================================================================
    // CART
    // =========================================================================

    /// Type a quantity
    pub async fn set_quantity(&self, quantity: u32) -> E2eResult<()> {
        self.session
            .fill_when_ready(
                Self::PAGE,
                "quantity",
                0,
                &quantity.to_string(),
                &self.session.waits().short,
            )
            .await
    }

    /// Press add-to-cart and report where the app went
    pub async fn add_to_cart(&self) -> E2eResult<Landing<'s>> {
        landing_after_click(self.session, Self::PAGE, "add_to_cart", "/product").await
    }
}
