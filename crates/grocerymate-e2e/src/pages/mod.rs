//! Page objects for the GroceryMate screens.
//!
//! Each page object borrows the [`Session`] and is cheap to copy. Operations
//! wait on observable state through the session helpers and return either a
//! DOM-derived value or another page object. Redirects whose target depends
//! on server state come back as a [`Landing`].

pub mod age_gate;
pub mod checkout;
pub mod login;
pub mod product;
pub mod store;

pub use age_gate::AgeGate;
pub use checkout::{CheckoutDetails, CheckoutPage};
pub use login::LoginPage;
pub use product::{ProductPage, ReviewSubmission};
pub use store::StorePage;

use crate::locator::PageName;
use crate::result::E2eResult;
use crate::session::Session;
use std::collections::HashMap;
use std::fmt;

/// A screen reachable by URL
pub trait PageObject<'s> {
    /// Locator scope of the screen
    const PAGE: PageName;

    /// Path pattern, e.g. `/product/:id`
    const URL_PATTERN: &'static str;

    /// Session the page operates on
    fn session(&self) -> &'s Session;

    /// Whether `url` belongs to this screen
    fn matches_url(&self, url: &str) -> bool {
        UrlMatcher::new(Self::URL_PATTERN).matches(path_of(url))
    }
}

/// Path component of an absolute URL, without query or fragment
#[must_use]
pub fn path_of(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = rest.find('/').map_or("/", |i| &rest[i..]);
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}

/// Path pattern with literal segments, `*` wildcards and `:name` parameters
#[derive(Debug, Clone)]
pub struct UrlMatcher {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Wildcard,
    Parameter(String),
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

impl UrlMatcher {
    /// Compile a pattern
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        let segments = split_path(pattern)
            .into_iter()
            .map(|s| {
                if s == "*" {
                    Segment::Wildcard
                } else if let Some(name) = s.strip_prefix(':') {
                    Segment::Parameter(name.to_string())
                } else {
                    Segment::Literal(s.to_string())
                }
            })
            .collect();
        Self { segments }
    }

    /// Whether a path matches segment for segment
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        let parts = split_path(path);
        parts.len() == self.segments.len()
            && self.segments.iter().zip(&parts).all(|(seg, part)| match seg {
                Segment::Literal(lit) => lit == part,
                Segment::Wildcard | Segment::Parameter(_) => true,
            })
    }

    /// Named parameters of a matching path
    #[must_use]
    pub fn extract_params(&self, path: &str) -> HashMap<String, String> {
        if !self.matches(path) {
            return HashMap::new();
        }
        self.segments
            .iter()
            .zip(split_path(path))
            .filter_map(|(seg, part)| match seg {
                Segment::Parameter(name) => Some((name.clone(), part.to_string())),
                _ => None,
            })
            .collect()
    }
}

/// Where an action that may redirect ended up
#[derive(Debug, Clone, Copy)]
pub enum Landing<'s> {
    /// Stayed on the store
    Store(StorePage<'s>),
    /// Sent to `/auth`
    Login(LoginPage<'s>),
    /// Sent to `/checkout`
    Checkout(CheckoutPage<'s>),
    /// Sent to a product page
    Product(ProductPage<'s>),
}

impl<'s> Landing<'s> {
    /// Classify a URL
    #[must_use]
    pub fn from_url(session: &'s Session, url: &str) -> Self {
        let path = path_of(url);
        if path.starts_with(LoginPage::PATH) {
            Self::Login(LoginPage::new(session))
        } else if path.starts_with(CheckoutPage::PATH) {
            Self::Checkout(CheckoutPage::new(session))
        } else if UrlMatcher::new(ProductPage::URL_PATTERN).matches(path) {
            Self::Product(ProductPage::new(session))
        } else {
            Self::Store(StorePage::new(session))
        }
    }

    /// Page scope of the landing screen
    #[must_use]
    pub const fn page(&self) -> PageName {
        match self {
            Self::Store(_) => PageName::Store,
            Self::Login(_) => PageName::Login,
            Self::Checkout(_) => PageName::Checkout,
            Self::Product(_) => PageName::Product,
        }
    }

    /// The checkout page, if that is where the action led
    #[must_use]
    pub const fn checkout(self) -> Option<CheckoutPage<'s>> {
        match self {
            Self::Checkout(page) => Some(page),
            _ => None,
        }
    }
}

impl fmt::Display for Landing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.page().fmt(f)
    }
}

/// Click something that may redirect and classify where it went.
/// Staying on `from_path` for the probe budget counts as no redirect.
pub(crate) async fn landing_after_click<'s>(
    session: &'s Session,
    page: PageName,
    name: &str,
    from_path: &str,
) -> E2eResult<Landing<'s>> {
    let waits = session.waits();
    session.click_when_ready(page, name, 0, &waits.short).await?;
    let url = match session
        .wait_for_url(&waits.probe, "redirect after add to cart", |u| {
            !path_of(u).starts_with(from_path)
        })
        .await
    {
        Ok(url) => url,
        Err(e) if e.is_timeout() => session.current_url().await?,
        Err(e) => return Err(e),
    };
    let landing = Landing::from_url(session, &url);
    tracing::info!(%url, %landing, "Landed after add to cart");
    Ok(landing)
}
