//! GroceryMate E2E: browser scenarios for the GroceryMate storefront
//!
//! Page objects drive a real browser through the [`BrowserDriver`] trait and
//! never sleep: every pause is a [`wait_until`] on something observable.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  GroceryMate E2E Architecture                   │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Scenario   │    │ Page       │    │ Browser    │            │
//! │   │ (tests/)   │───►│ Objects    │───►│ Driver     │            │
//! │   │            │    │ + Waits    │    │ (CDP / PW) │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! │         │                 │                 │                   │
//! │         ▼                 ▼                 ▼                   │
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Session    │    │ Locator    │    │ Failure    │            │
//! │   │ lifecycle  │    │ table      │    │ artifacts  │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Scenarios run through [`ScenarioRunner`], which launches a fresh browser
//! per test (or reuses one in [`SessionMode::Shared`]), resets browser state,
//! saves a screenshot when the body fails and always closes the browser.

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

pub mod artifacts;
pub mod cart;
pub mod config;
pub mod dom;
pub mod driver;
pub mod extract;
pub mod locator;
pub mod logging;
pub mod pages;
mod result;
pub mod script;
pub mod session;
pub mod wait;

#[cfg(feature = "browser")]
pub mod cdp;

#[cfg(feature = "playwright")]
pub mod playwright;

pub use cart::{CartCleaner, CartReport};
pub use config::{Credentials, SuiteConfig};
pub use dom::ElementSnapshot;
pub use driver::{launch, Backend, BrowserDriver, DriverConfig, MockDriver, MockPage};
pub use extract::{AgeVerdict, ProductSnapshot, ReviewComment, ShippingCost};
pub use locator::{Locator, LocatorTable, PageName, Strategy};
pub use pages::{
    AgeGate, CheckoutDetails, CheckoutPage, Landing, LoginPage, PageObject, ProductPage,
    ReviewSubmission, StorePage,
};
pub use result::{E2eError, E2eResult};
pub use session::{
    run_scenario, ScenarioFuture, ScenarioRunner, Session, SessionMode, SharedSession,
};
pub use wait::{wait_optional, wait_until, WaitOptions, WaitProfile};

#[cfg(feature = "browser")]
pub use cdp::ChromiumDriver;
#[cfg(feature = "playwright")]
pub use playwright::PlaywrightDriver;

/// Prelude for scenario files
pub mod prelude {
    pub use super::cart::{CartCleaner, CartReport};
    pub use super::config::{Credentials, SuiteConfig};
    pub use super::extract::*;
    pub use super::pages::*;
    pub use super::result::{E2eError, E2eResult};
    pub use super::session::{ScenarioRunner, Session, SessionMode};
    pub use super::wait::{WaitOptions, WaitProfile};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    mod prelude_tests {
        use super::*;

        #[test]
        fn test_prelude_exposes_page_objects() {
            let details = CheckoutDetails::default();
            assert_eq!(details.postal_code, "10001");
            assert!(parse_shipping_cost("Free").unwrap().is_free());
        }

        #[test]
        fn test_default_config_targets_production() {
            let config = SuiteConfig::default();
            assert_eq!(config.url("/store"), "https://grocerymate.masterschool.com/store");
            assert_eq!(config.session_mode, SessionMode::Isolated);
        }
    }
}
