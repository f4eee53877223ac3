//! Shared setup for the live-storefront scenarios.

#![allow(dead_code)]

use futures::FutureExt;
use grocerymate_e2e::logging;
use grocerymate_e2e::prelude::*;
use std::future::Future;
use std::panic::AssertUnwindSafe;

/// Runner from `grocerymate.yaml`, `.env` and the environment
pub fn runner() -> ScenarioRunner {
    logging::init();
    let config = SuiteConfig::load().expect("suite configuration");
    ScenarioRunner::new(config).expect("locator table")
}

/// Test account, or `None` with a log line when it is not configured
pub fn credentials(runner: &ScenarioRunner) -> Option<Credentials> {
    let credentials = runner.config().credentials().cloned();
    if credentials.is_none() {
        tracing::warn!("USER_EMAIL / USER_PASSWORD not set, skipping authenticated scenario");
    }
    credentials
}

/// Failure text when a known-defect scenario cannot reach the defect. It
/// must not match `should_panic(expected = "known defect")`.
pub const DEFECT_CHECK_SKIPPED: &str =
    "defect check did not run: USER_EMAIL / USER_PASSWORD not set";

/// Test account for a known-defect scenario. Without one the test fails
/// outright rather than passing as an observed defect.
pub fn defect_check_credentials(runner: &ScenarioRunner) -> Credentials {
    match credentials(runner) {
        Some(credentials) => credentials,
        None => panic!("{DEFECT_CHECK_SKIPPED}"),
    }
}

/// Log in, answer the age gate as an adult and land on the store
pub async fn enter_store<'s>(
    session: &'s Session,
    credentials: &Credentials,
) -> E2eResult<StorePage<'s>> {
    LoginPage::sign_in(session, credentials).await?;
    let gate = AgeGate::new(session);
    gate.open_from_nav().await?;
    let verdict = gate.verify(&session.config().fixtures.adult).await?;
    assert_eq!(verdict, AgeVerdict::OfAge, "adult fixture was not accepted");
    StorePage::open(session).await
}

/// Buy one unit of the first product; returns its id
pub async fn purchase_first_product(store: StorePage<'_>) -> E2eResult<String> {
    let product_id = store.first_product_id().await?;
    let landing = store.add_first_product_to_cart(1).await?;
    let checkout = match landing.checkout() {
        Some(checkout) => checkout,
        None => store.go_to_checkout().await?,
    };
    checkout.buy(&CheckoutDetails::default()).await?;
    Ok(product_id)
}

/// A purchased product's page with any earlier review by the test account
/// removed
pub async fn reviewable_product<'s>(
    session: &'s Session,
    credentials: &Credentials,
) -> E2eResult<ProductPage<'s>> {
    let store = enter_store(session, credentials).await?;
    let product_id = purchase_first_product(store).await?;
    let product = ProductPage::open(session, &product_id).await?;
    product.remove_existing_review().await?;
    product.wait_for_review_form().await?;
    Ok(product)
}

/// Run `body`, then empty the cart even when `body` failed or panicked
pub async fn with_cart_cleanup<F>(session: &Session, body: F) -> E2eResult<()>
where
    F: Future<Output = E2eResult<()>>,
{
    let outcome = AssertUnwindSafe(body).catch_unwind().await;
    let cleanup = CartCleaner::new(session).clear_cart().await;
    match outcome {
        Ok(result) => {
            result?;
            cleanup.map(|report| tracing::debug!(?report, "Cart cleanup"))
        }
        Err(panic) => {
            if let Err(e) = cleanup {
                tracing::warn!(error = %e, "Cart cleanup after panic failed");
            }
            std::panic::resume_unwind(panic)
        }
    }
}
