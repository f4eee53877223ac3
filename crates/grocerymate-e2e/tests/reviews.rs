//! Product review scenarios against the live storefront.
//!
//! Every scenario buys the product it reviews and deletes the test
//! account's earlier review first, so none depends on another having run.
//!
//! Run with `cargo test --features browser -- --ignored`.

#![cfg(any(feature = "browser", feature = "playwright"))]

mod common;

use grocerymate_e2e::pages::product::MAX_REVIEW_CHARS;
use grocerymate_e2e::prelude::*;
use uuid::Uuid;

const LIMIT_WARNING: &str = "You cannot tell us more about this product";

async fn round_trip(s: &Session, credentials: &Credentials, stars: u8, label: &str) -> E2eResult<()> {
    let product = common::reviewable_product(s, credentials).await?;
    let author = s.config().author.clone();
    let review = ReviewSubmission::new(&author, label).with_rating(stars);

    let posted = product.submit(&review).await?;
    assert_eq!(posted.text, review.body);
    assert!(product.user_has_comment(&author).await?, "No review found for {author}");
    assert_eq!(
        product.user_comment_text(&author).await?.as_deref(),
        Some(review.body.as_str()),
        "Listed review text differs from what was submitted"
    );
    Ok(())
}

// ============================================================================
// Round trips
// ============================================================================

#[tokio::test]
#[ignore = "drives a browser against the live storefront"]
async fn one_star_review_is_listed() {
    let runner = common::runner();
    let Some(credentials) = common::credentials(&runner) else {
        return;
    };
    runner
        .run("reviews::one_star_review_is_listed", move |s| {
            Box::pin(async move { round_trip(s, &credentials, 1, "1 Star review").await })
        })
        .await
        .unwrap();
    runner.finish().await.unwrap();
}

#[tokio::test]
#[ignore = "drives a browser against the live storefront"]
async fn four_star_review_is_listed() {
    let runner = common::runner();
    let Some(credentials) = common::credentials(&runner) else {
        return;
    };
    runner
        .run("reviews::four_star_review_is_listed", move |s| {
            Box::pin(async move { round_trip(s, &credentials, 4, "4 Star review").await })
        })
        .await
        .unwrap();
    runner.finish().await.unwrap();
}

#[tokio::test]
#[ignore = "drives a browser against the live storefront"]
async fn review_without_stars_is_blocked() {
    let runner = common::runner();
    let Some(credentials) = common::credentials(&runner) else {
        return;
    };
    runner
        .run("reviews::review_without_stars_is_blocked", move |s| {
            Box::pin(async move {
                let product = common::reviewable_product(s, &credentials).await?;
                let author = s.config().author.clone();
                let review = ReviewSubmission::new(&author, "no star review");

                product.enter_review_text(&review.body).await?;
                if product.is_send_enabled().await? {
                    product.submit_review().await?;
                }
                assert!(
                    !product.user_has_comment(&author).await?,
                    "Review without a rating was saved for {author}"
                );
                Ok(())
            })
        })
        .await
        .unwrap();
    runner.finish().await.unwrap();
}

// ============================================================================
// Known defects
// ============================================================================

#[tokio::test]
#[ignore = "drives a browser against the live storefront"]
#[should_panic(expected = "known defect")]
async fn send_disabled_at_character_limit() {
    let runner = common::runner();
    let credentials = common::defect_check_credentials(&runner);
    runner
        .run("reviews::send_disabled_at_character_limit", move |s| {
            Box::pin(async move {
                let product = common::reviewable_product(s, &credentials).await?;
                product.select_star_rating(5).await?;
                product.enter_review_text(&"X".repeat(MAX_REVIEW_CHARS + 100)).await?;

                let entered = product.review_text_value().await?;
                assert_eq!(
                    entered.chars().count(),
                    MAX_REVIEW_CHARS,
                    "Field did not enforce the {MAX_REVIEW_CHARS} character limit"
                );
                let warning = product.char_limit_warning().await?.unwrap_or_default();
                assert!(warning.contains(LIMIT_WARNING), "Expected limit warning, got: {warning:?}");
                assert!(
                    !product.is_send_enabled().await?,
                    "known defect: send stays enabled at {MAX_REVIEW_CHARS}/{MAX_REVIEW_CHARS} characters"
                );
                Ok(())
            })
        })
        .await
        .unwrap();
}

#[tokio::test]
#[ignore = "drives a browser against the live storefront"]
#[should_panic(expected = "known defect")]
async fn review_text_survives_refresh() {
    let runner = common::runner();
    let credentials = common::defect_check_credentials(&runner);
    runner
        .run("reviews::review_text_survives_refresh", move |s| {
            Box::pin(async move {
                let product = common::reviewable_product(s, &credentials).await?;
                let author = s.config().author.clone();
                let review = ReviewSubmission::new(&author, "text-persist").with_rating(3);

                product.select_star_rating(3).await?;
                product.enter_review_text(&review.body).await?;
                product.submit_review().await?;

                s.driver().reload().await?;
                let product = ProductPage::wait_until_loaded(s).await?;
                let comments = product.review_comments().await?;
                assert!(
                    comments.iter().any(|c| c.text.contains(&review.body)),
                    "known defect: review text not found after refresh"
                );
                Ok(())
            })
        })
        .await
        .unwrap();
}

// ============================================================================
// Average rating
// ============================================================================

#[tokio::test]
#[ignore = "drives a browser against the live storefront"]
async fn displayed_average_matches_reviews() {
    let runner = common::runner();
    let Some(credentials) = common::credentials(&runner) else {
        return;
    };
    runner
        .run("reviews::displayed_average_matches_reviews", move |s| {
            Box::pin(async move {
                let store = common::enter_store(s, &credentials).await?;
                let product_id = store.first_product_id().await?;
                let product = ProductPage::open(s, &product_id).await?;

                let old_count = product.review_count().await?;
                let removed = product.remove_existing_review().await?;
                product.wait_for_review_form().await?;

                let stars = Uuid::new_v4().as_bytes()[0] % 5 + 1;
                let author = s.config().author.clone();
                let review = ReviewSubmission::new(&author, "average").with_rating(stars);
                product.submit(&review).await?;

                s.driver().reload().await?;
                let product = ProductPage::wait_until_loaded(s).await?;
                let actual = product.average_from_visible_reviews().await?;
                let displayed = product.average_rating().await?;
                assert!(
                    (actual - displayed).abs() <= 0.11,
                    "Displayed average {displayed} does not match reviews average {actual}"
                );

                let expected = if removed { old_count } else { old_count + 1 };
                let new_count = product.review_count().await?;
                assert_eq!(new_count, expected, "Review count before: {old_count}, after: {new_count}");
                Ok(())
            })
        })
        .await
        .unwrap();
    runner.finish().await.unwrap();
}
