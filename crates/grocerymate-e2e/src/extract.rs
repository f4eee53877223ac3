//! Derived-value extractors.
//!
//! Pure functions turning DOM text and [`ElementSnapshot`] fragments into
//! prices, ratings, review counts and shipping costs. None of these touch
//! the browser, so every rule is unit-tested against fixed fragments.

use crate::dom::ElementSnapshot;
use crate::result::{E2eError, E2eResult};
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Currency symbol the storefront renders
pub const CURRENCY: char = '€';

/// Subtotal at which shipping becomes free
pub const FREE_SHIPPING_THRESHOLD: f64 = 20.0;

/// Age required to pass the age gate
pub const ADULT_AGE: u32 = 18;

/// Date format of the DOB input
pub const DOB_FORMAT: &str = "%d-%m-%Y";

static REVIEW_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\((\d+)\)$").expect("review count pattern"));

static WIDTH_PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"width:\s*([0-9]+(?:\.[0-9]+)?)%").expect("width pattern"));

// =============================================================================
// PRICES
// =============================================================================

/// Parse `€3,50`, `3.50 €` or `€ 12` into a number
pub fn parse_price(raw: &str) -> E2eResult<f64> {
    let cleaned = raw.replace(CURRENCY, "").trim().replace(',', ".");
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| E2eError::parse("price", raw))
}

/// Price shown on a product card: `discount-price`, then `price`, then any
/// innermost descendant whose text contains the currency symbol.
pub fn price_from_card(card: &ElementSnapshot) -> E2eResult<f64> {
    for class in ["discount-price", "price"] {
        if let Some(el) = card.find_by_class(class) {
            if !el.text_trimmed().is_empty() {
                return parse_price(el.text_trimmed());
            }
        }
    }

    card.descendants()
        .into_iter()
        .filter(|n| n.text.contains(CURRENCY))
        .find(|n| !n.children.iter().any(|c| c.text.contains(CURRENCY)))
        .map_or_else(
            || Err(E2eError::parse("price", card.text_trimmed())),
            |n| parse_price(n.text_trimmed()),
        )
}

// =============================================================================
// RATINGS & REVIEWS
// =============================================================================

/// Parse a review count rendered as `(<integer>)`
pub fn parse_review_count(raw: &str) -> E2eResult<u32> {
    REVIEW_COUNT
        .captures(raw.trim())
        .and_then(|c| c[1].parse().ok())
        .ok_or_else(|| E2eError::parse("review count", raw))
}

/// Percentage from an inline `width: NN%` style
#[must_use]
pub fn width_percent(style: &str) -> Option<f64> {
    WIDTH_PERCENT
        .captures(style)
        .and_then(|c| c[1].parse().ok())
}

/// Round to one decimal place
#[must_use]
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Displayed average rating from a star widget.
///
/// Full stars count 1.0. The first partial star contributes the width of its
/// `.filled` child as a fraction; stars after it are ignored.
#[must_use]
pub fn average_rating_from_stars(widget: &ElementSnapshot) -> f64 {
    let mut full = 0u32;
    let mut partial = 0.0;

    for star in widget.find_all_by_class("star") {
        if star.has_class("full") {
            full += 1;
        } else if star.has_class("partial") {
            partial = star
                .find_by_class("filled")
                .and_then(|f| width_percent(&f.style))
                .map_or(0.0, |pct| pct / 100.0);
            break;
        }
    }

    round1(f64::from(full) + partial)
}

/// Mean of per-review ratings, rounded to one decimal
pub fn average_from_review_ratings(ratings: &[u8]) -> E2eResult<f64> {
    if ratings.is_empty() {
        return Err(E2eError::parse("review ratings", ""));
    }
    let total: u32 = ratings.iter().map(|&r| u32::from(r)).sum();
    Ok(round1(f64::from(total) / ratings.len() as f64))
}

/// One rendered review
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewComment {
    /// Display name of the author
    pub author: String,
    /// Review body
    pub text: String,
    /// Star rating shown beside the review, `(n)`
    pub rating: Option<u8>,
}

/// Read a review from a `div.comment` block. `None` when the block has no author.
#[must_use]
pub fn review_comment_from_block(block: &ElementSnapshot) -> Option<ReviewComment> {
    let author = block
        .find_by_class("author")
        .or_else(|| block.find_by_class("review-username"))
        .or_else(|| {
            block
                .find_by_class("comment-header")
                .and_then(|h| h.find_by_tag("strong"))
        })?
        .text_trimmed()
        .to_string();

    let text = block
        .find_by_class("text")
        .or_else(|| block.find_by_class("review-comment"))
        .map(|t| t.text_trimmed().to_string())
        .unwrap_or_default();

    let rating = block
        .find(|n| n.tag == "span" && n.has_class("small"))
        .and_then(|s| parse_review_count(&s.text).ok())
        .and_then(|n| u8::try_from(n).ok());

    Some(ReviewComment {
        author,
        text,
        rating,
    })
}

/// Price, rating and review count read together from a product page
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProductSnapshot {
    /// Unit price
    pub price: f64,
    /// Displayed average rating in `[0, 5]`
    pub average_rating: f64,
    /// Number of reviews
    pub review_count: u32,
}

// =============================================================================
// SHIPPING
// =============================================================================

/// Shipping line on the checkout summary
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ShippingCost {
    /// No charge
    Free,
    /// Charged amount in euros
    Amount(f64),
}

impl ShippingCost {
    /// Whether shipping is free
    #[must_use]
    pub fn is_free(&self) -> bool {
        match self {
            Self::Free => true,
            Self::Amount(a) => *a == 0.0,
        }
    }
}

/// Parse `Free`, `€0,00` or `€5,00`
pub fn parse_shipping_cost(raw: &str) -> E2eResult<ShippingCost> {
    if raw.to_lowercase().contains("free") {
        return Ok(ShippingCost::Free);
    }
    match parse_price(raw) {
        Ok(v) if v == 0.0 => Ok(ShippingCost::Free),
        Ok(v) => Ok(ShippingCost::Amount(v)),
        Err(_) => Err(E2eError::parse("shipping cost", raw)),
    }
}

/// Smallest quantity whose subtotal strictly exceeds `threshold`
pub fn threshold_crossing_quantity(unit_price: f64, threshold: f64) -> E2eResult<u32> {
    if !(unit_price.is_finite() && unit_price > 0.0) {
        return Err(E2eError::invalid_input(format!(
            "unit price must be positive, got {unit_price}"
        )));
    }
    Ok((threshold / unit_price).floor() as u32 + 1)
}

/// Quantity left after removing one unit at a time while the subtotal is
/// still at or above `threshold`
#[must_use]
pub fn quantity_below_threshold(unit_price: f64, quantity: u32, threshold: f64) -> u32 {
    let mut qty = quantity;
    while qty > 0 && unit_price * f64::from(qty) >= threshold {
        qty -= 1;
    }
    qty
}

// =============================================================================
// AGE GATE
// =============================================================================

/// Outcome reported by the age-gate toast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AgeVerdict {
    /// "You are of age"
    OfAge,
    /// "You are underage"
    Underage,
    /// "Please enter your birth date"
    MissingDate,
}

/// Classify toast text, case-insensitively
#[must_use]
pub fn classify_toast(text: &str) -> Option<AgeVerdict> {
    let lower = text.to_lowercase();
    if lower.contains("underage") {
        Some(AgeVerdict::Underage)
    } else if lower.contains("you are of age") {
        Some(AgeVerdict::OfAge)
    } else if lower.contains("please enter your birth date") {
        Some(AgeVerdict::MissingDate)
    } else {
        None
    }
}

/// Parse a `DD-MM-YYYY` birth date
pub fn parse_dob(raw: &str) -> E2eResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DOB_FORMAT).map_err(|_| E2eError::parse("date of birth", raw))
}

/// Completed years between `dob` and `today`
#[must_use]
pub fn age_on(dob: NaiveDate, today: NaiveDate) -> u32 {
    let mut years = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    u32::try_from(years).unwrap_or(0)
}

/// Verdict the app should give for a DOB string on `today`
pub fn expected_verdict(raw: &str, today: NaiveDate) -> E2eResult<AgeVerdict> {
    if raw.trim().is_empty() {
        return Ok(AgeVerdict::MissingDate);
    }
    let dob = parse_dob(raw)?;
    Ok(if age_on(dob, today) >= ADULT_AGE {
        AgeVerdict::OfAge
    } else {
        AgeVerdict::Underage
    })
}

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Product id from a card's quantity input name, `quantity_<id>`
pub fn product_id_from_quantity_name(name: &str) -> E2eResult<String> {
    match name.trim().split_once('_') {
        Some(("quantity", id)) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(E2eError::parse("product id", name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn star(class: &str) -> ElementSnapshot {
        ElementSnapshot::new("span").with_class(format!("star {class}"))
    }

    fn partial(width: &str) -> ElementSnapshot {
        star("partial").with_child(
            ElementSnapshot::new("span")
                .with_class("filled")
                .with_style(format!("width: {width};")),
        )
    }

    mod price_tests {
        use super::*;

        #[test]
        fn test_parse_price_formats() {
            assert_eq!(parse_price("€3,50").unwrap(), 3.5);
            assert_eq!(parse_price("4.99 €").unwrap(), 4.99);
            assert_eq!(parse_price(" € 12 ").unwrap(), 12.0);
        }

        #[test]
        fn test_parse_price_rejects_text() {
            let err = parse_price("Sold out").unwrap_err();
            assert!(err.to_string().contains("Sold out"));
        }

        #[test]
        fn test_discount_price_preferred() {
            let card = ElementSnapshot::new("div")
                .with_class("product-card")
                .with_child(ElementSnapshot::new("span").with_class("price").with_text("€3,50"))
                .with_child(
                    ElementSnapshot::new("span")
                        .with_class("discount-price")
                        .with_text("€2,99"),
                );
            assert_eq!(price_from_card(&card).unwrap(), 2.99);
        }

        #[test]
        fn test_falls_back_to_price_class() {
            let card = ElementSnapshot::new("div")
                .with_child(ElementSnapshot::new("span").with_class("discount-price"))
                .with_child(ElementSnapshot::new("span").with_class("price").with_text("€4,99"));
            assert_eq!(price_from_card(&card).unwrap(), 4.99);
        }

        #[test]
        fn test_falls_back_to_innermost_currency_text() {
            let card = ElementSnapshot::new("div").with_child(
                ElementSnapshot::new("div")
                    .with_text("Apples €1,25")
                    .with_child(ElementSnapshot::new("b").with_text("€1,25")),
            );
            assert_eq!(price_from_card(&card).unwrap(), 1.25);
        }

        #[test]
        fn test_card_without_price_is_parse_error() {
            let card = ElementSnapshot::new("div")
                .with_text("Apples")
                .with_child(ElementSnapshot::new("h3").with_text("Apples"));
            assert!(matches!(
                price_from_card(&card),
                Err(E2eError::Parse { what: "price", .. })
            ));
        }
    }

    mod rating_tests {
        use super::*;

        #[test]
        fn test_three_full_and_forty_percent() {
            let widget = ElementSnapshot::new("div")
                .with_class("custom-rating")
                .with_child(star("full"))
                .with_child(star("full"))
                .with_child(star("full"))
                .with_child(partial("40%"))
                .with_child(star("empty"));
            assert_eq!(average_rating_from_stars(&widget), 3.4);
        }

        #[test]
        fn test_only_first_partial_counts() {
            let widget = ElementSnapshot::new("div")
                .with_child(star("full"))
                .with_child(partial("50%"))
                .with_child(partial("90%"))
                .with_child(star("full"));
            assert_eq!(average_rating_from_stars(&widget), 1.5);
        }

        #[test]
        fn test_partial_without_width_counts_zero() {
            let widget = ElementSnapshot::new("div")
                .with_child(star("full"))
                .with_child(star("partial"));
            assert_eq!(average_rating_from_stars(&widget), 1.0);
        }

        #[test]
        fn test_fractional_width_rounds() {
            let widget = ElementSnapshot::new("div")
                .with_child(star("full"))
                .with_child(star("full"))
                .with_child(partial("66.67%"));
            assert_eq!(average_rating_from_stars(&widget), 2.7);
        }

        #[test]
        fn test_review_count() {
            assert_eq!(parse_review_count("(42)").unwrap(), 42);
            assert_eq!(parse_review_count(" (0) ").unwrap(), 0);
            assert!(parse_review_count("42 reviews").is_err());
            assert!(parse_review_count("(4 2)").is_err());
            assert!(parse_review_count("()").is_err());
        }

        #[test]
        fn test_average_from_review_ratings() {
            assert_eq!(average_from_review_ratings(&[4, 5, 3]).unwrap(), 4.0);
            assert_eq!(average_from_review_ratings(&[5, 4]).unwrap(), 4.5);
            assert_eq!(average_from_review_ratings(&[1, 2, 2]).unwrap(), 1.7);
            assert!(average_from_review_ratings(&[]).is_err());
        }
    }

    mod comment_tests {
        use super::*;

        #[test]
        fn test_comment_with_header_author_and_rating() {
            let block = ElementSnapshot::new("div")
                .with_class("comment")
                .with_child(
                    ElementSnapshot::new("div")
                        .with_class("comment-header")
                        .with_child(ElementSnapshot::new("strong").with_text("AutoTestG"))
                        .with_child(
                            ElementSnapshot::new("span")
                                .with_class("small")
                                .with_text("(4)"),
                        ),
                )
                .with_child(
                    ElementSnapshot::new("p")
                        .with_class("text")
                        .with_text(" Fresh and crunchy "),
                );
            let review = review_comment_from_block(&block).unwrap();
            assert_eq!(review.author, "AutoTestG");
            assert_eq!(review.text, "Fresh and crunchy");
            assert_eq!(review.rating, Some(4));
        }

        #[test]
        fn test_comment_without_author_skipped() {
            let block = ElementSnapshot::new("div")
                .with_class("comment")
                .with_child(ElementSnapshot::new("p").with_class("text").with_text("orphan"));
            assert!(review_comment_from_block(&block).is_none());
        }

        #[test]
        fn test_comment_without_text_has_empty_body() {
            let block = ElementSnapshot::new("div")
                .with_child(ElementSnapshot::new("span").with_class("author").with_text("Ann"));
            let review = review_comment_from_block(&block).unwrap();
            assert!(review.text.is_empty());
            assert_eq!(review.rating, None);
        }
    }

    mod shipping_tests {
        use super::*;

        #[test]
        fn test_parse_shipping_cost() {
            assert_eq!(parse_shipping_cost("Free").unwrap(), ShippingCost::Free);
            assert_eq!(parse_shipping_cost("€0,00").unwrap(), ShippingCost::Free);
            assert_eq!(
                parse_shipping_cost("€5,00").unwrap(),
                ShippingCost::Amount(5.0)
            );
            assert!(parse_shipping_cost("pending").is_err());
        }

        #[test]
        fn test_threshold_for_four_ninety_nine() {
            let qty = threshold_crossing_quantity(4.99, FREE_SHIPPING_THRESHOLD).unwrap();
            assert_eq!(qty, 5);
            assert!(4.99 * f64::from(qty) >= FREE_SHIPPING_THRESHOLD);
            assert_eq!(quantity_below_threshold(4.99, qty, FREE_SHIPPING_THRESHOLD), 4);
        }

        #[test]
        fn test_threshold_rejects_zero_price() {
            assert!(matches!(
                threshold_crossing_quantity(0.0, 20.0),
                Err(E2eError::InvalidInput { .. })
            ));
        }

        #[test]
        fn test_below_threshold_already_below() {
            assert_eq!(quantity_below_threshold(3.0, 2, 20.0), 2);
        }
    }

    mod age_tests {
        use super::*;

        fn day(y: i32, m: u32, d: u32) -> NaiveDate {
            NaiveDate::from_ymd_opt(y, m, d).unwrap()
        }

        #[test]
        fn test_age_birthday_boundary() {
            let dob = day(2000, 8, 8);
            assert_eq!(age_on(dob, day(2018, 8, 7)), 17);
            assert_eq!(age_on(dob, day(2018, 8, 8)), 18);
            assert_eq!(age_on(dob, day(2025, 1, 1)), 24);
        }

        #[test]
        fn test_expected_verdicts() {
            let today = day(2026, 10, 15);
            assert_eq!(
                expected_verdict("08-08-2000", today).unwrap(),
                AgeVerdict::OfAge
            );
            assert_eq!(
                expected_verdict("08-08-2010", today).unwrap(),
                AgeVerdict::Underage
            );
            assert_eq!(expected_verdict("", today).unwrap(), AgeVerdict::MissingDate);
            assert!(expected_verdict("2000-08-08", today).is_err());
        }

        #[test]
        fn test_classify_toast() {
            assert_eq!(classify_toast("You are of age"), Some(AgeVerdict::OfAge));
            assert_eq!(classify_toast("You are underage!"), Some(AgeVerdict::Underage));
            assert_eq!(
                classify_toast("Please enter your birth date"),
                Some(AgeVerdict::MissingDate)
            );
            assert_eq!(classify_toast("Welcome"), None);
        }
    }

    mod id_tests {
        use super::*;

        #[test]
        fn test_product_id_from_name() {
            assert_eq!(
                product_id_from_quantity_name("quantity_64a7f0c2").unwrap(),
                "64a7f0c2"
            );
            assert_eq!(
                product_id_from_quantity_name("quantity_a_b").unwrap(),
                "a_b"
            );
            assert!(product_id_from_quantity_name("quantity_").is_err());
            assert!(product_id_from_quantity_name("qty_12").is_err());
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_threshold_quantity_is_minimal(
                price in 0.5f64..50.0,
                threshold in 1.0f64..100.0,
            ) {
                let qty = threshold_crossing_quantity(price, threshold).unwrap();
                prop_assert!(price * f64::from(qty) > threshold - 1e-9);
                prop_assert!(price * f64::from(qty - 1) <= threshold + 1e-9);
            }

            #[test]
            fn prop_reduced_quantity_is_below_threshold(
                price in 0.5f64..50.0,
                qty in 1u32..60,
                threshold in 1.0f64..100.0,
            ) {
                let reduced = quantity_below_threshold(price, qty, threshold);
                prop_assert!(reduced <= qty);
                prop_assert!(price * f64::from(reduced) < threshold);
            }

            #[test]
            fn prop_review_count_roundtrip(n in 0u32..1_000_000) {
                prop_assert_eq!(parse_review_count(&format!("({n})")).unwrap(), n);
            }

            #[test]
            fn prop_average_within_rating_range(ratings in proptest::collection::vec(1u8..=5, 1..40)) {
                let avg = average_from_review_ratings(&ratings).unwrap();
                prop_assert!((1.0..=5.0).contains(&avg));
            }
        }
    }
}
