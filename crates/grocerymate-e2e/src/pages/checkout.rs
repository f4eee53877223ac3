//! `/checkout` cart summary, quantity controls and order form.

use super::{path_of, PageObject};
use crate::dom::ElementSnapshot;
use crate::extract::{parse_shipping_cost, ShippingCost};
use crate::locator::PageName;
use crate::result::{E2eError, E2eResult};
use crate::session::Session;
use crate::wait::{wait_optional, wait_until};

/// Remove control glyph
pub const REMOVE_GLYPH: &str = "×";

/// Delivery and payment fields of the order form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutDetails {
    /// Street and number
    pub street: String,
    /// City
    pub city: String,
    /// Postal code
    pub postal_code: String,
    /// Card number, digits only
    pub card_number: String,
    /// Cardholder name
    pub name_on_card: String,
    /// `MM/YYYY`
    pub expiration: String,
    /// Card verification code
    pub cvv: String,
}

impl Default for CheckoutDetails {
    fn default() -> Self {
        Self {
            street: "123 Test St".to_string(),
            city: "Testville".to_string(),
            postal_code: "10001".to_string(),
            card_number: "4111111111111111".to_string(),
            name_on_card: "Test User".to_string(),
            expiration: "12/2029".to_string(),
            cvv: "123".to_string(),
        }
    }
}

impl CheckoutDetails {
    fn fields(&self) -> [(&'static str, &str); 7] {
        [
            ("street", self.street.as_str()),
            ("city", self.city.as_str()),
            ("postal_code", self.postal_code.as_str()),
            ("card_number", self.card_number.as_str()),
            ("name_on_card", self.name_on_card.as_str()),
            ("expiration", self.expiration.as_str()),
            ("cvv", self.cvv.as_str()),
        ]
    }
}

fn parse_quantity(found: &[ElementSnapshot]) -> E2eResult<Option<u32>> {
    match found.first() {
        None => Ok(None),
        Some(el) => {
            let raw = el.value_or_text().trim();
            raw.parse()
                .map(Some)
                .map_err(|_| E2eError::parse("cart quantity", raw))
        }
    }
}

/// Which quantity button to press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Up,
    Down,
}

/// Checkout page
#[derive(Debug, Clone, Copy)]
pub struct CheckoutPage<'s> {
    session: &'s Session,
}

impl<'s> PageObject<'s> for CheckoutPage<'s> {
    const PAGE: PageName = PageName::Checkout;
    const URL_PATTERN: &'static str = "/checkout";

    fn session(&self) -> &'s Session {
        self.session
    }
}

impl<'s> CheckoutPage<'s> {
    /// App path of checkout
    pub const PATH: &'static str = "/checkout";

    /// Wrap the session without navigating
    #[must_use]
    pub const fn new(session: &'s Session) -> Self {
        Self { session }
    }

    /// Navigate to `/checkout` and wait for it to render
    pub async fn open(session: &'s Session) -> E2eResult<Self> {
        session.goto(Self::PATH).await?;
        session
            .wait_for_url(&session.waits().short, "checkout url", |u| {
                path_of(u).starts_with(Self::PATH)
            })
            .await?;
        Self::wait_until_rendered(session).await
    }

    /// Give the summary a short chance to render. An empty cart renders
    /// none of the probed elements, so running out of time is not an error.
    pub async fn wait_until_rendered(session: &'s Session) -> E2eResult<Self> {
        let rendered = session
            .wait_for_any(
                &[
                    (Self::PAGE, "shipping_cost"),
                    (Self::PAGE, "remove"),
                    (Self::PAGE, "cart_item"),
                    (Self::PAGE, "street"),
                    (Self::PAGE, "total"),
                ],
                &session.waits().short,
            )
            .await;
        match rendered {
            Ok(_) => {}
            Err(e) if e.is_timeout() => tracing::debug!("Checkout rendered no summary content"),
            Err(e) => return Err(e),
        }
        Ok(Self::new(session))
    }

    /// Current URL is under `/checkout`
    pub async fn is_displayed(&self) -> E2eResult<bool> {
        let url = self.session.current_url().await?;
        Ok(path_of(&url).starts_with(Self::PATH))
    }

    /// Whether the cart lists anything, by item rows or remove controls
    pub async fn has_items(&self) -> E2eResult<bool> {
        let items = self.session.locator(Self::PAGE, "cart_item")?;
        let remove = self.session.locator(Self::PAGE, "remove")?;
        let driver = self.session.driver();
        let found = wait_optional(&self.session.waits().probe, "cart items", || async move {
            let rows = match driver.query_all(items).await {
                Ok(rows) => rows,
                Err(e) => return Err(e),
            };
            if !rows.is_empty() {
                return Ok(Some(()));
            }
            driver.query_all(remove).await.map(|controls| {
                controls
                    .iter()
                    .any(|el| el.text_trimmed() == REMOVE_GLYPH)
                    .then_some(())
            })
        })
        .await?;
        Ok(found.is_some())
    }

    // =========================================================================
    // SHIPPING
    // =========================================================================

    /// Raw text of the shipping line
    pub async fn read_shipping_cost(&self) -> E2eResult<String> {
        let locator = self.session.locator(Self::PAGE, "shipping_cost")?;
        let driver = self.session.driver();
        wait_until(&self.session.waits().short, "shipping cost text", || async move {
            driver.query_all(locator).await.map(|found| {
                found
                    .iter()
                    .map(|el| el.text_trimmed().to_string())
                    .find(|t| !t.is_empty())
            })
        })
        .await
    }

    /// Parsed shipping line
    pub async fn shipping_cost(&self) -> E2eResult<ShippingCost> {
        parse_shipping_cost(&self.read_shipping_cost().await?)
    }

    // =========================================================================
    // QUANTITY
    // =========================================================================

    /// Quantity of the first cart line
    pub async fn quantity(&self) -> E2eResult<u32> {
        let found = self
            .session
            .wait_for_present(Self::PAGE, "quantity", &self.session.waits().short)
            .await?;
        parse_quantity(&found)?.ok_or_else(|| E2eError::parse("cart quantity", ""))
    }

    /// Press `+` `times` times; returns the final quantity
    pub async fn increase_quantity(&self, times: u32) -> E2eResult<u32> {
        self.step_quantity(Step::Up, times).await
    }

    /// Press `-` `times` times; returns the final quantity, 0 once the line
    /// is gone
    pub async fn decrease_quantity(&self, times: u32) -> E2eResult<u32> {
        self.step_quantity(Step::Down, times).await
    }

    async fn step_quantity(&self, step: Step, times: u32) -> E2eResult<u32> {
        let button = match step {
            Step::Up => "plus",
            Step::Down => "minus",
        };
        let waits = self.session.waits();
        let locator = self.session.locator(Self::PAGE, "quantity")?;
        let driver = self.session.driver();

        let mut current = self.quantity().await?;
        for _ in 0..times {
            if current == 0 {
                break;
            }
            let before = current;
            self.session
                .click_when_ready(Self::PAGE, button, 0, &waits.short)
                .await?;
            current = wait_until(&waits.short, "cart quantity to change", || async move {
                driver.query_all(locator).await.and_then(|found| {
                    Ok(match parse_quantity(&found)? {
                        None if step == Step::Down => Some(0),
                        Some(q) if q != before => Some(q),
                        _ => None,
                    })
                })
            })
            .await?;
            tracing::debug!(before, after = current, "Cart quantity stepped");
        }
        Ok(current)
    }

    /// Decrement one unit at a time while the subtotal is still at or above
    /// `threshold`, reading shipping after each step. Returns the final
    /// quantity and shipping text.
    pub async fn reduce_below_threshold(
        &self,
        unit_price: f64,
        quantity: u32,
        threshold: f64,
    ) -> E2eResult<(u32, String)> {
        let mut qty = quantity;
        let mut shipping = self.read_shipping_cost().await?;
        while qty > 0 && unit_price * f64::from(qty) >= threshold {
            qty = self.decrease_quantity(1).await?;
            shipping = self.read_shipping_cost().await?;
            tracing::debug!(qty, %shipping, "Reduced below threshold step");
        }
        Ok((qty, shipping))
    }

    // =========================================================================
    // ORDER
    // =========================================================================

    /// Fill delivery and payment fields
    pub async fn fill_checkout_form(&self, details: &CheckoutDetails) -> E2eResult<()> {
        let waits = self.session.waits();
        self.session
            .wait_for_visible(Self::PAGE, "street", &waits.short)
            .await?;
        for (name, value) in details.fields() {
            self.session
                .fill_when_ready(Self::PAGE, name, 0, value, &waits.short)
                .await?;
        }
        Ok(())
    }

    /// Press "Buy now"
    pub async fn place_order(&self) -> E2eResult<()> {
        self.session
            .click_when_ready(Self::PAGE, "buy_now", 0, &self.session.waits().short)
            .await
    }

    /// Wait for the redirect to the home page that confirms an order
    pub async fn wait_for_order_confirmation(&self) -> E2eResult<String> {
        let home = self.session.url("/");
        let home = home.trim_end_matches('/');
        let url = self
            .session
            .wait_for_url(&self.session.waits().long, "order confirmation redirect", |u| {
                u.trim_end_matches('/') == home
            })
            .await?;
        tracing::info!(%url, "Order confirmed");
        Ok(url)
    }

    /// Fill the form, place the order and wait for confirmation
    pub async fn buy(&self, details: &CheckoutDetails) -> E2eResult<String> {
        self.fill_checkout_form(details).await?;
        self.place_order().await?;
        self.wait_for_order_confirmation().await
    }

    /// Text of the total line
    pub async fn total_amount_text(&self) -> E2eResult<String> {
        let found = self
            .session
            .wait_for_present(Self::PAGE, "total", &self.session.waits().short)
            .await?;
        Ok(found
            .first()
            .map(|el| el.text_trimmed().to_string())
            .unwrap_or_default())
    }
}
