//! `/store` product grid.

use super::{landing_after_click, path_of, AgeGate, CheckoutPage, Landing, PageObject, ProductPage};
use crate::dom::ElementSnapshot;
use crate::extract::{price_from_card, product_id_from_quantity_name};
use crate::locator::PageName;
use crate::result::{E2eError, E2eResult};
use crate::script;
use crate::session::Session;

/// Store page
#[derive(Debug, Clone, Copy)]
pub struct StorePage<'s> {
    session: &'s Session,
}

impl<'s> PageObject<'s> for StorePage<'s> {
    const PAGE: PageName = PageName::Store;
    const URL_PATTERN: &'static str = "/store";

    fn session(&self) -> &'s Session {
        self.session
    }
}

impl<'s> StorePage<'s> {
    /// App path of the store
    pub const PATH: &'static str = "/store";

    /// Wrap the session without navigating
    #[must_use]
    pub const fn new(session: &'s Session) -> Self {
        Self { session }
    }

    /// Navigate to `/store`, get past the age gate if it shows, and wait for
    /// product cards
    pub async fn open(session: &'s Session) -> E2eResult<Self> {
        let waits = session.waits();
        session.goto(Self::PATH).await?;
        session
            .wait_for_any(
                &[(Self::PAGE, "product_card"), (PageName::AgeGate, "dob_input")],
                &waits.short,
            )
            .await?;
        AgeGate::new(session)
            .pass_if_present(&session.config().fixtures.store_pass)
            .await?;
        session
            .wait_for_present(Self::PAGE, "product_card", &waits.long)
            .await?;
        tracing::info!("Store open");
        Ok(Self::new(session))
    }

    /// First product card, scrolled into view
    pub async fn first_product_card(&self) -> E2eResult<ElementSnapshot> {
        let cards = self
            .session
            .wait_for_present(Self::PAGE, "product_card", &self.session.waits().short)
            .await?;
        self.session
            .scroll_into_view(Self::PAGE, "product_card", 0)
            .await?;
        cards
            .into_iter()
            .next()
            .ok_or_else(|| E2eError::parse("product card", ""))
    }

    /// Unit price of the first product
    pub async fn first_product_price(&self) -> E2eResult<f64> {
        price_from_card(&self.first_product_card().await?)
    }

    /// Id of the first product, from its quantity input name `quantity_<id>`
    pub async fn first_product_id(&self) -> E2eResult<String> {
        let inputs = self
            .session
            .wait_for_present(Self::PAGE, "card_quantity", &self.session.waits().short)
            .await?;
        let name = inputs
            .first()
            .and_then(|el| el.attr("name"))
            .ok_or_else(|| E2eError::parse("product id", "quantity input without name"))?;
        product_id_from_quantity_name(name)
    }

    /// Set the first card's quantity and press its add-to-cart button.
    /// Depending on session state the app stays, asks for login, or opens
    /// checkout.
    pub async fn add_first_product_to_cart(&self, quantity: u32) -> E2eResult<Landing<'s>> {
        let waits = self.session.waits();
        self.first_product_card().await?;
        self.session
            .fill_when_ready(Self::PAGE, "card_quantity", 0, &quantity.to_string(), &waits.short)
            .await?;
        tracing::info!(quantity, "Adding first product to cart");
        landing_after_click(self.session, Self::PAGE, "card_add_to_cart", Self::PATH).await
    }

    /// Follow the first product link
    pub async fn open_first_product(&self) -> E2eResult<ProductPage<'s>> {
        let waits = self.session.waits();
        self.session
            .click_when_ready(Self::PAGE, "product_link", 0, &waits.short)
            .await?;
        ProductPage::wait_until_loaded(self.session).await
    }

    /// Navigate to checkout directly
    pub async fn go_to_checkout(&self) -> E2eResult<CheckoutPage<'s>> {
        CheckoutPage::open(self.session).await
    }

    /// Open the cart through the header link, by selector or by accessible name
    pub async fn open_cart_from_header(&self) -> E2eResult<CheckoutPage<'s>> {
        let waits = self.session.waits();
        let link = if self.session.is_present(Self::PAGE, "cart_link").await? {
            "cart_link"
        } else {
            "cart_link_by_name"
        };
        self.session
            .click_when_ready(Self::PAGE, link, 0, &waits.short)
            .await?;
        self.session
            .wait_for_url(&waits.long, "checkout via header cart link", |u| {
                path_of(u).starts_with(CheckoutPage::PATH)
            })
            .await?;
        CheckoutPage::wait_until_rendered(self.session).await
    }

    /// Quantity input and add-to-cart button are on the page, scrolling to
    /// the bottom once if the grid has not rendered them yet
    pub async fn has_add_to_cart_controls(&self) -> E2eResult<bool> {
        if self.controls_present().await? {
            return Ok(true);
        }
        self.session
            .driver()
            .execute_script(script::SCROLL_TO_BOTTOM)
            .await?;
        self.controls_present().await
    }

    async fn controls_present(&self) -> E2eResult<bool> {
        Ok(self.session.is_present(Self::PAGE, "card_quantity").await?
            && self.session.is_present(Self::PAGE, "card_add_to_cart").await?)
    }
}
