//! Locator table for the GroceryMate storefront.
//!
//! Every selector the page objects use lives here as data. The built-in
//! table targets the production storefront; a YAML file can replace
//! individual entries without touching code.
//!
//! ```yaml
//! locators:
//!   - name: toast
//!     strategy: xpath
//!     expression: "//div[contains(@class, 'Toastify')]"
//! ```

use crate::result::{E2eError, E2eResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// How a locator expression is resolved against the DOM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// CSS selector
    Css,
    /// XPath expression
    #[serde(rename = "xpath")]
    XPath,
    /// `data-testid` attribute value
    TestId,
    /// Innermost elements whose text contains the expression
    Text,
    /// `role|accessible name`, name matched case-insensitively
    Role,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Css => "css",
            Self::XPath => "xpath",
            Self::TestId => "test_id",
            Self::Text => "text",
            Self::Role => "role",
        };
        f.write_str(s)
    }
}

/// Screen a locator belongs to. Unscoped locators are shared by every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageName {
    /// Home page
    Home,
    /// `/auth`
    Login,
    /// Date-of-birth modal
    AgeGate,
    /// `/store`
    Store,
    /// `/product/{id}`
    Product,
    /// `/checkout`
    Checkout,
}

impl fmt::Display for PageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Home => "home",
            Self::Login => "login",
            Self::AgeGate => "age_gate",
            Self::Store => "store",
            Self::Product => "product",
            Self::Checkout => "checkout",
        };
        f.write_str(s)
    }
}

impl PageName {
    /// Every page, in display order
    pub const ALL: [Self; 6] = [
        Self::Home,
        Self::Login,
        Self::AgeGate,
        Self::Store,
        Self::Product,
        Self::Checkout,
    ];
}

impl FromStr for PageName {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|page| page.to_string() == wanted)
            .ok_or_else(|| E2eError::invalid_input(format!("unknown page {s:?}")))
    }
}

/// A named element lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    /// Name, unique within its scope
    pub name: String,
    /// Resolution strategy
    pub strategy: Strategy,
    /// Selector, XPath, test id, text or `role|name`
    pub expression: String,
    /// Owning page, `None` for shared locators
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<PageName>,
}

impl Locator {
    /// Create an unscoped locator
    #[must_use]
    pub fn new(name: impl Into<String>, strategy: Strategy, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            strategy,
            expression: expression.into(),
            scope: None,
        }
    }

    /// Create a CSS locator
    #[must_use]
    pub fn css(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self::new(name, Strategy::Css, selector)
    }

    /// Create an XPath locator
    #[must_use]
    pub fn xpath(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::new(name, Strategy::XPath, expression)
    }

    /// Create a role locator from a role and accessible-name fragment
    #[must_use]
    pub fn role(name: impl Into<String>, role: &str, accessible_name: &str) -> Self {
        Self::new(name, Strategy::Role, format!("{role}|{accessible_name}"))
    }

    /// Create a text locator
    #[must_use]
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name, Strategy::Text, text)
    }

    /// Assign the owning page
    #[must_use]
    pub const fn with_scope(mut self, scope: PageName) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Qualified name used in logs and errors, e.g. `store.product_card`
    #[must_use]
    pub fn qualified_name(&self) -> String {
        match self.scope {
            Some(scope) => format!("{scope}.{}", self.name),
            None => self.name.clone(),
        }
    }

    /// Split a `Role` expression into role and accessible name
    #[must_use]
    pub fn role_parts(&self) -> (&str, &str) {
        self.expression
            .split_once('|')
            .unwrap_or((self.expression.as_str(), ""))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} {:?})",
            self.qualified_name(),
            self.strategy,
            self.expression
        )
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LocatorFile {
    #[serde(default)]
    locators: Vec<Locator>,
}

type Key = (Option<PageName>, String);

/// Immutable set of locators, unique by `(scope, name)`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocatorTable {
    entries: BTreeMap<Key, Locator>,
}

impl LocatorTable {
    /// Build a table, rejecting duplicate `(scope, name)` pairs
    pub fn from_locators(locators: impl IntoIterator<Item = Locator>) -> E2eResult<Self> {
        let mut entries = BTreeMap::new();
        for locator in locators {
            let key = (locator.scope, locator.name.clone());
            if let Some(previous) = entries.insert(key, locator) {
                return Err(E2eError::config(format!(
                    "duplicate locator {}",
                    previous.qualified_name()
                )));
            }
        }
        Ok(Self { entries })
    }

    /// Parse a YAML locator file
    pub fn from_yaml_str(yaml: &str) -> E2eResult<Self> {
        let file: LocatorFile = serde_yaml_ng::from_str(yaml)?;
        Self::from_locators(file.locators)
    }

    /// Load a YAML locator file from disk
    pub fn from_yaml_file(path: &Path) -> E2eResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Built-in table with the given override file applied on top
    pub fn load(overrides: Option<&Path>) -> E2eResult<Self> {
        let table = Self::grocerymate();
        match overrides {
            Some(path) => {
                let extra = Self::from_yaml_file(path)?;
                tracing::info!(
                    path = %path.display(),
                    count = extra.len(),
                    "Applying locator overrides"
                );
                Ok(table.merged(extra))
            }
            None => Ok(table),
        }
    }

    /// Replace entries of `self` with same-keyed entries of `other`
    #[must_use]
    pub fn merged(mut self, other: Self) -> Self {
        self.entries.extend(other.entries);
        self
    }

    /// Look up a locator on a page, falling back to the shared scope
    pub fn get(&self, page: PageName, name: &str) -> E2eResult<&Locator> {
        self.entries
            .get(&(Some(page), name.to_string()))
            .or_else(|| self.entries.get(&(None, name.to_string())))
            .ok_or_else(|| E2eError::MissingLocator {
                page: page.to_string(),
                name: name.to_string(),
            })
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in `(scope, name)` order
    pub fn iter(&self) -> impl Iterator<Item = &Locator> {
        self.entries.values()
    }

    /// Serialize in the same format `from_yaml_str` reads
    pub fn to_yaml(&self) -> E2eResult<String> {
        let file = LocatorFile {
            locators: self.entries.values().cloned().collect(),
        };
        Ok(serde_yaml_ng::to_string(&file)?)
    }

    /// Locators for the production GroceryMate storefront
    #[must_use]
    pub fn grocerymate() -> Self {
        use PageName::{AgeGate, Checkout, Home, Login, Product, Store};

        let locators = vec![
            Locator::css("heading", "h1").with_scope(Home),
            Locator::xpath("nav_shop", "//a[@href=\"/store\"]"),
            Locator::xpath(
                "toast",
                "//div[contains(text(), 'You are of age') \
                 or contains(text(), 'You are underage') \
                 or contains(text(), 'Please enter your birth date')]",
            ),
            Locator::css("cart_link", "header a[href=\"/checkout\"], nav a[href=\"/checkout\"]"),
            Locator::role("cart_link_by_name", "link", "cart"),
            // Login
            Locator::xpath("email", "//input[@placeholder=\"Email address\"]").with_scope(Login),
            Locator::xpath("password", "//input[@placeholder=\"Password\"]").with_scope(Login),
            Locator::css("submit", ".submit-btn").with_scope(Login),
            Locator::xpath(
                "error",
                "//*[contains(translate(text(), 'INVALDWRONGFE', 'invaldwrongfe'), 'invalid') \
                 or contains(translate(text(), 'INVALDWRONGFE', 'invaldwrongfe'), 'wrong') \
                 or contains(translate(text(), 'INVALDWRONGFE', 'invaldwrongfe'), 'failed')]",
            )
            .with_scope(Login),
            // Age gate
            Locator::xpath(
                "dob_input",
                "//div[contains(@class, 'modal-content')]//input[@placeholder='DD-MM-YYYY']",
            )
            .with_scope(AgeGate),
            Locator::xpath("confirm", "//button[contains(text(), \"Confirm\")]").with_scope(AgeGate),
            // Store
            Locator::css("product_card", ".product-card").with_scope(Store),
            Locator::css("card_quantity", ".product-card input.quantity").with_scope(Store),
            Locator::css("card_add_to_cart", ".product-card button.btn-cart").with_scope(Store),
            Locator::css("product_link", "a[href^='/product/']").with_scope(Store),
            // Product
            Locator::css("interactive_rating", ".interactive-rating").with_scope(Product),
            Locator::css("star_option", ".interactive-rating .star").with_scope(Product),
            Locator::css("review_textarea", "textarea.new-review-form-control").with_scope(Product),
            Locator::css("send", ".new-review-btn-send").with_scope(Product),
            Locator::xpath(
                "already_reviewed",
                "//p[contains(text(), 'You have already reviewed this product')]",
            )
            .with_scope(Product),
            Locator::css("menu_icon", ".menu-icon").with_scope(Product),
            Locator::xpath("delete", "//button[contains(text(),'Delete')]").with_scope(Product),
            Locator::css("rating_widget", ".custom-rating").with_scope(Product),
            Locator::css("review_count", "p.reviews").with_scope(Product),
            Locator::css("price", ".discount-price, .price").with_scope(Product),
            Locator::css("comment", "div.comment").with_scope(Product),
            Locator::css("review_container", ".review-container").with_scope(Product),
            Locator::css("char_limit_warning", ".error-message").with_scope(Product),
            Locator::css(
                "quantity",
                "input[type='number'], input[class*='quantity']",
            )
            .with_scope(Product),
            Locator::css("add_to_cart", "button.btn-cart").with_scope(Product),
            // Checkout
            Locator::xpath(
                "shipping_cost",
                "//h5[normalize-space(.)='Shipment:']/following-sibling::h5",
            )
            .with_scope(Checkout),
            Locator::css("plus", "button.plus").with_scope(Checkout),
            Locator::css("minus", "button.minus").with_scope(Checkout),
            Locator::xpath(
                "quantity",
                "//button[contains(@class, 'minus')]/following-sibling::*[1]",
            )
            .with_scope(Checkout),
            Locator::css("street", "input[name='street']").with_scope(Checkout),
            Locator::css("city", "input[name='city']").with_scope(Checkout),
            Locator::css("postal_code", "input[name='postalCode']").with_scope(Checkout),
            Locator::css("card_number", "input[name='cardNumber']").with_scope(Checkout),
            Locator::css("name_on_card", "input[name='nameOnCard']").with_scope(Checkout),
            Locator::css("expiration", "input[name='expiration']").with_scope(Checkout),
            Locator::css("cvv", "input[name='cvv']").with_scope(Checkout),
            Locator::xpath("buy_now", "//button[contains(text(),'Buy now')]").with_scope(Checkout),
            Locator::css("remove", "a.remove-icon").with_scope(Checkout),
            Locator::css(
                "cart_item",
                "[data-testid*='cart'] [data-testid*='item'], [class*='cart'] [class*='item'], \
                 .cart-item, ul li[class*='item']",
            )
            .with_scope(Checkout),
            Locator::text("total", "Total").with_scope(Checkout),
        ];

        let mut entries = BTreeMap::new();
        for locator in locators {
            entries.insert((locator.scope, locator.name.clone()), locator);
        }
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod page_name_tests {
        use super::*;

        #[test]
        fn test_parse_accepts_display_form() {
            for page in PageName::ALL {
                assert_eq!(page.to_string().parse::<PageName>().unwrap(), page);
            }
            assert_eq!("Age-Gate".parse::<PageName>().unwrap(), PageName::AgeGate);
        }

        #[test]
        fn test_parse_rejects_unknown() {
            let err = "basket".parse::<PageName>().unwrap_err();
            assert!(matches!(err, E2eError::InvalidInput { .. }));
        }
    }

    mod table_tests {
        use super::*;

        #[test]
        fn test_default_table_resolves_every_page() {
            let table = LocatorTable::grocerymate();
            assert!(table.get(PageName::Store, "product_card").is_ok());
            assert!(table.get(PageName::Product, "send").is_ok());
            assert!(table.get(PageName::Checkout, "shipping_cost").is_ok());
            assert!(table.get(PageName::AgeGate, "dob_input").is_ok());
            assert!(table.get(PageName::Login, "submit").is_ok());
        }

        #[test]
        fn test_scoped_lookup_falls_back_to_shared() {
            let table = LocatorTable::grocerymate();
            let toast = table.get(PageName::AgeGate, "toast").unwrap();
            assert_eq!(toast.scope, None);
            assert_eq!(toast.strategy, Strategy::XPath);
        }

        #[test]
        fn test_scoped_entry_shadows_shared_name() {
            let table = LocatorTable::grocerymate();
            let checkout_qty = table.get(PageName::Checkout, "quantity").unwrap();
            let product_qty = table.get(PageName::Product, "quantity").unwrap();
            assert_ne!(checkout_qty.expression, product_qty.expression);
        }

        #[test]
        fn test_missing_locator_names_page() {
            let table = LocatorTable::grocerymate();
            let err = table.get(PageName::Store, "nonexistent").unwrap_err();
            assert!(matches!(err, E2eError::MissingLocator { .. }));
            assert!(err.to_string().contains("store"));
        }

        #[test]
        fn test_duplicate_rejected() {
            let result = LocatorTable::from_locators(vec![
                Locator::css("a", ".x").with_scope(PageName::Store),
                Locator::css("a", ".y").with_scope(PageName::Store),
            ]);
            assert!(matches!(result, Err(E2eError::Config { .. })));
        }

        #[test]
        fn test_same_name_different_scope_allowed() {
            let table = LocatorTable::from_locators(vec![
                Locator::css("a", ".x").with_scope(PageName::Store),
                Locator::css("a", ".y").with_scope(PageName::Product),
                Locator::css("a", ".z"),
            ])
            .unwrap();
            assert_eq!(table.len(), 3);
        }
    }

    mod yaml_tests {
        use super::*;
        use std::io::Write;

        #[test]
        fn test_override_replaces_entry() {
            let yaml = r#"
locators:
  - name: product_card
    strategy: test_id
    expression: product-card
    scope: store
"#;
            let overrides = LocatorTable::from_yaml_str(yaml).unwrap();
            let table = LocatorTable::grocerymate().merged(overrides);
            let card = table.get(PageName::Store, "product_card").unwrap();
            assert_eq!(card.strategy, Strategy::TestId);
            assert_eq!(card.expression, "product-card");
            assert_eq!(table.len(), LocatorTable::grocerymate().len());
        }

        #[test]
        fn test_load_from_file() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(
                file,
                "locators:\n  - name: toast\n    strategy: css\n    expression: .Toastify"
            )
            .unwrap();
            let table = LocatorTable::load(Some(file.path())).unwrap();
            let toast = table.get(PageName::AgeGate, "toast").unwrap();
            assert_eq!(toast.strategy, Strategy::Css);
        }

        #[test]
        fn test_dump_is_reloadable() {
            let table = LocatorTable::grocerymate();
            let yaml = table.to_yaml().unwrap();
            assert!(yaml.contains("strategy: xpath"));
            assert_eq!(LocatorTable::from_yaml_str(&yaml).unwrap(), table);
        }

        #[test]
        fn test_unknown_strategy_is_yaml_error() {
            let yaml = "locators:\n  - name: a\n    strategy: sizzle\n    expression: x\n";
            assert!(matches!(
                LocatorTable::from_yaml_str(yaml),
                Err(E2eError::Yaml(_))
            ));
        }
    }

    mod locator_tests {
        use super::*;

        #[test]
        fn test_qualified_name() {
            let loc = Locator::css("send", ".btn").with_scope(PageName::Product);
            assert_eq!(loc.qualified_name(), "product.send");
            assert_eq!(Locator::css("toast", ".t").qualified_name(), "toast");
        }

        #[test]
        fn test_role_parts() {
            let loc = Locator::role("cart", "link", "cart");
            assert_eq!(loc.role_parts(), ("link", "cart"));
            let bare = Locator::new("b", Strategy::Role, "button");
            assert_eq!(bare.role_parts(), ("button", ""));
        }
    }
}
