//! In-page JavaScript shared by the browser backends.
//!
//! Both real drivers resolve locators and perform actions by evaluating the
//! expressions built here, so element lookup behaves the same over CDP and
//! over the Playwright server. Every expression is a self-invoking function
//! returning a JSON-serializable value.

use crate::dom::SNAPSHOT_DEPTH;
use crate::locator::{Locator, Strategy};
use crate::result::{E2eError, E2eResult};

/// Serializes one element and its subtree into the `ElementSnapshot` shape
const SNAPSHOT_FN: &str = r"function snap(el, depth) {
  const r = el.getBoundingClientRect();
  const attrs = {};
  for (const a of Array.from(el.attributes || [])) attrs[a.name] = a.value;
  return {
    tag: el.tagName.toLowerCase(),
    text: (el.innerText !== undefined ? el.innerText : el.textContent) || '',
    value: ('value' in el && typeof el.value === 'string') ? el.value : null,
    class: el.getAttribute('class') || '',
    style: el.getAttribute('style') || '',
    enabled: !el.disabled,
    visible: r.width > 0 && r.height > 0 && getComputedStyle(el).visibility !== 'hidden',
    attributes: attrs,
    children: depth > 0 ? Array.from(el.children).map(c => snap(c, depth - 1)) : []
  };
}";

/// Clears `localStorage`; reports `unavailable` on opaque origins like `about:blank`
pub const CLEAR_LOCAL_STORAGE: &str = "(() => { try { window.localStorage.clear(); return 'ok'; } \
     catch (e) { return 'unavailable'; } })()";

/// Document title
pub const DOCUMENT_TITLE: &str = "document.title";

/// Scroll to the bottom of the page to trigger lazy grids
pub const SCROLL_TO_BOTTOM: &str =
    "(() => { window.scrollTo(0, document.body.scrollHeight); return true; })()";

/// Quote a string as a JavaScript literal
#[must_use]
pub fn js_string(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

fn role_selector(role: &str) -> String {
    match role {
        "button" => "button, [role=button], input[type=button], input[type=submit]".to_string(),
        "link" => "a[href], [role=link]".to_string(),
        "heading" => "h1, h2, h3, h4, h5, h6, [role=heading]".to_string(),
        "textbox" => "input:not([type]), input[type=text], input[type=email], \
                      input[type=password], textarea, [role=textbox]"
            .to_string(),
        other => format!("[role={}]", js_string(other)),
    }
}

/// Expression evaluating to an array of the elements a locator matches
#[must_use]
pub fn resolve(locator: &Locator) -> String {
    let expr = &locator.expression;
    match locator.strategy {
        Strategy::Css => format!("Array.from(document.querySelectorAll({}))", js_string(expr)),
        Strategy::XPath => format!(
            "(() => {{ const r = document.evaluate({}, document, null, \
             XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); const out = []; \
             for (let i = 0; i < r.snapshotLength; i++) out.push(r.snapshotItem(i)); \
             return out; }})()",
            js_string(expr)
        ),
        Strategy::TestId => format!(
            "Array.from(document.querySelectorAll({}))",
            js_string(&format!("[data-testid={}]", js_string(expr)))
        ),
        Strategy::Text => format!(
            "(() => {{ const t = {}; return Array.from(document.querySelectorAll('body *'))\
             .filter(el => (el.textContent || '').includes(t) \
             && !Array.from(el.children).some(c => (c.textContent || '').includes(t))); }})()",
            js_string(expr)
        ),
        Strategy::Role => {
            let (role, name) = locator.role_parts();
            format!(
                "(() => {{ const n = {}; return Array.from(document.querySelectorAll({}))\
                 .filter(el => (el.getAttribute('aria-label') || el.textContent || \
                 el.getAttribute('title') || '').toLowerCase().includes(n)); }})()",
                js_string(&name.to_lowercase()),
                js_string(&role_selector(role))
            )
        }
    }
}

/// Snapshot every match, serialized as a JSON string
#[must_use]
pub fn query_all(locator: &Locator) -> String {
    format!(
        "(() => {{ {SNAPSHOT_FN} return JSON.stringify(({}).map(el => snap(el, {SNAPSHOT_DEPTH}))); }})()",
        resolve(locator)
    )
}

fn with_element(locator: &Locator, index: usize, body: &str) -> String {
    format!(
        "(() => {{ const el = ({})[{index}]; \
         if (!el || !el.isConnected) return 'detached'; {body} }})()",
        resolve(locator)
    )
}

/// Scroll the element into view and click it
#[must_use]
pub fn click(locator: &Locator, index: usize) -> String {
    with_element(
        locator,
        index,
        "if (el.disabled) return 'disabled'; \
         el.scrollIntoView({block: 'center'}); el.click(); return 'ok';",
    )
}

/// Replace an input's value the way typing would, honouring `maxlength`
#[must_use]
pub fn fill(locator: &Locator, index: usize, text: &str) -> String {
    let body = format!(
        "if (el.disabled) return 'disabled'; \
         let v = {}; if (el.maxLength > 0 && v.length > el.maxLength) v = v.slice(0, el.maxLength); \
         const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype; \
         const setter = Object.getOwnPropertyDescriptor(proto, 'value').set; \
         el.scrollIntoView({{block: 'center'}}); el.focus(); setter.call(el, v); \
         el.dispatchEvent(new Event('input', {{bubbles: true}})); \
         el.dispatchEvent(new Event('change', {{bubbles: true}})); return 'ok';",
        js_string(text)
    );
    with_element(locator, index, &body)
}

/// Scroll the element into view
#[must_use]
pub fn scroll_into_view(locator: &Locator, index: usize) -> String {
    with_element(
        locator,
        index,
        "el.scrollIntoView({block: 'center'}); return 'ok';",
    )
}

/// Result string of an action script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Action performed
    Ok,
    /// Element missing or detached from the document
    Detached,
    /// Element present but disabled
    Disabled,
}

impl ActionOutcome {
    /// Parse the value an action script returned
    pub fn parse(raw: &str) -> E2eResult<Self> {
        match raw {
            "ok" => Ok(Self::Ok),
            "detached" => Ok(Self::Detached),
            "disabled" => Ok(Self::Disabled),
            other => Err(E2eError::driver(format!("unexpected action result {other:?}"))),
        }
    }

    /// Map to a result; detached and disabled are transient
    pub fn into_result(self, locator: &Locator) -> E2eResult<()> {
        match self {
            Self::Ok => Ok(()),
            Self::Detached => Err(E2eError::transient(
                locator.qualified_name(),
                "element detached or not found",
            )),
            Self::Disabled => Err(E2eError::transient(
                locator.qualified_name(),
                "element is disabled",
            )),
        }
    }
}

/// Parse the JSON string produced by [`query_all`]
pub fn parse_snapshots(raw: &str) -> E2eResult<Vec<crate::dom::ElementSnapshot>> {
    Ok(serde_json::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::PageName;

    #[test]
    fn test_js_string_escapes_quotes() {
        assert_eq!(js_string(r#"a"b"#), r#""a\"b""#);
        assert_eq!(js_string("it's"), r#""it's""#);
    }

    #[test]
    fn test_resolve_per_strategy() {
        let css = Locator::css("card", ".product-card");
        assert!(resolve(&css).contains(r#"querySelectorAll(".product-card")"#));

        let xpath = Locator::xpath("delete", "//button[contains(text(),'Delete')]");
        let js = resolve(&xpath);
        assert!(js.contains("ORDERED_NODE_SNAPSHOT_TYPE"));
        assert!(js.contains("//button[contains(text(),'Delete')]"));

        let test_id = Locator::new("card", Strategy::TestId, "product-card");
        assert!(resolve(&test_id).contains(r#"[data-testid=\"product-card\"]"#));

        let text = Locator::text("total", "Total");
        assert!(resolve(&text).contains(r#"const t = "Total""#));

        let role = Locator::role("cart", "link", "Cart");
        let js = resolve(&role);
        assert!(js.contains("a[href], [role=link]"));
        assert!(js.contains(r#"const n = "cart""#));
    }

    #[test]
    fn test_unknown_role_uses_attribute() {
        let role = Locator::role("banner", "banner", "");
        assert!(resolve(&role).contains(r#"[role=\"banner\"]"#));
    }

    #[test]
    fn test_action_scripts_index_match() {
        let loc = Locator::css("remove", "a.remove-icon").with_scope(PageName::Checkout);
        assert!(click(&loc, 2).contains("[2]"));
        assert!(click(&loc, 0).contains("return 'disabled'"));
        assert!(fill(&loc, 0, "X").contains("maxLength"));
        assert!(scroll_into_view(&loc, 1).contains("scrollIntoView"));
    }

    #[test]
    fn test_query_all_embeds_depth() {
        let js = query_all(&Locator::css("card", ".product-card"));
        assert!(js.contains(&format!("snap(el, {SNAPSHOT_DEPTH})")));
        assert!(js.starts_with("(() =>"));
    }

    #[test]
    fn test_action_outcome() {
        let loc = Locator::css("send", ".new-review-btn-send").with_scope(PageName::Product);
        assert!(ActionOutcome::parse("ok").unwrap().into_result(&loc).is_ok());
        let err = ActionOutcome::parse("detached")
            .unwrap()
            .into_result(&loc)
            .unwrap_err();
        assert!(err.is_transient());
        assert!(err.to_string().contains("product.send"));
        assert!(ActionOutcome::parse("boom").is_err());
    }

    #[test]
    fn test_parse_snapshots() {
        let snaps = parse_snapshots(r#"[{"tag":"p","text":"(3)","enabled":true}]"#).unwrap();
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].text, "(3)");
        assert!(parse_snapshots("not json").is_err());
    }
}
