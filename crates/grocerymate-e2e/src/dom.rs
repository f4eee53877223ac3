//! Serialized DOM fragments.
//!
//! Drivers return matched elements as [`ElementSnapshot`] trees (a
//! depth-limited copy of the element and its descendants). Extractors read
//! prices, stars and review blocks from these without touching the browser.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum descendant depth captured per element
pub const SNAPSHOT_DEPTH: u32 = 6;

/// A point-in-time copy of one element and its subtree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementSnapshot {
    /// Lower-case tag name
    pub tag: String,
    /// Rendered text (`innerText`, falling back to `textContent`)
    pub text: String,
    /// Form control value
    pub value: Option<String>,
    /// `class` attribute
    pub class: String,
    /// `style` attribute
    pub style: String,
    /// Not `disabled`
    pub enabled: bool,
    /// Has a non-empty layout box
    pub visible: bool,
    /// All attributes
    pub attributes: BTreeMap<String, String>,
    /// Child elements
    pub children: Vec<ElementSnapshot>,
}

impl ElementSnapshot {
    /// Create a visible, enabled element
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            enabled: true,
            visible: true,
            ..Self::default()
        }
    }

    /// Set class list
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }

    /// Set text
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set inline style
    #[must_use]
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    /// Set form value
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set enabled state
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set visibility
    #[must_use]
    pub const fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Append a child
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Whether the class list contains `name` as a whole token
    #[must_use]
    pub fn has_class(&self, name: &str) -> bool {
        self.class.split_whitespace().any(|c| c == name)
    }

    /// Attribute value
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Trimmed text
    #[must_use]
    pub fn text_trimmed(&self) -> &str {
        self.text.trim()
    }

    /// Value of an input, falling back to its text
    #[must_use]
    pub fn value_or_text(&self) -> &str {
        self.value.as_deref().unwrap_or(&self.text).trim()
    }

    /// All descendants in document order, excluding `self`
    #[must_use]
    pub fn descendants(&self) -> Vec<&Self> {
        let mut out = Vec::new();
        let mut stack: Vec<&Self> = self.children.iter().rev().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// First descendant with the given class
    #[must_use]
    pub fn find_by_class(&self, class: &str) -> Option<&Self> {
        self.descendants().into_iter().find(|n| n.has_class(class))
    }

    /// All descendants with the given class, in document order
    #[must_use]
    pub fn find_all_by_class(&self, class: &str) -> Vec<&Self> {
        self.descendants()
            .into_iter()
            .filter(|n| n.has_class(class))
            .collect()
    }

    /// First descendant with the given tag
    #[must_use]
    pub fn find_by_tag(&self, tag: &str) -> Option<&Self> {
        self.descendants()
            .into_iter()
            .find(|n| n.tag.eq_ignore_ascii_case(tag))
    }

    /// First descendant matching a predicate
    pub fn find<P>(&self, predicate: P) -> Option<&Self>
    where
        P: Fn(&Self) -> bool,
    {
        self.descendants().into_iter().find(|n| predicate(n))
    }
}
