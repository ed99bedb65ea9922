//! DOM selectors understood by the page-side engine.

use serde::{Deserialize, Serialize};

/// A selector is either a plain CSS selector or a shadow-DOM path.
///
/// There is no discriminator on the wire: a JSON string decodes as
/// [`Selector::Css`], a JSON object as [`Selector::Shadow`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selector {
    Css(String),
    Shadow(ShadowSelector),
}

/// Selector that pierces one shadow root per entry in `shadow_roots`
/// before resolving `target` inside the innermost root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadowSelector {
    pub shadow_roots: Vec<String>,
    pub target: String,
}

impl Selector {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn shadow(
        shadow_roots: impl IntoIterator<Item = impl Into<String>>,
        target: impl Into<String>,
    ) -> Self {
        Self::Shadow(ShadowSelector {
            shadow_roots: shadow_roots.into_iter().map(Into::into).collect(),
            target: target.into(),
        })
    }

    /// The selector resolved last, i.e. the element actually targeted.
    pub fn target(&self) -> &str {
        match self {
            Self::Css(selector) => selector,
            Self::Shadow(shadow) => &shadow.target,
        }
    }
}

impl From<&str> for Selector {
    fn from(value: &str) -> Self {
        Self::Css(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_string_decodes_as_css() {
        let selector: Selector = serde_json::from_value(json!("#promo")).unwrap();
        assert_eq!(selector, Selector::css("#promo"));
        assert_eq!(selector.target(), "#promo");
    }

    #[test]
    fn test_object_decodes_as_shadow() {
        let selector: Selector = serde_json::from_value(json!({
            "shadowRoots": ["checkout-app", "promo-box"],
            "target": "input[name=code]"
        }))
        .unwrap();
        assert_eq!(
            selector,
            Selector::shadow(["checkout-app", "promo-box"], "input[name=code]")
        );
        assert_eq!(selector.target(), "input[name=code]");
    }

    #[test]
    fn test_round_trip_both_variants() {
        for selector in [
            Selector::css("button.apply"),
            Selector::shadow(["a", "b"], "c"),
        ] {
            let encoded = serde_json::to_string(&selector).unwrap();
            let decoded: Selector = serde_json::from_str(&encoded).unwrap();
            assert_eq!(decoded, selector);
        }
    }

    #[test]
    fn test_other_shapes_rejected() {
        assert!(serde_json::from_value::<Selector>(json!(42)).is_err());
        assert!(serde_json::from_value::<Selector>(json!({"target": "x"})).is_err());
    }
}
