//! Merchant lookup by page location.

use std::collections::HashSet;

use cartpilot_contracts::{AutomationConfig, DefaultSelectors, Merchant};
use regex::Regex;
use tracing::warn;
use url::Url;

/// Compile a location pattern. Invalid patterns are logged and never match.
fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(err) => {
            warn!(pattern = %pattern, error = %err, "Ignoring invalid location pattern");
            None
        }
    }
}

/// The path plus query of `location`, e.g. `/checkout/pay?step=2`.
fn path_and_query(location: &str) -> Option<String> {
    let url = Url::parse(location).ok()?;
    let mut tail = url.path().to_string();
    if let Some(query) = url.query() {
        tail.push('?');
        tail.push_str(query);
    }
    Some(tail)
}

fn regex_matches(regex: &Regex, location: &str) -> bool {
    regex.is_match(location)
        || path_and_query(location).is_some_and(|tail| regex.is_match(&tail))
}

/// Whether `pattern` matches the full location or its path and query.
pub fn pattern_matches(pattern: &str, location: &str) -> bool {
    compile(pattern).is_some_and(|regex| regex_matches(&regex, location))
}

pub fn is_checkout_page(location: &str, config: &AutomationConfig) -> bool {
    pattern_matches(&config.checkout_url, location)
}

struct MerchantEntry {
    merchant: Merchant,
    shop_pattern: Option<Regex>,
}

/// Merchants and default configs from the last install.
#[derive(Default)]
pub struct MerchantDirectory {
    merchants: Vec<MerchantEntry>,
    default_configs: Vec<AutomationConfig>,
    default_selectors: DefaultSelectors,
}

impl MerchantDirectory {
    /// Build the directory. Later entries repeating a shop id are dropped.
    pub fn new(merchants: Vec<Merchant>, default_configs: Vec<AutomationConfig>) -> Self {
        let mut seen = HashSet::new();
        let merchants = merchants
            .into_iter()
            .filter(|merchant| {
                let fresh = seen.insert(merchant.shop_id.clone());
                if !fresh {
                    warn!(shop_id = %merchant.shop_id, "Dropping duplicate merchant");
                }
                fresh
            })
            .map(|merchant| MerchantEntry {
                shop_pattern: compile(&merchant.shop_url),
                merchant,
            })
            .collect();

        let mut seen = HashSet::new();
        let default_configs: Vec<AutomationConfig> = default_configs
            .into_iter()
            .filter(|config| {
                let fresh = seen.insert(config.shop_id.clone());
                if !fresh {
                    warn!(shop_id = %config.shop_id, "Dropping duplicate default config");
                }
                fresh
            })
            .collect();

        let default_selectors = default_configs
            .iter()
            .map(|config| (config.shop_id.clone(), config.selectors_to_check.clone()))
            .collect();

        Self {
            merchants,
            default_configs,
            default_selectors,
        }
    }

    /// First merchant, in fetch order, whose `shopUrl` matches `location`.
    pub fn locate_shop(&self, location: &str) -> Option<&Merchant> {
        self.merchants
            .iter()
            .find(|entry| {
                entry
                    .shop_pattern
                    .as_ref()
                    .is_some_and(|regex| regex_matches(regex, location))
            })
            .map(|entry| &entry.merchant)
    }

    pub fn default_config(&self, shop_id: &str) -> Option<&AutomationConfig> {
        self.default_configs
            .iter()
            .find(|config| config.shop_id == shop_id)
    }

    /// `shopId → selectorsToCheck` over every default config.
    pub fn default_selectors(&self) -> &DefaultSelectors {
        &self.default_selectors
    }

    pub fn merchants(&self) -> impl Iterator<Item = &Merchant> {
        self.merchants.iter().map(|entry| &entry.merchant)
    }

    pub fn merchant_count(&self) -> usize {
        self.merchants.len()
    }

    pub fn default_config_count(&self) -> usize {
        self.default_configs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{config_for, merchant};
    use cartpilot_contracts::Selector;

    #[test]
    fn test_checkout_pattern_matches_path() {
        let config = config_for("A", "shop\\.com", "^/checkout");
        assert!(is_checkout_page("https://shop.com/checkout/pay", &config));
        assert!(!is_checkout_page("https://shop.com/cart", &config));
    }

    #[test]
    fn test_pattern_matches_full_url() {
        assert!(pattern_matches("^https://shop-a\\.com/", "https://shop-a.com/cart"));
        assert!(pattern_matches("step=2", "https://shop.com/checkout?step=2"));
        assert!(!pattern_matches("^/cart", "not a url"));
    }

    #[test]
    fn test_invalid_pattern_never_matches() {
        assert!(!pattern_matches("checkout(", "https://shop.com/checkout("));

        let directory = MerchantDirectory::new(
            vec![
                merchant("bad", "shop(", "/checkout"),
                merchant("good", "shop", "/checkout"),
            ],
            Vec::new(),
        );
        assert_eq!(
            directory.locate_shop("https://shop(.com/").map(|m| m.shop_id.as_str()),
            Some("good")
        );
    }

    #[test]
    fn test_first_match_wins_in_fetch_order() {
        let directory = MerchantDirectory::new(
            vec![
                merchant("generic", "example\\.com", "/checkout"),
                merchant("specific", "shop\\.example\\.com", "/checkout"),
            ],
            Vec::new(),
        );
        let located = directory.locate_shop("https://shop.example.com/cart").unwrap();
        assert_eq!(located.shop_id, "generic");
        assert!(directory.locate_shop("https://other.org/").is_none());
    }

    #[test]
    fn test_duplicates_dropped_keeping_first() {
        let mut first = config_for("A", "a\\.com", "/checkout");
        first.selectors_to_check = vec![Selector::css("#first")];
        let mut second = config_for("A", "a\\.com", "/checkout");
        second.selectors_to_check = vec![Selector::css("#second")];

        let directory = MerchantDirectory::new(
            vec![merchant("A", "a\\.com", "/c"), merchant("A", "b\\.com", "/c")],
            vec![first, second, config_for("B", "b\\.com", "/checkout")],
        );

        assert_eq!(directory.merchant_count(), 1);
        assert_eq!(directory.default_config_count(), 2);
        assert_eq!(
            directory.default_selectors()["A"],
            vec![Selector::css("#first")]
        );
        assert!(directory.default_config("B").is_some());
        assert!(directory.default_config("C").is_none());
    }
}
