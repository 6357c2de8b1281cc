//! Marketplace page structure.
//!
//! Everything that depends on the marketplace markup lives here. Update the
//! locators when the pages change; the extraction logic stays untouched.

use crate::browser::{Browser, Locator};
use crate::error::BrowserError;
use crate::models::FilterSpec;

/// Raw field reads from a loaded product page.
pub trait ProductPageReader {
    /// Element whose presence marks the page as rendered.
    fn ready_marker(&self) -> Locator;

    fn title(&self, page: &dyn Browser) -> Result<String, BrowserError>;

    fn seller(&self, page: &dyn Browser) -> Result<String, BrowserError>;

    /// The headline price, when the marketplace sells the item itself.
    fn primary_price(&self, page: &dyn Browser) -> Result<String, BrowserError>;

    fn availability(&self, page: &dyn Browser) -> Result<String, BrowserError>;

    /// Price from the new/used offers panel.
    fn offers_price(&self, page: &dyn Browser) -> Result<String, BrowserError>;

    fn signals_available(&self, availability: &str) -> bool;
}

/// Search box and result list of the marketplace.
pub trait SearchResultsReader {
    fn search_box(&self) -> Locator;

    fn results_container(&self) -> Locator;

    /// Link targets of the product titles in the first results container.
    fn product_links(&self, page: &dyn Browser) -> Result<Vec<String>, BrowserError>;

    /// Query fragment appended to the results URL to restrict the price range.
    fn price_filter(&self, filter: &FilterSpec) -> String;
}

#[derive(Debug, Clone)]
pub struct AmazonLayout {
    title: Locator,
    seller: Locator,
    our_price: Locator,
    availability: Locator,
    offers_price: Locator,
    search_box: Locator,
    results: Locator,
    result_links: Locator,
}

impl Default for AmazonLayout {
    fn default() -> Self {
        AmazonLayout {
            title: Locator::id("productTitle"),
            seller: Locator::id("bylineInfo"),
            our_price: Locator::id("priceblock_ourprice"),
            availability: Locator::id("availability"),
            offers_price: Locator::css("#olp_feature_div .olp-padding-right"),
            search_box: Locator::id("twotabsearchtextbox"),
            results: Locator::class("s-result-list"),
            result_links: Locator::css("h2 a"),
        }
    }
}

impl ProductPageReader for AmazonLayout {
    fn ready_marker(&self) -> Locator {
        self.title.clone()
    }

    fn title(&self, page: &dyn Browser) -> Result<String, BrowserError> {
        page.text(&self.title)
    }

    fn seller(&self, page: &dyn Browser) -> Result<String, BrowserError> {
        page.text(&self.seller)
    }

    fn primary_price(&self, page: &dyn Browser) -> Result<String, BrowserError> {
        page.text(&self.our_price)
    }

    fn availability(&self, page: &dyn Browser) -> Result<String, BrowserError> {
        page.text(&self.availability)
    }

    fn offers_price(&self, page: &dyn Browser) -> Result<String, BrowserError> {
        page.text(&self.offers_price)
    }

    fn signals_available(&self, availability: &str) -> bool {
        let text = availability.to_lowercase();
        if ["unavailable", "not available", "out of stock"]
            .iter()
            .any(|negative| text.contains(negative))
        {
            return false;
        }
        text.contains("available") || text.contains("in stock")
    }
}

impl SearchResultsReader for AmazonLayout {
    fn search_box(&self) -> Locator {
        self.search_box.clone()
    }

    fn results_container(&self) -> Locator {
        self.results.clone()
    }

    fn product_links(&self, page: &dyn Browser) -> Result<Vec<String>, BrowserError> {
        page.attributes_within(&self.results, &self.result_links, "href")
    }

    /// `&rh=p_36%3A<min>-<max>` with both bounds in hundredths.
    fn price_filter(&self, filter: &FilterSpec) -> String {
        format!(
            "&rh=p_36%3A{}-{}",
            in_hundredths(&filter.min),
            in_hundredths(&filter.max)
        )
    }
}

/// Moves the decimal point two places right without going through a float.
fn in_hundredths(amount: &str) -> String {
    let amount = amount.trim();
    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));

    let mut digits = whole.to_string();
    let mut chars = fraction.chars();
    for _ in 0..2 {
        digits.push(chars.next().unwrap_or('0'));
    }
    let rest: String = chars.collect();

    let digits = digits.trim_start_matches('0');
    let digits = if digits.is_empty() { "0" } else { digits };

    if rest.is_empty() {
        digits.to_string()
    } else {
        format!("{digits}.{rest}")
    }
}
