use crate::browser::{Browser, Locator};
use crate::extractor::ProductPageExtractor;
use crate::harvester::harvest;
use crate::layout::{ProductPageReader, SearchResultsReader};
use crate::models::{FilterSpec, ProductIdentifier, ProductRecord};
use anyhow::{Context, Result};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    SearchSubmitted,
    FilterApplied,
    LinksHarvested(usize),
    PerProductFetch(usize),
    Done,
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanState::Idle => write!(f, "idle"),
            ScanState::SearchSubmitted => write!(f, "search submitted"),
            ScanState::FilterApplied => write!(f, "filter applied"),
            ScanState::LinksHarvested(n) => write!(f, "{n} links harvested"),
            ScanState::PerProductFetch(n) => write!(f, "fetching product {n}"),
            ScanState::Done => write!(f, "done"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub wait_timeout: Duration,
    pub poll_interval: Duration,
    /// Query string sent along with every product page request, without `?`.
    pub product_query: Option<String>,
}

/// One search-and-collect run over a marketplace.
///
/// The scanner owns the browser session for the whole run and closes it
/// exactly once when [`CatalogScanner::run`] returns, whatever the outcome.
pub struct CatalogScanner<B, L> {
    session: B,
    layout: L,
    options: ScanOptions,
    state: ScanState,
}

impl<B, L> CatalogScanner<B, L>
where
    B: Browser,
    L: ProductPageReader + SearchResultsReader,
{
    pub fn new(session: B, layout: L, options: ScanOptions) -> Self {
        CatalogScanner {
            session,
            layout,
            options,
            state: ScanState::Idle,
        }
    }

    pub fn run(
        mut self,
        search_term: &str,
        filter: &FilterSpec,
        base_url: &str,
        currency: &str,
    ) -> Result<Vec<ProductRecord>> {
        info!("Looking for {} products...", search_term);
        let outcome = self.scan(search_term, filter, base_url, currency);

        if let Err(e) = self.session.close() {
            warn!("Failed to close browser session: {}", e);
        }
        outcome
    }

    fn scan(
        &mut self,
        search_term: &str,
        filter: &FilterSpec,
        base_url: &str,
        currency: &str,
    ) -> Result<Vec<ProductRecord>> {
        let ids = self.product_ids(search_term, filter, base_url)?;
        if ids.is_empty() {
            info!("Stopped: no products found for {}", search_term);
            self.advance(ScanState::Done);
            return Ok(Vec::new());
        }

        info!("Got {} links to products...", ids.len());
        let products = self.products(&ids, base_url, currency);
        info!("Got info about {} products...", products.len());

        self.advance(ScanState::Done);
        Ok(products)
    }

    fn product_ids(
        &mut self,
        search_term: &str,
        filter: &FilterSpec,
        base_url: &str,
    ) -> Result<Vec<ProductIdentifier>> {
        let search_box = self.layout.search_box();

        self.session
            .navigate(base_url)
            .with_context(|| format!("Failed to open {}", base_url))?;
        if !self.wait(&search_box) {
            warn!("Search box {} did not show up on {}", search_box, base_url);
        }
        let before = self.session.current_url()?;
        self.session
            .submit_text(&search_box, search_term)
            .with_context(|| format!("Failed to submit search for {:?}", search_term))?;
        self.advance(ScanState::SearchSubmitted);

        let results_url = self
            .session
            .wait_for_url_change(&before, self.options.wait_timeout, self.options.poll_interval)?
            .with_context(|| format!("Search for {:?} never left {}", search_term, before))?;
        let filtered_url = format!("{}{}", results_url, self.layout.price_filter(filter));
        self.session
            .navigate(&filtered_url)
            .with_context(|| format!("Failed to open filtered results {}", filtered_url))?;
        info!("Our url: {}", filtered_url);
        self.advance(ScanState::FilterApplied);

        let container = self.layout.results_container();
        if !self.wait(&container) {
            debug!("Results container {} did not show up", container);
        }

        let ids = harvest(&self.session, &self.layout);
        self.advance(ScanState::LinksHarvested(ids.len()));
        Ok(ids)
    }

    fn products(
        &mut self,
        ids: &[ProductIdentifier],
        base_url: &str,
        currency: &str,
    ) -> Vec<ProductRecord> {
        let mut products = Vec::new();

        for (n, id) in ids.iter().enumerate() {
            self.advance(ScanState::PerProductFetch(n + 1));
            info!("Product ID: {} - getting data...", id);

            let url = product_url(base_url, id);
            let target = match &self.options.product_query {
                Some(query) if !query.is_empty() => format!("{url}?{query}"),
                _ => url.clone(),
            };
            if let Err(e) = self.session.navigate(&target) {
                warn!("Can't open product {}: {}", id, e);
                continue;
            }
            let ready = self.layout.ready_marker();
            if !self.wait(&ready) {
                debug!("{} did not show up on {}", ready, target);
            }

            let extractor = ProductPageExtractor::new(&self.layout, currency);
            if let Some(product) = extractor.extract(&self.session, id, &url) {
                products.push(product);
            }
        }
        products
    }

    /// Lookup failures count as "not there yet".
    fn wait(&self, locator: &Locator) -> bool {
        self.session
            .wait_for(locator, self.options.wait_timeout, self.options.poll_interval)
            .unwrap_or_else(|e| {
                debug!("Waiting for {} failed: {}", locator, e);
                false
            })
    }

    fn advance(&mut self, next: ScanState) {
        debug!("Scan state: {} -> {}", self.state, next);
        self.state = next;
    }
}

/// `base_url + "dp/" + id`, tolerating a base URL without trailing slash.
pub fn product_url(base_url: &str, id: &ProductIdentifier) -> String {
    if base_url.ends_with('/') {
        format!("{base_url}dp/{}", id.as_str())
    } else {
        format!("{base_url}/dp/{}", id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::{FakeBrowser, FakePage};
    use crate::layout::AmazonLayout;

    const BASE: &str = "https://shop.test/";
    const RESULTS: &str = "https://shop.test/s?k=iphone";
    const FILTERED: &str = "https://shop.test/s?k=iphone&rh=p_36%3A459-1290";

    fn options() -> ScanOptions {
        ScanOptions {
            wait_timeout: Duration::from_millis(1),
            poll_interval: Duration::from_millis(1),
            product_query: Some("language=en_GB".to_string()),
        }
    }

    fn product_page(id: &str) -> String {
        format!("https://shop.test/dp/{id}?language=en_GB")
    }

    fn filter() -> FilterSpec {
        FilterSpec::new("4.59", "12.9")
    }

    fn home() -> FakePage {
        FakePage::default().submitting(Locator::id("twotabsearchtextbox"), "https://shop.test/s?k=")
    }

    fn results(links: &[&str]) -> FakePage {
        FakePage::default().with_attributes(
            Locator::class("s-result-list"),
            Locator::css("h2 a"),
            "href",
            links,
        )
    }

    fn product(title: &str, seller: Option<&str>, price: &str) -> FakePage {
        let page = FakePage::default()
            .with_text(Locator::id("productTitle"), title)
            .with_text(Locator::id("priceblock_ourprice"), price);
        match seller {
            Some(seller) => page.with_text(Locator::id("bylineInfo"), seller),
            None => page,
        }
    }

    #[test]
    fn collects_complete_products_in_harvest_order() {
        let browser = FakeBrowser::new()
            .page(BASE, home())
            .page(
                FILTERED,
                results(&[
                    "/x/dp/B3/ref=sr_1_1",
                    "/x/dp/B1/ref=sr_1_2",
                    "/x/dp/B2/ref=sr_1_3",
                ]),
            )
            .page(&product_page("B3"), product("Three", Some("S3"), "€12\n90"))
            .page(&product_page("B1"), product("One", None, "€4\n59"))
            .page(&product_page("B2"), product("Two", Some("S2"), "€9\n00"));
        let closes = browser.closes.clone();
        let visited = browser.visited.clone();

        let products = CatalogScanner::new(browser, AmazonLayout::default(), options())
            .run("iphone", &filter(), BASE, "€")
            .unwrap();

        let ids: Vec<&str> = products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["B3", "B2"]);
        assert_eq!(products[0].url, "https://shop.test/dp/B3");
        assert_eq!(products[1].price, 9.0);
        assert_eq!(closes.get(), 1);
        assert_eq!(visited.borrow()[..3], [BASE, RESULTS, FILTERED]);
    }

    #[test]
    fn no_results_ends_early_and_still_closes_once() {
        let browser = FakeBrowser::new()
            .page(BASE, home())
            .page(FILTERED, FakePage::default());
        let closes = browser.closes.clone();
        let visited = browser.visited.clone();

        let products = CatalogScanner::new(browser, AmazonLayout::default(), options())
            .run("iphone", &filter(), BASE, "€")
            .unwrap();

        assert!(products.is_empty());
        assert_eq!(closes.get(), 1);
        assert_eq!(visited.borrow().len(), 3);
    }

    #[test]
    fn failed_search_is_an_error_but_session_is_closed() {
        let browser = FakeBrowser::new().page(BASE, FakePage::default());
        let closes = browser.closes.clone();

        let outcome = CatalogScanner::new(browser, AmazonLayout::default(), options())
            .run("iphone", &filter(), BASE, "€");

        assert!(outcome.is_err());
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn slow_search_submission_is_waited_for() {
        let mut browser = FakeBrowser::new()
            .page(BASE, home())
            .page(FILTERED, results(&["/x/dp/B2/ref=sr_1_1"]))
            .page(&product_page("B2"), product("Two", Some("S2"), "€9\n00"));
        browser.submit_delay = 3;
        let visited = browser.visited.clone();
        let options = ScanOptions {
            wait_timeout: Duration::from_secs(5),
            ..options()
        };

        let products = CatalogScanner::new(browser, AmazonLayout::default(), options)
            .run("iphone", &filter(), BASE, "€")
            .unwrap();

        assert_eq!(visited.borrow()[..3], [BASE, RESULTS, FILTERED]);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id.as_str(), "B2");
    }

    #[test]
    fn search_that_never_lands_is_an_error_but_session_is_closed() {
        let mut browser = FakeBrowser::new().page(BASE, home());
        browser.submit_delay = usize::MAX;
        let closes = browser.closes.clone();
        let visited = browser.visited.clone();

        let outcome = CatalogScanner::new(browser, AmazonLayout::default(), options())
            .run("iphone", &filter(), BASE, "€");

        assert!(outcome.is_err());
        assert_eq!(closes.get(), 1);
        assert_eq!(*visited.borrow(), vec![BASE.to_string()]);
    }

    #[test]
    fn unreachable_product_page_is_skipped() {
        let mut browser = FakeBrowser::new()
            .page(BASE, home())
            .page(FILTERED, results(&["/x/dp/B1/ref=a", "/x/dp/B2/ref=b"]))
            .page(&product_page("B2"), product("Two", Some("S2"), "€9\n00"));
        browser.fail_navigation.push(product_page("B1"));

        let products = CatalogScanner::new(browser, AmazonLayout::default(), options())
            .run("iphone", &filter(), BASE, "€")
            .unwrap();

        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id.as_str(), "B2");
    }

    #[test]
    fn product_url_joins_base_and_id() {
        let id = ProductIdentifier::new("B000123");
        assert_eq!(product_url("https://www.amazon.de/", &id), "https://www.amazon.de/dp/B000123");
        assert_eq!(product_url("https://www.amazon.de", &id), "https://www.amazon.de/dp/B000123");
    }
}
