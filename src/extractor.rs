use crate::browser::Browser;
use crate::error::BrowserError;
use crate::layout::ProductPageReader;
use crate::models::{ProductIdentifier, ProductRecord};
use crate::price::parse_price;
use tracing::{debug, warn};

/// Reads title, seller and price off a loaded product page.
///
/// Missing fields are logged and the product is dropped: a record is only
/// built when all three are present.
pub struct ProductPageExtractor<'a, R: ?Sized> {
    reader: &'a R,
    currency: &'a str,
}

impl<'a, R> ProductPageExtractor<'a, R>
where
    R: ProductPageReader + ?Sized,
{
    pub fn new(reader: &'a R, currency: &'a str) -> Self {
        ProductPageExtractor { reader, currency }
    }

    pub fn extract(
        &self,
        page: &dyn Browser,
        id: &ProductIdentifier,
        url: &str,
    ) -> Option<ProductRecord> {
        let title = self.title(page);
        let seller = self.seller(page);
        let price = self.price(page);

        match (title, seller, price) {
            (Some(title), Some(seller), Some(price)) => Some(ProductRecord {
                id: id.clone(),
                url: url.to_string(),
                title,
                seller,
                price,
            }),
            _ => {
                debug!("Product {} is incomplete, skipping", id);
                None
            }
        }
    }

    pub fn title(&self, page: &dyn Browser) -> Option<String> {
        field(page, "title", self.reader.title(page))
    }

    pub fn seller(&self, page: &dyn Browser) -> Option<String> {
        field(page, "seller", self.reader.seller(page))
    }

    /// Headline price first; only when that element is missing, the offers
    /// panel of an available product.
    pub fn price(&self, page: &dyn Browser) -> Option<f64> {
        match self.reader.primary_price(page) {
            Ok(raw) => self.parse(page, &raw),
            Err(e) if e.is_not_found() => self.offers_price(page),
            Err(e) => {
                field_failed(page, "price", &e);
                None
            }
        }
    }

    fn offers_price(&self, page: &dyn Browser) -> Option<f64> {
        let availability = field(page, "availability", self.reader.availability(page))?;
        if !self.reader.signals_available(&availability) {
            debug!("Not available ({:?}), no offers price", availability);
            return None;
        }

        let raw = field(page, "price", self.reader.offers_price(page))?;
        match raw.find(self.currency) {
            Some(at) => self.parse(page, &raw[at..]),
            None => {
                warn!(
                    "Offers price {:?} has no {} - {}",
                    raw,
                    self.currency,
                    current_url(page)
                );
                None
            }
        }
    }

    fn parse(&self, page: &dyn Browser, raw: &str) -> Option<f64> {
        match parse_price(raw, self.currency) {
            Ok(price) => Some(price),
            Err(e) => {
                warn!("Can't parse price of a product: {} - {}", e, current_url(page));
                None
            }
        }
    }
}

fn field(page: &dyn Browser, name: &str, read: Result<String, BrowserError>) -> Option<String> {
    match read {
        Ok(text) => {
            let text = text.trim();
            if text.is_empty() {
                warn!("Empty {} of a product - {}", name, current_url(page));
                None
            } else {
                Some(text.to_string())
            }
        }
        Err(e) => {
            field_failed(page, name, &e);
            None
        }
    }
}

fn field_failed(page: &dyn Browser, name: &str, error: &BrowserError) {
    warn!("Can't get {} of a product: {} - {}", name, error, current_url(page));
}

fn current_url(page: &dyn Browser) -> String {
    page.current_url().unwrap_or_else(|_| "<no page>".to_string())
}
