use std::num::ParseFloatError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PriceFormatError {
    #[error("currency symbol {currency:?} not found in {raw:?}")]
    MissingCurrency { raw: String, currency: String },

    #[error("no numeric content after the currency symbol in {raw:?}")]
    NoNumericContent { raw: String },

    #[error("{value:?} is not a price: {source}")]
    NotANumber {
        value: String,
        #[source]
        source: ParseFloatError,
    },
}

/// Failures raised by a [`crate::browser::Browser`] backend.
///
/// `ElementNotFound` is the one callers routinely recover from: it means the
/// page simply lacks that element.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[cfg(feature = "webdriver")]
    #[error("locator not supported by this backend: {0}")]
    UnsupportedLocator(String),

    #[error("invalid selector {0:?}")]
    InvalidSelector(String),

    #[error("no page has been loaded yet")]
    NoPage,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("cannot submit form: {0}")]
    Form(String),

    #[cfg(any(feature = "webdriver", test))]
    #[error("webdriver: {0}")]
    WebDriver(String),
}

impl BrowserError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BrowserError::ElementNotFound(_))
    }
}
