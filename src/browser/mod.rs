//! Browser-automation seam.
//!
//! The scanner only talks to a page through [`Browser`], so the marketplace
//! logic runs the same against a live WebDriver session, a plain HTTP fetcher,
//! or the in-memory page model used by the tests.

mod http;
#[cfg(feature = "webdriver")]
mod webdriver;

pub use http::{DEFAULT_USER_AGENT, HttpSession};
#[cfg(feature = "webdriver")]
pub use webdriver::{WebDriverOptions, WebDriverSession};

use crate::error::BrowserError;
use std::fmt;
use std::time::{Duration, Instant};

/// How to find an element on the current page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Id(String),
    Class(String),
    Css(String),
    /// Only the WebDriver backend evaluates XPath.
    #[cfg(feature = "webdriver")]
    XPath(String),
}

impl Locator {
    pub fn id(id: &str) -> Self {
        Locator::Id(id.to_string())
    }

    pub fn class(class: &str) -> Self {
        Locator::Class(class.to_string())
    }

    pub fn css(selector: &str) -> Self {
        Locator::Css(selector.to_string())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Id(id) => write!(f, "id={id}"),
            Locator::Class(class) => write!(f, "class={class}"),
            Locator::Css(selector) => write!(f, "css={selector}"),
            #[cfg(feature = "webdriver")]
            Locator::XPath(path) => write!(f, "xpath={path}"),
        }
    }
}

pub trait Browser {
    fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    fn current_url(&self) -> Result<String, BrowserError>;

    fn exists(&self, locator: &Locator) -> Result<bool, BrowserError>;

    /// Text of the first element matching `locator`.
    fn text(&self, locator: &Locator) -> Result<String, BrowserError>;

    /// `attr` of every `target` inside the first `container` match.
    /// Missing attributes are skipped; a missing container is `ElementNotFound`.
    fn attributes_within(
        &self,
        container: &Locator,
        target: &Locator,
        attr: &str,
    ) -> Result<Vec<String>, BrowserError>;

    /// Types `text` into the element and presses Enter.
    fn submit_text(&mut self, locator: &Locator, text: &str) -> Result<(), BrowserError>;

    /// Polls until `locator` is present or `timeout` runs out.
    fn wait_for(
        &self,
        locator: &Locator,
        timeout: Duration,
        poll: Duration,
    ) -> Result<bool, BrowserError> {
        let start = Instant::now();
        loop {
            if self.exists(locator)? {
                return Ok(true);
            }
            if start.elapsed() >= timeout {
                return Ok(false);
            }
            std::thread::sleep(poll);
        }
    }

    /// Polls the address bar until it no longer shows `from`. `None` when
    /// the page is still on `from` after `timeout`.
    fn wait_for_url_change(
        &self,
        from: &str,
        timeout: Duration,
        poll: Duration,
    ) -> Result<Option<String>, BrowserError> {
        let start = Instant::now();
        loop {
            let url = self.current_url()?;
            if url != from {
                return Ok(Some(url));
            }
            if start.elapsed() >= timeout {
                return Ok(None);
            }
            std::thread::sleep(poll);
        }
    }

    fn close(&mut self) -> Result<(), BrowserError>;
}
