use super::{Browser, Locator};
use crate::error::BrowserError;
use std::time::{Duration, Instant};
use thirtyfour::error::WebDriverError;
use thirtyfour::prelude::*;
use thirtyfour::{ChromiumLikeCapabilities, Key};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct WebDriverOptions {
    pub server_url: String,
    pub headless: bool,
    pub incognito: bool,
    pub ignore_certificate_errors: bool,
}

/// Chrome driven over WebDriver. The async client runs on a private
/// current-thread runtime so the session fits the blocking [`Browser`] seam.
pub struct WebDriverSession {
    runtime: Runtime,
    driver: Option<WebDriver>,
}

fn webdriver_err(e: WebDriverError) -> BrowserError {
    BrowserError::WebDriver(e.to_string())
}

fn by(locator: &Locator) -> By {
    match locator {
        Locator::Id(id) => By::Id(id.as_str()),
        Locator::Class(class) => By::ClassName(class.as_str()),
        Locator::Css(selector) => By::Css(selector.as_str()),
        Locator::XPath(path) => By::XPath(path.as_str()),
    }
}

impl WebDriverSession {
    pub fn connect(options: &WebDriverOptions) -> Result<Self, BrowserError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| BrowserError::WebDriver(e.to_string()))?;

        let mut caps = DesiredCapabilities::chrome();
        if options.headless {
            caps.add_arg("--headless").map_err(webdriver_err)?;
        }
        if options.incognito {
            caps.add_arg("--incognito").map_err(webdriver_err)?;
        }
        if options.ignore_certificate_errors {
            caps.add_arg("--ignore-certificate-errors").map_err(webdriver_err)?;
        }

        let driver = runtime
            .block_on(WebDriver::new(options.server_url.as_str(), caps))
            .map_err(webdriver_err)?;
        info!("Connected to WebDriver at {}", options.server_url);

        Ok(WebDriverSession {
            runtime,
            driver: Some(driver),
        })
    }

    fn driver(&self) -> Result<&WebDriver, BrowserError> {
        self.driver.as_ref().ok_or(BrowserError::NoPage)
    }

    fn first(&self, locator: &Locator) -> Result<Option<WebElement>, BrowserError> {
        let driver = self.driver()?;
        let mut found = self
            .runtime
            .block_on(driver.find_all(by(locator)))
            .map_err(webdriver_err)?;
        Ok(if found.is_empty() {
            None
        } else {
            Some(found.remove(0))
        })
    }

    fn require(&self, locator: &Locator) -> Result<WebElement, BrowserError> {
        self.first(locator)?
            .ok_or_else(|| BrowserError::ElementNotFound(locator.to_string()))
    }
}

impl Browser for WebDriverSession {
    fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        let driver = self.driver()?;
        self.runtime.block_on(driver.goto(url)).map_err(webdriver_err)?;
        debug!("Navigated to {}", url);
        Ok(())
    }

    fn current_url(&self) -> Result<String, BrowserError> {
        let driver = self.driver()?;
        let url = self
            .runtime
            .block_on(driver.current_url())
            .map_err(webdriver_err)?;
        Ok(url.to_string())
    }

    fn exists(&self, locator: &Locator) -> Result<bool, BrowserError> {
        Ok(self.first(locator)?.is_some())
    }

    fn text(&self, locator: &Locator) -> Result<String, BrowserError> {
        let element = self.require(locator)?;
        self.runtime.block_on(element.text()).map_err(webdriver_err)
    }

    fn attributes_within(
        &self,
        container: &Locator,
        target: &Locator,
        attr: &str,
    ) -> Result<Vec<String>, BrowserError> {
        let container_el = self.require(container)?;
        self.runtime
            .block_on(async {
                let mut values = Vec::new();
                for el in container_el.find_all(by(target)).await? {
                    if let Some(value) = el.attr(attr).await? {
                        values.push(value);
                    }
                }
                Ok::<_, WebDriverError>(values)
            })
            .map_err(webdriver_err)
    }

    fn submit_text(&mut self, locator: &Locator, text: &str) -> Result<(), BrowserError> {
        let element = self.require(locator)?;
        self.runtime
            .block_on(async {
                element.send_keys(text).await?;
                element.send_keys(Key::Enter).await
            })
            .map_err(webdriver_err)
    }

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
            self.runtime.block_on(tokio::time::sleep(poll));
        }
    }

    fn close(&mut self) -> Result<(), BrowserError> {
        if let Some(driver) = self.driver.take() {
            self.runtime.block_on(driver.quit()).map_err(webdriver_err)?;
            info!("WebDriver session closed");
        }
        Ok(())
    }
}
