use crate::browser::DEFAULT_USER_AGENT;
use crate::models::FilterSpec;
use crate::scanner::ScanOptions;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub search: SearchConfig,
    pub output: OutputConfig,
    pub browser: BrowserConfig,
}

/// What to look for and where.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub term: String,
    pub currency: String,
    pub base_url: String,
    pub min_price: String,
    pub max_price: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Plain HTTP requests, server-rendered HTML only
    Http,
    /// Chrome through a running WebDriver server
    Webdriver,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub backend: Backend,
    pub webdriver_url: String,
    pub headless: bool,
    pub incognito: bool,
    pub ignore_certificate_errors: bool,
    pub user_agent: String,
    pub wait_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub product_query: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            term: "iphone".to_string(),
            currency: "€".to_string(),
            base_url: "https://www.amazon.de/".to_string(),
            min_price: "4.59".to_string(),
            max_price: "12.9".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("reports"),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Http,
            webdriver_url: "http://localhost:9515".to_string(),
            headless: false,
            incognito: true,
            ignore_certificate_errors: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            wait_timeout_secs: 10,
            poll_interval_ms: 250,
            product_query: Some("language=en_GB".to_string()),
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.search.term.trim().is_empty() {
            bail!("search term must not be empty");
        }
        if self.search.currency.is_empty() {
            bail!("currency must not be empty");
        }
        Url::parse(&self.search.base_url)
            .with_context(|| format!("invalid base url {:?}", self.search.base_url))?;
        Ok(())
    }

    pub fn filters(&self) -> FilterSpec {
        FilterSpec::new(&self.search.min_price, &self.search.max_price)
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            wait_timeout: Duration::from_secs(self.browser.wait_timeout_secs),
            poll_interval: Duration::from_millis(self.browser.poll_interval_ms),
            product_query: self.browser.product_query.clone(),
        }
    }
}
