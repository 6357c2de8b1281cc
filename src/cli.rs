use crate::config::{AppConfig, Backend};
use clap::Parser;
use std::path::PathBuf;

/// Search a marketplace within a price range and report the cheapest product.
#[derive(Debug, Parser)]
#[command(name = "price_scanner", version, about)]
pub struct Cli {
    /// Search term, e.g. "iphone"
    pub term: Option<String>,

    /// Lower price bound, as a decimal string
    #[arg(long)]
    pub min: Option<String>,

    /// Upper price bound, as a decimal string
    #[arg(long)]
    pub max: Option<String>,

    /// Currency symbol used on the marketplace
    #[arg(long)]
    pub currency: Option<String>,

    /// Marketplace home page
    #[arg(long)]
    pub base_url: Option<String>,

    /// Directory the JSON report is written to
    #[arg(long, short = 'o')]
    pub output_dir: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    /// WebDriver server, e.g. a running chromedriver
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,

    /// TOML configuration file
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl Cli {
    /// Command-line values win over the configuration file.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(term) = &self.term {
            config.search.term = term.clone();
        }
        if let Some(min) = &self.min {
            config.search.min_price = min.clone();
        }
        if let Some(max) = &self.max {
            config.search.max_price = max.clone();
        }
        if let Some(currency) = &self.currency {
            config.search.currency = currency.clone();
        }
        if let Some(base_url) = &self.base_url {
            config.search.base_url = base_url.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output.directory = dir.clone();
        }
        if let Some(backend) = self.backend {
            config.browser.backend = backend;
        }
        if let Some(url) = &self.webdriver_url {
            config.browser.webdriver_url = url.clone();
        }
        if self.headless {
            config.browser.headless = true;
        }
    }
}
