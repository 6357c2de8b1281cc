mod browser;
mod cli;
mod config;
mod error;
mod extractor;
mod harvester;
mod layout;
mod models;
mod price;
mod report;
mod scanner;

use anyhow::{Context, Result};
use browser::{Browser, HttpSession};
use clap::Parser;
use cli::Cli;
use config::{AppConfig, Backend};
use layout::AmazonLayout;
use report::Report;
use scanner::CatalogScanner;
use tracing::{info, warn};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "price_scanner=debug"
    } else {
        "price_scanner=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    cli.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    info!("Starting scan of {}", config.search.base_url);
    let products = match config.browser.backend {
        Backend::Http => {
            let session = HttpSession::new(
                &config.browser.user_agent,
                config.browser.ignore_certificate_errors,
            )?;
            scan(session, &config)?
        }
        Backend::Webdriver => scan(webdriver_session(&config)?, &config)?,
    };

    let report = Report::build(
        &config.search.term,
        &config.filters(),
        &config.search.base_url,
        &config.search.currency,
        products,
    );
    let path = report.save(&config.output.directory)?;

    info!(
        "{} products as of {} in {}",
        report.products().len(),
        report.date(),
        path.display()
    );
    match report.best_item() {
        Some(best) => info!(
            "Best item: {} at {} {} ({})",
            best.title,
            best.price,
            report.currency(),
            best.url
        ),
        None => warn!("No best item for {}", report.title()),
    }
    Ok(())
}

fn scan<B: Browser>(session: B, config: &AppConfig) -> Result<Vec<models::ProductRecord>> {
    CatalogScanner::new(session, AmazonLayout::default(), config.scan_options()).run(
        &config.search.term,
        &config.filters(),
        &config.search.base_url,
        &config.search.currency,
    )
}

#[cfg(feature = "webdriver")]
fn webdriver_session(config: &AppConfig) -> Result<browser::WebDriverSession> {
    let options = browser::WebDriverOptions {
        server_url: config.browser.webdriver_url.clone(),
        headless: config.browser.headless,
        incognito: config.browser.incognito,
        ignore_certificate_errors: config.browser.ignore_certificate_errors,
    };
    browser::WebDriverSession::connect(&options)
        .with_context(|| format!("Failed to connect to {}", options.server_url))
}

#[cfg(not(feature = "webdriver"))]
fn webdriver_session(_config: &AppConfig) -> Result<HttpSession> {
    anyhow::bail!("webdriver backend not compiled in; rebuild with --features webdriver")
}
