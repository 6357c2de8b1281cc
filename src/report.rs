use crate::models::{FilterSpec, ProductRecord};
use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DATE_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Outcome of one scan, written once as `<title>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    title: String,
    date: String,
    best_item: Option<ProductRecord>,
    currency: String,
    filters: FilterSpec,
    base_link: String,
    products: Vec<ProductRecord>,
}

impl Report {
    /// Stamps the report with the current local time and picks the cheapest
    /// product as best item.
    pub fn build(
        title: &str,
        filters: &FilterSpec,
        base_link: &str,
        currency: &str,
        products: Vec<ProductRecord>,
    ) -> Self {
        Report {
            title: title.to_string(),
            date: Local::now().format(DATE_FORMAT).to_string(),
            best_item: best_item(&products),
            currency: currency.to_string(),
            filters: filters.clone(),
            base_link: base_link.to_string(),
            products,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn best_item(&self) -> Option<&ProductRecord> {
        self.best_item.as_ref()
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn products(&self) -> &[ProductRecord] {
        &self.products
    }

    /// Writes `<dir>/<title>.json`, replacing any earlier report of that title.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        info!("Creating report...");
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create report directory {}", dir.display()))?;

        let path = dir.join(format!("{}.json", file_stem(&self.title)));
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        file.write_all(json.as_bytes())?;

        info!("Done... report written to {}", path.display());
        Ok(path)
    }
}

/// Cheapest product; `None` for an empty list or prices that cannot be ordered.
pub fn best_item(products: &[ProductRecord]) -> Option<ProductRecord> {
    if products.is_empty() {
        warn!("No products, so no best item");
        return None;
    }

    let mut best = &products[0];
    for product in &products[1..] {
        match product.price.partial_cmp(&best.price) {
            Some(Ordering::Less) => best = product,
            Some(_) => {}
            None => {
                warn!("Problem with sorting items: cannot compare price of {}", product.id);
                return None;
            }
        }
    }
    // a lone NaN never meets a comparison above
    if best.price.is_nan() {
        warn!("Problem with sorting items: price of {} is not a number", best.id);
        return None;
    }
    Some(best.clone())
}

fn file_stem(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| if matches!(c, '/' | '\\') || c.is_control() { '_' } else { c })
        .collect();
    if stem.trim().is_empty() {
        "report".to_string()
    } else {
        stem
    }
}
