use serde::{Deserialize, Serialize};
use std::fmt;

/// Marketplace token for a single product, taken from its `/dp/<id>/` path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductIdentifier(String);

impl ProductIdentifier {
    pub fn new(token: impl Into<String>) -> Self {
        ProductIdentifier(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(rename = "asin")]
    pub id: ProductIdentifier,
    pub url: String,
    pub title: String,
    pub seller: String,
    pub price: f64,
}

/// Price range bounds, kept as the caller wrote them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub min: String,
    pub max: String,
}

impl FilterSpec {
    pub fn new(min: impl Into<String>, max: impl Into<String>) -> Self {
        FilterSpec {
            min: min.into(),
            max: max.into(),
        }
    }
}
