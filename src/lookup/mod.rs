//! Upstream product lookup by barcode.

mod off;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::products::model::RawProduct;

pub use off::OpenFoodFactsClient;

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("product {0} not found")]
    NotFound(String),
    #[error("invalid barcode {0:?}")]
    InvalidBarcode(String),
    #[error("upstream returned status {0}")]
    Upstream(u16),
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[async_trait]
pub trait ProductLookup: Send + Sync {
    async fn lookup(&self, barcode: &str) -> Result<RawProduct, LookupError>;
}

/// Barcodes go into a URL path; anything beyond plain alphanumerics is refused.
pub fn validate_barcode(barcode: &str) -> Result<&str, LookupError> {
    let trimmed = barcode.trim();
    if trimmed.is_empty() || trimmed.len() > 64 || !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(LookupError::InvalidBarcode(barcode.to_string()));
    }
    Ok(trimmed)
}

/// Lookup answered from a fixed table. Used for offline runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticLookup {
    products: HashMap<String, RawProduct>,
}

impl StaticLookup {
    pub fn new(products: impl IntoIterator<Item = RawProduct>) -> Self {
        Self {
            products: products
                .into_iter()
                .map(|p| (p.barcode.clone(), p))
                .collect(),
        }
    }
}

#[async_trait]
impl ProductLookup for StaticLookup {
    async fn lookup(&self, barcode: &str) -> Result<RawProduct, LookupError> {
        let barcode = validate_barcode(barcode)?;
        self.products
            .get(barcode)
            .cloned()
            .ok_or_else(|| LookupError::NotFound(barcode.to_string()))
    }
}
