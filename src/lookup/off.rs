use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{validate_barcode, LookupError, ProductLookup};
use crate::products::model::{grade_text, lenient, Grade, NovaGroup, Nutriments, RawProduct};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the Open Food Facts v0 product endpoint.
#[derive(Clone)]
pub struct OpenFoodFactsClient {
    http: reqwest::Client,
    base_url: String,
}

impl OpenFoodFactsClient {
    pub fn new(base_url: &str, user_agent: &str) -> Result<Self, LookupError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn product_url(&self, barcode: &str) -> String {
        format!("{}/api/v0/product/{}.json", self.base_url, barcode)
    }
}

#[async_trait]
impl ProductLookup for OpenFoodFactsClient {
    #[instrument(skip(self))]
    async fn lookup(&self, barcode: &str) -> Result<RawProduct, LookupError> {
        let barcode = validate_barcode(barcode)?;
        let resp = self.http.get(self.product_url(barcode)).send().await?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound(barcode.to_string()));
        }
        if !status.is_success() {
            warn!(%status, "open food facts returned an error status");
            return Err(LookupError::Upstream(status.as_u16()));
        }

        let body: OffResponse = resp.json().await?;
        let product = into_raw_product(barcode, body)?;
        debug!(name = ?product.name, "open food facts product fetched");
        Ok(product)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OffResponse {
    #[serde(default, deserialize_with = "status_code")]
    status: i64,
    #[serde(default)]
    product: Option<OffProduct>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OffProduct {
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    brands: Vec<String>,
    #[serde(default)]
    ingredients_text: Option<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    allergens_tags: Vec<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    allergens: Vec<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    labels: Vec<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    labels_tags: Vec<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    categories: Vec<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    categories_tags: Vec<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    packaging: Vec<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    packaging_tags: Vec<String>,
    #[serde(default, deserialize_with = "lenient::nutriments")]
    nutriments: Nutriments,
    #[serde(default)]
    nova_group: NovaGroup,
    #[serde(default, with = "grade_text")]
    nutriscore_grade: Option<Grade>,
    #[serde(default, with = "grade_text")]
    ecoscore_grade: Option<Grade>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    additives_tags: Vec<String>,
    #[serde(default, deserialize_with = "lenient::count")]
    additives_n: Option<i32>,
    #[serde(default)]
    origins: Option<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    origins_tags: Vec<String>,
}

fn status_code<'de, D: serde::Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(d)?;
    Ok(lenient::integer(value).unwrap_or(0))
}

fn prefer(primary: Vec<String>, fallback: Vec<String>) -> Vec<String> {
    if primary.is_empty() {
        fallback
    } else {
        primary
    }
}

/// Splits an ingredient statement on commas outside parentheses, so
/// "sugar, cocoa (10%, fair trade), milk" yields three entries.
pub(crate) fn split_ingredients(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in text.chars() {
        match c {
            '(' | '[' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                out.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    out.push(current);
    out.into_iter()
        .map(|s| s.trim().trim_end_matches('.').trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub(crate) fn into_raw_product(barcode: &str, body: OffResponse) -> Result<RawProduct, LookupError> {
    let product = match (body.status, body.product) {
        (1, Some(p)) => p,
        _ => return Err(LookupError::NotFound(barcode.to_string())),
    };

    Ok(RawProduct {
        barcode: barcode.to_string(),
        name: product.product_name.filter(|n| !n.trim().is_empty()),
        brands: product.brands,
        ingredients: product
            .ingredients_text
            .as_deref()
            .map(split_ingredients)
            .unwrap_or_default(),
        allergens: prefer(product.allergens_tags, product.allergens),
        labels: prefer(product.labels, product.labels_tags),
        categories: prefer(product.categories, product.categories_tags),
        packaging: prefer(product.packaging, product.packaging_tags),
        nutriments: product.nutriments,
        nova_group: product.nova_group,
        nutriscore_grade: product.nutriscore_grade,
        image_url: product.image_url,
        additives_tags: product.additives_tags,
        additives_n: product.additives_n,
        ecoscore_grade: product.ecoscore_grade,
        origins: product.origins.filter(|o| !o.trim().is_empty()),
        origins_tags: product.origins_tags,
        recycling: None,
    })
}
