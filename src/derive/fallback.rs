//! Placeholder environmental data for products the upstream database knows
//! nothing about. None of this is a real eco-score; values produced here are
//! tagged [`Provenance::Fallback`](super::Provenance::Fallback).

use rand::Rng;

use super::scores::any_label_contains;
use crate::products::model::{Grade, NovaGroup};

pub const ORIGIN_COUNTRIES: [&str; 9] = [
    "France",
    "Italy",
    "Spain",
    "Germany",
    "Netherlands",
    "Belgium",
    "Switzerland",
    "United Kingdom",
    "United States",
];

pub const RECYCLING_NOTE: &str = "Recyclable packaging. Please check local recycling guidelines.";

const FAIR_TRADE_CHANCE: f64 = 0.5;
const LOCAL_PRODUCT_CHANCE: f64 = 0.3;
const RECYCLING_CHANCE: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackOrigin {
    pub origins: String,
    pub origins_tags: Vec<String>,
}

/// Grade bucket by NOVA group and organic labelling, uniform within the bucket.
pub fn fallback_eco_grade<R: Rng + ?Sized>(nova: NovaGroup, labels: &[String], rng: &mut R) -> Grade {
    let organic = any_label_contains(labels, "organic") || any_label_contains(labels, "bio");
    let bucket = match nova {
        NovaGroup::One => [Grade::A, Grade::B],
        _ if organic => [Grade::A, Grade::B],
        NovaGroup::Two => [Grade::B, Grade::C],
        NovaGroup::Three => [Grade::C, Grade::D],
        _ => [Grade::D, Grade::E],
    };
    bucket[rng.gen_range(0..bucket.len())]
}

pub fn fallback_origin<R: Rng + ?Sized>(rng: &mut R) -> FallbackOrigin {
    let country = ORIGIN_COUNTRIES[rng.gen_range(0..ORIGIN_COUNTRIES.len())];

    let mut origins_tags = vec![
        format!("en:{}", country.to_lowercase().replace(' ', "-")),
        "en:european-union".to_string(),
    ];
    if rng.gen_bool(FAIR_TRADE_CHANCE) {
        origins_tags.push("en:fair-trade".to_string());
    }
    if rng.gen_bool(LOCAL_PRODUCT_CHANCE) {
        origins_tags.push("en:local-product".to_string());
    }

    FallbackOrigin {
        origins: format!("Made in {country}"),
        origins_tags,
    }
}

pub fn fallback_recycling<R: Rng + ?Sized>(rng: &mut R) -> Option<String> {
    rng.gen_bool(RECYCLING_CHANCE)
        .then(|| RECYCLING_NOTE.to_string())
}
