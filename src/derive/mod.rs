//! Derived classification fields computed from raw product attributes.
//!
//! Scores are pure functions of the record. The environmental fallbacks
//! draw from an injected RNG and only run when
//! [`DeriveOptions::fallback_environment`] is set.

pub mod additives;
mod fallback;
mod scores;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::products::model::{grade_text, Grade, RawProduct};

pub use additives::{additive_code, normalize_additive};
pub use fallback::{
    fallback_eco_grade, fallback_origin, fallback_recycling, FallbackOrigin, ORIGIN_COUNTRIES,
    RECYCLING_NOTE,
};
pub use scores::{green_score, match_score};

/// Where the environmental fields of a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    #[default]
    Upstream,
    Fallback,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::Upstream => "upstream",
            Provenance::Fallback => "fallback",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "fallback" => Provenance::Fallback,
            _ => Provenance::Upstream,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DerivedAttributes {
    #[serde(default, with = "grade_text")]
    pub ecoscore_grade: Option<Grade>,
    #[serde(default)]
    pub origins: Option<String>,
    #[serde(default)]
    pub origins_tags: Vec<String>,
    #[serde(default)]
    pub recycling: Option<String>,
    #[serde(default)]
    pub green_score: u8,
    #[serde(default)]
    pub match_score: u8,
    /// `fallback` as soon as any of eco-score, origin or recycling was
    /// generated rather than sourced.
    #[serde(default)]
    pub environment_provenance: Provenance,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DeriveOptions {
    pub fallback_environment: bool,
}

pub fn derive_attributes<R: Rng + ?Sized>(
    raw: &RawProduct,
    opts: DeriveOptions,
    rng: &mut R,
) -> DerivedAttributes {
    let mut derived = DerivedAttributes {
        ecoscore_grade: raw.ecoscore_grade,
        origins: raw.origins.clone().filter(|o| !o.trim().is_empty()),
        origins_tags: raw.origins_tags.clone(),
        recycling: raw.recycling.clone().filter(|r| !r.trim().is_empty()),
        green_score: green_score(&raw.labels, raw.nova_group),
        match_score: match_score(raw.nutriscore_grade, &raw.allergens, raw.nova_group),
        environment_provenance: Provenance::Upstream,
    };

    if !opts.fallback_environment {
        return derived;
    }

    if derived.ecoscore_grade.is_none() {
        derived.ecoscore_grade = Some(fallback_eco_grade(raw.nova_group, &raw.labels, rng));
        derived.environment_provenance = Provenance::Fallback;
    }
    if derived.origins.is_none() && derived.origins_tags.is_empty() {
        let FallbackOrigin {
            origins,
            origins_tags,
        } = fallback_origin(rng);
        derived.origins = Some(origins);
        derived.origins_tags = origins_tags;
        derived.environment_provenance = Provenance::Fallback;
    }
    if derived.recycling.is_none() {
        derived.recycling = fallback_recycling(rng);
        if derived.recycling.is_some() {
            derived.environment_provenance = Provenance::Fallback;
        }
    }

    derived
}
