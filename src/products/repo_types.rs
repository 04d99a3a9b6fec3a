use sqlx::types::Json;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::{Grade, NovaGroup, Nutriments, ProductRecord};
use crate::derive::{DerivedAttributes, Provenance};

/// Row of the `products` table.
#[derive(Debug, FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub barcode: String,
    pub name: String,
    pub brands: Vec<String>,
    pub ingredients: Vec<String>,
    pub allergens: Vec<String>,
    pub labels: Vec<String>,
    pub categories: Vec<String>,
    pub packaging: Vec<String>,
    pub nutriments: Json<Nutriments>,
    pub nova_group: Option<i16>,
    pub nutriscore_grade: Option<String>,
    pub image_url: Option<String>,
    pub additives_tags: Vec<String>,
    pub additives_n: i32,
    pub ecoscore_grade: Option<String>,
    pub origins: Option<String>,
    pub origins_tags: Vec<String>,
    pub recycling: Option<String>,
    pub green_score: i16,
    pub match_score: i16,
    pub environment_provenance: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

fn score(v: i16) -> u8 {
    v.clamp(0, 100) as u8
}

impl From<ProductRow> for ProductRecord {
    fn from(r: ProductRow) -> Self {
        Self {
            id: r.id,
            barcode: r.barcode,
            name: r.name,
            brands: r.brands,
            ingredients: r.ingredients,
            allergens: r.allergens,
            labels: r.labels,
            categories: r.categories,
            packaging: r.packaging,
            nutriments: r.nutriments.0,
            nova_group: r
                .nova_group
                .map(|n| NovaGroup::from_number(n.into()))
                .unwrap_or_default(),
            nutriscore_grade: r.nutriscore_grade.as_deref().and_then(Grade::parse),
            image_url: r.image_url,
            additives_tags: r.additives_tags,
            additives_n: r.additives_n,
            derived: DerivedAttributes {
                ecoscore_grade: r.ecoscore_grade.as_deref().and_then(Grade::parse),
                origins: r.origins,
                origins_tags: r.origins_tags,
                recycling: r.recycling,
                green_score: score(r.green_score),
                match_score: score(r.match_score),
                environment_provenance: Provenance::parse(&r.environment_provenance),
            },
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}
