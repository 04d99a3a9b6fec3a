use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::derive::{green_score, match_score, DerivedAttributes};

/// Per-100g nutrient values. Every field is always present; anything the
/// source did not provide (or provided as garbage) reads as 0.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Nutriments {
    #[serde(default, deserialize_with = "lenient::number")]
    pub energy_100g: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub proteins_100g: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub carbohydrates_100g: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub sugars_100g: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub fat_100g: f64,
    #[serde(
        rename = "saturated-fat_100g",
        default,
        deserialize_with = "lenient::number"
    )]
    pub saturated_fat_100g: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub fiber_100g: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub salt_100g: f64,
}

/// NOVA food-processing group. Anything outside 1..=4 is `Unknown`, which
/// scores like the most processed bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NovaGroup {
    One,
    Two,
    Three,
    Four,
    #[default]
    Unknown,
}

impl NovaGroup {
    pub fn from_number(n: i64) -> Self {
        match n {
            1 => NovaGroup::One,
            2 => NovaGroup::Two,
            3 => NovaGroup::Three,
            4 => NovaGroup::Four,
            _ => NovaGroup::Unknown,
        }
    }

    pub fn as_number(self) -> Option<i16> {
        match self {
            NovaGroup::One => Some(1),
            NovaGroup::Two => Some(2),
            NovaGroup::Three => Some(3),
            NovaGroup::Four => Some(4),
            NovaGroup::Unknown => None,
        }
    }

    pub fn is_low_processing(self) -> bool {
        matches!(self, NovaGroup::One | NovaGroup::Two)
    }
}

impl Serialize for NovaGroup {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        self.as_number().serialize(s)
    }
}

impl<'de> Deserialize<'de> for NovaGroup {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = Option::<serde_json::Value>::deserialize(d)?;
        Ok(lenient::integer(value)
            .map(NovaGroup::from_number)
            .unwrap_or_default())
    }
}

/// Letter grade shared by Nutri-Score and eco-score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    A,
    B,
    C,
    D,
    E,
}

impl Grade {
    pub fn parse(s: &str) -> Option<Grade> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" => Some(Grade::A),
            "b" => Some(Grade::B),
            "c" => Some(Grade::C),
            "d" => Some(Grade::D),
            "e" => Some(Grade::E),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::A => "a",
            Grade::B => "b",
            Grade::C => "c",
            Grade::D => "d",
            Grade::E => "e",
        }
    }

    pub fn is_good(self) -> bool {
        matches!(self, Grade::A | Grade::B)
    }
}

/// Product attributes as they arrive from the lookup or a client, before
/// derivation. Every field tolerates absence and the usual upstream
/// irregularities (nulls, comma-joined strings, numeric strings).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawProduct {
    #[serde(default, alias = "code")]
    pub barcode: String,
    #[serde(default, alias = "product_name")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub brands: Vec<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub ingredients: Vec<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub allergens: Vec<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub labels: Vec<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub categories: Vec<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub packaging: Vec<String>,
    #[serde(default, deserialize_with = "lenient::nutriments")]
    pub nutriments: Nutriments,
    #[serde(default)]
    pub nova_group: NovaGroup,
    #[serde(default, with = "grade_text")]
    pub nutriscore_grade: Option<Grade>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub additives_tags: Vec<String>,
    #[serde(default, deserialize_with = "lenient::count")]
    pub additives_n: Option<i32>,
    #[serde(default, with = "grade_text")]
    pub ecoscore_grade: Option<Grade>,
    #[serde(default)]
    pub origins: Option<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub origins_tags: Vec<String>,
    #[serde(default)]
    pub recycling: Option<String>,
}

/// The persisted product, unique by barcode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: Uuid,
    pub barcode: String,
    pub name: String,
    #[serde(default)]
    pub brands: Vec<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub allergens: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub packaging: Vec<String>,
    #[serde(default)]
    pub nutriments: Nutriments,
    #[serde(default)]
    pub nova_group: NovaGroup,
    #[serde(default, with = "grade_text")]
    pub nutriscore_grade: Option<Grade>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub additives_tags: Vec<String>,
    #[serde(default)]
    pub additives_n: i32,
    #[serde(flatten)]
    pub derived: DerivedAttributes,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

const UNNAMED_PRODUCT: &str = "Unknown product";

impl ProductRecord {
    pub fn from_raw(raw: RawProduct, derived: DerivedAttributes, now: OffsetDateTime) -> Self {
        let additives_n = raw
            .additives_n
            .unwrap_or(raw.additives_tags.len() as i32)
            .max(0);
        let name = raw
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| UNNAMED_PRODUCT.to_string());

        Self {
            id: Uuid::new_v4(),
            barcode: raw.barcode.trim().to_string(),
            name,
            brands: raw.brands,
            ingredients: raw.ingredients,
            allergens: raw.allergens,
            labels: raw.labels,
            categories: raw.categories,
            packaging: raw.packaging,
            nutriments: raw.nutriments,
            nova_group: raw.nova_group,
            nutriscore_grade: raw.nutriscore_grade,
            image_url: raw.image_url.filter(|u| !u.trim().is_empty()),
            additives_tags: raw.additives_tags,
            additives_n,
            derived,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn refresh_scores(&mut self) {
        self.derived.green_score = green_score(&self.labels, self.nova_group);
        self.derived.match_score =
            match_score(self.nutriscore_grade, &self.allergens, self.nova_group);
    }

    /// Applies a deliberate edit. `created_at` never changes; `updated_at`
    /// moves to `now` and both scores are recomputed.
    pub fn apply_edit(&mut self, edit: ProductEdit, now: OffsetDateTime) {
        if let Some(name) = edit.name.filter(|n| !n.trim().is_empty()) {
            self.name = name.trim().to_string();
        }
        if let Some(v) = edit.brands {
            self.brands = v;
        }
        if let Some(v) = edit.ingredients {
            self.ingredients = v;
        }
        if let Some(v) = edit.allergens {
            self.allergens = v;
        }
        if let Some(v) = edit.labels {
            self.labels = v;
        }
        if let Some(v) = edit.categories {
            self.categories = v;
        }
        if let Some(v) = edit.packaging {
            self.packaging = v;
        }
        if let Some(v) = edit.nutriments {
            self.nutriments = v;
        }
        if let Some(v) = edit.nova_group {
            self.nova_group = v;
        }
        if let Some(v) = edit.nutriscore_grade {
            self.nutriscore_grade = v;
        }
        if let Some(v) = edit.image_url {
            self.image_url = Some(v).filter(|u| !u.trim().is_empty());
        }
        self.refresh_scores();
        self.updated_at = now;
    }
}

/// Partial update accepted by `PATCH /api/products/:id`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductEdit {
    pub name: Option<String>,
    pub brands: Option<Vec<String>>,
    pub ingredients: Option<Vec<String>>,
    pub allergens: Option<Vec<String>>,
    pub labels: Option<Vec<String>>,
    pub categories: Option<Vec<String>>,
    pub packaging: Option<Vec<String>>,
    pub nutriments: Option<Nutriments>,
    /// `null` resets the group to unknown.
    #[serde(default, deserialize_with = "lenient::edit_nova")]
    pub nova_group: Option<NovaGroup>,
    /// Any letter case; `""` or `null` clears the grade.
    #[serde(default, deserialize_with = "grade_text::edit")]
    pub nutriscore_grade: Option<Option<Grade>>,
    pub image_url: Option<String>,
}

/// Grades travel as a single lowercase letter, with `""` for none.
pub(crate) mod grade_text {
    use super::Grade;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(grade: &Option<Grade>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(grade.map(Grade::as_str).unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Grade>, D::Error> {
        let value = Option::<serde_json::Value>::deserialize(d)?;
        Ok(match value {
            Some(serde_json::Value::String(s)) => Grade::parse(&s),
            _ => None,
        })
    }

    /// Only called when the key is present; an unknown letter is rejected.
    pub fn edit<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Option<Grade>>, D::Error> {
        let value = Option::<serde_json::Value>::deserialize(d)?;
        match value {
            None => Ok(Some(None)),
            Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(Some(None)),
            Some(serde_json::Value::String(s)) => Grade::parse(&s)
                .map(|g| Some(Some(g)))
                .ok_or_else(|| serde::de::Error::custom(format!("unknown grade {s:?}"))),
            Some(other) => Err(serde::de::Error::custom(format!("expected a grade letter, got {other}"))),
        }
    }
}

/// Deserializers that never fail on odd upstream shapes.
pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::{NovaGroup, Nutriments};

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        let n = match value {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
            _ => 0.0,
        };
        Ok(if n.is_finite() { n } else { 0.0 })
    }

    pub fn integer(value: Option<Value>) -> Option<i64> {
        match value? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Present-but-null or unparseable values map to `Unknown`.
    pub fn edit_nova<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NovaGroup>, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        Ok(Some(integer(value).map(NovaGroup::from_number).unwrap_or_default()))
    }

    pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i32>, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        Ok(integer(value).and_then(|n| i32::try_from(n).ok()))
    }

    /// Accepts a JSON array of strings or a comma-separated string.
    pub fn list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        Ok(match value {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .filter(|s| !s.is_empty())
                .collect(),
            Some(Value::String(s)) => split_list(&s),
            _ => Vec::new(),
        })
    }

    pub fn nutriments<'de, D: Deserializer<'de>>(d: D) -> Result<Nutriments, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        Ok(match value {
            Some(v @ Value::Object(_)) => serde_json::from_value(v).unwrap_or_default(),
            _ => Nutriments::default(),
        })
    }

    pub fn split_list(s: &str) -> Vec<String> {
        s.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }
}
