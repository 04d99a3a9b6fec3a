use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::derive::normalize_additive;

pub const NOT_AVAILABLE: &str = "Information not available";

const AMOUNT_HEADER: &str = "Amount and Significance";
const RISKS_HEADER: &str = "Risks and Alternatives";

lazy_static! {
    static ref RISKS_RE: Regex = Regex::new(r"(?m)^\s*Risks:\s*(.+?)\s*$").unwrap();
    static ref SUPPLEMENTS_RE: Regex =
        Regex::new(r"(?m)^\s*Great supplement foods:\s*(.+?)\s*$").unwrap();
    static ref COMMON_PRODUCTS_RE: Regex =
        Regex::new(r"(?m)^\s*Common products:\s*(.+?)\s*$").unwrap();
    static ref TYPICAL_USAGE_RE: Regex = Regex::new(r"(?m)^\s*Typical usage:\s*(.+?)\s*$").unwrap();
    static ref NATURAL_ALTERNATIVES_RE: Regex =
        Regex::new(r"(?m)^\s*Natural alternatives:\s*(.+?)\s*$").unwrap();
}

/// Risk and alternative text used when the completion leaves a section out.
struct NutrientDefaults {
    risks: &'static str,
    alternatives: &'static str,
}

fn nutrient_defaults(nutrient: &str) -> NutrientDefaults {
    let (risks, alternatives) = match nutrient {
        "Energy" => ("weight gain, metabolic issues", "vegetables, lean proteins, complex carbs"),
        "Proteins" => ("kidney strain, digestive issues", "legumes, quinoa, tofu"),
        "Carbohydrates" => ("blood sugar spikes, weight gain", "whole grains, vegetables, legumes"),
        "Sugars" => ("diabetes, tooth decay, obesity", "fruits, honey, stevia"),
        "Fat" => ("cardiovascular issues, obesity", "avocados, nuts, olive oil"),
        "Saturated Fat" => ("heart disease, cholesterol issues", "fish, nuts, plant oils"),
        "Fiber" => ("digestive issues, dehydration", "whole grains, vegetables, fruits"),
        "Salt" => ("high blood pressure, water retention", "herbs, spices, lemon"),
        _ => ("overconsumption effects, imbalance issues", "balanced whole foods"),
    };
    NutrientDefaults {
        risks,
        alternatives,
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutrientQuery {
    pub nutrient_type: String,
    pub value: f64,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutrientInfo {
    pub amount: String,
    pub risks: String,
    pub alternatives: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditiveQuery {
    pub additive_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdditiveInfo {
    pub code: String,
    pub name: String,
    pub description: String,
    pub common_products: String,
    pub typical_usage: String,
    pub risks: String,
    pub alternatives: String,
}

fn quantity(q: &NutrientQuery) -> String {
    format!("{}{}", q.value, q.unit)
}

pub fn nutrient_prompt(q: &NutrientQuery) -> String {
    let amount = quantity(q);
    let nutrient = &q.nutrient_type;
    format!(
        "Analyze {amount} of {nutrient} per 100g of food and respond in this general format and use proper punctuation:

{AMOUNT_HEADER}
{{Give a brief description of what this nutrient does}}. This amount of {amount} is [low/moderate/high] for 100g of foods

{RISKS_HEADER}
Risks: [2-3 specific health risks with a bit of description related to {nutrient}]
Great supplement foods: [2-3 specific food alternatives with less {nutrient}]

Rules:
- Must follow exact format above
- Must include specific risks and alternatives unique to {nutrient}
- No periods at end of items
- Keep each list to exactly 2-3 items
- Use commas between items
- No extra text or explanations
- No extra newlines"
    )
}

pub fn additive_prompt(code: &str) -> String {
    format!(
        "Provide information about food additive {code} in the following format:

{AMOUNT_HEADER}
{{Brief explanation of what this additive is used for}}. This amount is [low/moderate/high] for processed foods.
Common products: [2-3 specific products]
Typical usage: [brief amount range]

{RISKS_HEADER}
Risks: [2-3 specific health risks with brief description]
Natural alternatives: [2-3 specific natural alternatives]

Rules:
- Must follow exact format above
- Must include specific risks and alternatives unique to {code}
- No periods at end of items
- Keep each list to exactly 2-3 items
- Use commas between items
- No extra text or explanations
- No extra newlines"
    )
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// First non-empty line under the "Amount and Significance" header, unless
/// that line is itself a labelled field or the next header.
fn amount_line(text: &str) -> Option<String> {
    let mut lines = text.lines().map(str::trim);
    lines.find(|l| *l == AMOUNT_HEADER)?;
    lines
        .find(|l| !l.is_empty())
        .filter(|l| *l != RISKS_HEADER && !l.contains(": "))
        .map(str::to_string)
}

pub fn parse_nutrient_info(q: &NutrientQuery, text: &str) -> NutrientInfo {
    let defaults = nutrient_defaults(&q.nutrient_type);
    NutrientInfo {
        amount: amount_line(text).unwrap_or_else(|| {
            format!("This amount of {} is moderate for 100g of foods", quantity(q))
        }),
        risks: capture(&RISKS_RE, text).unwrap_or_else(|| defaults.risks.to_string()),
        alternatives: capture(&SUPPLEMENTS_RE, text)
            .unwrap_or_else(|| defaults.alternatives.to_string()),
    }
}

pub fn parse_additive_info(code: &str, text: &str) -> AdditiveInfo {
    let or_na = |v: Option<String>| v.unwrap_or_else(|| NOT_AVAILABLE.to_string());
    AdditiveInfo {
        code: code.to_string(),
        name: normalize_additive(code),
        description: or_na(amount_line(text)),
        common_products: or_na(capture(&COMMON_PRODUCTS_RE, text)),
        typical_usage: or_na(capture(&TYPICAL_USAGE_RE, text)),
        risks: or_na(capture(&RISKS_RE, text)),
        alternatives: or_na(capture(&NATURAL_ALTERNATIVES_RE, text)),
    }
}
