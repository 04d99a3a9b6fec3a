use axum::{extract::State, routing::post, Json, Router};
use tracing::instrument;

use super::sections::{
    additive_prompt, nutrient_prompt, parse_additive_info, parse_nutrient_info, AdditiveInfo,
    AdditiveQuery, NutrientInfo, NutrientQuery,
};
use super::CompletionError;
use crate::derive::additive_code;
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/nutrition-info", post(nutrition_info))
        .route("/additive-info", post(additive_info))
}

#[instrument(skip(state))]
pub async fn nutrition_info(
    State(state): State<AppState>,
    Json(q): Json<NutrientQuery>,
) -> Result<Json<NutrientInfo>, AppError> {
    if q.nutrient_type.trim().is_empty() {
        return Err(AppError::BadRequest("nutrientType is required".into()));
    }
    let completer = state.completer.as_ref().ok_or(CompletionError::NotConfigured)?;
    let text = completer.complete(&nutrient_prompt(&q)).await?;
    Ok(Json(parse_nutrient_info(&q, &text)))
}

#[instrument(skip(state))]
pub async fn additive_info(
    State(state): State<AppState>,
    Json(q): Json<AdditiveQuery>,
) -> Result<Json<AdditiveInfo>, AppError> {
    let code = additive_code(q.additive_code.trim());
    if code.is_empty() {
        return Err(AppError::BadRequest("additiveCode is required".into()));
    }
    let completer = state.completer.as_ref().ok_or(CompletionError::NotConfigured)?;
    let text = completer.complete(&additive_prompt(code)).await?;
    Ok(Json(parse_additive_info(code, &text)))
}
