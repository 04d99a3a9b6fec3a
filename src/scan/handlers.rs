use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use tracing::{info, instrument};

use super::resolve_barcode;
use crate::capture::SymbolFormat;
use crate::error::AppError;
use crate::products::model::ProductRecord;
use crate::state::AppState;

/// Text decoded on the client, as the capture loop would report it.
#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub barcode: String,
    #[serde(default)]
    pub format: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/scan", post(scan))
}

#[instrument(skip(state))]
pub async fn scan(
    State(state): State<AppState>,
    Json(req): Json<ScanRequest>,
) -> Result<Json<ProductRecord>, AppError> {
    if req.barcode.trim().is_empty() {
        return Err(AppError::BadRequest("barcode is required".into()));
    }
    let format = req.format.as_deref().map(SymbolFormat::from_name);
    info!(?format, "scan submitted");

    let record = resolve_barcode(&state, &req.barcode).await?;
    Ok(Json(record))
}
