use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{DeleteQuery, DeleteResponse, ListQuery, MAX_LIST_LIMIT};
use super::model::{ProductEdit, ProductRecord, RawProduct};
use super::selection::select_fallback;
use super::services::persist_raw;
use crate::error::AppError;
use crate::lookup::validate_barcode;
use crate::state::AppState;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/products", post(create_product))
        .route("/products/:id", patch(update_product).delete(delete_product))
}

/// POST /products: 201 when stored, 200 when the barcode was already known.
#[instrument(skip(state, raw))]
pub async fn create_product(
    State(state): State<AppState>,
    Json(raw): Json<RawProduct>,
) -> Result<Response, AppError> {
    if raw.barcode.trim().is_empty() {
        return Err(AppError::BadRequest("barcode is required".into()));
    }
    validate_barcode(&raw.barcode)?;

    let stored = persist_raw(&state, raw).await?;
    let status = if stored.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(stored.record)).into_response())
}

/// GET /products?barcode= returns one record; without it, the most recent ones.
#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Response, AppError> {
    if let Some(barcode) = q.barcode.as_deref() {
        let record = state
            .store
            .find_by_barcode(barcode.trim())
            .await?
            .ok_or_else(|| AppError::NotFound("Product not found".into()))?;
        return Ok(Json(record).into_response());
    }

    let limit = q
        .limit
        .unwrap_or(state.config.recent_limit)
        .clamp(1, MAX_LIST_LIMIT);
    let records = state.store.recent(limit).await?;
    Ok(Json(records).into_response())
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductRecord>, AppError> {
    let record = state
        .store
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;
    Ok(Json(record))
}

#[instrument(skip(state, edit))]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(edit): Json<ProductEdit>,
) -> Result<Json<ProductRecord>, AppError> {
    let record = state
        .store
        .update(id, edit)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;
    info!(%id, "product updated");
    Ok(Json(record))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(q): Query<DeleteQuery>,
) -> Result<Json<DeleteResponse>, AppError> {
    let recent = state.store.recent(state.config.recent_limit).await?;
    if !state.store.delete(id).await? {
        return Err(AppError::NotFound("Product not found".into()));
    }
    info!(%id, "product deleted");

    let next = if q.current == Some(id) {
        select_fallback(&recent, id).cloned()
    } else {
        None
    };
    Ok(Json(DeleteResponse {
        message: "Product deleted successfully".into(),
        next,
    }))
}

#[cfg(test)]
mod handlers_tests {
    use super::*;
    use crate::products::model::Grade;

    fn raw(barcode: &str) -> Json<RawProduct> {
        Json(RawProduct {
            barcode: barcode.into(),
            name: Some(format!("Product {barcode}")),
            nutriscore_grade: Some(Grade::B),
            ..Default::default()
        })
    }

    async fn create(state: &AppState, barcode: &str) -> StatusCode {
        create_product(State(state.clone()), raw(barcode))
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn create_reports_whether_stored() {
        let state = AppState::fake();
        assert_eq!(create(&state, "100").await, StatusCode::CREATED);
        assert_eq!(create(&state, "100").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn create_without_barcode_is_bad_request() {
        let err = create_product(State(AppState::fake()), raw("")).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn lookup_by_barcode_or_404() {
        let state = AppState::fake();
        create(&state, "200").await;

        let found = list_products(
            State(state.clone()),
            Query(ListQuery {
                barcode: Some("200".into()),
                limit: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(found.status(), StatusCode::OK);

        let missing = list_products(
            State(state),
            Query(ListQuery {
                barcode: Some("201".into()),
                limit: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn get_by_id_or_404() {
        let state = AppState::fake();
        create(&state, "250").await;
        let stored = state.store.find_by_barcode("250").await.unwrap().unwrap();

        let Json(found) = get_product(State(state.clone()), Path(stored.id)).await.unwrap();
        assert_eq!(found.barcode, "250");
        assert_eq!(found.id, stored.id);

        let missing = get_product(State(state), Path(Uuid::new_v4())).await.unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_recomputes_scores() {
        let state = AppState::fake();
        create(&state, "300").await;
        let before = state.store.find_by_barcode("300").await.unwrap().unwrap();
        assert_eq!(before.derived.match_score, 70);

        let Json(after) = update_product(
            State(state.clone()),
            Path(before.id),
            Json(ProductEdit {
                allergens: Some(vec!["en:milk".into()]),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(after.derived.match_score, 40);
        assert_eq!(after.created_at, before.created_at);

        let missing = update_product(State(state), Path(Uuid::new_v4()), Json(ProductEdit::default()))
            .await
            .unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn deleting_current_selects_neighbour() {
        let state = AppState::fake();
        for code in ["1", "2", "3"] {
            create(&state, code).await;
        }
        // recent order is 3, 2, 1
        let middle = state.store.find_by_barcode("2").await.unwrap().unwrap();

        let Json(resp) = delete_product(
            State(state.clone()),
            Path(middle.id),
            Query(DeleteQuery {
                current: Some(middle.id),
            }),
        )
        .await
        .unwrap();
        assert_eq!(resp.next.unwrap().barcode, "1");

        let other = state.store.find_by_barcode("3").await.unwrap().unwrap();
        let Json(resp) = delete_product(
            State(state.clone()),
            Path(other.id),
            Query(DeleteQuery { current: None }),
        )
        .await
        .unwrap();
        assert!(resp.next.is_none());

        let again = delete_product(State(state), Path(other.id), Query(DeleteQuery { current: None }))
            .await
            .unwrap_err();
        assert!(matches!(again, AppError::NotFound(_)));
    }
}
