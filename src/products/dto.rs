use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::ProductRecord;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub barcode: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    /// Id of the record the client is currently showing.
    pub current: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    /// Record to show instead, when the deleted one was current.
    pub next: Option<ProductRecord>,
}

pub const MAX_LIST_LIMIT: i64 = 100;
