//! Capture → lookup → derive → persist.

pub mod handlers;
pub mod services;

use axum::Router;

use crate::capture::CaptureError;
use crate::lookup::LookupError;
use crate::state::AppState;

pub use services::{resolve_barcode, scan_and_resolve, ScanSession};

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("storing product failed: {0:#}")]
    Store(anyhow::Error),
}

pub fn router() -> Router<AppState> {
    handlers::routes()
}
