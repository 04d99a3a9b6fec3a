mod dto;
pub mod handlers;
pub mod model;
mod repo;
mod repo_types;
pub mod selection;
pub mod services;
pub mod store;

use crate::state::AppState;
use axum::Router;

pub use repo::PgProductStore;
pub use store::{MemoryProductStore, ProductStore, Stored};

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes())
}
