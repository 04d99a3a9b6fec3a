//! On-demand explanatory text for nutrients and additives, produced by an
//! external text-completion endpoint and parsed into fixed sections.

mod client;
pub mod handlers;
pub mod sections;

use async_trait::async_trait;
use axum::Router;

use crate::state::AppState;

pub use client::CompletionClient;

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("text completion is not configured")]
    NotConfigured,
    #[error("completion endpoint returned no text")]
    EmptyResponse,
    #[error("completion endpoint returned status {0}")]
    Upstream(u16),
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

pub fn router() -> Router<AppState> {
    handlers::routes()
}
