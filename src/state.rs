use crate::config::AppConfig;
use crate::explain::{Completer, CompletionClient};
use crate::lookup::{OpenFoodFactsClient, ProductLookup, StaticLookup};
use crate::products::{MemoryProductStore, PgProductStore, ProductStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn ProductStore>,
    pub lookup: Arc<dyn ProductLookup>,
    /// `None` when no completion key is configured.
    pub completer: Option<Arc<dyn Completer>>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = match config.database_url.as_deref() {
            Some(url) => Arc::new(PgProductStore::connect(url).await?) as Arc<dyn ProductStore>,
            None => {
                tracing::warn!("DATABASE_URL not set; products are kept in memory");
                Arc::new(MemoryProductStore::new()) as Arc<dyn ProductStore>
            }
        };

        let lookup = Arc::new(OpenFoodFactsClient::new(
            &config.off_base_url,
            &config.off_user_agent,
        )?) as Arc<dyn ProductLookup>;

        let completer = CompletionClient::from_config(&config.completion)?
            .map(|c| Arc::new(c) as Arc<dyn Completer>);
        if completer.is_none() {
            tracing::warn!("COMPLETION_API_KEY not set; explainer routes will answer 503");
        }

        tracing::info!(
            fallback_environment = config.fallback_environment,
            "application state ready"
        );
        Ok(Self::from_parts(config, store, lookup, completer))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn ProductStore>,
        lookup: Arc<dyn ProductLookup>,
        completer: Option<Arc<dyn Completer>>,
    ) -> Self {
        Self {
            config,
            store,
            lookup,
            completer,
        }
    }

    /// In-memory store, empty lookup table, no completer.
    pub fn fake() -> Self {
        Self::from_parts(
            Arc::new(AppConfig::default()),
            Arc::new(MemoryProductStore::new()),
            Arc::new(StaticLookup::default()),
            None,
        )
    }
}
