use std::net::SocketAddr;

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_OFF_BASE_URL: &str = "https://world.openfoodfacts.org";
pub const DEFAULT_COMPLETION_API_URL: &str = "https://api.cerebras.ai/v1/completions";
pub const DEFAULT_COMPLETION_MODEL: &str = "llama3.3-70b";

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    pub api_url: String,
    /// Explainer routes answer 503 without a key.
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// `None` keeps products in memory.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub off_base_url: String,
    pub off_user_agent: String,
    pub completion: CompletionConfig,
    pub fallback_environment: bool,
    pub recent_limit: i64,
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(key: &str) -> bool {
    env_opt(key)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let port = match env_opt("APP_PORT") {
            Some(p) => p.parse::<u16>().with_context(|| format!("invalid APP_PORT {p:?}"))?,
            None => 8080,
        };
        let completion = CompletionConfig {
            api_url: env_opt("COMPLETION_API_URL")
                .unwrap_or_else(|| DEFAULT_COMPLETION_API_URL.into()),
            api_key: env_opt("COMPLETION_API_KEY"),
            model: env_opt("COMPLETION_MODEL").unwrap_or_else(|| DEFAULT_COMPLETION_MODEL.into()),
        };
        Ok(Self {
            database_url: env_opt("DATABASE_URL"),
            host: env_opt("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            off_base_url: env_opt("OFF_BASE_URL").unwrap_or_else(|| DEFAULT_OFF_BASE_URL.into()),
            off_user_agent: env_opt("OFF_USER_AGENT")
                .unwrap_or_else(|| format!("foodscan/{}", env!("CARGO_PKG_VERSION"))),
            completion,
            fallback_environment: env_flag("FALLBACK_ENVIRONMENT"),
            recent_limit: env_opt("RECENT_LIMIT")
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(10),
        })
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            host: "127.0.0.1".into(),
            port: 8080,
            off_base_url: DEFAULT_OFF_BASE_URL.into(),
            off_user_agent: "foodscan-test".into(),
            completion: CompletionConfig {
                api_url: DEFAULT_COMPLETION_API_URL.into(),
                api_key: None,
                model: DEFAULT_COMPLETION_MODEL.into(),
            },
            fallback_environment: false,
            recent_limit: 10,
        }
    }
}
