use std::sync::Arc;

use sqlx::SqlitePool;

use crate::ai::{gemini::GeminiClient, GenerativeModel};
use crate::config::AppConfig;
use crate::db;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    /// `None` when no provider credential is configured.
    pub model: Option<Arc<dyn GenerativeModel>>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let db = db::connect(&config.database_url).await?;

        let model = GeminiClient::from_config(&config.ai)?
            .map(|client| Arc::new(client) as Arc<dyn GenerativeModel>);
        if model.is_none() {
            tracing::warn!("GEMINI_API_KEY not set; analysis endpoints will fail with NotConfigured");
        }

        Ok(Self::from_parts(db, Arc::new(config), model))
    }

    pub fn from_parts(
        db: SqlitePool,
        config: Arc<AppConfig>,
        model: Option<Arc<dyn GenerativeModel>>,
    ) -> Self {
        Self { db, config, model }
    }

    pub fn model(&self) -> Option<&dyn GenerativeModel> {
        self.model.as_deref()
    }
}
