use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    history::HistoryStore,
    sentiment::{InferenceClient, SentimentClassifier},
    service::SentimentService,
};

#[derive(Clone)]
pub struct AppState {
    service: Arc<SentimentService<InferenceClient>>,
    page_size: u32,
}

impl AppState {
    pub async fn new(config: &AppConfig) -> Result<Self> {
        let model = InferenceClient::new(&config.model)
            .context("failed to initialize sentiment model client")?;
        if !model.is_configured() {
            warn!("SENTIMENT_MODEL_URL is not set; classification requests will fail");
        }

        let history = HistoryStore::open(&config.database_path)
            .await
            .with_context(|| {
                format!(
                    "failed to open history database at {}",
                    config.database_path.display()
                )
            })?;
        info!(path = %config.database_path.display(), "history store ready");

        Ok(Self {
            service: Arc::new(SentimentService::new(
                SentimentClassifier::new(model),
                history,
            )),
            page_size: config.page_size,
        })
    }

    pub fn service(&self) -> &SentimentService<InferenceClient> {
        &self.service
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }
}
