use std::future::Future;

use anyhow::{Context, Result, anyhow, bail};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::config::ModelSettings;

const BODY_PREVIEW_CHARS: usize = 500;

/// Prediction as emitted by the model, in the model's own label vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPrediction {
    pub label: String,
    pub score: f64,
}

/// Text classification capability backing the sentiment adapter.
pub trait SentimentModel: Send + Sync {
    fn infer(&self, text: &str) -> impl Future<Output = Result<RawPrediction>> + Send;
}

/// Client for a hosted text-classification endpoint speaking the
/// Hugging Face inference protocol.
#[derive(Clone)]
pub struct InferenceClient {
    http: Client,
    endpoint: Option<String>,
    token: Option<String>,
}

impl InferenceClient {
    pub fn new(settings: &ModelSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("failed to build HTTP client for sentiment model")?;

        Ok(Self {
            http,
            endpoint: settings.endpoint.clone(),
            token: settings.token.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }
}

impl SentimentModel for InferenceClient {
    async fn infer(&self, text: &str) -> Result<RawPrediction> {
        let Some(endpoint) = self.endpoint.as_deref() else {
            bail!("SENTIMENT_MODEL_URL is not configured but required for classification");
        };

        let mut request = self
            .http
            .post(endpoint)
            .json(&serde_json::json!({ "inputs": text }));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .context("failed to reach sentiment model endpoint")?;
        let status = response.status();
        let response_text = response
            .text()
            .await
            .context("failed to read sentiment model response body")?;
        let body: Value = serde_json::from_str(&response_text).with_context(|| {
            format!(
                "failed to parse sentiment model response as JSON. Response body: {}",
                preview(&response_text)
            )
        })?;
        if !status.is_success() {
            bail!("sentiment model call failed with status {}: {}", status, body);
        }

        extract_prediction(body)
    }
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferencePayload {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
    Failure { error: String },
}

/// Pick the top-scoring label out of any of the payload shapes the
/// inference API returns.
fn extract_prediction(body: Value) -> Result<RawPrediction> {
    let payload: InferencePayload = serde_json::from_value(body.clone())
        .map_err(|_| anyhow!("unexpected sentiment model payload: {}", body))?;

    let candidates = match payload {
        InferencePayload::Nested(rows) => rows.into_iter().flatten().collect::<Vec<_>>(),
        InferencePayload::Flat(items) => items,
        InferencePayload::Failure { error } => bail!("sentiment model reported an error: {error}"),
    };

    let best = candidates
        .into_iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .ok_or_else(|| anyhow!("sentiment model returned no predictions"))?;

    Ok(RawPrediction {
        label: best.label,
        score: best.score,
    })
}

fn preview(body: &str) -> String {
    if body.chars().count() > BODY_PREVIEW_CHARS {
        let head: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        body.to_string()
    }
}
