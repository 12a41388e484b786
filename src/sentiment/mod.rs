mod model;

pub use model::{InferenceClient, RawPrediction, SentimentModel};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::preprocessing::{SEGMENT_JOINER, clean_whitespace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "POSITIVE",
            Sentiment::Neutral => "NEUTRAL",
            Sentiment::Negative => "NEGATIVE",
        }
    }

    pub fn label_vi(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Tích cực",
            Sentiment::Neutral => "Trung tính",
            Sentiment::Negative => "Tiêu cực",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Sentiment::Positive => "😊",
            Sentiment::Neutral => "😐",
            Sentiment::Negative => "😔",
        }
    }

    /// Map the model's raw vocabulary onto the taxonomy.
    pub fn from_model_label(label: &str) -> Option<Self> {
        match label {
            "POS" => Some(Sentiment::Positive),
            "NEU" => Some(Sentiment::Neutral),
            "NEG" => Some(Sentiment::Negative),
            _ => None,
        }
    }

    /// Parse a stored value or a user-facing label.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Sentiment::ALL.into_iter().find(|sentiment| {
            sentiment.as_str().eq_ignore_ascii_case(value) || sentiment.label_vi() == value
        })
    }

    /// Parse an optional history filter; blank, `all` and `Tất cả` select everything.
    pub fn parse_filter(value: &str) -> Result<Option<Self>, UnknownSentiment> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") || trimmed == "Tất cả" {
            return Ok(None);
        }
        Sentiment::parse(trimmed)
            .map(Some)
            .ok_or_else(|| UnknownSentiment(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sentiment: {0}")]
pub struct UnknownSentiment(pub String);

/// Outcome of one successful classification, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationRecord {
    pub text: String,
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("Sentiment classification failed: {message}")]
pub struct ClassificationError {
    message: String,
}

impl ClassificationError {
    fn from_cause(err: anyhow::Error) -> Self {
        Self {
            message: format!("{err:#}"),
        }
    }

    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub struct SentimentClassifier<M> {
    model: M,
}

impl<M: SentimentModel> SentimentClassifier<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    /// Classify already-normalized text and finalize the record for storage.
    ///
    /// The model sees the segmented form; the record keeps a readable copy
    /// with segment joiners turned back into spaces. Unknown model labels
    /// fall back to [`Sentiment::Neutral`].
    pub async fn classify(
        &self,
        normalized: &str,
    ) -> Result<ClassificationRecord, ClassificationError> {
        if normalized.trim().is_empty() {
            return Err(ClassificationError::new("no text to classify"));
        }

        let prediction = self
            .model
            .infer(normalized)
            .await
            .map_err(ClassificationError::from_cause)?;
        let timestamp = Utc::now();

        if !prediction.score.is_finite() {
            return Err(ClassificationError::new(format!(
                "model returned a non-finite score for label {}",
                prediction.label
            )));
        }

        let sentiment = Sentiment::from_model_label(&prediction.label).unwrap_or_else(|| {
            warn!(label = %prediction.label, "unmapped model label, treating as neutral");
            Sentiment::Neutral
        });

        Ok(ClassificationRecord {
            text: display_text(normalized),
            sentiment,
            confidence: prediction.score.clamp(0.0, 1.0),
            timestamp,
        })
    }
}

/// Undo segmentation for display. Falls back to the cleaned input when the
/// text consisted only of joiner characters.
fn display_text(normalized: &str) -> String {
    let readable = clean_whitespace(&normalized.replace(SEGMENT_JOINER, " "));
    if readable.is_empty() {
        clean_whitespace(normalized)
    } else {
        readable
    }
}
