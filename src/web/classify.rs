use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::{
    sentiment::Sentiment,
    service::{Submission, SubmissionError},
    web::{ApiMessage, AppState, json_error},
};

const CLASSIFICATION_FAILED: &str = "Không thể phân loại cảm xúc, vui lòng thử lại sau.";

#[derive(Deserialize)]
pub struct ClassifyRequest {
    text: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ClassifyResponse {
    id: Option<i64>,
    text: String,
    sentiment: Sentiment,
    sentiment_label: &'static str,
    icon: &'static str,
    confidence: f64,
    timestamp: String,
}

impl From<Submission> for ClassifyResponse {
    fn from(submission: Submission) -> Self {
        let record = submission.record;
        Self {
            id: submission.id,
            sentiment_label: record.sentiment.label_vi(),
            icon: record.sentiment.icon(),
            sentiment: record.sentiment,
            confidence: record.confidence,
            timestamp: record.timestamp.to_rfc3339(),
            text: record.text,
        }
    }
}

pub async fn classify_text(
    State(state): State<AppState>,
    Json(request): Json<ClassifyRequest>,
) -> Result<Json<ClassifyResponse>, (StatusCode, Json<ApiMessage>)> {
    let submission = state
        .service()
        .submit(&request.text)
        .await
        .map_err(submission_error)?;

    Ok(Json(ClassifyResponse::from(submission)))
}

fn submission_error(err: SubmissionError) -> (StatusCode, Json<ApiMessage>) {
    match err {
        SubmissionError::Validation(err) => json_error(StatusCode::BAD_REQUEST, err.to_string()),
        SubmissionError::Classification(err) => {
            error!(cause = err.message(), "sentiment classification failed");
            json_error(StatusCode::BAD_GATEWAY, CLASSIFICATION_FAILED)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{sentiment::ClassificationRecord, validation::ValidationError};

    #[test]
    fn validation_errors_are_bad_requests_with_user_message() {
        let (status, Json(body)) = submission_error(ValidationError::TooLong.into());
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.message, "Câu quá dài (tối đa 50 ký tự)");
    }

    #[test]
    fn response_carries_display_metadata() {
        let submission = Submission {
            id: Some(7),
            record: ClassificationRecord {
                text: "rất hài lòng".to_string(),
                sentiment: Sentiment::Positive,
                confidence: 0.97,
                timestamp: Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap(),
            },
        };

        let value = serde_json::to_value(ClassifyResponse::from(submission)).expect("json");
        assert_eq!(value["id"], 7);
        assert_eq!(value["sentiment"], "POSITIVE");
        assert_eq!(value["sentiment_label"], "Tích cực");
        assert_eq!(value["timestamp"], "2026-10-19T09:00:00+00:00");
    }
}
