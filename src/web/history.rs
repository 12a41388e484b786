use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;

use crate::{
    history::{HistoryEntry, HistoryFilter},
    sentiment::Sentiment,
    service::{HistoryPage, SentimentBreakdown},
    web::{ApiMessage, AppState, json_error},
};

const PREVIEW_CHARS: usize = 30;

#[derive(Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    q: Option<String>,
    #[serde(default)]
    sentiment: Option<String>,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    page_size: Option<u32>,
}

#[derive(serde::Serialize)]
pub(crate) struct HistoryItem {
    id: i64,
    text: String,
    preview: String,
    sentiment: Sentiment,
    sentiment_label: &'static str,
    icon: &'static str,
    confidence: f64,
    timestamp: String,
}

impl From<HistoryEntry> for HistoryItem {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            id: entry.id,
            preview: preview(&entry.text),
            text: entry.text,
            sentiment: entry.sentiment,
            sentiment_label: entry.sentiment.label_vi(),
            icon: entry.sentiment.icon(),
            confidence: entry.confidence,
            timestamp: entry.timestamp.to_rfc3339(),
        }
    }
}

#[derive(serde::Serialize)]
pub(crate) struct HistoryResponse {
    records: Vec<HistoryItem>,
    page: u32,
    page_size: u32,
    total_pages: u32,
    filtered_records: u64,
    total_records: u64,
    breakdown: SentimentBreakdown,
    generated_at: String,
}

impl From<HistoryPage> for HistoryResponse {
    fn from(page: HistoryPage) -> Self {
        Self {
            records: page.entries.into_iter().map(HistoryItem::from).collect(),
            page: page.page,
            page_size: page.page_size,
            total_pages: page.total_pages,
            filtered_records: page.filtered_records,
            total_records: page.total_records,
            breakdown: page.breakdown,
            generated_at: Utc::now().to_rfc3339(),
        }
    }
}

pub async fn list_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, (StatusCode, Json<ApiMessage>)> {
    let sentiment = match query.sentiment.as_deref() {
        Some(raw) => Sentiment::parse_filter(raw).map_err(|err| {
            json_error(
                StatusCode::BAD_REQUEST,
                format!("Bộ lọc cảm xúc không hợp lệ: {}", err.0),
            )
        })?,
        None => None,
    };

    let filter = HistoryFilter::new(query.q.as_deref(), sentiment);
    let page = state
        .service()
        .history_page(
            &filter,
            query.page.unwrap_or(1),
            query.page_size.unwrap_or(state.page_size()),
        )
        .await;

    Ok(Json(HistoryResponse::from(page)))
}

/// Shorten long texts for table display.
fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS - 3).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}
