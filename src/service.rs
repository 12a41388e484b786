use serde::Serialize;
use tracing::{info, warn};

use crate::{
    config::MAX_PAGE_SIZE,
    history::{HistoryEntry, HistoryFilter, HistoryStore},
    preprocessing::TextNormalizer,
    sentiment::{
        ClassificationError, ClassificationRecord, Sentiment, SentimentClassifier, SentimentModel,
    },
    validation::{ValidationError, validate},
};

/// Terminal failures of one submission, reported back to the user.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Classification(#[from] ClassificationError),
}

/// Classification result plus the history id, when recording succeeded.
#[derive(Debug, Clone)]
pub struct Submission {
    pub id: Option<i64>,
    pub record: ClassificationRecord,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentBreakdown {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

impl SentimentBreakdown {
    fn tally(entries: &[HistoryEntry]) -> Self {
        entries.iter().fold(Self::default(), |mut acc, entry| {
            match entry.sentiment {
                Sentiment::Positive => acc.positive += 1,
                Sentiment::Neutral => acc.neutral += 1,
                Sentiment::Negative => acc.negative += 1,
            }
            acc
        })
    }
}

#[derive(Debug, Clone)]
pub struct HistoryPage {
    pub entries: Vec<HistoryEntry>,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub filtered_records: u64,
    pub total_records: u64,
    pub breakdown: SentimentBreakdown,
}

pub struct SentimentService<M> {
    normalizer: TextNormalizer,
    classifier: SentimentClassifier<M>,
    history: HistoryStore,
}

impl<M: SentimentModel> SentimentService<M> {
    pub fn new(classifier: SentimentClassifier<M>, history: HistoryStore) -> Self {
        Self {
            normalizer: TextNormalizer::new(),
            classifier,
            history,
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Validate, normalize, classify, then record. A failed history write is
    /// logged and the classification is still returned.
    pub async fn submit(&self, raw: &str) -> Result<Submission, SubmissionError> {
        validate(raw)?;

        let normalized = self.normalizer.normalize(raw);
        let record = self.classifier.classify(&normalized).await?;

        let id = match self.history.append(&record).await {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(?err, "failed to record classification history");
                None
            }
        };
        info!(
            ?id,
            sentiment = record.sentiment.as_str(),
            confidence = record.confidence,
            "classified submission"
        );

        Ok(Submission { id, record })
    }

    /// One page of history. `page` is 1-based and clamped to the last page.
    pub async fn history_page(
        &self,
        filter: &HistoryFilter,
        page: u32,
        page_size: u32,
    ) -> HistoryPage {
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let filtered_records = self.history.count(filter).await;
        let total_records = if filter.is_empty() {
            filtered_records
        } else {
            self.history.total_count().await
        };

        let total_pages = total_pages(filtered_records, page_size);
        let page = page.clamp(1, total_pages.max(1));
        let entries = if total_pages == 0 {
            Vec::new()
        } else {
            let offset = (page - 1).saturating_mul(page_size);
            self.history.query(filter, page_size, offset).await
        };

        HistoryPage {
            breakdown: SentimentBreakdown::tally(&entries),
            entries,
            page,
            page_size,
            total_pages,
            filtered_records,
            total_records,
        }
    }
}

pub fn total_pages(count: u64, page_size: u32) -> u32 {
    let pages = count.div_ceil(u64::from(page_size.max(1)));
    u32::try_from(pages).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use tempfile::{TempDir, tempdir};

    use super::*;
    use crate::sentiment::tests::MockModel;

    async fn service_with(model: MockModel) -> (TempDir, SentimentService<MockModel>) {
        let dir = tempdir().expect("temp dir");
        let history = HistoryStore::open(&dir.path().join("sentiments.db"))
            .await
            .expect("open store");
        (dir, SentimentService::new(SentimentClassifier::new(model), history))
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(5, 0), 5);
    }

    #[tokio::test]
    async fn submission_is_normalized_classified_and_recorded() {
        let (_dir, service) = service_with(MockModel::returning("POS", 0.93)).await;

        let submission = service.submit("  sp nay   tot qua ").await.expect("submission");
        assert_eq!(submission.record.text, "sản phẩm nay tốt qua");
        assert_eq!(submission.record.sentiment, Sentiment::Positive);
        assert!(submission.id.is_some());

        let stored = service.history().query(&HistoryFilter::default(), 10, 0).await;
        assert_eq!(stored.len(), 1);
        assert_eq!(Some(stored[0].id), submission.id);
        assert_eq!(stored[0].text, "sản phẩm nay tốt qua");
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_classification() {
        let (_dir, service) = service_with(MockModel::failing()).await;

        let err = service.submit("abc").await.unwrap_err();
        assert!(matches!(err, SubmissionError::Validation(ValidationError::TooShort)));
        assert_eq!(err.to_string(), "Câu quá ngắn (tối thiểu 5 ký tự)");
        assert_eq!(service.history().total_count().await, 0);
    }

    #[tokio::test]
    async fn failed_classification_is_not_recorded() {
        let (_dir, service) = service_with(MockModel::failing()).await;

        let err = service.submit("hàng về chậm quá").await.unwrap_err();
        assert!(matches!(err, SubmissionError::Classification(_)));
        assert_eq!(service.history().total_count().await, 0);
    }

    #[tokio::test]
    async fn history_page_reports_counts_and_clamps_page() {
        let (_dir, service) = service_with(MockModel::returning("NEG", 0.7)).await;
        for idx in 0..12 {
            service
                .submit(&format!("ship cham lan {idx}"))
                .await
                .expect("submission");
        }

        let filter = HistoryFilter::default();
        let last = service.history_page(&filter, 3, 5).await;
        assert_eq!(last.total_pages, 3);
        assert_eq!(last.entries.len(), 2);
        assert_eq!(last.filtered_records, 12);
        assert_eq!(last.total_records, 12);
        assert_eq!(last.breakdown.negative, 2);

        let beyond = service.history_page(&filter, 40, 5).await;
        assert_eq!(beyond.page, 3);
        assert_eq!(beyond.entries, last.entries);

        let filtered = service
            .history_page(&HistoryFilter::new(Some("LAN 1"), None), 1, 5)
            .await;
        // "lan 1", "lan 10", "lan 11"
        assert_eq!(filtered.filtered_records, 3);
        assert_eq!(filtered.total_records, 12);
        assert_eq!(filtered.total_pages, 1);
    }

    #[tokio::test]
    async fn empty_history_has_no_pages() {
        let (_dir, service) = service_with(MockModel::returning("POS", 0.9)).await;
        let page = service.history_page(&HistoryFilter::default(), 0, 10).await;

        assert_eq!(page.total_pages, 0);
        assert_eq!(page.page, 1);
        assert!(page.entries.is_empty());
        assert_eq!(page.breakdown, SentimentBreakdown::default());
    }
}
