//! Persistence contract for resolved heals and the feedback given on them.
//!
//! The engine only ever calls `store`; listing and feedback belong to
//! whatever service owns the records. `InMemoryHealingHistory` is a reference
//! implementation for tests and local runs.

use async_trait::async_trait;
use locus_common::LocatorKind;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("No healing record with id {0}")]
    NotFound(u64),

    #[error("Invalid page request: page {page}, page size {page_size}")]
    InvalidPage { page: usize, page_size: usize },

    #[error("History backend error: {0}")]
    Backend(String),
}

/// One resolved heal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealingRecord {
    pub old_selector: String,
    pub new_selector: String,
    pub selector_type: LocatorKind,
    pub confidence: f64,
    #[serde(default)]
    pub url: String,
    pub processing_time_ms: f64,
    pub reranked: bool,
    pub vision_used: bool,
    /// Unix epoch milliseconds.
    pub timestamp_ms: u64,
}

impl HealingRecord {
    pub fn now_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackRating {
    Positive,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub healing_id: u64,
    pub rating: FeedbackRating,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_selector_used: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredHealing {
    pub id: u64,
    #[serde(flatten)]
    pub record: HealingRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPage {
    pub items: Vec<StoredHealing>,
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
    pub has_more: bool,
}

#[async_trait]
pub trait HealingHistory: Send + Sync {
    /// Persist a record and return its id.
    async fn store(&self, record: HealingRecord) -> Result<u64, HistoryError>;

    /// Newest first. `page` is 1-based; `url_filter` matches by substring.
    async fn list(
        &self,
        page: usize,
        page_size: usize,
        url_filter: Option<&str>,
    ) -> Result<HistoryPage, HistoryError>;

    async fn feedback(&self, feedback: Feedback) -> Result<(), HistoryError>;
}

#[derive(Clone, Default)]
pub struct InMemoryHealingHistory {
    records: Arc<Mutex<Vec<StoredHealing>>>,
}

impl InMemoryHealingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<StoredHealing>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl HealingHistory for InMemoryHealingHistory {
    async fn store(&self, record: HealingRecord) -> Result<u64, HistoryError> {
        let mut records = self.lock();
        let id = records.len() as u64 + 1;
        records.push(StoredHealing {
            id,
            record,
            feedback: None,
        });
        Ok(id)
    }

    async fn list(
        &self,
        page: usize,
        page_size: usize,
        url_filter: Option<&str>,
    ) -> Result<HistoryPage, HistoryError> {
        if page == 0 || page_size == 0 {
            return Err(HistoryError::InvalidPage { page, page_size });
        }
        let records = self.lock();
        let matching: Vec<&StoredHealing> = records
            .iter()
            .rev()
            .filter(|s| url_filter.is_none_or(|f| s.record.url.contains(f)))
            .collect();

        let total_count = matching.len();
        let offset = (page - 1) * page_size;
        let items: Vec<StoredHealing> = matching
            .into_iter()
            .skip(offset)
            .take(page_size)
            .cloned()
            .collect();

        Ok(HistoryPage {
            has_more: offset + items.len() < total_count,
            items,
            total_count,
            page,
            page_size,
        })
    }

    async fn feedback(&self, feedback: Feedback) -> Result<(), HistoryError> {
        let mut records = self.lock();
        let stored = records
            .iter_mut()
            .find(|s| s.id == feedback.healing_id)
            .ok_or(HistoryError::NotFound(feedback.healing_id))?;
        stored.feedback = Some(feedback);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str) -> HealingRecord {
        HealingRecord {
            old_selector: "#old".into(),
            new_selector: "#new".into(),
            selector_type: LocatorKind::Css,
            confidence: 0.8,
            url: url.into(),
            processing_time_ms: 1.0,
            reranked: false,
            vision_used: false,
            timestamp_ms: HealingRecord::now_ms(),
        }
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_paginated() {
        let history = InMemoryHealingHistory::new();
        for url in ["https://a.test/1", "https://b.test/2", "https://a.test/3"] {
            history.store(record(url)).await.unwrap();
        }

        let page = history.list(1, 2, None).await.unwrap();
        assert_eq!(page.total_count, 3);
        assert!(page.has_more);
        assert_eq!(page.items[0].record.url, "https://a.test/3");

        let filtered = history.list(1, 10, Some("a.test")).await.unwrap();
        assert_eq!(filtered.total_count, 2);
        assert!(!filtered.has_more);
    }

    #[tokio::test]
    async fn test_feedback_requires_known_record() {
        let history = InMemoryHealingHistory::new();
        let id = history.store(record("")).await.unwrap();

        let feedback = Feedback {
            healing_id: id,
            rating: FeedbackRating::Positive,
            comment: Some("worked".into()),
            actual_selector_used: None,
        };
        history.feedback(feedback).await.unwrap();
        let page = history.list(1, 10, None).await.unwrap();
        assert_eq!(
            page.items[0].feedback.as_ref().map(|f| f.rating),
            Some(FeedbackRating::Positive)
        );

        let missing = Feedback {
            healing_id: 99,
            rating: FeedbackRating::Negative,
            comment: None,
            actual_selector_used: None,
        };
        assert!(matches!(
            history.feedback(missing).await,
            Err(HistoryError::NotFound(99))
        ));
    }
}
