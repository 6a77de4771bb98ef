//! Activity log
//!
//! Append-only trail of successful mutations and closing operations. Entries
//! are written on a detached task: a failed log write is reported through
//! `tracing` and never fails or rolls back the mutation that produced it.

use async_trait::async_trait;
use bson::doc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::db::schemas::{ActivityLogDoc, ACTIVITY_LOG_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::types::Result;

/// What happened
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Create,
    Update,
    Delete,
    ClosePeriod,
    ReopenPeriod,
}

/// One activity log entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub user: Option<String>,
    pub action: ActivityAction,
    pub entity: String,
    pub entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ActivityEntry {
    pub fn new(action: ActivityAction, entity: impl Into<String>) -> Self {
        Self {
            id: None,
            timestamp: Utc::now(),
            user: None,
            action,
            entity: entity.into(),
            entity_id: None,
            details: None,
        }
    }

    pub fn with_user(mut self, user: Option<String>) -> Self {
        self.user = user;
        self
    }

    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Storage seam for the activity log
#[async_trait]
pub trait ActivityLogger: Send + Sync {
    async fn record(&self, entry: ActivityEntry) -> Result<()>;

    /// Most recent entries first
    async fn recent(&self, limit: usize) -> Result<Vec<ActivityEntry>>;
}

/// Write an entry on a detached task
pub fn spawn_activity(logger: Arc<dyn ActivityLogger>, entry: ActivityEntry) -> JoinHandle<()> {
    tokio::spawn(async move {
        let action = entry.action;
        let entity = entry.entity.clone();
        match logger.record(entry).await {
            Ok(()) => debug!(?action, %entity, "Activity recorded"),
            Err(e) => warn!(?action, %entity, error = %e, "Failed to record activity"),
        }
    })
}

// =============================================================================
// MongoDB implementation
// =============================================================================

pub struct MongoActivityLogger {
    collection: MongoCollection<ActivityLogDoc>,
}

impl MongoActivityLogger {
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        let collection = mongo
            .collection::<ActivityLogDoc>(ACTIVITY_LOG_COLLECTION)
            .await?;
        Ok(Self { collection })
    }
}

#[async_trait]
impl ActivityLogger for MongoActivityLogger {
    async fn record(&self, entry: ActivityEntry) -> Result<()> {
        self.collection.insert_one(ActivityLogDoc::from(&entry)).await?;
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ActivityEntry>> {
        let docs = self
            .collection
            .find_many(doc! {}, doc! { "timestamp": -1 }, Some(limit as i64))
            .await?;
        Ok(docs.into_iter().map(ActivityEntry::from).collect())
    }
}

// =============================================================================
// In-memory implementation
// =============================================================================

#[derive(Default)]
pub struct MemoryActivityLogger {
    entries: RwLock<Vec<ActivityEntry>>,
}

impl MemoryActivityLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl ActivityLogger for MemoryActivityLogger {
    async fn record(&self, mut entry: ActivityEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        entry.id = Some(entries.len().to_string());
        entries.push(entry);
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ActivityEntry>> {
        let entries = self.entries.read().await;
        Ok(entries.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spawned_entry_is_recorded() {
        let logger = Arc::new(MemoryActivityLogger::new());
        let entry = ActivityEntry::new(ActivityAction::ClosePeriod, "closing_periods")
            .with_user(Some("manager".into()))
            .with_entity_id("abc");

        spawn_activity(logger.clone(), entry).await.unwrap();

        let recent = logger.recent(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].action, ActivityAction::ClosePeriod);
        assert_eq!(recent[0].entity_id.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_recent_is_newest_first_and_limited() {
        let logger = MemoryActivityLogger::new();
        for i in 0..5 {
            logger
                .record(ActivityEntry::new(ActivityAction::Create, "reports").with_entity_id(i.to_string()))
                .await
                .unwrap();
        }

        let recent = logger.recent(2).await.unwrap();
        let ids: Vec<_> = recent.iter().filter_map(|e| e.entity_id.as_deref()).collect();
        assert_eq!(ids, vec!["4", "3"]);
    }

    #[test]
    fn test_action_serialization() {
        assert_eq!(
            serde_json::to_value(ActivityAction::ReopenPeriod).unwrap(),
            serde_json::json!("reopen_period")
        );
    }
}
