//! Activity log document schema

use bson::{doc, oid::ObjectId, DateTime};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::activity::{ActivityAction, ActivityEntry};
use crate::db::mongo::{IndexSpec, IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for activity logs
pub const ACTIVITY_LOG_COLLECTION: &str = "activity_logs";

/// Activity log document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ActivityLogDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub timestamp: DateTime,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    pub action: ActivityAction,

    /// Entity kind, e.g. "reports" or "closing_periods"
    pub entity: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl From<&ActivityEntry> for ActivityLogDoc {
    fn from(entry: &ActivityEntry) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            timestamp: DateTime::from_chrono(entry.timestamp),
            user: entry.user.clone(),
            action: entry.action,
            entity: entry.entity.clone(),
            entity_id: entry.entity_id.clone(),
            details: entry.details.clone(),
        }
    }
}

impl From<ActivityLogDoc> for ActivityEntry {
    fn from(doc: ActivityLogDoc) -> Self {
        Self {
            id: doc._id.map(|id| id.to_hex()),
            timestamp: doc.timestamp.to_chrono(),
            user: doc.user,
            action: doc.action,
            entity: doc.entity,
            entity_id: doc.entity_id,
            details: doc.details,
        }
    }
}

impl IntoIndexes for ActivityLogDoc {
    fn into_indices() -> Vec<IndexSpec> {
        vec![(
            doc! { "timestamp": -1 },
            Some(
                IndexOptions::builder()
                    .name("timestamp_desc_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for ActivityLogDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
