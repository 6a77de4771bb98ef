//! Record stores
//!
//! Gated records are schemaless JSON objects. The store only persists and
//! fetches them; validation and closing checks happen in
//! [`super::service::RecordService`].

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, Document};
use chrono::NaiveDate;
use dashmap::DashMap;
use futures::stream::TryStreamExt;
use mongodb::Collection;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::info;

use super::kind::RecordKind;
use crate::db::{parse_object_id, MongoClient};
use crate::types::{format_day, parse_day, Result, SawitError};

/// A stored record: a JSON object carrying an `id`
pub type Record = Map<String, Value>;

/// Inclusive day range used to filter listings and recaps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RangeQuery {
    start_date: Option<String>,
    end_date: Option<String>,
}

impl DateRange {
    /// Parse `startDate` / `endDate` from a query string
    pub fn from_query(query: Option<&str>) -> Result<Self> {
        let parsed: RangeQuery = match query {
            Some(q) => serde_urlencoded::from_str(q)
                .map_err(|e| SawitError::validation(format!("Invalid query: {}", e)))?,
            None => RangeQuery::default(),
        };

        let bound = |name: &str, raw: Option<String>| -> Result<Option<NaiveDate>> {
            match raw.filter(|r| !r.is_empty()) {
                Some(r) => parse_day(&r)
                    .map(Some)
                    .ok_or_else(|| SawitError::validation(format!("Invalid date for '{}': {}", name, r))),
                None => Ok(None),
            }
        };

        let range = Self {
            start: bound("startDate", parsed.start_date)?,
            end: bound("endDate", parsed.end_date)?,
        };
        if let (Some(start), Some(end)) = (range.start, range.end) {
            if start > end {
                return Err(SawitError::validation("startDate must not be after endDate"));
            }
        }
        Ok(range)
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start.map_or(true, |s| s <= day) && self.end.map_or(true, |e| day <= e)
    }
}

/// Read a record's governing day
pub fn record_day(kind: RecordKind, record: &Record) -> Option<NaiveDate> {
    record
        .get(kind.date_field())
        .and_then(Value::as_str)
        .and_then(parse_day)
}

/// Storage seam for gated records
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert and return the record with its new `id`
    async fn insert(&self, kind: RecordKind, record: Record) -> Result<Record>;

    async fn get(&self, kind: RecordKind, id: &str) -> Result<Option<Record>>;

    /// Records within `range`, newest date first
    async fn list(&self, kind: RecordKind, range: DateRange) -> Result<Vec<Record>>;

    /// Replace an existing record wholesale
    async fn replace(&self, kind: RecordKind, id: &str, record: Record) -> Result<Record>;

    /// Hard delete; false if nothing matched
    async fn delete(&self, kind: RecordKind, id: &str) -> Result<bool>;

    /// Backend reachability for readiness probes
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// MongoDB implementation
// =============================================================================

/// MongoDB-backed store with one collection per kind
pub struct MongoRecordStore {
    mongo: MongoClient,
    collections: HashMap<RecordKind, Collection<Document>>,
}

impl MongoRecordStore {
    pub async fn new(mongo: MongoClient) -> Result<Self> {
        let mut collections = HashMap::new();
        for kind in RecordKind::ALL {
            let collection = mongo.documents(kind.collection(), kind.indexes()).await?;
            collections.insert(kind, collection);
        }
        info!("Record collections ready ({} kinds)", collections.len());
        Ok(Self { mongo, collections })
    }

    fn collection(&self, kind: RecordKind) -> Result<&Collection<Document>> {
        self.collections
            .get(&kind)
            .ok_or_else(|| SawitError::Internal(format!("No collection for {}", kind)))
    }
}

fn to_document(mut record: Record) -> Result<Document> {
    record.remove("id");
    record.remove("_id");
    Ok(bson::to_document(&record)?)
}

fn from_document(mut document: Document) -> Record {
    let id = match document.remove("_id") {
        Some(Bson::ObjectId(oid)) => Some(oid.to_hex()),
        Some(other) => Some(other.to_string()),
        None => None,
    };

    let mut record = match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    if let Some(id) = id {
        record.insert("id".into(), Value::String(id));
    }
    record
}

fn range_filter(kind: RecordKind, range: DateRange) -> Document {
    let mut bounds = Document::new();
    if let Some(start) = range.start {
        bounds.insert("$gte", format_day(start));
    }
    if let Some(end) = range.end {
        bounds.insert("$lte", format_day(end));
    }
    if bounds.is_empty() {
        doc! {}
    } else {
        doc! { kind.date_field(): bounds }
    }
}

#[async_trait]
impl RecordStore for MongoRecordStore {
    async fn insert(&self, kind: RecordKind, record: Record) -> Result<Record> {
        let document = to_document(record)?;
        let result = self.collection(kind)?.insert_one(document.clone()).await?;
        let id = result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| SawitError::Database("Failed to get inserted ID".into()))?;

        let mut stored = document;
        stored.insert("_id", id);
        Ok(from_document(stored))
    }

    async fn get(&self, kind: RecordKind, id: &str) -> Result<Option<Record>> {
        let oid = parse_object_id(id)?;
        let found = self.collection(kind)?.find_one(doc! { "_id": oid }).await?;
        Ok(found.map(from_document))
    }

    async fn list(&self, kind: RecordKind, range: DateRange) -> Result<Vec<Record>> {
        let cursor = self
            .collection(kind)?
            .find(range_filter(kind, range))
            .sort(doc! { kind.date_field(): -1, "_id": -1 })
            .await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents.into_iter().map(from_document).collect())
    }

    async fn replace(&self, kind: RecordKind, id: &str, record: Record) -> Result<Record> {
        let oid = parse_object_id(id)?;
        let document = to_document(record)?;
        let result = self
            .collection(kind)?
            .replace_one(doc! { "_id": oid }, document.clone())
            .await?;
        if result.matched_count == 0 {
            return Err(SawitError::not_found(format!("{} not found", kind.label())));
        }

        let mut stored = document;
        stored.insert("_id", oid);
        Ok(from_document(stored))
    }

    async fn delete(&self, kind: RecordKind, id: &str) -> Result<bool> {
        let oid = parse_object_id(id)?;
        let result = self.collection(kind)?.delete_one(doc! { "_id": oid }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn ping(&self) -> Result<()> {
        self.mongo.ping().await
    }
}

// =============================================================================
// In-memory implementation
// =============================================================================

/// In-memory record store for dev mode and tests
#[derive(Default)]
pub struct MemoryRecordStore {
    records: DashMap<(RecordKind, String), Record>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, kind: RecordKind) -> usize {
        self.records.iter().filter(|e| e.key().0 == kind).count()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert(&self, kind: RecordKind, mut record: Record) -> Result<Record> {
        let id = ObjectId::new().to_hex();
        record.insert("id".into(), Value::String(id.clone()));
        self.records.insert((kind, id), record.clone());
        Ok(record)
    }

    async fn get(&self, kind: RecordKind, id: &str) -> Result<Option<Record>> {
        parse_object_id(id)?;
        Ok(self.records.get(&(kind, id.to_string())).map(|r| r.value().clone()))
    }

    async fn list(&self, kind: RecordKind, range: DateRange) -> Result<Vec<Record>> {
        let mut found: Vec<(Option<NaiveDate>, String, Record)> = self
            .records
            .iter()
            .filter(|e| e.key().0 == kind)
            .filter_map(|e| {
                let day = record_day(kind, e.value());
                let in_range = match day {
                    Some(d) => range.contains(d),
                    None => range == DateRange::default(),
                };
                in_range.then(|| (day, e.key().1.clone(), e.value().clone()))
            })
            .collect();

        // ObjectId hex sorts by creation time, so ties fall back to newest insert
        found.sort_by(|a, b| (b.0, &b.1).cmp(&(a.0, &a.1)));
        Ok(found.into_iter().map(|(_, _, r)| r).collect())
    }

    async fn replace(&self, kind: RecordKind, id: &str, mut record: Record) -> Result<Record> {
        parse_object_id(id)?;
        let key = (kind, id.to_string());
        match self.records.get_mut(&key) {
            Some(mut slot) => {
                record.insert("id".into(), Value::String(id.to_string()));
                *slot = record.clone();
                Ok(record)
            }
            None => Err(SawitError::not_found(format!("{} not found", kind.label()))),
        }
    }

    async fn delete(&self, kind: RecordKind, id: &str) -> Result<bool> {
        parse_object_id(id)?;
        Ok(self.records.remove(&(kind, id.to_string())).is_some())
    }
}
