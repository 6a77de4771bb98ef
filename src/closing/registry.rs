//! Closing registry
//!
//! Persists closed periods and answers "is this day closed?". The registry is
//! queried on every gated write; nothing here caches closed state, so several
//! server processes sharing one database always agree.

use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use std::collections::BTreeSet;
use tracing::{info, warn};

use super::period::{ClosedMonth, ClosingPeriod, NewClosingPeriod, PeriodStatus};
use crate::db::schemas::{day_to_bson, ClosingPeriodDoc, CLOSING_PERIOD_COLLECTION};
use crate::db::{parse_object_id, MongoClient, MongoCollection};
use crate::types::{Result, SawitError};

/// Storage seam for closing periods
#[async_trait]
pub trait ClosingRegistry: Send + Sync {
    /// Persist a validated period with `status=active`
    async fn insert(&self, period: NewClosingPeriod) -> Result<ClosingPeriod>;

    /// All periods, newest (year, month) first
    async fn list(&self) -> Result<Vec<ClosingPeriod>>;

    /// Hard delete a period by id
    async fn delete(&self, id: &str) -> Result<ClosingPeriod>;

    /// First active period whose range contains `day`
    async fn find_covering(&self, day: NaiveDate) -> Result<Option<ClosingPeriod>>;

    /// Close a period.
    ///
    /// Duplicate active periods for the same month are stored anyway and only
    /// reported in the log.
    async fn create_closing_period(&self, period: NewClosingPeriod) -> Result<ClosingPeriod> {
        let existing = self
            .list()
            .await?
            .into_iter()
            .filter(|p| p.status == PeriodStatus::Active && p.year == period.year && p.month == period.month)
            .count();
        if existing > 0 {
            warn!(
                year = period.year,
                month = period.month,
                existing,
                "Closing a month that already has an active closing period"
            );
        }

        let created = self.insert(period).await?;
        info!(
            id = %created.id,
            year = created.year,
            month = created.month,
            start = %created.start_date,
            end = %created.end_date,
            closed_by = created.closed_by.as_deref().unwrap_or("-"),
            "Period closed"
        );
        Ok(created)
    }

    /// Closed (year, month) pairs from active periods, deduplicated and ascending
    async fn list_closed_months(&self) -> Result<Vec<ClosedMonth>> {
        let months: BTreeSet<ClosedMonth> = self
            .list()
            .await?
            .into_iter()
            .filter(|p| p.status == PeriodStatus::Active)
            .map(|p| ClosedMonth {
                year: p.year,
                month: p.month,
            })
            .collect();
        Ok(months.into_iter().collect())
    }

    /// Reopen a period by deleting it
    async fn reopen_period(&self, id: &str) -> Result<ClosingPeriod> {
        let removed = self.delete(id).await?;
        info!(
            id = %removed.id,
            year = removed.year,
            month = removed.month,
            "Period reopened"
        );
        Ok(removed)
    }

    async fn is_date_closed(&self, day: NaiveDate) -> Result<bool> {
        Ok(self.find_covering(day).await?.is_some())
    }
}

fn sort_newest_first(periods: &mut [ClosingPeriod]) {
    periods.sort_by(|a, b| {
        (b.year, b.month, b.start_date).cmp(&(a.year, a.month, a.start_date))
    });
}

// =============================================================================
// MongoDB implementation
// =============================================================================

/// MongoDB-backed closing registry
pub struct MongoClosingRegistry {
    collection: MongoCollection<ClosingPeriodDoc>,
}

impl MongoClosingRegistry {
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        let collection = mongo
            .collection::<ClosingPeriodDoc>(CLOSING_PERIOD_COLLECTION)
            .await?;
        Ok(Self { collection })
    }
}

#[async_trait]
impl ClosingRegistry for MongoClosingRegistry {
    async fn insert(&self, period: NewClosingPeriod) -> Result<ClosingPeriod> {
        let mut document = ClosingPeriodDoc::from_new(&period);
        let id = self.collection.insert_one(document.clone()).await?;
        document._id = Some(id);
        Ok(document.into_period())
    }

    async fn list(&self) -> Result<Vec<ClosingPeriod>> {
        let docs = self
            .collection
            .find_many(doc! {}, doc! { "year": -1, "month": -1, "start_date": -1 }, None)
            .await?;
        Ok(docs.into_iter().map(ClosingPeriodDoc::into_period).collect())
    }

    async fn delete(&self, id: &str) -> Result<ClosingPeriod> {
        let oid = parse_object_id(id)?;
        self.collection
            .find_one_and_delete(doc! { "_id": oid })
            .await?
            .map(ClosingPeriodDoc::into_period)
            .ok_or_else(|| SawitError::not_found("Closing period not found"))
    }

    async fn find_covering(&self, day: NaiveDate) -> Result<Option<ClosingPeriod>> {
        let at = day_to_bson(day);
        let filter = doc! {
            "status": "active",
            "start_date": { "$lte": at },
            "end_date": { "$gte": at },
        };
        let found = self
            .collection
            .find_many(filter, doc! { "start_date": 1 }, Some(1))
            .await?;
        Ok(found.into_iter().next().map(ClosingPeriodDoc::into_period))
    }
}

// =============================================================================
// In-memory implementation
// =============================================================================

/// In-memory closing registry for dev mode and tests
#[derive(Default)]
pub struct MemoryClosingRegistry {
    periods: DashMap<String, ClosingPeriod>,
}

impl MemoryClosingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}

#[async_trait]
impl ClosingRegistry for MemoryClosingRegistry {
    async fn insert(&self, period: NewClosingPeriod) -> Result<ClosingPeriod> {
        let created = ClosingPeriod {
            id: ObjectId::new().to_hex(),
            start_date: period.start_date,
            end_date: period.end_date,
            month: period.month,
            year: period.year,
            status: PeriodStatus::Active,
            closed_by: period.closed_by,
            closed_at: Utc::now(),
            notes: period.notes,
        };
        self.periods.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn list(&self) -> Result<Vec<ClosingPeriod>> {
        let mut periods: Vec<ClosingPeriod> =
            self.periods.iter().map(|entry| entry.value().clone()).collect();
        sort_newest_first(&mut periods);
        Ok(periods)
    }

    async fn delete(&self, id: &str) -> Result<ClosingPeriod> {
        parse_object_id(id)?;
        self.periods
            .remove(id)
            .map(|(_, period)| period)
            .ok_or_else(|| SawitError::not_found("Closing period not found"))
    }

    async fn find_covering(&self, day: NaiveDate) -> Result<Option<ClosingPeriod>> {
        Ok(self
            .periods
            .iter()
            .filter(|entry| entry.value().blocks(day))
            .map(|entry| entry.value().clone())
            .min_by_key(|p| p.start_date))
    }
}
