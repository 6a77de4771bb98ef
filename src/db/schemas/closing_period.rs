//! Closing period document schema
//!
//! Days are stored as BSON dates at UTC midnight so range queries compare
//! whole days.

use bson::{doc, oid::ObjectId, DateTime};
use chrono::{NaiveDate, NaiveTime};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::closing::{ClosingPeriod, NewClosingPeriod, PeriodStatus};
use crate::db::mongo::{IndexSpec, IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for closing periods
pub const CLOSING_PERIOD_COLLECTION: &str = "closing_periods";

/// Closing period document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ClosingPeriodDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub start_date: DateTime,
    pub end_date: DateTime,
    pub month: i32,
    pub year: i32,

    #[serde(default)]
    pub status: PeriodStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_by: Option<String>,

    pub closed_at: DateTime,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Store a calendar day as UTC midnight
pub fn day_to_bson(day: NaiveDate) -> DateTime {
    DateTime::from_chrono(day.and_time(NaiveTime::MIN).and_utc())
}

/// Read a stored UTC-midnight date back as a calendar day
pub fn day_from_bson(dt: DateTime) -> NaiveDate {
    dt.to_chrono().date_naive()
}

impl ClosingPeriodDoc {
    /// Build an active period document from validated input
    pub fn from_new(period: &NewClosingPeriod) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            start_date: day_to_bson(period.start_date),
            end_date: day_to_bson(period.end_date),
            month: period.month as i32,
            year: period.year,
            status: PeriodStatus::Active,
            closed_by: period.closed_by.clone(),
            closed_at: DateTime::now(),
            notes: period.notes.clone(),
        }
    }

    /// Convert to the domain type. Documents without an id never leave the store.
    pub fn into_period(self) -> ClosingPeriod {
        ClosingPeriod {
            id: self._id.map(|id| id.to_hex()).unwrap_or_default(),
            start_date: day_from_bson(self.start_date),
            end_date: day_from_bson(self.end_date),
            month: self.month.clamp(1, 12) as u32,
            year: self.year,
            status: self.status,
            closed_by: self.closed_by,
            closed_at: self.closed_at.to_chrono(),
            notes: self.notes,
        }
    }
}

impl IntoIndexes for ClosingPeriodDoc {
    fn into_indices() -> Vec<IndexSpec> {
        vec![
            // Not unique: duplicate active periods per month are tolerated
            (
                doc! { "year": 1, "month": 1 },
                Some(
                    IndexOptions::builder()
                        .name("year_month_index".to_string())
                        .build(),
                ),
            ),
            // Containment lookups from the mutation gate
            (
                doc! { "status": 1, "start_date": 1, "end_date": 1 },
                Some(
                    IndexOptions::builder()
                        .name("status_range_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ClosingPeriodDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_roundtrip_through_bson() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        let stored = day_to_bson(day);
        assert_eq!(stored.timestamp_millis() % 86_400_000, 0);
        assert_eq!(day_from_bson(stored), day);
    }

    #[test]
    fn test_from_new_is_active() {
        let new = NewClosingPeriod::new(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
            Some(1),
            Some(2025),
            None,
            Some("mandor".into()),
        )
        .unwrap();
        let doc = ClosingPeriodDoc::from_new(&new);
        assert_eq!(doc.status, PeriodStatus::Active);

        let period = doc.into_period();
        assert_eq!(period.start_date, new.start_date);
        assert_eq!(period.end_date, new.end_date);
        assert_eq!(period.closed_by.as_deref(), Some("mandor"));
    }
}
