//! Closing period domain types

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{parse_day, Result, SawitError};

/// Whether a closing period currently blocks writes
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PeriodStatus {
    #[default]
    Active,
    Inactive,
}

/// A closed accounting period
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClosingPeriod {
    pub id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub month: u32,
    pub year: i32,
    pub status: PeriodStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_by: Option<String>,
    pub closed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ClosingPeriod {
    /// True if this period is active and `day` lies in `[start_date, end_date]`
    pub fn blocks(&self, day: NaiveDate) -> bool {
        self.status == PeriodStatus::Active && self.start_date <= day && day <= self.end_date
    }
}

/// A closed (year, month) pair for client-side date pickers
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClosedMonth {
    pub year: i32,
    pub month: u32,
}

/// Validated input for a new closing period
#[derive(Clone, Debug, PartialEq)]
pub struct NewClosingPeriod {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub month: u32,
    pub year: i32,
    pub notes: Option<String>,
    pub closed_by: Option<String>,
}

impl NewClosingPeriod {
    /// Validate a new period. Month and year default to those of `start_date`.
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        month: Option<u32>,
        year: Option<i32>,
        notes: Option<String>,
        closed_by: Option<String>,
    ) -> Result<Self> {
        if start_date > end_date {
            return Err(SawitError::validation(
                "Tanggal mulai tidak boleh setelah tanggal akhir",
            ));
        }

        let month = month.unwrap_or_else(|| start_date.month());
        if !(1..=12).contains(&month) {
            return Err(SawitError::validation(format!("Invalid month: {}", month)));
        }

        let year = year.unwrap_or_else(|| start_date.year());
        let first = (start_date.year(), start_date.month());
        let last = (end_date.year(), end_date.month());
        if (year, month) < first || (year, month) > last {
            return Err(SawitError::validation(format!(
                "Bulan {:04}-{:02} berada di luar rentang {} s/d {}",
                year, month, start_date, end_date
            )));
        }

        Ok(Self {
            start_date,
            end_date,
            month,
            year,
            notes: notes.filter(|n| !n.trim().is_empty()),
            closed_by,
        })
    }
}

/// Request body for `POST /api/closing-periods`
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClosePeriodRequest {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub notes: Option<String>,
}

impl ClosePeriodRequest {
    /// Validate the request on behalf of `closed_by`
    pub fn into_new_period(self, closed_by: Option<String>) -> Result<NewClosingPeriod> {
        let start_date = required_day("startDate", self.start_date.as_deref())?;
        let end_date = required_day("endDate", self.end_date.as_deref())?;
        NewClosingPeriod::new(start_date, end_date, self.month, self.year, self.notes, closed_by)
    }
}

fn required_day(field: &str, raw: Option<&str>) -> Result<NaiveDate> {
    let raw = raw
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| SawitError::validation(format!("Field '{}' is required", field)))?;
    parse_day(raw).ok_or_else(|| SawitError::validation(format!("Invalid date for '{}': {}", field, raw)))
}
