//! Gated record kinds
//!
//! Each kind names its collection, the field holding the date that decides
//! which closing period governs it, the fields a create must carry, and how
//! recaps group and sum it.

use bson::doc;
use mongodb::options::IndexOptions;
use serde::Serialize;
use std::fmt;

use crate::db::IndexSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Report,
    OperationalCost,
    Panen,
    Angkut,
    Taksasi,
}

impl RecordKind {
    pub const ALL: [RecordKind; 5] = [
        RecordKind::Report,
        RecordKind::OperationalCost,
        RecordKind::Panen,
        RecordKind::Angkut,
        RecordKind::Taksasi,
    ];

    /// Resolve a URL segment, including the English aliases
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "reports" => Some(Self::Report),
            "recap-costs" => Some(Self::OperationalCost),
            "panen" | "harvest" => Some(Self::Panen),
            "angkut" | "transport" => Some(Self::Angkut),
            "taksasi" => Some(Self::Taksasi),
            _ => None,
        }
    }

    /// Canonical URL segment
    pub fn segment(&self) -> &'static str {
        match self {
            Self::Report => "reports",
            Self::OperationalCost => "recap-costs",
            Self::Panen => "panen",
            Self::Angkut => "angkut",
            Self::Taksasi => "taksasi",
        }
    }

    pub fn collection(&self) -> &'static str {
        match self {
            Self::Report => "reports",
            Self::OperationalCost => "operational_costs",
            Self::Panen => "panen",
            Self::Angkut => "angkut",
            Self::Taksasi => "taksasi",
        }
    }

    /// Field carrying the governing date
    pub fn date_field(&self) -> &'static str {
        match self {
            Self::Panen => "date_panen",
            _ => "date",
        }
    }

    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Report => &["date", "employee_id", "activity"],
            Self::OperationalCost => &["date", "category", "amount"],
            Self::Panen => &["date_panen", "block_id", "weight_kg"],
            Self::Angkut => &["date", "division_id", "weight_kg"],
            Self::Taksasi => &["date", "block_id", "estimated_kg"],
        }
    }

    /// Default recap grouping field
    pub fn group_field(&self) -> &'static str {
        match self {
            Self::Report => "activity",
            Self::OperationalCost => "category",
            Self::Panen => "block_id",
            Self::Angkut => "division_id",
            Self::Taksasi => "block_id",
        }
    }

    /// Numeric fields summed by recaps
    pub fn sum_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Report => &["hk"],
            Self::OperationalCost => &["amount"],
            Self::Panen => &["weight_kg", "janjang"],
            Self::Angkut => &["weight_kg"],
            Self::Taksasi => &["estimated_kg"],
        }
    }

    /// Human label used in error messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::Report => "Report",
            Self::OperationalCost => "Operational cost",
            Self::Panen => "Panen",
            Self::Angkut => "Angkut",
            Self::Taksasi => "Taksasi",
        }
    }

    /// Indexes for the kind's collection
    pub fn indexes(&self) -> Vec<IndexSpec> {
        let date_field = self.date_field();
        let group_field = self.group_field();
        vec![
            (
                doc! { date_field: -1 },
                Some(
                    IndexOptions::builder()
                        .name(format!("{}_index", date_field))
                        .build(),
                ),
            ),
            (
                doc! { group_field: 1, date_field: -1 },
                Some(
                    IndexOptions::builder()
                        .name(format!("{}_{}_index", group_field, date_field))
                        .build(),
                ),
            ),
        ]
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments_and_aliases() {
        assert_eq!(RecordKind::from_segment("harvest"), Some(RecordKind::Panen));
        assert_eq!(RecordKind::from_segment("transport"), Some(RecordKind::Angkut));
        assert_eq!(RecordKind::from_segment("recap-costs"), Some(RecordKind::OperationalCost));
        assert_eq!(RecordKind::from_segment("employees"), None);

        for kind in RecordKind::ALL {
            assert_eq!(RecordKind::from_segment(kind.segment()), Some(kind));
        }
    }

    #[test]
    fn test_date_field_is_required() {
        for kind in RecordKind::ALL {
            assert!(kind.required_fields().contains(&kind.date_field()));
        }
        assert_eq!(RecordKind::Panen.date_field(), "date_panen");
    }
}
