//! Database schemas for SawiTrack
//!
//! Typed documents for closing periods and the activity log. Gated records
//! are stored as plain documents; their indexes live with [`crate::records`].

mod activity_log;
mod closing_period;
mod metadata;

pub use activity_log::{ActivityLogDoc, ACTIVITY_LOG_COLLECTION};
pub use closing_period::{day_from_bson, day_to_bson, ClosingPeriodDoc, CLOSING_PERIOD_COLLECTION};
pub use metadata::Metadata;
