//! Gated records: reports, operational costs, panen, angkut and taksasi

pub mod kind;
pub mod recap;
pub mod service;
pub mod store;

pub use kind::RecordKind;
pub use recap::{recap, Recap, RecapGroup};
pub use service::RecordService;
pub use store::{DateRange, MemoryRecordStore, MongoRecordStore, Record, RecordStore};
