//! MongoDB persistence

pub mod mongo;
pub mod schemas;

pub use mongo::{parse_object_id, IndexSpec, IntoIndexes, MongoClient, MongoCollection, MutMetadata};
