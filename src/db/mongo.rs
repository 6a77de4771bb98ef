//! MongoDB client and collection wrapper
//!
//! Typed collections apply their schema-declared indexes when opened.
//! Gated records are schemaless, so they go through [`MongoClient::documents`]
//! with an explicit index list instead.

use bson::{doc, oid::ObjectId, Document};
use futures::stream::TryStreamExt;
use mongodb::{options::IndexOptions, Client, Collection, IndexModel};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

use crate::db::schemas::Metadata;
use crate::types::SawitError;

/// Index definition: key document plus options
pub type IndexSpec = (Document, Option<IndexOptions>);

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<IndexSpec>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and verify the server answers a ping
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, SawitError> {
        info!("Connecting to MongoDB at {}", uri);

        // Fail fast instead of hanging on an unreachable server
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| SawitError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        let mongo = Self {
            client,
            db_name: db_name.to_string(),
        };
        mongo.ping().await?;

        info!("Connected to MongoDB database '{}'", db_name);
        Ok(mongo)
    }

    /// Round-trip a ping command, used by the readiness probe
    pub async fn ping(&self) -> Result<(), SawitError> {
        self.client
            .database(&self.db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| SawitError::Database(format!("MongoDB ping failed: {}", e)))?;
        Ok(())
    }

    /// Get a typed collection
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, SawitError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// Get a raw document collection with the given indexes applied
    pub async fn documents(
        &self,
        name: &str,
        indexes: Vec<IndexSpec>,
    ) -> Result<Collection<Document>, SawitError> {
        let collection = self.client.database(&self.db_name).collection::<Document>(name);
        apply_indexes(&collection, indexes).await?;
        Ok(collection)
    }
}

async fn apply_indexes<T>(collection: &Collection<T>, specs: Vec<IndexSpec>) -> Result<(), SawitError>
where
    T: Send + Sync,
{
    if specs.is_empty() {
        return Ok(());
    }

    let indices: Vec<IndexModel> = specs
        .into_iter()
        .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
        .collect();

    collection
        .create_indexes(indices)
        .await
        .map_err(|e| SawitError::Database(format!("Failed to create indexes: {}", e)))?;

    debug!(collection = %collection.name(), "Indexes applied");
    Ok(())
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
{
    /// Create a new collection and apply indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, SawitError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        apply_indexes(&collection, T::into_indices()).await?;
        Ok(MongoCollection { inner: collection })
    }

    /// Insert a document, setting metadata timestamps
    pub async fn insert_one(&self, mut item: T) -> Result<ObjectId, SawitError> {
        *item.mut_metadata() = Metadata::new();

        let result = self
            .inner
            .insert_one(item)
            .await
            .map_err(|e| SawitError::Database(format!("Insert failed: {}", e)))?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| SawitError::Database("Failed to get inserted ID".into()))
    }

    /// Find documents by filter in the given sort order
    pub async fn find_many(
        &self,
        filter: Document,
        sort: Document,
        limit: Option<i64>,
    ) -> Result<Vec<T>, SawitError> {
        let mut action = self.inner.find(filter).sort(sort);
        if let Some(limit) = limit {
            action = action.limit(limit);
        }

        let cursor = action
            .await
            .map_err(|e| SawitError::Database(format!("Find failed: {}", e)))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| SawitError::Database(format!("Cursor read failed: {}", e)))
    }

    /// Hard delete one document, returning it
    pub async fn find_one_and_delete(&self, filter: Document) -> Result<Option<T>, SawitError> {
        self.inner
            .find_one_and_delete(filter)
            .await
            .map_err(|e| SawitError::Database(format!("Delete failed: {}", e)))
    }
}

/// Parse a hex object id, mapping failure to a validation error
pub fn parse_object_id(id: &str) -> Result<ObjectId, SawitError> {
    ObjectId::parse_str(id).map_err(|_| SawitError::validation(format!("Invalid id: {}", id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_id() {
        assert!(parse_object_id("65a1b2c3d4e5f60718293a4b").is_ok());
        let err = parse_object_id("not-an-id").unwrap_err();
        assert!(matches!(err, SawitError::Validation(_)));
    }
}
