use async_trait::async_trait;

use crate::{Document, DocumentQuery, DocumentWrite, Result, Version};

/// Options for writing a document.
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    /// Expected current version for optimistic concurrency control.
    /// If None, the write is an unconditional upsert.
    pub expected_version: Option<Version>,
}

impl PutOptions {
    /// Creates options with no version check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects the stored document to be at a specific version.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// Expects the document not to exist yet.
    pub fn expect_new() -> Self {
        Self {
            expected_version: Some(Version::initial()),
        }
    }

    /// Picks `expect_new` for never-written documents and `expect_version` otherwise.
    pub fn expecting(current: Version) -> Self {
        if current == Version::initial() {
            Self::expect_new()
        } else {
            Self::expect_version(current)
        }
    }
}

/// Core trait for document store implementations.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Retrieves a document by collection and key.
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>>;

    /// Writes a document.
    ///
    /// If `options.expected_version` is set, the write fails with
    /// `ConcurrencyConflict` unless the stored version matches
    /// (`Version::initial()` meaning "must not exist").
    ///
    /// Returns the document as stored, with its new version.
    async fn put(&self, write: DocumentWrite, options: PutOptions) -> Result<Document>;

    /// Retrieves documents matching a query.
    async fn query(&self, query: DocumentQuery) -> Result<Vec<Document>>;

    /// Counts documents matching a query's collection and filters.
    ///
    /// Sorting, limit and offset are ignored.
    async fn count(&self, query: &DocumentQuery) -> Result<u64>;
}

/// Extension trait providing convenience methods for document stores.
#[async_trait]
pub trait DocumentStoreExt: DocumentStore {
    /// Checks if a document exists.
    async fn exists(&self, collection: &str, key: &str) -> Result<bool> {
        Ok(self.get(collection, key).await?.is_some())
    }

    /// Returns the stored version of a document, `Version::initial()` if absent.
    async fn current_version(&self, collection: &str, key: &str) -> Result<Version> {
        Ok(self
            .get(collection, key)
            .await?
            .map(|d| d.version)
            .unwrap_or_default())
    }

    /// Retrieves several documents of one collection, skipping missing keys.
    ///
    /// Documents are returned in the order of `keys`.
    async fn get_many(&self, collection: &str, keys: &[String]) -> Result<Vec<Document>> {
        let mut documents = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(document) = self.get(collection, key).await? {
                documents.push(document);
            }
        }
        Ok(documents)
    }
}

// Blanket implementation for all DocumentStore implementations
impl<T: DocumentStore + ?Sized> DocumentStoreExt for T {}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for std::sync::Arc<T> {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        (**self).get(collection, key).await
    }

    async fn put(&self, write: DocumentWrite, options: PutOptions) -> Result<Document> {
        (**self).put(write, options).await
    }

    async fn query(&self, query: DocumentQuery) -> Result<Vec<Document>> {
        (**self).query(query).await
    }

    async fn count(&self, query: &DocumentQuery) -> Result<u64> {
        (**self).count(query).await
    }
}
