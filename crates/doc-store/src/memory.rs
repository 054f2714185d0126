use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    Document, DocumentQuery, DocumentWrite, Result, SortDirection, SortKey, StoreError, Version,
    query::{compare_values, lookup},
    store::{DocumentStore, PutOptions},
};

#[derive(Debug, Clone)]
struct Stored {
    seq: u64,
    document: Document,
}

#[derive(Debug, Default)]
struct State {
    documents: HashMap<(String, String), Stored>,
    next_seq: u64,
}

/// In-memory document store.
///
/// Provides the same interface and concurrency semantics as the PostgreSQL
/// implementation. Used by tests and by the server when no database is
/// configured.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryDocumentStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of documents stored.
    pub async fn document_count(&self) -> usize {
        self.state.read().await.documents.len()
    }

    /// Removes every document.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.documents.clear();
        state.next_seq = 0;
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        let state = self.state.read().await;
        Ok(state
            .documents
            .get(&(collection.to_string(), key.to_string()))
            .map(|s| s.document.clone()))
    }

    async fn put(&self, write: DocumentWrite, options: PutOptions) -> Result<Document> {
        let mut state = self.state.write().await;
        let id = (write.collection.clone(), write.key.clone());
        let existing = state.documents.get(&id).cloned();
        let current = existing
            .as_ref()
            .map(|s| s.document.version)
            .unwrap_or(Version::initial());

        if let Some(expected) = options.expected_version
            && current != expected
        {
            metrics::counter!("document_store_conflicts_total").increment(1);
            tracing::debug!(
                collection = %write.collection,
                key = %write.key,
                %expected,
                actual = %current,
                "document write rejected"
            );
            return Err(StoreError::ConcurrencyConflict {
                collection: write.collection,
                key: write.key,
                expected,
                actual: current,
            });
        }

        let now = Utc::now();
        let (seq, created_at) = match existing {
            Some(stored) => (stored.seq, stored.document.created_at),
            None => {
                state.next_seq += 1;
                (state.next_seq, now)
            }
        };

        let document = Document {
            collection: write.collection,
            key: write.key,
            version: current.next(),
            created_at,
            updated_at: now,
            body: write.body,
        };
        state.documents.insert(
            id,
            Stored {
                seq,
                document: document.clone(),
            },
        );

        Ok(document)
    }

    async fn query(&self, query: DocumentQuery) -> Result<Vec<Document>> {
        query.validate()?;
        let state = self.state.read().await;
        let mut matched: Vec<&Stored> = state
            .documents
            .values()
            .filter(|s| query.matches(&s.document))
            .collect();

        matched.sort_by(|a, b| {
            let primary = match &query.sort {
                SortKey::CreatedAt => a.document.created_at.cmp(&b.document.created_at),
                SortKey::UpdatedAt => a.document.updated_at.cmp(&b.document.updated_at),
                SortKey::Field(path) => compare_values(
                    lookup(&a.document.body, path),
                    lookup(&b.document.body, path),
                ),
            };
            let ordering = primary.then(a.seq.cmp(&b.seq));
            match query.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|s| s.document.clone())
            .collect())
    }

    async fn count(&self, query: &DocumentQuery) -> Result<u64> {
        query.validate()?;
        let state = self.state.read().await;
        let count = state
            .documents
            .values()
            .filter(|s| query.matches(&s.document))
            .count();
        Ok(count as u64)
    }
}
