//! Versioned JSON document storage.
//!
//! Every document lives in a named collection under a string key and carries
//! a monotonically increasing [`Version`]. Writers state the version they
//! expect to overwrite, so lost updates surface as
//! [`StoreError::ConcurrencyConflict`] instead of silently clobbering data.

pub mod document;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use document::{Document, DocumentBuilder, DocumentWrite, Version};
pub use error::{Result, StoreError};
pub use memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;
pub use query::{DocumentQuery, FieldFilter, SortDirection, SortKey};
pub use store::{DocumentStore, DocumentStoreExt, PutOptions};
