use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{Result, StoreError};

/// Version number of a stored document, used for optimistic concurrency control.
///
/// A document that does not exist yet is at version 0. The first write
/// produces version 1 and each later write increments it by one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the initial version (0) of a document that has never been written.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the version (1) produced by the first write.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// A stored document together with its store-managed metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Collection the document belongs to (e.g. "orders", "carts").
    pub collection: String,

    /// Key unique within the collection.
    pub key: String,

    /// Version after the most recent write.
    pub version: Version,

    /// When the document was first written.
    pub created_at: DateTime<Utc>,

    /// When the document was last written.
    pub updated_at: DateTime<Utc>,

    /// The document body. Always a JSON object.
    pub body: serde_json::Value,
}

impl Document {
    /// Creates a new document write builder.
    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::default()
    }

    /// Deserializes the body into a typed value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}

/// A validated request to write a document body under a key.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentWrite {
    pub collection: String,
    pub key: String,
    pub body: serde_json::Value,
}

/// Builder for constructing document writes.
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    collection: Option<String>,
    key: Option<String>,
    body: Option<serde_json::Value>,
}

impl DocumentBuilder {
    /// Sets the collection.
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Sets the key.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Sets the body from a serializable value.
    pub fn body<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Sets the body from a raw JSON value.
    pub fn body_raw(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Builds the write, rejecting missing or blank fields and non-object bodies.
    pub fn build(self) -> Result<DocumentWrite> {
        let collection = self
            .collection
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| StoreError::InvalidDocument("collection is required".to_string()))?;
        let key = self
            .key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| StoreError::InvalidDocument("key is required".to_string()))?;
        let body = self
            .body
            .ok_or_else(|| StoreError::InvalidDocument("body is required".to_string()))?;

        if !body.is_object() {
            return Err(StoreError::InvalidDocument(format!(
                "body of {collection}/{key} must be a JSON object"
            )));
        }

        Ok(DocumentWrite {
            collection,
            key,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_ordering() {
        assert!(Version::initial() < Version::first());
        assert_eq!(Version::initial().next(), Version::first());
        assert_eq!(Version::new(41).next().as_i64(), 42);
    }

    #[test]
    fn builder_produces_write() {
        let write = Document::builder()
            .collection("carts")
            .key("user-1")
            .body_raw(serde_json::json!({"items": []}))
            .build()
            .unwrap();
        assert_eq!(write.collection, "carts");
        assert_eq!(write.key, "user-1");
    }

    #[test]
    fn builder_rejects_missing_key() {
        let result = Document::builder()
            .collection("carts")
            .body_raw(serde_json::json!({}))
            .build();
        assert!(matches!(result, Err(StoreError::InvalidDocument(_))));
    }

    #[test]
    fn builder_rejects_non_object_body() {
        let result = Document::builder()
            .collection("carts")
            .key("k")
            .body_raw(serde_json::json!([1, 2]))
            .build();
        assert!(matches!(result, Err(StoreError::InvalidDocument(_))));
    }

    #[test]
    fn decode_typed_body() {
        #[derive(Deserialize)]
        struct Body {
            name: String,
        }

        let doc = Document {
            collection: "products".to_string(),
            key: "p1".to_string(),
            version: Version::first(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            body: serde_json::json!({"name": "Bananas"}),
        };
        let body: Body = doc.decode().unwrap();
        assert_eq!(body.name, "Bananas");
    }
}
