use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

/// A stored document: a JSON object of named fields.
pub type Document = Map<String, JsonValue>;

/// Order store operation error.
///
/// These are **store errors** (reachability, rejected writes, missing
/// documents) as opposed to domain errors (validation, invariants).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("order store unavailable: {0}")]
    Unavailable(String),

    #[error("order store rejected write: {0}")]
    WriteFailed(String),

    #[error("document '{id}' not found in '{collection}'")]
    NotFound { collection: String, id: String },
}

impl StoreError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

/// Document store holding the order collection.
///
/// ## Contract
///
/// - `write` upserts a whole document.
/// - `read_all` returns the full collection keyed by document id. Filtering
///   (e.g. by status) is the caller's job.
/// - `update` merges the named fields into an existing document and fails with
///   [`StoreError::NotFound`] if it does not exist.
/// - `delete` removes a document and fails with [`StoreError::NotFound`] if it
///   does not exist. Callers decide whether that is an error.
///
/// There is no revision token: concurrent writers overwrite each other field by
/// field (last write wins).
pub trait OrderStore: Send + Sync {
    fn write(&self, collection: &str, id: &str, document: Document) -> Result<(), StoreError>;

    fn read_all(&self, collection: &str) -> Result<BTreeMap<String, Document>, StoreError>;

    fn update(&self, collection: &str, id: &str, patch: Document) -> Result<(), StoreError>;

    fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}

impl<S> OrderStore for Arc<S>
where
    S: OrderStore + ?Sized,
{
    fn write(&self, collection: &str, id: &str, document: Document) -> Result<(), StoreError> {
        (**self).write(collection, id, document)
    }

    fn read_all(&self, collection: &str) -> Result<BTreeMap<String, Document>, StoreError> {
        (**self).read_all(collection)
    }

    fn update(&self, collection: &str, id: &str, patch: Document) -> Result<(), StoreError> {
        (**self).update(collection, id, patch)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        (**self).delete(collection, id)
    }
}
