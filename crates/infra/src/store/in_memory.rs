use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use super::r#trait::{Document, OrderStore, StoreError};

/// In-memory document store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Document>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|c| c.get(collection).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

impl OrderStore for InMemoryOrderStore {
    fn write(&self, collection: &str, id: &str, document: Document) -> Result<(), StoreError> {
        let mut collections = self.collections.write().map_err(|_| poisoned())?;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
        Ok(())
    }

    fn read_all(&self, collection: &str) -> Result<BTreeMap<String, Document>, StoreError> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }

    fn update(&self, collection: &str, id: &str, patch: Document) -> Result<(), StoreError> {
        let mut collections = self.collections.write().map_err(|_| poisoned())?;
        let document = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::not_found(collection, id))?;

        for (field, value) in patch {
            document.insert(field, value);
        }
        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.write().map_err(|_| poisoned())?;
        collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(collection, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn write_then_read_all_returns_documents_by_id() {
        let store = InMemoryOrderStore::new();
        store.write("orders", "2", doc(json!({"n": 2}))).unwrap();
        store.write("orders", "1", doc(json!({"n": 1}))).unwrap();
        store.write("other", "1", doc(json!({"n": 9}))).unwrap();

        let all = store.read_all("orders").unwrap();
        assert_eq!(all.keys().collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(all["1"]["n"], 1);
        assert_eq!(store.len("orders"), 2);
        assert!(store.read_all("missing").unwrap().is_empty());
    }

    #[test]
    fn write_overwrites_whole_document() {
        let store = InMemoryOrderStore::new();
        store.write("orders", "1", doc(json!({"a": 1, "b": 2}))).unwrap();
        store.write("orders", "1", doc(json!({"a": 3}))).unwrap();
        assert_eq!(store.read_all("orders").unwrap()["1"], doc(json!({"a": 3})));
    }

    #[test]
    fn update_merges_named_fields_only() {
        let store = InMemoryOrderStore::new();
        store.write("orders", "1", doc(json!({"a": 1, "b": 2}))).unwrap();
        store.update("orders", "1", doc(json!({"b": 5, "c": 6}))).unwrap();
        assert_eq!(
            store.read_all("orders").unwrap()["1"],
            doc(json!({"a": 1, "b": 5, "c": 6}))
        );
    }

    #[test]
    fn update_and_delete_report_missing_documents() {
        let store = InMemoryOrderStore::new();
        assert_eq!(
            store.update("orders", "1", Document::new()),
            Err(StoreError::not_found("orders", "1"))
        );
        assert_eq!(
            store.delete("orders", "1"),
            Err(StoreError::not_found("orders", "1"))
        );

        store.write("orders", "1", Document::new()).unwrap();
        store.delete("orders", "1").unwrap();
        assert!(store.is_empty("orders"));
    }
}
