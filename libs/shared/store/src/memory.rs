// libs/shared/store/src/memory.rs
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{Document, DocumentStore, Filter, Precondition, StoreError, Write, WriteBatch};

#[derive(Debug, Clone)]
struct StoredDoc {
    revision: u64,
    body: Value,
}

/// In-memory implementation backing every core test.
///
/// One mutex guards all collections, so `commit` checks its preconditions
/// and applies its writes in a single critical section: concurrent commits
/// against the same document are linearized exactly like the hosted
/// backend's transactions.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, BTreeMap<String, StoredDoc>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn as_object(body: &Value) -> Result<serde_json::Map<String, Value>, StoreError> {
        body.as_object()
            .cloned()
            .ok_or_else(|| StoreError::Serialization("document body must be an object".into()))
    }

    fn make_doc(id: &str, stored: &StoredDoc) -> Document {
        Document {
            id: id.to_string(),
            revision: stored.revision,
            body: stored.body.clone(),
        }
    }

    fn matches(body: &Value, filters: &[Filter]) -> bool {
        filters
            .iter()
            .all(|f| body.get(&f.field) == Some(&f.value))
    }

    fn merge(body: &mut Value, patch: &Value) -> Result<(), StoreError> {
        let patch_obj = patch
            .as_object()
            .ok_or_else(|| StoreError::Serialization("update patch must be an object".into()))?;
        let body_obj = body
            .as_object_mut()
            .ok_or_else(|| StoreError::Serialization("stored body is not an object".into()))?;
        for (key, value) in patch_obj {
            body_obj.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.lock().unwrap();
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|stored| Self::make_doc(id, stored)))
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.lock().unwrap();
        let docs = match collections.get(collection) {
            Some(docs) => docs,
            None => return Ok(vec![]),
        };

        Ok(docs
            .iter()
            .filter(|(_, stored)| Self::matches(&stored.body, filters))
            .map(|(id, stored)| Self::make_doc(id, stored))
            .collect())
    }

    async fn insert(&self, collection: &str, body: Value) -> Result<Document, StoreError> {
        let mut object = Self::as_object(&body)?;
        let id = Uuid::new_v4().to_string();
        object.insert("id".to_string(), json!(id));

        let stored = StoredDoc {
            revision: 1,
            body: Value::Object(object),
        };

        let mut collections = self.collections.lock().unwrap();
        let doc = Self::make_doc(&id, &stored);
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id, stored);
        Ok(doc)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> Result<Document, StoreError> {
        let mut collections = self.collections.lock().unwrap();
        let stored = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or(StoreError::NotFound)?;

        Self::merge(&mut stored.body, &patch)?;
        stored.revision += 1;
        Ok(Self::make_doc(id, stored))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().unwrap();
        collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<Vec<Document>, StoreError> {
        let mut collections = self.collections.lock().unwrap();

        // Validate everything before touching anything; a failed check must
        // leave the store exactly as it was.
        for precondition in &batch.preconditions {
            match precondition {
                Precondition::RevisionMatches {
                    collection,
                    id,
                    revision,
                } => {
                    let current = collections
                        .get(collection)
                        .and_then(|docs| docs.get(id))
                        .map(|stored| stored.revision);
                    if current != Some(*revision) {
                        return Err(StoreError::Contention);
                    }
                }
            }
        }

        for write in &batch.writes {
            match write {
                Write::Create {
                    collection,
                    id,
                    body,
                } => {
                    Self::as_object(body)?;
                    let exists = collections
                        .get(collection)
                        .map(|docs| docs.contains_key(id))
                        .unwrap_or(false);
                    if exists {
                        return Err(StoreError::Contention);
                    }
                }
                Write::Update {
                    collection,
                    id,
                    patch,
                } => {
                    if !patch.is_object() {
                        return Err(StoreError::Serialization(
                            "update patch must be an object".into(),
                        ));
                    }
                    let exists = collections
                        .get(collection)
                        .map(|docs| docs.contains_key(id))
                        .unwrap_or(false);
                    if !exists {
                        return Err(StoreError::NotFound);
                    }
                }
                Write::Insert { body, .. } => {
                    Self::as_object(body)?;
                }
            }
        }

        let mut results = Vec::with_capacity(batch.writes.len());
        for write in batch.writes {
            match write {
                Write::Insert { collection, body } => {
                    let mut object = Self::as_object(&body)?;
                    let id = Uuid::new_v4().to_string();
                    object.insert("id".to_string(), json!(id));
                    let stored = StoredDoc {
                        revision: 1,
                        body: Value::Object(object),
                    };
                    results.push(Self::make_doc(&id, &stored));
                    collections
                        .entry(collection)
                        .or_default()
                        .insert(id, stored);
                }
                Write::Create { collection, id, body } => {
                    let mut object = Self::as_object(&body)?;
                    object.insert("id".to_string(), json!(id));
                    let stored = StoredDoc {
                        revision: 1,
                        body: Value::Object(object),
                    };
                    results.push(Self::make_doc(&id, &stored));
                    collections
                        .entry(collection)
                        .or_default()
                        .insert(id, stored);
                }
                Write::Update {
                    collection,
                    id,
                    patch,
                } => {
                    let stored = collections
                        .get_mut(&collection)
                        .and_then(|docs| docs.get_mut(&id))
                        .ok_or(StoreError::NotFound)?;
                    Self::merge(&mut stored.body, &patch)?;
                    stored.revision += 1;
                    results.push(Self::make_doc(&id, stored));
                }
            }
        }

        Ok(results)
    }
}
