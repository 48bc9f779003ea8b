pub mod memory;
pub mod rest;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use shared_config::AppConfig;

pub use memory::MemoryStore;
pub use rest::RestStore;

/// Envelope returned by every read and write. `revision` increments on each
/// mutation and is the precondition token for conditional commits. Fields in
/// `body` that no model recognizes pass through this layer untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub revision: u64,
    pub body: Value,
}

impl Document {
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        serde_json::from_value(self.body.clone())
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

/// Equality filter; the only query shape the store exposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Precondition {
    /// The document must exist at exactly this revision.
    RevisionMatches {
        collection: String,
        id: String,
        revision: u64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Write {
    /// Insert with a store-generated identifier.
    Insert { collection: String, body: Value },
    /// Insert under a caller-chosen identifier; fails the batch with
    /// `Contention` if a document with that id already exists.
    Create {
        collection: String,
        id: String,
        body: Value,
    },
    /// Merge: top-level keys of `patch` overwrite, all other keys are kept.
    Update {
        collection: String,
        id: String,
        patch: Value,
    },
}

/// An all-or-nothing conditional write. Either every precondition holds and
/// every write lands, or nothing does.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WriteBatch {
    pub preconditions: Vec<Precondition>,
    pub writes: Vec<Write>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require_revision(
        mut self,
        collection: impl Into<String>,
        id: impl Into<String>,
        revision: u64,
    ) -> Self {
        self.preconditions.push(Precondition::RevisionMatches {
            collection: collection.into(),
            id: id.into(),
            revision,
        });
        self
    }

    pub fn insert(mut self, collection: impl Into<String>, body: Value) -> Self {
        self.writes.push(Write::Insert {
            collection: collection.into(),
            body,
        });
        self
    }

    pub fn create(
        mut self,
        collection: impl Into<String>,
        id: impl Into<String>,
        body: Value,
    ) -> Self {
        self.writes.push(Write::Create {
            collection: collection.into(),
            id: id.into(),
            body,
        });
        self
    }

    pub fn update(
        mut self,
        collection: impl Into<String>,
        id: impl Into<String>,
        patch: Value,
    ) -> Self {
        self.writes.push(Write::Update {
            collection: collection.into(),
            id: id.into(),
            patch,
        });
        self
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found")]
    NotFound,

    #[error("write conflict: a precondition failed")]
    Contention,

    #[error("backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// The document-oriented data store the scheduling core is written against.
///
/// Injected as `Arc<dyn DocumentStore>` so production code runs on the
/// hosted backend (`RestStore`) and tests run on `MemoryStore` without any
/// change to the callers.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> Result<Vec<Document>, StoreError>;

    async fn insert(&self, collection: &str, body: Value) -> Result<Document, StoreError>;

    async fn update(&self, collection: &str, id: &str, patch: Value)
        -> Result<Document, StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Commit a conditional batch. Returns the resulting documents in write
    /// order. A failed precondition (or a `Create` collision) yields
    /// `StoreError::Contention` and leaves the store unchanged.
    async fn commit(&self, batch: WriteBatch) -> Result<Vec<Document>, StoreError>;
}

/// Shared handler state: configuration plus the injected store handle.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn DocumentStore>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn DocumentStore>) -> Self {
        Self { config, store }
    }
}
