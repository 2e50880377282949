//! Entity store contract and an in-memory implementation

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{EntityType, ExtractedEntity};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend unavailable: {0}")]
    Unavailable(String),
    #[error("store write failed for {file}: {reason}")]
    Write { file: String, reason: String },
}

/// An entity as persisted, tagged with its owning file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntity {
    pub file: String,
    #[serde(flatten)]
    pub entity: ExtractedEntity,
}

/// Persistence for extracted entities.
///
/// `replace_entities` must behave as one delete-then-insert: readers see
/// either the old entity set for a file or the new one, never a mix.
pub trait EntityStore: Send + Sync {
    fn replace_entities(
        &self,
        workspace: &str,
        file: &str,
        hash: &str,
        entities: &[ExtractedEntity],
    ) -> Result<(), StoreError>;

    /// All entities in a workspace, optionally filtered by type.
    fn query_entities(
        &self,
        workspace: &str,
        entity_type: Option<EntityType>,
    ) -> Result<Vec<StoredEntity>, StoreError>;

    /// Hash recorded with the last `replace_entities` for a file.
    fn file_hash(&self, workspace: &str, file: &str) -> Result<Option<String>, StoreError>;

    /// Drop a file and all its entities.
    fn remove_file(&self, workspace: &str, file: &str) -> Result<(), StoreError>;

    /// Relative paths of every file with a recorded entry.
    fn files(&self, workspace: &str) -> Result<Vec<String>, StoreError>;
}

/// One file's persisted state.
#[derive(Debug, Clone)]
struct FileEntry {
    hash: String,
    entities: Vec<ExtractedEntity>,
    indexed_at: DateTime<Utc>,
}

/// Thread-safe in-memory store keyed by (workspace, file).
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: DashMap<(String, String), FileEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entities recorded for one file, in extraction order.
    pub fn entities_for(&self, workspace: &str, file: &str) -> Vec<ExtractedEntity> {
        self.files
            .get(&(workspace.to_string(), file.to_string()))
            .map(|entry| entry.entities.clone())
            .unwrap_or_default()
    }

    /// When a file was last written.
    pub fn indexed_at(&self, workspace: &str, file: &str) -> Option<DateTime<Utc>> {
        self.files
            .get(&(workspace.to_string(), file.to_string()))
            .map(|entry| entry.indexed_at)
    }
}

impl EntityStore for MemoryStore {
    fn replace_entities(
        &self,
        workspace: &str,
        file: &str,
        hash: &str,
        entities: &[ExtractedEntity],
    ) -> Result<(), StoreError> {
        // A single insert swaps the whole entry under the shard lock.
        self.files.insert(
            (workspace.to_string(), file.to_string()),
            FileEntry {
                hash: hash.to_string(),
                entities: entities.to_vec(),
                indexed_at: Utc::now(),
            },
        );
        Ok(())
    }

    fn query_entities(
        &self,
        workspace: &str,
        entity_type: Option<EntityType>,
    ) -> Result<Vec<StoredEntity>, StoreError> {
        let mut out: Vec<StoredEntity> = self
            .files
            .iter()
            .filter(|r| r.key().0 == workspace)
            .flat_map(|r| {
                let file = r.key().1.clone();
                r.value()
                    .entities
                    .iter()
                    .filter(|e| entity_type.is_none_or(|ty| e.entity_type == ty))
                    .map(|e| StoredEntity {
                        file: file.clone(),
                        entity: e.clone(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        out.sort_by(|a, b| {
            (a.file.as_str(), a.entity.line_start).cmp(&(b.file.as_str(), b.entity.line_start))
        });
        Ok(out)
    }

    fn file_hash(&self, workspace: &str, file: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .files
            .get(&(workspace.to_string(), file.to_string()))
            .map(|entry| entry.hash.clone()))
    }

    fn remove_file(&self, workspace: &str, file: &str) -> Result<(), StoreError> {
        self.files.remove(&(workspace.to_string(), file.to_string()));
        Ok(())
    }

    fn files(&self, workspace: &str) -> Result<Vec<String>, StoreError> {
        let mut files: Vec<String> = self
            .files
            .iter()
            .filter(|r| r.key().0 == workspace)
            .map(|r| r.key().1.clone())
            .collect();
        files.sort();
        Ok(files)
    }
}

impl<S: EntityStore + ?Sized> EntityStore for std::sync::Arc<S> {
    fn replace_entities(
        &self,
        workspace: &str,
        file: &str,
        hash: &str,
        entities: &[ExtractedEntity],
    ) -> Result<(), StoreError> {
        (**self).replace_entities(workspace, file, hash, entities)
    }

    fn query_entities(
        &self,
        workspace: &str,
        entity_type: Option<EntityType>,
    ) -> Result<Vec<StoredEntity>, StoreError> {
        (**self).query_entities(workspace, entity_type)
    }

    fn file_hash(&self, workspace: &str, file: &str) -> Result<Option<String>, StoreError> {
        (**self).file_hash(workspace, file)
    }

    fn remove_file(&self, workspace: &str, file: &str) -> Result<(), StoreError> {
        (**self).remove_file(workspace, file)
    }

    fn files(&self, workspace: &str) -> Result<Vec<String>, StoreError> {
        (**self).files(workspace)
    }
}
