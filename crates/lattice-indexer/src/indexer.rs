//! Semantic indexer: workspace walk, hash-gated re-parsing, persistence

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use lattice_core::workspace::canonical_root;
use lattice_core::{
    Config, ConfigError, EntityStore, EntityType, HashCache, StoreError, StoredEntity,
    content_hash, relative_key, workspace_key,
};
use serde::Serialize;
use thiserror::Error;

use crate::languages::extract_file;
use crate::walker::FileScanner;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("workspace does not exist: {0}")]
    MissingWorkspace(PathBuf),
    #[error("{0} is outside the workspace")]
    OutsideWorkspace(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("indexing cancelled after {} of {} files", .0.processed, .0.files_total)]
    Cancelled(Box<IndexReport>),
}

/// Progress notification emitted during a full index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexProgress {
    pub processed: usize,
    pub total: usize,
    pub entities_so_far: usize,
}

/// Aggregate result of a full index run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexReport {
    pub files_total: usize,
    pub processed: usize,
    /// Files whose stored entities are current: re-parsed or unchanged.
    pub indexed: usize,
    /// Subset of `indexed` skipped by the hash gate.
    pub unchanged: usize,
    /// Files that could not be read or parsed; their old entities are kept.
    pub skipped: usize,
    pub skipped_files: Vec<String>,
    /// Store entries purged because the file disappeared.
    pub removed: usize,
    pub entities_found: usize,
    pub by_type: BTreeMap<EntityType, usize>,
}

/// What `incremental_update` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// Hash matched the last recorded one; nothing was parsed.
    Unchanged,
    Reindexed { entities: usize },
    /// The file is gone; its entities were dropped.
    Removed,
    /// Unsupported, unreadable, or unparseable; stored entities untouched.
    Skipped,
}

/// Cooperative cancellation, checked between files.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Indexes one workspace into an [`EntityStore`].
///
/// Owns its hash cache, so independent indexers never share state.
pub struct SemanticIndexer<S: EntityStore> {
    root: PathBuf,
    workspace: String,
    store: S,
    cache: HashCache,
    config: Config,
    scanner: FileScanner,
    cancel: CancelFlag,
}

impl<S: EntityStore> SemanticIndexer<S> {
    /// Create an indexer, loading `lattice.toml` from the root if present.
    pub fn new(root: impl AsRef<Path>, store: S) -> Result<Self, IndexError> {
        let config = Config::load(root.as_ref())?;
        Self::with_config(root, store, config)
    }

    /// Fails only when the configured exclude globs do not compile.
    pub fn with_config(root: impl AsRef<Path>, store: S, config: Config) -> Result<Self, IndexError> {
        let root = canonical_root(root.as_ref());
        let scanner = FileScanner::new(&root, &config)?;
        Ok(Self {
            workspace: workspace_key(&root),
            root,
            store,
            cache: HashCache::new(),
            config,
            scanner,
            cancel: CancelFlag::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Key scoping this workspace's entries in the store.
    pub fn workspace(&self) -> &str {
        &self.workspace
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// A handle that cancels the running (or next) full index.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Forget every recorded hash; the next update of each file re-parses.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cached_files(&self) -> usize {
        self.cache.len()
    }

    /// Walk the workspace and bring the store up to date.
    ///
    /// Files are processed one at a time. Per-file failures are counted as
    /// skipped and never abort the run.
    pub fn full_index(
        &mut self,
        mut on_progress: impl FnMut(&IndexProgress),
    ) -> Result<IndexReport, IndexError> {
        if !self.root.is_dir() {
            return Err(IndexError::MissingWorkspace(self.root.clone()));
        }

        let files = self.scanner.scan();
        let total = files.len();
        tracing::info!("Indexing {} files in {}", total, self.root.display());

        let mut report = IndexReport {
            files_total: total,
            ..Default::default()
        };
        report.removed = self.purge_missing(&files)?;

        let percent = usize::from(self.config.index.progress_step_percent.max(1));
        let step = (total * percent / 100).max(1);
        let mut entities_so_far = 0usize;

        for relative in &files {
            if self.cancel.is_cancelled() {
                self.cancel.reset();
                tracing::info!("Indexing cancelled after {}/{} files", report.processed, total);
                return Err(IndexError::Cancelled(Box::new(report)));
            }

            match self.update_file(relative)? {
                UpdateOutcome::Reindexed { entities } => {
                    report.indexed += 1;
                    entities_so_far += entities;
                }
                UpdateOutcome::Unchanged => {
                    report.indexed += 1;
                    report.unchanged += 1;
                }
                UpdateOutcome::Skipped => {
                    report.skipped += 1;
                    report.skipped_files.push(relative.clone());
                }
                UpdateOutcome::Removed => report.removed += 1,
            }
            report.processed += 1;

            if report.processed % step == 0 || report.processed == total {
                let progress = IndexProgress {
                    processed: report.processed,
                    total,
                    entities_so_far,
                };
                tracing::info!(
                    "Indexed {}/{} files ({} entities)",
                    progress.processed,
                    progress.total,
                    progress.entities_so_far
                );
                on_progress(&progress);
            }
        }
        self.cancel.reset();

        for stored in self.store.query_entities(&self.workspace, None)? {
            *report.by_type.entry(stored.entity.entity_type).or_insert(0) += 1;
            report.entities_found += 1;
        }

        tracing::info!(
            "Indexed {} files ({} unchanged, {} skipped, {} removed), {} entities",
            report.indexed,
            report.unchanged,
            report.skipped,
            report.removed,
            report.entities_found
        );
        Ok(report)
    }

    /// Re-index one file if and only if its content hash changed.
    pub fn incremental_update(&mut self, file: impl AsRef<Path>) -> Result<UpdateOutcome, IndexError> {
        let file = file.as_ref();
        let relative = relative_key(&self.root, file)
            .ok_or_else(|| IndexError::OutsideWorkspace(file.to_path_buf()))?;

        if !self.scanner.is_indexed(&relative) {
            tracing::debug!("Not an indexed file: {}", relative);
            return Ok(UpdateOutcome::Skipped);
        }
        self.update_file(&relative)
    }

    /// Entities in this workspace, optionally filtered by type.
    pub fn get_entities(&self, entity_type: Option<EntityType>) -> Result<Vec<StoredEntity>, IndexError> {
        Ok(self.store.query_entities(&self.workspace, entity_type)?)
    }

    fn update_file(&mut self, relative: &str) -> Result<UpdateOutcome, IndexError> {
        let path = self.root.join(relative);
        let content = match std::fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.store.remove_file(&self.workspace, relative)?;
                self.cache.forget(relative);
                tracing::debug!("Removed {}", relative);
                return Ok(UpdateOutcome::Removed);
            }
            Err(e) => {
                tracing::warn!("Skipping {}: {}", relative, e);
                return Ok(UpdateOutcome::Skipped);
            }
        };

        if !self.cache.contains(relative) {
            if let Some(hash) = self.store.file_hash(&self.workspace, relative)? {
                self.cache.record(relative, hash);
            }
        }
        let hash = content_hash(&content);
        if self.cache.is_current(relative, &hash) {
            return Ok(UpdateOutcome::Unchanged);
        }

        let Some(result) = extract_file(relative, &content) else {
            return Ok(UpdateOutcome::Skipped);
        };
        if !result.is_parsed() {
            tracing::warn!("Skipping {}: syntax error, keeping previous entities", relative);
            return Ok(UpdateOutcome::Skipped);
        }

        self.store
            .replace_entities(&self.workspace, relative, &hash, &result.entities)?;
        self.cache.record(relative, hash);
        tracing::debug!("Indexed {} ({} entities)", relative, result.entities.len());
        Ok(UpdateOutcome::Reindexed {
            entities: result.entities.len(),
        })
    }

    /// Drop store and cache entries for files no longer on disk.
    fn purge_missing(&mut self, present: &[String]) -> Result<usize, IndexError> {
        let present: HashSet<String> = present.iter().cloned().collect();
        let mut removed = 0;
        for file in self.store.files(&self.workspace)? {
            if !present.contains(&file) {
                self.store.remove_file(&self.workspace, &file)?;
                tracing::debug!("Purged stale entry {}", file);
                removed += 1;
            }
        }
        self.cache.retain_paths(&present);
        Ok(removed)
    }
}

impl<S: EntityStore> std::fmt::Debug for SemanticIndexer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticIndexer")
            .field("root", &self.root)
            .field("cached_files", &self.cache.len())
            .finish()
    }
}
