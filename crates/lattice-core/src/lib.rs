//! Lattice Core: data model, file classifier, dependency graph, and entity store

pub mod cache;
pub mod classifier;
pub mod config;
pub mod graph;
pub mod model;
pub mod resolve;
pub mod store;
pub mod workspace;


#[cfg(test)]
pub mod test_utils;

pub use cache::{HashCache, content_hash};
pub use classifier::classify;
pub use config::{Config, ConfigError, ImpactConfig, IndexConfig, ResolveConfig};
pub use graph::{DependencyGraph, GraphSummary};
pub use model::{
    Category, EntityDetail, EntityType, ExtractedEntity, Field, FileFamily, FileNode,
    FileParseResult, Language, Method, ParseStatus, RawImport, SourceFile, SymbolKind,
};
pub use resolve::ImportResolver;
pub use store::{EntityStore, MemoryStore, StoreError, StoredEntity};
pub use workspace::{is_ignored_dir, is_source_file, relative_key, workspace_key};
