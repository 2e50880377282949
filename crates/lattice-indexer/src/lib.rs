//! Lattice Indexer: language extractors, workspace indexing, change detection

pub mod changes;
pub mod extractor;
pub mod graph_builder;
pub mod indexer;
pub mod languages;
pub mod walker;

#[cfg(test)]
pub mod tests;

#[cfg(test)]
pub mod test_utils;

pub use changes::{FieldChange, ModifiedSymbol, SymbolChanges, detect_changes};
pub use extractor::LanguageExtractor;
pub use graph_builder::{build_graph, collect_sources};
pub use indexer::{CancelFlag, IndexError, IndexProgress, IndexReport, SemanticIndexer, UpdateOutcome};
pub use languages::{extract_file, extractor_for, get_extractor};
pub use walker::FileScanner;
