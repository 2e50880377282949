//! Builds the file-level dependency graph from a workspace on disk

use std::path::Path;

use lattice_core::workspace::canonical_root;
use lattice_core::{Config, DependencyGraph, SourceFile};

use crate::indexer::IndexError;
use crate::languages::extract_file;
use crate::walker::FileScanner;

/// Walk the workspace and collect each file's raw imports and exports.
///
/// Files that fail to read are left out; files that fail to parse become
/// nodes without imports.
pub fn collect_sources(root: &Path, config: &Config) -> Result<Vec<SourceFile>, IndexError> {
    if !root.is_dir() {
        return Err(IndexError::MissingWorkspace(root.to_path_buf()));
    }

    let mut sources = Vec::new();
    for relative in FileScanner::new(root, config)?.scan() {
        let content = match std::fs::read(root.join(&relative)) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", relative, e);
                continue;
            }
        };
        let Some(result) = extract_file(&relative, &content) else {
            continue;
        };
        if !result.is_parsed() {
            tracing::debug!("{} has syntax errors; adding without imports", relative);
        }
        sources.push(SourceFile {
            relative_path: relative,
            language: result.language,
            imports: result.imports,
            exports: result.exports,
            namespace: result.namespace,
        });
    }
    Ok(sources)
}

/// Build the graph for `root` in one pass over its files.
pub fn build_graph(root: impl AsRef<Path>, config: &Config) -> Result<DependencyGraph, IndexError> {
    let root = canonical_root(root.as_ref());
    let sources = collect_sources(&root, config)?;
    let graph = DependencyGraph::from_sources(&root, &sources, &config.resolve);
    tracing::info!(
        "Built dependency graph: {} files, {} edges",
        graph.file_count(),
        graph.edge_count()
    );
    Ok(graph)
}
