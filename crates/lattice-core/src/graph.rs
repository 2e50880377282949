//! File dependency graph using petgraph::DiGraph keyed by relative path

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::path::{Path, PathBuf};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use crate::classifier::classify;
use crate::config::ResolveConfig;
use crate::model::{Category, FileNode, SourceFile};
use crate::resolve::ImportResolver;
use crate::workspace::relative_key;

/// Aggregate view of the graph for dashboards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSummary {
    pub total_files: usize,
    pub total_edges: usize,
    pub categories: BTreeMap<Category, usize>,
    /// Files with the most dependents, descending.
    pub most_depended_on: Vec<(String, usize)>,
    /// Files with the most outgoing dependencies, descending.
    pub most_dependencies: Vec<(String, usize)>,
    /// Non-test files with no edges in either direction.
    pub isolated: Vec<String>,
}

/// The file graph. Edges point importer → imported.
///
/// Immutable once built; rebuild to refresh.
pub struct DependencyGraph {
    root: PathBuf,
    inner: DiGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
    nodes: BTreeMap<String, FileNode>,
}

impl std::fmt::Debug for DependencyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyGraph")
            .field("root", &self.root)
            .field("file_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl DependencyGraph {
    /// An empty graph rooted at `root`.
    pub fn empty(root: impl Into<PathBuf>) -> Self {
        DependencyGraph {
            root: root.into(),
            inner: DiGraph::new(),
            index: HashMap::new(),
            nodes: BTreeMap::new(),
        }
    }

    /// Build from the indexed files of a workspace.
    ///
    /// Phase 1 creates one node per file; phase 2 resolves imports and adds
    /// an edge per resolved target. Unresolved imports leave no trace.
    pub fn from_sources(root: &Path, sources: &[SourceFile], config: &ResolveConfig) -> Self {
        let mut graph = DependencyGraph::empty(root);

        for source in sources {
            let mut exports: Vec<String> = Vec::with_capacity(source.exports.len());
            for name in &source.exports {
                if !exports.contains(name) {
                    exports.push(name.clone());
                }
            }
            let node = FileNode {
                path: root.join(&source.relative_path).to_string_lossy().into_owned(),
                relative_path: source.relative_path.clone(),
                language: source.language,
                category: classify(&source.relative_path),
                exports,
                imports: BTreeSet::new(),
                imported_symbols: BTreeMap::new(),
            };
            let idx = graph.inner.add_node(source.relative_path.clone());
            graph.index.insert(source.relative_path.clone(), idx);
            graph.nodes.insert(source.relative_path.clone(), node);
        }

        let resolver = ImportResolver::new(sources, config);
        let mut dropped = 0usize;
        for source in sources {
            let mut targets = BTreeSet::new();
            let mut symbols = BTreeMap::new();
            for import in &source.imports {
                let resolved = resolver.resolve(source, import);
                if resolved.is_empty() {
                    dropped += 1;
                }
                for name in &import.names {
                    symbols.insert(name.clone(), import.source.clone());
                }
                targets.extend(resolved);
            }

            let from = graph.index[&source.relative_path];
            for target in &targets {
                if let Some(&to) = graph.index.get(target) {
                    graph.inner.update_edge(from, to, ());
                }
            }
            if let Some(node) = graph.nodes.get_mut(&source.relative_path) {
                node.imports = targets;
                node.imported_symbols = symbols;
            }
        }

        tracing::debug!(
            "Built graph: {} files, {} edges, {} unresolved imports dropped",
            graph.inner.node_count(),
            graph.inner.edge_count(),
            dropped
        );
        graph
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Relative key for a path; absolute paths must lie under the root.
    pub fn key(&self, file: impl AsRef<Path>) -> Option<String> {
        relative_key(&self.root, file.as_ref())
    }

    pub fn file_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn contains(&self, file: impl AsRef<Path>) -> bool {
        self.key(file).is_some_and(|k| self.index.contains_key(&k))
    }

    pub fn node(&self, file: impl AsRef<Path>) -> Option<&FileNode> {
        self.nodes.get(&self.key(file)?)
    }

    /// Iterate over all file nodes in path order.
    pub fn nodes(&self) -> impl Iterator<Item = &FileNode> {
        self.nodes.values()
    }

    fn neighbors(&self, file: impl AsRef<Path>, direction: Direction) -> BTreeSet<String> {
        let Some(&idx) = self.key(file).and_then(|k| self.index.get(&k)) else {
            return BTreeSet::new();
        };
        self.inner
            .neighbors_directed(idx, direction)
            .map(|n| self.inner[n].clone())
            .collect()
    }

    /// Files that `file` imports.
    pub fn get_dependencies(&self, file: impl AsRef<Path>) -> BTreeSet<String> {
        self.neighbors(file, Direction::Outgoing)
    }

    /// Files that import `file`.
    pub fn get_dependents(&self, file: impl AsRef<Path>) -> BTreeSet<String> {
        self.neighbors(file, Direction::Incoming)
    }

    /// Breadth-first walk over reverse edges from `file`, up to `max_depth`.
    ///
    /// Returns each reached file with the depth it was first seen at. The
    /// start file itself is not included.
    pub fn get_impact_radius(&self, file: impl AsRef<Path>, max_depth: usize) -> BTreeMap<String, usize> {
        let mut radius = BTreeMap::new();
        let Some(&start) = self.key(file).and_then(|k| self.index.get(&k)) else {
            return radius;
        };

        let mut visited = vec![false; self.inner.node_count()];
        visited[start.index()] = true;
        let mut queue = VecDeque::from([(start, 0usize)]);

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for next in self.inner.neighbors_directed(current, Direction::Incoming) {
                if visited[next.index()] {
                    continue;
                }
                visited[next.index()] = true;
                radius.insert(self.inner[next].clone(), depth + 1);
                queue.push_back((next, depth + 1));
            }
        }
        radius
    }

    /// importer → imported, sorted.
    pub fn forward_map(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.edge_map(Direction::Outgoing)
    }

    /// imported → importers, sorted.
    pub fn reverse_map(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.edge_map(Direction::Incoming)
    }

    fn edge_map(&self, direction: Direction) -> BTreeMap<String, BTreeSet<String>> {
        self.inner
            .node_indices()
            .map(|idx| {
                let targets = self
                    .inner
                    .neighbors_directed(idx, direction)
                    .map(|n| self.inner[n].clone())
                    .collect();
                (self.inner[idx].clone(), targets)
            })
            .collect()
    }

    pub fn get_graph_summary(&self, top_n: usize) -> GraphSummary {
        let mut categories = BTreeMap::new();
        for node in self.nodes.values() {
            *categories.entry(node.category).or_insert(0) += 1;
        }

        let degree = |direction: Direction| {
            let mut ranked: Vec<(String, usize)> = self
                .inner
                .node_indices()
                .map(|idx| {
                    let count = self.inner.neighbors_directed(idx, direction).count();
                    (self.inner[idx].clone(), count)
                })
                .filter(|(_, count)| *count > 0)
                .collect();
            ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            ranked.truncate(top_n);
            ranked
        };

        let isolated = self
            .nodes
            .values()
            .filter(|node| node.category != Category::Test)
            .filter(|node| {
                let idx = self.index[&node.relative_path];
                self.inner.neighbors_undirected(idx).next().is_none()
            })
            .map(|node| node.relative_path.clone())
            .collect();

        GraphSummary {
            total_files: self.inner.node_count(),
            total_edges: self.inner.edge_count(),
            categories,
            most_depended_on: degree(Direction::Incoming),
            most_dependencies: degree(Direction::Outgoing),
            isolated,
        }
    }
}
