//! Change impact analysis over the dependency graph

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use lattice_core::workspace::canonical_root;
use lattice_core::{
    Category, Config, DependencyGraph, GraphSummary, Language, classify, relative_key,
};
use lattice_indexer::{IndexError, SymbolChanges, build_graph, detect_changes};
use serde::Serialize;
use thiserror::Error;

use crate::risk::{RiskLevel, risk_score};

#[derive(Debug, Error)]
pub enum ImpactError {
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("{0} is outside the workspace")]
    OutsideWorkspace(PathBuf),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImpactDetails {
    /// Present when both content versions were supplied.
    pub symbol_changes: Option<SymbolChanges>,
    /// Affected file → BFS depth.
    pub impact_radius: BTreeMap<String, usize>,
    pub affected_categories: BTreeMap<Category, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeImpact {
    pub file: String,
    pub category: Category,
    pub language: Option<Language>,
    /// Whether the file was in the graph; if not, the category came from its path.
    pub indexed: bool,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub affected_files: Vec<String>,
    pub breaking_changes: Vec<String>,
    pub warnings: Vec<String>,
    pub details: ImpactDetails,
}

/// One file in a change set.
#[derive(Debug, Clone, Default)]
pub struct FileChange {
    pub file: PathBuf,
    pub old_content: Option<String>,
    pub new_content: Option<String>,
}

impl FileChange {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            ..Default::default()
        }
    }

    pub fn with_contents(file: impl Into<PathBuf>, old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            old_content: Some(old.into()),
            new_content: Some(new.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiChangeImpact {
    pub changes: Vec<ChangeImpact>,
    /// Maximum of the per-file scores.
    pub combined_risk_score: f64,
    pub combined_risk_level: RiskLevel,
    /// Union of every change's affected files.
    pub affected_files: Vec<String>,
    /// Changed file → other changed files among its direct dependents.
    pub cross_file_impacts: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileInfo {
    pub file: String,
    pub language: Language,
    pub category: Category,
    pub exports: Vec<String>,
    pub dependencies: BTreeSet<String>,
    pub dependents: BTreeSet<String>,
    pub imported_symbols: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DependencyMap {
    pub forward: BTreeMap<String, BTreeSet<String>>,
    pub reverse: BTreeMap<String, BTreeSet<String>>,
    pub categories: BTreeMap<String, Category>,
}

/// Answers "what breaks if this file changes" for one workspace.
///
/// The graph is built on first use and reused until [`ImpactAnalyzer::build_graph`]
/// is called again.
pub struct ImpactAnalyzer {
    root: PathBuf,
    config: Config,
    graph: Option<DependencyGraph>,
}

impl ImpactAnalyzer {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, ImpactError> {
        let config = Config::load(root.as_ref()).map_err(IndexError::from)?;
        Ok(Self::with_config(root, config))
    }

    pub fn with_config(root: impl AsRef<Path>, config: Config) -> Self {
        Self {
            root: canonical_root(root.as_ref()),
            config,
            graph: None,
        }
    }

    /// Analyze against an already built graph.
    pub fn with_graph(graph: DependencyGraph, config: Config) -> Self {
        Self {
            root: graph.root().to_path_buf(),
            config,
            graph: Some(graph),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Rebuild the graph from disk, replacing any previous snapshot.
    pub fn build_graph(&mut self) -> Result<&DependencyGraph, ImpactError> {
        let graph = build_graph(&self.root, &self.config)?;
        Ok(self.graph.insert(graph))
    }

    /// The current graph, building it if none exists yet.
    pub fn graph(&mut self) -> Result<&DependencyGraph, ImpactError> {
        let graph = match self.graph.take() {
            Some(graph) => graph,
            None => build_graph(&self.root, &self.config)?,
        };
        Ok(self.graph.insert(graph))
    }

    /// Score a prospective change to `file`.
    ///
    /// When both contents are given the symbol diff feeds the score and the
    /// breaking-change list; otherwise only the blast radius counts.
    pub fn analyze_change(
        &mut self,
        file: impl AsRef<Path>,
        old_content: Option<&str>,
        new_content: Option<&str>,
    ) -> Result<ChangeImpact, ImpactError> {
        let key = self.key(file.as_ref())?;
        let max_depth = self.config.impact.max_depth;
        let graph = self.graph()?;

        let (category, language, indexed) = match graph.node(&key) {
            Some(node) => (node.category, Some(node.language), true),
            None => {
                tracing::debug!("{} not in graph; classifying by path", key);
                (classify(&key), Language::from_path(Path::new(&key)), false)
            }
        };

        let impact_radius = graph.get_impact_radius(&key, max_depth);
        let affected_files: Vec<String> = impact_radius.keys().cloned().collect();
        let mut affected_categories = BTreeMap::new();
        for affected in &affected_files {
            let category = graph.node(affected).map_or_else(|| classify(affected), |n| n.category);
            *affected_categories.entry(category).or_insert(0) += 1;
        }

        let symbol_changes = match (old_content, new_content, language) {
            (Some(old), Some(new), Some(language)) => Some(detect_changes(old, new, language)),
            (Some(_), Some(_), None) => {
                tracing::debug!("No extractor for {}; skipping symbol diff", key);
                None
            }
            _ => None,
        };

        let affected = affected_files.len();
        let risk_score = risk_score(category, affected, symbol_changes.as_ref());
        let breaking_changes = breaking_changes(category, affected, symbol_changes.as_ref());
        let warnings = warnings(category, affected, symbol_changes.as_ref());

        tracing::info!(
            "Impact of {}: {} files affected, risk {:.2} ({})",
            key,
            affected,
            risk_score,
            RiskLevel::from_score(risk_score)
        );

        Ok(ChangeImpact {
            file: key,
            category,
            language,
            indexed,
            risk_score,
            risk_level: RiskLevel::from_score(risk_score),
            affected_files,
            breaking_changes,
            warnings,
            details: ImpactDetails {
                symbol_changes,
                impact_radius,
                affected_categories,
            },
        })
    }

    /// Analyze a change set; the combined score is the worst single score.
    pub fn analyze_multiple_changes(&mut self, changes: &[FileChange]) -> Result<MultiChangeImpact, ImpactError> {
        let mut impacts = Vec::with_capacity(changes.len());
        for change in changes {
            impacts.push(self.analyze_change(
                &change.file,
                change.old_content.as_deref(),
                change.new_content.as_deref(),
            )?);
        }

        let combined_risk_score = impacts.iter().map(|i| i.risk_score).fold(0.0, f64::max);
        let affected_files: BTreeSet<String> = impacts
            .iter()
            .flat_map(|i| i.affected_files.iter().cloned())
            .collect();

        let changed: BTreeSet<&str> = impacts.iter().map(|i| i.file.as_str()).collect();
        let graph = self.graph()?;
        let mut cross_file_impacts = BTreeMap::new();
        for impact in &impacts {
            let coupled: Vec<String> = graph
                .get_dependents(&impact.file)
                .into_iter()
                .filter(|d| d != &impact.file && changed.contains(d.as_str()))
                .collect();
            if !coupled.is_empty() {
                cross_file_impacts.insert(impact.file.clone(), coupled);
            }
        }

        Ok(MultiChangeImpact {
            combined_risk_level: RiskLevel::from_score(combined_risk_score),
            combined_risk_score,
            affected_files: affected_files.into_iter().collect(),
            cross_file_impacts,
            changes: impacts,
        })
    }

    /// Graph view of one file, or `None` when it is not indexed.
    pub fn get_file_info(&mut self, file: impl AsRef<Path>) -> Result<Option<FileInfo>, ImpactError> {
        let key = self.key(file.as_ref())?;
        let graph = self.graph()?;
        Ok(graph.node(&key).map(|node| FileInfo {
            file: node.relative_path.clone(),
            language: node.language,
            category: node.category,
            exports: node.exports.clone(),
            dependencies: graph.get_dependencies(&key),
            dependents: graph.get_dependents(&key),
            imported_symbols: node.imported_symbols.clone(),
        }))
    }

    pub fn get_dependency_map(&mut self) -> Result<DependencyMap, ImpactError> {
        let graph = self.graph()?;
        Ok(DependencyMap {
            forward: graph.forward_map(),
            reverse: graph.reverse_map(),
            categories: graph
                .nodes()
                .map(|n| (n.relative_path.clone(), n.category))
                .collect(),
        })
    }

    pub fn get_graph_summary(&mut self) -> Result<GraphSummary, ImpactError> {
        let top_n = self.config.impact.top_n;
        Ok(self.graph()?.get_graph_summary(top_n))
    }

    fn key(&self, file: &Path) -> Result<String, ImpactError> {
        relative_key(&self.root, file).ok_or_else(|| ImpactError::OutsideWorkspace(file.to_path_buf()))
    }
}

fn breaking_changes(category: Category, affected: usize, changes: Option<&SymbolChanges>) -> Vec<String> {
    let Some(changes) = changes else {
        return Vec::new();
    };
    let mut messages: Vec<String> = changes
        .removed
        .iter()
        .map(|name| format!("Symbol '{name}' removed; {affected} files may break"))
        .collect();

    match category {
        Category::Model | Category::Dto => {
            messages.extend(changes.removed_fields().map(|(symbol, field)| {
                format!("Field '{field}' removed from {category} '{symbol}'; {affected} files may break")
            }));
        }
        Category::Route => {
            messages.extend(
                changes
                    .removed
                    .iter()
                    .map(|name| format!("Route handler '{name}' removed; API consumers affected")),
            );
        }
        _ => {}
    }
    messages
}

fn warnings(category: Category, affected: usize, changes: Option<&SymbolChanges>) -> Vec<String> {
    let mut warnings = Vec::new();
    if affected > 10 {
        warnings.push(format!("Large blast radius: {affected} files affected"));
    }
    match category {
        Category::Model => {
            warnings.push("Model change: verify migrations and DTOs are still consistent".to_string())
        }
        Category::Config => {
            warnings.push("Configuration change: behavior may differ across environments".to_string())
        }
        Category::Middleware => {
            warnings.push("Middleware change: affects every request it wraps".to_string())
        }
        _ => {}
    }
    if changes.is_some_and(|c| c.incomplete) {
        warnings.push("Symbol diff incomplete: one version failed to parse".to_string());
    }
    warnings
}
