//! CLI command implementations

use anyhow::Context;
use lattice_core::{EntityType, MemoryStore};
use lattice_impact::{ChangeImpact, FileChange, ImpactAnalyzer};
use lattice_indexer::SemanticIndexer;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub fn index(root: &Path, json: bool) -> anyhow::Result<()> {
    tracing::info!("Indexing workspace: {}", root.display());

    let mut indexer = SemanticIndexer::new(root, MemoryStore::new())
        .with_context(|| format!("Failed to open workspace {}", root.display()))?;
    let report = indexer
        .full_index(|progress| {
            tracing::debug!("{}/{} files processed", progress.processed, progress.total);
        })
        .context("Indexing failed")?;

    if json {
        return print_json(&report);
    }

    println!(
        "{} files: {} indexed ({} unchanged), {} skipped, {} removed",
        report.files_total, report.indexed, report.unchanged, report.skipped, report.removed
    );
    println!("{} entities", report.entities_found);
    for (entity_type, count) in &report.by_type {
        println!("  {entity_type:<12} {count}");
    }
    for file in &report.skipped_files {
        println!("  skipped: {file}");
    }
    Ok(())
}

pub fn deps(root: &Path, file: &Path, json: bool) -> anyhow::Result<()> {
    let mut analyzer = open_analyzer(root)?;
    let file = workspace_path(file);
    let info = analyzer
        .get_file_info(&file)?
        .with_context(|| format!("{} is not an indexed source file", file.display()))?;

    if json {
        return print_json(&info);
    }

    println!("{} [{}, {}]", info.file, info.language, info.category);
    if !info.exports.is_empty() {
        println!("exports: {}", info.exports.join(", "));
    }
    println!("depends on ({}):", info.dependencies.len());
    for dep in &info.dependencies {
        println!("  {dep}");
    }
    println!("depended on by ({}):", info.dependents.len());
    for dep in &info.dependents {
        println!("  {dep}");
    }
    Ok(())
}

pub fn impact(
    root: &Path,
    files: &[PathBuf],
    versions: Option<(PathBuf, PathBuf)>,
    json: bool,
) -> anyhow::Result<()> {
    let mut analyzer = open_analyzer(root)?;

    if let [file] = files {
        let contents = match &versions {
            Some((old, new)) => Some((read(old)?, read(new)?)),
            None => None,
        };
        let (old, new) = match &contents {
            Some((old, new)) => (Some(old.as_str()), Some(new.as_str())),
            None => (None, None),
        };
        let impact = analyzer.analyze_change(workspace_path(file), old, new)?;
        if json {
            return print_json(&impact);
        }
        print_impact(&impact);
        return Ok(());
    }

    if versions.is_some() {
        anyhow::bail!("--old/--new apply to a single file");
    }
    let changes: Vec<FileChange> = files.iter().map(|f| FileChange::new(workspace_path(f))).collect();
    let combined = analyzer.analyze_multiple_changes(&changes)?;
    if json {
        return print_json(&combined);
    }

    for impact in &combined.changes {
        print_impact(impact);
        println!();
    }
    println!(
        "Combined risk: {:.2} ({}), {} files affected",
        combined.combined_risk_score,
        combined.combined_risk_level,
        combined.affected_files.len()
    );
    for (file, coupled) in &combined.cross_file_impacts {
        println!("  {file} is imported by changed files: {}", coupled.join(", "));
    }
    Ok(())
}

pub fn summary(root: &Path, json: bool) -> anyhow::Result<()> {
    let mut analyzer = open_analyzer(root)?;
    let summary = analyzer.get_graph_summary()?;

    if json {
        return print_json(&summary);
    }

    println!("{} files, {} edges", summary.total_files, summary.total_edges);
    for (category, count) in &summary.categories {
        println!("  {category:<12} {count}");
    }
    println!("Most depended on:");
    for (file, count) in &summary.most_depended_on {
        println!("  {count:>4}  {file}");
    }
    println!("Most dependencies:");
    for (file, count) in &summary.most_dependencies {
        println!("  {count:>4}  {file}");
    }
    if !summary.isolated.is_empty() {
        println!("Isolated:");
        for file in &summary.isolated {
            println!("  {file}");
        }
    }
    Ok(())
}

pub fn entities(root: &Path, entity_type: Option<EntityType>, json: bool) -> anyhow::Result<()> {
    let mut indexer = SemanticIndexer::new(root, MemoryStore::new())
        .with_context(|| format!("Failed to open workspace {}", root.display()))?;
    indexer.full_index(|_| {}).context("Indexing failed")?;
    let entities = indexer.get_entities(entity_type)?;

    if json {
        return print_json(&entities);
    }

    for stored in &entities {
        let entity = &stored.entity;
        println!(
            "{}:{}-{}  {:<10} {}",
            stored.file, entity.line_start, entity.line_end, entity.entity_type, entity.name
        );
    }
    tracing::info!("{} entities", entities.len());
    Ok(())
}

fn open_analyzer(root: &Path) -> anyhow::Result<ImpactAnalyzer> {
    let mut analyzer = ImpactAnalyzer::new(root)
        .with_context(|| format!("Failed to open workspace {}", root.display()))?;
    let graph = analyzer.build_graph().context("Failed to build dependency graph")?;
    tracing::info!("Graph: {} files, {} edges", graph.file_count(), graph.edge_count());
    Ok(analyzer)
}

/// Paths that exist relative to the current directory are made absolute;
/// anything else is taken as workspace-relative.
fn workspace_path(file: &Path) -> PathBuf {
    file.canonicalize().unwrap_or_else(|_| file.to_path_buf())
}

fn read(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn print_impact(impact: &ChangeImpact) {
    println!(
        "{} [{}]: risk {:.2} ({}), {} files affected",
        impact.file,
        impact.category,
        impact.risk_score,
        impact.risk_level,
        impact.affected_files.len()
    );
    for file in &impact.affected_files {
        println!("  affects: {file}");
    }
    for message in &impact.breaking_changes {
        println!("  BREAKING: {message}");
    }
    for message in &impact.warnings {
        println!("  warning: {message}");
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
