//! Workspace walk: which files the indexer sees

use std::path::{Component, Path, PathBuf};

use globset::GlobSet;
use ignore::WalkBuilder;
use lattice_core::{Config, ConfigError, is_ignored_dir, is_source_file, relative_key};

/// Finds indexable source files under a root.
pub struct FileScanner {
    root: PathBuf,
    extra_ignored: Vec<String>,
    exclude: GlobSet,
}

impl FileScanner {
    pub fn new(root: impl AsRef<Path>, config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            root: root.as_ref().to_path_buf(),
            extra_ignored: config.index.extra_ignored_dirs.clone(),
            exclude: config.exclude_set()?,
        })
    }

    /// Whether a workspace-relative path belongs in the index.
    ///
    /// Both the full walk and single-file updates go through this check.
    pub fn is_indexed(&self, relative: &str) -> bool {
        let path = Path::new(relative);
        if !is_source_file(path) {
            return false;
        }
        let in_skipped_dir = path
            .parent()
            .into_iter()
            .flat_map(|p| p.components())
            .any(|c| matches!(c, Component::Normal(name) if name.to_str().is_some_and(|n| self.is_skipped_dir(n))));
        if in_skipped_dir {
            return false;
        }
        if self.exclude.is_match(relative) {
            tracing::debug!("Excluded by config: {}", relative);
            return false;
        }
        true
    }

    fn is_skipped_dir(&self, name: &str) -> bool {
        is_ignored_dir(name) || self.extra_ignored.iter().any(|d| d == name)
    }

    /// Workspace-relative paths of every source file, sorted.
    ///
    /// Only the fixed block-list and configured excludes apply; VCS ignore
    /// files are not consulted so results do not depend on git state.
    pub fn scan(&self) -> Vec<String> {
        let mut files = Vec::new();

        let extra = self.extra_ignored.clone();
        let mut builder = WalkBuilder::new(&self.root);
        builder.standard_filters(false).follow_links(false);
        builder.filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            let name = entry.file_name().to_string_lossy();
            !(is_dir && entry.depth() > 0 && (is_ignored_dir(&name) || extra.iter().any(|d| *d == name)))
        });

        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Failed to read entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let Some(relative) = relative_key(&self.root, entry.path()) else {
                continue;
            };
            if self.is_indexed(&relative) {
                files.push(relative);
            }
        }

        files.sort();
        tracing::debug!("Found {} source files under {}", files.len(), self.root.display());
        files
    }
}
