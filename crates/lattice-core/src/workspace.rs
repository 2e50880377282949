//! Workspace layout rules: what is walked, what is skipped, how paths are keyed

use std::path::{Component, Path, PathBuf};

use crate::model::Language;

/// Directories never descended into.
pub const IGNORED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".idea",
    ".vscode",
    ".gradle",
    ".lattice",
    "node_modules",
    "bower_components",
    "vendor",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".ruff_cache",
    ".tox",
    ".venv",
    "venv",
    "env",
    "site-packages",
    "dist",
    "build",
    "out",
    "target",
    "coverage",
    ".next",
    ".nuxt",
    ".turbo",
    ".cache",
];

/// Extensions admitted to the index.
pub const SOURCE_EXTENSIONS: &[&str] = &[
    "py", "pyi", "ts", "tsx", "js", "jsx", "mjs", "cjs", "kt", "kts",
];

/// Check if a directory name is on the block-list.
pub fn is_ignored_dir(name: &str) -> bool {
    IGNORED_DIRS.contains(&name)
}

/// Check if a path is a source file we index.
pub fn is_source_file(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    // Type declaration stubs describe third-party code.
    if path.to_string_lossy().ends_with(".d.ts") {
        return false;
    }
    SOURCE_EXTENSIONS.contains(&ext) && Language::from_path(path).is_some()
}

/// Workspace-relative key with `/` separators.
///
/// Accepts absolute paths under `root` and already-relative paths.
pub fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = if path.is_absolute() {
        path.strip_prefix(root).ok()?
    } else {
        path
    };
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Identifier used to scope store entries to one workspace.
pub fn workspace_key(root: &Path) -> String {
    canonical_root(root).to_string_lossy().into_owned()
}

/// Canonicalized root, falling back to the given path when it cannot be resolved.
pub fn canonical_root(root: &Path) -> PathBuf {
    root.canonicalize().unwrap_or_else(|_| root.to_path_buf())
}

/// Lexically normalize a `/`-separated path, resolving `.` and `..`.
///
/// Returns `None` when `..` would climb above the workspace root.
pub fn normalize_relative(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

/// Directory portion of a relative key (`""` for files at the root).
pub fn parent_dir(relative: &str) -> &str {
    relative.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Join two relative fragments with `/`, skipping empty sides.
pub fn join_relative(base: &str, rest: &str) -> String {
    match (base.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{base}/{rest}"),
    }
}
