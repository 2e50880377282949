//! Workspace configuration loaded from `lattice.toml`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Config file name, looked up at the workspace root.
pub const CONFIG_FILE: &str = "lattice.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid exclude pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub index: IndexConfig,
    pub resolve: ResolveConfig,
    pub impact: ImpactConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Extra glob patterns (relative to the root) to leave out of the index.
    pub exclude: Vec<String>,
    /// Extra directory names added to the built-in block-list.
    pub extra_ignored_dirs: Vec<String>,
    /// Progress notification cadence, in percent of files processed.
    pub progress_step_percent: u8,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            exclude: Vec::new(),
            extra_ignored_dirs: Vec::new(),
            progress_step_percent: 5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Extra roots for absolute Python imports (e.g. `src`).
    pub source_roots: Vec<String>,
    /// Script import prefixes mapped to root-relative directories (`"@/" = "src/"`).
    pub aliases: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactConfig {
    /// Depth of the reverse-edge traversal for blast radius.
    pub max_depth: usize,
    /// Entries in each ranked list of the graph summary.
    pub top_n: usize,
}

impl Default for ImpactConfig {
    fn default() -> Self {
        ImpactConfig {
            max_depth: 3,
            top_n: 10,
        }
    }
}

impl Config {
    /// Load `lattice.toml` from `root`, or defaults when the file is absent.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Config::default());
        }
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Compile the `exclude` patterns.
    pub fn exclude_set(&self) -> Result<GlobSet, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.index.exclude {
            let glob = Glob::new(pattern).map_err(|source| ConfigError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
            builder.add(glob);
        }
        builder.build().map_err(|source| ConfigError::Pattern {
            pattern: self.index.exclude.join(", "),
            source,
        })
    }
}
