//! Import resolution against the indexed file set

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::config::ResolveConfig;
use crate::model::{FileFamily, RawImport, SourceFile};
use crate::workspace::{join_relative, normalize_relative, parent_dir};

const SCRIPT_SUFFIXES: &[&str] = &["", ".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs"];
const SCRIPT_INDEX_FILES: &[&str] = &["index.ts", "index.tsx", "index.js", "index.jsx"];

/// Resolves raw imports to relative paths of indexed files.
///
/// Purely lexical: only the indexed set is consulted, never the disk.
pub struct ImportResolver<'a> {
    files: HashSet<&'a str>,
    /// Kotlin package → files declaring it.
    packages: HashMap<&'a str, Vec<&'a SourceFile>>,
    config: &'a ResolveConfig,
}

impl<'a> ImportResolver<'a> {
    pub fn new(sources: &'a [SourceFile], config: &'a ResolveConfig) -> Self {
        let files = sources.iter().map(|s| s.relative_path.as_str()).collect();
        let mut packages: HashMap<&str, Vec<&SourceFile>> = HashMap::new();
        for source in sources {
            if let Some(ns) = source.namespace.as_deref() {
                packages.entry(ns).or_default().push(source);
            }
        }
        ImportResolver {
            files,
            packages,
            config,
        }
    }

    /// Resolve one import made by `from`. Unresolvable imports yield nothing.
    pub fn resolve(&self, from: &SourceFile, import: &RawImport) -> BTreeSet<String> {
        let mut targets = match from.language.family() {
            FileFamily::Python => self.resolve_python(&from.relative_path, import),
            FileFamily::Script => self.resolve_script(&from.relative_path, &import.source),
            FileFamily::Kotlin => self.resolve_kotlin(&import.source),
        };
        targets.remove(&from.relative_path);
        targets
    }

    fn existing(&self, candidate: &str) -> Option<String> {
        self.files
            .contains(candidate)
            .then(|| candidate.to_string())
    }

    /// `<base>/<dotted>.py` or `<base>/<dotted>/__init__.py`.
    fn python_module(&self, base: &str, dotted: &str) -> Option<String> {
        if dotted.is_empty() {
            return self.existing(&join_relative(base, "__init__.py"));
        }
        let module_path = join_relative(base, &dotted.replace('.', "/"));
        self.existing(&format!("{module_path}.py"))
            .or_else(|| self.existing(&format!("{module_path}.pyi")))
            .or_else(|| self.existing(&format!("{module_path}/__init__.py")))
    }

    fn resolve_python(&self, from: &str, import: &RawImport) -> BTreeSet<String> {
        let source = import.source.as_str();
        let dots = source.chars().take_while(|c| *c == '.').count();
        let rest = &source[dots..];

        let bases: Vec<String> = if dots > 0 {
            let mut base = parent_dir(from).to_string();
            for _ in 1..dots {
                if base.is_empty() {
                    return BTreeSet::new();
                }
                base = parent_dir(&base).to_string();
            }
            vec![base]
        } else {
            let mut bases = vec![parent_dir(from).to_string(), String::new()];
            bases.extend(self.config.source_roots.iter().map(|r| r.trim_matches('/').to_string()));
            bases
        };

        let mut out = BTreeSet::new();
        for base in &bases {
            let module = self.python_module(base, rest);
            let is_package = module.as_deref().is_none_or(|m| m.ends_with("__init__.py"));
            if let Some(module) = module {
                out.insert(module);
            }
            // `from pkg import submodule` binds a module, not a symbol.
            if is_package {
                for name in &import.names {
                    let dotted = if rest.is_empty() {
                        name.clone()
                    } else {
                        format!("{rest}.{name}")
                    };
                    if let Some(sub) = self.python_module(base, &dotted) {
                        out.insert(sub);
                    }
                }
            }
            if !out.is_empty() {
                break;
            }
        }
        out
    }

    fn resolve_script(&self, from: &str, specifier: &str) -> BTreeSet<String> {
        let joined = if specifier.starts_with('.') {
            join_relative(parent_dir(from), specifier)
        } else if let Some((prefix, target)) = self
            .config
            .aliases
            .iter()
            .find(|(prefix, _)| specifier.starts_with(prefix.as_str()))
        {
            format!("{}{}", target, &specifier[prefix.len()..])
        } else {
            // Bare specifier: third-party package.
            return BTreeSet::new();
        };

        let Some(base) = normalize_relative(&joined) else {
            return BTreeSet::new();
        };

        let found = SCRIPT_SUFFIXES
            .iter()
            .map(|suffix| format!("{base}{suffix}"))
            .chain(
                SCRIPT_INDEX_FILES
                    .iter()
                    .map(|index| join_relative(&base, index)),
            )
            .find_map(|candidate| self.existing(&candidate));

        found.into_iter().collect()
    }

    fn resolve_kotlin(&self, qualified: &str) -> BTreeSet<String> {
        if let Some(package) = qualified.strip_suffix(".*") {
            return self
                .packages
                .get(package)
                .map(|files| files.iter().map(|f| f.relative_path.clone()).collect())
                .unwrap_or_default();
        }

        let Some((package, name)) = qualified.rsplit_once('.') else {
            return BTreeSet::new();
        };

        let by_package: BTreeSet<String> = self
            .packages
            .get(package)
            .into_iter()
            .flatten()
            .filter(|f| f.exports.iter().any(|e| e == name))
            .map(|f| f.relative_path.clone())
            .collect();
        if !by_package.is_empty() {
            return by_package;
        }

        let suffix = format!("{}.kt", qualified.replace('.', "/"));
        self.files
            .iter()
            .filter(|f| **f == suffix || f.ends_with(&format!("/{suffix}")))
            .map(|f| f.to_string())
            .collect()
    }
}
