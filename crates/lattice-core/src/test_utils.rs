//! Test utilities for Lattice Core

use std::path::Path;

use crate::model::{Language, RawImport, SourceFile};

/// A source file with imports given as `(specifier, names)` pairs.
pub fn source(relative_path: &str, imports: &[(&str, &[&str])]) -> SourceFile {
    let language = Language::from_path(Path::new(relative_path)).unwrap_or(Language::Python);
    SourceFile {
        relative_path: relative_path.to_string(),
        language,
        imports: imports
            .iter()
            .enumerate()
            .map(|(i, (spec, names))| RawImport {
                source: spec.to_string(),
                names: names.iter().map(|n| n.to_string()).collect(),
                line: i as u32 + 1,
            })
            .collect(),
        exports: Vec::new(),
        namespace: None,
    }
}

/// A Kotlin source declaring `package` and exporting `exports`.
pub fn kotlin_source(relative_path: &str, package: &str, exports: &[&str], imports: &[&str]) -> SourceFile {
    SourceFile {
        relative_path: relative_path.to_string(),
        language: Language::Kotlin,
        imports: imports
            .iter()
            .map(|spec| RawImport {
                source: spec.to_string(),
                names: spec.rsplit('.').next().map(|n| vec![n.to_string()]).unwrap_or_default(),
                line: 1,
            })
            .collect(),
        exports: exports.iter().map(|e| e.to_string()).collect(),
        namespace: Some(package.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_language_from_extension() {
        assert_eq!(source("a/b.ts", &[]).language, Language::TypeScript);
        assert_eq!(source("a/b.py", &[("os", &[])]).imports.len(), 1);
    }
}
