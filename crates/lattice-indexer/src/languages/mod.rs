//! Language extractors, one per source-file family

pub mod kotlin;
pub mod python;
pub mod scan;
pub mod script;

use std::path::Path;

use lattice_core::{FileFamily, FileParseResult, Language};

use crate::extractor::LanguageExtractor;

pub use kotlin::KotlinExtractor;
pub use python::PythonExtractor;
pub use script::ScriptExtractor;

static PYTHON: PythonExtractor = PythonExtractor;
static SCRIPT: ScriptExtractor = ScriptExtractor;
static KOTLIN: KotlinExtractor = KotlinExtractor;

/// The extractor responsible for a family.
pub fn extractor_for(family: FileFamily) -> &'static dyn LanguageExtractor {
    match family {
        FileFamily::Python => &PYTHON,
        FileFamily::Script => &SCRIPT,
        FileFamily::Kotlin => &KOTLIN,
    }
}

/// Get the appropriate extractor for a file based on its extension
pub fn get_extractor(path: &Path) -> Option<(Language, &'static dyn LanguageExtractor)> {
    let language = Language::from_path(path)?;
    Some((language, extractor_for(language.family())))
}

/// Extract a workspace-relative file, or `None` for unsupported extensions.
pub fn extract_file(relative_path: &str, content: &[u8]) -> Option<FileParseResult> {
    let (language, extractor) = get_extractor(Path::new(relative_path))?;
    Some(extractor.extract(relative_path, language, content))
}
