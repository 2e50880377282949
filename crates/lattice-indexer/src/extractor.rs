//! Language extractor trait definition

use lattice_core::{FileParseResult, Language};

/// One extraction strategy per source-file family.
///
/// Extractors never fail: malformed input yields a partial result, or an
/// empty one with [`lattice_core::ParseStatus::SyntaxError`] for families
/// that can tell.
pub trait LanguageExtractor: Send + Sync {
    /// Extract entities, imports and exports from `content`.
    ///
    /// `path` is workspace-relative and only used for classification and
    /// for the returned record; `language` picks the tag when a family
    /// covers several languages.
    fn extract(&self, path: &str, language: Language, content: &[u8]) -> FileParseResult;
}
