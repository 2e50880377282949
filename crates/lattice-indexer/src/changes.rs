//! Symbol-table diff between two versions of one file

use std::collections::{BTreeMap, BTreeSet};

use lattice_core::{ExtractedEntity, FileParseResult, Language, SymbolKind};
use serde::Serialize;

use crate::languages::extractor_for;

/// A symbol whose name survived but whose declaration kind changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModifiedSymbol {
    pub name: String,
    pub old_kind: SymbolKind,
    pub new_kind: SymbolKind,
}

/// Field-set difference of a class-like symbol present in both versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub symbol: String,
    pub removed: Vec<String>,
    pub added: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SymbolChanges {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<ModifiedSymbol>,
    pub field_changes: Vec<FieldChange>,
    /// One side failed to parse; removals are not reported.
    pub incomplete: bool,
}

impl SymbolChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.modified.is_empty()
            && self.field_changes.is_empty()
    }

    pub fn removed_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.field_changes.iter().flat_map(|change| {
            change
                .removed
                .iter()
                .map(move |field| (change.symbol.as_str(), field.as_str()))
        })
    }
}

struct SymbolTable<'a> {
    kinds: BTreeMap<&'a str, SymbolKind>,
    fields: BTreeMap<&'a str, BTreeSet<&'a str>>,
}

impl<'a> SymbolTable<'a> {
    fn from_entities(entities: &'a [ExtractedEntity]) -> Self {
        let mut kinds = BTreeMap::new();
        let mut fields = BTreeMap::new();
        // Call-registered routes are not declarations.
        for entity in entities.iter().filter(|e| e.kind != SymbolKind::Route) {
            let name = entity.name.as_str();
            if kinds.contains_key(name) {
                continue;
            }
            kinds.insert(name, entity.kind);
            if entity.kind.has_fields() {
                let names = entity.detail.fields().iter().map(|f| f.name.as_str()).collect();
                fields.insert(name, names);
            }
        }
        SymbolTable { kinds, fields }
    }
}

fn parse(content: &str, language: Language) -> FileParseResult {
    // No path: the diff only looks at names, kinds and fields.
    extractor_for(language.family()).extract("", language, content.as_bytes())
}

/// Diff the declarations of `old_content` and `new_content`.
pub fn detect_changes(old_content: &str, new_content: &str, language: Language) -> SymbolChanges {
    let old = parse(old_content, language);
    let new = parse(new_content, language);
    let incomplete = !old.is_parsed() || !new.is_parsed();
    if incomplete {
        tracing::debug!("Symbol diff incomplete: {} content failed to parse", language);
    }

    let before = SymbolTable::from_entities(&old.entities);
    let after = SymbolTable::from_entities(&new.entities);

    let mut changes = SymbolChanges {
        incomplete,
        ..Default::default()
    };

    for (name, kind) in &after.kinds {
        match before.kinds.get(name) {
            None if !old.is_parsed() => {}
            None => changes.added.push(name.to_string()),
            Some(old_kind) if old_kind != kind => changes.modified.push(ModifiedSymbol {
                name: name.to_string(),
                old_kind: *old_kind,
                new_kind: *kind,
            }),
            Some(_) => {}
        }
    }
    if !incomplete {
        changes.removed = before
            .kinds
            .keys()
            .filter(|name| !after.kinds.contains_key(*name))
            .map(|name| name.to_string())
            .collect();
    }

    for (name, new_fields) in &after.fields {
        let Some(old_fields) = before.fields.get(name) else {
            continue;
        };
        let removed: Vec<String> = old_fields.difference(new_fields).map(|f| f.to_string()).collect();
        let added: Vec<String> = new_fields.difference(old_fields).map(|f| f.to_string()).collect();
        if !removed.is_empty() || !added.is_empty() {
            changes.field_changes.push(FieldChange {
                symbol: name.to_string(),
                removed,
                added,
            });
        }
    }

    changes
}
