//! Core data structures for the semantic index and the file graph

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Source-file families. Each family has exactly one extraction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFamily {
    /// Parsed into a real syntax tree.
    Python,
    /// Curly-brace scripts, pattern-scanned.
    Script,
    /// Keyword + braces sources with annotations, pattern-scanned.
    Kotlin,
}

/// Language tag recorded on every parse result and file node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Python,
    TypeScript,
    JavaScript,
    Kotlin,
}

impl Language {
    /// Detect language from file extension. `None` means the file is not indexed.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("py") | Some("pyi") => Some(Language::Python),
            Some("ts") | Some("tsx") => Some(Language::TypeScript),
            Some("js") | Some("jsx") | Some("mjs") | Some("cjs") => Some(Language::JavaScript),
            Some("kt") | Some("kts") => Some(Language::Kotlin),
            _ => None,
        }
    }

    /// Parse a language tag as produced by [`Language::as_str`].
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "python" | "py" => Some(Language::Python),
            "typescript" | "ts" | "tsx" => Some(Language::TypeScript),
            "javascript" | "js" | "jsx" => Some(Language::JavaScript),
            "kotlin" | "kt" => Some(Language::Kotlin),
            _ => None,
        }
    }

    pub fn family(self) -> FileFamily {
        match self {
            Language::Python => FileFamily::Python,
            Language::TypeScript | Language::JavaScript => FileFamily::Script,
            Language::Kotlin => FileFamily::Kotlin,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Kotlin => "kotlin",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role classification of a file, derived from its relative path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Model,
    Dto,
    Route,
    Service,
    Middleware,
    Config,
    Test,
    Migration,
    Util,
    Unknown,
}

impl Category {
    /// The five categories that directly decide an entity's type.
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            Category::Model
                | Category::Dto
                | Category::Route
                | Category::Service
                | Category::Middleware
        )
    }

    /// Entity type implied by a structural category.
    pub fn entity_type(self) -> Option<EntityType> {
        match self {
            Category::Model => Some(EntityType::Model),
            Category::Dto => Some(EntityType::Dto),
            Category::Route => Some(EntityType::Route),
            Category::Service => Some(EntityType::Service),
            Category::Middleware => Some(EntityType::Middleware),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Model => "model",
            Category::Dto => "dto",
            Category::Route => "route",
            Category::Service => "service",
            Category::Middleware => "middleware",
            Category::Config => "config",
            Category::Test => "test",
            Category::Migration => "migration",
            Category::Util => "util",
            Category::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discriminates what role an extracted declaration plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    // ── Role-derived ────────────────────────────────────────
    Model,
    Dto,
    Route,
    Service,
    Middleware,
    Dao,

    // ── Plain declarations ──────────────────────────────────
    Function,
    Class,
    Interface,
    Enum,
    TypeAlias,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Model => "model",
            EntityType::Dto => "dto",
            EntityType::Route => "route",
            EntityType::Service => "service",
            EntityType::Middleware => "middleware",
            EntityType::Dao => "dao",
            EntityType::Function => "function",
            EntityType::Class => "class",
            EntityType::Interface => "interface",
            EntityType::Enum => "enum",
            EntityType::TypeAlias => "type_alias",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        let ty = match tag {
            "model" => EntityType::Model,
            "dto" => EntityType::Dto,
            "route" => EntityType::Route,
            "service" => EntityType::Service,
            "middleware" => EntityType::Middleware,
            "dao" => EntityType::Dao,
            "function" => EntityType::Function,
            "class" => EntityType::Class,
            "interface" => EntityType::Interface,
            "enum" => EntityType::Enum,
            "type_alias" => EntityType::TypeAlias,
            _ => return None,
        };
        Some(ty)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Syntactic kind of a declaration, independent of its role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Class,
    Interface,
    Enum,
    TypeAlias,
    Function,
    /// Singleton `object` declaration.
    Object,
    /// `companion object` nested in a class.
    Companion,
    /// Route registered by call or decorator rather than by declaration.
    Route,
}

impl SymbolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Enum => "enum",
            SymbolKind::TypeAlias => "type_alias",
            SymbolKind::Function => "function",
            SymbolKind::Object => "object",
            SymbolKind::Companion => "companion",
            SymbolKind::Route => "route",
        }
    }

    /// Kinds whose members are tracked as fields.
    pub fn has_fields(self) -> bool {
        matches!(
            self,
            SymbolKind::Class | SymbolKind::Interface | SymbolKind::Object
        )
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed member of a class-like declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub type_annotation: Option<String>,
}

/// A method of a class-like declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    pub params: Vec<String>,
    pub return_type: Option<String>,
    pub decorators: Vec<String>,
}

/// Shape-specific metadata for an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum EntityDetail {
    Class {
        bases: Vec<String>,
        fields: Vec<Field>,
        methods: Vec<Method>,
        decorators: Vec<String>,
    },
    Function {
        params: Vec<String>,
        return_type: Option<String>,
        decorators: Vec<String>,
        is_async: bool,
    },
    Route {
        /// Upper-case HTTP verb, or `ANY` when the registration does not pin one.
        method: String,
        path: String,
        handler: Option<String>,
        decorators: Vec<String>,
    },
    Alias {
        target: String,
    },
}

impl EntityDetail {
    pub fn fields(&self) -> &[Field] {
        match self {
            EntityDetail::Class { fields, .. } => fields,
            _ => &[],
        }
    }
}

/// One extracted structural declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub entity_type: EntityType,
    pub kind: SymbolKind,
    pub name: String,
    /// 1-based, inclusive.
    pub line_start: u32,
    /// 1-based, inclusive.
    pub line_end: u32,
    pub signature: String,
    pub detail: EntityDetail,
    /// Family-specific extras (annotation lists, `implements`, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

/// A raw import statement as written in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawImport {
    /// Module specifier (`.models`, `./user.service`, `com.acme.User`).
    pub source: String,
    /// Names bound by the import, in source order.
    pub names: Vec<String>,
    pub line: u32,
}

/// Whether the extractor understood the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStatus {
    Parsed,
    SyntaxError,
}

/// Everything one extractor pass learns about a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileParseResult {
    pub path: String,
    pub content_hash: String,
    pub language: Language,
    pub status: ParseStatus,
    pub entities: Vec<ExtractedEntity>,
    pub imports: Vec<RawImport>,
    pub exports: Vec<String>,
    /// Declared package/namespace, where the family has one.
    pub namespace: Option<String>,
}

impl FileParseResult {
    /// An empty result, used for unparseable input.
    pub fn empty(path: impl Into<String>, content_hash: String, language: Language, status: ParseStatus) -> Self {
        FileParseResult {
            path: path.into(),
            content_hash,
            language,
            status,
            entities: Vec::new(),
            imports: Vec::new(),
            exports: Vec::new(),
            namespace: None,
        }
    }

    pub fn is_parsed(&self) -> bool {
        self.status == ParseStatus::Parsed
    }
}

/// Input to graph construction: one indexed file and its raw imports.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    /// Workspace-relative path with `/` separators.
    pub relative_path: String,
    pub language: Language,
    pub imports: Vec<RawImport>,
    pub exports: Vec<String>,
    pub namespace: Option<String>,
}

/// A file in the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    /// Absolute path on disk.
    pub path: String,
    pub relative_path: String,
    pub language: Language,
    pub category: Category,
    /// Ordered, unique.
    pub exports: Vec<String>,
    /// Relative paths of indexed files this file imports.
    pub imports: BTreeSet<String>,
    /// Imported symbol → raw module specifier it came from.
    pub imported_symbols: BTreeMap<String, String>,
}
