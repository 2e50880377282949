//! Kotlin extractor: ordered regular expressions plus annotation look-back

use std::sync::LazyLock;

use lattice_core::{
    Category, EntityDetail, EntityType, ExtractedEntity, Field, FileParseResult,
    Language, Method, ParseStatus, RawImport, SymbolKind, classify, content_hash,
};
use regex::{Captures, Regex};

use super::scan::{
    LineIndex, annotation_names, annotations_above, block_end, classify_declaration, header,
    join_route, line_depths, split_top_level,
};
use crate::extractor::LanguageExtractor;

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("kotlin pattern")
}

static PACKAGE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?m)^[ \t]*package\s+(?P<name>[\w.]+)"));
static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?m)^[ \t]*import\s+(?P<path>[\w.]+?(?:\.\*)?)(?:\s+as\s+(?P<alias>\w+))?[ \t]*;?[ \t]*$")
});

static CLASS_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?m)^[ \t]*(?P<inline>(?:@[\w.:]+(?:\([^)\n]*\))?\s+)*)(?P<mods>(?:(?:public|private|internal|protected|open|abstract|sealed|data|enum|annotation|inner|value|inline|final|expect|actual)\s+)*)(?P<keyword>class|interface|object|fun\s+interface)\s+(?P<name>[A-Za-z_]\w*)(?:\s*<[^>{(\n]*>)?")
});
static COMPANION: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?m)^[ \t]*(?:(?:public|private|internal|protected)\s+)?companion\s+object(?:\s+(?P<name>[A-Za-z_]\w*))?")
});
static TYPEALIAS: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?m)^[ \t]*(?P<mods>(?:(?:public|private|internal)\s+)*)typealias\s+(?P<name>[A-Za-z_]\w*)(?:\s*<[^>=]*>)?\s*=\s*(?P<target>[^\n]+)")
});
static FUN: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?m)^[ \t]*(?P<inline>(?:@[\w.:]+(?:\([^)\n]*\))?\s+)*)(?P<mods>(?:(?:public|private|internal|protected|open|abstract|override|suspend|inline|operator|infix|tailrec|external|actual|expect|final)\s+)*)fun\s+(?:<[^>]*>\s*)?(?:(?P<receiver>[\w.<>?, ]+?)\.)?(?P<name>[A-Za-z_]\w*)\s*\((?P<params>[^)]*)\)(?:\s*:\s*(?P<ret>[^={\n]+?))?[ \t]*(?:[={]|$)")
});
static PROPERTY: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?m)^[ \t]*(?:@[\w.:]+(?:\([^)\n]*\))?\s+)*(?:(?:private|public|internal|protected|override|open|lateinit|const|abstract|final)\s+)*(?:val|var)\s+(?P<name>[A-Za-z_]\w*)(?:\s*:\s*(?P<ty>[^=\n{]+))?")
});

// ── Routes ───────────────────────────────────────────────────

static KTOR_ROUTE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r#"(?m)^[ \t]*(?P<verb>get|post|put|delete|patch|head|options)\s*(?:<[^>\n]*>)?\s*\(\s*"(?P<path>[^"]*)"\s*\)\s*\{"#)
});
static KTOR_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| pattern(r#"(?m)^[ \t]*route\s*\(\s*"(?P<path>[^"]*)"\s*\)\s*\{"#));
static SPRING_MAPPING: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r#"(?m)^[ \t]*@(?P<verb>Get|Post|Put|Delete|Patch|Request)Mapping(?:\((?P<args>[^)]*)\))?"#)
});
static CLASS_MAPPING: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"@RequestMapping(?:\((?P<args>[^)]*)\))?"));
static QUOTED: LazyLock<Regex> = LazyLock::new(|| pattern(r#""(?P<value>[^"]*)""#));
static REQUEST_METHOD: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"RequestMethod\.(?P<verb>[A-Z]+)"));

/// Annotations that decide an entity's role outright.
const ANNOTATION_TYPES: &[(&str, EntityType)] = &[
    ("Entity", EntityType::Model),
    ("Table", EntityType::Model),
    ("Dao", EntityType::Dao),
    ("Repository", EntityType::Dao),
    ("Composable", EntityType::Route),
    ("RestController", EntityType::Route),
    ("Controller", EntityType::Route),
    ("Serializable", EntityType::Dto),
    ("Service", EntityType::Service),
];

pub struct KotlinExtractor;

fn annotation_type(annotations: &[String]) -> Option<EntityType> {
    annotations.iter().find_map(|a| {
        let simple = a.rsplit('.').next().unwrap_or(a);
        ANNOTATION_TYPES
            .iter()
            .find(|(name, _)| *name == simple)
            .map(|(_, ty)| *ty)
    })
}

/// Parameter names: the last word before the type, dropping `val`, `vararg`, annotations.
fn param_names(list: &str) -> Vec<String> {
    split_top_level(list)
        .iter()
        .filter_map(|p| p.split(':').next())
        .filter_map(|p| p.split_whitespace().last())
        .map(str::to_string)
        .collect()
}

/// `val`/`var` constructor parameters, which are properties.
fn constructor_fields(list: &str) -> Vec<Field> {
    split_top_level(list)
        .iter()
        .filter_map(|p| {
            let declared = p
                .split_once("val ")
                .or_else(|| p.split_once("var "))
                .map(|(_, rest)| rest)?;
            let declared = declared.split('=').next().unwrap_or(declared);
            let (name, ty) = match declared.split_once(':') {
                Some((name, ty)) => (name.trim(), Some(ty.trim().to_string())),
                None => (declared.trim(), None),
            };
            Some(Field {
                name: name.to_string(),
                type_annotation: ty.filter(|t| !t.is_empty()),
            })
        })
        .collect()
}

fn simple_type_name(name: &str) -> String {
    name.split(['(', '<'])
        .next()
        .unwrap_or(name)
        .split(" by ")
        .next()
        .unwrap_or(name)
        .trim()
        .to_string()
}

/// Primary constructor and supertypes following a class name.
struct ClassHeader {
    constructor: Option<String>,
    supertypes: Vec<String>,
}

fn class_header(text: &str, from: usize) -> ClassHeader {
    let bytes = text.as_bytes();
    let mut parens = 0i32;
    let mut ctor_start = None;
    let mut ctor_end = None;
    let mut colon = None;
    let mut end = bytes.len();

    for pos in from..bytes.len() {
        match bytes[pos] {
            b'(' => {
                if parens == 0 && ctor_start.is_none() && colon.is_none() {
                    ctor_start = Some(pos + 1);
                }
                parens += 1;
            }
            b')' => {
                parens -= 1;
                if parens == 0 && ctor_end.is_none() && ctor_start.is_some() && colon.is_none() {
                    ctor_end = Some(pos);
                }
            }
            b'{' if parens <= 0 => {
                end = pos;
                break;
            }
            b':' if parens <= 0 && colon.is_none() => colon = Some(pos + 1),
            b'\n' if parens <= 0 => {
                let prev = bytes[from..pos].iter().rev().find(|b| !b.is_ascii_whitespace());
                let next = bytes[pos + 1..].iter().find(|b| !b.is_ascii_whitespace());
                let carried = prev.is_some_and(|b| matches!(b, b',' | b':'))
                    || next.is_some_and(|b| matches!(b, b',' | b':' | b'{'));
                if !carried {
                    end = pos;
                    break;
                }
            }
            _ => {}
        }
    }

    let constructor = match (ctor_start, ctor_end) {
        (Some(s), Some(e)) if s <= e => Some(text[s..e].to_string()),
        _ => None,
    };
    let supertypes = colon
        .filter(|c| *c <= end)
        .map(|c| {
            let list = &text[c..end];
            let list = list.split(" where ").next().unwrap_or(list);
            split_top_level(list)
                .iter()
                .map(|s| simple_type_name(s))
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    ClassHeader {
        constructor,
        supertypes,
    }
}

/// Entries of an `enum class` body, up to the first `;`.
fn enum_entries(body: &str) -> Vec<Field> {
    let entries = body.split(';').next().unwrap_or(body);
    split_top_level(entries)
        .iter()
        .map(|e| simple_type_name(e.split('{').next().unwrap_or(e)))
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_alphanumeric() || c == '_'))
        .map(|name| Field {
            name,
            type_annotation: None,
        })
        .collect()
}

struct Scan<'a> {
    text: &'a str,
    lines: Vec<&'a str>,
    index: LineIndex,
    depths: Vec<usize>,
    category: Category,
}

impl<'a> Scan<'a> {
    fn new(path: &str, text: &'a str) -> Self {
        Scan {
            text,
            lines: text.split('\n').collect(),
            index: LineIndex::new(text),
            depths: line_depths(text),
            category: classify(path),
        }
    }

    fn depth_at(&self, offset: usize) -> usize {
        let line = self.index.line_of(offset) as usize;
        self.depths.get(line.saturating_sub(1)).copied().unwrap_or(0)
    }

    /// Annotations above the declaration plus any written inline before it.
    fn annotations(&self, offset: usize, inline: Option<&str>) -> Vec<String> {
        let line = self.index.line_of(offset) as usize - 1;
        let mut names = annotation_names(&annotations_above(&self.lines, line).join(" "));
        names.extend(inline.map(annotation_names).unwrap_or_default());
        names
    }

    /// Annotation first, then file category, then name, then kind.
    fn entity_type(&self, annotations: &[String], name: &str, kind: SymbolKind) -> EntityType {
        annotation_type(annotations).unwrap_or_else(|| classify_declaration(self.category, name, kind))
    }

    fn matches_at<'r>(
        &'r self,
        re: &'r Regex,
        start: usize,
        end: usize,
        depth: usize,
    ) -> impl Iterator<Item = (usize, Captures<'a>)> + 'r {
        let text: &'a str = self.text;
        let body = &text[start..=end.min(text.len().saturating_sub(1))];
        re.captures_iter(body).filter_map(move |caps| {
            let offset = start + caps.get(0)?.start();
            (self.depth_at(offset) == depth).then_some((offset, caps))
        })
    }

    fn method(&self, offset: usize, caps: &Captures) -> Method {
        Method {
            name: caps["name"].to_string(),
            params: param_names(&caps["params"]),
            return_type: caps.name("ret").map(|r| r.as_str().trim().to_string()),
            decorators: self.annotations(offset, caps.name("inline").map(|m| m.as_str())),
        }
    }
}

/// Offset of the modifiers/keyword, past any inline annotations.
fn declaration_start(caps: &Captures) -> usize {
    caps.name("mods")
        .or_else(|| caps.get(0))
        .map_or(0, |m| m.start())
}

fn is_private(caps: &Captures) -> bool {
    caps.name("mods")
        .is_some_and(|m| m.as_str().split_whitespace().any(|w| w == "private"))
}

impl KotlinExtractor {
    fn imports(scan: &Scan, out: &mut Vec<RawImport>) {
        for caps in IMPORT.captures_iter(scan.text) {
            let Some(m) = caps.get(0) else { continue };
            let path = &caps["path"];
            let name = path.rsplit('.').next().unwrap_or(path);
            out.push(RawImport {
                source: path.to_string(),
                names: vec![name.to_string()],
                line: scan.index.line_of(m.start()),
            });
        }
    }

    fn class_likes(scan: &Scan, result: &mut FileParseResult) {
        for caps in CLASS_LIKE.captures_iter(scan.text) {
            let Some(m) = caps.get(0) else { continue };
            let depth = scan.depth_at(m.start());
            if depth != 0 {
                continue;
            }
            let name = &caps["name"];
            let mods = caps.name("mods").map_or("", |m| m.as_str());
            let keyword = &caps["keyword"];
            let kind = if mods.split_whitespace().any(|w| w == "enum") {
                SymbolKind::Enum
            } else if keyword.ends_with("interface") {
                SymbolKind::Interface
            } else if keyword == "object" {
                SymbolKind::Object
            } else {
                SymbolKind::Class
            };

            let start = m.start();
            let end = block_end(scan.text, declaration_start(&caps));
            let head = class_header(scan.text, m.end());
            let annotations = scan.annotations(start, caps.name("inline").map(|m| m.as_str()));

            let mut fields: Vec<Field> = head
                .constructor
                .as_deref()
                .map(constructor_fields)
                .unwrap_or_default();
            if kind == SymbolKind::Enum {
                if let Some(open) = scan.text.get(m.end()..=end).and_then(|s| s.find('{')) {
                    let body_start = m.end() + open + 1;
                    // `end` is the last byte of the block: the closing brace, or end of file.
                    let body = scan.text.get(body_start..=end).unwrap_or("");
                    fields.extend(enum_entries(body.strip_suffix('}').unwrap_or(body)));
                }
            }
            fields.extend(
                scan.matches_at(&PROPERTY, start, end, depth + 1)
                    .map(|(_, p)| Field {
                        name: p["name"].to_string(),
                        type_annotation: p
                            .name("ty")
                            .map(|t| property_type(t.as_str()))
                            .filter(|t| !t.is_empty()),
                    }),
            );
            let methods = scan
                .matches_at(&FUN, start, end, depth + 1)
                .map(|(offset, f)| scan.method(offset, &f))
                .collect();

            let signature = header(&scan.text[start..class_signature_end(scan.text, m.end(), end)]);
            let entity = ExtractedEntity {
                entity_type: scan.entity_type(&annotations, name, kind),
                kind,
                name: name.to_string(),
                line_start: scan.index.line_of(start),
                line_end: scan.index.line_of(end),
                signature,
                detail: EntityDetail::Class {
                    bases: head.supertypes,
                    fields,
                    methods,
                    decorators: annotations,
                },
                extra: Default::default(),
            };
            if !is_private(&caps) {
                result.exports.push(name.to_string());
            }
            result.entities.push(entity);

            Self::companion(scan, name, start, end, result);
        }
    }

    fn companion(scan: &Scan, owner: &str, start: usize, end: usize, result: &mut FileParseResult) {
        let Some((offset, caps)) = scan.matches_at(&COMPANION, start, end, 1).next() else {
            return;
        };
        let companion_end = block_end(scan.text, offset);
        let name = format!(
            "{owner}.{}",
            caps.name("name").map_or("Companion", |n| n.as_str())
        );
        let fields = scan
            .matches_at(&PROPERTY, offset, companion_end, 2)
            .map(|(_, p)| Field {
                name: p["name"].to_string(),
                type_annotation: p.name("ty").map(|t| property_type(t.as_str())),
            })
            .collect();
        let methods = scan
            .matches_at(&FUN, offset, companion_end, 2)
            .map(|(o, f)| scan.method(o, &f))
            .collect();
        let mut entity = ExtractedEntity {
            entity_type: EntityType::Class,
            kind: SymbolKind::Companion,
            name,
            line_start: scan.index.line_of(offset),
            line_end: scan.index.line_of(companion_end),
            signature: header(caps.get(0).map_or("", |m| m.as_str())),
            detail: EntityDetail::Class {
                bases: Vec::new(),
                fields,
                methods,
                decorators: Vec::new(),
            },
            extra: Default::default(),
        };
        entity.extra.insert("companion_of".to_string(), owner.to_string());
        result.entities.push(entity);
    }

    fn functions(scan: &Scan, result: &mut FileParseResult) {
        for caps in FUN.captures_iter(scan.text) {
            let Some(m) = caps.get(0) else { continue };
            if scan.depth_at(m.start()) != 0 {
                continue;
            }
            let name = &caps["name"];
            let annotations = scan.annotations(m.start(), caps.name("inline").map(|m| m.as_str()));
            let is_suspend = caps
                .name("mods")
                .is_some_and(|m| m.as_str().split_whitespace().any(|w| w == "suspend"));
            let mut entity = ExtractedEntity {
                entity_type: scan.entity_type(&annotations, name, SymbolKind::Function),
                kind: SymbolKind::Function,
                name: name.to_string(),
                line_start: scan.index.line_of(m.start()),
                line_end: scan.index.line_of(block_end(scan.text, declaration_start(&caps))),
                signature: header(m.as_str()),
                detail: EntityDetail::Function {
                    params: param_names(&caps["params"]),
                    return_type: caps.name("ret").map(|r| r.as_str().trim().to_string()),
                    decorators: annotations,
                    is_async: is_suspend,
                },
                extra: Default::default(),
            };
            if let Some(receiver) = caps.name("receiver") {
                entity
                    .extra
                    .insert("receiver".to_string(), receiver.as_str().trim().to_string());
            }
            if !is_private(&caps) {
                result.exports.push(name.to_string());
            }
            result.entities.push(entity);
        }

        for caps in TYPEALIAS.captures_iter(scan.text) {
            let Some(m) = caps.get(0) else { continue };
            let name = &caps["name"];
            let target = caps["target"].trim().to_string();
            let line = scan.index.line_of(m.start());
            result.entities.push(ExtractedEntity {
                entity_type: classify_declaration(scan.category, name, SymbolKind::TypeAlias),
                kind: SymbolKind::TypeAlias,
                name: name.to_string(),
                line_start: line,
                line_end: line,
                signature: header(m.as_str()),
                detail: EntityDetail::Alias { target },
                extra: Default::default(),
            });
            if !is_private(&caps) {
                result.exports.push(name.to_string());
            }
        }
    }

    fn routes(scan: &Scan, result: &mut FileParseResult) {
        // Ktor: verbs nested in `route("/prefix") { ... }` blocks.
        let blocks: Vec<(usize, usize, String)> = KTOR_BLOCK
            .captures_iter(scan.text)
            .filter_map(|caps| {
                let m = caps.get(0)?;
                Some((m.start(), block_end(scan.text, m.start()), caps["path"].to_string()))
            })
            .collect();

        for caps in KTOR_ROUTE.captures_iter(scan.text) {
            let Some(m) = caps.get(0) else { continue };
            let prefix = blocks
                .iter()
                .filter(|(start, end, _)| *start < m.start() && m.start() <= *end)
                .fold(String::new(), |acc, (_, _, p)| join_route(&acc, p));
            let path = join_route(&prefix, &caps["path"]);
            let method = caps["verb"].to_ascii_uppercase();
            result.entities.push(route_entity(
                scan,
                m.start(),
                block_end(scan.text, m.start()),
                method,
                path,
                None,
                m.as_str(),
            ));
        }

        // Spring: mapping annotations on members; a class-level mapping is the prefix.
        let class_prefixes: Vec<(usize, usize, String)> = CLASS_LIKE
            .captures_iter(scan.text)
            .filter_map(|caps| {
                let m = caps.get(0)?;
                let line = scan.index.line_of(m.start()) as usize - 1;
                let mut above = annotations_above(&scan.lines, line).join(" ");
                above.push_str(caps.name("inline").map_or("", |m| m.as_str()));
                let prefix = CLASS_MAPPING
                    .captures(&above)
                    .and_then(|c| mapping_path(c.name("args").map_or("", |a| a.as_str())))
                    .unwrap_or_default();
                Some((m.start(), block_end(scan.text, declaration_start(&caps)), prefix))
            })
            .collect();

        for caps in SPRING_MAPPING.captures_iter(scan.text) {
            let Some(m) = caps.get(0) else { continue };
            if scan.depth_at(m.start()) == 0 {
                continue;
            }
            let args = caps.name("args").map_or("", |a| a.as_str());
            let method = match &caps["verb"] {
                "Request" => REQUEST_METHOD
                    .captures(args)
                    .map(|c| c["verb"].to_string())
                    .unwrap_or_else(|| "ANY".to_string()),
                verb => verb.to_ascii_uppercase(),
            };
            let prefix = class_prefixes
                .iter()
                .find(|(start, end, _)| *start < m.start() && m.start() <= *end)
                .map(|(_, _, p)| p.as_str())
                .unwrap_or("");
            let path = join_route(prefix, &mapping_path(args).unwrap_or_default());

            let handler = FUN
                .captures(&scan.text[m.end()..])
                .map(|f| (m.end() + declaration_start(&f), f["name"].to_string()));
            let end = handler
                .as_ref()
                .map(|(offset, _)| block_end(scan.text, *offset))
                .unwrap_or(m.end());
            result.entities.push(route_entity(
                scan,
                m.start(),
                end,
                method,
                path,
                handler.map(|(_, name)| name),
                m.as_str(),
            ));
        }
    }
}

fn mapping_path(args: &str) -> Option<String> {
    QUOTED.captures(args).map(|c| c["value"].to_string())
}

fn route_entity(
    scan: &Scan,
    start: usize,
    end: usize,
    method: String,
    path: String,
    handler: Option<String>,
    matched: &str,
) -> ExtractedEntity {
    ExtractedEntity {
        entity_type: EntityType::Route,
        kind: SymbolKind::Route,
        name: format!("{method} {path}"),
        line_start: scan.index.line_of(start),
        line_end: scan.index.line_of(end),
        signature: header(matched),
        detail: EntityDetail::Route {
            method,
            path,
            handler,
            decorators: Vec::new(),
        },
        extra: Default::default(),
    }
}

/// Type text with a trailing `by ...` delegate removed.
fn property_type(ty: &str) -> String {
    ty.split(" by ").next().unwrap_or(ty).trim().to_string()
}

/// End of the declaration header: the opening brace, or the block end for brace-less classes.
fn class_signature_end(text: &str, from: usize, end: usize) -> usize {
    let bytes = text.as_bytes();
    let mut parens = 0i32;
    for pos in from..=end.min(bytes.len().saturating_sub(1)) {
        match bytes[pos] {
            b'(' => parens += 1,
            b')' => parens -= 1,
            b'{' if parens <= 0 => return pos,
            _ => {}
        }
    }
    (end + 1).min(bytes.len())
}

impl LanguageExtractor for KotlinExtractor {
    fn extract(&self, path: &str, language: Language, content: &[u8]) -> FileParseResult {
        let hash = content_hash(content);
        let text = String::from_utf8_lossy(content);
        let scan = Scan::new(path, &text);
        let mut result = FileParseResult::empty(path, hash, language, ParseStatus::Parsed);

        result.namespace = PACKAGE
            .captures(&text)
            .map(|c| c["name"].to_string());
        Self::imports(&scan, &mut result.imports);
        Self::class_likes(&scan, &mut result);
        Self::functions(&scan, &mut result);
        Self::routes(&scan, &mut result);

        result.entities.sort_by_key(|e| (e.line_start, e.line_end));
        let mut seen = std::collections::HashSet::new();
        result.exports.retain(|name| seen.insert(name.clone()));

        tracing::debug!(
            "Extracted {} entities, {} imports from {}",
            result.entities.len(),
            result.imports.len(),
            path
        );
        result
    }
}
