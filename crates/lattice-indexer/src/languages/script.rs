//! TypeScript / JavaScript extractor using ordered regular expressions

use std::sync::LazyLock;

use lattice_core::{
    Category, EntityDetail, EntityType, ExtractedEntity, Field, FileParseResult,
    Language, Method, ParseStatus, RawImport, SymbolKind, classify, content_hash,
};
use regex::{Captures, Regex};

use super::scan::{
    LineIndex, annotation_names, annotations_above, block_end, classify_declaration, header,
    join_route, line_depths,
};
use crate::extractor::LanguageExtractor;

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("script pattern")
}

// ── Imports / exports ────────────────────────────────────────

static IMPORT_FROM: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r#"(?m)^[ \t]*import\s+(?:type\s+)?(?P<clause>[\w$*{}\s,]+?)\s+from\s+['"](?P<src>[^'"]+)['"]"#)
});
static IMPORT_BARE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r#"(?m)^[ \t]*import\s+['"](?P<src>[^'"]+)['"]"#));
static REQUIRE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r#"(?:const|let|var)\s+(?P<clause>[\w${}\s,:]+?)\s*=\s*require\(\s*['"](?P<src>[^'"]+)['"]\s*\)"#)
});
static DYNAMIC_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| pattern(r#"\bimport\(\s*['"](?P<src>[^'"]+)['"]\s*\)"#));
static EXPORT_FROM: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r#"(?m)^[ \t]*export\s+(?:type\s+)?(?P<clause>\*(?:\s+as\s+[\w$]+)?|\{[^}]*\})\s*from\s+['"](?P<src>[^'"]+)['"]"#)
});
static EXPORT_LIST: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?m)^[ \t]*export\s+(?:type\s+)?\{(?P<list>[^}]*)\}\s*;?[ \t]*$"));
static CJS_EXPORTS: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?m)^[ \t]*module\.exports\s*=\s*(?:\{(?P<list>[^}]*)\}|(?P<single>[A-Za-z_$][\w$]*))")
});
static CJS_EXPORT_PROP: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?m)^[ \t]*(?:module\.)?exports\.(?P<name>[A-Za-z_$][\w$]*)\s*=")
});

// ── Declarations ─────────────────────────────────────────────

static CLASS: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?m)^[ \t]*(?P<export>export\s+(?:default\s+)?)?(?:declare\s+)?(?:abstract\s+)?class\s+(?P<name>[A-Za-z_$][\w$]*)(?:\s*<[^>{]*>)?(?:\s+extends\s+(?P<base>[\w$.]+)(?:\s*<[^>{]*>)?)?(?:\s+implements\s+(?P<implements>[^{]+?))?\s*\{")
});
static INTERFACE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?m)^[ \t]*(?P<export>export\s+(?:default\s+)?)?(?:declare\s+)?interface\s+(?P<name>[A-Za-z_$][\w$]*)(?:\s*<[^>{]*>)?(?:\s+extends\s+(?P<bases>[^{]+?))?\s*\{")
});
static TYPE_ALIAS: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?m)^[ \t]*(?P<export>export\s+)?(?:declare\s+)?type\s+(?P<name>[A-Za-z_$][\w$]*)(?:\s*<[^>=]*>)?\s*=\s*(?P<target>[^\n;]*)")
});
static ENUM: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?m)^[ \t]*(?P<export>export\s+)?(?:declare\s+)?(?:const\s+)?enum\s+(?P<name>[A-Za-z_$][\w$]*)\s*\{")
});
static FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?m)^[ \t]*(?P<export>export\s+(?:default\s+)?)?(?:declare\s+)?(?P<async>async\s+)?function\s*\*?\s*(?P<name>[A-Za-z_$][\w$]*)\s*(?:<[^>(]*>)?\s*\((?P<params>[^)]*)\)(?:\s*:\s*(?P<ret>[^{;\n]+?))?\s*[{;]")
});
static ARROW: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?m)^[ \t]*(?P<export>export\s+)?(?:const|let|var)\s+(?P<name>[A-Za-z_$][\w$]*)\s*(?::\s*[^=\n]+?)?\s*=\s*(?P<async>async\s+)?(?:\((?P<params>[^)]*)\)|(?P<param>[A-Za-z_$][\w$]*))\s*(?::\s*(?P<ret>[^=\n]+?))?\s*=>")
});

// ── Class members ────────────────────────────────────────────

static METHOD: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?m)^[ \t]*(?:@[\w$.]+(?:\([^)]*\))?\s+)*(?:(?:public|private|protected|static|readonly|abstract|override|get|set)\s+)*(?P<async>async\s+)?(?P<name>[A-Za-z_$][\w$]*)\s*(?:<[^>(]*>)?\s*\((?P<params>(?:[^()]|\([^()]*\))*)\)(?:\s*:\s*(?P<ret>[^{;\n]+?))?\s*[{;]")
});
static MEMBER: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?m)^[ \t]*(?:@[\w$.]+(?:\([^)]*\))?\s+)*(?:(?:public|private|protected|readonly|static|declare|override)\s+)*(?P<name>[A-Za-z_$][\w$]*)[?!]?\s*:\s*(?P<ty>[^;=\n]+?)\s*[;=,\n]")
});
static ENUM_MEMBER: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?m)^[ \t]*(?P<name>[A-Za-z_$][\w$]*)\s*(?:=[^,\n]*)?,?[ \t]*$"));

// ── Routes ───────────────────────────────────────────────────

static EXPRESS_ROUTE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r#"\b(?:app|router|server|[A-Za-z_$][\w$]*Router)\.(?P<verb>get|post|put|delete|patch|head|options|all)\(\s*['"`](?P<path>[^'"`]+)['"`](?P<args>[^\n]*)"#)
});
static NEST_ROUTE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r#"(?m)^[ \t]*@(?P<verb>Get|Post|Put|Delete|Patch|Head|Options|All)\(\s*(?:['"`](?P<path>[^'"`]*)['"`])?\s*\)"#)
});
static NEST_CONTROLLER: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r#"@Controller\(\s*(?:['"`](?P<prefix>[^'"`]*)['"`])?"#)
});
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^[A-Za-z_$][\w$.]*$"));

const NOT_METHODS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "function", "new", "else", "do", "super",
];

pub struct ScriptExtractor;

/// Names bound by an import clause, by their exported name.
fn clause_names(clause: &str) -> Vec<String> {
    let clause = clause.trim();
    let (head, braced) = match clause.find('{') {
        Some(open) => {
            let inner = clause[open + 1..].split('}').next().unwrap_or("");
            (&clause[..open], Some(inner))
        }
        None => (clause, None),
    };

    let mut names: Vec<String> = head
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            if p.starts_with('*') {
                "*".to_string()
            } else {
                p.to_string()
            }
        })
        .collect();

    if let Some(inner) = braced {
        names.extend(
            inner
                .split(',')
                .map(|p| p.trim().trim_start_matches("type "))
                .filter(|p| !p.is_empty())
                .filter_map(|p| p.split([' ', ':']).next())
                .map(str::to_string),
        );
    }
    names
}

/// Exported names from `a, b as c`, taking the public alias.
fn export_list_names(list: &str) -> Vec<String> {
    list.split(',')
        .map(|p| p.trim().trim_start_matches("type "))
        .filter(|p| !p.is_empty())
        .filter_map(|p| p.rsplit(" as ").next())
        .map(|p| p.trim().to_string())
        .collect()
}

fn params_of(list: &str) -> Vec<String> {
    super::scan::split_top_level(list)
        .into_iter()
        .map(|p| {
            let name = p.split([':', '=']).next().unwrap_or(&p).trim();
            // Drop parameter decorators and accessibility modifiers.
            let name = if name.starts_with(['{', '[']) {
                name
            } else {
                name.rsplit(char::is_whitespace).next().unwrap_or(name)
            };
            name.trim_end_matches('?').to_string()
        })
        .filter(|p| !p.is_empty())
        .collect()
}

fn push_export(caps: &Captures, name: &str, exports: &mut Vec<String>) {
    if caps.name("export").is_some() {
        exports.push(name.to_string());
    }
}

fn optional(caps: &Captures, group: &str) -> Option<String> {
    caps.name(group)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Per-file scanning state.
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

    fn lines_of(&self, start: usize) -> (u32, u32) {
        (
            self.index.line_of(start),
            self.index.line_of(block_end(self.text, start)),
        )
    }

    /// Decorators written on the lines above `offset`.
    fn decorators_above(&self, offset: usize) -> Vec<String> {
        let line = self.index.line_of(offset) as usize - 1;
        annotations_above(&self.lines, line)
    }

    fn entity(
        &self,
        start: usize,
        kind: SymbolKind,
        name: &str,
        signature: String,
        detail: EntityDetail,
    ) -> ExtractedEntity {
        let (line_start, line_end) = self.lines_of(start);
        ExtractedEntity {
            entity_type: classify_declaration(self.category, name, kind),
            kind,
            name: name.to_string(),
            line_start,
            line_end,
            signature,
            detail,
            extra: Default::default(),
        }
    }

    /// Regex matches inside `[start, end]` sitting exactly at `depth`.
    fn members<'r>(
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

    fn class_body(&self, start: usize, depth: usize) -> (Vec<Field>, Vec<(usize, Method)>) {
        let end = block_end(self.text, start);
        let fields = self
            .members(&MEMBER, start, end, depth + 1)
            .map(|(_, caps)| Field {
                name: caps["name"].to_string(),
                type_annotation: optional(&caps, "ty"),
            })
            .collect();
        let methods = self
            .members(&METHOD, start, end, depth + 1)
            .filter(|(_, caps)| !NOT_METHODS.contains(&&caps["name"]))
            .map(|(offset, caps)| {
                (
                    offset,
                    Method {
                        name: caps["name"].to_string(),
                        params: params_of(&caps["params"]),
                        return_type: optional(&caps, "ret"),
                        decorators: annotation_names(&self.decorators_above(offset).join(" ")),
                    },
                )
            })
            .collect();
        (fields, methods)
    }
}

impl ScriptExtractor {
    fn imports(scan: &Scan, out: &mut Vec<RawImport>) {
        let mut push = |offset: usize, src: &str, names: Vec<String>| {
            out.push(RawImport {
                source: src.to_string(),
                names,
                line: scan.index.line_of(offset),
            });
        };
        for caps in IMPORT_FROM.captures_iter(scan.text) {
            let offset = caps.get(0).map_or(0, |m| m.start());
            push(offset, &caps["src"], clause_names(&caps["clause"]));
        }
        for caps in IMPORT_BARE.captures_iter(scan.text) {
            let offset = caps.get(0).map_or(0, |m| m.start());
            push(offset, &caps["src"], Vec::new());
        }
        for caps in REQUIRE.captures_iter(scan.text) {
            let offset = caps.get(0).map_or(0, |m| m.start());
            push(offset, &caps["src"], clause_names(&caps["clause"]));
        }
        for caps in DYNAMIC_IMPORT.captures_iter(scan.text) {
            let offset = caps.get(0).map_or(0, |m| m.start());
            push(offset, &caps["src"], Vec::new());
        }
        for caps in EXPORT_FROM.captures_iter(scan.text) {
            let offset = caps.get(0).map_or(0, |m| m.start());
            push(offset, &caps["src"], clause_names(&caps["clause"]));
        }
        out.sort_by_key(|i| i.line);
    }

    fn declarations(scan: &Scan, result: &mut FileParseResult) {
        for caps in CLASS.captures_iter(scan.text) {
            let Some(m) = caps.get(0) else { continue };
            if scan.depth_at(m.start()) != 0 {
                continue;
            }
            let name = &caps["name"];
            let (fields, methods) = scan.class_body(m.start(), 0);
            let decorators = annotation_names(&scan.decorators_above(m.start()).join(" "));
            let mut entity = scan.entity(
                m.start(),
                SymbolKind::Class,
                name,
                header(m.as_str()),
                EntityDetail::Class {
                    bases: optional(&caps, "base").into_iter().collect(),
                    fields,
                    methods: methods.into_iter().map(|(_, m)| m).collect(),
                    decorators,
                },
            );
            if let Some(implements) = optional(&caps, "implements") {
                entity.extra.insert("implements".to_string(), implements);
            }
            push_export(&caps, name, &mut result.exports);
            result.entities.push(entity);
        }

        for caps in INTERFACE.captures_iter(scan.text) {
            let Some(m) = caps.get(0) else { continue };
            if scan.depth_at(m.start()) != 0 {
                continue;
            }
            let name = &caps["name"];
            let (fields, methods) = scan.class_body(m.start(), 0);
            let bases = optional(&caps, "bases")
                .map(|b| super::scan::split_top_level(&b))
                .unwrap_or_default();
            let entity = scan.entity(
                m.start(),
                SymbolKind::Interface,
                name,
                header(m.as_str()),
                EntityDetail::Class {
                    bases,
                    fields,
                    methods: methods.into_iter().map(|(_, m)| m).collect(),
                    decorators: Vec::new(),
                },
            );
            push_export(&caps, name, &mut result.exports);
            result.entities.push(entity);
        }

        for caps in TYPE_ALIAS.captures_iter(scan.text) {
            let Some(m) = caps.get(0) else { continue };
            if scan.depth_at(m.start()) != 0 {
                continue;
            }
            let name = &caps["name"];
            let target = optional(&caps, "target").unwrap_or_default();
            let signature = format!("type {name} = {target}");
            let entity = scan.entity(
                m.start(),
                SymbolKind::TypeAlias,
                name,
                signature,
                EntityDetail::Alias { target },
            );
            push_export(&caps, name, &mut result.exports);
            result.entities.push(entity);
        }

        for caps in ENUM.captures_iter(scan.text) {
            let Some(m) = caps.get(0) else { continue };
            if scan.depth_at(m.start()) != 0 {
                continue;
            }
            let name = &caps["name"];
            let end = block_end(scan.text, m.start());
            let fields = scan
                .members(&ENUM_MEMBER, m.start(), end, 1)
                .map(|(_, caps)| Field {
                    name: caps["name"].to_string(),
                    type_annotation: None,
                })
                .collect();
            let entity = scan.entity(
                m.start(),
                SymbolKind::Enum,
                name,
                header(m.as_str()),
                EntityDetail::Class {
                    bases: Vec::new(),
                    fields,
                    methods: Vec::new(),
                    decorators: Vec::new(),
                },
            );
            push_export(&caps, name, &mut result.exports);
            result.entities.push(entity);
        }

        for re in [&*FUNCTION, &*ARROW] {
            for caps in re.captures_iter(scan.text) {
                let Some(m) = caps.get(0) else { continue };
                if scan.depth_at(m.start()) != 0 {
                    continue;
                }
                let name = &caps["name"];
                let params = caps
                    .name("params")
                    .map(|p| params_of(p.as_str()))
                    .or_else(|| caps.name("param").map(|p| vec![p.as_str().to_string()]))
                    .unwrap_or_default();
                let entity = scan.entity(
                    m.start(),
                    SymbolKind::Function,
                    name,
                    header(m.as_str()),
                    EntityDetail::Function {
                        params,
                        return_type: optional(&caps, "ret"),
                        decorators: Vec::new(),
                        is_async: caps.name("async").is_some(),
                    },
                );
                push_export(&caps, name, &mut result.exports);
                result.entities.push(entity);
            }
        }
    }

    fn routes(scan: &Scan, result: &mut FileParseResult) {
        for caps in EXPRESS_ROUTE.captures_iter(scan.text) {
            let Some(m) = caps.get(0) else { continue };
            let method = caps["verb"].to_ascii_uppercase();
            let path = caps["path"].to_string();
            let handler = caps
                .name("args")
                .and_then(|a| {
                    let args = a.as_str().trim_start_matches(',');
                    let args = args.split(')').next().unwrap_or(args);
                    super::scan::split_top_level(args).pop()
                })
                .filter(|h| IDENTIFIER.is_match(h));
            let (line_start, line_end) = scan.lines_of(m.start());
            result.entities.push(ExtractedEntity {
                entity_type: EntityType::Route,
                kind: SymbolKind::Route,
                name: format!("{method} {path}"),
                line_start,
                line_end,
                signature: header(m.as_str()),
                detail: EntityDetail::Route {
                    method,
                    path,
                    handler,
                    decorators: Vec::new(),
                },
                extra: Default::default(),
            });
        }

        // Decorated controller methods: prefix from the enclosing class.
        let classes: Vec<(usize, usize, String)> = CLASS
            .captures_iter(scan.text)
            .filter_map(|caps| {
                let m = caps.get(0)?;
                let prefix = scan
                    .decorators_above(m.start())
                    .iter()
                    .find_map(|d| NEST_CONTROLLER.captures(d))
                    .and_then(|c| c.name("prefix").map(|p| p.as_str().to_string()))
                    .unwrap_or_default();
                Some((m.start(), block_end(scan.text, m.start()), prefix))
            })
            .collect();

        for caps in NEST_ROUTE.captures_iter(scan.text) {
            let Some(m) = caps.get(0) else { continue };
            let prefix = classes
                .iter()
                .find(|(start, end, _)| *start < m.start() && m.start() <= *end)
                .map(|(_, _, prefix)| prefix.as_str())
                .unwrap_or("");
            let method = caps["verb"].to_ascii_uppercase();
            let path = join_route(prefix, caps.name("path").map_or("", |p| p.as_str()));

            let after = &scan.text[m.end()..];
            let handler = METHOD
                .captures(after)
                .filter(|c| !NOT_METHODS.contains(&&c["name"]))
                .map(|c| (m.end() + c.get(0).map_or(0, |g| g.start()), c["name"].to_string()));
            let line_start = scan.index.line_of(m.start());
            let line_end = handler
                .as_ref()
                .map(|(offset, _)| scan.index.line_of(block_end(scan.text, *offset)))
                .unwrap_or(line_start);

            result.entities.push(ExtractedEntity {
                entity_type: EntityType::Route,
                kind: SymbolKind::Route,
                name: format!("{method} {path}"),
                line_start,
                line_end,
                signature: header(m.as_str()),
                detail: EntityDetail::Route {
                    method,
                    path,
                    handler: handler.map(|(_, name)| name),
                    decorators: vec![caps["verb"].to_string()],
                },
                extra: Default::default(),
            });
        }
    }

    fn exports(scan: &Scan, exports: &mut Vec<String>) {
        for caps in EXPORT_LIST.captures_iter(scan.text) {
            exports.extend(export_list_names(&caps["list"]));
        }
        for caps in EXPORT_FROM.captures_iter(scan.text) {
            let clause = &caps["clause"];
            if let Some(list) = clause.strip_prefix('{') {
                exports.extend(export_list_names(list.trim_end_matches('}')));
            } else if let Some((_, alias)) = clause.split_once(" as ") {
                exports.push(alias.trim().to_string());
            }
        }
        for caps in CJS_EXPORTS.captures_iter(scan.text) {
            if let Some(list) = caps.name("list") {
                exports.extend(
                    list.as_str()
                        .split(',')
                        .filter_map(|p| p.split(':').next())
                        .map(str::trim)
                        .filter(|p| !p.is_empty())
                        .map(str::to_string),
                );
            } else if let Some(single) = caps.name("single") {
                exports.push(single.as_str().to_string());
            }
        }
        for caps in CJS_EXPORT_PROP.captures_iter(scan.text) {
            exports.push(caps["name"].to_string());
        }
    }
}

impl LanguageExtractor for ScriptExtractor {
    fn extract(&self, path: &str, language: Language, content: &[u8]) -> FileParseResult {
        let hash = content_hash(content);
        let text = String::from_utf8_lossy(content);
        let scan = Scan::new(path, &text);
        let mut result = FileParseResult::empty(path, hash, language, ParseStatus::Parsed);

        Self::imports(&scan, &mut result.imports);
        Self::declarations(&scan, &mut result);
        Self::routes(&scan, &mut result);
        Self::exports(&scan, &mut result.exports);

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
