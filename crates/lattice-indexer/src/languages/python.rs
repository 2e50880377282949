//! Python language extractor using tree-sitter

use std::cell::RefCell;

use lattice_core::{
    Category, EntityDetail, EntityType, ExtractedEntity, Field, FileParseResult,
    Language, Method, ParseStatus, RawImport, SymbolKind, classify, content_hash,
};
use tree_sitter::{Node, Parser, Tree};

use super::scan::squash;
use crate::extractor::LanguageExtractor;

/// Decorator names (last dotted segment) that register an HTTP handler.
const ROUTE_DECORATORS: &[&str] = &[
    "get", "post", "put", "delete", "patch", "head", "options", "route", "api_route", "websocket",
];

const MODEL_BASES: &[&str] = &[
    "BaseModel",
    "Document",
    "Model",
    "SQLModel",
    "Base",
    "DeclarativeBase",
];

const DTO_BASE_SUFFIXES: &[&str] = &["DTO", "Dto", "Schema", "Serializer"];

const ENUM_BASES: &[&str] = &["Enum", "IntEnum", "StrEnum", "Flag", "IntFlag"];

thread_local! {
    // Parsers are not Sync; keep one per thread and reuse it.
    static PARSER: RefCell<Option<Parser>> = const { RefCell::new(None) };
}

fn parse(content: &[u8]) -> Option<Tree> {
    PARSER.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            let mut parser = Parser::new();
            if let Err(e) = parser.set_language(&tree_sitter_python::LANGUAGE.into()) {
                tracing::error!("Failed to load Python grammar: {}", e);
                return None;
            }
            *slot = Some(parser);
        }
        slot.as_mut()?.parse(content, None)
    })
}

pub struct PythonExtractor;

/// A parsed decorator: `@router.get("/users", ...)`.
struct Decorator {
    name: String,
    path: Option<String>,
    methods: Vec<String>,
}

impl Decorator {
    /// HTTP method when this decorator registers a route.
    fn route_method(&self) -> Option<String> {
        let verb = self.name.rsplit('.').next()?.to_ascii_lowercase();
        if !ROUTE_DECORATORS.contains(&verb.as_str()) {
            return None;
        }
        let method = match verb.as_str() {
            "route" | "api_route" => self
                .methods
                .first()
                .cloned()
                .unwrap_or_else(|| "ANY".to_string()),
            "websocket" => "WS".to_string(),
            other => other.to_ascii_uppercase(),
        };
        Some(method)
    }
}

fn text<'a>(node: Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or_default()
}

fn line_range(node: Node) -> (u32, u32) {
    (
        node.start_position().row as u32 + 1,
        node.end_position().row as u32 + 1,
    )
}

/// Contents of a string literal without quotes or prefixes.
fn string_value(node: Node, source: &[u8]) -> String {
    let mut cursor = node.walk();
    let content: String = node
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "string_content")
        .map(|c| text(c, source))
        .collect();
    if !content.is_empty() {
        return content;
    }
    text(node, source)
        .trim_start_matches(|c: char| c.is_ascii_alphabetic())
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string()
}

fn parse_decorator(node: Node, source: &[u8]) -> Option<Decorator> {
    let expr = node.named_child(0)?;
    let (target, arguments) = if expr.kind() == "call" {
        (
            expr.child_by_field_name("function")?,
            expr.child_by_field_name("arguments"),
        )
    } else {
        (expr, None)
    };

    let mut decorator = Decorator {
        name: text(target, source).to_string(),
        path: None,
        methods: Vec::new(),
    };
    if let Some(arguments) = arguments {
        let mut cursor = arguments.walk();
        for arg in arguments.named_children(&mut cursor) {
            match arg.kind() {
                "string" if decorator.path.is_none() => {
                    decorator.path = Some(string_value(arg, source));
                }
                "keyword_argument" => {
                    let is_methods = arg
                        .child_by_field_name("name")
                        .is_some_and(|n| text(n, source) == "methods");
                    if let (true, Some(value)) = (is_methods, arg.child_by_field_name("value")) {
                        let mut inner = value.walk();
                        decorator.methods = value
                            .named_children(&mut inner)
                            .filter(|v| v.kind() == "string")
                            .map(|v| string_value(v, source).to_ascii_uppercase())
                            .collect();
                    }
                }
                _ => {}
            }
        }
    }
    Some(decorator)
}

fn decorators_of(node: Node, source: &[u8]) -> Vec<Decorator> {
    if node.kind() != "decorated_definition" {
        return Vec::new();
    }
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| c.kind() == "decorator")
        .filter_map(|c| parse_decorator(c, source))
        .collect()
}

/// Unwrap a possibly decorated statement into (outer, definition).
fn definition_of(node: Node) -> Option<(Node, Node)> {
    match node.kind() {
        "class_definition" | "function_definition" => Some((node, node)),
        "decorated_definition" => Some((node, node.child_by_field_name("definition")?)),
        _ => None,
    }
}

/// Header text up to the body, without the trailing colon.
fn signature(definition: Node, source: &[u8]) -> String {
    let end = definition
        .child_by_field_name("body")
        .map(|b| b.start_byte())
        .unwrap_or_else(|| definition.end_byte());
    let header = source
        .get(definition.start_byte()..end)
        .map(String::from_utf8_lossy)
        .unwrap_or_default();
    squash(header.trim().trim_end_matches(':'))
}

fn parameters(function: Node, source: &[u8], drop_receiver: bool) -> Vec<String> {
    let Some(params) = function.child_by_field_name("parameters") else {
        return Vec::new();
    };
    let mut cursor = params.walk();
    let mut out: Vec<String> = params
        .named_children(&mut cursor)
        .filter_map(|p| match p.kind() {
            "identifier" | "list_splat_pattern" | "dictionary_splat_pattern" => {
                Some(text(p, source).to_string())
            }
            "typed_parameter" => p.named_child(0).map(|n| text(n, source).to_string()),
            "default_parameter" | "typed_default_parameter" => p
                .child_by_field_name("name")
                .map(|n| text(n, source).to_string()),
            _ => None,
        })
        .collect();
    if drop_receiver && out.first().is_some_and(|p| p == "self" || p == "cls") {
        out.remove(0);
    }
    out
}

fn return_type(function: Node, source: &[u8]) -> Option<String> {
    function
        .child_by_field_name("return_type")
        .map(|n| text(n, source).to_string())
}

fn is_async(function: Node) -> bool {
    function.child(0).is_some_and(|c| c.kind() == "async")
}

fn bases(class: Node, source: &[u8]) -> Vec<String> {
    let Some(list) = class.child_by_field_name("superclasses") else {
        return Vec::new();
    };
    let mut cursor = list.walk();
    list.named_children(&mut cursor)
        .filter(|n| n.kind() != "keyword_argument" && n.kind() != "comment")
        .map(|n| text(n, source).to_string())
        .collect()
}

/// Entity type implied by base classes.
fn base_heuristic(bases: &[String]) -> Option<EntityType> {
    let simple = |base: &String| {
        let head = base.split('[').next().unwrap_or(base);
        head.rsplit('.').next().unwrap_or(head).to_string()
    };
    let names: Vec<String> = bases.iter().map(simple).collect();

    if names.iter().any(|n| MODEL_BASES.contains(&n.as_str())) {
        Some(EntityType::Model)
    } else if names
        .iter()
        .any(|n| DTO_BASE_SUFFIXES.iter().any(|s| n.ends_with(s)))
    {
        Some(EntityType::Dto)
    } else if names.iter().any(|n| n.contains("Middleware")) {
        Some(EntityType::Middleware)
    } else if names.iter().any(|n| ENUM_BASES.contains(&n.as_str())) {
        Some(EntityType::Enum)
    } else {
        None
    }
}

/// Class-level assignments: annotated fields and plain attributes.
fn class_fields(body: Node, source: &[u8]) -> Vec<Field> {
    let mut cursor = body.walk();
    body.named_children(&mut cursor)
        .filter(|s| s.kind() == "expression_statement")
        .filter_map(|s| s.named_child(0))
        .filter(|a| a.kind() == "assignment")
        .filter_map(|a| {
            let left = a.child_by_field_name("left")?;
            if left.kind() != "identifier" {
                return None;
            }
            let name = text(left, source);
            if name.starts_with("__") {
                return None;
            }
            let type_annotation = a
                .child_by_field_name("type")
                .map(|t| text(t, source).to_string())
                .or_else(|| {
                    let right = a.child_by_field_name("right")?;
                    (right.kind() == "call")
                        .then(|| right.child_by_field_name("function"))
                        .flatten()
                        .map(|f| text(f, source).to_string())
                });
            Some(Field {
                name: name.to_string(),
                type_annotation,
            })
        })
        .collect()
}

struct Methods {
    methods: Vec<Method>,
    has_route: bool,
}

fn class_methods(body: Node, source: &[u8]) -> Methods {
    let mut out = Methods {
        methods: Vec::new(),
        has_route: false,
    };
    let mut cursor = body.walk();
    for statement in body.named_children(&mut cursor) {
        let Some((outer, def)) = definition_of(statement) else {
            continue;
        };
        if def.kind() != "function_definition" {
            continue;
        }
        let decorators = decorators_of(outer, source);
        out.has_route |= decorators.iter().any(|d| d.route_method().is_some());
        out.methods.push(Method {
            name: def
                .child_by_field_name("name")
                .map(|n| text(n, source).to_string())
                .unwrap_or_default(),
            params: parameters(def, source, true),
            return_type: return_type(def, source),
            decorators: decorators.into_iter().map(|d| d.name).collect(),
        });
    }
    out
}

fn class_entity(outer: Node, def: Node, source: &[u8], category: Category) -> Option<ExtractedEntity> {
    let name = text(def.child_by_field_name("name")?, source).to_string();
    let bases = bases(def, source);
    let (fields, methods) = match def.child_by_field_name("body") {
        Some(body) => (class_fields(body, source), class_methods(body, source)),
        None => (
            Vec::new(),
            Methods {
                methods: Vec::new(),
                has_route: false,
            },
        ),
    };

    let entity_type = category
        .entity_type()
        .or_else(|| base_heuristic(&bases))
        .or_else(|| methods.has_route.then_some(EntityType::Route))
        .unwrap_or(EntityType::Class);

    let (line_start, line_end) = line_range(outer);
    Some(ExtractedEntity {
        entity_type,
        kind: SymbolKind::Class,
        name,
        line_start,
        line_end,
        signature: signature(def, source),
        detail: EntityDetail::Class {
            bases,
            fields,
            methods: methods.methods,
            decorators: decorators_of(outer, source)
                .into_iter()
                .map(|d| d.name)
                .collect(),
        },
        extra: Default::default(),
    })
}

fn function_entity(outer: Node, def: Node, source: &[u8], category: Category) -> Option<ExtractedEntity> {
    let name = text(def.child_by_field_name("name")?, source).to_string();
    let decorators = decorators_of(outer, source);
    let route = decorators
        .iter()
        .find_map(|d| d.route_method().map(|m| (m, d.path.clone())));
    let decorator_names: Vec<String> = decorators.iter().map(|d| d.name.clone()).collect();

    let entity_type = category
        .entity_type()
        .or_else(|| route.as_ref().map(|_| EntityType::Route))
        .unwrap_or(EntityType::Function);

    let detail = match route {
        Some((method, path)) => EntityDetail::Route {
            method,
            path: path.unwrap_or_default(),
            handler: Some(name.clone()),
            decorators: decorator_names,
        },
        None => EntityDetail::Function {
            params: parameters(def, source, false),
            return_type: return_type(def, source),
            decorators: decorator_names,
            is_async: is_async(def),
        },
    };

    let (line_start, line_end) = line_range(outer);
    Some(ExtractedEntity {
        entity_type,
        kind: SymbolKind::Function,
        name,
        line_start,
        line_end,
        signature: signature(def, source),
        detail,
        extra: Default::default(),
    })
}

/// Names listed in a module-level `__all__ = [...]`.
fn dunder_all(statement: Node, source: &[u8]) -> Option<Vec<String>> {
    let assignment = statement.named_child(0)?;
    if assignment.kind() != "assignment" {
        return None;
    }
    let left = assignment.child_by_field_name("left")?;
    if text(left, source) != "__all__" {
        return None;
    }
    let right = assignment.child_by_field_name("right")?;
    let mut cursor = right.walk();
    let names = right
        .named_children(&mut cursor)
        .filter(|n| n.kind() == "string")
        .map(|n| string_value(n, source))
        .collect();
    Some(names)
}

fn collect_imports(node: Node, source: &[u8], out: &mut Vec<RawImport>) {
    let line = node.start_position().row as u32 + 1;
    match node.kind() {
        "import_statement" => {
            let mut cursor = node.walk();
            for name in node.children_by_field_name("name", &mut cursor) {
                let module = match name.kind() {
                    "aliased_import" => name.child_by_field_name("name").map(|n| text(n, source)),
                    _ => Some(text(name, source)),
                };
                if let Some(module) = module {
                    out.push(RawImport {
                        source: module.to_string(),
                        names: Vec::new(),
                        line,
                    });
                }
            }
            return;
        }
        "import_from_statement" => {
            let Some(module) = node.child_by_field_name("module_name") else {
                return;
            };
            let mut cursor = node.walk();
            let mut names: Vec<String> = node
                .children_by_field_name("name", &mut cursor)
                .filter_map(|n| match n.kind() {
                    "aliased_import" => n.child_by_field_name("name"),
                    _ => Some(n),
                })
                .map(|n| text(n, source).to_string())
                .collect();
            let mut inner = node.walk();
            if node
                .named_children(&mut inner)
                .any(|c| c.kind() == "wildcard_import")
            {
                names.push("*".to_string());
            }
            out.push(RawImport {
                source: text(module, source).to_string(),
                names,
                line,
            });
            return;
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_imports(child, source, out);
    }
}

impl LanguageExtractor for PythonExtractor {
    fn extract(&self, path: &str, language: Language, content: &[u8]) -> FileParseResult {
        let hash = content_hash(content);
        let Some(tree) = parse(content) else {
            return FileParseResult::empty(path, hash, language, ParseStatus::SyntaxError);
        };
        let root = tree.root_node();
        if root.has_error() {
            tracing::debug!("Syntax error in {}", path);
            return FileParseResult::empty(path, hash, language, ParseStatus::SyntaxError);
        }

        let category = classify(path);
        let mut result = FileParseResult::empty(path, hash, language, ParseStatus::Parsed);
        let mut declared_all = None;

        let mut cursor = root.walk();
        for statement in root.named_children(&mut cursor) {
            if statement.kind() == "expression_statement" {
                if let Some(names) = dunder_all(statement, content) {
                    declared_all = Some(names);
                }
                continue;
            }
            let Some((outer, def)) = definition_of(statement) else {
                continue;
            };
            let entity = match def.kind() {
                "class_definition" => class_entity(outer, def, content, category),
                "function_definition" => function_entity(outer, def, content, category),
                _ => None,
            };
            result.entities.extend(entity);
        }

        collect_imports(root, content, &mut result.imports);

        result.exports = declared_all.unwrap_or_else(|| {
            result
                .entities
                .iter()
                .filter(|e| !e.name.starts_with('_'))
                .map(|e| e.name.clone())
                .collect()
        });

        tracing::debug!(
            "Extracted {} entities, {} imports from {}",
            result.entities.len(),
            result.imports.len(),
            path
        );
        result
    }
}
