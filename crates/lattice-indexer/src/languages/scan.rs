//! Text-scanning helpers shared by the pattern-based extractors
//!
//! Everything here is deliberately naive: braces and parentheses are counted
//! without regard for comments or string literals. Swapping in a real parser
//! only means replacing these functions.

use std::sync::LazyLock;

use lattice_core::{Category, EntityType, SymbolKind};
use regex::Regex;

/// Maps byte offsets to 1-based line numbers.
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        LineIndex { starts }
    }

    /// 1-based line containing `offset`.
    pub fn line_of(&self, offset: usize) -> u32 {
        self.starts.partition_point(|&start| start <= offset) as u32
    }
}

/// Trailing bytes that carry a declaration header onto the next line.
const CONTINUATION: &[u8] = b",:=>|&";

/// Offset of the last byte of the declaration starting at `start`.
///
/// Once a `{` is seen at paren depth zero, the declaration ends where brace
/// depth returns to zero. Before any brace it ends at `;`, or at a newline
/// outside parentheses unless the line ends in a continuation operator or
/// the next line opens the block.
pub fn block_end(text: &str, start: usize) -> usize {
    let bytes = text.as_bytes();
    let mut parens = 0i32;
    let mut depth = 0i32;
    let mut opened = false;

    for pos in start..bytes.len() {
        match bytes[pos] {
            b'(' | b'[' => parens += 1,
            b')' | b']' => parens -= 1,
            b'{' if parens <= 0 => {
                depth += 1;
                opened = true;
            }
            b'}' if parens <= 0 => {
                if !opened {
                    // Closing an enclosing block: we ran off the end of a one-liner.
                    return pos.saturating_sub(1).max(start);
                }
                depth -= 1;
                if depth == 0 {
                    return pos;
                }
            }
            b';' if !opened && parens <= 0 => return pos,
            b'\n' if !opened && parens <= 0 => {
                let dangling = bytes[start..pos]
                    .iter()
                    .rev()
                    .find(|b| !b.is_ascii_whitespace())
                    .is_some_and(|b| CONTINUATION.contains(b));
                let continues = bytes[pos + 1..]
                    .iter()
                    .find(|b| !b.is_ascii_whitespace())
                    .is_some_and(|b| *b == b'{');
                if !dangling && !continues {
                    return pos.saturating_sub(1).max(start);
                }
            }
            _ => {}
        }
    }
    bytes.len().saturating_sub(1)
}

/// Brace depth at the start of every line.
pub fn line_depths(text: &str) -> Vec<usize> {
    let mut depths = Vec::new();
    let mut depth = 0usize;
    for line in text.split('\n') {
        depths.push(depth);
        for b in line.bytes() {
            match b {
                b'{' => depth += 1,
                b'}' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
    }
    depths
}

/// Role implied by substrings of a declared name.
pub fn name_heuristic(name: &str) -> Option<EntityType> {
    const RULES: &[(EntityType, &[&str])] = &[
        (EntityType::Route, &["controller", "handler", "router"]),
        (EntityType::Service, &["service", "usecase", "provider"]),
        (EntityType::Dto, &["dto", "input", "output", "request", "response"]),
        (EntityType::Model, &["model", "entity", "schema"]),
        (EntityType::Middleware, &["middleware", "guard", "interceptor"]),
    ];
    let lower = name.to_lowercase();
    RULES
        .iter()
        .find(|(_, needles)| needles.iter().any(|n| lower.contains(n)))
        .map(|(ty, _)| *ty)
}

/// Entity type for a declaration with no stronger signal.
pub fn syntactic_type(kind: SymbolKind) -> EntityType {
    match kind {
        SymbolKind::Interface => EntityType::Interface,
        SymbolKind::Enum => EntityType::Enum,
        SymbolKind::TypeAlias => EntityType::TypeAlias,
        SymbolKind::Function => EntityType::Function,
        SymbolKind::Route => EntityType::Route,
        SymbolKind::Class | SymbolKind::Object | SymbolKind::Companion => EntityType::Class,
    }
}

/// File category, then name substrings, then the declaration's own kind.
pub fn classify_declaration(category: Category, name: &str, kind: SymbolKind) -> EntityType {
    category
        .entity_type()
        .or_else(|| name_heuristic(name))
        .unwrap_or_else(|| syntactic_type(kind))
}

/// Split a comma-separated list at depth zero, ignoring `<>`, `()` and `{}` nesting.
pub fn split_top_level(list: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    let mut prev = ' ';
    for c in list.chars() {
        let arrow = c == '>' && matches!(prev, '-' | '=');
        prev = c;
        match c {
            '<' | '(' | '{' | '[' => depth += 1,
            '>' if arrow => {}
            '>' | ')' | '}' | ']' => depth -= 1,
            ',' if depth == 0 => {
                let part = current.trim();
                if !part.is_empty() {
                    parts.push(part.to_string());
                }
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    let part = current.trim();
    if !part.is_empty() {
        parts.push(part.to_string());
    }
    parts
}

/// Collapse runs of whitespace so multi-line headers read as one line.
pub fn squash(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Header of a matched declaration, without a trailing `{`, `;` or `=`.
pub fn header(matched: &str) -> String {
    squash(matched.trim().trim_end_matches(['{', ';', '=']).trim_end())
}

/// Annotation lines directly above 0-based `line`.
///
/// Looks back over at most five non-blank lines and stops at the first
/// line that is not an annotation.
pub fn annotations_above(lines: &[&str], line: usize) -> Vec<String> {
    let mut found = Vec::new();
    let mut seen = 0;
    for candidate in lines[..line.min(lines.len())].iter().rev() {
        let trimmed = candidate.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen == 5 || !trimmed.starts_with('@') {
            break;
        }
        seen += 1;
        found.push(trimmed.to_string());
    }
    found.reverse();
    found
}

/// Annotation names in `text`: `@Entity @Table(name = "x")` → `Entity`, `Table`.
pub fn annotation_names(text: &str) -> Vec<String> {
    ANNOTATION
        .captures_iter(text)
        .map(|c| c["name"].to_string())
        .collect()
}

static ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@(?:[a-z]+:)?(?P<name>[A-Za-z_][\w.]*)").expect("annotation pattern"));

/// `/prefix/path`, with empty segments dropped.
pub fn join_route(prefix: &str, path: &str) -> String {
    let joined: Vec<&str> = [prefix, path]
        .iter()
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
        .collect();
    format!("/{}", joined.join("/"))
}
