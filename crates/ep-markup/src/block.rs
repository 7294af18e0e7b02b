//! Structural blocks and their direct properties.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use ep_core::literal::{
    format_float, format_markup_list, parse_markup_list, parse_markup_string, quote_markup,
};
use ep_core::span::line_start;
use ep_core::{EditError, EditResult, FloatFormat, ScanTable, Span};
use regex::Regex;

static PROPERTY_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?:readonly\s+|default\s+|required\s+)*property\s+[\w.<>]+\s+)?(?P<name>[A-Za-z_][\w.]*)[ \t]*:",
    )
    .expect("PROPERTY_HEAD is a valid static regex pattern")
});

/// Typed value of a markup property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    List(Vec<String>),
    /// Anything else (bindings, expressions, handlers), kept verbatim.
    Expr(String),
}

impl PropertyValue {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with(['"', '\'']) {
            if let Ok(s) = parse_markup_string(raw) {
                return PropertyValue::String(s);
            }
        }
        if raw.starts_with('[') {
            if let Ok(items) = parse_markup_list(raw) {
                return PropertyValue::List(items);
            }
        }
        match raw {
            "true" => return PropertyValue::Bool(true),
            "false" => return PropertyValue::Bool(false),
            _ => {}
        }
        if let Ok(int) = raw.parse::<i64>() {
            return PropertyValue::Int(int);
        }
        if raw.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '.') {
            if let Ok(float) = raw.parse::<f64>() {
                if float.is_finite() {
                    return PropertyValue::Float(float);
                }
            }
        }
        PropertyValue::Expr(raw.to_string())
    }

    pub fn to_markup(&self) -> String {
        match self {
            PropertyValue::String(s) => quote_markup(s),
            PropertyValue::Bool(b) => b.to_string(),
            PropertyValue::Int(i) => i.to_string(),
            PropertyValue::Float(f) => format_float(*f, FloatFormat::Shortest),
            PropertyValue::List(items) => format_markup_list(items),
            PropertyValue::Expr(e) => e.clone(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value; integers widen.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            PropertyValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            PropertyValue::List(items) => Some(items),
            _ => None,
        }
    }
}

/// Where one direct property of a block sits in the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySite {
    pub name: String,
    /// From the first byte of the statement through the value.
    pub statement: Span,
    pub value: Span,
}

/// A located block: its keyword, id, properties and exact span.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentBlock {
    pub keyword: String,
    pub id: String,
    /// Leading newline through the closing brace.
    pub span: Span,
    /// Opening through closing brace.
    pub body: Span,
    pub properties: BTreeMap<String, PropertyValue>,
}

impl ComponentBlock {
    pub fn parse(text: &str, table: &ScanTable, body: Span) -> Self {
        let properties: BTreeMap<_, _> = direct_properties(text, table, body)
            .into_iter()
            .map(|site| (site.name, PropertyValue::parse(site.value.slice(text))))
            .collect();
        let id = match properties.get("id") {
            Some(PropertyValue::Expr(id)) => id.clone(),
            _ => String::new(),
        };
        Self {
            keyword: keyword_before(text, body.start).to_string(),
            id,
            span: block_span(text, body),
            body,
            properties,
        }
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }
}

/// Body (opening through closing brace) of the element carrying `id: <id>`.
pub fn element_body(text: &str, table: &ScanTable, id: &str) -> EditResult<Span> {
    let marker = Regex::new(&format!(r"\bid[ \t]*:[ \t]*{}\b", regex::escape(id)))
        .map_err(|e| EditError::malformed("id pattern", e.to_string()))?;
    let at = marker
        .find_iter(text)
        .map(|m| m.start())
        .find(|&i| table.is_code(i))
        .ok_or_else(|| EditError::not_found(format!("element `{id}`")))?;
    table
        .enclosing_brace(at)
        .ok_or_else(|| EditError::unbalanced(format!("element `{id}`"), at))
}

/// Block span for replacement and removal: the newline ending the
/// previous line through the closing brace.
pub fn block_span(text: &str, body: Span) -> Span {
    let start = line_start(text, body.start);
    Span::new(start.saturating_sub(1), body.end)
}

/// Identifier directly in front of an opening brace (`Keyword {`).
fn keyword_before(text: &str, open: usize) -> &str {
    let head = text[..open].trim_end();
    let start = head
        .rfind(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
        .map(|i| i + 1)
        .unwrap_or(0);
    &head[start..]
}

/// Properties declared directly inside `body`; nested children are skipped.
pub fn direct_properties(text: &str, table: &ScanTable, body: Span) -> Vec<PropertySite> {
    let bytes = text.as_bytes();
    let inner_end = body.end.saturating_sub(1);
    let mut starts = vec![body.start + 1];
    starts.extend(
        (body.start + 1..inner_end)
            .filter(|&i| matches!(bytes[i], b'\n' | b';') && table.is_code(i))
            .map(|i| i + 1),
    );

    let mut sites = Vec::new();
    let mut resume = body.start + 1;
    for start in starts {
        let at = start
            + text[start..inner_end]
                .bytes()
                .take_while(|b| matches!(b, b' ' | b'\t'))
                .count();
        if at < resume || at >= inner_end || !table.is_code(at) {
            continue;
        }
        if table.brace_depth_within(body, at) != 1 {
            continue;
        }
        let Some(caps) = PROPERTY_HEAD.captures(&text[at..inner_end]) else {
            continue;
        };
        let (Some(whole), Some(name)) = (caps.get(0), caps.name("name")) else {
            continue;
        };
        let value_start = skip_blanks(text, at + whole.end());
        let value = value_extent(text, table, value_start, inner_end);
        resume = value.end;
        sites.push(PropertySite {
            name: name.as_str().to_string(),
            statement: Span::new(at, value.end),
            value,
        });
    }
    sites
}

fn skip_blanks(text: &str, from: usize) -> usize {
    let rest = &text[from..];
    from + (rest.len() - rest.trim_start_matches([' ', '\t']).len())
}

/// A bracketed or braced value runs to its matching close; anything else
/// to the end of the line, a `;` or a trailing comment.
fn value_extent(text: &str, table: &ScanTable, start: usize, limit: usize) -> Span {
    let bytes = text.as_bytes();
    if start < limit && matches!(bytes[start], b'[' | b'{') {
        if let Ok(close) = table.matching_close(start) {
            if close < limit {
                return Span::new(start, close + 1);
            }
        }
    }
    let mut end = start;
    let mut i = start;
    while i < limit {
        let b = bytes[i];
        if b == b'\n' || (b == b';' && table.is_code(i)) || starts_comment(table, bytes, i) {
            break;
        }
        if !b.is_ascii_whitespace() {
            end = i + 1;
        }
        i += 1;
    }
    Span::new(start, end)
}

fn starts_comment(table: &ScanTable, bytes: &[u8], at: usize) -> bool {
    (bytes[at..].starts_with(b"//") || bytes[at..].starts_with(b"/*"))
        && table.inert_at(at).is_some_and(|s| s.start == at)
}
