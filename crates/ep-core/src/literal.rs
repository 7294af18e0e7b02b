//! Literal codecs shared by both host syntaxes.
//!
//! Script side: decimals, `[a b]` numeric arrays, `'text'` strings and
//! `{'a' 'b'}` cell lists. Markup side: `"text"` strings with backslash
//! escapes and `["a", "b"]` string lists.

use crate::error::{EditError, EditResult};

/// How a float is rendered back into host text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FloatFormat {
    /// Shortest text that parses back to the same value.
    #[default]
    Shortest,
    /// Fixed number of decimal places.
    Fixed(usize),
}

pub fn format_float(value: f64, format: FloatFormat) -> String {
    let text = match format {
        FloatFormat::Shortest => format!("{value}"),
        FloatFormat::Fixed(places) => format!("{value:.places$}"),
    };
    // "-0.0" and friends read badly in a config file.
    match text.strip_prefix('-') {
        Some(rest) if rest.bytes().all(|b| b == b'0' || b == b'.') => rest.to_string(),
        _ => text,
    }
}

/// Parse a decimal literal with an optional leading `-`.
pub fn parse_float(raw: &str) -> EditResult<f64> {
    let trimmed = raw.trim();
    let body = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let well_formed = !body.is_empty()
        && body.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        && body
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
    if !well_formed {
        return Err(EditError::malformed("float", trimmed));
    }
    trimmed
        .parse::<f64>()
        .map_err(|_| EditError::malformed("float", trimmed))
}

/// Parse `[a b c]` (whitespace or comma separated) into floats.
pub fn parse_float_array(raw: &str) -> EditResult<Vec<f64>> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| EditError::malformed("float array", trimmed))?;
    inner
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|tok| !tok.is_empty())
        .map(parse_float)
        .collect()
}

pub fn format_float_array(values: &[f64], format: FloatFormat) -> String {
    let items: Vec<String> = values.iter().map(|v| format_float(*v, format)).collect();
    format!("[{}]", items.join(" "))
}

/// Quote text as a script string literal (`'` doubled).
pub fn quote_script(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Decode a single script string literal.
pub fn parse_script_string(raw: &str) -> EditResult<String> {
    let trimmed = raw.trim();
    let mut items = script_strings(trimmed);
    match (items.len(), trimmed.starts_with('\''), trimmed.ends_with('\'')) {
        (1, true, true) => Ok(items.remove(0)),
        _ => Err(EditError::malformed("string", trimmed)),
    }
}

/// Separator placed between cell list items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellSeparator {
    #[default]
    Space,
    Comma,
}

impl CellSeparator {
    fn as_str(self) -> &'static str {
        match self {
            CellSeparator::Space => " ",
            CellSeparator::Comma => ", ",
        }
    }
}

/// Parse every quoted item inside `{ ... }`.
pub fn parse_cell_strings(raw: &str) -> EditResult<Vec<String>> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(|| EditError::malformed("cell list", trimmed))?;
    Ok(script_strings(inner))
}

pub fn format_cell_strings(items: &[String], separator: CellSeparator) -> String {
    let quoted: Vec<String> = items.iter().map(|s| quote_script(s)).collect();
    format!("{{{}}}", quoted.join(separator.as_str()))
}

/// All `'...'` literals in `text`, decoding `''` escapes.
fn script_strings(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\'' {
            continue;
        }
        let mut item = String::new();
        loop {
            match chars.next() {
                Some('\'') if chars.peek() == Some(&'\'') => {
                    chars.next();
                    item.push('\'');
                }
                Some('\'') | None => break,
                Some(other) => item.push(other),
            }
        }
        out.push(item);
    }
    out
}

/// Escape backslashes and double quotes for a markup string.
pub fn escape_markup(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

pub fn quote_markup(value: &str) -> String {
    format!("\"{}\"", escape_markup(value))
}

/// Decode one markup string literal (either quote style).
pub fn parse_markup_string(raw: &str) -> EditResult<String> {
    let trimmed = raw.trim();
    let mut items = markup_strings(trimmed).ok_or_else(|| EditError::malformed("string", trimmed))?;
    let quoted = trimmed.len() >= 2
        && (trimmed.starts_with('"') && trimmed.ends_with('"')
            || trimmed.starts_with('\'') && trimmed.ends_with('\''));
    if items.len() == 1 && quoted {
        Ok(items.remove(0))
    } else {
        Err(EditError::malformed("string", trimmed))
    }
}

/// Parse `["a", "b"]` into its items.
pub fn parse_markup_list(raw: &str) -> EditResult<Vec<String>> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| EditError::malformed("list", trimmed))?;
    markup_strings(inner).ok_or_else(|| EditError::malformed("list", trimmed))
}

/// Empty items are dropped.
pub fn format_markup_list<S: AsRef<str>>(items: &[S]) -> String {
    let quoted: Vec<String> = items
        .iter()
        .map(AsRef::as_ref)
        .filter(|s| !s.is_empty())
        .map(quote_markup)
        .collect();
    format!("[{}]", quoted.join(", "))
}

/// Quoted items in `text`; anything other than separators between them
/// makes the text malformed.
fn markup_strings(text: &str) -> Option<Vec<String>> {
    let mut out = Vec::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' | '\'' => {
                let quote = c;
                let mut item = String::new();
                loop {
                    match chars.next()? {
                        '\\' => match chars.next()? {
                            'n' => item.push('\n'),
                            't' => item.push('\t'),
                            other => item.push(other),
                        },
                        ch if ch == quote => break,
                        ch => item.push(ch),
                    }
                }
                out.push(item);
            }
            ',' => {}
            ch if ch.is_whitespace() => {}
            _ => return None,
        }
    }
    Some(out)
}
