//! Replacement of a named list literal inside source text.
//!
//! The literal is found after a marker identifier and delimited by a
//! bracket depth scan, so lists of records holding nested lists are handled.
//! A `+ [...]` continuation directly after the literal is treated as part
//! of it and replaced together with it.

use crate::error::{EditError, EditResult};
use crate::scan::{ScanTable, Syntax};
use crate::span::{Span, line_end, splice};

/// Span of the first list literal bound to `marker`, without continuations.
pub fn first_list_literal_span(text: &str, marker: &str, syntax: Syntax) -> EditResult<Span> {
    let table = ScanTable::build(text, syntax);
    literal_after_marker(text, &table, marker)
}

/// Span of the list literal bound to `marker`, continuations included.
pub fn list_literal_span(text: &str, marker: &str, syntax: Syntax) -> EditResult<Span> {
    let table = ScanTable::build(text, syntax);
    let first = literal_after_marker(text, &table, marker)?;
    let mut end = first.end;

    while let Some(next_open) = continuation_open(text, end) {
        let close = table.matching_close(next_open).map_err(|_| {
            EditError::unbalanced(format!("list continuation of `{marker}`"), next_open)
        })?;
        end = close + 1;
    }

    Ok(Span::new(first.start, end))
}

fn literal_after_marker(text: &str, table: &ScanTable, marker: &str) -> EditResult<Span> {
    let marker_at = find_code(text, table, marker)
        .ok_or_else(|| EditError::not_found(format!("marker `{marker}`")))?;
    let marker_end = marker_at + marker.len();

    // Skip a type annotation such as `: List[dict]` by starting after the
    // assignment operator when the marker's line has one.
    let eol = line_end(text, marker_end);
    let search_from = text[marker_end..eol]
        .match_indices('=')
        .map(|(i, _)| marker_end + i)
        .find(|&i| table.is_code(i))
        .map(|i| i + 1)
        .unwrap_or(marker_end);

    let open = table
        .next_open(search_from, b'[')
        .ok_or_else(|| EditError::not_found(format!("list literal after `{marker}`")))?;
    let close = table
        .matching_close(open)
        .map_err(|_| EditError::unbalanced(format!("list literal `{marker}`"), open))?;
    Ok(Span::new(open, close + 1))
}

/// Replace the literal bound to `marker` with `literal`.
///
/// Fails without touching anything when the marker is missing or any
/// bracket scan runs off the end of the text.
pub fn replace_list_literal(
    text: &str,
    marker: &str,
    literal: &str,
    syntax: Syntax,
) -> EditResult<String> {
    let span = list_literal_span(text, marker, syntax)?;
    tracing::debug!(marker, ?span, "replacing list literal");
    Ok(splice(text, span, literal))
}

fn find_code(text: &str, table: &ScanTable, needle: &str) -> Option<usize> {
    text.match_indices(needle)
        .map(|(i, _)| i)
        .find(|&i| table.is_code(i) && is_word_boundary(text, i, needle.len()))
}

fn is_word_boundary(text: &str, at: usize, len: usize) -> bool {
    let is_ident = |c: char| c.is_alphanumeric() || c == '_';
    let before = text[..at].chars().next_back().is_none_or(|c| !is_ident(c));
    let after = text[at + len..].chars().next().is_none_or(|c| !is_ident(c));
    before && after
}

/// Offset of the `[` in a `+ [` directly following `from`, if present.
fn continuation_open(text: &str, from: usize) -> Option<usize> {
    let rest = &text[from..];
    let after_ws = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '\\');
    let after_plus = after_ws.strip_prefix('+')?;
    let after_ws2 = after_plus.trim_start_matches(|c: char| c.is_whitespace() || c == '\\');
    after_ws2
        .starts_with('[')
        .then(|| text.len() - after_ws2.len())
}
