//! Locating `key = value;` statements, live or commented out.

use ep_core::span::{line_end, splice};
use ep_core::{EditError, EditResult, ScanTable, Span, Syntax};
use regex::Regex;

/// One assignment statement for a key as it currently appears in the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterAssignment {
    pub key: String,
    /// Literal text of the value, exactly as written.
    pub raw: String,
    pub is_commented: bool,
    /// Comment marker plus the whitespace after it (`% `), when commented.
    pub marker: Option<Span>,
    /// From the key through the `=` and following whitespace.
    pub head: Span,
    pub value: Span,
}

impl ParameterAssignment {
    /// Start of the rewritable region (marker if present, else key).
    fn lead(&self) -> usize {
        self.marker.map(|m| m.start).unwrap_or(self.head.start)
    }
}

fn statement_pattern(key: &str) -> EditResult<Regex> {
    if key.trim().is_empty() {
        return Err(EditError::not_found("empty assignment key"));
    }
    let pattern = format!(
        r"(?m)(?:^[ \t]*(?P<marker>%+[ \t]*)?|(?P<sep>[;,])[ \t]*)(?P<key>{})[ \t]*=",
        regex::escape(key)
    );
    Regex::new(&pattern).map_err(|e| EditError::malformed("key pattern", e.to_string()))
}

/// Every assignment to `key`, in text order.
pub fn find_assignments(text: &str, key: &str) -> EditResult<Vec<ParameterAssignment>> {
    let pattern = statement_pattern(key)?;
    let table = ScanTable::build(text, Syntax::Script);
    let mut found = Vec::new();

    for caps in pattern.captures_iter(text) {
        let (Some(whole), Some(key_match)) = (caps.get(0), caps.name("key")) else {
            continue;
        };
        // `==` is a comparison, not an assignment.
        if text[whole.end()..].starts_with('=') {
            continue;
        }
        let marker = caps.name("marker").map(|m| Span::new(m.start(), m.end()));
        if let Some(sep) = caps.name("sep") {
            if !table.is_code(sep.start()) {
                continue;
            }
        } else if marker.is_none() && !table.is_code(key_match.start()) {
            continue;
        }

        let is_commented = marker.is_some();
        let value_start = skip_blanks(text, whole.end());
        let value = value_extent(text, value_start, is_commented)?;
        found.push(ParameterAssignment {
            key: key.to_string(),
            raw: value.slice(text).to_string(),
            is_commented,
            marker,
            head: Span::new(key_match.start(), value_start),
            value,
        });
    }
    Ok(found)
}

pub fn first_live(text: &str, key: &str) -> EditResult<ParameterAssignment> {
    find_assignments(text, key)?
        .into_iter()
        .find(|a| !a.is_commented)
        .ok_or_else(|| EditError::not_found(format!("assignment to `{key}`")))
}

pub fn first_commented(text: &str, key: &str) -> EditResult<ParameterAssignment> {
    find_assignments(text, key)?
        .into_iter()
        .find(|a| a.is_commented)
        .ok_or_else(|| EditError::not_found(format!("commented assignment to `{key}`")))
}

/// Substitute the value of the first live assignment to `key`.
pub fn replace_value(text: &str, key: &str, raw: &str) -> EditResult<String> {
    let assignment = first_live(text, key)?;
    Ok(splice(text, assignment.value, raw))
}

/// Rewrite one assignment with a new value and comment state.
///
/// An existing comment marker is kept verbatim; a new one is `% `.
pub fn rewrite(
    text: &str,
    assignment: &ParameterAssignment,
    commented: bool,
    raw: &str,
) -> String {
    let marker = match (commented, assignment.marker) {
        (true, Some(existing)) => existing.slice(text),
        (true, None) => "% ",
        (false, _) => "",
    };
    let replacement = format!("{marker}{}{raw}", assignment.head.slice(text));
    splice(
        text,
        Span::new(assignment.lead(), assignment.value.end),
        &replacement,
    )
}

fn skip_blanks(text: &str, from: usize) -> usize {
    let rest = &text[from..];
    from + (rest.len() - rest.trim_start_matches([' ', '\t']).len())
}

fn is_operand_tail(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b')' | b']' | b'}' | b'.' | b'\'')
}

/// Span of the value starting at `start`, ending before `;`, an inline
/// comment, or the end of the statement's line. Brackets may span lines
/// unless the statement is commented out.
fn value_extent(text: &str, start: usize, single_line: bool) -> EditResult<Span> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut last_code = start;
    let mut i = start;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'\'' | b'"' if !(b == b'\'' && i > start && is_operand_tail(bytes[i - 1])) => {
                i = quoted_end(bytes, i);
                last_code = i;
                continue;
            }
            b'[' | b'{' | b'(' => depth += 1,
            b']' | b'}' | b')' => {
                if depth == 0 {
                    return Err(EditError::unbalanced("assignment value", start));
                }
                depth -= 1;
            }
            b';' if depth == 0 => break,
            b'%' => {
                if depth == 0 {
                    break;
                }
                i = line_end(text, i);
                continue;
            }
            b'.' if text[i..].starts_with("...") && !single_line => {
                i = (line_end(text, i) + 1).min(bytes.len());
                continue;
            }
            b'\n' if depth == 0 || single_line => break,
            _ => {}
        }
        if !b.is_ascii_whitespace() {
            last_code = i + 1;
        }
        i += 1;
    }

    if depth > 0 {
        return Err(EditError::unbalanced("assignment value", start));
    }
    Ok(Span::new(start, last_code.max(start)))
}

fn quoted_end(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut j = start + 1;
    while j < bytes.len() {
        match bytes[j] {
            c if c == quote => {
                if bytes.get(j + 1) == Some(&quote) {
                    j += 2;
                    continue;
                }
                return j + 1;
            }
            b'\n' => return j,
            _ => j += 1,
        }
    }
    bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = "\
cfg = [];
cfg.trialdef.prestim    = 0.5; % in seconds
cfg.demean = 'no';
% cfg.baselinewindow = [-0.2 0];
if x == 1, cfg.trialfun = 'ft_trialfun_general'; end
cfg.trialdef.eventvalue = {'S200' 'S201' ...
                           'S202'};
";

    #[test]
    fn finds_live_statement_and_keeps_inline_comment() {
        let a = first_live(SCRIPT, "cfg.trialdef.prestim").unwrap();
        assert_eq!(a.raw, "0.5");
        assert!(!a.is_commented);
        let out = replace_value(SCRIPT, "cfg.trialdef.prestim", "0.3").unwrap();
        assert!(out.contains("cfg.trialdef.prestim    = 0.3; % in seconds\n"));
        assert_eq!(out.len(), SCRIPT.len());
    }

    #[test]
    fn commented_statement_is_reported_as_commented() {
        let all = find_assignments(SCRIPT, "cfg.baselinewindow").unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].is_commented);
        assert_eq!(all[0].raw, "[-0.2 0]");
        assert!(first_live(SCRIPT, "cfg.baselinewindow").is_err());
    }

    #[test]
    fn statement_after_separator_is_found() {
        let a = first_live(SCRIPT, "cfg.trialfun").unwrap();
        assert_eq!(a.raw, "'ft_trialfun_general'");
    }

    #[test]
    fn continuation_lines_are_part_of_the_value() {
        let a = first_live(SCRIPT, "cfg.trialdef.eventvalue").unwrap();
        assert!(a.raw.starts_with("{'S200' 'S201' ..."));
        assert!(a.raw.ends_with("'S202'}"));
    }

    #[test]
    fn key_must_match_exactly() {
        assert!(first_live(SCRIPT, "cfg.trialdef.pre").is_err());
        assert!(first_live(SCRIPT, "trialdef.prestim").is_err());
        assert!(first_live(SCRIPT, "x").is_err());
    }

    #[test]
    fn rewrite_toggles_comment_marker() {
        let a = first_commented(SCRIPT, "cfg.baselinewindow").unwrap();
        let live = rewrite(SCRIPT, &a, false, "[-0.1 0.3]");
        assert!(live.contains("\ncfg.baselinewindow = [-0.1 0.3];\n"));
        let b = first_live(&live, "cfg.baselinewindow").unwrap();
        let back = rewrite(&live, &b, true, "[-0.2 0]");
        assert_eq!(back, SCRIPT);
    }

    #[test]
    fn unbalanced_value_is_rejected() {
        let text = "cfg.dftfreq = [50 60;\n";
        assert!(matches!(
            find_assignments(text, "cfg.dftfreq"),
            Err(EditError::UnbalancedDelimiters { .. })
        ));
    }
}
