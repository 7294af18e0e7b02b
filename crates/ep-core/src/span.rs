use core::fmt;

/// Half-open byte range `[start, end)` into a host text.
///
/// Spans are always recomputed from the current text; they are never
/// carried across an edit.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start {start} after end {end}");
        Self { start, end }
    }

    pub fn len(self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(self) -> bool {
        self.start == self.end
    }

    pub fn contains(self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    pub fn slice(self, text: &str) -> &str {
        &text[self.start..self.end]
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Build `prefix + replacement + suffix` around `span`.
pub fn splice(text: &str, span: Span, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len() - span.len() + replacement.len());
    out.push_str(&text[..span.start]);
    out.push_str(replacement);
    out.push_str(&text[span.end..]);
    out
}

/// Offset of the first byte of the line containing `offset`.
pub fn line_start(text: &str, offset: usize) -> usize {
    text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

/// Offset of the `\n` ending the line containing `offset` (or `text.len()`).
pub fn line_end(text: &str, offset: usize) -> usize {
    text[offset..]
        .find('\n')
        .map(|i| offset + i)
        .unwrap_or(text.len())
}

/// Leading spaces/tabs of the line containing `offset`.
pub fn line_indent(text: &str, offset: usize) -> &str {
    let start = line_start(text, offset);
    let line = &text[start..line_end(text, start)];
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splice_reassembles_prefix_and_suffix() {
        let text = "alpha [1 2] omega";
        let span = Span::new(6, 11);
        assert_eq!(span.slice(text), "[1 2]");
        assert_eq!(splice(text, span, "[3]"), "alpha [3] omega");
    }

    #[test]
    fn line_helpers() {
        let text = "a\n    b = 1;\nc";
        let b = text.find('b').unwrap();
        assert_eq!(line_start(text, b), 2);
        assert_eq!(line_end(text, b), 13);
        assert_eq!(line_indent(text, b), "    ");
        assert_eq!(line_end(text, text.len() - 1), text.len());
    }
}
