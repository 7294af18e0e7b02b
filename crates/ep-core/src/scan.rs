//! Delimiter scanning that is not fooled by strings or comments.
//!
//! One pass over the text produces a [`ScanTable`]: every structural
//! bracket that sits in code (not inside a quoted literal or a comment),
//! the matching pair for each balanced opener, and the inert regions that
//! were skipped. All later edits are pure offset arithmetic on that table.

use std::collections::BTreeMap;

use crate::error::{EditError, EditResult};
use crate::span::Span;

/// Lexical rules of a host text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Syntax {
    /// Declarative UI markup: `//` and `/* */` comments, `"`/`'` strings
    /// with backslash escapes.
    Markup,
    /// Numerical scripting language: `%` comments, `'` strings with `''`
    /// escapes (a quote directly after an operand is a transpose).
    Script,
    /// Python source: `#` comments, single and triple quoted strings.
    Python,
}

impl Syntax {
    fn line_comment(self) -> &'static [u8] {
        match self {
            Syntax::Markup => b"//",
            Syntax::Script => b"%",
            Syntax::Python => b"#",
        }
    }

    fn block_comment(self) -> Option<(&'static [u8], &'static [u8])> {
        match self {
            Syntax::Markup => Some((b"/*", b"*/")),
            Syntax::Script | Syntax::Python => None,
        }
    }

    fn backslash_escapes(self) -> bool {
        !matches!(self, Syntax::Script)
    }
}

/// A structural bracket in code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delim {
    pub offset: usize,
    pub byte: u8,
}

impl Delim {
    pub fn is_open(self) -> bool {
        matches!(self.byte, b'{' | b'[' | b'(')
    }
}

fn kind_index(byte: u8) -> usize {
    match byte {
        b'{' | b'}' => 0,
        b'[' | b']' => 1,
        _ => 2,
    }
}

#[derive(Debug, Clone)]
pub struct ScanTable {
    delims: Vec<Delim>,
    pairs: BTreeMap<usize, usize>,
    inert: Vec<Span>,
}

impl ScanTable {
    pub fn build(text: &str, syntax: Syntax) -> Self {
        let bytes = text.as_bytes();
        let n = bytes.len();
        let mut delims = Vec::new();
        let mut inert = Vec::new();
        let mut pairs = BTreeMap::new();
        // Depth is tracked per bracket kind, one stack each.
        let mut stacks: [Vec<usize>; 3] = [Vec::new(), Vec::new(), Vec::new()];

        let mut i = 0;
        while i < n {
            let b = bytes[i];

            if bytes[i..].starts_with(syntax.line_comment()) {
                let end = find_byte(bytes, i, b'\n').unwrap_or(n);
                inert.push(Span::new(i, end));
                i = end;
                continue;
            }

            if let Some((open, close)) = syntax.block_comment() {
                if bytes[i..].starts_with(open) {
                    let end = find_seq(bytes, i + open.len(), close)
                        .map(|e| e + close.len())
                        .unwrap_or(n);
                    inert.push(Span::new(i, end));
                    i = end;
                    continue;
                }
            }

            if b == b'"' || b == b'\'' {
                let is_transpose = syntax == Syntax::Script
                    && b == b'\''
                    && i > 0
                    && is_operand_tail(bytes[i - 1]);
                if !is_transpose {
                    let end = string_end(bytes, i, syntax);
                    inert.push(Span::new(i, end));
                    i = end;
                    continue;
                }
            }

            match b {
                b'{' | b'[' | b'(' => {
                    delims.push(Delim { offset: i, byte: b });
                    stacks[kind_index(b)].push(i);
                }
                b'}' | b']' | b')' => {
                    delims.push(Delim { offset: i, byte: b });
                    if let Some(open) = stacks[kind_index(b)].pop() {
                        pairs.insert(open, i);
                    }
                }
                _ => {}
            }
            i += 1;
        }

        Self {
            delims,
            pairs,
            inert,
        }
    }

    pub fn delimiters(&self) -> &[Delim] {
        &self.delims
    }

    /// True when `offset` is outside every string literal and comment.
    pub fn is_code(&self, offset: usize) -> bool {
        let idx = self.inert.partition_point(|s| s.end <= offset);
        self.inert.get(idx).is_none_or(|s| !s.contains(offset))
    }

    /// The string literal or comment covering `offset`, if any.
    pub fn inert_at(&self, offset: usize) -> Option<Span> {
        let idx = self.inert.partition_point(|s| s.end <= offset);
        self.inert.get(idx).copied().filter(|s| s.contains(offset))
    }

    /// Offset of the bracket closing the opener at `open`.
    pub fn matching_close(&self, open: usize) -> EditResult<usize> {
        if !self.is_open_at(open) {
            return Err(EditError::not_found(format!("opening bracket at offset {open}")));
        }
        self.pairs
            .get(&open)
            .copied()
            .ok_or_else(|| EditError::unbalanced("bracket scan", open))
    }

    fn is_open_at(&self, offset: usize) -> bool {
        self.delims
            .binary_search_by_key(&offset, |d| d.offset)
            .map(|idx| self.delims[idx].is_open())
            .unwrap_or(false)
    }

    /// First code opener of kind `byte` at or after `from`.
    pub fn next_open(&self, from: usize, byte: u8) -> Option<usize> {
        let idx = self.delims.partition_point(|d| d.offset < from);
        self.delims[idx..]
            .iter()
            .find(|d| d.byte == byte)
            .map(|d| d.offset)
    }

    /// Innermost balanced `{`..`}` pair strictly enclosing `offset`.
    pub fn enclosing_brace(&self, offset: usize) -> Option<Span> {
        self.pairs
            .range(..offset)
            .rev()
            .filter(|&(&open, _)| self.delims_byte(open) == Some(b'{'))
            .find(|&(_, &close)| close > offset)
            .map(|(&open, &close)| Span::new(open, close + 1))
    }

    fn delims_byte(&self, offset: usize) -> Option<u8> {
        self.delims
            .binary_search_by_key(&offset, |d| d.offset)
            .ok()
            .map(|idx| self.delims[idx].byte)
    }

    /// Brace nesting depth of `offset` relative to the pair at `outer`.
    ///
    /// Returns 1 for offsets directly inside `outer`, 2 inside a child, etc.
    pub fn brace_depth_within(&self, outer: Span, offset: usize) -> usize {
        self.pairs
            .range(outer.start..offset)
            .filter(|&(&open, _)| self.delims_byte(open) == Some(b'{'))
            .filter(|&(_, &close)| close >= offset)
            .count()
    }
}

fn is_operand_tail(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b')' | b']' | b'}' | b'.' | b'\'')
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes[from..].iter().position(|&b| b == needle).map(|p| p + from)
}

fn find_seq(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Offset one past the closing quote of the literal opening at `start`.
fn string_end(bytes: &[u8], start: usize, syntax: Syntax) -> usize {
    let n = bytes.len();
    let quote = bytes[start];

    if syntax == Syntax::Python {
        let triple = [quote; 3];
        if bytes[start..].starts_with(&triple) {
            return find_seq(bytes, start + 3, &triple)
                .map(|e| e + 3)
                .unwrap_or(n);
        }
    }

    let mut j = start + 1;
    while j < n {
        let c = bytes[j];
        if syntax.backslash_escapes() && c == b'\\' {
            j += 2;
            continue;
        }
        if c == quote {
            if syntax == Syntax::Script && j + 1 < n && bytes[j + 1] == quote {
                j += 2;
                continue;
            }
            return j + 1;
        }
        // Unterminated literals stop at the end of their line.
        if c == b'\n' {
            return j;
        }
        j += 1;
    }
    n
}
