//! Id-keyed registry of repeatable blocks inside the page markup.
//!
//! Blocks of one family share a keyword and an id prefix
//! (`DropdownTemplate { id: customDropdown3 ... }`). Every lookup rescans
//! the text; spans are never cached across edits.

use ep_core::span::{line_indent, line_start, splice};
use ep_core::{EditError, EditResult, ScanTable, Span, Syntax};
use regex::Regex;

use crate::block::{ComponentBlock, block_span, element_body};

/// Marker id of the column that holds user-created blocks.
pub const CONTAINER_ID: &str = "customDropdownContainer";

const INDENT_STEP: &str = "    ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockFamily {
    pub keyword: &'static str,
    pub prefix: &'static str,
    /// Property whose value identifies a block by content.
    pub key_property: &'static str,
}

/// A block as found by [`locate_family`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedBlock {
    pub id: String,
    pub index: u64,
    /// Opening through closing brace.
    pub body: Span,
    /// Leading newline through closing brace.
    pub span: Span,
}

/// Typed content of one family's blocks.
pub trait BlockSpec: Sized {
    fn family() -> BlockFamily;

    /// Value of the family's key property for this content.
    fn key(&self) -> String;

    /// `name: value` lines in emission order, without indentation.
    fn lines(&self, id: &str) -> Vec<String>;

    fn from_block(block: &ComponentBlock) -> Option<Self>;
}

fn opener_pattern(family: &BlockFamily) -> EditResult<Regex> {
    let pattern = format!(
        r"(?m)^[ \t]*(?P<keyword>{})[ \t]*(?P<brace>\{{)\s*id[ \t]*:[ \t]*(?P<id>{}(?P<n>\d+))\b",
        regex::escape(family.keyword),
        regex::escape(family.prefix),
    );
    Regex::new(&pattern).map_err(|e| EditError::malformed("block pattern", e.to_string()))
}

/// Every block of `family`, in text order.
pub fn locate_family(text: &str, family: &BlockFamily) -> EditResult<Vec<LocatedBlock>> {
    let pattern = opener_pattern(family)?;
    let table = ScanTable::build(text, Syntax::Markup);
    let mut found = Vec::new();

    for caps in pattern.captures_iter(text) {
        let (Some(keyword), Some(brace), Some(id), Some(n)) = (
            caps.name("keyword"),
            caps.name("brace"),
            caps.name("id"),
            caps.name("n"),
        ) else {
            continue;
        };
        if !table.is_code(keyword.start()) {
            continue;
        }
        // Depth counting starts at the opener's own brace.
        let close = table
            .matching_close(brace.start())
            .map_err(|_| EditError::unbalanced(format!("block `{}`", id.as_str()), brace.start()))?;
        let index = n
            .as_str()
            .parse()
            .map_err(|_| EditError::malformed("block id", id.as_str()))?;
        let body = Span::new(brace.start(), close + 1);
        found.push(LocatedBlock {
            id: id.as_str().to_string(),
            index,
            body,
            span: block_span(text, body),
        });
    }
    Ok(found)
}

/// `prefix<max + 1>`, or `prefix1` when the family is empty.
pub fn next_id(blocks: &[LocatedBlock], family: &BlockFamily) -> EditResult<String> {
    let max = blocks.iter().map(|b| b.index).max().unwrap_or(0);
    let next = max
        .checked_add(1)
        .ok_or_else(|| EditError::malformed("block id", format!("{}{max}", family.prefix)))?;
    Ok(format!("{}{next}", family.prefix))
}

fn find_block<'a>(blocks: &'a [LocatedBlock], id: &str) -> Option<&'a LocatedBlock> {
    blocks.iter().find(|b| b.id == id)
}

/// Serialize a block: leading newline, keyword line, property lines,
/// closing brace.
pub fn render_block(keyword: &str, lines: &[String], indent: &str) -> String {
    let mut out = format!("\n{indent}{keyword} {{\n");
    for line in lines {
        out.push_str(indent);
        out.push_str(INDENT_STEP);
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(indent);
    out.push('}');
    out
}

/// Parse every block of the family back into its typed content.
pub fn list_blocks<S: BlockSpec>(text: &str) -> EditResult<Vec<(String, S)>> {
    let family = S::family();
    let table = ScanTable::build(text, Syntax::Markup);
    Ok(locate_family(text, &family)?
        .into_iter()
        .filter_map(|located| {
            let block = ComponentBlock::parse(text, &table, located.body);
            S::from_block(&block).map(|spec| (located.id, spec))
        })
        .collect())
}

pub fn fetch_block<S: BlockSpec>(text: &str, id: &str) -> EditResult<S> {
    let family = S::family();
    let blocks = locate_family(text, &family)?;
    let located =
        find_block(&blocks, id).ok_or_else(|| EditError::not_found(format!("block `{id}`")))?;
    let table = ScanTable::build(text, Syntax::Markup);
    let block = ComponentBlock::parse(text, &table, located.body);
    S::from_block(&block)
        .ok_or_else(|| EditError::malformed("block", located.span.slice(text).trim().to_string()))
}

/// Replace the block whose key property matches, or insert a new block
/// at the end of the container. Returns the new text and the block's id.
pub fn upsert_block<S: BlockSpec>(text: &str, spec: &S) -> EditResult<(String, String)> {
    let family = S::family();
    let blocks = locate_family(text, &family)?;
    let table = ScanTable::build(text, Syntax::Markup);
    let key = spec.key();

    let existing = blocks.iter().find(|located| {
        ComponentBlock::parse(text, &table, located.body)
            .get(family.key_property)
            .and_then(|value| value.as_str())
            == Some(key.as_str())
    });
    if let Some(located) = existing {
        tracing::debug!(id = %located.id, key = %key, "updating block bound to the same key");
        let out = replace_located(text, located, family.keyword, &spec.lines(&located.id));
        return Ok((out, located.id.clone()));
    }

    let id = next_id(&blocks, &family)?;
    let out = insert_into_container(text, CONTAINER_ID, family.keyword, &spec.lines(&id))?;
    tracing::debug!(id = %id, "inserted new block");
    Ok((out, id))
}

/// Replace the block carrying `id`; when it is missing the content is
/// inserted as a new block under that id.
pub fn update_block<S: BlockSpec>(text: &str, id: &str, spec: &S) -> EditResult<String> {
    let family = S::family();
    let blocks = locate_family(text, &family)?;
    match find_block(&blocks, id) {
        Some(located) => Ok(replace_located(text, located, family.keyword, &spec.lines(id))),
        None => {
            tracing::info!(id, "block not found for update; inserting it");
            insert_into_container(text, CONTAINER_ID, family.keyword, &spec.lines(id))
        }
    }
}

/// Remove the block carrying `id`, leading newline included.
pub fn delete_block(text: &str, family: &BlockFamily, id: &str) -> EditResult<String> {
    let blocks = locate_family(text, family)?;
    let located =
        find_block(&blocks, id).ok_or_else(|| EditError::not_found(format!("block `{id}`")))?;
    Ok(splice(text, located.span, ""))
}

fn replace_located(text: &str, located: &LocatedBlock, keyword: &str, lines: &[String]) -> String {
    let indent = line_indent(text, located.body.start);
    splice(text, located.span, &render_block(keyword, lines, indent))
}

/// Insert a block as the last child of the element carrying
/// `id: <container_id>`.
pub fn insert_into_container(
    text: &str,
    container_id: &str,
    keyword: &str,
    lines: &[String],
) -> EditResult<String> {
    let table = ScanTable::build(text, Syntax::Markup);
    let container = element_body(text, &table, container_id)?;

    let container_indent = line_indent(text, container.start);
    let child_indent = format!("{container_indent}{INDENT_STEP}");
    let snippet = render_block(keyword, lines, &child_indent);

    let close = container.end - 1;
    let close_line = line_start(text, close);
    if close_line > 0 && text[close_line..close].trim().is_empty() {
        // Closing brace on its own line: the block goes before its newline.
        Ok(splice(text, Span::new(close_line - 1, close_line - 1), &snippet))
    } else {
        let tail = format!("{snippet}\n{container_indent}");
        Ok(splice(text, Span::new(close, close), &tail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAMILY: BlockFamily = BlockFamily {
        keyword: "Slot",
        prefix: "slot",
        key_property: "binding",
    };

    #[derive(Debug, PartialEq)]
    struct Slot(String);

    impl BlockSpec for Slot {
        fn family() -> BlockFamily {
            FAMILY
        }
        fn key(&self) -> String {
            self.0.clone()
        }
        fn lines(&self, id: &str) -> Vec<String> {
            vec![format!("id: {id}"), format!("binding: \"{}\"", self.0)]
        }
        fn from_block(block: &ComponentBlock) -> Option<Self> {
            block.get("binding")?.as_str().map(|s| Slot(s.to_string()))
        }
    }

    const PAGE: &str = "\
Page {
    Column {
        id: customDropdownContainer
        Slot {
            id: slot2
            binding: \"a}\"
        }
    }
}
";

    #[test]
    fn locate_uses_the_opener_brace() {
        let blocks = locate_family(PAGE, &FAMILY).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].id, "slot2");
        assert!(blocks[0].span.slice(PAGE).ends_with("binding: \"a}\"\n        }"));
        assert_eq!(next_id(&blocks, &FAMILY).unwrap(), "slot3");
        assert_eq!(next_id(&[], &FAMILY).unwrap(), "slot1");
    }

    #[test]
    fn insert_goes_before_the_container_brace() {
        let (out, id) = upsert_block(PAGE, &Slot("b".into())).unwrap();
        assert_eq!(id, "slot3");
        assert!(out.contains(
            "            binding: \"a}\"\n        }\n        Slot {\n            id: slot3\n            binding: \"b\"\n        }\n    }\n}\n"
        ));
        assert_eq!(list_blocks::<Slot>(&out).unwrap().len(), 2);
    }

    #[test]
    fn upsert_by_key_replaces_in_place() {
        let (out, id) = upsert_block(PAGE, &Slot("a}".into())).unwrap();
        assert_eq!(id, "slot2");
        assert_eq!(out, PAGE);
    }

    #[test]
    fn update_missing_id_inserts_and_delete_restores() {
        let out = update_block(PAGE, "slot9", &Slot("z".into())).unwrap();
        assert_eq!(fetch_block::<Slot>(&out, "slot9").unwrap(), Slot("z".into()));
        let back = delete_block(&out, &FAMILY, "slot9").unwrap();
        assert_eq!(back, PAGE);
        assert!(delete_block(PAGE, &FAMILY, "slot9").unwrap_err().is_absent());
    }

    #[test]
    fn missing_container_fails() {
        let text = "Page {\n}\n";
        assert!(matches!(
            upsert_block(text, &Slot("x".into())),
            Err(EditError::NotFound { .. })
        ));
    }

    #[test]
    fn exhausted_id_space_is_an_error() {
        let page = PAGE.replace("slot2", "slot18446744073709551615");
        let blocks = locate_family(&page, &FAMILY).unwrap();
        assert_eq!(blocks[0].index, u64::MAX);
        assert!(matches!(next_id(&blocks, &FAMILY), Err(EditError::MalformedLiteral { .. })));
        assert!(matches!(
            upsert_block(&page, &Slot("b".into())),
            Err(EditError::MalformedLiteral { .. })
        ));
    }

    #[test]
    fn oversized_id_suffix_is_rejected() {
        let page = PAGE.replace("slot2", "slot99999999999999999999");
        assert!(matches!(
            locate_family(&page, &FAMILY),
            Err(EditError::MalformedLiteral { .. })
        ));
    }

    #[test]
    fn unbalanced_block_is_rejected() {
        let text = "Column {\n    id: customDropdownContainer\n    Slot {\n        id: slot1\n";
        assert!(matches!(
            locate_family(text, &FAMILY),
            Err(EditError::UnbalancedDelimiters { .. })
        ));
    }
}
