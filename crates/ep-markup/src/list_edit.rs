//! Membership editors for flat string-list property values.

use ep_core::literal::{format_markup_list, parse_markup_list};
use ep_core::span::splice;
use ep_core::{EditError, EditResult, ScanTable, Span, Syntax};
use regex::Regex;

/// Which list literal an edit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListTarget {
    /// The first `name: [...]` (or `property var name: [...]`) in code.
    Named(&'static str),
    /// The `allItems: [...]` list whose first element is the given entry.
    ItemsStartingWith(&'static str),
}

pub const TRIALFUN_MODEL: ListTarget = ListTarget::Named("customModel");
pub const EVENTTYPE_MODEL: ListTarget = ListTarget::Named("eventtypeCustomModel");
pub const TRIALFUN_ITEMS: ListTarget = ListTarget::ItemsStartingWith("ft_trialfun_general");
pub const EVENTTYPE_ITEMS: ListTarget = ListTarget::ItemsStartingWith("Stimulus");
pub const EVENTVALUE_ITEMS: ListTarget = ListTarget::ItemsStartingWith("S200");
pub const CHANNEL_ITEMS: ListTarget = ListTarget::ItemsStartingWith("Fp1");

impl ListTarget {
    fn property(self) -> &'static str {
        match self {
            ListTarget::Named(name) => name,
            ListTarget::ItemsStartingWith(_) => "allItems",
        }
    }

    fn describe(self) -> String {
        match self {
            ListTarget::Named(name) => format!("list `{name}`"),
            ListTarget::ItemsStartingWith(first) => {
                format!("allItems list starting with `{first}`")
            }
        }
    }
}

fn list_openers(text: &str, table: &ScanTable, name: &str) -> EditResult<Vec<usize>> {
    let pattern = Regex::new(&format!(
        r"\b(?:property\s+var\s+)?{}[ \t]*:[ \t]*\[",
        regex::escape(name)
    ))
    .map_err(|e| EditError::malformed("list pattern", e.to_string()))?;
    Ok(pattern
        .find_iter(text)
        .filter(|m| table.is_code(m.start()))
        .map(|m| m.end() - 1)
        .collect())
}

/// Span and items of the targeted list literal.
///
/// For `ItemsStartingWith`, an `allItems` value that is not a flat string
/// list is skipped; it is only reported as malformed when no later list
/// matches.
pub fn locate_list(text: &str, target: ListTarget) -> EditResult<(Span, Vec<String>)> {
    let table = ScanTable::build(text, Syntax::Markup);
    let mut malformed = None;

    for open in list_openers(text, &table, target.property())? {
        let close = table
            .matching_close(open)
            .map_err(|_| EditError::unbalanced(target.describe(), open))?;
        let span = Span::new(open, close + 1);
        let parsed = parse_markup_list(span.slice(text));
        let first = match target {
            ListTarget::Named(_) => return parsed.map(|items| (span, items)),
            ListTarget::ItemsStartingWith(first) => first,
        };
        match parsed {
            Ok(items) if items.first().is_some_and(|item| item == first) => {
                return Ok((span, items));
            }
            Ok(_) => {}
            Err(err) => {
                malformed.get_or_insert(err);
            }
        }
    }
    Err(malformed.unwrap_or_else(|| EditError::not_found(target.describe())))
}

pub fn read_list(text: &str, target: ListTarget) -> EditResult<Vec<String>> {
    locate_list(text, target).map(|(_, items)| items)
}

/// Append `item` unless it is already present. Empty entries already in
/// the list are dropped on rewrite.
pub fn add_list_item(text: &str, target: ListTarget, item: &str) -> EditResult<String> {
    if item.is_empty() {
        return Err(EditError::unchanged("empty list item"));
    }
    let (span, mut items) = locate_list(text, target)?;
    if items.iter().any(|existing| existing == item) {
        return Err(EditError::unchanged(format!("`{item}` already in {}", target.describe())));
    }
    items.push(item.to_string());
    Ok(splice(text, span, &format_markup_list(&items)))
}

/// Remove the first occurrence of `item`; fails when it is absent. Later
/// duplicates stay, and empty entries are dropped on rewrite.
pub fn remove_list_item(text: &str, target: ListTarget, item: &str) -> EditResult<String> {
    let (span, mut items) = locate_list(text, target)?;
    let Some(position) = items.iter().position(|existing| existing == item) else {
        return Err(EditError::unchanged(format!("`{item}` not in {}", target.describe())));
    };
    items.remove(position);
    Ok(splice(text, span, &format_markup_list(&items)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"Item {
    property var customModel: ["ft_trialfun_general", "alternative"]
    // allItems: ["Stimulus", "commented"]
    DropdownTemplate {
        id: eventtypeDropdown
        allItems: ["Stimulus",
                   "Response"]
    }
    DropdownTemplate {
        id: trialfunDropdown
        allItems: ["ft_trialfun_general", "ft_trialfun_example1"]
    }
}
"#;

    #[test]
    fn picks_list_by_first_element() {
        assert_eq!(
            read_list(PAGE, EVENTTYPE_ITEMS).unwrap(),
            vec!["Stimulus", "Response"]
        );
        assert_eq!(read_list(PAGE, TRIALFUN_ITEMS).unwrap().len(), 2);
        assert!(read_list(PAGE, CHANNEL_ITEMS).unwrap_err().is_absent());
    }

    #[test]
    fn add_and_remove_are_membership_checked() {
        let out = add_list_item(PAGE, TRIALFUN_ITEMS, "mine").unwrap();
        assert!(out.contains(r#"allItems: ["ft_trialfun_general", "ft_trialfun_example1", "mine"]"#));
        assert!(matches!(
            add_list_item(&out, TRIALFUN_ITEMS, "mine"),
            Err(EditError::Unchanged { .. })
        ));
        let back = remove_list_item(&out, TRIALFUN_ITEMS, "mine").unwrap();
        assert_eq!(back, PAGE);
        assert!(remove_list_item(PAGE, TRIALFUN_ITEMS, "mine").is_err());
    }

    #[test]
    fn expression_valued_items_do_not_hide_later_lists() {
        let page = r#"Item {
    DropdownTemplate {
        allItems: [root.firstModel, "other"]
    }
    DropdownTemplate {
        allItems: ["Fp1", "Fp2"]
    }
}
"#;
        assert_eq!(read_list(page, CHANNEL_ITEMS).unwrap(), vec!["Fp1", "Fp2"]);
        let out = add_list_item(page, CHANNEL_ITEMS, "Cz").unwrap();
        assert!(out.contains(r#"allItems: [root.firstModel, "other"]"#));
        assert!(out.contains(r#"allItems: ["Fp1", "Fp2", "Cz"]"#));
        assert!(matches!(
            read_list(page, EVENTTYPE_ITEMS),
            Err(EditError::MalformedLiteral { .. })
        ));
    }

    #[test]
    fn remove_drops_only_the_first_duplicate() {
        let page = "Item {\n    allItems: [\"Fp1\", \"Cz\", \"O1\", \"Cz\"]\n}\n";
        let out = remove_list_item(page, CHANNEL_ITEMS, "Cz").unwrap();
        assert!(out.contains(r#"allItems: ["Fp1", "O1", "Cz"]"#));
    }

    #[test]
    fn named_model_list() {
        let out = add_list_item(PAGE, TRIALFUN_MODEL, "x \"y\"").unwrap();
        assert!(out.contains(r#"property var customModel: ["ft_trialfun_general", "alternative", "x \"y\""]"#));
        assert_eq!(read_list(&out, TRIALFUN_MODEL).unwrap()[2], "x \"y\"");
    }
}
