use thiserror::Error;

pub type EditResult<T> = Result<T, EditError>;

/// Why an edit or read against host text could not be completed.
///
/// None of these ever leave the host text partially modified: every
/// operation computes the complete new text before anything is replaced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Malformed {what} literal: {literal}")]
    MalformedLiteral { what: &'static str, literal: String },

    #[error("Unbalanced delimiters in {what} (scan started at offset {offset})")]
    UnbalancedDelimiters { what: String, offset: usize },

    /// The requested edit would leave the text as it is.
    #[error("Nothing to change: {what}")]
    Unchanged { what: String },
}

impl EditError {
    pub fn not_found(what: impl Into<String>) -> Self {
        EditError::NotFound { what: what.into() }
    }

    pub fn malformed(what: &'static str, literal: impl Into<String>) -> Self {
        EditError::MalformedLiteral {
            what,
            literal: literal.into(),
        }
    }

    pub fn unbalanced(what: impl Into<String>, offset: usize) -> Self {
        EditError::UnbalancedDelimiters {
            what: what.into(),
            offset,
        }
    }

    pub fn unchanged(what: impl Into<String>) -> Self {
        EditError::Unchanged { what: what.into() }
    }

    /// Reads treat a malformed literal exactly like a missing one.
    pub fn is_absent(&self) -> bool {
        matches!(
            self,
            EditError::NotFound { .. } | EditError::MalformedLiteral { .. }
        )
    }
}
