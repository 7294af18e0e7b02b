//! The host document value object.

use std::path::{Path, PathBuf};

use crate::error::EditResult;

/// A host text plus the path it came from, passed explicitly into every
/// edit instead of being reopened from a well-known location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDocument {
    path: Option<PathBuf>,
    original: String,
    text: String,
}

impl HostDocument {
    /// An in-memory document with no backing file.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            path: None,
            original: text.clone(),
            text,
        }
    }

    pub fn with_path(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let mut doc = Self::new(text);
        doc.path = Some(path.into());
        doc
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// True when the text differs from what was loaded.
    pub fn is_modified(&self) -> bool {
        self.text != self.original
    }

    /// Run a whole-text edit; the document only changes when it succeeds.
    pub fn apply<T>(
        &mut self,
        edit: impl FnOnce(&str) -> EditResult<(String, T)>,
    ) -> EditResult<T> {
        let (next, value) = edit(&self.text)?;
        self.text = next;
        Ok(value)
    }

    /// Like [`apply`](Self::apply) for edits that only produce new text.
    pub fn edit(&mut self, edit: impl FnOnce(&str) -> EditResult<String>) -> EditResult<()> {
        self.apply(|text| edit(text).map(|next| (next, ())))
    }

    /// Mark the current text as persisted.
    pub fn mark_saved(&mut self) {
        self.original = self.text.clone();
    }
}
