//! File boundary for host documents.
//!
//! Every edit loads the whole file, computes the new text in memory and
//! writes the whole file back. Multi-file saves can go through a staged
//! commit: every new text is first written to a sibling temporary file and
//! only then renamed over its target.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use ep_core::{EditResult, HostDocument};

use crate::error::{AppError, AppResult};

const STAGING_SUFFIX: &str = ".eegprep-staged";

pub fn load_document(path: &Path) -> AppResult<HostDocument> {
    let text = std::fs::read_to_string(path).map_err(|e| AppError::DocumentRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    tracing::debug!(path = %path.display(), bytes = text.len(), "loaded document");
    Ok(HostDocument::with_path(path, text))
}

fn document_path(doc: &HostDocument) -> AppResult<&Path> {
    doc.path().ok_or_else(|| AppError::DocumentWrite {
        path: PathBuf::new(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "document has no path"),
    })
}

/// Write the document back when it changed.
pub fn commit_document(doc: &mut HostDocument) -> AppResult<()> {
    if !doc.is_modified() {
        return Ok(());
    }
    let path = document_path(doc)?.to_path_buf();
    std::fs::write(&path, doc.text()).map_err(|e| AppError::DocumentWrite {
        path: path.clone(),
        source: e,
    })?;
    tracing::info!(path = %path.display(), "wrote document");
    doc.mark_saved();
    Ok(())
}

/// Commit several documents. With `staged` set, a failure while writing
/// the temporary files leaves every target untouched; without it the
/// documents are written one after another.
pub fn commit_all(docs: &mut [&mut HostDocument], staged: bool) -> AppResult<()> {
    if !staged {
        for doc in docs.iter_mut() {
            commit_document(doc)?;
        }
        return Ok(());
    }

    let mut pending: Vec<(PathBuf, PathBuf)> = Vec::new();
    for doc in docs.iter().filter(|doc| doc.is_modified()) {
        let target = match document_path(doc) {
            Ok(path) => path.to_path_buf(),
            Err(e) => {
                discard_staged(&pending);
                return Err(e);
            }
        };
        let temp = staging_path(&target);
        if let Err(e) = std::fs::write(&temp, doc.text()) {
            discard_staged(&pending);
            let _ = std::fs::remove_file(&temp);
            return Err(AppError::DocumentWrite {
                path: temp,
                source: e,
            });
        }
        pending.push((temp, target));
    }

    // Past this point a failure can leave earlier targets already replaced.
    for (i, (temp, target)) in pending.iter().enumerate() {
        if let Err(e) = std::fs::rename(temp, target) {
            discard_staged(&pending[i..]);
            return Err(AppError::DocumentWrite {
                path: target.clone(),
                source: e,
            });
        }
        tracing::info!(path = %target.display(), "committed staged document");
    }
    for doc in docs.iter_mut() {
        doc.mark_saved();
    }
    Ok(())
}

fn staging_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().map(OsString::from).unwrap_or_default();
    name.push(STAGING_SUFFIX);
    target.with_file_name(name)
}

fn discard_staged(pending: &[(PathBuf, PathBuf)]) {
    for (temp, _) in pending {
        if let Err(e) = std::fs::remove_file(temp) {
            tracing::warn!(path = %temp.display(), error = %e, "could not remove staged file");
        }
    }
}

/// Load, edit and commit one file.
pub fn edit_file(path: &Path, edit: impl FnOnce(&str) -> EditResult<String>) -> AppResult<()> {
    let mut doc = load_document(path)?;
    doc.edit(edit)?;
    commit_document(&mut doc)
}

/// Like [`edit_file`] for edits that also produce a value.
pub fn apply_file<T>(
    path: &Path,
    edit: impl FnOnce(&str) -> EditResult<(String, T)>,
) -> AppResult<T> {
    let mut doc = load_document(path)?;
    let value = doc.apply(edit)?;
    commit_document(&mut doc)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ep_core::EditError;

    #[test]
    fn failed_edit_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.m");
        std::fs::write(&path, "x = 1;\n").unwrap();

        let err = edit_file(&path, |_| Err(EditError::not_found("y"))).unwrap_err();
        assert!(matches!(err, AppError::Edit(EditError::NotFound { .. })));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "x = 1;\n");
    }

    #[test]
    fn staged_commit_writes_every_document() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.m");
        let b = dir.path().join("b.qml");
        std::fs::write(&a, "a").unwrap();
        std::fs::write(&b, "b").unwrap();

        let mut doc_a = load_document(&a).unwrap();
        let mut doc_b = load_document(&b).unwrap();
        doc_a.edit(|t| Ok(format!("{t}1"))).unwrap();
        doc_b.edit(|t| Ok(format!("{t}2"))).unwrap();
        commit_all(&mut [&mut doc_a, &mut doc_b], true).unwrap();

        assert_eq!(std::fs::read_to_string(&a).unwrap(), "a1");
        assert_eq!(std::fs::read_to_string(&b).unwrap(), "b2");
        assert!(!staging_path(&a).exists());
        assert!(!doc_a.is_modified());
    }

    #[test]
    fn staging_failure_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.m");
        std::fs::write(&a, "a").unwrap();
        let mut doc_a = load_document(&a).unwrap();
        doc_a.edit(|t| Ok(format!("{t}1"))).unwrap();

        // Staging next to a path inside a missing directory fails.
        let mut doc_b = HostDocument::with_path(dir.path().join("missing/b.qml"), "b");
        doc_b.edit(|t| Ok(format!("{t}2"))).unwrap();

        assert!(commit_all(&mut [&mut doc_a, &mut doc_b], true).is_err());
        assert_eq!(std::fs::read_to_string(&a).unwrap(), "a");
        assert!(!staging_path(&a).exists());
    }

    #[test]
    fn pathless_document_discards_staged_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.m");
        std::fs::write(&a, "a").unwrap();
        let mut doc_a = load_document(&a).unwrap();
        doc_a.edit(|t| Ok(format!("{t}1"))).unwrap();
        let mut doc_b = HostDocument::new("b");
        doc_b.edit(|t| Ok(format!("{t}2"))).unwrap();

        assert!(commit_all(&mut [&mut doc_a, &mut doc_b], true).is_err());
        assert_eq!(std::fs::read_to_string(&a).unwrap(), "a");
        assert!(!staging_path(&a).exists());
    }

    #[test]
    fn rename_failure_discards_remaining_staged_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.m");
        std::fs::write(&a, "a").unwrap();
        // A non-empty directory cannot be replaced by a file.
        let b = dir.path().join("b.qml");
        std::fs::create_dir(&b).unwrap();
        std::fs::write(b.join("keep"), "").unwrap();

        let mut doc_a = load_document(&a).unwrap();
        doc_a.edit(|t| Ok(format!("{t}1"))).unwrap();
        let mut doc_b = HostDocument::with_path(&b, "b");
        doc_b.edit(|t| Ok(format!("{t}2"))).unwrap();

        assert!(commit_all(&mut [&mut doc_a, &mut doc_b], true).is_err());
        assert_eq!(std::fs::read_to_string(&a).unwrap(), "a1");
        assert!(!staging_path(&a).exists());
        assert!(!staging_path(&b).exists());
        assert!(b.is_dir());
    }
}
