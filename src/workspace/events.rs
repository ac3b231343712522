//! Editor and filesystem events as pure `State` transformations.
//!
//! File renames are not handled here: the client reports a rename as a close
//! of the old path followed by an open of the new one. A client that does not
//! do this leaves the renamed file out of the index until it is opened or the
//! folder is rescanned.

use std::path::{Path, PathBuf};

use tower_lsp::lsp_types::TextDocumentContentChangeEvent;

use crate::error::Result;

use super::{Document, State};

impl State {
    pub fn open_document(&self, path: PathBuf, text: &str, version: i32) -> Result<State> {
        tracing::debug!(path = %path.display(), version, "document opened");
        self.upsert_document(Document::from_open(path, text, version))
    }

    /// Applies editor deltas to an indexed document. A change for a document
    /// the index does not know about is logged and dropped.
    pub fn change_document(
        &self,
        path: &Path,
        version: Option<i32>,
        deltas: &[TextDocumentContentChangeEvent],
    ) -> Result<State> {
        let Some(document) = self.owning_folder(path)?.document(path) else {
            tracing::warn!(path = %path.display(), "change for a document that is not indexed");
            return Ok(self.bumped());
        };

        let changed = document.apply_change(version, deltas);
        self.upsert_document(changed)
    }

    /// The on-disk content replaces the editor buffer; a file that no longer
    /// exists leaves the index.
    pub fn close_document(&self, path: &Path) -> Result<State> {
        tracing::debug!(path = %path.display(), "document closed");
        match Document::load_from_disk(path)? {
            Some(document) => self.upsert_document(document),
            None => self.remove_document(path),
        }
    }

    /// Indexes newly created Markdown files. Ignored paths and documents the
    /// editor already has open are left alone.
    pub fn files_created(&self, paths: &[PathBuf]) -> Result<State> {
        let mut state = self.bumped();
        for path in paths {
            let folder = state.owning_folder(path)?;
            if !folder.is_markdown(path) || folder.is_ignored(path) {
                continue;
            }
            if folder.document(path).is_some_and(Document::is_open) {
                continue;
            }

            state = state.reload_document(path)?;
        }

        Ok(state)
    }

    /// Drops deleted files from the index unless the editor still has them
    /// open.
    pub fn files_deleted(&self, paths: &[PathBuf]) -> Result<State> {
        let mut state = self.bumped();
        for path in paths {
            let folder = state.owning_folder(path)?;
            if folder.document(path).is_some_and(Document::is_open) {
                continue;
            }

            state = state.remove_document(path)?;
        }

        Ok(state)
    }
}
