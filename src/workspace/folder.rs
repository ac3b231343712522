use std::{
    collections::BTreeMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use walkdir::WalkDir;

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::ignore::IgnoreMatcher;
use crate::syntax::root_relative_key;

use super::Document;

/// One workspace root and the Markdown documents loaded beneath it.
///
/// Cloning is cheap: the document map is shared until one of the copies is
/// changed, and a change only copies the map of `Arc`s, never a document.
#[derive(Debug, Clone)]
pub struct Folder {
    name: String,
    root: PathBuf,
    ignore: Arc<IgnoreMatcher>,
    markdown_extensions: Arc<Vec<String>>,
    documents: Arc<BTreeMap<PathBuf, Arc<Document>>>,
}

impl Folder {
    /// An empty folder, for building one up document by document.
    pub fn new(name: &str, root: &Path) -> Folder {
        Folder {
            name: name.to_string(),
            root: root.to_path_buf(),
            ignore: Arc::new(IgnoreMatcher::with_defaults(root)),
            markdown_extensions: Arc::new(Settings::default().markdown_extensions),
            documents: Default::default(),
        }
    }

    /// Recursively loads every Markdown file under `root` that the folder's
    /// ignore patterns do not exclude. `Ok(None)` when `root` does not exist.
    ///
    /// A directory that cannot be read or that vanishes mid-walk contributes no
    /// documents and is logged; any other walk failure aborts the scan.
    pub fn scan(name: &str, root: &Path, settings: &Settings) -> Result<Option<Folder>> {
        if !root.exists() {
            tracing::warn!(root = %root.display(), "workspace folder does not exist");
            return Ok(None);
        }

        let ignore = match settings.respect_ignore_files {
            true => IgnoreMatcher::from_ignore_files(root, &settings.ignore_files)?,
            false => IgnoreMatcher::with_defaults(root),
        };

        let mut folder = Folder {
            ignore: Arc::new(ignore),
            markdown_extensions: Arc::new(settings.markdown_extensions.clone()),
            ..Folder::new(name, root)
        };

        let walker = WalkDir::new(root)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !folder.ignore.is_ignored(entry.path()));

        let mut documents = BTreeMap::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => match err.io_error().map(std::io::Error::kind) {
                    Some(ErrorKind::PermissionDenied | ErrorKind::NotFound) => {
                        tracing::warn!(
                            path = ?err.path(),
                            error = %err,
                            "skipping unreadable directory"
                        );
                        continue;
                    }
                    _ => {
                        return Err(Error::Walk {
                            root: root.to_path_buf(),
                            source: err,
                        })
                    }
                },
            };

            if !entry.file_type().is_file() || !folder.is_markdown(entry.path()) {
                continue;
            }

            // deleted between listing and reading
            if let Some(document) = Document::load_from_disk(entry.path())? {
                documents.insert(entry.path().to_path_buf(), Arc::new(document));
            }
        }

        folder.documents = Arc::new(documents);
        tracing::info!(
            name,
            root = %root.display(),
            documents = folder.documents.len(),
            "scanned workspace folder"
        );

        Ok(Some(folder))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn owns(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        self.ignore.is_ignored(path)
    }

    pub fn is_markdown(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| {
                self.markdown_extensions
                    .iter()
                    .any(|md| md.eq_ignore_ascii_case(extension))
            })
    }

    pub fn document(&self, path: &Path) -> Option<&Document> {
        self.documents.get(path).map(Arc::as_ref)
    }

    /// Documents in path order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values().map(Arc::as_ref)
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Root-relative, forward-slash key of a path under this folder.
    pub fn key_of(&self, path: &Path) -> Option<String> {
        root_relative_key(&self.root, path)
    }

    pub fn with_document(&self, document: Document) -> Folder {
        debug_assert!(
            self.owns(&document.path),
            "{} is outside {}",
            document.path.display(),
            self.root.display()
        );

        let mut folder = self.clone();
        Arc::make_mut(&mut folder.documents).insert(document.path.clone(), Arc::new(document));
        folder
    }

    pub fn without_document(&self, path: &Path) -> Folder {
        if !self.documents.contains_key(path) {
            return self.clone();
        }

        let mut folder = self.clone();
        Arc::make_mut(&mut folder.documents).remove(path);
        folder
    }

    /// Re-reads `path` from disk and upserts it. Unchanged when the file is
    /// gone.
    pub fn reload_document(&self, path: &Path) -> Result<Folder> {
        Ok(match Document::load_from_disk(path)? {
            Some(document) => self.with_document(document),
            None => self.clone(),
        })
    }

    /// Whether two folder values share the same document map allocation.
    pub fn shares_documents_with(&self, other: &Folder) -> bool {
        Arc::ptr_eq(&self.documents, &other.documents)
    }
}
