//! The in-memory index of every workspace folder.
//!
//! [`State`] is an immutable value. Every event handler computes a new `State`
//! from the current one and swaps it in, so a reader always sees one
//! consistent snapshot. Folder and document maps are shared copy-on-write
//! between successive states.

mod document;
mod events;
mod folder;


pub use document::Document;
pub use folder::Folder;

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use tower_lsp::lsp_types::ClientInfo;

use crate::config::Settings;
use crate::error::{Error, Result};

/// A folder to register: its display name and root path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderSpec {
    pub name: String,
    pub root: PathBuf,
}

impl FolderSpec {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> FolderSpec {
        FolderSpec {
            name: name.into(),
            root: root.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct State {
    client: Option<ClientInfo>,
    folders: Arc<BTreeMap<PathBuf, Arc<Folder>>>,
    revision: u64,
}

impl State {
    /// A state over already built folders. Having no folder at all is a fatal
    /// configuration error.
    pub fn new(client: Option<ClientInfo>, folders: Vec<Folder>) -> Result<State> {
        if folders.is_empty() {
            return Err(Error::NoWorkspaceFolders);
        }

        Ok(State {
            client,
            folders: Arc::new(
                folders
                    .into_iter()
                    .map(|folder| (folder.root().to_path_buf(), Arc::new(folder)))
                    .collect(),
            ),
            revision: 0,
        })
    }

    /// Scans every folder; roots that do not exist are skipped.
    pub fn initialize(
        client: Option<ClientInfo>,
        specs: &[FolderSpec],
        settings_for: impl Fn(&Path) -> Settings,
    ) -> Result<State> {
        let mut folders = Vec::new();
        for spec in specs {
            if let Some(folder) = Folder::scan(&spec.name, &spec.root, &settings_for(&spec.root))? {
                folders.push(folder);
            }
        }

        State::new(client, folders)
    }

    pub fn client(&self) -> Option<&ClientInfo> {
        self.client.as_ref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn folders(&self) -> impl Iterator<Item = &Folder> {
        self.folders.values().map(Arc::as_ref)
    }

    pub fn folder(&self, root: &Path) -> Option<&Folder> {
        self.folders.get(root).map(Arc::as_ref)
    }

    /// The folder whose root is a prefix of `path`. With nested roots the
    /// first one in root order wins.
    pub fn find_owning_folder(&self, path: &Path) -> Option<&Folder> {
        self.folders().find(|folder| folder.owns(path))
    }

    /// Like [`State::find_owning_folder`], but a miss is a contract violation.
    pub fn owning_folder(&self, path: &Path) -> Result<&Folder> {
        self.find_owning_folder(path).ok_or_else(|| {
            tracing::error!(path = %path.display(), "path is outside every workspace folder");
            Error::UnownedPath(path.to_path_buf())
        })
    }

    pub fn document(&self, path: &Path) -> Result<Option<&Document>> {
        Ok(self.owning_folder(path)?.document(path))
    }

    pub fn upsert_document(&self, document: Document) -> Result<State> {
        let folder = self.owning_folder(&document.path)?.with_document(document);
        Ok(self.with_folder(folder))
    }

    pub fn remove_document(&self, path: &Path) -> Result<State> {
        let folder = self.owning_folder(path)?.without_document(path);
        Ok(self.with_folder(folder))
    }

    pub fn reload_document(&self, path: &Path) -> Result<State> {
        let folder = self.owning_folder(path)?.reload_document(path)?;
        Ok(self.with_folder(folder))
    }

    /// Removes the `removed` roots, then scans and registers the `added` ones.
    ///
    /// The phases are independent: a folder that is removed and re-added is
    /// absent in between. Nothing observes that gap since the returned state is
    /// only published after both phases.
    ///
    /// A folder whose scan fails is logged and left out; the other changes
    /// still apply.
    pub fn reconcile_folders(
        &self,
        added: &[FolderSpec],
        removed: &[PathBuf],
        settings_for: impl Fn(&Path) -> Settings,
    ) -> Result<State> {
        let mut folders = Arc::clone(&self.folders);

        for root in removed {
            if Arc::make_mut(&mut folders).remove(root).is_none() {
                tracing::warn!(root = %root.display(), "removing unknown workspace folder");
            }
        }

        for spec in added {
            match Folder::scan(&spec.name, &spec.root, &settings_for(&spec.root)) {
                Ok(Some(folder)) => {
                    Arc::make_mut(&mut folders).insert(spec.root.clone(), Arc::new(folder));
                }
                Ok(None) => {}
                Err(err) => tracing::error!(
                    root = %spec.root.display(),
                    error = %err,
                    "failed to scan added workspace folder, leaving it out"
                ),
            }
        }

        Ok(State {
            client: self.client.clone(),
            folders,
            revision: self.revision + 1,
        })
    }

    fn with_folder(&self, folder: Folder) -> State {
        let mut folders = Arc::clone(&self.folders);
        Arc::make_mut(&mut folders).insert(folder.root().to_path_buf(), Arc::new(folder));

        State {
            client: self.client.clone(),
            folders,
            revision: self.revision + 1,
        }
    }

    fn bumped(&self) -> State {
        State {
            revision: self.revision + 1,
            ..self.clone()
        }
    }
}
