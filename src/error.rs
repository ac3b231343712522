//! Error kinds for the workspace index.
//!
//! Expected absence (a missing file, an unresolvable link) is modelled with
//! `Option` at the call site and never shows up here. Everything in [`Error`]
//! is either a genuine I/O failure or a broken caller contract.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to scan folder {}: {source}", root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("invalid ignore pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("no workspace folders were registered")]
    NoWorkspaceFolders,

    /// A document-addressed operation named a path that no registered folder
    /// owns. This is a defect in the caller, not a routine miss.
    #[error("{} is not inside any registered workspace folder", .0.display())]
    UnownedPath(PathBuf),
}

impl Error {
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Error::UnownedPath(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
