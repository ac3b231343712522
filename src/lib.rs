//! marklink: a language server for cross-linked Markdown notes.
//!
//! The server keeps an index of every Markdown file under the editor's
//! workspace folders and answers go-to-definition and find-references for
//! headings, wiki-links (`[[note#heading]]`), inline links and link labels.
//!
//! # Architecture
//!
//! - [`syntax`]: extraction of elements (headings, links, labels) from text
//! - [`resolve`]: mapping link text to a root-relative key
//! - [`ignore`]: ignore-file filtering for folder scans
//! - [`workspace`]: the immutable [`workspace::State`] and its event handlers
//! - [`references`] and [`gotodef`]: the navigation queries
//! - [`server`]: the tower-lsp backend wiring it all together
//!
//! ```ignore
//! use marklink::config::Settings;
//! use marklink::workspace::{FolderSpec, State};
//!
//! let specs = [FolderSpec::new("notes", "/home/me/notes")];
//! let state = State::initialize(None, &specs, Settings::for_root)?;
//! ```

// Request parameter helpers (used across modules)
#[macro_use]
mod macros;

pub mod config;
pub mod error;
pub mod ignore;
pub mod resolve;
pub mod syntax;
pub mod workspace;

// Navigation queries
pub mod gotodef;
pub mod references;

pub mod server;

// Test utilities (only available in test builds)
#[cfg(test)]
pub mod test_utils;
