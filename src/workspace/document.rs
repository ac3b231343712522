use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use ropey::Rope;
use tower_lsp::lsp_types::TextDocumentContentChangeEvent;

use crate::error::{Error, Result};
use crate::syntax::{self, position_to_char, Element};

/// One file's parsed state. Documents are values: every open, edit and close
/// produces a new `Document` that replaces the old one in its folder.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: PathBuf,
    /// Present only while the document is open in the editor.
    pub version: Option<i32>,
    pub text: Rope,
    pub elements: Vec<Element>,
}

impl Document {
    fn new(path: PathBuf, version: Option<i32>, text: Rope) -> Document {
        let elements = syntax::parse(&text.to_string());
        Document {
            path,
            version,
            text,
            elements,
        }
    }

    /// A freshly opened editor buffer.
    pub fn from_open(path: PathBuf, text: &str, version: i32) -> Document {
        Document::new(path, Some(version), Rope::from_str(text))
    }

    /// Reads and parses `path`. A missing file is `Ok(None)`; any other read
    /// failure is an error. Invalid UTF-8 is replaced rather than rejected.
    pub fn load_from_disk(path: &Path) -> Result<Option<Document>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(Document::new(
                path.to_path_buf(),
                None,
                Rope::from_str(&String::from_utf8_lossy(&bytes)),
            ))),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(Error::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Applies editor deltas in order and reparses.
    ///
    /// A version that does not follow from the current one is logged and the
    /// deltas are applied anyway: rejecting them would leave the server out of
    /// sync with the editor for good.
    pub fn apply_change(
        &self,
        version: Option<i32>,
        deltas: &[TextDocumentContentChangeEvent],
    ) -> Document {
        if let (Some(current), Some(new)) = (self.version, version) {
            let expected = current + deltas.len() as i32;
            if expected != new {
                tracing::warn!(
                    path = %self.path.display(),
                    current,
                    expected,
                    received = new,
                    "unexpected document version, applying edits as given"
                );
            }
        }

        let mut text = self.text.clone();
        for delta in deltas {
            apply_delta(&mut text, delta);
        }

        Document::new(self.path.clone(), version.or(self.version), text)
    }

    pub fn is_open(&self) -> bool {
        self.version.is_some()
    }

    pub fn file_stem(&self) -> Option<&str> {
        self.path.file_stem()?.to_str()
    }

    pub fn title(&self) -> Option<&syntax::Heading> {
        self.elements.iter().find_map(|element| match element {
            Element::Heading(heading) if heading.is_title => Some(heading),
            _ => None,
        })
    }
}

fn apply_delta(text: &mut Rope, delta: &TextDocumentContentChangeEvent) {
    match delta.range {
        None => *text = Rope::from_str(&delta.text),
        Some(range) => {
            let start = position_to_char(text, range.start);
            let end = position_to_char(text, range.end).max(start);
            text.remove(start..end);
            text.insert(start, &delta.text);
        }
    }
}
