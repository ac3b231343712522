//! Core types for parsed elements.
//!
//! - `TextRange`: a wrapper around the LSP range with rope-based conversions
//! - the payload structs carried by each [`super::Element`] variant
//! - `Rangeable`: containment checks shared by everything with a range

use std::ops::{Deref, Range};

use ropey::Rope;
use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::Position;

/// A wrapper around `tower_lsp::lsp_types::Range`.
///
/// Columns are UTF-16 code units, as the protocol counts them.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub struct TextRange(pub tower_lsp::lsp_types::Range);

impl TextRange {
    /// Creates a `TextRange` from a byte offset range into the rope's text.
    pub fn from_byte_range(rope: &Rope, range: Range<usize>) -> TextRange {
        tower_lsp::lsp_types::Range {
            start: byte_to_position(rope, range.start),
            end: byte_to_position(rope, range.end),
        }
        .into()
    }
}

/// Byte offset to protocol position.
pub fn byte_to_position(rope: &Rope, byte: usize) -> Position {
    let char_idx = rope.byte_to_char(byte.min(rope.len_bytes()));
    let line = rope.char_to_line(char_idx);
    let line_start = rope.line_to_char(line);
    let character = rope.char_to_utf16_cu(char_idx) - rope.char_to_utf16_cu(line_start);

    Position {
        line: line as u32,
        character: character as u32,
    }
}

/// Protocol position to char index. Lines past the end land on the end of the
/// text; columns past the end of a line land on the end of that line.
pub fn position_to_char(rope: &Rope, position: Position) -> usize {
    let line = position.line as usize;
    if line >= rope.len_lines() {
        return rope.len_chars();
    }

    let line_start = rope.line_to_char(line);
    let slice = rope.line(line);
    let content_len = slice.len_chars() - line_break_len(&slice);
    let content_utf16 = slice.char_to_utf16_cu(content_len);
    let column = (position.character as usize).min(content_utf16);

    line_start + slice.utf16_cu_to_char(column)
}

fn line_break_len(slice: &ropey::RopeSlice) -> usize {
    let len = slice.len_chars();
    match (
        len.checked_sub(2).map(|i| slice.char(i)),
        len.checked_sub(1).map(|i| slice.char(i)),
    ) {
        (Some('\r'), Some('\n')) => 2,
        (_, Some('\n' | '\r')) => 1,
        _ => 0,
    }
}

impl std::hash::Hash for TextRange {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.start.line.hash(state);
        self.0.start.character.hash(state);
        self.0.end.line.hash(state);
        self.0.end.character.hash(state);
    }
}

impl Deref for TextRange {
    type Target = tower_lsp::lsp_types::Range;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<tower_lsp::lsp_types::Range> for TextRange {
    fn from(range: tower_lsp::lsp_types::Range) -> Self {
        TextRange(range)
    }
}

/// An ATX heading. The first level-1 heading of a document is its title.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct Heading {
    pub level: usize,
    pub text: String,
    pub slug: String,
    pub is_title: bool,
    pub range: TextRange,
}

/// `[[target#anchor|display]]`
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct WikiLink {
    pub target: Option<String>,
    pub anchor: Option<String>,
    pub range: TextRange,
}

/// `[text](url#anchor)`; `url` is percent-decoded and `None` for `(#anchor)`.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct InlineLink {
    pub text: String,
    pub url: Option<String>,
    pub anchor: Option<String>,
    pub range: TextRange,
}

/// A link reference definition (e.g., `[label]: url`).
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct LinkDef {
    pub label: String,
    pub url: String,
    pub range: TextRange,
}

/// A usage of a defined label: `[label]`, `[text][label]` or `[label][]`.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct LinkRef {
    pub label: String,
    pub range: TextRange,
}

/// Trait for types that have a range (position span in the document).
pub trait Rangeable {
    fn range(&self) -> &TextRange;

    fn includes_position(&self, position: Position) -> bool {
        let range = self.range();
        (range.start.line < position.line
            || (range.start.line == position.line && range.start.character <= position.character))
            && (range.end.line > position.line
                || (range.end.line == position.line && range.end.character >= position.character))
    }
}

impl Rangeable for TextRange {
    fn range(&self) -> &TextRange {
        self
    }
}

impl Rangeable for Heading {
    fn range(&self) -> &TextRange {
        &self.range
    }
}

impl Rangeable for WikiLink {
    fn range(&self) -> &TextRange {
        &self.range
    }
}

impl Rangeable for InlineLink {
    fn range(&self) -> &TextRange {
        &self.range
    }
}

impl Rangeable for LinkDef {
    fn range(&self) -> &TextRange {
        &self.range
    }
}

impl Rangeable for LinkRef {
    fn range(&self) -> &TextRange {
        &self.range
    }
}
