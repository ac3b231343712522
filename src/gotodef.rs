use std::path::Path;

use tower_lsp::lsp_types::{Location, Position, Url};

use crate::error::Result;
use crate::references::{Target, TargetResolver};
use crate::syntax::{element_at_position, Element, Rangeable};
use crate::workspace::{Document, Folder, State};

/// Where a definition lives: a declaring element, or a whole document that
/// has no title heading to point at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Definition<'a> {
    Element(&'a Document, &'a Element),
    Document(&'a Document),
}

impl Definition<'_> {
    pub fn document(&self) -> &Document {
        match self {
            Definition::Element(document, _) | Definition::Document(document) => *document,
        }
    }
}

/// Declarations of whatever `element` refers to. A link to an existing
/// document without a title resolves to the document itself.
pub fn find_definitions<'a>(
    folder: &'a Folder,
    document: &'a Document,
    element: &Element,
) -> Vec<Definition<'a>> {
    let resolver = TargetResolver::new(folder);
    let Some(target) = resolver.target_of(document, element) else {
        return Vec::new();
    };

    let declarations = resolver.declarations(document, &target);
    if !declarations.is_empty() {
        return declarations
            .into_iter()
            .map(|(document, element)| Definition::Element(document, element))
            .collect();
    }

    match &target {
        Target::Document { key, anchor: None } => folder
            .documents()
            .filter(|candidate| folder.key_of(&candidate.path).as_ref() == Some(key))
            .map(Definition::Document)
            .collect(),
        _ => Vec::new(),
    }
}

pub fn goto_definition(
    state: &State,
    cursor_position: Position,
    path: &Path,
) -> Result<Option<Vec<Location>>> {
    let folder = state.owning_folder(path)?;
    let Some(document) = folder.document(path) else {
        return Ok(None);
    };
    let Some(element) = element_at_position(cursor_position, &document.elements) else {
        return Ok(None);
    };

    Ok(Some(
        find_definitions(folder, document, element)
            .into_iter()
            .filter_map(|definition| {
                let range = match definition {
                    Definition::Element(_, element) => **element.range(),
                    Definition::Document(..) => tower_lsp::lsp_types::Range {
                        start: Position {
                            line: 0,
                            character: 0,
                        },
                        end: Position {
                            line: 0,
                            character: 1,
                        },
                    },
                };

                Some(Location {
                    uri: Url::from_file_path(&definition.document().path).ok()?,
                    range,
                })
            })
            .collect(),
    ))
}
