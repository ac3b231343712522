use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use itertools::Itertools;
use tower_lsp::lsp_types::{Location, Position, Url};

use crate::error::Result;
use crate::resolve::resolve_link;
use crate::syntax::{element_at_position, normalize_label, slug, Element, Rangeable};
use crate::workspace::{Document, Folder, State};

/// The logical thing an element declares or points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// A document by root-relative key, or one of its headings by slug.
    /// A document's title stands for the document itself (`anchor: None`).
    Document { key: String, anchor: Option<String> },
    /// A link label. Labels never match across documents.
    Label { document: PathBuf, label: String },
}

/// Resolves elements of one folder to [`Target`]s.
///
/// Wiki-link names are looked up by the slug of a document's file stem first
/// and of its title second; the lookup table is built once per query.
pub struct TargetResolver<'a> {
    folder: &'a Folder,
    names: HashMap<String, String>,
}

impl<'a> TargetResolver<'a> {
    pub fn new(folder: &'a Folder) -> TargetResolver<'a> {
        let keyed = folder
            .documents()
            .filter_map(|document| Some((folder.key_of(&document.path)?, document)))
            .collect_vec();

        let by_stem = keyed.iter().filter_map(|(key, document)| {
            Some((slug(document.file_stem()?), key.clone()))
        });
        let by_title = keyed
            .iter()
            .filter_map(|(key, document)| Some((document.title()?.slug.clone(), key.clone())));

        let mut names = HashMap::new();
        for (name, key) in by_stem.chain(by_title) {
            names.entry(name).or_insert(key);
        }

        TargetResolver { folder, names }
    }

    pub fn folder(&self) -> &'a Folder {
        self.folder
    }

    /// The target `element` declares (headings, label definitions) or refers
    /// to (links, label usages).
    pub fn target_of(&self, document: &Document, element: &Element) -> Option<Target> {
        match element {
            Element::Heading(heading) => Some(Target::Document {
                key: self.folder.key_of(&document.path)?,
                anchor: match heading.is_title {
                    true => None,
                    false => Some(heading.slug.clone()),
                },
            }),
            Element::WikiLink(..) | Element::InlineLink(..) => self.link_target(document, element),
            Element::LinkDef(def) => Some(label_target(document, &def.label)),
            Element::LinkRef(usage) => Some(label_target(document, &usage.label)),
        }
    }

    fn link_target(&self, document: &Document, element: &Element) -> Option<Target> {
        let root = self.folder.root();
        let (key, anchor) = match element {
            Element::WikiLink(link) => {
                let key = match link.target.as_deref() {
                    None => self.folder.key_of(&document.path)?,
                    Some(target) if target.contains('/') || has_md_suffix(target) => {
                        resolve_link(root, &document.path, target).map(with_md_suffix)?
                    }
                    Some(target) => match self.names.get(&slug(target)) {
                        Some(key) => key.clone(),
                        None => resolve_link(root, &document.path, &format!("{target}.md"))?,
                    },
                };
                (key, link.anchor.as_deref())
            }
            Element::InlineLink(link) => {
                let key = match link.url.as_deref() {
                    None => self.folder.key_of(&document.path)?,
                    Some(url) => resolve_link(root, &document.path, url).map(with_md_extension)?,
                };
                (key, link.anchor.as_deref())
            }
            Element::Heading(..) | Element::LinkDef(..) | Element::LinkRef(..) => return None,
        };

        Some(Target::Document {
            key,
            anchor: anchor.map(slug),
        })
    }

    /// Whether `element` is a declaration of `target`.
    pub fn declares(&self, document: &Document, element: &Element, target: &Target) -> bool {
        match (element, target) {
            (Element::Heading(heading), Target::Document { key, anchor }) => {
                let anchor_matches = match anchor {
                    None => heading.is_title,
                    Some(anchor) => &heading.slug == anchor,
                };
                anchor_matches && self.folder.key_of(&document.path).as_ref() == Some(key)
            }
            (Element::LinkDef(def), Target::Label { document: owner, label }) => {
                &document.path == owner && &normalize_label(&def.label) == label
            }
            _ => false,
        }
    }

    /// Whether `element` refers to `target` without declaring it.
    pub fn refers_to(&self, document: &Document, element: &Element, target: &Target) -> bool {
        match (element, target) {
            (Element::WikiLink(..) | Element::InlineLink(..), Target::Document { .. }) => {
                self.link_target(document, element).as_ref() == Some(target)
            }
            (Element::LinkRef(usage), Target::Label { document: owner, label }) => {
                &document.path == owner && &normalize_label(&usage.label) == label
            }
            _ => false,
        }
    }

    /// Documents a query for `target` has to look at.
    fn scope(&self, anchor_document: &'a Document, target: &Target) -> Vec<&'a Document> {
        match target {
            Target::Label { .. } => vec![anchor_document],
            Target::Document { .. } => self.folder.documents().collect(),
        }
    }

    /// Declaring elements of `target`, deduplicated, in document then source
    /// order.
    pub fn declarations(
        &self,
        anchor_document: &'a Document,
        target: &Target,
    ) -> Vec<(&'a Document, &'a Element)> {
        self.scope(anchor_document, target)
            .into_iter()
            .flat_map(|document| {
                document
                    .elements
                    .iter()
                    .filter(move |element| self.declares(document, element, target))
                    .map(move |element| (document, element))
            })
            .unique_by(|(document, element)| (document.path.clone(), *element.range()))
            .collect()
    }

    fn occurrences(
        &self,
        anchor_document: &'a Document,
        target: &Target,
    ) -> Vec<(&'a Document, &'a Element)> {
        self.scope(anchor_document, target)
            .into_iter()
            .flat_map(|document| {
                document
                    .elements
                    .iter()
                    .filter(move |element| self.refers_to(document, element, target))
                    .map(move |element| (document, element))
            })
            .collect()
    }
}

fn label_target(document: &Document, label: &str) -> Target {
    Target::Label {
        document: document.path.clone(),
        label: normalize_label(label),
    }
}

fn has_extension(target: &str) -> bool {
    Path::new(target).extension().is_some()
}

fn has_md_suffix(target: &str) -> bool {
    target.to_lowercase().ends_with(".md")
}

/// Wiki-link names may contain dots (`[[Version 1.0]]`), so only an explicit
/// `.md` suffix counts.
fn with_md_suffix(key: String) -> String {
    match has_md_suffix(&key) {
        true => key,
        false => format!("{key}.md"),
    }
}

fn with_md_extension(key: String) -> String {
    match has_extension(&key) {
        true => key,
        false => format!("{key}.md"),
    }
}

/// Every element of `folder` that refers to the same target as
/// `anchor_element`.
///
/// Heading and link targets are searched across the whole folder; label
/// targets only inside `anchor_document`. With `include_declaration` the
/// declaring elements come first. Occurrences follow grouped by document, in
/// source order within each document.
pub fn find_references<'a>(
    include_declaration: bool,
    folder: &'a Folder,
    anchor_document: &'a Document,
    anchor_element: &Element,
) -> Vec<(&'a Document, &'a Element)> {
    let resolver = TargetResolver::new(folder);
    let Some(target) = resolver.target_of(anchor_document, anchor_element) else {
        return Vec::new();
    };

    let occurrences = resolver.occurrences(anchor_document, &target);
    match include_declaration {
        true => resolver
            .declarations(anchor_document, &target)
            .into_iter()
            .chain(occurrences)
            .collect(),
        false => occurrences,
    }
}

pub fn references(
    state: &State,
    cursor_position: Position,
    path: &Path,
    include_declaration: bool,
) -> Result<Option<Vec<Location>>> {
    let folder = state.owning_folder(path)?;
    let Some(document) = folder.document(path) else {
        return Ok(None);
    };
    let Some(anchor) = element_at_position(cursor_position, &document.elements) else {
        return Ok(None);
    };

    Ok(Some(
        find_references(include_declaration, folder, document, anchor)
            .into_iter()
            .filter_map(|(document, element)| {
                Url::from_file_path(&document.path)
                    .map(|uri| Location {
                        uri,
                        range: **element.range(),
                    })
                    .ok()
            })
            .collect(),
    ))
}
