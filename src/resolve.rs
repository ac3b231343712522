//! Mapping raw link text to a root-relative comparison key.

use std::path::{Component, Path};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::syntax::root_relative_key;

/// Resolves `raw_link`, as written in the document at `referencing_doc`, to a
/// root-relative, forward-slash path under `root`.
///
/// Returns `None` for links with an explicit scheme and for links that climb
/// above `root`. A schemeless token such as `www.google.com` is an ordinary
/// relative file name. The result need not name an existing document.
pub fn resolve_link(root: &Path, referencing_doc: &Path, raw_link: &str) -> Option<String> {
    static SCHEME_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^(?:[A-Za-z][A-Za-z0-9+.\-]*://|mailto:|data:)").unwrap()
    });

    if SCHEME_RE.is_match(raw_link) {
        return None;
    }

    let (mut segments, rest) = match raw_link.strip_prefix('/') {
        Some(rest) => (Vec::new(), rest),
        None => {
            let base = referencing_doc.parent()?;
            let base_key = root_relative_key(root, base)?;
            let segments = base_key
                .split('/')
                .filter(|segment| !segment.is_empty())
                .map(String::from)
                .collect::<Vec<_>>();
            (segments, raw_link)
        }
    };

    for component in Path::new(rest).components() {
        match component {
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                segments.pop()?;
            }
            Component::Normal(segment) => segments.push(segment.to_str()?.to_string()),
        }
    }

    if segments.is_empty() {
        return None;
    }

    Some(segments.join("/"))
}
