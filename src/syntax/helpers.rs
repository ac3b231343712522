//! Helper functions shared by the extractor and the reference finder.

use std::path::Path;

use itertools::Itertools;
use pathdiff::diff_paths;

/// Anchor slug of a heading or link fragment: `"D2 H2.2"` becomes `"d2-h22"`.
pub fn slug(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.trim().chars() {
        if c.is_whitespace() || c == '-' {
            pending_dash = true;
        } else if c.is_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        }
    }

    slug
}

/// Labels match case-insensitively with inner whitespace collapsed.
pub fn normalize_label(label: &str) -> String {
    label.split_whitespace().join(" ").to_lowercase()
}

/// Root-relative, forward-slash key of a path, or `None` when the path is not
/// under `root`.
pub fn root_relative_key(root: &Path, path: &Path) -> Option<String> {
    if !path.starts_with(root) {
        return None;
    }

    diff_paths(path, root).and_then(|diff| {
        let parts = diff
            .components()
            .map(|component| component.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()?;
        Some(parts.join("/"))
    })
}
