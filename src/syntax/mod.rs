mod helpers;
mod types;


pub use helpers::{normalize_label, root_relative_key, slug};
pub use types::{
    byte_to_position, position_to_char, Heading, InlineLink, LinkDef, LinkRef, Rangeable,
    TextRange, WikiLink,
};

use std::{collections::HashSet, ops::Range};

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use ropey::Rope;
use tower_lsp::lsp_types::Position;

/// One construct of interest extracted from a document.
///
/// Identity and matching rules differ per kind, so every consumer matches on
/// the variant instead of going through a shared trait.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub enum Element {
    Heading(Heading),
    WikiLink(WikiLink),
    InlineLink(InlineLink),
    LinkDef(LinkDef),
    LinkRef(LinkRef),
}

impl Rangeable for Element {
    fn range(&self) -> &TextRange {
        match self {
            Element::Heading(heading) => &heading.range,
            Element::WikiLink(link) => &link.range,
            Element::InlineLink(link) => &link.range,
            Element::LinkDef(def) => &def.range,
            Element::LinkRef(usage) => &usage.range,
        }
    }
}

/// Full parse of a document's text into its elements, in source order.
///
/// Elements inside fenced code blocks and inline code spans are dropped.
pub fn parse(text: &str) -> Vec<Element> {
    let rope = Rope::from_str(text);
    let code = code_ranges(text);
    let in_code = |range: &Range<usize>| {
        code.iter()
            .any(|block| block.start <= range.start && range.end <= block.end)
    };

    let definitions = link_defs(text)
        .filter(|(range, _, _)| !in_code(range))
        .collect_vec();
    let defined_labels: HashSet<String> = definitions
        .iter()
        .map(|(_, label, _)| normalize_label(label))
        .collect();

    let mut seen_title = false;
    let headings = headings(text)
        .filter(|(range, ..)| !in_code(range))
        .map(|(range, level, heading_text)| {
            let is_title = level == 1 && !seen_title;
            seen_title |= is_title;
            (
                range.start,
                Element::Heading(types::Heading {
                    level,
                    slug: slug(&heading_text),
                    text: heading_text,
                    is_title,
                    range: TextRange::from_byte_range(&rope, range),
                }),
            )
        })
        .collect_vec();

    let wiki_links = wiki_links(text)
        .filter(|(range, ..)| !in_code(range))
        .map(|(range, target, anchor)| {
            (
                range.start,
                Element::WikiLink(types::WikiLink {
                    target,
                    anchor,
                    range: TextRange::from_byte_range(&rope, range),
                }),
            )
        });

    let inline_links = inline_links(text)
        .filter(|(range, ..)| !in_code(range))
        .map(|(range, link_text, url, anchor)| {
            (
                range.start,
                Element::InlineLink(types::InlineLink {
                    text: link_text,
                    url,
                    anchor,
                    range: TextRange::from_byte_range(&rope, range),
                }),
            )
        });

    let link_refs = link_refs(text)
        .filter(|(range, _)| !in_code(range))
        .filter(|(_, label)| defined_labels.contains(&normalize_label(label)))
        .map(|(range, label)| {
            (
                range.start,
                Element::LinkRef(types::LinkRef {
                    label,
                    range: TextRange::from_byte_range(&rope, range),
                }),
            )
        });

    let link_defs = definitions.into_iter().map(|(range, label, url)| {
        (
            range.start,
            Element::LinkDef(types::LinkDef {
                label,
                url,
                range: TextRange::from_byte_range(&rope, range),
            }),
        )
    });

    headings
        .into_iter()
        .chain(wiki_links)
        .chain(inline_links)
        .chain(link_defs)
        .chain(link_refs)
        .sorted_by_key(|(start, _)| *start)
        .map(|(_, element)| element)
        .collect()
}

/// The innermost element under `position`.
pub fn element_at_position(position: Position, elements: &[Element]) -> Option<&Element> {
    // elements are sorted by start, so the last hit is the innermost one
    elements
        .iter()
        .filter(|element| element.includes_position(position))
        .last()
}

fn code_ranges(text: &str) -> Vec<Range<usize>> {
    static FENCE_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?ms)^[ ]{0,3}(?:```|~~~).*?^[ ]{0,3}(?:```|~~~)[^\n]*$").unwrap()
    });
    static INLINE_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`[^`\n]+`").unwrap());

    let fences = FENCE_RE.find_iter(text).map(|m| m.range()).collect_vec();
    let spans = INLINE_CODE_RE
        .find_iter(text)
        .map(|m| m.range())
        .filter(|span| {
            !fences
                .iter()
                .any(|fence| fence.start <= span.start && span.end <= fence.end)
        })
        .collect_vec();

    fences.into_iter().chain(spans).collect()
}

fn headings(text: &str) -> impl Iterator<Item = (Range<usize>, usize, String)> + '_ {
    static HEADING_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?m)^(?<starter>#{1,6})[ \t]+(?<heading_text>[^\r\n]+)").unwrap()
    });

    HEADING_RE.captures_iter(text).flat_map(|c| {
        match (c.get(0), c.name("starter"), c.name("heading_text")) {
            (Some(full), Some(starter), Some(heading_text)) => Some((
                full.range(),
                starter.as_str().len(),
                strip_closing_sequence(heading_text.as_str()).to_string(),
            )),
            _ => None,
        }
    })
}

/// `## Title ##` has the text `Title`; `## C#` keeps its `#`.
fn strip_closing_sequence(text: &str) -> &str {
    let text = text.trim_end();
    let stripped = text.trim_end_matches('#');
    if stripped.len() == text.len() {
        text
    } else if stripped.is_empty() || stripped.ends_with([' ', '\t']) {
        stripped.trim_end()
    } else {
        text
    }
}

fn wiki_links(
    text: &str,
) -> impl Iterator<Item = (Range<usize>, Option<String>, Option<String>)> + '_ {
    static WIKI_LINK_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"\[\[(?<target>[^\[\]\|#\n]*)(?:#(?<anchor>[^\[\]\|\n]*))?(?:\|(?<display>[^\[\]\n]*))?\]\]",
        )
        .unwrap()
    });

    WIKI_LINK_RE.captures_iter(text).flat_map(|c| {
        let full = c.get(0)?;
        Some((
            full.range(),
            non_empty(c.name("target").map(|m| m.as_str())),
            non_empty(c.name("anchor").map(|m| m.as_str())),
        ))
    })
}

type InlineCapture = (Range<usize>, String, Option<String>, Option<String>);

fn inline_links(text: &str) -> impl Iterator<Item = InlineCapture> + '_ {
    static MD_LINK_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r#"\[(?<text>[^\[\]\n]*)\]\((?:<(?<angled>[^<>\n]*)>|(?<url>[^()\s<>]*))(?:[ \t]+"[^"\n]*")?\)"#,
        )
        .unwrap()
    });

    MD_LINK_RE.captures_iter(text).flat_map(move |c| {
        let full = c.get(0)?;
        // images are not links to documents
        if text[..full.start()].ends_with('!') {
            return None;
        }

        let destination = c.name("angled").or(c.name("url"))?.as_str();
        let (url, anchor) = match destination.split_once('#') {
            Some((url, anchor)) => (url, Some(anchor)),
            None => (destination, None),
        };
        let url = non_empty(Some(url))
            .map(|url| urlencoding::decode(&url).map_or(url.clone(), |d| d.into_owned()));

        Some((
            full.range(),
            c.name("text").map_or("", |m| m.as_str()).to_string(),
            url,
            non_empty(anchor),
        ))
    })
}

fn link_defs(text: &str) -> impl Iterator<Item = (Range<usize>, String, String)> + '_ {
    static LINK_DEF_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?m)^[ ]{0,3}\[(?<label>[^\[\]\^\n][^\[\]\n]*)\]:[ \t]*(?<url>[^\s]+)")
            .unwrap()
    });

    LINK_DEF_RE.captures_iter(text).flat_map(|c| {
        match (c.get(0), c.name("label"), c.name("url")) {
            (Some(full), Some(label), Some(url)) => Some((
                full.range(),
                label.as_str().to_string(),
                url.as_str().to_string(),
            )),
            _ => None,
        }
    })
}

fn link_refs(text: &str) -> impl Iterator<Item = (Range<usize>, String)> + '_ {
    static LINK_REF_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\[(?<label>[^\[\]\n]+)\](?:\[(?<second>[^\[\]\n]*)\])?").unwrap()
    });

    let bytes = text.as_bytes();
    LINK_REF_RE.captures_iter(text).flat_map(move |c| {
        let full = c.get(0)?;
        let label = c.name("label")?;
        let second = c.name("second");

        // part of a wiki link or a nested bracket
        if full.start() > 0 && matches!(bytes[full.start() - 1], b'[' | b']') {
            return None;
        }
        // inline link, definition, or the tail of a wiki link
        if second.is_none() && matches!(bytes.get(full.end()), Some(b'(' | b':' | b']')) {
            return None;
        }

        let label = match second {
            Some(second) if !second.as_str().trim().is_empty() => second.as_str(),
            _ => label.as_str(),
        };

        Some((full.range(), label.to_string()))
    })
}

fn non_empty(part: Option<&str>) -> Option<String> {
    part.map(str::trim)
        .filter(|part| !part.is_empty())
        .map(String::from)
}
