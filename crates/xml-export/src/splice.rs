//! Byte-range edits over a template's original text.
//!
//! Templates are read with `roxmltree`, which keeps the byte range of
//! every node. Merging produces a list of [`Edit`]s against those ranges
//! and [`apply`] splices them in one pass, so every byte outside an edit
//! is copied unchanged.

use std::borrow::Cow;
use std::ops::Range;

use anyhow::anyhow;
use csvtoxml_common::error::{ConvertError, ConvertResult};
use roxmltree::Node;

/// Replace `range` of the original text with `replacement`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub range: Range<usize>,
    pub replacement: String,
}

impl Edit {
    pub fn replace(range: Range<usize>, replacement: impl Into<String>) -> Self {
        Self {
            range,
            replacement: replacement.into(),
        }
    }

    pub fn delete(range: Range<usize>) -> Self {
        Self::replace(range, String::new())
    }
}

/// Apply non-overlapping edits to `text`.
///
/// Edits may be given in any order. Overlapping edits are an error.
pub fn apply(text: &str, mut edits: Vec<Edit>) -> ConvertResult<String> {
    edits.sort_by_key(|edit| (edit.range.start, edit.range.end));

    let mut output = String::with_capacity(text.len());
    let mut position = 0;
    for edit in &edits {
        if edit.range.start < position
            || edit.range.end > text.len()
            || edit.range.start > edit.range.end
        {
            return Err(ConvertError::Other(anyhow!(
                "conflicting template edits at byte {}",
                edit.range.start
            )));
        }
        output.push_str(&text[position..edit.range.start]);
        output.push_str(&edit.replacement);
        position = edit.range.end;
    }
    output.push_str(&text[position..]);
    Ok(output)
}

/// Escape text or attribute content.
pub fn escape(value: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(value)
}

/// Source text of a node.
pub fn source<'i>(text: &'i str, node: Node<'_, 'i>) -> &'i str {
    &text[node.range()]
}

/// Byte offset just past the `>` that closes the start tag beginning at
/// `start`.
pub fn start_tag_end(text: &str, start: usize) -> usize {
    let mut quote: Option<u8> = None;
    for (offset, byte) in text.as_bytes()[start..].iter().enumerate() {
        match (quote, *byte) {
            (Some(q), b) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(*byte),
            (None, b'>') => return start + offset + 1,
            (None, _) => {}
        }
    }
    text.len()
}

/// Range between an element's start and end tags, or `None` for an
/// empty-element tag.
pub fn inner_range(text: &str, node: Node<'_, '_>) -> Option<Range<usize>> {
    let range = node.range();
    let open_end = start_tag_end(text, range.start);
    if open_end >= range.end {
        return None;
    }
    let close_start = text[open_end..range.end].rfind("</")? + open_end;
    Some(open_end..close_start)
}

/// Whitespace that indents the line `position` sits on, when nothing
/// else precedes it on that line.
pub fn indent_before(text: &str, position: usize) -> &str {
    let line_start = text[..position].rfind('\n').map_or(0, |i| i + 1);
    let prefix = &text[line_start..position];
    if prefix.chars().all(char::is_whitespace) {
        prefix
    } else {
        ""
    }
}

/// A node's range widened to swallow the whitespace before it, so
/// deleting it leaves no blank line behind.
pub fn removal_range(text: &str, node: Node<'_, '_>) -> Range<usize> {
    let range = node.range();
    let leading = text[..range.start]
        .chars()
        .rev()
        .take_while(|c| c.is_whitespace())
        .map(char::len_utf8)
        .sum::<usize>();
    range.start - leading..range.end
}

/// One ` name="value"` attribute, escaped.
pub fn attr(name: &str, value: &str) -> String {
    format!(" {name}=\"{}\"", escape(value))
}

/// Rebuild a node's start tag, overriding or adding the given
/// attributes while keeping the rest in document order.
pub fn start_tag(node: Node<'_, '_>, overrides: &[(&str, &str)], empty: bool) -> String {
    let name = node.tag_name().name();
    let mut tag = format!("<{name}");
    let mut used = vec![false; overrides.len()];

    for attribute in node.attributes() {
        let value = match overrides
            .iter()
            .position(|(key, _)| *key == attribute.name())
        {
            Some(i) => {
                used[i] = true;
                overrides[i].1
            }
            None => attribute.value(),
        };
        tag.push_str(&attr(attribute.name(), value));
    }
    for ((key, value), used) in overrides.iter().zip(used) {
        if !used {
            tag.push_str(&attr(key, value));
        }
    }
    tag.push_str(if empty { "/>" } else { ">" });
    tag
}

/// `<name>value</name>` with the value escaped.
pub fn text_element(name: &str, value: &str) -> String {
    format!("<{name}>{}</{name}>", escape(value))
}

pub fn child<'a, 'i>(node: Node<'a, 'i>, name: &str) -> Option<Node<'a, 'i>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

pub fn children<'a, 'i: 'a>(
    node: Node<'a, 'i>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'i>> + 'a {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

/// Trimmed text of a named child element.
pub fn child_text<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    child(node, name)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
}
