// Style Editor
// Applies and strips style tags, returning new documents.
// Blocks outside the affected range are shared with the input document.

use regex::Regex;
use std::iter;
use std::sync::Arc;

use super::range::{Segment, resolve};
use super::selection::Selection;
use super::structured_document::{Document, Span, StyleTag, TextBlock, char_offset};
use crate::error::EditResult;

fn add_span(block: &TextBlock, tag: &StyleTag, segment: &Segment) -> TextBlock {
    let span = Span::new(tag.clone(), segment.start, segment.end);
    block.with_spans(block.spans().iter().cloned().chain(iter::once(span)))
}

/// Apply `tag` over the selected range.
///
/// Existing spans of the same tag that overlap or touch the new range are
/// merged with it, so applying the same tag twice is the same as once.
/// A collapsed selection changes nothing.
pub fn apply_style_over_selection(
    doc: &Document,
    selection: &Selection,
    tag: &StyleTag,
) -> EditResult<Document> {
    let segments = resolve(doc, selection)?;
    if segments.iter().all(Segment::is_empty) {
        return Ok(doc.clone());
    }

    let blocks = doc.blocks();
    let replacement: Vec<Arc<TextBlock>> = segments
        .iter()
        .map(|segment| {
            let block = &blocks[segment.block_index];
            if segment.is_empty() {
                Arc::clone(block)
            } else {
                Arc::new(add_span(block, tag, segment))
            }
        })
        .collect();

    // Segments always cover consecutive block indices
    let first = segments[0].block_index;
    let last = segments[segments.len() - 1].block_index;

    tracing::debug!(%tag, first, last, "apply style");
    Ok(doc.splice(first..last + 1, replacement))
}

/// Remove every span of `tag` from the whole document.
///
/// Blocks that never carried the tag are reused, and if no block did the
/// same document version comes back.
pub fn remove_style_everywhere(doc: &Document, tag: &StyleTag) -> Document {
    let mut touched = 0usize;
    let result = doc.map_blocks(|block| {
        if !block.has_tag(tag) {
            return None;
        }
        touched += 1;
        Some(block.with_spans(block.spans().iter().filter(|s| &s.tag != tag).cloned()))
    });
    tracing::debug!(%tag, blocks = touched, "remove style");
    result
}

/// Apply `tag` to every match of `pattern`, block by block.
/// Matches never cross blocks. Empty matches are ignored.
pub fn apply_style_to_matches(doc: &Document, pattern: &Regex, tag: &StyleTag) -> Document {
    doc.map_blocks(|block| {
        let text = block.text();
        let matches: Vec<Span> = pattern
            .find_iter(text)
            .filter(|m| !m.is_empty())
            .map(|m| Span::new(tag.clone(), char_offset(text, m.start()), char_offset(text, m.end())))
            .collect();
        if matches.is_empty() {
            return None;
        }
        tracing::debug!(%tag, block = %block.id(), matches = matches.len(), "style matches");
        Some(block.with_spans(block.spans().iter().cloned().chain(matches)))
    })
}
