// Range Mutator
// Replaces a selected range with new text. A range spanning several blocks
// always collapses into a single block: a rewrite is one flat run of text.

use regex::Regex;
use std::iter;
use std::sync::Arc;

use super::range::resolve_bounds;
use super::selection::{Position, Selection};
use super::structured_document::{Document, Span, StyleTag, TextBlock, char_offset};
use crate::error::{EditError, EditResult};

/// Replace the selection with `replacement`, optionally tagging the new text.
///
/// The blocks from the selection's start block to its end block are replaced
/// by one block that keeps the start block's id. Its text is the start
/// block's text before the selection, the replacement, and the end block's
/// text after the selection. Spans of the kept prefix and suffix survive
/// (clipped, and shifted for the suffix); spans inside the selection are
/// dropped.
///
/// Returns the new document and a forward selection covering exactly the
/// inserted text. A collapsed selection with an empty replacement is
/// rejected as ambiguous.
pub fn replace_selection_with_text(
    doc: &Document,
    selection: &Selection,
    replacement: &str,
    tag: Option<&StyleTag>,
) -> EditResult<(Document, Selection)> {
    let (start, end) = resolve_bounds(doc, selection)?;
    if start == end && replacement.is_empty() {
        return Err(EditError::InvalidSelection);
    }

    let blocks = doc.blocks();
    let start_block = &blocks[start.index];
    let end_block = &blocks[end.index];
    let end_len = end_block.len();

    let prefix = start_block.slice(0, start.offset);
    let suffix = end_block.slice(end.offset, end_len);
    let prefix_len = start.offset;
    let suffix_at = prefix_len + replacement.chars().count();

    let mut text = String::with_capacity(prefix.len() + replacement.len() + suffix.len());
    text.push_str(prefix);
    text.push_str(replacement);
    text.push_str(suffix);

    let prefix_spans = start_block
        .spans()
        .iter()
        .filter_map(|s| s.clip(0, prefix_len));
    let suffix_spans = end_block
        .spans()
        .iter()
        .filter_map(|s| s.clip(end.offset, end_len))
        .map(|s| s.rebased(end.offset, suffix_at));
    let inserted = tag
        .filter(|_| suffix_at > prefix_len)
        .map(|t| Span::new(t.clone(), prefix_len, suffix_at));

    let id = start_block.id();
    let merged = TextBlock::new(id, text).with_spans(
        prefix_spans
            .chain(suffix_spans)
            .chain(inserted),
    );

    tracing::debug!(
        block = %id,
        removed_blocks = end.index - start.index,
        prefix_len,
        inserted_len = suffix_at - prefix_len,
        tagged = tag.is_some(),
        "replace selection"
    );

    let new_doc = doc.splice(start.index..end.index + 1, iter::once(Arc::new(merged)));
    let new_selection = Selection::new(Position::new(id, prefix_len), Position::new(id, suffix_at));
    Ok((new_doc, new_selection))
}

/// Delete every match of `pattern` from every block.
///
/// Matches in a block are removed from last to first so the offsets of the
/// earlier ones stay valid. Spans around a deleted match are kept and merged
/// if they meet.
pub fn remove_matches(doc: &Document, pattern: &Regex) -> EditResult<Document> {
    let mut result = doc.clone();
    for block in doc.blocks() {
        let text = block.text();
        let ranges: Vec<(usize, usize)> = pattern
            .find_iter(text)
            .filter(|m| !m.is_empty())
            .map(|m| (char_offset(text, m.start()), char_offset(text, m.end())))
            .collect();

        for &(start, end) in ranges.iter().rev() {
            let selection = Selection::new(
                Position::new(block.id(), start),
                Position::new(block.id(), end),
            );
            let (next, _) = replace_selection_with_text(&result, &selection, "", None)?;
            result = next;
        }

        if !ranges.is_empty() {
            tracing::debug!(block = %block.id(), removed = ranges.len(), "remove matches");
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::richtext::range::{extract_text, resolve};
    use crate::richtext::structured_document::BlockId;

    fn two_blocks() -> Document {
        Document::from_pairs([(BlockId(1), "Hello world"), (BlockId(2), "Goodbye now")]).unwrap()
    }

    #[test]
    fn test_replace_across_blocks_with_tag() {
        let doc = two_blocks();
        let forward = Selection::new(Position::new(1, 6), Position::new(2, 7));

        for sel in [forward, forward.reversed()] {
            let (new_doc, new_sel) =
                replace_selection_with_text(&doc, &sel, "Earth", Some(&StyleTag::pending())).unwrap();

            assert_eq!(new_doc.block_count(), 1);
            let block = new_doc.block(0).unwrap();
            assert_eq!(block.text(), "Hello Earth now");
            assert_eq!(block.spans(), &[Span::new(StyleTag::pending(), 6, 11)]);
            assert_eq!(new_sel, Selection::new(Position::new(1, 6), Position::new(1, 11)));
            assert_eq!(extract_text(&new_doc, &new_sel).unwrap(), "Earth");
        }
    }

    #[test]
    fn test_insert_at_caret() {
        let doc = two_blocks();
        let sel = Selection::caret(Position::new(1, 3));
        let (new_doc, new_sel) = replace_selection_with_text(&doc, &sel, "XYZ", None).unwrap();

        assert_eq!(new_doc.block(0).unwrap().text(), "HelXYZlo world");
        assert!(new_doc.block(0).unwrap().spans().is_empty());
        assert_eq!(new_sel, Selection::new(Position::new(1, 3), Position::new(1, 6)));
        assert!(Arc::ptr_eq(&doc.blocks()[1], &new_doc.blocks()[1]));
    }

    #[test]
    fn test_collapsed_empty_replacement_is_rejected() {
        let doc = two_blocks();
        let sel = Selection::caret(Position::new(2, 0));
        assert_eq!(
            replace_selection_with_text(&doc, &sel, "", None),
            Err(EditError::InvalidSelection)
        );
    }

    #[test]
    fn test_pure_deletion() {
        let doc = two_blocks();
        let sel = Selection::new(Position::new(1, 5), Position::new(1, 11));
        let (new_doc, new_sel) = replace_selection_with_text(&doc, &sel, "", None).unwrap();
        assert_eq!(new_doc.block(0).unwrap().text(), "Hello");
        assert!(new_sel.is_collapsed());
        assert_eq!(new_sel.anchor, Position::new(1, 5));
    }

    #[test]
    fn test_spans_are_clipped_and_shifted() {
        let doc = Document::from_blocks([
            TextBlock::new(1, "Hello world").with_span(StyleTag::bold(), 0, 8),
            TextBlock::new(2, "in between").with_span(StyleTag::italic(), 0, 10),
            TextBlock::new(3, "Goodbye now").with_span(StyleTag::italic(), 4, 11),
        ])
        .unwrap();
        let sel = Selection::new(Position::new(1, 6), Position::new(3, 7));
        let (new_doc, _) = replace_selection_with_text(&doc, &sel, "big", None).unwrap();

        let block = new_doc.block(0).unwrap();
        assert_eq!(block.text(), "Hello big now");
        assert_eq!(
            block.spans(),
            &[
                Span::new(StyleTag::bold(), 0, 6),
                Span::new(StyleTag::italic(), 9, 13),
            ]
        );
    }

    #[test]
    fn test_deletion_merges_spans_that_meet() {
        let doc = Document::from_blocks([
            TextBlock::new(1, "aaXXbb")
                .with_span(StyleTag::bold(), 0, 2)
                .with_span(StyleTag::bold(), 4, 6),
        ])
        .unwrap();
        let sel = Selection::new(Position::new(1, 2), Position::new(1, 4));
        let (new_doc, _) = replace_selection_with_text(&doc, &sel, "", None).unwrap();
        assert_eq!(
            new_doc.block(0).unwrap().spans(),
            &[Span::new(StyleTag::bold(), 0, 4)]
        );
    }

    #[test]
    fn test_replace_with_own_text_round_trips() {
        let doc = Document::from_pairs([
            (BlockId(1), "First line"),
            (BlockId(2), "Second"),
            (BlockId(3), "Third line"),
        ])
        .unwrap();
        let sel = Selection::new(Position::new(3, 5), Position::new(1, 2));
        let original = extract_text(&doc, &sel).unwrap();

        let (new_doc, new_sel) = replace_selection_with_text(&doc, &sel, &original, None).unwrap();
        assert_eq!(new_doc.to_plain_text(), doc.to_plain_text());
        assert_eq!(extract_text(&new_doc, &new_sel).unwrap(), original);
        assert_eq!(resolve(&new_doc, &new_sel).unwrap().len(), 1);
    }

    #[test]
    fn test_stale_selection_after_merge() {
        let doc = two_blocks();
        let sel = Selection::new(Position::new(1, 6), Position::new(2, 7));
        let (new_doc, _) = replace_selection_with_text(&doc, &sel, "Earth", None).unwrap();

        let stale = Selection::new(Position::new(2, 0), Position::new(2, 3));
        let err = replace_selection_with_text(&new_doc, &stale, "x", None).unwrap_err();
        assert_eq!(err, EditError::UnknownBlock(BlockId(2)));
        assert!(err.is_stale_selection());
    }

    #[test]
    fn test_remove_matches() {
        let doc = Document::from_blocks([
            TextBlock::new(1, "Claim one. Extracted from: [a.pdf], [b.pdf]. Claim two.")
                .with_span(StyleTag::bold(), 0, 5),
            TextBlock::new(2, "Nothing to strip"),
        ])
        .unwrap();
        let pattern = Regex::new(r"\s*Extracted from:.*?(?:\[.*?\](?:,\s*)?)+[.\n]?").unwrap();
        let cleaned = remove_matches(&doc, &pattern).unwrap();

        assert_eq!(cleaned.block(0).unwrap().text(), "Claim one. Claim two.");
        assert_eq!(
            cleaned.block(0).unwrap().spans(),
            &[Span::new(StyleTag::bold(), 0, 5)]
        );
        assert!(Arc::ptr_eq(&doc.blocks()[1], &cleaned.blocks()[1]));
    }
}
