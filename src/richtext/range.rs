// Range resolution
// Turns a Selection into the ordered list of per-block segments it covers.
// This is the only place that knows how a selection crosses block boundaries.

use super::selection::{Location, Selection};
use super::structured_document::Document;
use crate::error::EditResult;

/// Separator placed between the text of two different blocks
pub const BLOCK_SEPARATOR: char = '\n';

/// One block's share of a resolved selection: [start..end) in that block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub block_index: usize,
    pub start: usize,
    pub end: usize,
}

impl Segment {
    pub fn new(block_index: usize, start: usize, end: usize) -> Self {
        Segment {
            block_index,
            start,
            end,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Normalized, validated endpoints of a selection
pub(crate) fn resolve_bounds(doc: &Document, selection: &Selection) -> EditResult<(Location, Location)> {
    let (anchor, focus) = selection.locate(doc)?;
    Ok(if focus < anchor {
        (focus, anchor)
    } else {
        (anchor, focus)
    })
}

/// Resolve a selection into segments in document order.
///
/// A collapsed selection yields a single empty segment. Fails if an endpoint
/// names a block that is not in the document or an offset past its block.
pub fn resolve(doc: &Document, selection: &Selection) -> EditResult<Vec<Segment>> {
    let (start, end) = resolve_bounds(doc, selection)?;

    if start.index == end.index {
        return Ok(vec![Segment::new(start.index, start.offset, end.offset)]);
    }

    let blocks = doc.blocks();
    let mut segments = Vec::with_capacity(end.index - start.index + 1);
    segments.push(Segment::new(
        start.index,
        start.offset,
        blocks[start.index].len(),
    ));
    for index in start.index + 1..end.index {
        segments.push(Segment::new(index, 0, blocks[index].len()));
    }
    segments.push(Segment::new(end.index, 0, end.offset));

    tracing::trace!(
        segments = segments.len(),
        start_block = start.index,
        end_block = end.index,
        "resolved selection"
    );
    Ok(segments)
}

/// Text of a single segment
pub fn segment_text<'a>(doc: &'a Document, segment: &Segment) -> &'a str {
    doc.blocks()[segment.block_index].slice(segment.start, segment.end)
}

/// The selected text, with one newline between consecutive blocks.
/// This is exactly what gets handed to the suggestion service.
pub fn extract_text(doc: &Document, selection: &Selection) -> EditResult<String> {
    let segments = resolve(doc, selection)?;
    let mut text = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            text.push(BLOCK_SEPARATOR);
        }
        text.push_str(segment_text(doc, segment));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EditError;
    use crate::richtext::selection::Position;
    use crate::richtext::structured_document::BlockId;

    fn three_blocks() -> Document {
        Document::from_pairs([
            (BlockId(1), "Hello world"),
            (BlockId(2), "  middle  "),
            (BlockId(3), "Goodbye now"),
        ])
        .unwrap()
    }

    #[test]
    fn test_resolve_single_block() {
        let doc = three_blocks();
        let sel = Selection::new(Position::new(1, 2), Position::new(1, 7));
        assert_eq!(resolve(&doc, &sel).unwrap(), vec![Segment::new(0, 2, 7)]);
        assert_eq!(extract_text(&doc, &sel).unwrap(), "llo w");
    }

    #[test]
    fn test_resolve_across_blocks_both_directions() {
        let doc = three_blocks();
        let sel = Selection::new(Position::new(1, 6), Position::new(3, 7));
        let expected = vec![
            Segment::new(0, 6, 11),
            Segment::new(1, 0, 10),
            Segment::new(2, 0, 7),
        ];
        assert_eq!(resolve(&doc, &sel).unwrap(), expected);
        assert_eq!(resolve(&doc, &sel.reversed()).unwrap(), expected);
        assert_eq!(
            extract_text(&doc, &sel.reversed()).unwrap(),
            "world\n  middle  \nGoodbye"
        );
    }

    #[test]
    fn test_resolve_collapsed() {
        let doc = three_blocks();
        let sel = Selection::caret(Position::new(2, 4));
        let segments = resolve(&doc, &sel).unwrap();
        assert_eq!(segments, vec![Segment::new(1, 4, 4)]);
        assert!(segments[0].is_empty());
        assert_eq!(extract_text(&doc, &sel).unwrap(), "");
    }

    #[test]
    fn test_resolve_empty_edge_segments() {
        let doc = three_blocks();
        // From the very end of block 1 to the very start of block 3
        let sel = Selection::new(Position::new(1, 11), Position::new(3, 0));
        assert_eq!(
            resolve(&doc, &sel).unwrap(),
            vec![
                Segment::new(0, 11, 11),
                Segment::new(1, 0, 10),
                Segment::new(2, 0, 0),
            ]
        );
        assert_eq!(extract_text(&doc, &sel).unwrap(), "\n  middle  \n");
    }

    #[test]
    fn test_resolve_errors() {
        let doc = three_blocks();
        let sel = Selection::new(Position::new(4, 0), Position::new(1, 0));
        assert_eq!(resolve(&doc, &sel), Err(EditError::UnknownBlock(BlockId(4))));

        let sel = Selection::new(Position::new(1, 0), Position::new(3, 20));
        assert!(matches!(
            extract_text(&doc, &sel),
            Err(EditError::OffsetOutOfRange { offset: 20, .. })
        ));
    }

    #[test]
    fn test_segments_join_to_extracted_text() {
        let doc = three_blocks();
        let sel = Selection::new(Position::new(3, 3), Position::new(1, 1));
        let joined = resolve(&doc, &sel)
            .unwrap()
            .iter()
            .map(|s| segment_text(&doc, s))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(joined, extract_text(&doc, &sel).unwrap());
    }
}
