// Selection
// Anchor/focus pointers into a Document, possibly spanning blocks and
// possibly backward. Everything downstream works on the normalized form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

use super::structured_document::{BlockId, Document, TextBlock, char_offset};
use crate::error::{EditError, EditResult};

/// A point in the document: a block and a character offset inside it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub block: BlockId,
    pub offset: usize,
}

impl Position {
    pub fn new(block: impl Into<BlockId>, offset: usize) -> Self {
        Position {
            block: block.into(),
            offset,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.block, self.offset)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected BLOCK:OFFSET, got {0:?}")]
pub struct ParsePositionError(String);

impl FromStr for Position {
    type Err = ParsePositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParsePositionError(s.to_string());
        let (block, offset) = s.split_once(':').ok_or_else(err)?;
        let block = block.trim().parse::<u64>().map_err(|_| err())?;
        let offset = offset.trim().parse::<usize>().map_err(|_| err())?;
        Ok(Position::new(block, offset))
    }
}

/// A located position: block index plus offset, validated against a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Location {
    pub index: usize,
    pub offset: usize,
}

/// Check that `pos` points into `doc` and return its block index
pub(crate) fn locate(doc: &Document, pos: Position) -> EditResult<Location> {
    let index = doc
        .find_block_index(pos.block)
        .ok_or(EditError::UnknownBlock(pos.block))?;
    let len = doc.blocks()[index].len();
    if pos.offset > len {
        return Err(EditError::OffsetOutOfRange {
            block: pos.block,
            offset: pos.offset,
            len,
        });
    }
    Ok(Location {
        index,
        offset: pos.offset,
    })
}

/// Anchor is where the selection started, focus is where it ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Position,
    pub focus: Position,
}

impl Selection {
    pub fn new(anchor: Position, focus: Position) -> Self {
        Selection { anchor, focus }
    }

    /// A collapsed selection (caret) at `pos`
    pub fn caret(pos: Position) -> Self {
        Selection::new(pos, pos)
    }

    /// From the start of the first block to the end of the last one
    pub fn whole_document(doc: &Document) -> Self {
        let blocks = doc.blocks();
        let first = &blocks[0];
        let last = &blocks[blocks.len() - 1];
        Selection::new(
            Position::new(first.id(), 0),
            Position::new(last.id(), last.len()),
        )
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// Same range, opposite direction
    pub fn reversed(&self) -> Self {
        Selection::new(self.focus, self.anchor)
    }

    pub(crate) fn locate(&self, doc: &Document) -> EditResult<(Location, Location)> {
        Ok((locate(doc, self.anchor)?, locate(doc, self.focus)?))
    }

    /// True if the focus comes before the anchor in document order
    pub fn is_backward(&self, doc: &Document) -> EditResult<bool> {
        let (anchor, focus) = self.locate(doc)?;
        Ok(focus < anchor)
    }

    /// (start, end) in document order
    pub fn normalize(&self, doc: &Document) -> EditResult<(Position, Position)> {
        if self.is_backward(doc)? {
            Ok((self.focus, self.anchor))
        } else {
            Ok((self.anchor, self.focus))
        }
    }

    /// Select the word (or run of whitespace/punctuation) around `pos`.
    /// At the very end of a block this is a caret.
    pub fn word_at(doc: &Document, pos: Position) -> EditResult<Self> {
        let loc = locate(doc, pos)?;
        let block = &doc.blocks()[loc.index];
        let text = block.text();

        let mut start = 0;
        for (byte_idx, word) in text.split_word_bound_indices() {
            let end = start + word.chars().count();
            debug_assert_eq!(start, char_offset(text, byte_idx));
            if loc.offset < end {
                return Ok(Selection::new(
                    Position::new(pos.block, start),
                    Position::new(pos.block, end),
                ));
            }
            start = end;
        }
        Ok(Selection::caret(pos))
    }

    /// Widen the selection so neither end splits a grapheme cluster.
    /// Direction is preserved.
    pub fn snap_to_graphemes(&self, doc: &Document) -> EditResult<Self> {
        let backward = self.is_backward(doc)?;
        let (start, end) = self.normalize(doc)?;
        let start_block = &doc.blocks()[locate(doc, start)?.index];
        let end_block = &doc.blocks()[locate(doc, end)?.index];

        let start = Position::new(start.block, grapheme_at_or_before(start_block, start.offset));
        let end = Position::new(end.block, grapheme_at_or_after(end_block, end.offset));

        let snapped = Selection::new(start, end);
        Ok(if backward { snapped.reversed() } else { snapped })
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.anchor, self.focus)
    }
}

/// Character offsets of all grapheme boundaries, including 0 and the length
fn grapheme_boundaries(text: &str) -> Vec<usize> {
    let mut boundaries = vec![0];
    let mut offset = 0;
    for g in text.graphemes(true) {
        offset += g.chars().count();
        boundaries.push(offset);
    }
    boundaries
}

fn grapheme_at_or_before(block: &TextBlock, offset: usize) -> usize {
    grapheme_boundaries(block.text())
        .into_iter()
        .take_while(|&b| b <= offset)
        .last()
        .unwrap_or(0)
}

fn grapheme_at_or_after(block: &TextBlock, offset: usize) -> usize {
    grapheme_boundaries(block.text())
        .into_iter()
        .find(|&b| b >= offset)
        .unwrap_or(offset)
}
