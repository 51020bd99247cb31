// Structured Document Model
// Immutable blocks of plain text, each carrying tagged style spans.
// Every edit builds a new Document; blocks that did not change are shared.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::error::{EditError, EditResult};

/// Stable identifier of a block within a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub u64);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for BlockId {
    fn from(id: u64) -> Self {
        BlockId(id)
    }
}

/// Name of an inline style (semantic, not presentational)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleTag(String);

impl StyleTag {
    /// Highlight of text that is part of a pending suggestion
    pub const PENDING: &'static str = "PENDING";
    pub const BOLD: &'static str = "BOLD";
    pub const ITALIC: &'static str = "ITALIC";

    pub fn new(name: impl Into<String>) -> Self {
        StyleTag(name.into())
    }

    pub fn pending() -> Self {
        Self::new(Self::PENDING)
    }

    pub fn bold() -> Self {
        Self::new(Self::BOLD)
    }

    pub fn italic() -> Self {
        Self::new(Self::ITALIC)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StyleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StyleTag {
    fn from(name: &str) -> Self {
        StyleTag::new(name)
    }
}

/// A tagged range [start..end) of a block's text, in characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub tag: StyleTag,
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(tag: StyleTag, start: usize, end: usize) -> Self {
        Span { tag, start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Intersect this span with [lo..hi). Returns None if nothing is left.
    pub fn clip(&self, lo: usize, hi: usize) -> Option<Span> {
        let start = self.start.max(lo);
        let end = self.end.min(hi);
        (start < end).then(|| Span::new(self.tag.clone(), start, end))
    }

    /// Move the span so that offset `from` lands on offset `to`.
    /// The span must not start before `from`.
    pub fn rebased(&self, from: usize, to: usize) -> Span {
        Span::new(
            self.tag.clone(),
            self.start - from + to,
            self.end - from + to,
        )
    }
}

/// Normalize a span list: drop empty spans, merge same-tag spans that overlap
/// or touch, and order the result by (start, end, tag).
pub(crate) fn merge_spans(spans: impl IntoIterator<Item = Span>) -> Vec<Span> {
    let mut spans: Vec<Span> = spans.into_iter().filter(|s| !s.is_empty()).collect();
    spans.sort_by(|a, b| {
        a.tag
            .cmp(&b.tag)
            .then(a.start.cmp(&b.start))
            .then(a.end.cmp(&b.end))
    });

    let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if last.tag == span.tag && span.start <= last.end => {
                last.end = last.end.max(span.end);
            }
            _ => merged.push(span),
        }
    }

    merged.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then(a.end.cmp(&b.end))
            .then(a.tag.cmp(&b.tag))
    });
    merged
}

/// Byte index of the given character offset (clamped to the end of `text`)
pub(crate) fn byte_offset(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Character offset of the given byte index
pub(crate) fn char_offset(text: &str, byte_index: usize) -> usize {
    text[..byte_index].chars().count()
}

/// A block of text: a paragraph or a line, depending on how it was ingested
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextBlock {
    id: BlockId,
    text: String,
    spans: Vec<Span>,
}

impl TextBlock {
    pub fn new(id: impl Into<BlockId>, text: impl Into<String>) -> Self {
        TextBlock {
            id: id.into(),
            text: text.into(),
            spans: Vec::new(),
        }
    }

    /// Add a span, clamped to the text and merged with existing spans of its tag
    pub fn with_span(self, tag: StyleTag, start: usize, end: usize) -> Self {
        let len = self.len();
        let span = Span::new(tag, start.min(len), end.min(len));
        let spans = self.spans.iter().cloned().chain(std::iter::once(span));
        self.with_spans(spans)
    }

    /// Same id and text, different spans. Spans are clamped and normalized.
    pub(crate) fn with_spans(&self, spans: impl IntoIterator<Item = Span>) -> Self {
        let len = self.len();
        TextBlock {
            id: self.id,
            text: self.text.clone(),
            spans: merge_spans(spans.into_iter().filter_map(|s| s.clip(0, len))),
        }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Text length in characters
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn spans_with_tag<'a>(&'a self, tag: &'a StyleTag) -> impl Iterator<Item = &'a Span> {
        self.spans.iter().filter(move |s| &s.tag == tag)
    }

    pub fn has_tag(&self, tag: &StyleTag) -> bool {
        self.spans_with_tag(tag).next().is_some()
    }

    /// Text in the character range [start..end), clamped to the block
    pub fn slice(&self, start: usize, end: usize) -> &str {
        let from = byte_offset(&self.text, start);
        let to = byte_offset(&self.text, end.max(start));
        &self.text[from..to]
    }
}

/// An ordered, non-empty sequence of blocks
///
/// Cloning is cheap: the block list and the blocks are reference counted, so
/// an old version stays valid while newer versions share what they did not
/// touch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    blocks: Arc<[Arc<TextBlock>]>,
}

impl Document {
    /// A document holding one empty block
    pub fn new() -> Self {
        Self::from_shared(vec![Arc::new(TextBlock::new(1, ""))])
    }

    /// Build a document from blocks. Fails if there are none or ids repeat.
    pub fn from_blocks(blocks: impl IntoIterator<Item = TextBlock>) -> EditResult<Self> {
        let blocks: Vec<Arc<TextBlock>> = blocks.into_iter().map(Arc::new).collect();
        if blocks.is_empty() {
            return Err(EditError::EmptyDocument);
        }

        let mut seen = HashSet::with_capacity(blocks.len());
        for block in &blocks {
            if !seen.insert(block.id()) {
                return Err(EditError::DuplicateBlock(block.id()));
            }
        }

        Ok(Self::from_shared(blocks))
    }

    /// Build a document from already segmented (id, text) pairs
    pub fn from_pairs<I, S>(pairs: I) -> EditResult<Self>
    where
        I: IntoIterator<Item = (BlockId, S)>,
        S: Into<String>,
    {
        Self::from_blocks(pairs.into_iter().map(|(id, text)| TextBlock::new(id, text)))
    }

    /// Caller guarantees the invariants (non-empty, unique ids)
    pub(crate) fn from_shared(blocks: Vec<Arc<TextBlock>>) -> Self {
        debug_assert!(!blocks.is_empty());
        Document {
            blocks: blocks.into(),
        }
    }

    pub fn blocks(&self) -> &[Arc<TextBlock>] {
        &self.blocks
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn block(&self, index: usize) -> Option<&TextBlock> {
        self.blocks.get(index).map(|b| b.as_ref())
    }

    /// Find block by ID
    pub fn find_block(&self, id: BlockId) -> Option<&TextBlock> {
        self.blocks.iter().find(|b| b.id() == id).map(|b| b.as_ref())
    }

    /// Find block index by ID
    pub fn find_block_index(&self, id: BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| b.id() == id)
    }

    /// True if `other` is this very version (not merely equal content)
    pub fn same_version(&self, other: &Document) -> bool {
        Arc::ptr_eq(&self.blocks, &other.blocks)
    }

    /// Whether any block carries a span of `tag`
    pub fn has_tag(&self, tag: &StyleTag) -> bool {
        self.blocks.iter().any(|b| b.has_tag(tag))
    }

    /// Plain text with blocks separated by newlines
    pub fn to_plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.text())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// New document with the blocks in `range` swapped for `replacement`
    pub(crate) fn splice(
        &self,
        range: Range<usize>,
        replacement: impl IntoIterator<Item = Arc<TextBlock>>,
    ) -> Document {
        let mut blocks: Vec<Arc<TextBlock>> = Vec::with_capacity(self.blocks.len());
        blocks.extend(self.blocks[..range.start].iter().cloned());
        blocks.extend(replacement);
        blocks.extend(self.blocks[range.end..].iter().cloned());
        Self::from_shared(blocks)
    }

    /// New document with every block passed through `f`; `None` keeps the block as is.
    /// Returns this same version when `f` changed nothing.
    pub(crate) fn map_blocks(&self, mut f: impl FnMut(&TextBlock) -> Option<TextBlock>) -> Document {
        let mut changed = false;
        let blocks: Vec<Arc<TextBlock>> = self
            .blocks
            .iter()
            .map(|block| match f(block) {
                Some(new_block) => {
                    changed = true;
                    Arc::new(new_block)
                }
                None => Arc::clone(block),
            })
            .collect();

        if changed {
            Self::from_shared(blocks)
        } else {
            self.clone()
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Document ({} blocks):", self.blocks.len())?;
        for (i, block) in self.blocks.iter().enumerate() {
            writeln!(f, "  [{}] #{}: {:?}", i, block.id(), block.text())?;
            for span in block.spans() {
                writeln!(f, "      {} {}..{}", span.tag, span.start, span.end)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_len_counts_chars() {
        let block = TextBlock::new(1, "héllo");
        assert_eq!(block.len(), 5);
        assert_eq!(block.slice(1, 3), "él");
        assert_eq!(block.slice(3, 99), "lo");
    }

    #[test]
    fn test_with_span_merges_touching() {
        let block = TextBlock::new(1, "hello world")
            .with_span(StyleTag::bold(), 0, 5)
            .with_span(StyleTag::bold(), 5, 8)
            .with_span(StyleTag::italic(), 2, 4);

        assert_eq!(
            block.spans(),
            &[
                Span::new(StyleTag::bold(), 0, 8),
                Span::new(StyleTag::italic(), 2, 4),
            ]
        );
    }

    #[test]
    fn test_with_span_clamps_and_drops_empty() {
        let block = TextBlock::new(1, "abc")
            .with_span(StyleTag::bold(), 1, 50)
            .with_span(StyleTag::italic(), 2, 2);
        assert_eq!(block.spans(), &[Span::new(StyleTag::bold(), 1, 3)]);
    }

    #[test]
    fn test_document_rejects_empty_and_duplicates() {
        assert_eq!(
            Document::from_blocks(Vec::new()),
            Err(EditError::EmptyDocument)
        );
        let dup = Document::from_pairs([(BlockId(1), "a"), (BlockId(1), "b")]);
        assert_eq!(dup, Err(EditError::DuplicateBlock(BlockId(1))));
    }

    #[test]
    fn test_default_document_has_one_empty_block() {
        let doc = Document::default();
        assert_eq!(doc.block_count(), 1);
        assert!(doc.block(0).unwrap().is_empty());
    }

    #[test]
    fn test_find_block() {
        let doc = Document::from_pairs([(BlockId(7), "seven"), (BlockId(9), "nine")]).unwrap();
        assert_eq!(doc.find_block_index(BlockId(9)), Some(1));
        assert_eq!(doc.find_block(BlockId(7)).unwrap().text(), "seven");
        assert!(doc.find_block(BlockId(8)).is_none());
    }

    #[test]
    fn test_clone_is_same_version() {
        let doc = Document::from_pairs([(BlockId(1), "a")]).unwrap();
        let copy = doc.clone();
        assert!(doc.same_version(&copy));

        let rebuilt = Document::from_pairs([(BlockId(1), "a")]).unwrap();
        assert_eq!(doc, rebuilt);
        assert!(!doc.same_version(&rebuilt));
    }

    #[test]
    fn test_plain_text_joins_with_newline() {
        let doc = Document::from_pairs([(BlockId(1), "one"), (BlockId(2), ""), (BlockId(3), "three")])
            .unwrap();
        assert_eq!(doc.to_plain_text(), "one\n\nthree");
    }

    #[test]
    fn test_map_blocks_without_changes_keeps_version() {
        let doc = Document::from_pairs([(BlockId(1), "a"), (BlockId(2), "b")]).unwrap();
        let mapped = doc.map_blocks(|_| None);
        assert!(doc.same_version(&mapped));
    }
}
