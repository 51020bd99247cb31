// Ingestion and export
// Builds documents from externally supplied text and turns them back into
// text for persistence. The engine itself never parses raw documents.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use std::sync::Arc;

use crate::richtext::structured_document::{BlockId, Document, Span, StyleTag, TextBlock};

/// One block per line, ids numbered from 1.
/// An empty input gives one empty block.
pub fn from_plain_text(text: &str) -> Document {
    let blocks = text
        .split('\n')
        .enumerate()
        .map(|(i, line)| {
            let line = line.strip_suffix('\r').unwrap_or(line);
            Arc::new(TextBlock::new(i as u64 + 1, line))
        })
        .collect();
    Document::from_shared(blocks)
}

/// The persisted form: blocks joined by newlines
pub fn to_plain_text(doc: &Document) -> String {
    doc.to_plain_text()
}

/// Block being assembled while walking markdown events
struct PendingBlock {
    text: String,
    len: usize,
    spans: Vec<Span>,
}

impl PendingBlock {
    fn new() -> Self {
        PendingBlock {
            text: String::new(),
            len: 0,
            spans: Vec::new(),
        }
    }

    fn push_str(&mut self, s: &str) {
        self.text.push_str(s);
        self.len += s.chars().count();
    }
}

struct MarkdownBuilder {
    blocks: Vec<TextBlock>,
    current: Option<PendingBlock>,
    depth: usize,
    in_code: bool,
    style_stack: Vec<(StyleTag, usize)>,
}

impl MarkdownBuilder {
    fn new() -> Self {
        MarkdownBuilder {
            blocks: Vec::new(),
            current: None,
            depth: 0,
            in_code: false,
            style_stack: Vec::new(),
        }
    }

    fn next_id(&self) -> BlockId {
        BlockId(self.blocks.len() as u64 + 1)
    }

    fn open(&mut self) {
        self.depth += 1;
        if self.current.is_none() {
            self.current = Some(PendingBlock::new());
        }
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.flush();
        }
    }

    /// End a code block: its lines become blocks even inside a list item
    fn close_code(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.flush();
        self.in_code = false;
    }

    fn flush(&mut self) {
        let Some(pending) = self.current.take() else {
            return;
        };
        if self.in_code {
            // One block per code line
            for line in pending.text.trim_end_matches('\n').split('\n') {
                let block = TextBlock::new(self.next_id(), line);
                self.blocks.push(block);
            }
            return;
        }
        let block = TextBlock::new(self.next_id(), pending.text).with_spans(pending.spans);
        self.blocks.push(block);
    }

    fn push_text(&mut self, text: &str) {
        if self.current.is_none() {
            // Loose inline content outside any block (e.g. in a table cell)
            self.current = Some(PendingBlock::new());
        }
        if let Some(pending) = self.current.as_mut() {
            pending.push_str(text);
        }
    }

    fn current_len(&self) -> usize {
        self.current.as_ref().map_or(0, |p| p.len)
    }

    fn start_style(&mut self, tag: StyleTag) {
        let at = self.current_len();
        self.style_stack.push((tag, at));
    }

    fn end_style(&mut self) {
        let end = self.current_len();
        if let Some((tag, start)) = self.style_stack.pop()
            && let Some(pending) = self.current.as_mut()
        {
            pending.spans.push(Span::new(tag, start, end));
        }
    }

    fn finish(mut self) -> Document {
        self.depth = 0;
        self.flush();
        if self.blocks.is_empty() {
            return Document::new();
        }
        Document::from_shared(self.blocks.into_iter().map(Arc::new).collect())
    }
}

/// One block per paragraph, heading, list item and code line.
/// `**strong**` becomes a BOLD span and `*emphasis*` an ITALIC span.
pub fn from_markdown(markdown: &str) -> Document {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(markdown, options);

    let mut builder = MarkdownBuilder::new();
    for event in parser {
        match event {
            Event::Start(Tag::Item) => {
                // A nested list item starts a new block after its parent's text
                if builder.current_len() > 0 {
                    builder.flush();
                }
                builder.open();
            }
            Event::Start(Tag::Paragraph | Tag::Heading { .. }) => builder.open(),
            Event::Start(Tag::CodeBlock(_)) => {
                // Text of an enclosing list item stays its own block
                if builder.current_len() > 0 {
                    builder.flush();
                }
                builder.in_code = true;
                builder.open();
            }
            Event::End(TagEnd::CodeBlock) => builder.close_code(),
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item) => builder.close(),
            Event::Start(Tag::Strong) => builder.start_style(StyleTag::bold()),
            Event::Start(Tag::Emphasis) => builder.start_style(StyleTag::italic()),
            Event::End(TagEnd::Strong | TagEnd::Emphasis) => builder.end_style(),
            Event::Text(text) | Event::Code(text) => builder.push_text(&text),
            Event::SoftBreak | Event::HardBreak => builder.push_text(" "),
            _ => {}
        }
    }

    let doc = builder.finish();
    tracing::debug!(blocks = doc.block_count(), "ingested markdown");
    doc
}

/// Markdown for the document, with BOLD and ITALIC spans as `**` and `*`.
/// Other tags are not representable and are dropped.
pub fn to_markdown(doc: &Document) -> String {
    doc.blocks()
        .iter()
        .map(|block| block_to_markdown(block))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn block_to_markdown(block: &TextBlock) -> String {
    // (offset, is_open, marker); closes sort before opens at the same offset
    let mut markers: Vec<(usize, bool, &str)> = Vec::new();
    for span in block.spans() {
        let marker = match span.tag.as_str() {
            StyleTag::BOLD => "**",
            StyleTag::ITALIC => "*",
            _ => continue,
        };
        markers.push((span.start, true, marker));
        markers.push((span.end, false, marker));
    }
    markers.sort_by_key(|&(offset, is_open, _)| (offset, is_open));

    let mut out = String::with_capacity(block.text().len() + markers.len() * 2);
    let mut pos = 0;
    for (offset, _, marker) in markers {
        push_escaped(&mut out, block.slice(pos, offset));
        out.push_str(marker);
        pos = offset;
    }
    push_escaped(&mut out, block.slice(pos, block.len()));
    out
}

/// Backslash-escape inline markdown metacharacters
fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '_' | '`' | '[' | ']' | '<') {
            out.push('\\');
        }
        out.push(c);
    }
}
