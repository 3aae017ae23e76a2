//! Markdown to styled block conversion.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

/// Font face of a text run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontStyle {
    /// Regular sans-serif.
    Regular,
    /// Bold sans-serif.
    Bold,
    /// Oblique sans-serif.
    Italic,
    /// Bold oblique sans-serif.
    BoldItalic,
    /// Monospace.
    Mono,
}

impl FontStyle {
    const fn from_flags(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (true, true) => Self::BoldItalic,
            (true, false) => Self::Bold,
            (false, true) => Self::Italic,
            (false, false) => Self::Regular,
        }
    }
}

/// Inline content of a block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inline {
    /// Styled text.
    Text {
        /// Raw text, may contain spaces.
        text: String,
        /// Face to draw with.
        style: FontStyle,
    },
    /// Forced line break.
    Break,
    /// Image reference, drawn from its source or shown as `[alt]`.
    Image {
        /// Link target as written in the markdown.
        src: String,
        /// Alt text.
        alt: String,
    },
}

impl Inline {
    /// Placeholder text shown for an image that cannot be drawn.
    #[must_use]
    pub fn image_label(alt: &str) -> String {
        let alt = alt.trim();
        format!("[{}]", if alt.is_empty() { "image" } else { alt })
    }
}

/// Kind of block, which decides size, indent and spacing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockKind {
    /// Heading, level 1 to 6.
    Heading(u8),
    /// Body paragraph.
    Paragraph,
    /// List item with its marker (`-` or `3.`) and nesting depth (1-based).
    ListItem {
        /// Marker drawn in the gutter.
        marker: String,
        /// Nesting depth.
        depth: usize,
    },
    /// Preformatted code; lines are kept as-is.
    Code,
    /// One table row; cells are joined with separators.
    TableRow {
        /// Header rows are drawn bold.
        header: bool,
    },
    /// Horizontal rule.
    Rule,
}

/// A laid-out unit of the document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    /// Block kind.
    pub kind: BlockKind,
    /// Inline content.
    pub inlines: Vec<Inline>,
    /// Number of enclosing block quotes.
    pub quote_depth: usize,
}

impl Block {
    fn is_empty(&self) -> bool {
        self.inlines.iter().all(|i| match i {
            Inline::Text { text, .. } => text.trim().is_empty(),
            Inline::Break => true,
            Inline::Image { .. } => false,
        })
    }
}

/// Parse markdown into blocks.
#[must_use]
pub fn parse_blocks(markdown: &str) -> Vec<Block> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut builder = BlockBuilder::default();
    for event in Parser::new_ext(markdown, options) {
        builder.handle_event(event);
    }
    builder.finish()
}

#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<Block>,
    current: Option<Block>,
    bold: usize,
    italic: usize,
    quote_depth: usize,
    /// Next number for ordered lists, `None` for bullets.
    list_stack: Vec<Option<u64>>,
    in_code_block: bool,
    /// Source and alt text of the image being read.
    image: Option<(String, String)>,
}

impl BlockBuilder {
    fn handle_event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.push_text(&text),
            Event::Code(code) => self.push_styled(&code, FontStyle::Mono),
            Event::SoftBreak => self.push_text(" "),
            Event::HardBreak => self.current_block().inlines.push(Inline::Break),
            Event::Rule => {
                self.flush();
                self.blocks.push(Block {
                    kind: BlockKind::Rule,
                    inlines: Vec::new(),
                    quote_depth: self.quote_depth,
                });
            }
            Event::TaskListMarker(done) => self.push_text(if done { "[x] " } else { "[ ] " }),
            _ => {}
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => self.begin(BlockKind::Heading(level as u8)),
            Tag::Paragraph => {
                // Loose list items wrap their text in a paragraph; keep the marker block.
                let fresh_item = matches!(
                    &self.current,
                    Some(Block { kind: BlockKind::ListItem { .. }, inlines, .. }) if inlines.is_empty()
                );
                if !fresh_item {
                    self.begin(BlockKind::Paragraph);
                }
            }
            Tag::BlockQuote(_) => {
                self.flush();
                self.quote_depth += 1;
            }
            Tag::CodeBlock(_) => {
                self.begin(BlockKind::Code);
                self.in_code_block = true;
            }
            Tag::List(start) => {
                self.flush();
                self.list_stack.push(start);
            }
            Tag::Item => {
                let depth = self.list_stack.len().max(1);
                let marker = match self.list_stack.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{n}.");
                        *n += 1;
                        marker
                    }
                    _ => "-".to_string(),
                };
                self.begin(BlockKind::ListItem { marker, depth });
            }
            Tag::TableHead => self.begin(BlockKind::TableRow { header: true }),
            Tag::TableRow => self.begin(BlockKind::TableRow { header: false }),
            Tag::TableCell => {
                let block = self.current_block();
                if !block.inlines.is_empty() {
                    block.inlines.push(Inline::Text {
                        text: " | ".to_string(),
                        style: FontStyle::Regular,
                    });
                }
            }
            Tag::Emphasis => self.italic += 1,
            Tag::Strong => self.bold += 1,
            Tag::Image { dest_url, .. } => self.image = Some((dest_url.to_string(), String::new())),
            _ => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Heading(_)
            | TagEnd::Paragraph
            | TagEnd::Item
            | TagEnd::TableHead
            | TagEnd::TableRow => self.flush(),
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                let block = self.current_block();
                while matches!(block.inlines.last(), Some(Inline::Break)) {
                    block.inlines.pop();
                }
                self.flush();
            }
            TagEnd::BlockQuote(_) => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            TagEnd::List(_) => {
                self.flush();
                self.list_stack.pop();
            }
            TagEnd::Emphasis => self.italic = self.italic.saturating_sub(1),
            TagEnd::Strong => self.bold = self.bold.saturating_sub(1),
            TagEnd::Image => {
                if let Some((src, alt)) = self.image.take() {
                    self.current_block().inlines.push(Inline::Image {
                        src,
                        alt: alt.trim().to_string(),
                    });
                }
            }
            _ => {}
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some((_, alt)) = self.image.as_mut() {
            alt.push_str(text);
            return;
        }

        if self.in_code_block {
            let block = self.current_block();
            for (i, line) in text.split('\n').enumerate() {
                if i > 0 {
                    block.inlines.push(Inline::Break);
                }
                if !line.is_empty() {
                    block.inlines.push(Inline::Text {
                        text: line.to_string(),
                        style: FontStyle::Mono,
                    });
                }
            }
            return;
        }

        let style = FontStyle::from_flags(self.bold > 0, self.italic > 0);
        self.push_styled(text, style);
    }

    fn push_styled(&mut self, text: &str, style: FontStyle) {
        if let Some((_, alt)) = self.image.as_mut() {
            alt.push_str(text);
            return;
        }
        let style = match (&self.current, style) {
            (Some(Block { kind: BlockKind::TableRow { header: true }, .. }), FontStyle::Regular) => {
                FontStyle::Bold
            }
            _ => style,
        };
        self.current_block().inlines.push(Inline::Text {
            text: text.to_string(),
            style,
        });
    }

    fn current_block(&mut self) -> &mut Block {
        let quote_depth = self.quote_depth;
        self.current.get_or_insert_with(|| Block {
            kind: BlockKind::Paragraph,
            inlines: Vec::new(),
            quote_depth,
        })
    }

    fn begin(&mut self, kind: BlockKind) {
        self.flush();
        self.current = Some(Block {
            kind,
            inlines: Vec::new(),
            quote_depth: self.quote_depth,
        });
    }

    fn flush(&mut self) {
        if let Some(block) = self.current.take() {
            if block.kind == BlockKind::Code || !block.is_empty() {
                self.blocks.push(block);
            }
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        self.blocks
    }
}
