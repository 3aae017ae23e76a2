//! Page layout and PDF output with `printpdf`.

use std::borrow::Cow;

use image::DynamicImage;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Rgb,
};

use super::blocks::{Block, BlockKind, FontStyle, Inline};
use super::error::{PdfError, PdfResult};
use super::images::ImageSource;
use super::style::{PT_TO_MM, PdfStyle};
use super::text::{normalize, text_width};

/// Name of the single drawing layer on each page.
const LAYER_NAME: &str = "Layer 1";

/// One positioned word (or code fragment) waiting to be drawn.
#[derive(Clone, Debug)]
struct Word {
    text: String,
    style: FontStyle,
    space_before: bool,
}

/// A token of inline content after word splitting.
#[derive(Clone, Debug)]
enum Token {
    Word(Word),
    Break,
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
    bold_italic: IndirectFontRef,
    mono: IndirectFontRef,
}

impl Fonts {
    fn load(doc: &PdfDocumentReference) -> PdfResult<Self> {
        let add = |font| {
            doc.add_builtin_font(font)
                .map_err(|e| PdfError::Render(format!("{e:?}")))
        };
        Ok(Self {
            regular: add(BuiltinFont::Helvetica)?,
            bold: add(BuiltinFont::HelveticaBold)?,
            italic: add(BuiltinFont::HelveticaOblique)?,
            bold_italic: add(BuiltinFont::HelveticaBoldOblique)?,
            mono: add(BuiltinFont::Courier)?,
        })
    }

    const fn get(&self, style: FontStyle) -> &IndirectFontRef {
        match style {
            FontStyle::Regular => &self.regular,
            FontStyle::Bold => &self.bold,
            FontStyle::Italic => &self.italic,
            FontStyle::BoldItalic => &self.bold_italic,
            FontStyle::Mono => &self.mono,
        }
    }
}

/// Part of a block: wrapped text, or an image on its own row.
enum Segment {
    Text(Vec<Inline>),
    Image(DynamicImage),
}

/// Split a block around the images that resolve. Unresolved images stay
/// inline and render as alt text.
fn segments(inlines: &[Inline], images: &dyn ImageSource) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut run = Vec::new();
    for inline in inlines {
        if let Inline::Image { src, .. } = inline {
            if let Some(img) = images.load(src) {
                if !run.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut run)));
                }
                segments.push(Segment::Image(img));
                continue;
            }
        }
        run.push(inline.clone());
    }
    if !run.is_empty() {
        segments.push(Segment::Text(run));
    }
    segments
}

/// Block-level metrics resolved from the style sheet.
struct BlockMetrics {
    size: f32,
    indent: f32,
    space_before: f32,
    space_after: f32,
    grey: f32,
    force_bold: bool,
    wrap_words: bool,
}

/// Draws blocks top to bottom, adding pages as needed.
pub struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    fonts: Fonts,
    style: PdfStyle,
    /// Current baseline position, in mm from the bottom edge.
    y: f32,
    pages: usize,
    images: usize,
}

impl PageWriter {
    /// Start a document with one empty page.
    ///
    /// # Errors
    /// Returns an error if the built-in fonts cannot be registered.
    pub fn new(title: &str, style: PdfStyle) -> PdfResult<Self> {
        let (doc, page, layer) = PdfDocument::new(
            title,
            Mm(style.page_width),
            Mm(style.page_height),
            LAYER_NAME,
        );
        let layer = doc.get_page(page).get_layer(layer);
        let fonts = Fonts::load(&doc)?;
        let y = style.page_height - style.margin;
        Ok(Self {
            doc,
            layer,
            fonts,
            style,
            y,
            pages: 1,
            images: 0,
        })
    }

    /// Number of pages written so far.
    #[must_use]
    pub const fn pages(&self) -> usize {
        self.pages
    }

    /// Lay out and draw one block, embedding the images `images` resolves.
    pub fn write_block(&mut self, block: &Block, images: &dyn ImageSource) {
        if block.kind == BlockKind::Rule {
            self.write_rule();
            return;
        }

        let metrics = self.metrics(block);
        self.advance(metrics.space_before);

        let mut marker = match &block.kind {
            BlockKind::ListItem { marker, .. } => Some(marker.clone()),
            _ => None,
        };

        for segment in segments(&block.inlines, images) {
            match segment {
                Segment::Text(inlines) => {
                    let tokens = tokenize(&inlines, metrics.wrap_words, metrics.force_bold);
                    self.write_lines(tokens, &metrics, &mut marker);
                }
                Segment::Image(img) => self.write_image(&img, &metrics),
            }
        }

        self.advance(metrics.space_after);
    }

    /// Number of images embedded so far.
    #[must_use]
    pub const fn images(&self) -> usize {
        self.images
    }

    fn write_lines(
        &mut self,
        tokens: Vec<Token>,
        metrics: &BlockMetrics,
        marker: &mut Option<String>,
    ) {
        let width = self.style.content_width() - metrics.indent;
        for line in break_lines(tokens, width, metrics.size) {
            self.new_line(metrics.size);
            self.set_grey(metrics.grey);
            let x0 = self.style.margin + metrics.indent;

            if let Some(marker) = marker.take() {
                let marker_width = text_width(&marker, FontStyle::Regular, metrics.size);
                let gap = 0.5 * self.style.em();
                self.layer.use_text(
                    marker,
                    metrics.size,
                    Mm(x0 - marker_width - gap),
                    Mm(self.y),
                    self.fonts.get(FontStyle::Regular),
                );
            }

            let mut x = x0;
            for (i, word) in line.iter().enumerate() {
                if i > 0 && word.space_before {
                    x += text_width(" ", word.style, metrics.size);
                }
                self.layer.use_text(
                    word.text.clone(),
                    metrics.size,
                    Mm(x),
                    Mm(self.y),
                    self.fonts.get(word.style),
                );
                x += text_width(&word.text, word.style, metrics.size);
            }
        }
    }

    /// Draw an image on its own row, scaled down to fit the column and the
    /// height cap.
    fn write_image(&mut self, img: &DynamicImage, metrics: &BlockMetrics) {
        if img.width() == 0 || img.height() == 0 {
            return;
        }
        let dpi = self.style.image_dpi;
        let natural_width = img.width() as f32 * 25.4 / dpi;
        let natural_height = img.height() as f32 * 25.4 / dpi;
        let max_width = self.style.content_width() - metrics.indent;
        let scale = (max_width / natural_width)
            .min(self.style.image_max_height / natural_height)
            .min(1.0);
        let height = natural_height * scale;
        let gap = 0.25 * self.style.em();

        if self.y - height - gap < self.style.margin {
            self.add_page();
        }
        self.y -= height + gap;

        Image::from_dynamic_image(img).add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(self.style.margin + metrics.indent)),
                translate_y: Some(Mm(self.y)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(dpi),
                ..Default::default()
            },
        );
        self.images += 1;
    }

    /// Serialize the document.
    ///
    /// # Errors
    /// Returns an error if the backend fails to write the file.
    pub fn finish(self) -> PdfResult<Vec<u8>> {
        self.doc
            .save_to_bytes()
            .map_err(|e| PdfError::Render(format!("{e:?}")))
    }

    fn metrics(&self, block: &Block) -> BlockMetrics {
        let em = self.style.em();
        let quote_indent = block.quote_depth as f32 * self.style.quote_indent * em;
        let grey = if block.quote_depth > 0 {
            self.style.quote_grey
        } else {
            self.style.text_grey
        };
        let base = BlockMetrics {
            size: self.style.base_size,
            indent: quote_indent,
            space_before: 0.0,
            space_after: em,
            grey,
            force_bold: false,
            wrap_words: true,
        };

        match &block.kind {
            BlockKind::Heading(level) => {
                let size = self.style.heading_size(*level);
                BlockMetrics {
                    size,
                    space_before: size * PT_TO_MM,
                    space_after: 0.5 * size * PT_TO_MM,
                    force_bold: true,
                    ..base
                }
            }
            BlockKind::ListItem { depth, .. } => BlockMetrics {
                indent: quote_indent + *depth as f32 * self.style.list_indent * em,
                space_after: 0.5 * em,
                ..base
            },
            BlockKind::Code => BlockMetrics {
                size: self.style.base_size * self.style.code_scale,
                indent: quote_indent + 0.5 * em,
                wrap_words: false,
                ..base
            },
            BlockKind::TableRow { .. } => BlockMetrics {
                space_after: 0.25 * em,
                ..base
            },
            BlockKind::Paragraph | BlockKind::Rule => base,
        }
    }

    fn write_rule(&mut self) {
        let size = self.style.base_size;
        self.advance(0.5 * self.style.em());
        self.new_line(size);
        self.set_grey(0.6);
        let dash_width = text_width("-", FontStyle::Regular, size);
        let count = (self.style.content_width() / dash_width).floor().max(1.0) as usize;
        self.layer.use_text(
            "-".repeat(count),
            size,
            Mm(self.style.margin),
            Mm(self.y),
            self.fonts.get(FontStyle::Regular),
        );
        self.advance(0.5 * self.style.em());
    }

    fn set_grey(&self, level: f32) {
        self.layer
            .set_fill_color(Color::Rgb(Rgb::new(level, level, level, None)));
    }

    /// Move the baseline down by one line, breaking the page when needed.
    fn new_line(&mut self, size: f32) {
        let line = size * self.style.line_height * PT_TO_MM;
        if self.y - line < self.style.margin {
            self.add_page();
        }
        self.y -= line;
    }

    /// Add vertical space; never carried over to a fresh page.
    fn advance(&mut self, space: f32) {
        self.y = (self.y - space).max(self.style.margin);
    }

    fn add_page(&mut self) {
        let (page, layer) = self.doc.add_page(
            Mm(self.style.page_width),
            Mm(self.style.page_height),
            LAYER_NAME,
        );
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = self.style.page_height - self.style.margin;
        self.pages += 1;
    }
}

/// Split inline content into drawable tokens.
///
/// Prose is split on whitespace. Code keeps each line whole so indentation survives.
fn tokenize(inlines: &[Inline], wrap_words: bool, force_bold: bool) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pending_space = false;

    for inline in inlines {
        let (text, style) = match inline {
            Inline::Break => {
                tokens.push(Token::Break);
                pending_space = false;
                continue;
            }
            Inline::Text { text, style } => (Cow::Borrowed(text.as_str()), *style),
            Inline::Image { alt, .. } => {
                (Cow::Owned(Inline::image_label(alt)), FontStyle::Italic)
            }
        };

        let style = match style {
            FontStyle::Regular if force_bold => FontStyle::Bold,
            FontStyle::Italic if force_bold => FontStyle::BoldItalic,
            other => other,
        };
        let text = normalize(&text);

        if !wrap_words {
            tokens.push(Token::Word(Word {
                text,
                style,
                space_before: false,
            }));
            continue;
        }

        if text.starts_with(char::is_whitespace) {
            pending_space = true;
        }
        let mut first = true;
        for word in text.split_whitespace() {
            tokens.push(Token::Word(Word {
                text: word.to_string(),
                style,
                space_before: pending_space || !first,
            }));
            first = false;
            pending_space = false;
        }
        if text.ends_with(char::is_whitespace) {
            pending_space = true;
        }
    }

    tokens
}

/// Greedy line breaking. Words wider than the line are split by characters.
fn break_lines(tokens: Vec<Token>, width: f32, size: f32) -> Vec<Vec<Word>> {
    let mut lines: Vec<Vec<Word>> = Vec::new();
    let mut line: Vec<Word> = Vec::new();
    let mut x = 0.0_f32;

    for token in tokens {
        let word = match token {
            Token::Break => {
                lines.push(std::mem::take(&mut line));
                x = 0.0;
                continue;
            }
            Token::Word(word) => word,
        };

        for piece in split_to_width(word, width, size) {
            let space = if line.is_empty() || !piece.space_before {
                0.0
            } else {
                text_width(" ", piece.style, size)
            };
            let piece_width = text_width(&piece.text, piece.style, size);

            if !line.is_empty() && x + space + piece_width > width {
                lines.push(std::mem::take(&mut line));
                x = piece_width;
            } else {
                x += space + piece_width;
            }
            line.push(piece);
        }
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Split a word that cannot fit on one line into line-sized pieces.
fn split_to_width(word: Word, width: f32, size: f32) -> Vec<Word> {
    if text_width(&word.text, word.style, size) <= width {
        return vec![word];
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    for c in word.text.chars() {
        current.push(c);
        if text_width(&current, word.style, size) > width && current.chars().count() > 1 {
            current.pop();
            pieces.push(std::mem::take(&mut current));
            current.push(c);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }

    pieces
        .into_iter()
        .enumerate()
        .map(|(i, text)| Word {
            text,
            style: word.style,
            space_before: i == 0 && word.space_before,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::images::NoImages;
    use image::{Rgb, RgbImage};

    /// Resolves every link to the same picture.
    struct OneImage(DynamicImage);

    impl ImageSource for OneImage {
        fn load(&self, _src: &str) -> Option<DynamicImage> {
            Some(self.0.clone())
        }
    }

    fn words(text: &str) -> Vec<Token> {
        tokenize(
            &[Inline::Text {
                text: text.to_string(),
                style: FontStyle::Regular,
            }],
            true,
            false,
        )
    }

    #[test]
    fn test_tokenize_tracks_spaces_across_runs() {
        let tokens = tokenize(
            &[
                Inline::Text {
                    text: "Rent is ".to_string(),
                    style: FontStyle::Regular,
                },
                Inline::Text {
                    text: "$900".to_string(),
                    style: FontStyle::Bold,
                },
                Inline::Text {
                    text: ", monthly".to_string(),
                    style: FontStyle::Regular,
                },
            ],
            true,
            false,
        );
        let spaced: Vec<(String, bool)> = tokens
            .into_iter()
            .filter_map(|t| match t {
                Token::Word(w) => Some((w.text, w.space_before)),
                Token::Break => None,
            })
            .collect();
        assert_eq!(
            spaced,
            vec![
                ("Rent".to_string(), false),
                ("is".to_string(), true),
                ("$900".to_string(), true),
                (",".to_string(), false),
                ("monthly".to_string(), true),
            ]
        );
    }

    #[test]
    fn test_force_bold_for_headings() {
        let tokens = tokenize(
            &[Inline::Text {
                text: "Title".to_string(),
                style: FontStyle::Regular,
            }],
            true,
            true,
        );
        assert!(matches!(&tokens[0], Token::Word(w) if w.style == FontStyle::Bold));
    }

    #[test]
    fn test_break_lines_wraps_at_width() {
        let text = "the quick brown fox jumps over the lazy dog ".repeat(10);
        let lines = break_lines(words(&text), 60.0, 11.0);
        assert!(lines.len() > 1);
        for line in &lines {
            let w: f32 = line
                .iter()
                .enumerate()
                .map(|(i, word)| {
                    let space = if i > 0 && word.space_before {
                        text_width(" ", word.style, 11.0)
                    } else {
                        0.0
                    };
                    space + text_width(&word.text, word.style, 11.0)
                })
                .sum();
            assert!(w <= 60.0 + 1e-3);
        }
    }

    #[test]
    fn test_long_word_is_split() {
        let long = "x".repeat(400);
        let lines = break_lines(words(&long), 50.0, 11.0);
        assert!(lines.len() > 1);
        let joined: String = lines.iter().flatten().map(|w| w.text.as_str()).collect();
        assert_eq!(joined, long);
    }

    #[test]
    fn test_breaks_force_new_lines() {
        let tokens = tokenize(
            &[
                Inline::Text {
                    text: "a".to_string(),
                    style: FontStyle::Mono,
                },
                Inline::Break,
                Inline::Break,
                Inline::Text {
                    text: "  b".to_string(),
                    style: FontStyle::Mono,
                },
            ],
            false,
            false,
        );
        let lines = break_lines(tokens, 100.0, 10.0);
        assert_eq!(lines.len(), 3);
        assert!(lines[1].is_empty());
        assert_eq!(lines[2][0].text, "  b");
    }

    #[test]
    fn test_long_document_adds_pages() {
        let mut writer = PageWriter::new("test", PdfStyle::default()).unwrap();
        let block = Block {
            kind: BlockKind::Paragraph,
            inlines: vec![Inline::Text {
                text: "Lorem ipsum dolor sit amet. ".repeat(40),
                style: FontStyle::Regular,
            }],
            quote_depth: 0,
        };
        for _ in 0..20 {
            writer.write_block(&block, &NoImages);
        }
        assert!(writer.pages() > 1);
        let bytes = writer.finish().unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    fn signature_block() -> Block {
        Block {
            kind: BlockKind::Paragraph,
            inlines: vec![
                Inline::Text {
                    text: "Landlord:".to_string(),
                    style: FontStyle::Regular,
                },
                Inline::Image {
                    src: "/media/signatures/a.png".to_string(),
                    alt: "signature".to_string(),
                },
            ],
            quote_depth: 0,
        }
    }

    #[test]
    fn test_resolved_image_is_embedded() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 100, Rgb([0, 0, 0])));
        let mut writer = PageWriter::new("signed", PdfStyle::default()).unwrap();
        writer.write_block(&signature_block(), &OneImage(img));
        assert_eq!(writer.images(), 1);
        let with_image = writer.finish().unwrap();

        let mut writer = PageWriter::new("signed", PdfStyle::default()).unwrap();
        writer.write_block(&signature_block(), &NoImages);
        assert_eq!(writer.images(), 0);
        let alt_only = writer.finish().unwrap();

        assert!(with_image.len() > alt_only.len());
    }

    #[test]
    fn test_tall_images_wrap_to_new_page() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(600, 600, Rgb([0, 0, 0])));
        let source = OneImage(img);
        let mut writer = PageWriter::new("signed", PdfStyle::default()).unwrap();
        for _ in 0..10 {
            writer.write_block(&signature_block(), &source);
        }
        assert_eq!(writer.images(), 10);
        assert!(writer.pages() > 1);
    }

    #[test]
    fn test_unresolved_image_renders_alt_text() {
        let tokens = tokenize(&signature_block().inlines, true, false);
        let words: Vec<(String, FontStyle)> = tokens
            .into_iter()
            .filter_map(|t| match t {
                Token::Word(w) => Some((w.text, w.style)),
                Token::Break => None,
            })
            .collect();
        assert_eq!(
            words,
            vec![
                ("Landlord:".to_string(), FontStyle::Regular),
                ("[signature]".to_string(), FontStyle::Italic),
            ]
        );
    }
}
