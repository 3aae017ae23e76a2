//! Markdown document export to PDF.
//!
//! Markdown is parsed into styled blocks ([`blocks`]) and laid out on A4
//! pages with the built-in Helvetica and Courier faces ([`render`]).
//! Uploaded images are embedded through an [`ImageSource`].

pub mod blocks;
pub mod error;
pub mod images;
pub mod render;
pub mod style;
pub mod text;

pub use error::{PdfError, PdfResult};
pub use images::{ImageSource, MediaImages, NoImages};
pub use style::PdfStyle;

use render::PageWriter;

/// Download name for documents exported without a conversation.
pub const DEFAULT_FILENAME: &str = "legal_document.pdf";

/// Render markdown to PDF bytes with the default style. Images show as
/// their alt text.
///
/// # Errors
/// Returns [`PdfError::EmptyDocument`] for blank input, or
/// [`PdfError::Render`] if the backend fails.
pub fn render_pdf(markdown: &str, title: &str) -> PdfResult<Vec<u8>> {
    render_pdf_with_style(markdown, title, PdfStyle::default(), &NoImages)
}

/// Render markdown to PDF bytes, embedding the images `images` resolves.
///
/// # Errors
/// See [`render_pdf`].
pub fn render_pdf_with_images(
    markdown: &str,
    title: &str,
    images: &dyn ImageSource,
) -> PdfResult<Vec<u8>> {
    render_pdf_with_style(markdown, title, PdfStyle::default(), images)
}

/// Render markdown to PDF bytes with a custom style.
///
/// # Errors
/// See [`render_pdf`].
pub fn render_pdf_with_style(
    markdown: &str,
    title: &str,
    style: PdfStyle,
    images: &dyn ImageSource,
) -> PdfResult<Vec<u8>> {
    if markdown.trim().is_empty() {
        return Err(PdfError::EmptyDocument);
    }

    let blocks = blocks::parse_blocks(markdown);
    let mut writer = PageWriter::new(title, style)?;
    for block in &blocks {
        writer.write_block(block, images);
    }

    tracing::debug!(
        blocks = blocks.len(),
        pages = writer.pages(),
        images = writer.images(),
        "rendered document"
    );
    writer.finish()
}

/// Download filename for a conversation version: `<slug>_v<n>.pdf`.
#[must_use]
pub fn version_filename(title: &str, version: u32) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in text::normalize(title).chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug = slug.trim_end_matches('_');
    let slug = if slug.is_empty() { "document" } else { slug };
    format!("{slug}_v{version}.pdf")
}
