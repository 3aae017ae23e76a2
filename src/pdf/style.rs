//! Fixed style sheet for exported documents.
//!
//! Values follow the web stylesheet the documents are previewed with:
//! sans-serif body on A4 with 2 cm margins, line height 1.6, headings at
//! 2em / 1.5em / 1.2em, grey block quotes and monospace code.

/// Millimetres per PostScript point.
pub const PT_TO_MM: f32 = 25.4 / 72.0;

/// Page and typography settings.
#[derive(Clone, Debug)]
pub struct PdfStyle {
    /// Page width (mm).
    pub page_width: f32,
    /// Page height (mm).
    pub page_height: f32,
    /// Margin on every side (mm).
    pub margin: f32,
    /// Body font size (pt).
    pub base_size: f32,
    /// Line height as a multiple of the font size.
    pub line_height: f32,
    /// Heading sizes in em, h1 to h6.
    pub heading_scale: [f32; 6],
    /// Code font size in em.
    pub code_scale: f32,
    /// Left padding of list items per nesting level, in em.
    pub list_indent: f32,
    /// Left padding of block quotes per nesting level, in em.
    pub quote_indent: f32,
    /// Body text grey level (0 = black).
    pub text_grey: f32,
    /// Block quote grey level.
    pub quote_grey: f32,
    /// Resolution images are placed at when not scaled down.
    pub image_dpi: f32,
    /// Tallest an embedded image may be drawn (mm).
    pub image_max_height: f32,
}

impl Default for PdfStyle {
    fn default() -> Self {
        Self {
            page_width: 210.0,
            page_height: 297.0,
            margin: 20.0,
            base_size: 11.0,
            line_height: 1.6,
            heading_scale: [2.0, 1.5, 1.2, 1.1, 1.0, 0.9],
            code_scale: 0.9,
            list_indent: 2.0,
            quote_indent: 1.5,
            text_grey: 0.2,  // #333
            quote_grey: 0.4, // #666
            image_dpi: 150.0,
            image_max_height: 40.0,
        }
    }
}

impl PdfStyle {
    /// One em of body text, in millimetres.
    #[must_use]
    pub fn em(&self) -> f32 {
        self.base_size * PT_TO_MM
    }

    /// Usable width between the margins (mm).
    #[must_use]
    pub fn content_width(&self) -> f32 {
        self.page_width - 2.0 * self.margin
    }

    /// Font size (pt) of a heading level (1-based, clamped to 1..=6).
    #[must_use]
    pub fn heading_size(&self, level: u8) -> f32 {
        let idx = usize::from(level.clamp(1, 6)) - 1;
        self.base_size * self.heading_scale[idx]
    }
}
