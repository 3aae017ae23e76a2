//! Error types for PDF export.

use thiserror::Error;

/// Errors that can occur while exporting a document.
#[derive(Debug, Error)]
pub enum PdfError {
    /// Nothing to render.
    #[error("Document content is required")]
    EmptyDocument,
    /// The PDF backend failed.
    #[error("PDF generation error: {0}")]
    Render(String),
}

/// Convenience result alias for PDF export.
pub type PdfResult<T> = Result<T, PdfError>;
