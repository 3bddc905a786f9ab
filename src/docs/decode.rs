use tracing::{debug, warn};

use super::types::SourceRef;
use crate::error::{RagError, Result};

/// Width used when rendering HTML to text.
const HTML_WRAP_WIDTH: usize = 120;

/// Page separator for plain-text sources.
const FORM_FEED: char = '\x0c';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Html,
    Text,
}

impl DocumentKind {
    /// Pick a decoder from the response content type, falling back to the URL extension.
    /// Unknown sources are treated as PDF, the corpus format.
    pub fn detect(content_type: Option<&str>, source: &SourceRef) -> Self {
        if let Some(ct) = content_type.map(|c| c.to_lowercase()) {
            if ct.contains("pdf") {
                return Self::Pdf;
            }
            if ct.contains("html") {
                return Self::Html;
            }
            if ct.starts_with("text/") {
                return Self::Text;
            }
        }
        match source.extension().as_deref() {
            Some("html" | "htm") => Self::Html,
            Some("txt" | "text" | "md") => Self::Text,
            _ => Self::Pdf,
        }
    }
}

/// Decode raw bytes into per-page text, in page order.
pub fn decode_pages(source: &SourceRef, kind: DocumentKind, bytes: &[u8]) -> Result<Vec<String>> {
    let pages = match kind {
        DocumentKind::Pdf => pdf_pages(source, bytes)?,
        DocumentKind::Html => {
            let text = html2text::from_read(bytes, HTML_WRAP_WIDTH)
                .map_err(|e| RagError::decode(source.as_str(), format!("html: {}", e)))?;
            vec![text]
        }
        DocumentKind::Text => {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| RagError::decode(source.as_str(), format!("not UTF-8: {}", e)))?;
            text.split(FORM_FEED).map(str::to_string).collect()
        }
    };

    if pages.is_empty() {
        return Err(RagError::decode(source.as_str(), "document has no pages"));
    }
    debug!(source = %source, ?kind, pages = pages.len(), "decoded");
    Ok(pages)
}

/// pdf-extract first; lopdf page-by-page if it fails or panics on a font.
fn pdf_pages(source: &SourceRef, bytes: &[u8]) -> Result<Vec<String>> {
    let extracted =
        std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes));
    match extracted {
        Ok(Ok(pages)) if !pages.is_empty() => return Ok(pages),
        Ok(Ok(_)) => warn!(source = %source, "pdf-extract found no pages, trying lopdf"),
        Ok(Err(e)) => warn!(source = %source, "pdf-extract failed: {}, trying lopdf", e),
        Err(_) => warn!(source = %source, "pdf-extract panicked, trying lopdf"),
    }

    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| RagError::decode(source.as_str(), format!("failed to load PDF: {}", e)))?;
    doc.get_pages()
        .keys()
        .map(|&page_number| {
            doc.extract_text(&[page_number]).map_err(|e| {
                RagError::decode(
                    source.as_str(),
                    format!("page {}: {}", page_number, e),
                )
            })
        })
        .collect()
}
