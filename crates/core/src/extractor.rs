use crate::error::ExtractionError;
use crate::models::PageText;
use lopdf::Document;
use std::path::Path;
use tracing::{debug, info};

pub trait PdfExtractor: Send + Sync {
    /// Returns the text of every page that has any, in page order.
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, ExtractionError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, ExtractionError> {
        info!(path = %path.display(), "extracting text from pdf");
        let bytes = std::fs::read(path)?;
        let document = Document::load_mem(&bytes)
            .map_err(|error| ExtractionError::PdfParse(format!("{}: {error}", path.display())))?;

        let mut pages = Vec::new();
        for page_no in document.get_pages().into_keys() {
            let text = document.extract_text(&[page_no]).map_err(|error| {
                ExtractionError::PdfParse(format!("page {page_no} of {}: {error}", path.display()))
            })?;

            let text = text.trim();
            if text.is_empty() {
                // no text layer, e.g. a scanned page
                debug!(page = page_no, "skipping page without text");
                continue;
            }

            pages.push(PageText {
                number: page_no,
                text: text.to_string(),
            });
        }

        info!(path = %path.display(), pages = pages.len(), "extracted pdf pages");
        Ok(pages)
    }
}

pub fn extract_page_texts(path: &Path) -> Result<Vec<PageText>, ExtractionError> {
    LopdfExtractor.extract_pages(path)
}
