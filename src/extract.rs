//! PDF text extraction.
//!
//! Callers supply a path or raw bytes; this module returns plain UTF-8 text
//! with one `\n` after each page. Extraction never raises: a document that
//! cannot be parsed yields an empty string, which the pipeline treats as
//! "extraction failed".

use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("source file not found: {}", .0.display())]
    MissingSource(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

/// Reads the source PDF, reporting a missing file before any parsing starts.
pub fn read_source(path: &Path) -> Result<Vec<u8>, ExtractError> {
    if !path.is_file() {
        return Err(ExtractError::MissingSource(path.to_path_buf()));
    }
    std::fs::read(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Extracts per-page text, or the parse error.
pub fn try_extract_text(bytes: &[u8]) -> Result<String, ExtractError> {
    // pdf-extract panics on some malformed inputs instead of returning Err.
    let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
        .map_err(|_| ExtractError::Pdf("parser panicked".to_string()))?
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;

    let mut text = String::new();
    for page in pages {
        text.push_str(&page);
        text.push('\n');
    }
    Ok(text)
}

/// Extracts text, returning an empty string on any failure.
pub fn extract_text(bytes: &[u8]) -> String {
    match try_extract_text(bytes) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("{}", e);
            String::new()
        }
    }
}
