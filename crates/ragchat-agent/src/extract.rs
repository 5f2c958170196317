use ragchat_core::{RagError, RagResult};
use std::path::Path;

/// An uploaded document: a display name and its raw bytes.
#[derive(Debug, Clone)]
pub struct Document {
    /// File name shown in reports and logs.
    pub name: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl Document {
    /// Wraps in-memory contents.
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads a document from disk, named after the file.
    pub async fn from_path(path: &Path) -> RagResult<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self { name, bytes })
    }
}

/// Capability that turns raw document bytes into text.
pub trait TextExtractor: Send + Sync {
    /// Extract the document text. An error skips only this document.
    fn extract(&self, document: &Document) -> RagResult<String>;
}

/// Extractor for UTF-8 text files.
///
/// Invalid sequences are replaced; documents that are mostly invalid
/// (binary files) are rejected.
#[derive(Debug, Clone, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, document: &Document) -> RagResult<String> {
        let bytes = document
            .bytes
            .strip_prefix(b"\xEF\xBB\xBF")
            .unwrap_or(&document.bytes);
        let text = String::from_utf8_lossy(bytes);

        let total = text.chars().count();
        let invalid = text
            .chars()
            .filter(|&c| c == char::REPLACEMENT_CHARACTER || c == '\0')
            .count();
        if total > 0 && invalid * 10 > total {
            return Err(RagError::EmptyDocument(format!(
                "{} does not look like a text document",
                document.name
            )));
        }

        Ok(text.replace("\r\n", "\n"))
    }
}

/// Extractor for PDF files, concatenating the text of every page.
#[derive(Debug, Clone, Default)]
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, document: &Document) -> RagResult<String> {
        let text = pdf_extract::extract_text_from_mem(&document.bytes).map_err(|e| {
            RagError::EmptyDocument(format!("{} could not be read as PDF: {e}", document.name))
        })?;
        Ok(text.replace("\r\n", "\n"))
    }
}

/// Default extractor: PDF by `%PDF-` header or `.pdf` extension, plain
/// text otherwise.
#[derive(Debug, Clone, Default)]
pub struct DocumentExtractor;

impl DocumentExtractor {
    /// Whether `document` is routed to [`PdfExtractor`].
    pub fn is_pdf(document: &Document) -> bool {
        document.bytes.starts_with(b"%PDF-")
            || Path::new(&document.name)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
    }
}

impl TextExtractor for DocumentExtractor {
    fn extract(&self, document: &Document) -> RagResult<String> {
        if Self::is_pdf(document) {
            PdfExtractor.extract(document)
        } else {
            PlainTextExtractor.extract(document)
        }
    }
}
