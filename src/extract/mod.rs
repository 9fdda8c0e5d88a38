//! Text extraction from uploaded documents
//!
//! Supported formats:
//! - Plain text and markdown, decoded as strict UTF-8
//! - DOCX, flattened to one line per paragraph

use crate::error::{QaError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Declared document format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    PlainText,
    Markdown,
    Docx,
}

impl DocumentFormat {
    /// Select the format from a file extension
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" | "text" => Ok(DocumentFormat::PlainText),
            "md" | "markdown" => Ok(DocumentFormat::Markdown),
            "docx" => Ok(DocumentFormat::Docx),
            other => Err(QaError::UnsupportedFormat(format!(".{}", other))),
        }
    }

    /// Select the format from a file name
    pub fn from_filename(name: &str) -> Result<Self> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| QaError::UnsupportedFormat(format!("{} has no extension", name)))?;
        Self::from_extension(ext)
    }
}

/// Uploaded document, consumed once per submission
#[derive(Debug, Clone)]
pub struct Document {
    pub bytes: Vec<u8>,
    pub format: DocumentFormat,
}

impl Document {
    pub fn new(bytes: Vec<u8>, format: DocumentFormat) -> Self {
        Self { bytes, format }
    }

    /// Build a document, picking the format from the file name
    pub fn from_upload(filename: &str, bytes: Vec<u8>) -> Result<Self> {
        Ok(Self::new(bytes, DocumentFormat::from_filename(filename)?))
    }

    /// Extract the document text
    pub fn text(&self) -> Result<String> {
        extract_text(&self.bytes, self.format)
    }
}

/// Normalize raw document bytes into one UTF-8 string
pub fn extract_text(bytes: &[u8], format: DocumentFormat) -> Result<String> {
    let text = match format {
        DocumentFormat::PlainText | DocumentFormat::Markdown => std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| QaError::Decoding(e.to_string()))?,
        DocumentFormat::Docx => docx_paragraphs(bytes)?.join("\n"),
    };

    debug!("Extracted {} bytes of text from {:?}", text.len(), format);
    Ok(text)
}

fn docx_paragraphs(bytes: &[u8]) -> Result<Vec<String>> {
    let doc = docx_rs::read_docx(bytes).map_err(|e| QaError::Decoding(e.to_string()))?;

    let mut paragraphs = Vec::new();
    let mut tables = 0;
    for child in doc.document.children {
        match child {
            docx_rs::DocumentChild::Paragraph(p) => {
                let mut line = String::new();
                push_paragraph_text(&p.children, &mut line);
                paragraphs.push(line);
            }
            docx_rs::DocumentChild::Table(_) => tables += 1,
            _ => {}
        }
    }

    if tables > 0 {
        warn!("Skipped {} table(s) while extracting DOCX text", tables);
    }

    Ok(paragraphs)
}

/// Text of runs, including those nested in hyperlinks and tracked insertions
fn push_paragraph_text(children: &[docx_rs::ParagraphChild], line: &mut String) {
    for child in children {
        match child {
            docx_rs::ParagraphChild::Run(run) => push_run_text(run, line),
            docx_rs::ParagraphChild::Hyperlink(link) => push_paragraph_text(&link.children, line),
            docx_rs::ParagraphChild::Insert(insert) => {
                for child in &insert.children {
                    if let docx_rs::InsertChild::Run(run) = child {
                        push_run_text(run, line);
                    }
                }
            }
            _ => {}
        }
    }
}

fn push_run_text(run: &docx_rs::Run, line: &mut String) {
    for child in &run.children {
        match child {
            docx_rs::RunChild::Text(t) => line.push_str(&t.text),
            docx_rs::RunChild::Tab(_) => line.push('\t'),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Docx, Hyperlink, HyperlinkType, Insert, Paragraph, Run};
    use std::io::Cursor;

    fn build_docx(paragraphs: &[&str]) -> Vec<u8> {
        let mut docx = Docx::new();
        for text in paragraphs {
            let paragraph = if text.is_empty() {
                Paragraph::new()
            } else {
                Paragraph::new().add_run(Run::new().add_text(*text))
            };
            docx = docx.add_paragraph(paragraph);
        }

        let mut cursor = Cursor::new(Vec::new());
        docx.build().pack(&mut cursor).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_plain_text() {
        let text = extract_text("Hello world".as_bytes(), DocumentFormat::PlainText).unwrap();
        assert_eq!(text, "Hello world");
    }

    #[test]
    fn test_invalid_utf8() {
        let err = extract_text(&[0x66, 0xff, 0xfe], DocumentFormat::Markdown).unwrap_err();
        assert!(matches!(err, QaError::Decoding(_)));
    }

    #[test]
    fn test_format_from_filename() {
        assert_eq!(
            DocumentFormat::from_filename("notes.MD").unwrap(),
            DocumentFormat::Markdown
        );
        assert_eq!(
            DocumentFormat::from_filename("a/b/report.docx").unwrap(),
            DocumentFormat::Docx
        );
        assert!(matches!(
            DocumentFormat::from_filename("scan.pdf"),
            Err(QaError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            DocumentFormat::from_filename("README"),
            Err(QaError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_docx_paragraph_order_and_empty_lines() {
        let bytes = build_docx(&["First paragraph", "", "Third paragraph"]);
        let doc = Document::from_upload("report.docx", bytes).unwrap();
        assert_eq!(doc.text().unwrap(), "First paragraph\n\nThird paragraph");
    }

    #[test]
    fn test_docx_hyperlink_and_insert_text_kept() {
        let paragraph = Paragraph::new()
            .add_run(Run::new().add_text("See "))
            .add_hyperlink(
                Hyperlink::new("section-2", HyperlinkType::Anchor)
                    .add_run(Run::new().add_text("section two")),
            )
            .add_insert(Insert::new(Run::new().add_text(" for details")));

        let mut cursor = Cursor::new(Vec::new());
        Docx::new()
            .add_paragraph(paragraph)
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("End")))
            .build()
            .pack(&mut cursor)
            .unwrap();

        let text = extract_text(&cursor.into_inner(), DocumentFormat::Docx).unwrap();
        assert_eq!(text, "See section two for details\nEnd");
    }

    #[test]
    fn test_corrupt_docx() {
        let err = extract_text(b"not a zip archive", DocumentFormat::Docx).unwrap_err();
        assert!(matches!(err, QaError::Decoding(_)));
    }
}
