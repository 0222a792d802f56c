//! Plain-text extraction from uploaded documents.
//!
//! Format detection is by file extension only. PDF goes through `pdf-extract`; Word and
//! PowerPoint files are OOXML zip archives whose XML parts are walked with `quick-xml`,
//! emitting a newline at the end of every paragraph.

use quick_xml::{Reader, events::Event};
use std::io::{Cursor, Read};
use std::path::Path;
use thiserror::Error;
use zip::ZipArchive;

const WORD_BODY: &str = "word/document.xml";
const SLIDE_PREFIX: &str = "ppt/slides/slide";

/// Document families the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Portable Document Format (`.pdf`).
    Pdf,
    /// Word OOXML document (`.docx`).
    Word,
    /// PowerPoint OOXML presentation (`.pptx`).
    Slides,
    /// UTF-8 text (`.txt`, `.md`).
    PlainText,
}

/// Errors raised while turning an uploaded file into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The extension is not one of the supported formats.
    #[error("Unsupported file type '.{extension}'")]
    UnsupportedFormat {
        /// Lower-cased extension that was rejected.
        extension: String,
    },
    /// The file name carries no extension to dispatch on.
    #[error("File '{file_name}' has no extension")]
    MissingExtension {
        /// Name supplied with the upload.
        file_name: String,
    },
    /// Reading an archive entry failed.
    #[error("Failed to read document contents: {0}")]
    Io(#[from] std::io::Error),
    /// The PDF could not be parsed.
    #[error("Failed to extract PDF text: {0}")]
    Pdf(String),
    /// The OOXML container is not a readable zip archive.
    #[error("Invalid document archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    /// An OOXML part is not well-formed XML.
    #[error("Invalid document XML: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl ExtractionError {
    /// Whether the failure is about the file type rather than its contents.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat { .. } | Self::MissingExtension { .. }
        )
    }
}

/// Detect the document format from a file name's extension (case-insensitive).
pub fn detect_format(file_name: &str) -> Result<DocumentFormat, ExtractionError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| ExtractionError::MissingExtension {
            file_name: file_name.to_string(),
        })?;

    match extension.as_str() {
        "pdf" => Ok(DocumentFormat::Pdf),
        "docx" => Ok(DocumentFormat::Word),
        "pptx" => Ok(DocumentFormat::Slides),
        "txt" | "md" => Ok(DocumentFormat::PlainText),
        _ => Err(ExtractionError::UnsupportedFormat { extension }),
    }
}

/// Extract plain text from `bytes`, dispatching on the extension of `file_name`.
///
/// The result may be empty or whitespace-only; callers decide whether that is an error.
pub fn extract_text(file_name: &str, bytes: &[u8]) -> Result<String, ExtractionError> {
    let format = detect_format(file_name)?;
    let text = match format {
        DocumentFormat::Pdf => extract_pdf(bytes)?,
        DocumentFormat::Word => extract_word(bytes)?,
        DocumentFormat::Slides => extract_slides(bytes)?,
        DocumentFormat::PlainText => String::from_utf8_lossy(bytes).into_owned(),
    };
    tracing::debug!(
        file_name,
        ?format,
        bytes = bytes.len(),
        chars = text.chars().count(),
        "Extracted document text"
    );
    Ok(text)
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|err| ExtractionError::Pdf(err.to_string()))
}

fn extract_word(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let xml = read_entry(&mut archive, WORD_BODY)?;
    paragraphs_text(&xml)
}

fn extract_slides(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| slide_number(name).map(|number| (number, name.to_string())))
        .collect();
    slides.sort_by_key(|(number, _)| *number);

    let mut text = String::new();
    for (_, name) in slides {
        let xml = read_entry(&mut archive, &name)?;
        text.push_str(&paragraphs_text(&xml)?);
    }
    Ok(text)
}

/// `ppt/slides/slide12.xml` → `12`; layouts, notes and rels entries are skipped.
fn slide_number(name: &str) -> Option<u32> {
    name.strip_prefix(SLIDE_PREFIX)?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

fn read_entry(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<String, ExtractionError> {
    let mut entry = archive.by_name(name)?;
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    Ok(xml)
}

/// Collect `<*:t>` runs, terminating each `<*:p>` paragraph with a newline.
///
/// Matching on local names covers both WordprocessingML (`w:`) and DrawingML (`a:`).
fn paragraphs_text(xml: &str) -> Result<String, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_run_text = true,
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_run_text = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" => text.push('\t'),
                b"br" => text.push('\n'),
                b"p" => text.push('\n'),
                _ => {}
            },
            Event::Text(e) if in_run_text => text.push_str(&e.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(text)
}
