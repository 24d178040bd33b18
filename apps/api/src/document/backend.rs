//! PDF text backends.
//!
//! [`InMemoryBackend`] parses straight from the upload buffer and is the default.
//! [`PdftotextBackend`] is the fallback for poppler's `pdftotext`, which only accepts a
//! path: the bytes go to a scoped temp file that is removed on every exit path.

use std::io::Write;
use std::path::Path;
use std::process::Command;

use chrono::Utc;
use lopdf::Object;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::document::DocumentError;

/// One page of text as the parser produced it, before normalisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
    pub number: u32,
    pub text: String,
}

/// Parser output for a whole document.
#[derive(Debug, Clone, Default)]
pub struct ParsedPdf {
    pub pages: Vec<RawPage>,
    /// Page count from the document structure, when the backend can read it.
    pub total_pages: Option<usize>,
    pub info: Map<String, Value>,
}

/// Trait for PDF text extraction backends.
pub trait PdfBackend: Send + Sync {
    /// Parse PDF bytes into page texts in document order.
    fn parse(&self, pdf_bytes: &[u8]) -> Result<ParsedPdf, DocumentError>;

    /// Name of this backend (for diagnostics).
    fn name(&self) -> &'static str;
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory backend (pdf-extract + lopdf)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
pub struct InMemoryBackend;

impl PdfBackend for InMemoryBackend {
    fn parse(&self, pdf_bytes: &[u8]) -> Result<ParsedPdf, DocumentError> {
        let document = lopdf::Document::load_mem(pdf_bytes)
            .map_err(|e| DocumentError::Parse(format!("unreadable PDF structure: {e}")))?;
        let total_pages = document.get_pages().len();
        let info = info_dictionary(&document);

        let texts = pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
            .map_err(|e| DocumentError::Parse(format!("text extraction failed: {e}")))?;

        let pages = texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| RawPage {
                number: i as u32 + 1,
                text,
            })
            .collect();

        Ok(ParsedPdf {
            pages,
            total_pages: Some(total_pages),
            info,
        })
    }

    fn name(&self) -> &'static str {
        "pdf-extract"
    }
}

/// Converts the trailer `/Info` dictionary into JSON. Unsupported value kinds are skipped.
fn info_dictionary(document: &lopdf::Document) -> Map<String, Value> {
    let mut info = Map::new();
    info.insert(
        "PDFFormatVersion".to_string(),
        Value::String(document.version.to_string()),
    );

    let dict = match document.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => document.get_dictionary(*id).ok(),
        Ok(Object::Dictionary(dict)) => Some(dict),
        _ => None,
    };

    if let Some(dict) = dict {
        for (key, value) in dict.iter() {
            if let Some(value) = object_to_json(value) {
                info.insert(String::from_utf8_lossy(key).into_owned(), value);
            }
        }
    }
    info
}

fn object_to_json(object: &Object) -> Option<Value> {
    match object {
        Object::String(bytes, _) => Some(Value::String(decode_text_string(bytes))),
        Object::Name(name) => Some(Value::String(String::from_utf8_lossy(name).into_owned())),
        Object::Integer(i) => Some(Value::from(*i)),
        Object::Real(r) => serde_json::Number::from_f64(f64::from(*r)).map(Value::Number),
        Object::Boolean(b) => Some(Value::Bool(*b)),
        _ => None,
    }
}

/// PDF text strings are UTF-16BE when they start with a BOM, otherwise PDFDocEncoding
/// (treated as Latin-1, which matches it for printable ASCII and most of the upper half).
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// pdftotext backend (poppler-utils)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
pub struct PdftotextBackend;

impl PdftotextBackend {
    /// Check if pdftotext is available on the system.
    pub fn is_available() -> bool {
        Command::new("pdftotext")
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }
}

impl PdfBackend for PdftotextBackend {
    fn parse(&self, pdf_bytes: &[u8]) -> Result<ParsedPdf, DocumentError> {
        let text = with_scoped_file(pdf_bytes, |path| {
            let output = Command::new("pdftotext")
                .arg("-enc")
                .arg("UTF-8")
                .arg(path)
                .arg("-") // output to stdout
                .output()
                .map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        DocumentError::Parse("pdftotext is not installed".to_string())
                    } else {
                        DocumentError::Parse(format!("pdftotext failed: {e}"))
                    }
                })?;

            if !output.status.success() {
                let code = output.status.code().unwrap_or(-1);
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(DocumentError::Parse(format!(
                    "pdftotext exited with {code}: {}",
                    stderr.trim()
                )));
            }

            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        })?;

        // pdftotext ends every page with a form feed, so the final segment is empty.
        let mut segments: Vec<&str> = text.split('\x0c').collect();
        if text.ends_with('\x0c') {
            segments.pop();
        }

        let pages: Vec<RawPage> = segments
            .into_iter()
            .enumerate()
            .map(|(i, page_text)| RawPage {
                number: i as u32 + 1,
                text: page_text.to_string(),
            })
            .collect();

        Ok(ParsedPdf {
            total_pages: Some(pages.len()),
            pages,
            info: Map::new(),
        })
    }

    fn name(&self) -> &'static str {
        "pdftotext"
    }
}

/// Writes `bytes` to a uniquely named temp file, runs `f` on its path, and deletes the
/// file afterwards. Deletion also happens if `f` fails or panics: the file handle is
/// owned by this frame and removed on drop.
pub(crate) fn with_scoped_file<T>(
    bytes: &[u8],
    f: impl FnOnce(&Path) -> Result<T, DocumentError>,
) -> Result<T, DocumentError> {
    let mut file = tempfile::Builder::new()
        .prefix(&format!("upload-{}-", Utc::now().timestamp_millis()))
        .suffix(".pdf")
        .tempfile()?;
    file.write_all(bytes)?;
    file.flush()?;
    debug!(path = %file.path().display(), bytes = bytes.len(), "Wrote upload to scoped temp file");

    let result = f(file.path());

    if let Err(e) = file.close() {
        warn!("Failed to remove scoped temp file: {e}");
    }
    result
}

/// Fixture PDFs for tests, shared by the unit and integration suites.
#[doc(hidden)]
pub mod test_pdf {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    /// Builds a PDF with one Helvetica text line per page.
    pub fn build_pdf(pages: &[&str]) -> anyhow::Result<Vec<u8>> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal("Resume"),
            "Producer" => Object::string_literal("resume-chat tests"),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf)?;
        Ok(buf)
    }

    #[cfg(test)]
    pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
        build_pdf(pages).unwrap()
    }
}
