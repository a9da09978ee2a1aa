//! Plain-text extraction for the supported document kinds.
//!
//! PDF text comes from `pdf-extract`, DOCX paragraphs are read straight out of
//! the `word/document.xml` part of the archive and TXT files are read as
//! UTF-8.

#[cfg(test)]
mod tests;

use fancy_regex::Regex;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

use crate::{RagError, Result};

const DOCX_BODY_PART: &str = "word/document.xml";

static PARAGRAPH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<w:p(?:\s[^>]*?)?(?:/>|>(.*?)</w:p>)").expect("valid regex")
});

static RUN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<w:t(?:\s[^>]*)?>([^<]*)</w:t>|<w:(tab|br|cr)(?:\s[^>]*?)?/>")
        .expect("valid regex")
});

/// Document kinds the extractor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Txt,
}

impl DocumentKind {
    /// Detect the kind from the file extension, ignoring case
    #[inline]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("pdf") {
            Some(Self::Pdf)
        } else if ext.eq_ignore_ascii_case("docx") {
            Some(Self::Docx)
        } else if ext.eq_ignore_ascii_case("txt") {
            Some(Self::Txt)
        } else {
            None
        }
    }
}

/// Extract the full text of a document.
///
/// Fails with [`RagError::UnsupportedFileType`] for unknown extensions and
/// [`RagError::Extraction`] when the file cannot be read or parsed.
#[inline]
pub fn extract(path: &Path) -> Result<String> {
    let kind = DocumentKind::from_path(path)
        .ok_or_else(|| RagError::UnsupportedFileType(path.to_path_buf()))?;

    debug!("Extracting {:?} document: {}", kind, path.display());

    let text = match kind {
        DocumentKind::Pdf => extract_pdf(path),
        DocumentKind::Docx => extract_docx(path),
        DocumentKind::Txt => extract_txt(path),
    }
    .map_err(|message| RagError::Extraction {
        path: path.to_path_buf(),
        message,
    })?;

    debug!(
        "Extracted {} characters from {}",
        text.chars().count(),
        path.display()
    );
    Ok(text)
}

fn extract_txt(path: &Path) -> std::result::Result<String, String> {
    fs::read_to_string(path).map_err(|e| e.to_string())
}

fn extract_pdf(path: &Path) -> std::result::Result<String, String> {
    let bytes = fs::read(path).map_err(|e| e.to_string())?;
    pdf_extract::extract_text_from_mem(&bytes).map_err(|e| format!("PDF extraction failed: {e}"))
}

fn extract_docx(path: &Path) -> std::result::Result<String, String> {
    let file = fs::File::open(path).map_err(|e| e.to_string())?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| format!("not a DOCX archive: {e}"))?;

    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY_PART)
        .map_err(|e| format!("missing {DOCX_BODY_PART}: {e}"))?
        .read_to_string(&mut xml)
        .map_err(|e| format!("failed to read {DOCX_BODY_PART}: {e}"))?;

    docx_paragraphs(&xml).map(|paragraphs| paragraphs.join("\n"))
}

/// Text of every `<w:p>` paragraph in a WordprocessingML body, in order
fn docx_paragraphs(xml: &str) -> std::result::Result<Vec<String>, String> {
    let mut paragraphs = Vec::new();

    for paragraph in PARAGRAPH_REGEX.captures_iter(xml) {
        let paragraph = paragraph.map_err(|e| e.to_string())?;
        let mut text = String::new();

        if let Some(body) = paragraph.get(1) {
            for run in RUN_REGEX.captures_iter(body.as_str()) {
                let run = run.map_err(|e| e.to_string())?;
                if let Some(content) = run.get(1) {
                    text.push_str(&decode_xml_entities(content.as_str()));
                } else if let Some(control) = run.get(2) {
                    text.push(if control.as_str() == "tab" { '\t' } else { '\n' });
                }
            }
        }

        paragraphs.push(text);
    }

    Ok(paragraphs)
}

fn decode_xml_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut decoded = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        decoded.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let Some(semi) = tail.find(';') else {
            decoded.push_str(tail);
            return decoded;
        };

        let entity = &tail[1..semi];
        let replacement = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };

        match replacement {
            Some(c) => {
                decoded.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                decoded.push('&');
                rest = &tail[1..];
            }
        }
    }
    decoded.push_str(rest);
    decoded
}
