use super::*;
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

fn write_docx(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    let file = fs::File::create(&path).expect("should create docx");
    let mut writer = zip::ZipWriter::new(file);
    writer
        .start_file("[Content_Types].xml", SimpleFileOptions::default())
        .expect("should start entry");
    writer
        .write_all(br#"<?xml version="1.0"?><Types/>"#)
        .expect("should write entry");
    writer
        .start_file(DOCX_BODY_PART, SimpleFileOptions::default())
        .expect("should start entry");
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );
    writer.write_all(xml.as_bytes()).expect("should write entry");
    writer.finish().expect("should finish archive");
    path
}

#[test]
fn document_kind_detection() {
    assert_eq!(
        DocumentKind::from_path(Path::new("policy.PDF")),
        Some(DocumentKind::Pdf)
    );
    assert_eq!(
        DocumentKind::from_path(Path::new("a/b/api.docx")),
        Some(DocumentKind::Docx)
    );
    assert_eq!(
        DocumentKind::from_path(Path::new("info.txt")),
        Some(DocumentKind::Txt)
    );
    assert_eq!(DocumentKind::from_path(Path::new("slides.pptx")), None);
    assert_eq!(DocumentKind::from_path(Path::new("README")), None);
}

#[test]
fn extract_txt_returns_raw_content() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = dir.path().join("info.txt");
    fs::write(&path, "Line one\nLínea dos\n").expect("should write file");

    let text = extract(&path).expect("should extract txt");
    assert_eq!(text, "Line one\nLínea dos\n");
}

#[test]
fn unsupported_extension_is_reported() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = dir.path().join("table.csv");
    fs::write(&path, "a,b").expect("should write file");

    let err = extract(&path).expect_err("csv is unsupported");
    assert!(matches!(&err, RagError::UnsupportedFileType(p) if p == &path));
    assert!(err.is_per_file());
}

#[test]
fn missing_file_is_an_extraction_error() {
    let err = extract(Path::new("/definitely/not/here.txt")).expect_err("file is missing");
    assert!(matches!(err, RagError::Extraction { .. }));
    assert!(err.is_per_file());
}

#[test]
fn invalid_pdf_is_an_extraction_error() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = dir.path().join("broken.pdf");
    fs::write(&path, b"this is not a pdf").expect("should write file");

    assert!(matches!(
        extract(&path),
        Err(RagError::Extraction { .. })
    ));
}

#[test]
fn invalid_docx_is_an_extraction_error() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = dir.path().join("broken.docx");
    fs::write(&path, b"plain bytes").expect("should write file");

    let err = extract(&path).expect_err("not a zip archive");
    assert!(matches!(err, RagError::Extraction { message, .. } if message.contains("DOCX")));
}

#[test]
fn extract_docx_joins_paragraphs() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = write_docx(
        &dir,
        "policy.docx",
        concat!(
            r#"<w:p w:rsidR="00A1"><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Cancellation</w:t></w:r><w:r><w:t xml:space="preserve"> Policy</w:t></w:r></w:p>"#,
            r#"<w:p/>"#,
            r#"<w:p><w:r><w:t>Fees &amp; charges</w:t><w:tab/><w:t>apply &lt;24h&gt;</w:t></w:r></w:p>"#,
        ),
    );

    let text = extract(&path).expect("should extract docx");
    assert_eq!(text, "Cancellation Policy\n\nFees & charges\tapply <24h>");
}

#[test]
fn docx_without_body_fails() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = dir.path().join("empty.docx");
    let file = fs::File::create(&path).expect("should create docx");
    let mut writer = zip::ZipWriter::new(file);
    writer
        .start_file("other.xml", SimpleFileOptions::default())
        .expect("should start entry");
    writer.write_all(b"<x/>").expect("should write entry");
    writer.finish().expect("should finish archive");

    let err = extract(&path).expect_err("document.xml is missing");
    assert!(matches!(err, RagError::Extraction { message, .. } if message.contains(DOCX_BODY_PART)));
}

#[test]
fn entity_decoding() {
    assert_eq!(decode_xml_entities("plain"), "plain");
    assert_eq!(decode_xml_entities("a &amp; b"), "a & b");
    assert_eq!(decode_xml_entities("&#65;&#x42;"), "AB");
    assert_eq!(decode_xml_entities("&quot;x&apos;"), "\"x'");
    assert_eq!(decode_xml_entities("5 & 6"), "5 & 6");
    assert_eq!(decode_xml_entities("&bogus; end"), "&bogus; end");
}
