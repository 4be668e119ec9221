//! Word document extractor.
//!
//! Walks `word/document.xml` paragraph by paragraph and labels each
//! non-blank paragraph `段落N`, where N is the 1-based position in the full
//! paragraph sequence. Blank paragraphs are skipped but still counted, so the
//! labels match what a reader sees in the document. Only body-level
//! paragraphs participate; paragraphs nested in table cells are neither
//! counted nor extracted.

use async_trait::async_trait;
use quick_xml::events::Event;
use std::io::Read;
use std::path::Path;

use crate::extract::{ExtractError, Extractor, MAX_XML_ENTRY_BYTES};
use crate::models::Fragment;

pub struct DocxExtractor;

#[async_trait]
impl Extractor for DocxExtractor {
    fn extensions(&self) -> &[&str] {
        &["docx"]
    }

    async fn extract(&self, path: &Path) -> Result<Vec<Fragment>, ExtractError> {
        let bytes = std::fs::read(path)?;
        let xml = read_document_xml(&bytes)?;
        extract_paragraphs(&xml)
    }
}

fn read_document_xml(bytes: &[u8]) -> Result<Vec<u8>, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Parse(e.to_string()))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::Parse(e.to_string()))?;
    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| ExtractError::Parse(e.to_string()))?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Parse(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }
    Ok(xml)
}

/// Collects the `<w:t>` runs of each body-level `<w:p>` in document order.
/// `<w:p>` elements inside `<w:tbl>` belong to table cells and are ignored.
fn extract_paragraphs(xml: &[u8]) -> Result<Vec<Fragment>, ExtractError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut fragments = Vec::new();
    let mut paragraph_no = 0usize;
    let mut table_depth = 0usize;
    let mut in_paragraph = false;
    let mut in_text_run = false;
    let mut current = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"tbl" => table_depth += 1,
                b"p" if table_depth == 0 => {
                    paragraph_no += 1;
                    in_paragraph = true;
                    current.clear();
                }
                b"t" if in_paragraph => in_text_run = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                // A self-closing <w:p/> is a blank paragraph: counted, not emitted.
                if e.local_name().as_ref() == b"p" && table_depth == 0 {
                    paragraph_no += 1;
                }
            }
            Ok(Event::Text(t)) if in_text_run => {
                current.push_str(t.unescape().unwrap_or_default().as_ref());
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"tbl" => table_depth = table_depth.saturating_sub(1),
                b"t" => in_text_run = false,
                b"p" => {
                    if in_paragraph && !current.trim().is_empty() {
                        fragments.push(Fragment::new(
                            format!("段落{}", paragraph_no),
                            current.clone(),
                        ));
                    }
                    in_paragraph = false;
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Parse(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(fragments)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::join_fragments;
    use std::io::Write;

    /// Minimal docx: a ZIP with word/document.xml holding the given paragraphs.
    /// An empty string produces an empty `<w:p/>`.
    pub(crate) fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
        let mut body = String::new();
        for p in paragraphs {
            if p.is_empty() {
                body.push_str("<w:p/>");
            } else {
                body.push_str(&format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p));
            }
        }
        let xml = format!(
            "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
            body
        );

        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn blank_paragraphs_keep_their_numbers() {
        let bytes = docx_bytes(&["", "Hello", "", "World"]);
        let xml = read_document_xml(&bytes).unwrap();
        let frags = extract_paragraphs(&xml).unwrap();
        assert_eq!(join_fragments(&frags), "[段落2] Hello\n[段落4] World");
    }

    #[test]
    fn all_blank_paragraphs_yield_nothing() {
        let bytes = docx_bytes(&["", "", ""]);
        let xml = read_document_xml(&bytes).unwrap();
        assert!(extract_paragraphs(&xml).unwrap().is_empty());
    }

    #[test]
    fn split_runs_are_joined_into_one_paragraph() {
        let xml = b"<w:document xmlns:w=\"x\"><w:body><w:p><w:r><w:t>Hel</w:t></w:r><w:r><w:t>lo</w:t></w:r></w:p></w:body></w:document>";
        let frags = extract_paragraphs(xml).unwrap();
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].label, "段落1");
        assert_eq!(frags[0].text, "Hello");
    }

    #[test]
    fn whitespace_only_paragraph_is_skipped() {
        let xml = b"<w:document xmlns:w=\"x\"><w:body><w:p><w:r><w:t>  </w:t></w:r></w:p><w:p><w:r><w:t>real</w:t></w:r></w:p></w:body></w:document>";
        let frags = extract_paragraphs(xml).unwrap();
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].label, "段落2");
    }

    #[test]
    fn table_cell_paragraphs_are_not_counted_or_extracted() {
        let xml = b"<w:document xmlns:w=\"x\"><w:body>\
            <w:p><w:r><w:t>before</w:t></w:r></w:p>\
            <w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>\
            <w:p><w:r><w:t>after</w:t></w:r></w:p>\
            </w:body></w:document>";
        let frags = extract_paragraphs(xml).unwrap();
        assert_eq!(join_fragments(&frags), "[段落1] before\n[段落2] after");
    }

    #[test]
    fn not_a_zip_is_a_parse_error() {
        let err = read_document_xml(b"not a zip").unwrap_err();
        assert!(matches!(err, ExtractError::Parse(_)));
    }

    #[tokio::test]
    async fn extracts_from_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memo.docx");
        std::fs::write(&path, docx_bytes(&["コスト削減案"])).unwrap();
        let frags = DocxExtractor.extract(&path).await.unwrap();
        assert_eq!(join_fragments(&frags), "[段落1] コスト削減案");
    }
}
