//! draw.io diagram extractor.
//!
//! Streams the XML in document order and keeps a running 1-based index over
//! every element visited, labeled or not. Elements carrying a non-blank
//! `value` attribute (the visible text of draw.io shapes) are emitted as
//! fragments labeled `要素N` with that running index, so labels point at the
//! element's position in the whole tree.

use async_trait::async_trait;
use quick_xml::events::Event;
use std::path::Path;

use crate::extract::{ExtractError, Extractor};
use crate::models::Fragment;

pub struct DrawioExtractor;

#[async_trait]
impl Extractor for DrawioExtractor {
    fn extensions(&self) -> &[&str] {
        &["drawio"]
    }

    async fn extract(&self, path: &Path) -> Result<Vec<Fragment>, ExtractError> {
        let bytes = std::fs::read(path)?;
        extract_elements(&bytes)
    }
}

fn extract_elements(xml: &[u8]) -> Result<Vec<Fragment>, ExtractError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut fragments = Vec::new();
    let mut index = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                index += 1;
                let value = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.as_ref() == b"value")
                    .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()));
                if let Some(value) = value {
                    let trimmed = value.trim();
                    if !trimmed.is_empty() {
                        fragments.push(Fragment::new(format!("要素{}", index), trimmed));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Parse(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::join_fragments;

    #[test]
    fn index_counts_every_element_not_just_labeled_ones() {
        // Five elements; only the 3rd and 5th carry a value.
        let xml = br#"<mxfile>
            <diagram>
                <mxCell value="Start"/>
                <mxCell/>
                <mxCell value="End"/>
            </diagram>
        </mxfile>"#;
        let frags = extract_elements(xml).unwrap();
        assert_eq!(join_fragments(&frags), "[要素3] Start\n[要素5] End");
    }

    #[test]
    fn root_element_is_index_one() {
        let xml = br#"<mxfile value="whole file"/>"#;
        let frags = extract_elements(xml).unwrap();
        assert_eq!(join_fragments(&frags), "[要素1] whole file");
    }

    #[test]
    fn blank_values_are_dropped() {
        let xml = br#"<a><b value="  "/><c value="text"/></a>"#;
        let frags = extract_elements(xml).unwrap();
        assert_eq!(join_fragments(&frags), "[要素3] text");
    }

    #[test]
    fn entities_in_values_are_unescaped() {
        let xml = br#"<a><b value="A &amp; B"/></a>"#;
        let frags = extract_elements(xml).unwrap();
        assert_eq!(frags[0].text, "A & B");
    }

    #[test]
    fn no_values_yield_empty() {
        let xml = br#"<mxfile><diagram><mxCell/></diagram></mxfile>"#;
        assert!(extract_elements(xml).unwrap().is_empty());
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        let err = extract_elements(b"<a><b></a>").unwrap_err();
        assert!(matches!(err, ExtractError::Parse(_)));
    }
}
