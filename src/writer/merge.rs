//! Verbatim extraction of existing `<tag>` elements from a previously
//! rendered output document.
//!
//! Used by the full-document renderer's cache-merge mode: history from a
//! prior run is spliced back in as raw bytes rather than re-rendered, so a
//! merge never changes the shape of entries it didn't produce itself.

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("existing output is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("existing output could not be parsed as XML: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// Extract each top-level `<tag>...</tag>` (or self-closing `<tag/>`)
/// element from `xml`, verbatim, in document order.
pub fn extract_elements(xml: &[u8], tag: &str) -> Result<Vec<Vec<u8>>, MergeError> {
    let text = std::str::from_utf8(xml)?;
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);

    let mut elements = Vec::new();
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let bytes = text.as_bytes();

    loop {
        let before = reader.buffer_position() as usize;
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) => {
                if e.name().as_ref() == tag.as_bytes() {
                    if depth == 0 {
                        start = before;
                    }
                    depth += 1;
                }
            }
            Event::End(e) if e.name().as_ref() == tag.as_bytes() => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let end = reader.buffer_position() as usize;
                    elements.push(bytes[start..end].to_vec());
                }
            }
            Event::Empty(e) if depth == 0 && e.name().as_ref() == tag.as_bytes() => {
                let end = reader.buffer_position() as usize;
                elements.push(bytes[before..end].to_vec());
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(elements)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_entry_elements_in_order() {
        let doc = br#"<?xml version="1.0"?><feed><title>x</title><entry><id>1</id></entry><entry><id>2</id></entry></feed>"#;
        let elements = extract_elements(doc, "entry").unwrap();
        assert_eq!(elements.len(), 2);
        assert!(std::str::from_utf8(&elements[0]).unwrap().contains("<id>1</id>"));
        assert!(std::str::from_utf8(&elements[1]).unwrap().contains("<id>2</id>"));
    }

    #[test]
    fn no_matching_tag_returns_empty() {
        let doc = br#"<?xml version="1.0"?><feed><title>x</title></feed>"#;
        let elements = extract_elements(doc, "entry").unwrap();
        assert!(elements.is_empty());
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let result = extract_elements(b"<feed><entry></item></feed>", "entry");
        assert!(result.is_err());
    }
}
