//! Full-document ("valid Atom") renderer: emits a complete
//! `<feed xmlns="http://www.w3.org/2005/Atom">` document.

use super::entry_render::write_atom_entry;
use super::{FeedRenderer, WriteError};
use crate::aggregator::GroupAggregate;
use quick_xml::events::{BytesDecl, BytesStart, BytesText, Event};
use quick_xml::writer::Writer;
use std::io::Cursor;

pub struct AtomDocumentRenderer;

impl FeedRenderer for AtomDocumentRenderer {
    fn render(&self, aggregate: &GroupAggregate) -> Result<Vec<u8>, WriteError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(xml_err)?;

        let mut feed_start = BytesStart::new("feed");
        feed_start.push_attribute(("xmlns", "http://www.w3.org/2005/Atom"));
        writer.write_event(Event::Start(feed_start)).map_err(xml_err)?;

        writer
            .create_element("title")
            .write_text_content(BytesText::new(&aggregate.metadata.title))
            .map_err(xml_err)?;
        writer
            .create_element("id")
            .write_text_content(BytesText::new(&aggregate.metadata.id))
            .map_err(xml_err)?;
        writer
            .create_element("updated")
            .write_text_content(BytesText::new(&aggregate.metadata.updated.to_rfc3339()))
            .map_err(xml_err)?;

        for entry in &aggregate.entries {
            write_atom_entry(&mut writer, entry)?;
        }

        writer
            .write_event(Event::End(quick_xml::events::BytesEnd::new("feed")))
            .map_err(xml_err)?;

        Ok(writer.into_inner().into_inner())
    }

    fn merge_with_existing(
        &self,
        new_xml: Vec<u8>,
        existing: &[u8],
    ) -> Result<Vec<u8>, WriteError> {
        let old_entries = match super::merge::extract_elements(existing, "entry") {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "existing output file is not parseable, overwriting");
                return Ok(new_xml);
            }
        };

        if old_entries.is_empty() {
            return Ok(new_xml);
        }

        let marker = b"</feed>";
        let Some(pos) = find_last(&new_xml, marker) else {
            return Ok(new_xml);
        };

        let mut merged = Vec::with_capacity(new_xml.len() + old_entries.iter().map(Vec::len).sum::<usize>());
        merged.extend_from_slice(&new_xml[..pos]);
        for entry in old_entries {
            merged.extend_from_slice(&entry);
        }
        merged.extend_from_slice(&new_xml[pos..]);
        Ok(merged)
    }
}

fn find_last(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .rev()
        .find(|&i| &haystack[i..i + needle.len()] == needle)
}

fn xml_err(e: quick_xml::Error) -> WriteError {
    WriteError::Xml(e.to_string())
}
