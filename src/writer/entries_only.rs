//! Entries-only renderer (the default output mode): emits a bare sequence
//! of `<entry>`/`<item>` elements with no enclosing `<feed>`/`<channel>`
//! root.

use super::entry_render::{write_atom_entry, write_rss_item};
use super::{FeedRenderer, WriteError};
use crate::aggregator::GroupAggregate;
use crate::feed::FeedType;
use quick_xml::writer::Writer;
use std::io::Cursor;

pub struct EntriesOnlyRenderer;

impl FeedRenderer for EntriesOnlyRenderer {
    fn render(&self, aggregate: &GroupAggregate) -> Result<Vec<u8>, WriteError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        for entry in &aggregate.entries {
            match aggregate.feed_type {
                FeedType::Atom => write_atom_entry(&mut writer, entry)?,
                FeedType::Rss => write_rss_item(&mut writer, entry)?,
            }
        }

        Ok(writer.into_inner().into_inner())
    }

    /// The existing file's lines are appended to the new output verbatim;
    /// no parsing is involved. This is known to be able to duplicate
    /// entries if a source republishes an old item (see spec open question
    /// on entries-only merge dedup).
    fn merge_with_existing(&self, new_doc: Vec<u8>, existing: &[u8]) -> Result<Vec<u8>, WriteError> {
        if existing.is_empty() {
            return Ok(new_doc);
        }

        let mut merged = new_doc;
        if !merged.is_empty() && !merged.ends_with(b"\n") {
            merged.push(b'\n');
        }
        merged.extend_from_slice(existing);
        Ok(merged)
    }
}
