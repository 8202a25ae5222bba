//! Per-entry element rendering, shared by both renderer strategies.
//!
//! `write_atom_entry` backs every `<entry>` emitted anywhere (full-document
//! mode, and entries-only mode when the source was Atom); `write_rss_item`
//! backs `<item>` emission in entries-only mode when the source was RSS.
//! Both follow the fixed field order: title, published, updated, id,
//! summary, enclosures, tags, link(s), author.

use super::atom_id::normalize_atom_id;
use super::dates::{resolve_timestamp, rfc3339_or_now};
use super::WriteError;
use crate::feed::Entry;
use crate::util::strip_control_chars;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::writer::Writer;
use std::io::Cursor;

pub fn xml_err(e: quick_xml::Error) -> WriteError {
    WriteError::Xml(e.to_string())
}

/// Render one Atom `<entry>`.
pub fn write_atom_entry(writer: &mut Writer<Cursor<Vec<u8>>>, entry: &Entry) -> Result<(), WriteError> {
    writer
        .create_element("entry")
        .write_inner_content::<_, WriteError>(|w| {
            let title = entry.title.as_deref().unwrap_or("No title");
            let title = strip_control_chars(title);
            w.create_element("title")
                .write_text_content(BytesText::new(&title))
                .map_err(xml_err)?;

            let published = resolve_timestamp(entry.published, entry.published_raw.as_deref());
            if let Some(published) = published {
                w.create_element("published")
                    .write_text_content(BytesText::new(&published.to_rfc3339()))
                    .map_err(xml_err)?;
            }

            let updated_raw = resolve_timestamp(entry.updated, entry.updated_raw.as_deref());
            let updated = rfc3339_or_now(updated_raw.or(published), "entry.updated");
            w.create_element("updated")
                .write_text_content(BytesText::new(&updated.to_rfc3339()))
                .map_err(xml_err)?;

            let id = normalize_atom_id(entry.identity());
            w.create_element("id")
                .write_text_content(BytesText::new(&id))
                .map_err(xml_err)?;

            if let Some(summary) = &entry.summary {
                let ty = match entry.summary_type.as_deref() {
                    Some("text/html") => "html",
                    Some("application/xhtml+xml") => "xhtml",
                    _ => "text",
                };
                let summary = strip_control_chars(summary);
                let mut start = BytesStart::new("summary");
                start.push_attribute(("type", ty));
                w.write_event(Event::Start(start)).map_err(xml_err)?;
                w.write_event(Event::Text(BytesText::new(&summary))).map_err(xml_err)?;
                w.write_event(Event::End(BytesEnd::new("summary"))).map_err(xml_err)?;
            }

            for enclosure in &entry.enclosures {
                let mut start = BytesStart::new("link");
                start.push_attribute(("rel", "enclosure"));
                start.push_attribute(("href", enclosure.href.as_str()));
                if let Some(ty) = &enclosure.media_type {
                    start.push_attribute(("type", ty.as_str()));
                }
                if let Some(len) = enclosure.length {
                    start.push_attribute(("length", len.to_string().as_str()));
                }
                w.write_event(Event::Empty(start)).map_err(xml_err)?;
            }

            for tag in &entry.tags {
                let mut start = BytesStart::new("category");
                if let Some(scheme) = &tag.scheme {
                    start.push_attribute(("scheme", scheme.as_str()));
                }
                if let Some(label) = &tag.label {
                    start.push_attribute(("label", label.as_str()));
                }
                start.push_attribute(("term", tag.term.as_str()));
                w.write_event(Event::Empty(start)).map_err(xml_err)?;
            }

            if entry.links.is_empty() {
                // Required element: fall back to a self-referential placeholder
                // rather than emit an entry with no navigable link at all.
                let mut start = BytesStart::new("link");
                start.push_attribute(("rel", "alternate"));
                start.push_attribute(("type", "text/html"));
                start.push_attribute(("href", id.as_str()));
                w.write_event(Event::Empty(start)).map_err(xml_err)?;
            } else {
                for link in &entry.links {
                    let mut start = BytesStart::new("link");
                    start.push_attribute(("rel", link.rel.as_deref().unwrap_or("alternate")));
                    start.push_attribute(("type", link.media_type.as_deref().unwrap_or("text/html")));
                    start.push_attribute(("href", link.href.as_str()));
                    w.write_event(Event::Empty(start)).map_err(xml_err)?;
                }
            }

            let author = entry.author.as_deref().unwrap_or("Anonymous");
            let author = strip_control_chars(author);
            w.create_element("author")
                .write_inner_content::<_, WriteError>(|w| {
                    w.create_element("name")
                        .write_text_content(BytesText::new(&author))
                        .map_err(xml_err)?;
                    Ok(())
                })
                .map_err(xml_err)?;

            Ok(())
        })
        .map_err(xml_err)?;

    Ok(())
}

/// Render one RSS `<item>` (entries-only mode, RSS-sourced feed).
pub fn write_rss_item(writer: &mut Writer<Cursor<Vec<u8>>>, entry: &Entry) -> Result<(), WriteError> {
    writer
        .create_element("item")
        .write_inner_content::<_, WriteError>(|w| {
            let title = entry.title.as_deref().unwrap_or("No title");
            let title = strip_control_chars(title);
            w.create_element("title")
                .write_text_content(BytesText::new(&title))
                .map_err(xml_err)?;

            let published = resolve_timestamp(entry.published, entry.published_raw.as_deref());
            if let Some(published) = published {
                w.create_element("pubDate")
                    .write_text_content(BytesText::new(&published.to_rfc2822()))
                    .map_err(xml_err)?;
            }

            // `updated` has no RSS equivalent and is omitted in this mode.

            let id = rss_guid_value(entry);
            let mut guid_start = BytesStart::new("guid");
            guid_start.push_attribute(("isPermaLink", if looks_like_permalink(&id) { "true" } else { "false" }));
            w.write_event(Event::Start(guid_start)).map_err(xml_err)?;
            w.write_event(Event::Text(BytesText::new(&id))).map_err(xml_err)?;
            w.write_event(Event::End(BytesEnd::new("guid"))).map_err(xml_err)?;

            if let Some(summary) = &entry.summary {
                let summary = strip_control_chars(summary);
                w.create_element("description")
                    .write_text_content(BytesText::new(&summary))
                    .map_err(xml_err)?;
            }

            for enclosure in &entry.enclosures {
                let mut start = BytesStart::new("enclosure");
                start.push_attribute(("url", enclosure.href.as_str()));
                if let Some(ty) = &enclosure.media_type {
                    start.push_attribute(("type", ty.as_str()));
                }
                if let Some(len) = enclosure.length {
                    start.push_attribute(("length", len.to_string().as_str()));
                }
                w.write_event(Event::Empty(start)).map_err(xml_err)?;
            }

            for tag in &entry.tags {
                match &tag.scheme {
                    Some(scheme) => {
                        let mut start = BytesStart::new("category");
                        start.push_attribute(("domain", scheme.as_str()));
                        w.write_event(Event::Start(start)).map_err(xml_err)?;
                        w.write_event(Event::Text(BytesText::new(&tag.term))).map_err(xml_err)?;
                        w.write_event(Event::End(BytesEnd::new("category"))).map_err(xml_err)?;
                    }
                    None => {
                        w.create_element("category")
                            .write_text_content(BytesText::new(&tag.term))
                            .map_err(xml_err)?;
                    }
                }
            }

            if entry.links.is_empty() {
                w.create_element("link")
                    .write_text_content(BytesText::new(&id))
                    .map_err(xml_err)?;
            } else {
                for link in &entry.links {
                    w.create_element("link")
                        .write_text_content(BytesText::new(&link.href))
                        .map_err(xml_err)?;
                }
            }

            let author = entry.author.as_deref().unwrap_or("Anonymous");
            let author = strip_control_chars(author);
            w.create_element("author")
                .write_inner_content::<_, WriteError>(|w| {
                    w.create_element("name")
                        .write_text_content(BytesText::new(&author))
                        .map_err(xml_err)?;
                    Ok(())
                })
                .map_err(xml_err)?;

            Ok(())
        })
        .map_err(xml_err)?;

    Ok(())
}

fn rss_guid_value(entry: &Entry) -> String {
    entry
        .identity()
        .map(str::to_string)
        .unwrap_or_else(|| "hardcoded-id:0000".to_string())
}

fn looks_like_permalink(id: &str) -> bool {
    url::Url::parse(id)
        .map(|u| u.scheme() == "http" || u.scheme() == "https")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_entry() -> Entry {
        Entry {
            id: Some("urn:example:1".to_string()),
            title: Some("Title".to_string()),
            published: None,
            updated: None,
            published_raw: None,
            updated_raw: None,
            summary: None,
            summary_type: None,
            author: None,
            links: vec![],
            enclosures: vec![],
            tags: vec![],
        }
    }

    fn render_atom(entry: &Entry) -> String {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        write_atom_entry(&mut writer, entry).unwrap();
        String::from_utf8(writer.into_inner().into_inner()).unwrap()
    }

    #[test]
    fn permalink_detection() {
        assert!(looks_like_permalink("https://example.com/a"));
        assert!(!looks_like_permalink("tag:example.com,2024:a"));
        assert!(!looks_like_permalink("not-a-uri"));
    }

    #[test]
    fn published_falls_back_to_raw_coercion_when_unparsed() {
        let mut entry = bare_entry();
        entry.published_raw = Some("Mon, 01 Jan 2024 12:00:00 UT".to_string());
        let xml = render_atom(&entry);
        assert!(xml.contains("<published>2024-01-01T12:00:00+00:00</published>"), "{xml}");
    }

    #[test]
    fn title_and_author_have_control_characters_stripped() {
        let mut entry = bare_entry();
        entry.title = Some("bad\x1b[31mtitle".to_string());
        entry.author = Some("bad\x07author".to_string());
        let xml = render_atom(&entry);
        assert!(xml.contains("<title>badtitle</title>"), "{xml}");
        assert!(xml.contains("<name>badauthor</name>"), "{xml}");
    }
}
