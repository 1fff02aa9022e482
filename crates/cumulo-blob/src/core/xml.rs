use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;

use crate::data::PageRange;
use crate::error::{Error, Result};

/// Valid and cleared ranges from a `comp=pagelist` body.
pub fn parse_page_list(body: &[u8]) -> Result<(Vec<PageRange>, Vec<PageRange>)> {
    let mut reader = Reader::from_reader(body);
    reader.trim_text(true);

    let mut pages = Vec::new();
    let mut cleared = Vec::new();
    let mut current_tag = String::new();
    let mut in_range: Option<bool> = None;
    let mut start: Option<u64> = None;
    let mut end: Option<u64> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                current_tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match current_tag.as_str() {
                    "PageRange" => in_range = Some(false),
                    "ClearRange" => in_range = Some(true),
                    _ => {}
                }
            }
            Event::Text(ref e) if in_range.is_some() => {
                let value = e.unescape()?;
                let parsed = value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| Error::Xml(format!("invalid {current_tag} value {value:?}")))?;
                match current_tag.as_str() {
                    "Start" => start = Some(parsed),
                    "End" => end = Some(parsed),
                    _ => {}
                }
            }
            Event::End(ref e) => {
                let name = e.name();
                let is_clear = match name.as_ref() {
                    b"PageRange" => Some(false),
                    b"ClearRange" => Some(true),
                    _ => None,
                };
                if let Some(is_clear) = is_clear {
                    let (Some(first), Some(last)) = (start.take(), end.take()) else {
                        return Err(Error::Xml("page range without Start and End".into()));
                    };
                    if last < first {
                        return Err(Error::Xml(format!("page range ends at {last} before it starts at {first}")));
                    }
                    let range = PageRange {
                        offset: first,
                        length: last - first + 1,
                    };
                    if is_clear { cleared.push(range) } else { pages.push(range) }
                    in_range = None;
                }
                current_tag.clear();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok((pages, cleared))
}

/// `Code` and `Message` from a service error body. Missing or unreadable
/// elements come back as `None`.
pub fn parse_error_body(body: &[u8]) -> (Option<String>, Option<String>) {
    let mut reader = Reader::from_reader(body);
    reader.trim_text(true);

    let mut code = None;
    let mut message = None;
    let mut current_tag = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                current_tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
            }
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().unwrap_or_default().into_owned();
                match current_tag.as_str() {
                    "Code" => code = Some(text),
                    "Message" => message = Some(text),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => current_tag.clear(),
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    (code, message)
}

/// Body of a `comp=blocklist` commit listing `ids` as latest blocks.
pub fn render_block_list(ids: &[String]) -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="utf-8"?><BlockList>"#);
    for id in ids {
        xml.push_str("<Latest>");
        xml.push_str(&escape(id.as_str()));
        xml.push_str("</Latest>");
    }
    xml.push_str("</BlockList>");
    xml
}
