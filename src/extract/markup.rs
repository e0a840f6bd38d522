//! Markup (HTML-ish) listing extraction
//!
//! Three passes contribute records, in this order:
//!
//! 1. the text of every table cell (`td`, `th`),
//! 2. the text of every generic text-bearing element ([`TEXT_TAGS`]),
//! 3. the flattened text of the whole document, line by line.
//!
//! Passes do not suppress each other's findings; duplicates are folded later
//! by the merger. The document is read with a lenient quick-xml reader. If it
//! still fails to parse, the raw input is treated as plain text instead.

use super::Origin;
use super::plain;
use crate::record::Record;
use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::Event;
use tracing::{debug, warn};

/// Table cell elements
const CELL_TAGS: [&str; 2] = ["td", "th"];

/// Generic elements whose text is matched as a unit
pub const TEXT_TAGS: [&str; 6] = ["span", "div", "p", "li", "code", "pre"];

/// Elements that never have content or a closing tag in HTML
const VOID_TAGS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

#[derive(Debug, Clone, Copy)]
enum Pass {
    Cell,
    Text,
}

/// An element currently open on the parse stack
#[derive(Debug)]
struct Frame {
    name: String,
    slot: Option<(Pass, usize)>,
}

/// Texts collected from one document, per pass
#[derive(Debug, Default)]
struct Collected {
    cells: Vec<String>,
    blocks: Vec<String>,
    flat: Vec<String>,
}

impl Collected {
    fn push_text(&mut self, stack: &[Frame], text: &str) {
        if text.is_empty() {
            return;
        }
        for frame in stack {
            match frame.slot {
                Some((Pass::Cell, idx)) => self.cells[idx].push_str(text),
                Some((Pass::Text, idx)) => self.blocks[idx].push_str(text),
                None => {}
            }
        }
        self.flat.push(text.to_string());
    }

    fn open(&mut self, name: String) -> Frame {
        let slot = if CELL_TAGS.contains(&name.as_str()) {
            self.cells.push(String::new());
            Some((Pass::Cell, self.cells.len() - 1))
        } else if TEXT_TAGS.contains(&name.as_str()) {
            self.blocks.push(String::new());
            Some((Pass::Text, self.blocks.len() - 1))
        } else {
            None
        };
        Frame { name, slot }
    }
}

fn tag_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_ascii_lowercase()
}

/// Decodes a text node, keeping unknown entities (`&nbsp;`) verbatim
fn decode_text(raw: &[u8]) -> String {
    let raw = String::from_utf8_lossy(raw).into_owned();
    let unescaped = unescape(&raw).map(|text| text.into_owned()).ok();
    unescaped.unwrap_or(raw).trim().to_string()
}

/// Walks the document, returning the per-pass texts
fn collect(text: &str) -> Result<Collected, quick_xml::Error> {
    let mut reader = Reader::from_str(text);
    let config = reader.config_mut();
    config.trim_text(true);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut collected = Collected::default();
    let mut stack: Vec<Frame> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = tag_name(e.name().as_ref());
                if !VOID_TAGS.contains(&name.as_str()) {
                    let frame = collected.open(name);
                    stack.push(frame);
                }
            }
            Event::End(e) => {
                let name = tag_name(e.name().as_ref());
                // Close up to the nearest matching element, ignore stray ends
                if let Some(pos) = stack.iter().rposition(|f| f.name == name) {
                    stack.truncate(pos);
                }
            }
            Event::Text(e) => {
                let text = decode_text(&e);
                collected.push_text(&stack, &text);
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e).trim().to_string();
                collected.push_text(&stack, &text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(collected)
}

/// Extracts every record of a markup document
pub fn extract_text(text: &str, origin: &Origin<'_>) -> Vec<Record> {
    let collected = match collect(text) {
        Ok(collected) => collected,
        Err(e) => {
            warn!(
                "Markup parsing failed for {}: {}, falling back to plain text",
                origin.source, e
            );
            return plain::extract_text(text, origin);
        }
    };

    debug!(
        "{}: {} cells, {} text elements, {} text nodes",
        origin.source,
        collected.cells.len(),
        collected.blocks.len(),
        collected.flat.len()
    );

    let mut records = Vec::new();
    for cell in &collected.cells {
        records.extend(plain::extract_line(cell, origin));
    }
    for block in &collected.blocks {
        records.extend(plain::extract_line(block, origin));
    }
    records.extend(plain::extract_text(&collected.flat.join("\n"), origin));
    records
}
