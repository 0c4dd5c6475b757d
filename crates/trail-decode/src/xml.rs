//! XML change payloads: `attribute` elements carrying a `name` attribute and nested
//! `oldValue` / `newValue` text. Elements may sit at any depth.
//!
//! XML has no null: a missing or empty value element reads as [`RawValue::Null`].

use crate::ChangeDecoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use trail_types::{field_name_matches, DecodeError, FieldDelta, RawValue};

const ATTRIBUTE_TAG: &[u8] = b"attribute";
const OLD_VALUE_TAG: &[u8] = b"oldValue";
const NEW_VALUE_TAG: &[u8] = b"newValue";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Old,
    New,
}

impl Slot {
    fn for_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            OLD_VALUE_TAG => Some(Slot::Old),
            NEW_VALUE_TAG => Some(Slot::New),
            _ => None,
        }
    }
}

fn xml_err(e: impl std::fmt::Display) -> DecodeError {
    DecodeError::Xml(e.to_string())
}

fn is_target(e: &BytesStart<'_>, field: &str) -> Result<bool, DecodeError> {
    if e.local_name().as_ref() != ATTRIBUTE_TAG {
        return Ok(false);
    }
    Ok(name_attribute(e)?.is_some_and(|n| field_name_matches(&n, field)))
}

fn name_attribute(e: &BytesStart<'_>) -> Result<Option<String>, DecodeError> {
    for attr in e.attributes() {
        let attr = attr.map_err(xml_err)?;
        if attr.key.local_name().as_ref() == b"name" {
            return Ok(Some(attr.unescape_value().map_err(xml_err)?.into_owned()));
        }
    }
    Ok(None)
}

/// Values collected inside the matched `attribute` element. Only the first `oldValue`
/// and `newValue` descendants count; their text is concatenated like DOM `textContent`.
#[derive(Default)]
struct Capture {
    depth: usize,
    open: Option<(Slot, usize, String)>,
    old_value: Option<String>,
    new_value: Option<String>,
}

impl Capture {
    fn taken(&self, slot: Slot) -> bool {
        match slot {
            Slot::Old => self.old_value.is_some(),
            Slot::New => self.new_value.is_some(),
        }
    }

    fn store(&mut self, slot: Slot, text: String) {
        match slot {
            Slot::Old => self.old_value = Some(text),
            Slot::New => self.new_value = Some(text),
        }
    }

    fn start(&mut self, tag: &[u8]) {
        self.depth += 1;
        if self.open.is_none() {
            if let Some(slot) = Slot::for_tag(tag).filter(|s| !self.taken(*s)) {
                self.open = Some((slot, self.depth, String::new()));
            }
        }
    }

    fn empty(&mut self, tag: &[u8]) {
        if self.open.is_none() {
            if let Some(slot) = Slot::for_tag(tag).filter(|s| !self.taken(*s)) {
                self.store(slot, String::new());
            }
        }
    }

    /// Returns true when the matched `attribute` element itself closed.
    fn end(&mut self) -> bool {
        if self.depth == 0 {
            return true;
        }
        if matches!(self.open, Some((_, d, _)) if d == self.depth) {
            if let Some((slot, _, text)) = self.open.take() {
                self.store(slot, text);
            }
        }
        self.depth -= 1;
        false
    }

    fn text(&mut self, s: &str) {
        if let Some((_, _, buf)) = self.open.as_mut() {
            buf.push_str(s);
        }
    }

    fn into_delta(self, field: &str) -> FieldDelta {
        let to_raw = |v: Option<String>| match v {
            Some(s) if !s.is_empty() => RawValue::Text(s),
            _ => RawValue::Null,
        };
        FieldDelta::changed(field, to_raw(self.old_value), to_raw(self.new_value))
    }
}

/// Decoder for XML-encoded change payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlChangeDecoder;

impl ChangeDecoder for XmlChangeDecoder {
    fn name(&self) -> &'static str {
        "xml"
    }

    fn decode(&self, payload: &str, field: &str) -> Result<Option<FieldDelta>, DecodeError> {
        // Reader lives for this call only. The whole document is read even after a
        // match so that trailing damage still fails the decode.
        let mut reader = Reader::from_str(payload);
        let mut capture: Option<Capture> = None;
        let mut found: Option<FieldDelta> = None;

        loop {
            let event = reader.read_event().map_err(xml_err)?;
            if let Event::Eof = event {
                break;
            }
            if found.is_some() {
                continue;
            }
            let Some(c) = capture.as_mut() else {
                if let Event::Start(e) | Event::Empty(e) = &event {
                    if is_target(e, field)? {
                        if matches!(event, Event::Empty(_)) {
                            found = Some(Capture::default().into_delta(field));
                        } else {
                            capture = Some(Capture::default());
                        }
                    }
                }
                continue;
            };
            match event {
                Event::Start(e) => c.start(e.local_name().as_ref()),
                Event::Empty(e) => c.empty(e.local_name().as_ref()),
                Event::End(_) => {
                    if c.end() {
                        found = capture.take().map(|c| c.into_delta(field));
                    }
                }
                Event::Text(t) => c.text(&t.unescape().map_err(xml_err)?),
                Event::CData(t) => c.text(&String::from_utf8_lossy(&t)),
                _ => {}
            }
        }
        Ok(found)
    }
}
