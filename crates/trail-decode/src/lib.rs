//! Change payload decoding.
//!
//! Audit payloads come in two undeclared encodings: a JSON object with a
//! `changedAttributes` list, or an XML document of `attribute` elements. [`decode`] sniffs
//! the encoding, runs the matching [`ChangeDecoder`], and collapses decode errors to `None`
//! so one corrupt entry never aborts a whole history.

mod json;
mod xml;

pub use json::JsonChangeDecoder;
pub use trail_types::{DecodeError, FieldDelta, RawValue};
pub use xml::XmlChangeDecoder;

/// Extracts the delta for one field from a change payload.
pub trait ChangeDecoder: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// `Ok(None)` when the payload parses but does not mention `field`.
    fn decode(&self, payload: &str, field: &str) -> Result<Option<FieldDelta>, DecodeError>;
}

/// Encoding detected from the payload's first non-whitespace character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadEncoding {
    Json,
    Xml,
}

impl PayloadEncoding {
    pub fn sniff(payload: &str) -> Self {
        if payload.trim_start().starts_with('{') {
            PayloadEncoding::Json
        } else {
            PayloadEncoding::Xml
        }
    }
}

static JSON_DECODER: JsonChangeDecoder = JsonChangeDecoder;
static XML_DECODER: XmlChangeDecoder = XmlChangeDecoder;

/// Decoder for the sniffed encoding of `payload`.
pub fn decoder_for(payload: &str) -> &'static dyn ChangeDecoder {
    match PayloadEncoding::sniff(payload) {
        PayloadEncoding::Json => &JSON_DECODER,
        PayloadEncoding::Xml => &XML_DECODER,
    }
}

/// Decode the delta for `field`, if any. Missing, empty, and malformed payloads yield `None`.
pub fn decode(payload: Option<&str>, field: &str) -> Option<FieldDelta> {
    let payload = payload.filter(|p| !p.is_empty())?;
    let decoder = decoder_for(payload);
    match decoder.decode(payload, field) {
        Ok(delta) => delta,
        Err(e) => {
            tracing::warn!(decoder = decoder.name(), field, error = %e, "Error parsing change payload");
            None
        }
    }
}
