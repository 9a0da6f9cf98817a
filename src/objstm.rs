//! Object stream (ObjStm) decoder (spec §4.5).
//!
//! Materializes a single compressed object out of a `/Type /ObjStm` stream:
//! inflate the body, read the `(objNum, relOffset)` header of `/N` pairs,
//! and slice out the requested entry. The stream is never decoded into a
//! full object graph (spec.md Non-goals) — callers locate the dictionary or
//! array span they need directly off the returned byte slice, the way
//! [`crate::object_reader`] does for directly-stored objects.

use std::ops::Range;

use crate::config::PageCountConfig;
use crate::decoders;
use crate::error::{Error, Result};
use crate::fields;
use crate::lex;
use crate::object_reader::{self, ObjectBody};

/// The inflated body of an object stream, plus the byte span within it that
/// holds one requested embedded object.
pub struct ObjStmSlice {
    /// Owned, inflated stream body (object streams are always compressed in
    /// practice; this module does not special-case an unfiltered one since
    /// the spec defines the format only in terms of the decoded body).
    pub body: Vec<u8>,
    /// Span of the requested object within `body`.
    pub span: Range<usize>,
}

/// Decode the embedded object at position `index_within` (the same index a
/// compressed xref entry carries, spec §4.4 type 2) out of the `/Type
/// /ObjStm` stream located at `host_offset`.
pub fn decode_entry(
    buf: &[u8],
    host_offset: usize,
    index_within: u32,
    cfg: &PageCountConfig,
) -> Result<ObjStmSlice> {
    let obj = object_reader::read_indirect_object(buf, host_offset)?;
    let (dict_span, data_span) = match obj.body {
        ObjectBody::Stream { dict, data } => (dict, data),
        _ => {
            return Err(Error::ParseError {
                offset: host_offset,
                reason: "expected an object stream".to_string(),
            });
        },
    };

    let dict = &buf[dict_span];
    if fields::get_name(dict, "Type").as_deref() != Some("ObjStm") {
        return Err(Error::MissingField("Type /ObjStm"));
    }

    let n = fields::get_integer(dict, "N").ok_or(Error::MissingField("N"))?;
    let first = fields::get_integer(dict, "First").ok_or(Error::MissingField("First"))?;
    if n < 0 || first < 0 {
        return Err(Error::InvalidField {
            field: "N/First",
            reason: "negative value".to_string(),
        });
    }
    let n = n as usize;
    let first = first as usize;
    let index_within = index_within as usize;
    if index_within >= n {
        return Err(Error::InvalidField {
            field: "index_within",
            reason: format!("{index_within} is out of range for /N {n}"),
        });
    }

    let raw = &buf[data_span];
    if raw.len() > cfg.max_stream_size {
        return Err(Error::Decode("object stream exceeds max_stream_size".to_string()));
    }
    let filter = fields::get_name(dict, "Filter");
    let body = if filter.as_deref() == Some("FlateDecode") {
        decoders::inflate(raw)?
    } else {
        raw.to_vec()
    };
    if body.len() > cfg.max_stream_size {
        return Err(Error::Decode("decoded object stream exceeds max_stream_size".to_string()));
    }

    if first > body.len() {
        return Err(Error::ParseError {
            offset: host_offset,
            reason: "/First is beyond the decoded stream body".to_string(),
        });
    }

    let pairs = parse_pairs(&body[..first], n)?;
    let (_, rel_start) = pairs[index_within];
    let rel_end = pairs.get(index_within + 1).map(|&(_, off)| off).unwrap_or(body.len() - first);

    let start = (first + rel_start).min(body.len());
    let end = (first + rel_end).min(body.len());
    if start > end {
        return Err(Error::ParseError {
            offset: host_offset,
            reason: "inverted object stream entry offsets".to_string(),
        });
    }

    Ok(ObjStmSlice { body, span: start..end })
}

fn parse_pairs(header: &[u8], n: usize) -> Result<Vec<(u32, usize)>> {
    let mut pairs = Vec::with_capacity(n);
    let mut pos = 0usize;
    for _ in 0..n {
        pos = lex::skip_whitespace(header, pos);
        let (num, next) = lex::read_integer(header, pos).ok_or_else(|| {
            Error::Decode("truncated object stream header (object number)".to_string())
        })?;
        pos = lex::skip_whitespace(header, next);
        let (off, next) = lex::read_integer(header, pos)
            .ok_or_else(|| Error::Decode("truncated object stream header (offset)".to_string()))?;
        pos = next;
        pairs.push((num.max(0) as u32, off.max(0) as usize));
    }
    Ok(pairs)
}

/// Locate the `<< … >>` dictionary span that begins somewhere inside
/// `body[span]` (spec §4.5: "the object's dictionary begins at the first
/// `<<`"). Returns `None` if the slice holds no dictionary.
pub fn find_dict(body: &[u8], span: Range<usize>) -> Option<Range<usize>> {
    let slice = &body[span.clone()];
    let rel = slice.windows(2).position(|w| w == b"<<")?;
    lex::read_dict_span(body, span.start + rel).map(|(dict_span, _)| dict_span)
}

/// Locate the `[ … ]` array span that begins somewhere inside `body[span]`
/// (used when a compressed object is an array, e.g. a `/Kids` array stored
/// inside an ObjStm rather than inline in its parent dictionary).
pub fn find_array(body: &[u8], span: Range<usize>) -> Option<Range<usize>> {
    let slice = &body[span.clone()];
    let rel = slice.iter().position(|&b| b == b'[')?;
    lex::read_array_span(body, span.start + rel).map(|(arr_span, _)| arr_span)
}
