//! Page-tree traverser (spec §4.6).
//!
//! Starting from the trailer's `/Root`, reaches the catalog's `/Pages` and
//! recursively sums leaf pages, trusting a node's `/Count` only when its
//! `/Kids` cannot be resolved. Returns `Ok(0)` (not an error) when neither
//! is available, so the orchestrator can fall through to a cheaper or more
//! heuristic strategy (spec §4.8).

use std::ops::Range;

use crate::config::PageCountConfig;
use crate::error::{Error, Result};
use crate::fields;
use crate::object_reader::{self, ObjectBody};
use crate::objstm;
use crate::xref::XrefMap;

/// Recursion guard against a corrupted or cyclic `/Kids` graph; real PDF
/// page trees are balanced and shallow, so this is generous headroom rather
/// than a realistic limit.
const MAX_DEPTH: u32 = 64;

/// A dictionary (or array) span resolved from either the original buffer or
/// an owned, inflated object-stream body.
enum Resolved {
    Buf(Range<usize>),
    Owned(Vec<u8>, Range<usize>),
}

impl Resolved {
    fn bytes<'a>(&'a self, buf: &'a [u8]) -> &'a [u8] {
        match self {
            Resolved::Buf(span) => &buf[span.clone()],
            Resolved::Owned(body, span) => &body[span.clone()],
        }
    }
}

fn resolve_dict(buf: &[u8], xref: &XrefMap, obj_num: u32, cfg: &PageCountConfig) -> Result<Resolved> {
    if let Some(entry) = xref.direct.get(&obj_num) {
        let obj = object_reader::read_indirect_object(buf, entry.offset)?;
        return match obj.body {
            ObjectBody::Dictionary(span) | ObjectBody::Stream { dict: span, .. } => Ok(Resolved::Buf(span)),
            _ => Err(Error::ParseError {
                offset: entry.offset,
                reason: format!("object {obj_num} is not a dictionary"),
            }),
        };
    }

    if let Some(entry) = xref.compressed.get(&obj_num) {
        let host_offset = xref
            .direct
            .get(&entry.host_objstm)
            .ok_or(Error::MissingField("host ObjStm offset"))?
            .offset;
        let decoded = objstm::decode_entry(buf, host_offset, entry.index_within, cfg)?;
        let span = objstm::find_dict(&decoded.body, decoded.span.clone())
            .ok_or_else(|| Error::Decode(format!("no dictionary found for compressed object {obj_num}")))?;
        return Ok(Resolved::Owned(decoded.body, span));
    }

    Err(Error::MissingField("object not present in xref map"))
}

fn resolve_array(buf: &[u8], xref: &XrefMap, obj_num: u32, cfg: &PageCountConfig) -> Result<Resolved> {
    if let Some(entry) = xref.direct.get(&obj_num) {
        let obj = object_reader::read_indirect_object(buf, entry.offset)?;
        return match obj.body {
            ObjectBody::Array(span) => Ok(Resolved::Buf(span)),
            _ => Err(Error::ParseError {
                offset: entry.offset,
                reason: format!("object {obj_num} is not an array"),
            }),
        };
    }

    if let Some(entry) = xref.compressed.get(&obj_num) {
        let host_offset = xref
            .direct
            .get(&entry.host_objstm)
            .ok_or(Error::MissingField("host ObjStm offset"))?
            .offset;
        let decoded = objstm::decode_entry(buf, host_offset, entry.index_within, cfg)?;
        let span = objstm::find_array(&decoded.body, decoded.span.clone())
            .ok_or_else(|| Error::Decode(format!("no array found for compressed object {obj_num}")))?;
        return Ok(Resolved::Owned(decoded.body, span));
    }

    Err(Error::MissingField("object not present in xref map"))
}

fn resolve_root_pages(buf: &[u8], xref: &XrefMap, cfg: &PageCountConfig) -> Result<u32> {
    let trailer_span = xref.trailer.clone().ok_or(Error::InvalidXref)?;
    let trailer = &buf[trailer_span];
    let (root_num, _) = fields::get_reference(trailer, "Root").ok_or(Error::MissingField("Root"))?;
    let catalog = resolve_dict(buf, xref, root_num, cfg)?;
    let (pages_num, _) =
        fields::get_reference(catalog.bytes(buf), "Pages").ok_or(Error::MissingField("Pages"))?;
    Ok(pages_num)
}

/// Full recursive page-tree traversal (spec §4.8 strategies 1/2): resolves
/// `/Root` → `/Pages`, then walks `/Kids` summing leaf counts. Returns `Ok(0)`
/// if the tree cannot be reached at all, letting the orchestrator fall
/// through rather than erroring outright.
pub fn count_via_page_tree(buf: &[u8], xref: &XrefMap, cfg: &PageCountConfig) -> Result<u64> {
    let pages_num = resolve_root_pages(buf, xref, cfg)?;
    count_node(buf, xref, pages_num, cfg, 0)
}

/// Cheaper strategy (spec §4.8 strategies 3/4): trusts the root `/Pages`
/// node's own `/Count` field without recursing into `/Kids` at all.
pub fn trust_root_count(buf: &[u8], xref: &XrefMap, cfg: &PageCountConfig) -> Result<u64> {
    let pages_num = resolve_root_pages(buf, xref, cfg)?;
    let pages_dict = resolve_dict(buf, xref, pages_num, cfg)?;
    match fields::get_integer(pages_dict.bytes(buf), "Count") {
        Some(n) if n > 0 => Ok(n as u64),
        _ => Ok(0),
    }
}

fn count_node(buf: &[u8], xref: &XrefMap, obj_num: u32, cfg: &PageCountConfig, depth: u32) -> Result<u64> {
    if depth > MAX_DEPTH {
        return Err(Error::RecursionLimitExceeded(MAX_DEPTH));
    }

    let node = resolve_dict(buf, xref, obj_num, cfg)?;
    let dict = node.bytes(buf);

    if fields::get_name(dict, "Type").as_deref() == Some("Page") {
        return Ok(1);
    }

    let kids_refs = if let Some(span) = fields::get_array_span(dict, "Kids") {
        fields::parse_reference_array(&dict[span])
    } else if let Some((kids_num, _)) = fields::get_reference(dict, "Kids") {
        match resolve_array(buf, xref, kids_num, cfg) {
            Ok(arr) => fields::parse_reference_array(arr.bytes(buf)),
            Err(e) => {
                log::debug!("could not resolve /Kids array for object {obj_num}: {e}");
                Vec::new()
            },
        }
    } else {
        Vec::new()
    };

    if !kids_refs.is_empty() {
        let mut total = 0u64;
        for (kid_num, _gen) in kids_refs {
            total += count_node(buf, xref, kid_num, cfg, depth + 1)?;
        }
        return Ok(total);
    }

    match fields::get_integer(dict, "Count") {
        Some(n) if n > 0 => Ok(n as u64),
        _ => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xref::DirectEntry;
    use std::collections::HashMap;

    fn xref_with(direct: Vec<(u32, usize)>, trailer: Range<usize>) -> XrefMap {
        XrefMap {
            direct: direct
                .into_iter()
                .map(|(num, offset)| (num, DirectEntry { offset, gen: 0 }))
                .collect::<HashMap<_, _>>(),
            compressed: HashMap::new(),
            trailer: Some(trailer),
        }
    }

    #[test]
    fn single_page_tree_counts_one() {
        let buf = b"trailer << /Root 1 0 R >>\n\
                    1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n\
                    2 0 obj\n<< /Type /Pages /Count 1 /Kids [3 0 R] >>\nendobj\n\
                    3 0 obj\n<< /Type /Page >>\nendobj\n";
        let obj1 = find(buf, b"1 0 obj");
        let obj2 = find(buf, b"2 0 obj");
        let obj3 = find(buf, b"3 0 obj");
        let trailer_span = 0..buf.windows(2).position(|w| w == b"\n1").unwrap();

        let xref = xref_with(vec![(1, obj1), (2, obj2), (3, obj3)], trailer_span);
        let cfg = PageCountConfig::default();
        assert_eq!(count_via_page_tree(buf, &xref, &cfg).unwrap(), 1);
    }

    #[test]
    fn three_level_fanout_counts_all_leaves() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"trailer << /Root 1 0 R >>\n");
        let mut offsets = HashMap::new();

        offsets.insert(1, buf.len());
        buf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");

        offsets.insert(2, buf.len());
        buf.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Count 4 /Kids [3 0 R 4 0 R] >>\nendobj\n");

        offsets.insert(3, buf.len());
        buf.extend_from_slice(b"3 0 obj\n<< /Type /Pages /Count 2 /Kids [5 0 R 6 0 R] >>\nendobj\n");
        offsets.insert(4, buf.len());
        buf.extend_from_slice(b"4 0 obj\n<< /Type /Pages /Count 2 /Kids [7 0 R 8 0 R] >>\nendobj\n");

        for n in [5, 6, 7, 8] {
            offsets.insert(n, buf.len());
            buf.extend_from_slice(format!("{n} 0 obj\n<< /Type /Page >>\nendobj\n").as_bytes());
        }

        let trailer_span = 0..buf.windows(2).position(|w| w == b"\n1").unwrap();
        let direct: Vec<(u32, usize)> = offsets.into_iter().collect();
        let xref = xref_with(direct, trailer_span);
        let cfg = PageCountConfig::default();
        assert_eq!(count_via_page_tree(&buf, &xref, &cfg).unwrap(), 4);
    }

    #[test]
    fn trust_root_count_skips_recursion() {
        let buf = b"trailer << /Root 1 0 R >>\n\
                    1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n\
                    2 0 obj\n<< /Type /Pages /Count 42 >>\nendobj\n";
        let obj1 = find(buf, b"1 0 obj");
        let obj2 = find(buf, b"2 0 obj");
        let trailer_span = 0..buf.windows(2).position(|w| w == b"\n1").unwrap();
        let xref = xref_with(vec![(1, obj1), (2, obj2)], trailer_span);
        let cfg = PageCountConfig::default();
        assert_eq!(trust_root_count(buf, &xref, &cfg).unwrap(), 42);
    }

    #[test]
    fn missing_kids_and_count_returns_zero_not_error() {
        let buf = b"trailer << /Root 1 0 R >>\n\
                    1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n\
                    2 0 obj\n<< /Type /Pages >>\nendobj\n";
        let obj1 = find(buf, b"1 0 obj");
        let obj2 = find(buf, b"2 0 obj");
        let trailer_span = 0..buf.windows(2).position(|w| w == b"\n1").unwrap();
        let xref = xref_with(vec![(1, obj1), (2, obj2)], trailer_span);
        let cfg = PageCountConfig::default();
        assert_eq!(count_via_page_tree(buf, &xref, &cfg).unwrap(), 0);
    }

    fn find(buf: &[u8], needle: &[u8]) -> usize {
        buf.windows(needle.len()).position(|w| w == needle).unwrap()
    }
}
