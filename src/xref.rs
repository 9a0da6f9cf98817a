//! Cross-reference resolver (spec §4.3, §4.4).
//!
//! Builds a map from object number to location — either a direct byte offset
//! ([`DirectEntry`]) or a slot inside an object stream ([`CompressedEntry`])
//! — by following the `startxref` pointer and then the `/Prev` chain.
//! A single chain can legitimately mix classic `xref` tables and
//! cross-reference streams across revisions (spec §4.4 point 4), so
//! [`build_xref_map`] dispatches per hop rather than committing to one
//! format for the whole chain. First-seen wins when merging revisions,
//! for both offsets and the trailer dictionary (spec §4.3, §9).

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use crate::config::PageCountConfig;
use crate::decoders;
use crate::error::{Error, Result};
use crate::fields;
use crate::lex;
use crate::object_reader::{self, ObjectBody};

/// Location of an object stored directly in the byte buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectEntry {
    /// Byte offset of the `N G obj` header.
    pub offset: usize,
    /// Generation number.
    pub gen: u16,
}

/// Location of an object embedded in an object stream (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressedEntry {
    /// Object number of the hosting `/Type /ObjStm` stream.
    pub host_objstm: u32,
    /// Index of this object within the stream's `(objNum, offset)` header.
    pub index_within: u32,
}

/// The merged result of walking a `/Prev` chain of xref revisions.
#[derive(Debug, Default)]
pub struct XrefMap {
    /// Directly-located objects.
    pub direct: HashMap<u32, DirectEntry>,
    /// Objects located inside an object stream.
    pub compressed: HashMap<u32, CompressedEntry>,
    /// Byte span of the first-seen (latest revision) trailer dictionary,
    /// or the xref stream's own dictionary when the latest revision is a
    /// stream.
    pub trailer: Option<Range<usize>>,
}

struct Revision {
    direct: Vec<(u32, DirectEntry)>,
    compressed: Vec<(u32, CompressedEntry)>,
    trailer: Range<usize>,
    prev: Option<usize>,
}

/// Scan backward from end-of-file for `startxref`, returning the integer
/// offset that follows it (spec §4.3).
pub fn find_startxref(buf: &[u8]) -> Option<usize> {
    const NEEDLE: &[u8] = b"startxref";
    if buf.len() < NEEDLE.len() {
        return None;
    }
    let pos = buf.windows(NEEDLE.len()).rposition(|w| w == NEEDLE)?;
    let pos = lex::skip_whitespace(buf, pos + NEEDLE.len());
    let (value, _) = lex::read_integer(buf, pos)?;
    if value < 0 || value as usize >= buf.len() {
        return None;
    }
    Some(value as usize)
}

/// Build the merged cross-reference map starting at `start_offset`,
/// following `/Prev` up to `cfg.max_prev_hops` times.
pub fn build_xref_map(buf: &[u8], start_offset: usize, cfg: &PageCountConfig) -> Result<XrefMap> {
    let mut map = XrefMap::default();
    let mut next = Some(start_offset);
    let mut hops = 0u32;
    let mut visited = HashSet::new();

    while let Some(offset) = next {
        if hops > cfg.max_prev_hops {
            return Err(Error::PrevChainTooLong(cfg.max_prev_hops));
        }
        if !visited.insert(offset) {
            log::warn!("xref /Prev chain revisited offset {offset}, stopping to break the cycle");
            break;
        }

        let revision = parse_revision(buf, offset, cfg)?;
        for (num, entry) in revision.direct {
            map.direct.entry(num).or_insert(entry);
        }
        for (num, entry) in revision.compressed {
            map.compressed.entry(num).or_insert(entry);
        }
        if map.trailer.is_none() {
            map.trailer = Some(revision.trailer);
        }

        next = revision.prev;
        hops += 1;
    }

    if map.trailer.is_none() {
        return Err(Error::InvalidXref);
    }
    Ok(map)
}

fn parse_revision(buf: &[u8], offset: usize, cfg: &PageCountConfig) -> Result<Revision> {
    let probe = lex::skip_whitespace(buf, offset);
    if lex::starts_with(buf, probe, b"xref") {
        parse_classic_revision(buf, probe)
    } else {
        parse_stream_revision(buf, offset, cfg)
    }
}

fn parse_classic_revision(buf: &[u8], offset: usize) -> Result<Revision> {
    let (_, mut pos) = lex::read_keyword(buf, offset).ok_or(Error::InvalidXref)?;
    let mut direct = Vec::new();

    loop {
        pos = lex::skip_whitespace(buf, pos);
        if lex::starts_with(buf, pos, b"trailer") {
            pos += "trailer".len();
            break;
        }

        let (first, next) = lex::read_integer(buf, pos).ok_or_else(|| Error::ParseError {
            offset: pos,
            reason: "expected xref subsection header".to_string(),
        })?;
        pos = lex::skip_whitespace(buf, next);
        let (count, next) = lex::read_integer(buf, pos).ok_or_else(|| Error::ParseError {
            offset: pos,
            reason: "expected xref subsection count".to_string(),
        })?;
        pos = next;

        if first < 0 || count < 0 {
            return Err(Error::ParseError {
                offset: pos,
                reason: "negative xref subsection header".to_string(),
            });
        }

        for i in 0..count as u32 {
            pos = lex::skip_whitespace(buf, pos);
            let (off_val, next) = lex::read_integer(buf, pos).ok_or_else(|| Error::ParseError {
                offset: pos,
                reason: "expected xref entry offset".to_string(),
            })?;
            pos = lex::skip_whitespace(buf, next);
            let (gen_val, next) = lex::read_integer(buf, pos).ok_or_else(|| Error::ParseError {
                offset: pos,
                reason: "expected xref entry generation".to_string(),
            })?;
            pos = lex::skip_whitespace(buf, next);
            let flag = *buf.get(pos).ok_or_else(|| Error::ParseError {
                offset: pos,
                reason: "truncated xref entry".to_string(),
            })?;
            pos += 1;

            if flag == b'n' && off_val >= 0 {
                direct.push((
                    first as u32 + i,
                    DirectEntry {
                        offset: off_val as usize,
                        gen: gen_val.max(0) as u16,
                    },
                ));
            }
        }
    }

    pos = lex::skip_whitespace(buf, pos);
    let (trailer_span, _) = lex::read_dict_span(buf, pos).ok_or(Error::MissingField("trailer"))?;
    let trailer_bytes = &buf[trailer_span.clone()];
    let prev = fields::get_integer(trailer_bytes, "Prev")
        .filter(|&p| p >= 0 && (p as usize) < buf.len())
        .map(|p| p as usize);

    Ok(Revision {
        direct,
        compressed: Vec::new(),
        trailer: trailer_span,
        prev,
    })
}

fn parse_stream_revision(buf: &[u8], offset: usize, cfg: &PageCountConfig) -> Result<Revision> {
    let obj = object_reader::read_indirect_object(buf, offset)?;
    let (dict_span, data_span) = match obj.body {
        ObjectBody::Stream { dict, data } => (dict, data),
        _ => {
            return Err(Error::ParseError {
                offset,
                reason: "expected a cross-reference stream object".to_string(),
            });
        },
    };

    let dict = &buf[dict_span.clone()];
    if fields::get_name(dict, "Type").as_deref() != Some("XRef") {
        return Err(Error::MissingField("Type /XRef"));
    }

    let size = fields::get_integer(dict, "Size").ok_or(Error::MissingField("Size"))?;
    let w = parse_w_array(dict)?;
    let index = parse_index_array(dict, size);

    let raw = &buf[data_span];
    if raw.len() > cfg.max_stream_size {
        return Err(Error::Decode("cross-reference stream exceeds max_stream_size".to_string()));
    }
    let body = decode_xref_stream_body(dict, raw, &w)?;
    if body.len() > cfg.max_stream_size {
        return Err(Error::Decode("decoded cross-reference stream exceeds max_stream_size".to_string()));
    }

    let (direct, compressed) = extract_entries(&body, w, &index);

    let prev = fields::get_integer(dict, "Prev")
        .filter(|&p| p >= 0 && (p as usize) < buf.len())
        .map(|p| p as usize);

    Ok(Revision {
        direct,
        compressed,
        trailer: dict_span,
        prev,
    })
}

fn parse_w_array(dict: &[u8]) -> Result<[usize; 3]> {
    let span = fields::get_array_span(dict, "W").ok_or(Error::MissingField("W"))?;
    let values = fields::parse_integer_array(&dict[span]);
    if values.len() < 3 {
        return Err(Error::InvalidField {
            field: "W",
            reason: "expected three field widths".to_string(),
        });
    }
    Ok([
        values[0].max(0) as usize,
        values[1].max(0) as usize,
        values[2].max(0) as usize,
    ])
}

fn parse_index_array(dict: &[u8], size: i64) -> Vec<(u32, u32)> {
    match fields::get_array_span(dict, "Index") {
        Some(span) => {
            let values = fields::parse_integer_array(&dict[span]);
            values
                .chunks(2)
                .filter(|c| c.len() == 2)
                .map(|c| (c[0].max(0) as u32, c[1].max(0) as u32))
                .collect()
        },
        None => vec![(0, size.max(0) as u32)],
    }
}

fn decode_xref_stream_body(dict: &[u8], raw: &[u8], w: &[usize; 3]) -> Result<Vec<u8>> {
    let filter = fields::get_name(dict, "Filter");
    let mut body = if filter.as_deref() == Some("FlateDecode") {
        decoders::inflate(raw)?
    } else {
        raw.to_vec()
    };

    if let Some(parms_span) = fields::get_dict_span(dict, "DecodeParms") {
        let parms = &dict[parms_span];
        let predictor = fields::get_integer(parms, "Predictor").unwrap_or(1);
        if predictor >= 10 {
            let default_columns = (w[0] + w[1] + w[2]).max(1) as i64;
            let columns = fields::get_integer(parms, "Columns").unwrap_or(default_columns).max(1) as usize;
            let params = decoders::DecodeParams {
                predictor,
                columns,
                colors: 1,
                bits_per_component: 8,
            };
            body = decoders::decode_predictor(&body, &params)?;
        }
    }

    Ok(body)
}

fn extract_entries(
    body: &[u8],
    w: [usize; 3],
    index: &[(u32, u32)],
) -> (Vec<(u32, DirectEntry)>, Vec<(u32, CompressedEntry)>) {
    let entry_width = w[0] + w[1] + w[2];
    let mut direct = Vec::new();
    let mut compressed = Vec::new();
    if entry_width == 0 {
        return (direct, compressed);
    }

    let mut pos = 0usize;
    for &(start, count) in index {
        for i in 0..count {
            if pos + entry_width > body.len() {
                return (direct, compressed);
            }
            let obj_num = start + i;

            let field_type = if w[0] == 0 {
                1
            } else {
                read_be(&body[pos..pos + w[0]])
            };
            pos += w[0];
            let f2 = read_be(&body[pos..pos + w[1]]);
            pos += w[1];
            let f3 = read_be(&body[pos..pos + w[2]]);
            pos += w[2];

            match field_type {
                0 => {},
                1 => direct.push((
                    obj_num,
                    DirectEntry {
                        offset: f2 as usize,
                        gen: f3 as u16,
                    },
                )),
                2 => compressed.push((
                    obj_num,
                    CompressedEntry {
                        host_objstm: f2 as u32,
                        index_within: f3 as u32,
                    },
                )),
                _ => {},
            }
        }
    }

    (direct, compressed)
}

fn read_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_startxref_near_eof() {
        let buf = b"...garbage...\nstartxref\n1234\n%%EOF";
        assert_eq!(find_startxref(buf), Some(1234));
    }

    #[test]
    fn missing_startxref_returns_none() {
        assert_eq!(find_startxref(b"not a pdf"), None);
    }

    #[test]
    fn parses_minimal_classic_xref() {
        let buf = b"xref\n0 2\n0000000000 65535 f \n0000000018 00000 n \ntrailer\n<< /Size 2 /Root 1 0 R >>\n";
        let cfg = PageCountConfig::default();
        let map = build_xref_map(buf, 0, &cfg).unwrap();
        assert_eq!(map.direct.get(&1), Some(&DirectEntry { offset: 18, gen: 0 }));
        assert!(!map.direct.contains_key(&0));
        let trailer = &buf[map.trailer.clone().unwrap()];
        assert_eq!(fields::get_reference(trailer, "Root"), Some((1, 0)));
    }

    #[test]
    fn classic_prev_chain_first_wins() {
        let mut buf = Vec::new();
        // Older revision at offset 0.
        let older_offset = 0usize;
        buf.extend_from_slice(b"xref\n0 2\n0000000000 65535 f \n0000000099 00000 n \ntrailer\n<< /Size 2 /Root 1 0 R >>\n");
        let newer_offset = buf.len();
        buf.extend_from_slice(
            format!(
                "xref\n0 2\n0000000000 65535 f \n0000000111 00000 n \ntrailer\n<< /Size 2 /Root 1 0 R /Prev {older_offset} >>\n"
            )
            .as_bytes(),
        );

        let cfg = PageCountConfig::default();
        let map = build_xref_map(&buf, newer_offset, &cfg).unwrap();
        // Newer revision's offset for object 1 (111) wins over the older (99).
        assert_eq!(map.direct.get(&1).unwrap().offset, 111);
    }

    #[test]
    fn xref_stream_decodes_uncompressed_entries() {
        // W = [1 1 1], two entries: free(type 0), direct at offset 42.
        let entries: Vec<u8> = vec![0, 0, 0, 1, 42, 0];
        let mut buf = Vec::new();
        let stream_obj_offset = 0usize;
        buf.extend_from_slice(b"1 0 obj\n");
        buf.extend_from_slice(
            format!("<< /Type /XRef /Size 2 /W [1 1 1] /Index [0 2] /Length {} >>\n", entries.len())
                .as_bytes(),
        );
        buf.extend_from_slice(b"stream\n");
        buf.extend_from_slice(&entries);
        buf.extend_from_slice(b"\nendstream\nendobj\n");

        let cfg = PageCountConfig::default();
        let map = build_xref_map(&buf, stream_obj_offset, &cfg).unwrap();
        assert_eq!(map.direct.get(&1), Some(&DirectEntry { offset: 42, gen: 0 }));
        assert!(!map.direct.contains_key(&0));
    }

    #[test]
    fn decoded_xref_stream_exceeding_cap_is_rejected_even_when_compressed_body_is_small() {
        use flate2::{Compression, write::ZlibEncoder};
        use std::io::Write;

        // W = [1 1 1], a large run of identical free (type 0) entries: tiny
        // once compressed, large once inflated.
        const ROWS: usize = 1 << 18;
        let entries = vec![0u8; ROWS * 3];
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(&entries).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut buf = Vec::new();
        buf.extend_from_slice(b"1 0 obj\n");
        buf.extend_from_slice(
            format!(
                "<< /Type /XRef /Size {ROWS} /W [1 1 1] /Index [0 {ROWS}] /Filter /FlateDecode /Length {} >>\n",
                compressed.len()
            )
            .as_bytes(),
        );
        buf.extend_from_slice(b"stream\n");
        buf.extend_from_slice(&compressed);
        buf.extend_from_slice(b"\nendstream\nendobj\n");

        // Compressed body comfortably fits under the cap; only the decoded
        // size blows past it.
        let cfg = PageCountConfig::default().with_max_stream_size(4096);
        assert!(compressed.len() < cfg.max_stream_size);
        assert!(build_xref_map(&buf, 0, &cfg).is_err());
    }

    #[test]
    fn self_referencing_prev_breaks_the_cycle() {
        // A /Prev pointing back at the current offset must not loop forever.
        let buf = b"xref\n0 1\n0000000000 65535 f \ntrailer\n<< /Size 1 /Root 1 0 R /Prev 0 >>\n";
        let cfg = PageCountConfig::default().with_max_prev_hops(3);
        let map = build_xref_map(buf, 0, &cfg).unwrap();
        assert!(map.trailer.is_some());
    }
}
