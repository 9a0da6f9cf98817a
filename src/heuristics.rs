//! Heuristic scanners (spec §4.7) — the fallback waterfall run when the
//! structured xref/page-tree path fails outright.
//!
//! These operate directly on the byte buffer with [`regex::bytes::Regex`]
//! rather than building a `String`: a byte buffer reinterpreted through PDF's
//! latin-1-adjacent text conventions is already a 1:1 mapping (every byte is
//! its own "character"), so matching on `&[u8]` keeps match offsets as true
//! byte offsets for free — the bijective "latin-1 view" spec.md §9 calls for
//! is exactly what `regex::bytes` already gives us, with no `String`
//! round-trip (and its multi-byte UTF-8 encoding of bytes ≥ 0x80) in the way.

use lazy_static::lazy_static;
use regex::bytes::Regex;

use crate::config::PageCountConfig;
use crate::decoders;

lazy_static! {
    static ref TYPE_PAGES_RE: Regex = Regex::new(r"/Type\s*/Pages\b").unwrap();
    static ref TYPE_PAGE_RE: Regex = Regex::new(r"/Type\s*/Page\b").unwrap();
    static ref COUNT_RE: Regex = Regex::new(r"/Count\s+(-?\d+)").unwrap();
    static ref STREAM_KW_RE: Regex = Regex::new(r"stream\r?\n?").unwrap();
    static ref ENDSTREAM_RE: Regex = Regex::new(r"endstream").unwrap();
    static ref FLATE_FILTER_RE: Regex = Regex::new(r"/FlateDecode").unwrap();
}

/// Window behind/ahead of a `/Type /Pages` match searched for a nearby
/// `/Count` (spec §4.7).
const WINDOW_BEHIND: usize = 1024;
const WINDOW_AHEAD: usize = 50 * 1024;

/// For each `/Type /Pages` occurrence, look in a bounded window for the
/// first `/Count N`, keeping the maximum positive `N` seen; falls back to
/// [`max_count_scan`] when no windowed match is found (spec §4.7's two
/// scanners, folded into the single orchestrator strategy of spec §4.8
/// step 5).
pub fn nearest_count_scan(buf: &[u8]) -> Option<u64> {
    windowed_count_scan(buf).or_else(|| max_count_scan(buf))
}

fn windowed_count_scan(buf: &[u8]) -> Option<u64> {
    let mut best: Option<i64> = None;
    for m in TYPE_PAGES_RE.find_iter(buf) {
        let window_start = m.start().saturating_sub(WINDOW_BEHIND);
        let window_end = (m.end() + WINDOW_AHEAD).min(buf.len());
        let window = &buf[window_start..window_end];
        if let Some(caps) = COUNT_RE.captures(window) {
            if let Some(n) = parse_count_capture(&caps) {
                if n > 0 {
                    best = Some(best.map_or(n, |b| b.max(n)));
                }
            }
        }
    }
    best.map(|n| n as u64)
}

/// Global maximum of any `/Count N` in the buffer (spec §4.8 fallback when
/// the windowed scan finds nothing).
pub fn max_count_scan(buf: &[u8]) -> Option<u64> {
    COUNT_RE
        .captures_iter(buf)
        .filter_map(|caps| parse_count_capture(&caps))
        .filter(|&n| n > 0)
        .max()
        .map(|n| n as u64)
}

/// Count every `/Type /Page` occurrence (word-boundary excludes `/Pages`) in
/// the raw buffer plus every inflated FlateDecode stream body found in it
/// (spec §4.7 last-resort scanner).
pub fn count_page_objects(buf: &[u8], cfg: &PageCountConfig) -> u64 {
    let mut total = TYPE_PAGE_RE.find_iter(buf).count() as u64;
    for body in candidate_inflated_streams(buf, cfg) {
        total += TYPE_PAGE_RE.find_iter(&body).count() as u64;
    }
    total
}

/// [`nearest_count_scan`], repeated over every inflated FlateDecode stream
/// body found in the buffer (spec §4.8 strategy 6).
pub fn nearest_count_scan_in_streams(buf: &[u8], cfg: &PageCountConfig) -> Option<u64> {
    candidate_inflated_streams(buf, cfg).into_iter().filter_map(|body| nearest_count_scan(&body)).max()
}

fn parse_count_capture(caps: &regex::bytes::Captures<'_>) -> Option<i64> {
    let raw = caps.get(1)?.as_bytes();
    std::str::from_utf8(raw).ok()?.parse::<i64>().ok()
}

/// Find `stream … endstream` blocks whose nearby dictionary text advertises
/// `/FlateDecode`, and inflate each (skipping anything over
/// `cfg.max_stream_size`, and anything that fails to inflate at all).
fn candidate_inflated_streams(buf: &[u8], cfg: &PageCountConfig) -> Vec<Vec<u8>> {
    const DICT_LOOKBEHIND: usize = 2048;
    let mut out = Vec::new();
    let mut search_from = 0usize;

    while let Some(stream_match) = STREAM_KW_RE.find_at(buf, search_from) {
        let data_start = stream_match.end();
        let window_start = stream_match.start().saturating_sub(DICT_LOOKBEHIND);
        let window = &buf[window_start..stream_match.start()];

        if FLATE_FILTER_RE.is_match(window) {
            if let Some(end_match) = ENDSTREAM_RE.find_at(buf, data_start) {
                let data_end = end_match.start();
                if data_end > data_start && data_end - data_start <= cfg.max_stream_size {
                    if let Ok(inflated) = decoders::inflate(&buf[data_start..data_end]) {
                        if inflated.len() <= cfg.max_stream_size {
                            out.push(inflated);
                        }
                    }
                }
                search_from = data_end;
                continue;
            }
        }
        search_from = stream_match.end();
    }

    out
}
