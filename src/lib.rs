//! # pdf-page-count
//!
//! Resolves the total page count of a PDF file without any external PDF
//! library. Given a file path or an in-memory byte buffer, returns a
//! positive page count or a typed [`error::Error`].
//!
//! ## Architecture
//!
//! The engine is a dependency-ordered stack of parsers, from the most
//! accurate to the most heuristic:
//!
//! 1. [`lex`] — byte-level lexical primitives (whitespace, integers,
//!    balanced `<< … >>` / `[ … ]` spans).
//! 2. [`object_reader`] — reads `N G obj … endobj` at a byte offset.
//! 3. [`xref`] — builds an object-number → location map from the classic
//!    `xref` table and/or cross-reference streams, following `/Prev`.
//! 4. [`objstm`] — decodes objects embedded in compressed object streams.
//! 5. [`page_tree`] — walks `/Root` → `/Pages` → `/Kids`, summing leaves.
//! 6. [`heuristics`] — fallback scanners over raw and inflated stream text
//!    for PDFs too damaged for the structured path.
//!
//! [`count_pages`] and [`count_pages_from_bytes`] sequence these from most
//! accurate to most heuristic and return the first positive count; if every
//! strategy yields nothing, [`error::Error::PageCountNotFound`] is returned.
//! Any failure inside an accurate strategy is caught, logged at `debug`
//! level, and treated as "this strategy failed" so the next one can run —
//! only [`error::Error::PageCountNotFound`] and I/O errors ever reach a
//! caller.

#![warn(missing_docs)]

pub mod config;
pub mod decoders;
pub mod error;
pub mod fields;
pub mod heuristics;
pub mod lex;
pub mod object_reader;
pub mod objstm;
pub mod page_tree;
pub mod xref;

use std::path::Path;

pub use config::PageCountConfig;
pub use error::{Error, Result};

/// Read the file at `path` and resolve its page count, using
/// [`PageCountConfig::default`].
pub fn count_pages(path: impl AsRef<Path>) -> Result<u64> {
    count_pages_with_config(path, &PageCountConfig::default())
}

/// Read the file at `path` and resolve its page count using an explicit
/// configuration.
pub fn count_pages_with_config(path: impl AsRef<Path>, cfg: &PageCountConfig) -> Result<u64> {
    let bytes = std::fs::read(path.as_ref())?;
    count_pages_from_bytes_with_config(&bytes, cfg)
}

/// Resolve the page count of an in-memory PDF buffer, using
/// [`PageCountConfig::default`].
pub fn count_pages_from_bytes(bytes: &[u8]) -> Result<u64> {
    count_pages_from_bytes_with_config(bytes, &PageCountConfig::default())
}

/// Resolve the page count of an in-memory PDF buffer using an explicit
/// configuration.
///
/// Sequences the strategies from spec §4.8 in order, returning the first
/// positive count:
///
/// 1. Full recursive page-tree traversal over the merged xref map (classic
///    table and/or cross-reference streams — whichever the `/Prev` chain
///    actually contains).
/// 2. The root `/Pages` node's own `/Count` field, taken without recursing,
///    guarded against a truncated outline by comparing it with the
///    heuristic page-object count and keeping the larger of the two.
/// 3. A windowed scan for `/Count` near each `/Type /Pages` occurrence in
///    the raw buffer.
/// 4. The same scan repeated over every inflated `FlateDecode` stream body.
/// 5. A raw count of `/Type /Page` occurrences, including those found
///    inside inflated stream bodies.
pub fn count_pages_from_bytes_with_config(bytes: &[u8], cfg: &PageCountConfig) -> Result<u64> {
    if bytes.is_empty() {
        return Err(Error::PageCountNotFound);
    }

    let xref = xref::find_startxref(bytes).and_then(|offset| match xref::build_xref_map(bytes, offset, cfg) {
        Ok(map) => Some(map),
        Err(e) => {
            log::debug!("xref resolution failed: {e}");
            None
        },
    });

    if let Some(xref) = &xref {
        match page_tree::count_via_page_tree(bytes, xref, cfg) {
            Ok(n) if n > 0 => {
                log::debug!("page count resolved via page-tree traversal: {n}");
                return Ok(n);
            },
            Ok(_) => log::debug!("page-tree traversal yielded 0, falling through"),
            Err(e) => log::debug!("page-tree traversal failed: {e}"),
        }

        match page_tree::trust_root_count(bytes, xref, cfg) {
            Ok(n) if n > 0 => {
                let guarded = n.max(heuristics::count_page_objects(bytes, cfg));
                if guarded > 0 {
                    log::debug!("page count resolved via root /Count (guarded): {guarded}");
                    return Ok(guarded);
                }
            },
            Ok(_) => log::debug!("root /Count unavailable or non-positive, falling through"),
            Err(e) => log::debug!("root /Count lookup failed: {e}"),
        }
    }

    if let Some(n) = heuristics::nearest_count_scan(bytes) {
        log::debug!("page count resolved via nearest-/Count raw scan: {n}");
        return Ok(n);
    }

    if let Some(n) = heuristics::nearest_count_scan_in_streams(bytes, cfg) {
        log::debug!("page count resolved via nearest-/Count scan inside inflated streams: {n}");
        return Ok(n);
    }

    let n = heuristics::count_page_objects(bytes, cfg);
    if n > 0 {
        log::debug!("page count resolved via /Type /Page occurrence count: {n}");
        return Ok(n);
    }

    Err(Error::PageCountNotFound)
}

/// Async variant of [`count_pages`], identical in semantics — only the file
/// read happens on the async I/O boundary via `tokio::fs::read`; the parsing
/// engine itself stays synchronous (spec §5).
#[cfg(feature = "async")]
pub async fn count_pages_async(path: impl AsRef<Path>) -> Result<u64> {
    count_pages_async_with_config(path, &PageCountConfig::default()).await
}

/// Async variant of [`count_pages_with_config`].
#[cfg(feature = "async")]
pub async fn count_pages_async_with_config(path: impl AsRef<Path>, cfg: &PageCountConfig) -> Result<u64> {
    let bytes = tokio::fs::read(path.as_ref()).await?;
    count_pages_from_bytes_with_config(&bytes, cfg)
}
