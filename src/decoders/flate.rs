//! FlateDecode (zlib/deflate) decoding, with a raw-deflate fallback.
//!
//! Used wherever the engine needs the bytes behind a `/Filter /FlateDecode`
//! stream: xref streams (§4.4), object streams (§4.5), and the inflated
//! heuristic scans (§4.7).

use std::io::Read;

use flate2::read::{DeflateDecoder, ZlibDecoder};

use crate::error::{Error, Result};

/// Inflate a zlib-wrapped DEFLATE stream (the standard PDF encoding).
///
/// Some producers emit a corrupt or missing zlib header but otherwise valid
/// deflate data; if the zlib path fails outright we retry as raw deflate
/// before giving up. Partial output recovered before a truncation error is
/// still returned, since a short-but-nonempty inflate is strictly more
/// useful to the heuristic scanners than nothing.
pub fn inflate(input: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    match ZlibDecoder::new(input).read_to_end(&mut output) {
        Ok(_) => return Ok(output),
        Err(e) => {
            if !output.is_empty() {
                log::debug!("FlateDecode: partial zlib recovery ({} bytes): {e}", output.len());
                return Ok(output);
            }
        },
    }

    log::debug!("FlateDecode: zlib failed, retrying as raw deflate");
    output.clear();
    match DeflateDecoder::new(input).read_to_end(&mut output) {
        Ok(_) => Ok(output),
        Err(e) => {
            if !output.is_empty() {
                log::debug!("FlateDecode: partial raw-deflate recovery ({} bytes)", output.len());
                Ok(output)
            } else {
                Err(Error::Decode(format!("FlateDecode failed: {e}")))
            }
        },
    }
}
