//! Stream decoders needed by the page-count engine.
//!
//! The only filter the engine ever needs to reverse is `/FlateDecode`, and
//! the only pre-filter on top of it is the PNG predictor (spec §4.4, §4.5,
//! §4.7). Everything else a general-purpose PDF library would decode —
//! LZW, ASCII85, DCT, CCITT, JBIG2 — is out of scope: the engine only ever
//! needs to read integers out of a dictionary or count substring
//! occurrences, never to reproduce image or text content.

pub mod flate;
pub mod predictor;

pub use flate::inflate;
pub use predictor::{DecodeParams, decode_predictor};
