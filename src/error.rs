//! Error types for the page-count engine.
//!
//! Per spec.md §7, only a handful of these ever reach a caller:
//! [`Error::PageCountNotFound`] and [`Error::Io`]. Everything else is raised
//! by an individual accurate strategy, caught by the orchestrator, logged,
//! and treated as "this strategy failed" so the next one can run.

/// Result type alias for page-count operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while resolving a PDF's page count.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error reading the input file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No accurate or heuristic strategy produced a page count.
    #[error("could not determine page count: no strategy succeeded")]
    PageCountNotFound,

    /// The `startxref` keyword, or the integer following it, could not be found.
    #[error("invalid or missing cross-reference table")]
    InvalidXref,

    /// A structural parse failure at a specific byte offset.
    #[error("failed to parse object at byte {offset}: {reason}")]
    ParseError {
        /// Byte offset where the failure occurred.
        offset: usize,
        /// Human-readable reason.
        reason: String,
    },

    /// A dictionary was missing a field required to proceed.
    #[error("missing required field /{0}")]
    MissingField(&'static str),

    /// A field was present but held a value of the wrong type or out of range.
    #[error("invalid value for /{field}: {reason}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Stream decoding (FlateDecode inflation or predictor reversal) failed.
    #[error("stream decode error: {0}")]
    Decode(String),

    /// `/Prev` chain exceeded the configured hop limit.
    #[error("/Prev chain exceeded {0} hops")]
    PrevChainTooLong(u32),

    /// Recursion depth exceeded while walking the page tree.
    #[error("page tree recursion exceeded {0} levels")]
    RecursionLimitExceeded(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_not_found_message() {
        let err = Error::PageCountNotFound;
        assert!(format!("{err}").contains("page count"));
    }

    #[test]
    fn parse_error_message_contains_offset_and_reason() {
        let err = Error::ParseError {
            offset: 1234,
            reason: "bad header".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("1234"));
        assert!(msg.contains("bad header"));
    }

    #[test]
    fn missing_field_message() {
        let err = Error::MissingField("Root");
        assert!(format!("{err}").contains("/Root"));
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
