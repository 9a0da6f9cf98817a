//! Configuration for page-count resolution.

/// Tunable limits for the page-count engine.
///
/// None of these affect the semantic contract (spec.md §6): they only bound
/// the cost of the heuristic fallback paths and the depth of `/Prev` chains
/// an adversarial or corrupted PDF can force the resolver to walk.
#[derive(Debug, Clone)]
pub struct PageCountConfig {
    /// Maximum size, in bytes, of a decoded (inflated) stream the engine will
    /// hold in memory at once — checked against both the raw, pre-inflate
    /// span and the decoded output, for cross-reference streams, object
    /// streams, and the heuristic scanners' candidate streams alike. Streams
    /// whose raw span or decoded size exceeds this are rejected/skipped
    /// rather than fully materialized, bounding how far a small compressed
    /// stream can expand in memory.
    pub max_stream_size: usize,

    /// Maximum number of `/Prev` hops followed when merging incremental
    /// xref revisions, classic or stream.
    pub max_prev_hops: u32,
}

impl Default for PageCountConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PageCountConfig {
    /// Create a new configuration with defaults (10 MiB stream cap, 10 `/Prev` hops).
    pub fn new() -> Self {
        Self {
            max_stream_size: 10 * 1024 * 1024,
            max_prev_hops: 10,
        }
    }

    /// Override the maximum raw/decoded stream size the engine will handle.
    pub fn with_max_stream_size(mut self, bytes: usize) -> Self {
        self.max_stream_size = bytes;
        self
    }

    /// Override the maximum number of `/Prev` hops followed while resolving xref.
    pub fn with_max_prev_hops(mut self, hops: u32) -> Self {
        self.max_prev_hops = hops;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = PageCountConfig::default();
        assert_eq!(cfg.max_stream_size, 10 * 1024 * 1024);
        assert_eq!(cfg.max_prev_hops, 10);
    }

    #[test]
    fn builder_overrides() {
        let cfg = PageCountConfig::new()
            .with_max_stream_size(1024)
            .with_max_prev_hops(3);
        assert_eq!(cfg.max_stream_size, 1024);
        assert_eq!(cfg.max_prev_hops, 3);
    }
}
