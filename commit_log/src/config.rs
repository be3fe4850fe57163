/// Config
///
/// Bounds handed down by the owner of a store+index pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// Limits of a single store+index pair
    pub segment: SegmentConfig,
}

/// SegmentConfig
///
/// `max_index_bytes` sizes the pre-allocated, memory-mapped region of the index.
/// `max_store_bytes` is never enforced by the store itself, the owner compares it
/// against `Store::size` to decide when to roll to a new pair.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentConfig {
    /// Max size of the store file in bytes
    pub max_store_bytes: u64,

    /// Max size of the index file in bytes
    pub max_index_bytes: u64,

    /// Offset of the first record of the commit log
    pub initial_offset: u64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_store_bytes: 1024 * 1024, // 1 MB
            max_index_bytes: 1024 * 1024, // 1 MB
            initial_offset: 0,
        }
    }
}

impl Config {
    /// Return a config with the default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the max size of the store file
    pub fn max_store_bytes(mut self, size: u64) -> Self {
        self.segment.max_store_bytes = size;
        self
    }

    /// Set the max size of the index file
    pub fn max_index_bytes(mut self, size: u64) -> Self {
        self.segment.max_index_bytes = size;
        self
    }

    /// Set the offset of the first record
    pub fn initial_offset(mut self, offset: u64) -> Self {
        self.segment.initial_offset = offset;
        self
    }
}
