//! Store configuration.

/// Configuration for opening a [`crate::LocalStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Whether to flush the backend after every journal frame.
    pub sync_on_write: bool,

    /// Journal size after which the store rewrites itself as one snapshot.
    pub compact_threshold: u64,

    /// Upper bound on the journal size (`None` = unlimited).
    pub quota_bytes: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sync_on_write: true,
            compact_threshold: 4 * 1024 * 1024, // 4 MB
            quota_bytes: None,
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to flush after every frame.
    #[must_use]
    pub const fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }

    /// Sets the compaction threshold in bytes.
    #[must_use]
    pub const fn compact_threshold(mut self, bytes: u64) -> Self {
        self.compact_threshold = bytes;
        self
    }

    /// Sets a storage quota in bytes.
    #[must_use]
    pub const fn quota_bytes(mut self, bytes: u64) -> Self {
        self.quota_bytes = Some(bytes);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = StoreConfig::default();
        assert!(config.sync_on_write);
        assert_eq!(config.compact_threshold, 4 * 1024 * 1024);
        assert!(config.quota_bytes.is_none());
    }

    #[test]
    fn builder_pattern() {
        let config = StoreConfig::new()
            .sync_on_write(false)
            .compact_threshold(1024)
            .quota_bytes(64 * 1024);

        assert!(!config.sync_on_write);
        assert_eq!(config.compact_threshold, 1024);
        assert_eq!(config.quota_bytes, Some(64 * 1024));
    }
}
