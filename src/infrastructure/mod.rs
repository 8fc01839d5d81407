//! Infrastructure layer with external service adapters.

/// Pipeline configuration.
pub mod config;
/// Thumbnail handling (recency caching, existence memoization, async loading).
pub mod thumbnail;

pub use config::{ConfigError, ThumbnailConfig};
pub use thumbnail::{
    CacheStats, DiskThumbnailProbe, RecencyCache, ThumbnailCacheService, ThumbnailEvent,
    ThumbnailLoader,
};
