//! Pipeline configuration.

pub mod thumbnail_config;

pub use thumbnail_config::{ConfigError, DEFAULT_CACHE_MAX_SIZE, ThumbnailConfig};
