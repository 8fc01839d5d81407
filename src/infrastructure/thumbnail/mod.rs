//! Thumbnail handling infrastructure.
//!
//! This module provides:
//! - A bounded recency cache primitive with LRU eviction
//! - Thumbnail existence memoization with pinned and reclaimable tiers
//! - An async, prioritized, cancellable loading pipeline

pub mod cache_service;
pub mod disk_probe;
pub mod loader;
pub mod recency;

pub use cache_service::{CacheStats, ThumbnailCacheService};
pub use disk_probe::DiskThumbnailProbe;
pub use loader::{ThumbnailEvent, ThumbnailLoader};
pub use recency::RecencyCache;
