//! Port definition for thumbnail existence probing.

use std::path::Path;

/// Result type for probe operations.
pub type ProbeResult<T> = std::result::Result<T, ProbeError>;

/// Errors that can occur while probing for a thumbnail file.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProbeError {
    /// I/O error while checking the filesystem.
    #[error("IO error: {0}")]
    Io(String),
}

/// Port for checking whether a thumbnail file exists on disk.
/// Implementations must be thread-safe.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ThumbnailProbePort: Send + Sync {
    /// Returns true if a usable thumbnail file exists at `path`.
    ///
    /// # Errors
    /// Returns `ProbeError::Io` when the existence check itself fails.
    async fn exists(&self, path: &Path) -> ProbeResult<bool>;
}
