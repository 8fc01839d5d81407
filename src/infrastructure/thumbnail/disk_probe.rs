//! Filesystem-backed thumbnail probe.

use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
use tokio::fs;
use tracing::trace;

use crate::domain::ports::{ProbeError, ProbeResult, ThumbnailProbePort};

/// Probes the local filesystem for thumbnail files.
///
/// A path only counts as existing when it names a regular file; a
/// directory sitting at the thumbnail path is reported as missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskThumbnailProbe;

impl DiskThumbnailProbe {
    /// Creates a new probe.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ThumbnailProbePort for DiskThumbnailProbe {
    async fn exists(&self, path: &Path) -> ProbeResult<bool> {
        let exists = match fs::metadata(path).await {
            Ok(metadata) => metadata.is_file(),
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                return Err(ProbeError::Io(format!(
                    "Failed to probe {}: {e}",
                    path.display()
                )));
            }
        };
        trace!(path = %path.display(), exists, "Probed thumbnail file");
        Ok(exists)
    }
}
