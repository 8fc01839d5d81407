//! Domain layer with core business entities and port definitions.

/// Entity definitions.
pub mod entities;
/// Port definitions.
pub mod ports;

pub use entities::{ThumbnailStatus, VideoId};
pub use ports::{ProbeError, ProbeResult, ThumbnailProbePort};
