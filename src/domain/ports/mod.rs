mod thumbnail_probe_port;

pub use thumbnail_probe_port::{ProbeError, ProbeResult, ThumbnailProbePort};
