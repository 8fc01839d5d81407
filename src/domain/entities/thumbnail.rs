//! Thumbnail request lifecycle.

/// State of a thumbnail load request.
///
/// Requests start out `Pending`, move to `Processing` when the loader
/// picks them up, and end in exactly one of the terminal states.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ThumbnailStatus {
    /// Queued, not yet picked up by the loader.
    #[default]
    Pending,
    /// The loader is resolving this request right now.
    Processing,
    /// The load finished; the resolved path travels with the event.
    Completed,
    /// Cancelled before processing started.
    Cancelled,
    /// The load failed with an error message.
    Failed(String),
}

impl ThumbnailStatus {
    /// Returns true if the request has not been picked up yet.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns true if the request is being resolved right now.
    #[must_use]
    pub const fn is_processing(&self) -> bool {
        matches!(self, Self::Processing)
    }

    /// Returns true if the load finished successfully.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns true if the load failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns true if the request reached a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed(_))
    }
}
