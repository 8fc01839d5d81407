//! Vidgrid - thumbnail loading and caching for a video library browser.
//!
//! This crate provides the pipeline behind a scrolling video grid: a
//! bounded recency cache, two-tier memoization of thumbnail existence
//! checks, and an async priority loader that serves visible items first.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Domain layer containing entities and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;

/// Current version of the library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = "vidgrid";
