//! Domain entity definitions.

mod thumbnail;
mod video;

pub use thumbnail::ThumbnailStatus;
pub use video::VideoId;
