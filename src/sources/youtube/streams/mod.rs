pub mod info;
pub mod manifest;
pub mod quality;

pub use info::*;
pub use manifest::StreamManifest;
pub use quality::{DEFAULT_FRAMERATE, VideoQuality};
