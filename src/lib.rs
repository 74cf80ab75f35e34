pub mod common;
pub mod configs;
pub mod sources;

pub use common::errors::{StreamResult, YouTubeError};
pub use configs::Config;
pub use sources::youtube::{StreamClient, StreamInfo, StreamManifest, VideoId};
