pub mod builder;
pub mod cipher;
pub mod client;
pub mod controller;
pub mod dash;
pub mod player_response;
pub mod probe;
pub mod stream_data;
pub mod streams;
pub mod utils;
pub mod video_id;

pub use builder::StreamInfoBuilder;
pub use cipher::{CipherCache, CipherManifest, CipherSource, RemoteCipherSource};
pub use client::StreamClient;
pub use controller::{InnertubeController, StreamController};
pub use dash::DashManifest;
pub use player_response::{PlayabilityStatus, PlayerResponse};
pub use probe::ContentLengthProber;
pub use stream_data::StreamData;
pub use streams::*;
pub use video_id::VideoId;
