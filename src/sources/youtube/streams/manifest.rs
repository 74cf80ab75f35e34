use serde::Serialize;

use super::info::{AudioOnlyStreamInfo, MuxedStreamInfo, StreamInfo, VideoOnlyStreamInfo};

/// Ordered, immutable set of streams resolved for one video.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamManifest {
    streams: Vec<StreamInfo>,
}

impl StreamManifest {
    pub fn new(streams: Vec<StreamInfo>) -> Self {
        Self { streams }
    }

    pub fn streams(&self) -> &[StreamInfo] {
        &self.streams
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Streams carrying audio: audio-only and muxed.
    pub fn audio_streams(&self) -> impl Iterator<Item = &StreamInfo> {
        self.streams.iter().filter(|s| s.has_audio())
    }

    /// Streams carrying video: video-only and muxed.
    pub fn video_streams(&self) -> impl Iterator<Item = &StreamInfo> {
        self.streams.iter().filter(|s| s.has_video())
    }

    pub fn muxed_streams(&self) -> impl Iterator<Item = &MuxedStreamInfo> {
        self.streams.iter().filter_map(|s| match s {
            StreamInfo::Muxed(m) => Some(m),
            _ => None,
        })
    }

    pub fn audio_only_streams(&self) -> impl Iterator<Item = &AudioOnlyStreamInfo> {
        self.streams.iter().filter_map(|s| match s {
            StreamInfo::AudioOnly(a) => Some(a),
            _ => None,
        })
    }

    pub fn video_only_streams(&self) -> impl Iterator<Item = &VideoOnlyStreamInfo> {
        self.streams.iter().filter_map(|s| match s {
            StreamInfo::VideoOnly(v) => Some(v),
            _ => None,
        })
    }

    pub fn with_highest_bitrate(&self) -> Option<&StreamInfo> {
        self.streams.iter().max_by_key(|s| s.bitrate())
    }

    /// Best video stream by quality, ties broken by bitrate.
    pub fn with_highest_video_quality(&self) -> Option<&StreamInfo> {
        self.video_streams()
            .max_by(|a, b| {
                a.video_quality()
                    .cmp(&b.video_quality())
                    .then_with(|| a.bitrate().cmp(&b.bitrate()))
            })
    }
}

impl IntoIterator for StreamManifest {
    type Item = StreamInfo;
    type IntoIter = std::vec::IntoIter<StreamInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.streams.into_iter()
    }
}
