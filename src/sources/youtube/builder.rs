use futures::{Stream, StreamExt, TryStreamExt, stream};
use tokio_util::sync::CancellationToken;

use super::{
    cipher::{CipherCache, decipher},
    probe::ContentLengthProber,
    stream_data::StreamData,
    streams::{
        AudioOnlyStreamInfo, Bitrate, Container, DEFAULT_FRAMERATE, FileSize, MuxedStreamInfo,
        Resolution, StreamInfo, VideoOnlyStreamInfo, VideoQuality,
    },
    utils::set_query_parameter,
};
use crate::common::errors::{StreamResult, YouTubeError};

const DEFAULT_SIGNATURE_PARAMETER: &str = "sig";

/// Turns raw stream entries into typed, verified streams.
pub struct StreamInfoBuilder<'a> {
    cipher: &'a CipherCache,
    prober: &'a ContentLengthProber,
}

impl<'a> StreamInfoBuilder<'a> {
    pub fn new(cipher: &'a CipherCache, prober: &'a ContentLengthProber) -> Self {
        Self { cipher, prober }
    }

    /// Builds one stream. `Ok(None)` means the stream URL is dead and the
    /// entry should be left out; structural problems are errors.
    pub async fn build(
        &self,
        data: &StreamData,
        cancel: &CancellationToken,
    ) -> StreamResult<Option<StreamInfo>> {
        let itag = data
            .itag
            .ok_or_else(|| YouTubeError::extraction("stream itag"))?;
        let mut url = data
            .url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| YouTubeError::extraction(format!("stream URL (itag {})", itag)))?;

        if let Some(signature) = data.signature.as_deref().filter(|s| !s.is_empty()) {
            let parameter = data
                .signature_parameter
                .as_deref()
                .filter(|p| !p.is_empty())
                .unwrap_or(DEFAULT_SIGNATURE_PARAMETER);
            let deciphered = decipher(self.cipher, signature, cancel).await?;
            url = set_query_parameter(&url, parameter, &deciphered);
        }

        let Some(content_length) = self.prober.probe(&url, data.content_length, cancel).await? else {
            tracing::debug!("Skipping dead stream (itag {})", itag);
            return Ok(None);
        };

        let container = data
            .container
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .map(Container::new)
            .ok_or_else(|| YouTubeError::extraction(format!("stream container (itag {})", itag)))?;
        let bitrate = data
            .bitrate
            .map(Bitrate)
            .ok_or_else(|| YouTubeError::extraction(format!("stream bitrate (itag {})", itag)))?;
        let size = FileSize(content_length);

        let audio_codec = data.audio_codec.clone().filter(|c| !c.trim().is_empty());
        let video_codec = data.video_codec.clone().filter(|c| !c.trim().is_empty());
        let language = data.audio_track.as_ref().map(|t| t.display_name.clone());

        let info = match (audio_codec, video_codec) {
            (Some(audio_codec), Some(video_codec)) => {
                let (video_quality, video_resolution) = video_format(data, itag)?;
                StreamInfo::Muxed(MuxedStreamInfo {
                    url,
                    container,
                    size,
                    bitrate,
                    audio_codec,
                    video_codec,
                    video_quality,
                    video_resolution,
                    language,
                })
            }
            (None, Some(video_codec)) => {
                let (video_quality, video_resolution) = video_format(data, itag)?;
                StreamInfo::VideoOnly(VideoOnlyStreamInfo {
                    url,
                    container,
                    size,
                    bitrate,
                    video_codec,
                    video_quality,
                    video_resolution,
                })
            }
            (Some(audio_codec), None) => StreamInfo::AudioOnly(AudioOnlyStreamInfo {
                url,
                container,
                size,
                bitrate,
                audio_codec,
                language,
            }),
            (None, None) => {
                return Err(YouTubeError::extraction(format!(
                    "stream codecs (itag {})",
                    itag
                )));
            }
        };

        Ok(Some(info))
    }

    /// Lazily builds `streams` in their original order, running at most
    /// `concurrency` builds at a time. Dead streams are filtered out; the
    /// first error ends the stream.
    pub fn build_all<'s>(
        &'s self,
        streams: &'s [StreamData],
        concurrency: usize,
        cancel: &'s CancellationToken,
    ) -> impl Stream<Item = StreamResult<StreamInfo>> + 's {
        stream::iter(streams)
            .map(move |data| self.build(data, cancel))
            .buffered(concurrency.max(1))
            .try_filter_map(|info| async move { Ok::<_, YouTubeError>(info) })
    }
}

fn video_format(data: &StreamData, itag: u32) -> StreamResult<(VideoQuality, Resolution)> {
    let framerate = data.video_framerate.unwrap_or(DEFAULT_FRAMERATE);
    let quality = match data.video_quality_label.as_deref().filter(|l| !l.trim().is_empty()) {
        Some(label) => VideoQuality::from_label(label, framerate)?,
        None => VideoQuality::from_itag(itag, framerate)?,
    };

    let resolution = match (data.video_width, data.video_height) {
        (Some(width), Some(height)) => Resolution { width, height },
        _ => quality.default_video_resolution(),
    };

    Ok((quality, resolution))
}
