use serde_json::Value;

use super::utils::{get_query_parameter, get_query_parameters};

/// YouTube reports AV1 streams with this codec name in some responses.
const UNKNOWN_VIDEO_CODEC: &str = "unknown";
const AV1_FALLBACK_CODEC: &str = "av01.0.05M.08";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioTrack {
    pub display_name: String,
}

/// Raw, possibly incomplete attributes of one stream entry. Built once from the
/// response and never modified afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamData {
    pub itag: Option<u32>,
    pub url: Option<String>,
    pub signature: Option<String>,
    pub signature_parameter: Option<String>,
    pub content_length: Option<u64>,
    pub bitrate: Option<u64>,
    pub container: Option<String>,
    pub audio_codec: Option<String>,
    pub video_codec: Option<String>,
    pub video_quality_label: Option<String>,
    pub video_width: Option<u32>,
    pub video_height: Option<u32>,
    pub video_framerate: Option<u32>,
    pub audio_track: Option<AudioTrack>,
}

impl StreamData {
    /// Reads one entry of `streamingData.formats` / `streamingData.adaptiveFormats`.
    pub fn from_json(format: &Value) -> Self {
        let cipher = format
            .get("cipher")
            .or_else(|| format.get("signatureCipher"))
            .and_then(|c| c.as_str())
            .map(get_query_parameters);

        let url = format
            .get("url")
            .and_then(|u| u.as_str())
            .map(str::to_string)
            .or_else(|| cipher.as_ref().and_then(|c| c.get("url").cloned()));

        let signature = cipher.as_ref().and_then(|c| c.get("s").cloned());
        let signature_parameter = cipher.as_ref().and_then(|c| c.get("sp").cloned());

        let content_length = format
            .get("contentLength")
            .and_then(value_as_u64)
            .or_else(|| {
                url.as_deref()
                    .and_then(|u| get_query_parameter(u, "clen"))
                    .and_then(|s| s.parse().ok())
            });

        let mime_type = format.get("mimeType").and_then(|m| m.as_str());
        let (container, audio_codec, video_codec) = match mime_type {
            Some(mime) => parse_mime_type(mime),
            None => (None, None, None),
        };

        let audio_track = format
            .get("audioTrack")
            .and_then(|t| t.get("displayName"))
            .and_then(|n| n.as_str())
            .filter(|n| !n.trim().is_empty())
            .map(|n| AudioTrack {
                display_name: n.to_string(),
            });

        Self {
            itag: format.get("itag").and_then(value_as_u32),
            url,
            signature,
            signature_parameter,
            content_length,
            bitrate: format.get("bitrate").and_then(value_as_u64),
            container,
            audio_codec,
            video_codec,
            video_quality_label: format
                .get("qualityLabel")
                .and_then(|q| q.as_str())
                .map(str::to_string),
            video_width: format.get("width").and_then(value_as_u32),
            video_height: format.get("height").and_then(value_as_u32),
            video_framerate: format.get("fps").and_then(value_as_u32),
            audio_track,
        }
    }
}

/// Splits `video/mp4; codecs="avc1.42001E, mp4a.40.2"` into
/// (container, audio codec, video codec).
pub fn parse_mime_type(mime: &str) -> (Option<String>, Option<String>, Option<String>) {
    let essence = mime.split(';').next().unwrap_or(mime).trim();
    let is_audio_only = essence.to_ascii_lowercase().starts_with("audio/");

    let container = essence
        .split_once('/')
        .map(|(_, sub)| sub.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let codecs = mime
        .split_once("codecs=\"")
        .map(|(_, rest)| rest.split('"').next().unwrap_or(rest))
        .filter(|c| !c.trim().is_empty());

    let Some(codecs) = codecs else {
        return (container, None, None);
    };

    if is_audio_only {
        return (container, Some(codecs.to_string()), None);
    }

    let (video, audio) = match codecs.split_once(", ") {
        Some((v, a)) => (v, Some(a)),
        None => (codecs, None),
    };

    let video_codec = non_blank(video).map(|v| {
        if v == UNKNOWN_VIDEO_CODEC {
            AV1_FALLBACK_CODEC.to_string()
        } else {
            v.to_string()
        }
    });
    let audio_codec = audio.and_then(non_blank).map(str::to_string);

    (container, audio_codec, video_codec)
}

fn non_blank(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

// InnerTube serializes some integers as strings ("contentLength": "123").
pub(crate) fn value_as_u64(v: &Value) -> Option<u64> {
    v.as_u64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

pub(crate) fn value_as_u32(v: &Value) -> Option<u32> {
    value_as_u64(v).and_then(|n| u32::try_from(n).ok())
}
