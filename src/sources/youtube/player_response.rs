use std::{
    sync::{LazyLock, OnceLock},
    time::Duration,
};

use base64::{
    Engine as _,
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use regex::Regex;
use serde_json::Value;

use super::{
    stream_data::{StreamData, value_as_u32, value_as_u64},
    utils::get_query_parameters,
};
use crate::common::errors::StreamResult;

static PREVIEW_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"video_id=(.{11})").expect("preview id pattern is valid"));

// The trailer blob is base64-like but frequently malformed; decode whatever is
// decodable and ignore padding.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayabilityStatus {
    Ok,
    Error,
    Other(String),
}

impl PlayabilityStatus {
    fn parse(status: &str) -> Self {
        if status.eq_ignore_ascii_case("ok") {
            Self::Ok
        } else if status.eq_ignore_ascii_case("error") {
            Self::Error
        } else {
            Self::Other(status.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailData {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedCaptionTrackData {
    pub url: String,
    pub language_code: String,
    pub language_name: String,
    pub is_auto_generated: bool,
}

impl ClosedCaptionTrackData {
    fn from_json(track: &Value) -> Self {
        let name = track.get("name");
        let language_name = name
            .and_then(|n| n.get("simpleText"))
            .and_then(|t| t.as_str())
            .map(str::to_string)
            .or_else(|| {
                name.and_then(|n| n.get("runs"))
                    .and_then(|r| r.as_array())
                    .map(|runs| {
                        runs.iter()
                            .filter_map(|r| r.get("text").and_then(|t| t.as_str()))
                            .collect::<String>()
                    })
            })
            .unwrap_or_default();

        Self {
            url: str_at(track, "baseUrl").unwrap_or_default().to_string(),
            language_code: str_at(track, "languageCode").unwrap_or_default().to_string(),
            language_name,
            is_auto_generated: str_at(track, "vssId").is_some_and(|id| id.starts_with("a.")),
        }
    }
}

/// Read-only view over the InnerTube `/player` response. Missing paths at any
/// depth yield `None` instead of failing. Derived collections are computed on
/// first access and cached; the document itself never changes.
#[derive(Debug)]
pub struct PlayerResponse {
    content: Value,
    streams: OnceLock<Vec<StreamData>>,
    thumbnails: OnceLock<Vec<ThumbnailData>>,
    keywords: OnceLock<Vec<String>>,
    closed_caption_tracks: OnceLock<Vec<ClosedCaptionTrackData>>,
    preview_video_id: OnceLock<Option<String>>,
}

impl PlayerResponse {
    pub fn new(content: Value) -> Self {
        Self {
            content,
            streams: OnceLock::new(),
            thumbnails: OnceLock::new(),
            keywords: OnceLock::new(),
            closed_caption_tracks: OnceLock::new(),
            preview_video_id: OnceLock::new(),
        }
    }

    pub fn parse(raw: &str) -> StreamResult<Self> {
        Ok(Self::new(serde_json::from_str(raw)?))
    }

    pub fn content(&self) -> &Value {
        &self.content
    }

    fn playability(&self) -> Option<&Value> {
        self.content.get("playabilityStatus")
    }

    fn details(&self) -> Option<&Value> {
        self.content.get("videoDetails")
    }

    fn streaming_data(&self) -> Option<&Value> {
        self.content.get("streamingData")
    }

    pub fn playability_status(&self) -> Option<PlayabilityStatus> {
        self.playability()
            .and_then(|p| str_at(p, "status"))
            .map(PlayabilityStatus::parse)
    }

    pub fn playability_error(&self) -> Option<&str> {
        self.playability().and_then(|p| str_at(p, "reason"))
    }

    pub fn is_available(&self) -> bool {
        self.playability_status() != Some(PlayabilityStatus::Error) && self.details().is_some()
    }

    pub fn is_playable(&self) -> bool {
        self.playability_status() == Some(PlayabilityStatus::Ok)
    }

    pub fn title(&self) -> Option<&str> {
        self.details().and_then(|d| str_at(d, "title"))
    }

    pub fn channel_id(&self) -> Option<&str> {
        self.details().and_then(|d| str_at(d, "channelId"))
    }

    pub fn author(&self) -> Option<&str> {
        self.details().and_then(|d| str_at(d, "author"))
    }

    /// Raw upload date as reported by the microformat, e.g. `2009-10-24T23:57:33-07:00`.
    pub fn upload_date(&self) -> Option<&str> {
        self.content
            .get("microformat")
            .and_then(|m| m.get("playerMicroformatRenderer"))
            .and_then(|r| str_at(r, "uploadDate"))
    }

    pub fn duration(&self) -> Option<Duration> {
        self.details()
            .and_then(|d| str_at(d, "lengthSeconds"))
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(Duration::from_secs_f64)
    }

    pub fn description(&self) -> Option<&str> {
        self.details().and_then(|d| str_at(d, "shortDescription"))
    }

    pub fn view_count(&self) -> Option<u64> {
        self.details().and_then(|d| d.get("viewCount")).and_then(value_as_u64)
    }

    pub fn thumbnails(&self) -> &[ThumbnailData] {
        self.thumbnails.get_or_init(|| {
            self.details()
                .and_then(|d| d.get("thumbnail"))
                .and_then(|t| t.get("thumbnails"))
                .and_then(|t| t.as_array())
                .map(|arr| {
                    arr.iter()
                        .filter_map(|t| {
                            Some(ThumbnailData {
                                url: str_at(t, "url")?.to_string(),
                                width: t.get("width").and_then(value_as_u32),
                                height: t.get("height").and_then(value_as_u32),
                            })
                        })
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    pub fn keywords(&self) -> &[String] {
        self.keywords.get_or_init(|| {
            self.details()
                .and_then(|d| d.get("keywords"))
                .and_then(|k| k.as_array())
                .map(|arr| {
                    arr.iter()
                        .filter_map(|k| k.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    /// Id of the free trailer shown instead of a paid video. Its presence means
    /// the requested video requires purchase.
    pub fn preview_video_id(&self) -> Option<&str> {
        self.preview_video_id
            .get_or_init(|| self.extract_preview_video_id())
            .as_deref()
    }

    fn extract_preview_video_id(&self) -> Option<String> {
        let error_screen = self.playability()?.get("errorScreen")?;

        let direct = error_screen
            .get("playerLegacyDesktopYpcTrailerRenderer")
            .and_then(|r| str_at(r, "trailerVideoId"))
            .and_then(non_blank);
        if let Some(id) = direct {
            return Some(id.to_string());
        }

        let trailer = error_screen.get("ypcTrailerRenderer");

        let from_player_vars = trailer
            .and_then(|r| str_at(r, "playerVars"))
            .and_then(|vars| get_query_parameters(vars).remove("video_id"))
            .filter(|id| !id.trim().is_empty());
        if from_player_vars.is_some() {
            return from_player_vars;
        }

        trailer
            .and_then(|r| str_at(r, "playerResponse"))
            .and_then(scrape_preview_video_id)
    }

    pub fn dash_manifest_url(&self) -> Option<&str> {
        self.streaming_data()
            .and_then(|s| str_at(s, "dashManifestUrl"))
            .and_then(non_blank)
    }

    pub fn hls_manifest_url(&self) -> Option<&str> {
        self.streaming_data()
            .and_then(|s| str_at(s, "hlsManifestUrl"))
            .and_then(non_blank)
    }

    /// Muxed `formats` followed by `adaptiveFormats`, each in document order.
    pub fn streams(&self) -> &[StreamData] {
        self.streams.get_or_init(|| {
            let Some(streaming_data) = self.streaming_data() else {
                return Vec::new();
            };

            ["formats", "adaptiveFormats"]
                .iter()
                .filter_map(|key| streaming_data.get(*key).and_then(|f| f.as_array()))
                .flatten()
                .map(StreamData::from_json)
                .collect()
        })
    }

    pub fn closed_caption_tracks(&self) -> &[ClosedCaptionTrackData] {
        self.closed_caption_tracks.get_or_init(|| {
            self.content
                .get("captions")
                .and_then(|c| c.get("playerCaptionsTracklistRenderer"))
                .and_then(|r| r.get("captionTracks"))
                .and_then(|t| t.as_array())
                .map(|arr| arr.iter().map(ClosedCaptionTrackData::from_json).collect())
                .unwrap_or_default()
        })
    }
}

/// Best-effort scrape of `video_id=<11 chars>` out of the trailer blob. The
/// blob is URL-safe base64 that only partly decodes to text.
fn scrape_preview_video_id(blob: &str) -> Option<String> {
    let mut normalized: String = blob
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '+' || *c == '/')
        .collect();

    // A single dangling sextet can never decode.
    if normalized.len() % 4 == 1 {
        normalized.pop();
    }

    let bytes = LENIENT_BASE64.decode(normalized.as_bytes()).ok()?;
    let text = String::from_utf8_lossy(&bytes);

    PREVIEW_ID_RE
        .captures(&text)
        .map(|caps| caps[1].to_string())
        .filter(|id| !id.trim().is_empty())
}

fn str_at<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(|v| v.as_str())
}

fn non_blank(s: &str) -> Option<&str> {
    (!s.trim().is_empty()).then_some(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE;
    use serde_json::json;

    fn playable_document() -> Value {
        json!({
            "playabilityStatus": { "status": "OK" },
            "videoDetails": {
                "videoId": "dQw4w9WgXcQ",
                "title": "Never Gonna Give You Up",
                "author": "Rick Astley",
                "channelId": "UCuAXFkgsw1L7xaCfnd5JJOw",
                "lengthSeconds": "212",
                "viewCount": "1500000000",
                "keywords": ["rick", "astley"],
                "shortDescription": "The official video",
                "thumbnail": { "thumbnails": [
                    { "url": "https://i.ytimg.com/vi/dQw4w9WgXcQ/default.jpg", "width": 120, "height": 90 },
                    { "width": 1, "height": 1 }
                ]}
            },
            "microformat": { "playerMicroformatRenderer": { "uploadDate": "2009-10-24T23:57:33-07:00" } },
            "streamingData": {
                "formats": [{ "itag": 18, "url": "https://example.com/18" }],
                "adaptiveFormats": [
                    { "itag": 137, "url": "https://example.com/137" },
                    { "itag": 251, "url": "https://example.com/251" }
                ],
                "dashManifestUrl": "https://manifest.googlevideo.com/api/manifest/dash/id/1"
            },
            "captions": { "playerCaptionsTracklistRenderer": { "captionTracks": [
                { "baseUrl": "https://example.com/cc/en", "languageCode": "en",
                  "name": { "simpleText": "English" }, "vssId": ".en" },
                { "baseUrl": "https://example.com/cc/auto", "languageCode": "en",
                  "name": { "runs": [{ "text": "English " }, { "text": "(auto-generated)" }] },
                  "vssId": "a.en" }
            ]}}
        })
    }

    #[test]
    fn test_details_and_playability() {
        let response = PlayerResponse::new(playable_document());

        assert!(response.is_available());
        assert!(response.is_playable());
        assert_eq!(response.playability_status(), Some(PlayabilityStatus::Ok));
        assert_eq!(response.title(), Some("Never Gonna Give You Up"));
        assert_eq!(response.author(), Some("Rick Astley"));
        assert_eq!(response.channel_id(), Some("UCuAXFkgsw1L7xaCfnd5JJOw"));
        assert_eq!(response.duration(), Some(Duration::from_secs(212)));
        assert_eq!(response.view_count(), Some(1_500_000_000));
        assert_eq!(response.keywords(), ["rick", "astley"]);
        assert_eq!(response.description(), Some("The official video"));
        assert_eq!(response.upload_date(), Some("2009-10-24T23:57:33-07:00"));
        assert_eq!(response.thumbnails().len(), 1);
        assert_eq!(response.thumbnails()[0].width, Some(120));
        assert!(response.preview_video_id().is_none());
    }

    #[test]
    fn test_streams_keep_order() {
        let response = PlayerResponse::new(playable_document());
        let itags: Vec<_> = response.streams().iter().map(|s| s.itag).collect();
        assert_eq!(itags, vec![Some(18), Some(137), Some(251)]);
        assert_eq!(
            response.dash_manifest_url(),
            Some("https://manifest.googlevideo.com/api/manifest/dash/id/1")
        );
        assert_eq!(response.hls_manifest_url(), None);

        // Memoized: the same slice comes back.
        assert!(std::ptr::eq(response.streams(), response.streams()));
    }

    #[test]
    fn test_caption_tracks() {
        let response = PlayerResponse::new(playable_document());
        let tracks = response.closed_caption_tracks();

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].language_name, "English");
        assert!(!tracks[0].is_auto_generated);
        assert_eq!(tracks[1].language_name, "English (auto-generated)");
        assert!(tracks[1].is_auto_generated);
    }

    #[test]
    fn test_error_status_is_unavailable() {
        let response = PlayerResponse::new(json!({
            "playabilityStatus": { "status": "ERROR", "reason": "Video unavailable" },
            "videoDetails": { "title": "x" }
        }));
        assert!(!response.is_available());
        assert!(!response.is_playable());
        assert_eq!(response.playability_error(), Some("Video unavailable"));
    }

    #[test]
    fn test_missing_details_is_unavailable() {
        let response = PlayerResponse::new(json!({
            "playabilityStatus": { "status": "OK" }
        }));
        assert!(!response.is_available());
        assert!(response.is_playable());
    }

    #[test]
    fn test_empty_document_is_tolerated() {
        let response = PlayerResponse::parse("{}").unwrap();
        assert_eq!(response.playability_status(), None);
        assert!(!response.is_playable());
        assert!(response.streams().is_empty());
        assert!(response.thumbnails().is_empty());
        assert!(response.closed_caption_tracks().is_empty());
        assert_eq!(response.title(), None);
        assert_eq!(response.duration(), None);
    }

    #[test]
    fn test_other_status() {
        let response = PlayerResponse::new(json!({
            "playabilityStatus": { "status": "LOGIN_REQUIRED", "reason": "Sign in to confirm your age" }
        }));
        assert_eq!(
            response.playability_status(),
            Some(PlayabilityStatus::Other("LOGIN_REQUIRED".to_string()))
        );
        assert!(!response.is_playable());
    }

    #[test]
    fn test_preview_id_direct() {
        let response = PlayerResponse::new(json!({
            "playabilityStatus": { "status": "UNPLAYABLE", "errorScreen": {
                "playerLegacyDesktopYpcTrailerRenderer": { "trailerVideoId": "trailer0001" }
            }}
        }));
        assert_eq!(response.preview_video_id(), Some("trailer0001"));
    }

    #[test]
    fn test_preview_id_from_player_vars() {
        let response = PlayerResponse::new(json!({
            "playabilityStatus": { "status": "UNPLAYABLE", "errorScreen": {
                "ypcTrailerRenderer": { "playerVars": "autoplay=1&video_id=trailer0002&cc_load_policy=0" }
            }}
        }));
        assert_eq!(response.preview_video_id(), Some("trailer0002"));
    }

    #[test]
    fn test_preview_id_from_encoded_blob() {
        let mut raw = vec![0xffu8, 0xfe, 0x01];
        raw.extend_from_slice(b"\x12\x08junk&video_id=trailer0003&t=1");
        let blob = URL_SAFE.encode(&raw);

        let response = PlayerResponse::new(json!({
            "playabilityStatus": { "status": "OK", "errorScreen": {
                "ypcTrailerRenderer": { "playerResponse": blob }
            }}
        }));
        assert_eq!(response.preview_video_id(), Some("trailer0003"));
    }

    #[test]
    fn test_preview_id_garbage_blob_is_absent() {
        let response = PlayerResponse::new(json!({
            "playabilityStatus": { "status": "OK", "errorScreen": {
                "ypcTrailerRenderer": { "playerResponse": "!!!" }
            }}
        }));
        assert_eq!(response.preview_video_id(), None);
    }
}
