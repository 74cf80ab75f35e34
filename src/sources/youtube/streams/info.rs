use std::fmt;

use serde::Serialize;

use super::quality::VideoQuality;

/// Stream container, e.g. `mp4` or `webm`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Container(pub String);

impl Container {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Whether the container can only hold audio.
    pub fn is_audio_only(&self) -> bool {
        matches!(
            self.0.to_ascii_lowercase().as_str(),
            "mp3" | "m4a" | "wav" | "wma" | "ogg" | "aac" | "opus"
        )
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bits per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Bitrate(pub u64);

impl Bitrate {
    pub fn bits_per_second(&self) -> u64 {
        self.0
    }

    pub fn kilobits_per_second(&self) -> f64 {
        self.0 as f64 / 1024.0
    }

    pub fn megabits_per_second(&self) -> f64 {
        self.kilobits_per_second() / 1024.0
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.megabits_per_second() >= 1.0 {
            write!(f, "{:.2} Mbit/s", self.megabits_per_second())
        } else if self.kilobits_per_second() >= 1.0 {
            write!(f, "{:.2} Kbit/s", self.kilobits_per_second())
        } else {
            write!(f, "{} Bit/s", self.0)
        }
    }
}

/// Stream size in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct FileSize(pub u64);

impl FileSize {
    pub fn bytes(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0 as f64;
        let (value, unit) = if bytes >= 1024.0 * 1024.0 * 1024.0 {
            (bytes / (1024.0 * 1024.0 * 1024.0), "GB")
        } else if bytes >= 1024.0 * 1024.0 {
            (bytes / (1024.0 * 1024.0), "MB")
        } else if bytes >= 1024.0 {
            (bytes / 1024.0, "KB")
        } else {
            return write!(f, "{} B", self.0);
        };
        write!(f, "{:.2} {}", value, unit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioOnlyStreamInfo {
    pub url: String,
    pub container: Container,
    pub size: FileSize,
    pub bitrate: Bitrate,
    pub audio_codec: String,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoOnlyStreamInfo {
    pub url: String,
    pub container: Container,
    pub size: FileSize,
    pub bitrate: Bitrate,
    pub video_codec: String,
    pub video_quality: VideoQuality,
    pub video_resolution: Resolution,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MuxedStreamInfo {
    pub url: String,
    pub container: Container,
    pub size: FileSize,
    pub bitrate: Bitrate,
    pub audio_codec: String,
    pub video_codec: String,
    pub video_quality: VideoQuality,
    pub video_resolution: Resolution,
    pub language: Option<String>,
}

/// One resolved, downloadable stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StreamInfo {
    AudioOnly(AudioOnlyStreamInfo),
    VideoOnly(VideoOnlyStreamInfo),
    Muxed(MuxedStreamInfo),
}

impl StreamInfo {
    pub fn url(&self) -> &str {
        match self {
            Self::AudioOnly(s) => &s.url,
            Self::VideoOnly(s) => &s.url,
            Self::Muxed(s) => &s.url,
        }
    }

    pub fn container(&self) -> &Container {
        match self {
            Self::AudioOnly(s) => &s.container,
            Self::VideoOnly(s) => &s.container,
            Self::Muxed(s) => &s.container,
        }
    }

    pub fn size(&self) -> FileSize {
        match self {
            Self::AudioOnly(s) => s.size,
            Self::VideoOnly(s) => s.size,
            Self::Muxed(s) => s.size,
        }
    }

    pub fn bitrate(&self) -> Bitrate {
        match self {
            Self::AudioOnly(s) => s.bitrate,
            Self::VideoOnly(s) => s.bitrate,
            Self::Muxed(s) => s.bitrate,
        }
    }

    pub fn audio_codec(&self) -> Option<&str> {
        match self {
            Self::AudioOnly(s) => Some(&s.audio_codec),
            Self::Muxed(s) => Some(&s.audio_codec),
            Self::VideoOnly(_) => None,
        }
    }

    pub fn video_codec(&self) -> Option<&str> {
        match self {
            Self::VideoOnly(s) => Some(&s.video_codec),
            Self::Muxed(s) => Some(&s.video_codec),
            Self::AudioOnly(_) => None,
        }
    }

    pub fn video_quality(&self) -> Option<&VideoQuality> {
        match self {
            Self::VideoOnly(s) => Some(&s.video_quality),
            Self::Muxed(s) => Some(&s.video_quality),
            Self::AudioOnly(_) => None,
        }
    }

    pub fn video_resolution(&self) -> Option<Resolution> {
        match self {
            Self::VideoOnly(s) => Some(s.video_resolution),
            Self::Muxed(s) => Some(s.video_resolution),
            Self::AudioOnly(_) => None,
        }
    }

    pub fn language(&self) -> Option<&str> {
        match self {
            Self::AudioOnly(s) => s.language.as_deref(),
            Self::Muxed(s) => s.language.as_deref(),
            Self::VideoOnly(_) => None,
        }
    }

    pub fn has_audio(&self) -> bool {
        !matches!(self, Self::VideoOnly(_))
    }

    pub fn has_video(&self) -> bool {
        !matches!(self, Self::AudioOnly(_))
    }
}

impl fmt::Display for StreamInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AudioOnly(s) => write!(
                f,
                "Audio-only ({} | Language: {})",
                s.container,
                s.language.as_deref().unwrap_or("Unknown")
            ),
            Self::VideoOnly(s) => write!(f, "Video-only ({} | {})", s.video_quality, s.container),
            Self::Muxed(s) => write!(
                f,
                "Muxed ({} | {} | Language: {})",
                s.video_quality,
                s.container,
                s.language.as_deref().unwrap_or("Unknown")
            ),
        }
    }
}
