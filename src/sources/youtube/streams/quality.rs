use std::{fmt, sync::LazyLock};

use regex::Regex;
use serde::Serialize;

use super::info::Resolution;
use crate::common::errors::{StreamResult, YouTubeError};

/// Framerate assumed when a descriptor does not state one.
pub const DEFAULT_FRAMERATE: u32 = 24;

// Labels look like `1080p`, `1080p60`, `1080s` (360°), `2160p60 HDR`.
static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\D(\d+)?").expect("video quality label pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoQuality {
    pub label: String,
    pub max_height: u32,
    pub framerate: u32,
}

impl VideoQuality {
    pub fn new(max_height: u32, framerate: u32) -> Self {
        Self {
            label: format_label(max_height, framerate),
            max_height,
            framerate,
        }
    }

    /// Parses a platform quality label; the framerate suffix, when present,
    /// overrides `framerate_fallback`.
    pub fn from_label(label: &str, framerate_fallback: u32) -> StreamResult<Self> {
        let caps = LABEL_RE
            .captures(label)
            .ok_or_else(|| YouTubeError::extraction(format!("video quality from label '{}'", label)))?;

        let max_height = caps[1]
            .parse::<u32>()
            .map_err(|_| YouTubeError::extraction(format!("video quality from label '{}'", label)))?;
        let framerate = caps
            .get(2)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(framerate_fallback);

        Ok(Self {
            label: label.to_string(),
            max_height,
            framerate,
        })
    }

    pub fn from_itag(itag: u32, framerate: u32) -> StreamResult<Self> {
        let max_height = itag_max_height(itag)
            .ok_or_else(|| YouTubeError::extraction(format!("video quality for itag '{}'", itag)))?;
        Ok(Self::new(max_height, framerate))
    }

    pub fn is_high_definition(&self) -> bool {
        self.max_height >= 1080
    }

    pub fn default_video_resolution(&self) -> Resolution {
        let (width, height) = match self.max_height {
            144 => (256, 144),
            240 => (426, 240),
            360 => (640, 360),
            480 => (854, 480),
            720 => (1280, 720),
            1080 => (1920, 1080),
            1440 => (2560, 1440),
            2160 => (3840, 2160),
            2880 => (5120, 2880),
            3072 => (4096, 3072),
            4320 => (7680, 4320),
            h => (16 * h / 9, h),
        };
        Resolution { width, height }
    }
}

impl fmt::Display for VideoQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl PartialOrd for VideoQuality {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

// Height, then framerate; the label only breaks ties so that `cmp` agrees
// with `Eq`.
impl Ord for VideoQuality {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.max_height, self.framerate, &self.label).cmp(&(
            other.max_height,
            other.framerate,
            &other.label,
        ))
    }
}

fn format_label(max_height: u32, framerate: u32) -> String {
    if framerate <= 30 {
        return format!("{}p", max_height);
    }
    // Framerate is shown rounded up to the next multiple of ten.
    format!("{}p{}", max_height, framerate.div_ceil(10) * 10)
}

fn itag_max_height(itag: u32) -> Option<u32> {
    let height = match itag {
        5 => 144,
        6 => 240,
        13 => 144,
        17 => 144,
        18 => 360,
        22 => 720,
        34 => 360,
        35 => 480,
        36 => 240,
        37 => 1080,
        38 => 3072,
        43 => 360,
        44 => 480,
        45 => 720,
        46 => 1080,
        59 => 480,
        78 => 480,
        82 => 360,
        83 => 480,
        84 => 720,
        85 => 1080,
        91 => 144,
        92 => 240,
        93 => 360,
        94 => 480,
        95 => 720,
        96 => 1080,
        100 => 360,
        101 => 480,
        102 => 720,
        132 => 240,
        133 => 240,
        134 => 360,
        135 => 480,
        136 => 720,
        137 => 1080,
        138 => 4320,
        142 => 240,
        143 => 360,
        144 => 480,
        145 => 720,
        146 => 1080,
        160 => 144,
        161 => 144,
        167 => 360,
        168 => 480,
        169 => 720,
        170 => 1080,
        212 => 480,
        213 => 480,
        214 => 720,
        215 => 720,
        216 => 1080,
        217 => 1080,
        218 => 480,
        219 => 480,
        222 => 480,
        223 => 480,
        224 => 720,
        225 => 720,
        226 => 1080,
        227 => 1080,
        242 => 240,
        243 => 360,
        244 => 480,
        245 => 480,
        246 => 480,
        247 => 720,
        248 => 1080,
        264 => 1440,
        266 => 2160,
        271 => 1440,
        272 => 2160,
        278 => 144,
        298 => 720,
        299 => 1080,
        302 => 720,
        303 => 1080,
        308 => 1440,
        313 => 2160,
        315 => 2160,
        330 => 144,
        331 => 240,
        332 => 360,
        333 => 480,
        334 => 720,
        335 => 1080,
        336 => 1440,
        337 => 2160,
        394 => 144,
        395 => 240,
        396 => 360,
        397 => 480,
        398 => 720,
        399 => 1080,
        400 => 1440,
        401 => 2160,
        402 => 4320,
        571 => 4320,
        _ => return None,
    };
    Some(height)
}
