use std::{collections::HashMap, sync::LazyLock};

use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use regex::Regex;

use super::stream_data::StreamData;
use crate::common::errors::{StreamResult, YouTubeError};

static SIGNATURE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/s/(.*?)(?:/|$)").expect("signature pattern is valid"));
static CONTENT_LENGTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[/\?]clen[/=](\d+)").expect("clen pattern is valid"));
static CONTAINER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"mime[/=]\w*%2F([\w\d]*)").expect("mime pattern is valid"));

/// Streams listed in a DASH MPD document, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashManifest {
    pub streams: Vec<StreamData>,
}

#[derive(Default)]
struct RepresentationBuilder {
    attrs: HashMap<String, String>,
    base_url: Option<String>,
    is_audio_only: bool,
    initialization_url: Option<String>,
}

impl RepresentationBuilder {
    /// Segmented (live) representations and ones without codecs are not
    /// downloadable as a single file.
    fn is_downloadable(&self) -> bool {
        let has_codecs = self
            .attrs
            .get("codecs")
            .is_some_and(|c| !c.trim().is_empty());
        let is_segmented = self
            .initialization_url
            .as_deref()
            .is_some_and(|u| u.contains("sq/"));
        has_codecs && !is_segmented
    }

    fn into_stream_data(self) -> StreamData {
        let url = self.base_url.filter(|u| !u.is_empty());
        let attr_u64 = |key: &str| self.attrs.get(key).and_then(|v| v.trim().parse::<u64>().ok());
        let attr_u32 = |key: &str| self.attrs.get(key).and_then(|v| v.trim().parse::<u32>().ok());

        let signature = url
            .as_deref()
            .and_then(|u| SIGNATURE_RE.captures(u))
            .map(|c| c[1].to_string())
            .filter(|s| !s.is_empty());

        let content_length = attr_u64("contentLength").or_else(|| {
            url.as_deref()
                .and_then(|u| CONTENT_LENGTH_RE.captures(u))
                .and_then(|c| c[1].parse().ok())
        });

        let container = url
            .as_deref()
            .and_then(|u| CONTAINER_RE.captures(u))
            .map(|c| {
                urlencoding::decode(&c[1])
                    .map(|s| s.into_owned())
                    .unwrap_or_else(|_| c[1].to_string())
            })
            .filter(|c| !c.is_empty());

        let codecs = self.attrs.get("codecs").cloned();
        let (audio_codec, video_codec) = if self.is_audio_only {
            (codecs, None)
        } else {
            (None, codecs)
        };

        StreamData {
            itag: attr_u32("id"),
            url,
            signature,
            signature_parameter: None,
            content_length,
            bitrate: attr_u64("bandwidth"),
            container,
            audio_codec,
            video_codec,
            video_quality_label: None,
            video_width: attr_u32("width"),
            video_height: attr_u32("height"),
            video_framerate: attr_u32("frameRate"),
            audio_track: None,
        }
    }
}

impl DashManifest {
    pub fn parse(xml: &str) -> StreamResult<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut streams = Vec::new();
        let mut current: Option<RepresentationBuilder> = None;
        let mut in_base_url = false;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    match e.local_name().as_ref() {
                        b"Representation" => {
                            current = Some(RepresentationBuilder {
                                attrs: parse_attributes(e)?,
                                ..Default::default()
                            });
                        }
                        b"BaseURL" => in_base_url = current.is_some(),
                        other => {
                            if let Some(rep) = current.as_mut() {
                                apply_child(rep, other, e)?;
                            }
                        }
                    }
                }
                Ok(Event::Empty(ref e)) => {
                    if let Some(rep) = current.as_mut() {
                        apply_child(rep, e.local_name().as_ref(), e)?;
                    }
                }
                Ok(Event::Text(e)) => {
                    if in_base_url {
                        if let Some(rep) = current.as_mut() {
                            let text = e
                                .unescape()
                                .map_err(|e| YouTubeError::Manifest(e.to_string()))?;
                            rep.base_url
                                .get_or_insert_with(String::new)
                                .push_str(text.trim());
                        }
                    }
                }
                Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                    b"BaseURL" => in_base_url = false,
                    b"Representation" => {
                        if let Some(rep) = current.take() {
                            if rep.is_downloadable() {
                                streams.push(rep.into_stream_data());
                            }
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(YouTubeError::Manifest(e.to_string())),
                _ => {}
            }
        }

        Ok(Self { streams })
    }
}

fn apply_child(rep: &mut RepresentationBuilder, name: &[u8], e: &BytesStart) -> StreamResult<()> {
    match name {
        b"AudioChannelConfiguration" => rep.is_audio_only = true,
        b"Initialization" => {
            rep.initialization_url = parse_attributes(e)?.remove("sourceURL");
        }
        _ => {}
    }
    Ok(())
}

fn parse_attributes(e: &BytesStart) -> StreamResult<HashMap<String, String>> {
    let mut attrs = HashMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| YouTubeError::Manifest(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| YouTubeError::Manifest(e.to_string()))?
            .into_owned();
        attrs.insert(key, value);
    }
    Ok(attrs)
}
