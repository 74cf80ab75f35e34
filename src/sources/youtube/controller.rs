use async_trait::async_trait;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use super::{dash::DashManifest, player_response::PlayerResponse, video_id::VideoId};
use crate::common::{
    errors::StreamResult,
    http::{cancellable, ensure_success, send},
};

/// Network seam for everything the resolver fetches besides stream probes.
#[async_trait]
pub trait StreamController: Send + Sync {
    /// Fetches the player response. With a `signature_timestamp` the request
    /// is made as a client whose streams may carry ciphered signatures.
    async fn get_player_response(
        &self,
        video_id: &VideoId,
        signature_timestamp: Option<&str>,
        cancel: &CancellationToken,
    ) -> StreamResult<PlayerResponse>;

    async fn get_dash_manifest(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> StreamResult<DashManifest>;
}

/// InnerTube client profile sent with a player request.
struct ClientProfile {
    name: &'static str,
    id: &'static str,
    version: &'static str,
    user_agent: &'static str,
    android_sdk_version: Option<u32>,
    third_party_embed_url: Option<&'static str>,
}

// Returns direct stream URLs, no cipher needed.
const ANDROID_VR: ClientProfile = ClientProfile {
    name: "ANDROID_VR",
    id: "28",
    version: "1.61.48",
    user_agent: "Mozilla/5.0 (Linux; Android 14; Pixel 8 Pro Build/UQ1A.240205.002; wv) \
         AppleWebKit/537.36 (KHTML, like Gecko) Version/4.0 \
         Chrome/121.0.6167.164 Mobile Safari/537.36 YouTubeVR/1.61.48 (gzip)",
    android_sdk_version: Some(34),
    third_party_embed_url: None,
};

// Plays age-restricted and embed-only videos, but signs its URLs.
const TV_EMBEDDED: ClientProfile = ClientProfile {
    name: "TVHTML5_SIMPLY_EMBEDDED_PLAYER",
    id: "85",
    version: "2.0",
    user_agent: "Mozilla/5.0 (Linux armeabi-v7a; Android 7.1.2; Fire OS 6.0) Cobalt/22.lts.3.306369-gold (unlike Gecko) v8/8.8.278.8-jit gles Starboard/13, Amazon_ATV_mediatek8695_2019/NS6294 (Amazon, AFTMM, Wireless) com.amazon.firetv.youtube/22.3.r2.v66.0",
    android_sdk_version: None,
    third_party_embed_url: Some("https://www.youtube.com"),
};

impl ClientProfile {
    fn build_context(&self) -> Value {
        let mut client = json!({
            "clientName": self.name,
            "clientVersion": self.version,
            "userAgent": self.user_agent,
            "hl": "en",
            "gl": "US"
        });
        if let Some(sdk) = self.android_sdk_version {
            if let Some(obj) = client.as_object_mut() {
                obj.insert("androidSdkVersion".to_string(), json!(sdk));
                obj.insert("osName".to_string(), json!("Android"));
                obj.insert("osVersion".to_string(), json!("14"));
            }
        }

        let mut context = json!({
            "client": client,
            "user": { "lockedSafetyMode": false },
            "request": { "useSsl": true }
        });
        if let Some(embed_url) = self.third_party_embed_url {
            if let Some(obj) = context.as_object_mut() {
                obj.insert("thirdParty".to_string(), json!({ "embedUrl": embed_url }));
            }
        }
        context
    }
}

pub struct InnertubeController {
    http: reqwest::Client,
    api_base: String,
}

impl InnertubeController {
    pub fn new(http: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl StreamController for InnertubeController {
    async fn get_player_response(
        &self,
        video_id: &VideoId,
        signature_timestamp: Option<&str>,
        cancel: &CancellationToken,
    ) -> StreamResult<PlayerResponse> {
        let profile = if signature_timestamp.is_some() {
            &TV_EMBEDDED
        } else {
            &ANDROID_VR
        };

        let mut body = json!({
            "context": profile.build_context(),
            "videoId": video_id.as_str(),
            "contentCheckOk": true,
            "racyCheckOk": true
        });

        if let Some(sts) = signature_timestamp {
            let sts = sts.parse::<u64>().map(Value::from).unwrap_or_else(|_| json!(sts));
            if let Some(obj) = body.as_object_mut() {
                obj.insert(
                    "playbackContext".to_string(),
                    json!({
                        "contentPlaybackContext": {
                            "signatureTimestamp": sts
                        }
                    }),
                );
            }
        }

        let url = format!("{}/youtubei/v1/player?prettyPrint=false", self.api_base);
        tracing::debug!(
            "Player request[{}]: POST {} (client={} sts={:?})",
            video_id,
            url,
            profile.name,
            signature_timestamp
        );

        let req = self
            .http
            .post(&url)
            .header(reqwest::header::USER_AGENT, profile.user_agent)
            .header("X-YouTube-Client-Name", profile.id)
            .header("X-YouTube-Client-Version", profile.version)
            .json(&body);

        let res = ensure_success(send(cancel, req).await?)?;
        let text = cancellable(cancel, async { Ok(res.text().await?) }).await?;

        PlayerResponse::parse(&text)
    }

    async fn get_dash_manifest(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> StreamResult<DashManifest> {
        tracing::debug!("Fetching DASH manifest: {}", url);

        let res = ensure_success(send(cancel, self.http.get(url)).await?)?;
        let xml = cancellable(cancel, async { Ok(res.text().await?) }).await?;

        DashManifest::parse(&xml)
    }
}
