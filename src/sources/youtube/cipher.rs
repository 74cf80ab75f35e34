use std::sync::{
    Arc, LazyLock,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use regex::Regex;
use serde_json::{Value, json};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::{
    common::{
        errors::{StreamResult, YouTubeError},
        http::{cancellable, ensure_success},
    },
    configs::YouTubeCipherConfig,
};

const YOUTUBE_ORIGIN: &str = "https://www.youtube.com";

static JS_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""jsUrl":"([^"]+)""#).expect("jsUrl pattern is valid"));
static LOCALE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/([a-z]{2}_[A-Z]{2})/").expect("locale pattern is valid"));
static STS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:signatureTimestamp|sts):(\d+)").expect("sts pattern is valid")
});

/// A resolved deciphering capability for one player version.
#[async_trait]
pub trait CipherManifest: Send + Sync {
    /// `signatureTimestamp` of the player the manifest was built from.
    fn signature_timestamp(&self) -> Option<&str>;

    async fn decipher(&self, signature: &str) -> StreamResult<String>;
}

/// Supplies a `CipherManifest`. Resolution is expensive (it downloads and
/// inspects the player script), so callers go through `CipherCache`.
#[async_trait]
pub trait CipherSource: Send + Sync {
    async fn resolve(&self) -> StreamResult<Arc<dyn CipherManifest>>;
}

/// Resolves the cipher manifest at most once per client. Concurrent first
/// callers wait on the same resolution; a failed resolution is not cached.
pub struct CipherCache {
    source: Arc<dyn CipherSource>,
    manifest: OnceCell<Arc<dyn CipherManifest>>,
    resolutions: AtomicUsize,
}

impl CipherCache {
    pub fn new(source: Arc<dyn CipherSource>) -> Self {
        Self {
            source,
            manifest: OnceCell::new(),
            resolutions: AtomicUsize::new(0),
        }
    }

    pub async fn get(&self, cancel: &CancellationToken) -> StreamResult<Arc<dyn CipherManifest>> {
        let manifest = self
            .manifest
            .get_or_try_init(|| async {
                self.resolutions.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Resolving cipher manifest");
                let manifest = cancellable(cancel, self.source.resolve()).await?;
                tracing::debug!(
                    "Cipher manifest resolved (sts={:?})",
                    manifest.signature_timestamp()
                );
                Ok::<_, YouTubeError>(manifest)
            })
            .await?;
        Ok(manifest.clone())
    }

    /// Number of resolution attempts made so far.
    pub fn resolutions(&self) -> usize {
        self.resolutions.load(Ordering::Relaxed)
    }
}

/// Discovers the current player script and deciphers through a remote
/// yt-cipher compatible service.
pub struct RemoteCipherSource {
    config: YouTubeCipherConfig,
    client: reqwest::Client,
    origin: String,
}

impl RemoteCipherSource {
    pub fn new(config: YouTubeCipherConfig, client: reqwest::Client) -> Self {
        Self {
            config,
            client,
            origin: YOUTUBE_ORIGIN.to_string(),
        }
    }

    /// Overrides `https://www.youtube.com`, used to locate the player script.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into().trim_end_matches('/').to_string();
        self
    }

    async fn get_player_script_url(&self) -> StreamResult<String> {
        let text = self
            .client
            .get(format!("{}/embed/", self.origin))
            .send()
            .await?
            .text()
            .await?;

        let mut script_url = match JS_URL_RE.captures(&text) {
            Some(caps) => caps[1].to_string(),
            None => {
                // Fallback to watch page
                let text = self
                    .client
                    .get(format!("{}/watch?v=dQw4w9WgXcQ", self.origin))
                    .send()
                    .await?
                    .text()
                    .await?;
                JS_URL_RE
                    .captures(&text)
                    .map(|caps| caps[1].to_string())
                    .ok_or_else(|| YouTubeError::Cipher("Could not find jsUrl in player page".into()))?
            }
        };

        script_url = LOCALE_RE.replace(&script_url, "/en_US/").to_string();

        Ok(if script_url.starts_with("http") {
            script_url
        } else {
            format!("{}{}", self.origin, script_url)
        })
    }

    async fn get_signature_timestamp(&self, player_url: &str) -> StreamResult<String> {
        let res = ensure_success(self.client.get(player_url).send().await?)?;
        let text = res.text().await?;

        STS_RE
            .captures(&text)
            .map(|caps| caps[1].to_string())
            .ok_or_else(|| YouTubeError::Cipher("Could not find STS in player script".into()))
    }
}

#[async_trait]
impl CipherSource for RemoteCipherSource {
    async fn resolve(&self) -> StreamResult<Arc<dyn CipherManifest>> {
        let player_url = self.get_player_script_url().await?;
        let signature_timestamp = self.get_signature_timestamp(&player_url).await?;

        tracing::debug!("Player script {} (sts={})", player_url, signature_timestamp);

        Ok(Arc::new(RemoteCipherManifest {
            client: self.client.clone(),
            service_url: self.config.url.clone(),
            token: self.config.token.clone(),
            player_url,
            signature_timestamp,
        }))
    }
}

pub struct RemoteCipherManifest {
    client: reqwest::Client,
    service_url: Option<String>,
    token: Option<String>,
    player_url: String,
    signature_timestamp: String,
}

impl RemoteCipherManifest {
    pub fn player_url(&self) -> &str {
        &self.player_url
    }
}

#[async_trait]
impl CipherManifest for RemoteCipherManifest {
    fn signature_timestamp(&self) -> Option<&str> {
        Some(&self.signature_timestamp)
    }

    async fn decipher(&self, signature: &str) -> StreamResult<String> {
        let url = self
            .service_url
            .as_ref()
            .ok_or_else(|| YouTubeError::Cipher("Remote cipher URL not configured".into()))?;

        let mut req = self
            .client
            .post(format!("{}/decrypt_signature", url.trim_end_matches('/')))
            .json(&json!({
                "encrypted_signature": signature,
                "n_param": "",
                "player_url": self.player_url,
            }));
        if let Some(token) = &self.token {
            req = req.header(reqwest::header::AUTHORIZATION, token);
        }

        let body: Value = ensure_success(req.send().await?)?.json().await?;
        body.get("decrypted_signature")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| YouTubeError::Cipher("decrypted_signature missing in response".into()))
    }
}

/// Deciphers `signature` with the cached manifest, resolving it on first use.
pub async fn decipher(
    cache: &CipherCache,
    signature: &str,
    cancel: &CancellationToken,
) -> StreamResult<String> {
    let manifest = cache.get(cancel).await?;
    cancellable(cancel, manifest.decipher(signature)).await
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, header, method, path},
    };

    /// Reverses the signature; counts how often it was resolved.
    pub(crate) struct ReversingCipher {
        pub resolutions: AtomicUsize,
        pub delay: Duration,
    }

    impl ReversingCipher {
        pub(crate) fn new() -> Self {
            Self {
                resolutions: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }
    }

    struct ReversingManifest;

    #[async_trait]
    impl CipherManifest for ReversingManifest {
        fn signature_timestamp(&self) -> Option<&str> {
            Some("20000")
        }

        async fn decipher(&self, signature: &str) -> StreamResult<String> {
            Ok(signature.chars().rev().collect())
        }
    }

    #[async_trait]
    impl CipherSource for ReversingCipher {
        async fn resolve(&self) -> StreamResult<Arc<dyn CipherManifest>> {
            self.resolutions.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(Arc::new(ReversingManifest))
        }
    }

    struct FailingCipher;

    #[async_trait]
    impl CipherSource for FailingCipher {
        async fn resolve(&self) -> StreamResult<Arc<dyn CipherManifest>> {
            Err(YouTubeError::Cipher("player script unavailable".into()))
        }
    }

    #[tokio::test]
    async fn test_resolves_once_under_concurrency() {
        let source = Arc::new(ReversingCipher {
            resolutions: AtomicUsize::new(0),
            delay: Duration::from_millis(20),
        });
        let cache = Arc::new(CipherCache::new(source.clone()));
        let cancel = CancellationToken::new();

        let mut handles = Vec::new();
        for i in 0..8 {
            let cache = cache.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                decipher(&cache, &format!("sig{}", i), &cancel).await
            }));
        }
        for (i, handle) in handles.into_iter().enumerate() {
            let deciphered = handle.await.unwrap().unwrap();
            assert_eq!(deciphered, format!("{}gis", i));
        }

        assert_eq!(source.resolutions.load(Ordering::SeqCst), 1);
        assert_eq!(cache.resolutions(), 1);
    }

    #[tokio::test]
    async fn test_failed_resolution_is_not_cached() {
        let cache = CipherCache::new(Arc::new(FailingCipher));
        let cancel = CancellationToken::new();

        assert!(cache.get(&cancel).await.is_err());
        assert!(cache.get(&cancel).await.is_err());
        assert_eq!(cache.resolutions(), 2);
    }

    #[tokio::test]
    async fn test_remote_source_resolves_and_deciphers() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/embed/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<script>var cfg = {"jsUrl":"/s/player/abcd1234/player_ias.vflset/de_DE/base.js"};</script>"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/s/player/abcd1234/player_ias.vflset/en_US/base.js"))
            .respond_with(ResponseTemplate::new(200).set_body_string("var x={signatureTimestamp:20123};"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/decrypt_signature"))
            .and(header("authorization", "secret"))
            .and(body_partial_json(json!({ "encrypted_signature": "ABCDEF" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "decrypted_signature": "FEDCBA" })),
            )
            .mount(&server)
            .await;

        let config = YouTubeCipherConfig {
            url: Some(server.uri()),
            token: Some("secret".to_string()),
        };
        let source = RemoteCipherSource::new(config, reqwest::Client::new()).with_origin(server.uri());

        let manifest = source.resolve().await.unwrap();
        assert_eq!(manifest.signature_timestamp(), Some("20123"));
        assert_eq!(manifest.decipher("ABCDEF").await.unwrap(), "FEDCBA");
    }

    #[tokio::test]
    async fn test_remote_manifest_without_service_fails() {
        let manifest = RemoteCipherManifest {
            client: reqwest::Client::new(),
            service_url: None,
            token: None,
            player_url: "https://www.youtube.com/s/player/x/base.js".to_string(),
            signature_timestamp: "1".to_string(),
        };
        assert!(matches!(
            manifest.decipher("abc").await,
            Err(YouTubeError::Cipher(_))
        ));
    }
}
