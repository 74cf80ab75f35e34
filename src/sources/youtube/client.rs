use std::{sync::Arc, time::Duration};

use futures::TryStreamExt;
use tokio_util::sync::CancellationToken;

use super::{
    builder::StreamInfoBuilder,
    cipher::{CipherCache, CipherSource, RemoteCipherSource},
    controller::{InnertubeController, StreamController},
    player_response::PlayerResponse,
    probe::ContentLengthProber,
    streams::{StreamInfo, StreamManifest},
    video_id::VideoId,
};
use crate::{
    common::{
        errors::{StreamResult, YouTubeError},
        http::{HttpClient, cancellable},
    },
    configs::{Config, YouTubeConfig},
};

const NO_PLAYABLE_STREAMS: &str = "no playable streams";

/// Exponential delay between manifest attempts, capped at 8x the base.
struct Backoff {
    base_ms: u64,
    max_attempts: u32,
    attempt: u32,
}

impl Backoff {
    fn new(base_ms: u64, max_attempts: u32) -> Self {
        Self {
            base_ms,
            max_attempts,
            attempt: 0,
        }
    }

    fn next(&mut self) -> Duration {
        self.attempt += 1;
        let delay = self.base_ms * 2u64.pow((self.attempt - 1).min(3));
        Duration::from_millis(delay)
    }

    fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

/// Resolves stream manifests. One client holds one cipher cache, so the
/// player script is resolved at most once for its lifetime.
pub struct StreamClient {
    controller: Arc<dyn StreamController>,
    cipher: CipherCache,
    prober: ContentLengthProber,
    config: YouTubeConfig,
}

impl StreamClient {
    pub fn new(
        config: YouTubeConfig,
        http: reqwest::Client,
        controller: Arc<dyn StreamController>,
        cipher_source: Arc<dyn CipherSource>,
    ) -> Self {
        Self {
            controller,
            cipher: CipherCache::new(cipher_source),
            prober: ContentLengthProber::new(http),
            config,
        }
    }

    pub fn from_config(config: &Config) -> StreamResult<Self> {
        let http = HttpClient::build(&config.http)?;
        let controller = Arc::new(InnertubeController::new(
            http.clone(),
            config.youtube.innertube_api.clone(),
        ));
        let cipher_source = Arc::new(RemoteCipherSource::new(
            config.youtube.cipher.clone(),
            http.clone(),
        ));

        Ok(Self::new(config.youtube.clone(), http, controller, cipher_source))
    }

    pub fn cipher(&self) -> &CipherCache {
        &self.cipher
    }

    /// Resolves every playable stream of `video_id`, retrying the whole
    /// resolution on transient network failures.
    pub async fn get_manifest(
        &self,
        video_id: &VideoId,
        cancel: &CancellationToken,
    ) -> StreamResult<StreamManifest> {
        let mut backoff = Backoff::new(self.config.retry_backoff_ms, self.config.max_retries);

        loop {
            let err = match self.resolve_manifest(video_id, cancel).await {
                Ok(manifest) => return Ok(manifest),
                Err(e) => e,
            };

            if !err.is_transient() {
                return Err(err);
            }
            if cancel.is_cancelled() {
                return Err(YouTubeError::Cancelled);
            }
            if backoff.is_exhausted() {
                tracing::warn!("Manifest for {} failed, retries exhausted: {}", video_id, err);
                return Err(err);
            }

            let delay = backoff.next();
            tracing::warn!(
                "Manifest for {} failed (attempt {}/{}), retrying in {:?}: {}",
                video_id,
                backoff.attempt,
                self.config.max_retries,
                delay,
                err
            );
            if !delay.is_zero() {
                cancellable(cancel, async {
                    tokio::time::sleep(delay).await;
                    Ok(())
                })
                .await?;
            }
        }
    }

    async fn resolve_manifest(
        &self,
        video_id: &VideoId,
        cancel: &CancellationToken,
    ) -> StreamResult<StreamManifest> {
        let response = self.get_player_response(video_id, cancel).await?;
        self.get_manifest_from_response(video_id, &response, cancel)
            .await
    }

    /// Tries the cipher-less client first; only when that one can't play the
    /// video is the player script resolved and the signing client used.
    async fn get_player_response(
        &self,
        video_id: &VideoId,
        cancel: &CancellationToken,
    ) -> StreamResult<PlayerResponse> {
        let response = self
            .controller
            .get_player_response(video_id, None, cancel)
            .await?;
        if response.is_playable() {
            return Ok(response);
        }

        tracing::debug!(
            "{} not playable without cipher ({:?}), retrying with signature timestamp",
            video_id,
            response.playability_error()
        );

        let manifest = self.cipher.get(cancel).await?;
        let sts = manifest.signature_timestamp().ok_or_else(|| {
            YouTubeError::Cipher("cipher manifest has no signature timestamp".into())
        })?;

        self.controller
            .get_player_response(video_id, Some(sts), cancel)
            .await
    }

    /// Builds the manifest of an already fetched player response.
    pub async fn get_manifest_from_response(
        &self,
        video_id: &VideoId,
        response: &PlayerResponse,
        cancel: &CancellationToken,
    ) -> StreamResult<StreamManifest> {
        if let Some(preview_video_id) = response.preview_video_id() {
            return Err(YouTubeError::RequiresPurchase {
                video_id: video_id.to_string(),
                preview_video_id: preview_video_id.to_string(),
            });
        }

        if !response.is_playable() {
            return Err(YouTubeError::unplayable(
                video_id.as_str(),
                response.playability_error().map(str::to_string),
            ));
        }

        let builder = StreamInfoBuilder::new(&self.cipher, &self.prober);
        let mut streams: Vec<StreamInfo> = builder
            .build_all(response.streams(), self.config.probe_concurrency, cancel)
            .try_collect()
            .await?;

        if let Some(url) = response.dash_manifest_url() {
            match self.get_dash_streams(&builder, url, cancel).await {
                Ok(dash_streams) => streams.extend(dash_streams),
                Err(e) if e.is_network() => {
                    tracing::warn!("Ignoring DASH manifest for {}: {}", video_id, e);
                }
                Err(e) => return Err(e),
            }
        }

        if streams.is_empty() {
            return Err(YouTubeError::unplayable(
                video_id.as_str(),
                Some(NO_PLAYABLE_STREAMS.to_string()),
            ));
        }

        tracing::info!("Resolved {} streams for {}", streams.len(), video_id);
        Ok(StreamManifest::new(streams))
    }

    async fn get_dash_streams(
        &self,
        builder: &StreamInfoBuilder<'_>,
        url: &str,
        cancel: &CancellationToken,
    ) -> StreamResult<Vec<StreamInfo>> {
        let dash = self.controller.get_dash_manifest(url, cancel).await?;
        builder
            .build_all(&dash.streams, self.config.probe_concurrency, cancel)
            .try_collect()
            .await
    }
}
