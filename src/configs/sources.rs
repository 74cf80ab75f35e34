use serde::{Deserialize, Serialize};

/// InnerTube API base endpoint (googleapis is more stable and avoids
/// some geo-restrictions that www.youtube.com may impose).
pub const DEFAULT_INNERTUBE_API: &str = "https://youtubei.googleapis.com";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YouTubeConfig {
  #[serde(default = "default_innertube_api")]
  pub innertube_api: String,
  /// Extra attempts after the first one when a transient network error occurs.
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  /// Base delay between attempts; 0 retries immediately.
  #[serde(default)]
  pub retry_backoff_ms: u64,
  /// How many descriptors are probed at once. 1 keeps probing sequential.
  #[serde(default = "default_probe_concurrency")]
  pub probe_concurrency: usize,
  #[serde(default)]
  pub cipher: YouTubeCipherConfig,
}

fn default_innertube_api() -> String {
  DEFAULT_INNERTUBE_API.to_string()
}

fn default_max_retries() -> u32 {
  5
}

fn default_probe_concurrency() -> usize {
  1
}

impl Default for YouTubeConfig {
  fn default() -> Self {
    Self {
      innertube_api: default_innertube_api(),
      max_retries: default_max_retries(),
      retry_backoff_ms: 0,
      probe_concurrency: default_probe_concurrency(),
      cipher: YouTubeCipherConfig::default(),
    }
  }
}

/// Remote deciphering service (yt-cipher compatible).
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct YouTubeCipherConfig {
  pub url: Option<String>,
  pub token: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
  pub user_agent: Option<String>,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
  pub proxy: Option<HttpProxyConfig>,
}

fn default_timeout_secs() -> u64 {
  10
}

impl Default for HttpConfig {
  fn default() -> Self {
    Self {
      user_agent: None,
      timeout_secs: default_timeout_secs(),
      proxy: None,
    }
  }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct HttpProxyConfig {
  pub url: Option<String>,
  pub username: Option<String>,
  pub password: Option<String>,
}
