use serde::{Deserialize, Serialize};

use crate::{common::types::AnyResult, configs::*};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
  #[serde(default)]
  pub logging: Option<LoggingConfig>,
  #[serde(default)]
  pub http: HttpConfig,
  #[serde(default)]
  pub youtube: YouTubeConfig,
}

impl Config {
  pub fn load() -> AnyResult<Self> {
    let config_path = if std::path::Path::new("config.toml").exists() {
      "config.toml"
    } else if std::path::Path::new("config.default.toml").exists() {
      "config.default.toml"
    } else {
      return Err("config.toml or config.default.toml not found".into());
    };

    tracing::info!("Loading configuration from: {}", config_path);

    let config_str = std::fs::read_to_string(config_path)?;
    if config_str.trim().is_empty() {
      return Err(format!("{} is empty", config_path).into());
    }

    Self::from_toml_str(&config_str)
  }

  pub fn from_toml_str(config_str: &str) -> AnyResult<Self> {
    let config: Config = toml::from_str(config_str)?;
    Ok(config)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults_from_empty_sections() {
    let config = Config::from_toml_str("[youtube]\n").unwrap();
    assert_eq!(config.youtube.max_retries, 5);
    assert_eq!(config.youtube.probe_concurrency, 1);
    assert_eq!(config.youtube.innertube_api, DEFAULT_INNERTUBE_API);
    assert_eq!(config.http.timeout_secs, 10);
    assert!(config.logging.is_none());
  }

  #[test]
  fn test_full_config() {
    let raw = r#"
      [logging]
      level = "debug"
      filters = "hyper=warn"

      [logging.file]
      path = "logs/ytmanifest.log"

      [http]
      user_agent = "test-agent"
      timeout_secs = 3

      [youtube]
      max_retries = 2
      retry_backoff_ms = 100
      probe_concurrency = 4

      [youtube.cipher]
      url = "http://localhost:8001"
      token = "secret"
    "#;

    let config = Config::from_toml_str(raw).unwrap();
    let logging = config.logging.unwrap();
    assert_eq!(logging.level.as_deref(), Some("debug"));
    assert_eq!(logging.file.unwrap().max_lines, 10_000);
    assert_eq!(config.http.user_agent.as_deref(), Some("test-agent"));
    assert_eq!(config.http.timeout_secs, 3);
    assert_eq!(config.youtube.max_retries, 2);
    assert_eq!(config.youtube.retry_backoff_ms, 100);
    assert_eq!(config.youtube.probe_concurrency, 4);
    assert_eq!(
      config.youtube.cipher.url.as_deref(),
      Some("http://localhost:8001")
    );
    assert_eq!(config.youtube.cipher.token.as_deref(), Some("secret"));
  }
}
