use std::{future::Future, time::Duration};

use reqwest::{Client, Error, Response, StatusCode};
use tokio_util::sync::CancellationToken;

use crate::{
  common::errors::{StreamResult, YouTubeError},
  configs::HttpConfig,
};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36";

pub struct HttpClient;

impl HttpClient {
  pub fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
  }

  pub fn new() -> Result<Client, Error> {
    Self::build(&HttpConfig::default())
  }

  pub fn build(config: &HttpConfig) -> Result<Client, Error> {
    let user_agent = config
      .user_agent
      .clone()
      .unwrap_or_else(Self::default_user_agent);

    let mut builder = Client::builder()
      .user_agent(user_agent)
      .timeout(Duration::from_secs(config.timeout_secs));

    if let Some(proxy_config) = &config.proxy {
      if let Some(p_url) = &proxy_config.url {
        let mut proxy = reqwest::Proxy::all(p_url)?;
        if let (Some(u), Some(p)) = (&proxy_config.username, &proxy_config.password) {
          proxy = proxy.basic_auth(u, p);
        }
        builder = builder.proxy(proxy);
        tracing::debug!("Configured HTTP proxy: {}", p_url);
      }
    }

    builder.build()
  }
}

/// Races `fut` against `cancel`, so an in-flight request is dropped as soon as
/// cancellation is requested.
pub async fn cancellable<F, T>(cancel: &CancellationToken, fut: F) -> StreamResult<T>
where
  F: Future<Output = StreamResult<T>>,
{
  tokio::select! {
    biased;
    _ = cancel.cancelled() => Err(YouTubeError::Cancelled),
    res = fut => res,
  }
}

/// Sends a request under `cancel`.
pub async fn send(
  cancel: &CancellationToken,
  request: reqwest::RequestBuilder,
) -> StreamResult<Response> {
  cancellable(cancel, async { Ok(request.send().await?) }).await
}

/// Turns any non-success status into a `Status` error.
pub fn ensure_success(response: Response) -> StreamResult<Response> {
  let status = response.status();
  if status.is_success() {
    Ok(response)
  } else {
    Err(YouTubeError::Status {
      status,
      url: response.url().to_string(),
    })
  }
}

pub fn is_not_found(response: &Response) -> bool {
  response.status() == StatusCode::NOT_FOUND
}

/// Reads the `Content-Length` header verbatim. `Response::content_length`
/// reports the body size hint, which is zero for HEAD responses.
pub fn header_content_length(response: &Response) -> Option<u64> {
  response
    .headers()
    .get(reqwest::header::CONTENT_LENGTH)
    .and_then(|v| v.to_str().ok())
    .and_then(|s| s.trim().parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_cancellable_returns_cancelled() {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let res: StreamResult<u32> = cancellable(&cancel, std::future::pending()).await;
    assert!(matches!(res, Err(YouTubeError::Cancelled)));
  }

  #[tokio::test]
  async fn test_cancel_aborts_in_flight_request() {
    use std::time::Instant;
    use wiremock::{Mock, MockServer, ResponseTemplate, matchers::method};

    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
      .mount(&server)
      .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(100)).await;
      trigger.cancel();
    });

    let started = Instant::now();
    let res = send(&cancel, Client::new().get(server.uri())).await;
    assert!(matches!(res, Err(YouTubeError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(2));
  }

  #[tokio::test]
  async fn test_cancellable_passes_through() {
    let cancel = CancellationToken::new();
    let res = cancellable(&cancel, async { Ok(7u32) }).await;
    assert_eq!(res.ok(), Some(7));
  }

  #[test]
  fn test_build_with_proxy() {
    let config = HttpConfig {
      proxy: Some(crate::configs::HttpProxyConfig {
        url: Some("http://127.0.0.1:8080".to_string()),
        username: Some("user".to_string()),
        password: Some("pass".to_string()),
      }),
      ..Default::default()
    };
    assert!(HttpClient::build(&config).is_ok());
  }
}
