use tokio_util::sync::CancellationToken;

use super::utils::get_segment_url;
use crate::common::{
    errors::StreamResult,
    http::{ensure_success, header_content_length, is_not_found, send},
};

/// Checks that a stream URL is live and learns its size when the descriptor
/// doesn't declare one.
#[derive(Clone)]
pub struct ContentLengthProber {
    http: reqwest::Client,
}

impl ContentLengthProber {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Returns the stream size, or `None` when the URL is gone (404) or its
    /// size can't be learned, and the stream should be dropped. Other failure
    /// statuses are errors.
    pub async fn probe(
        &self,
        url: &str,
        declared_length: Option<u64>,
        cancel: &CancellationToken,
    ) -> StreamResult<Option<u64>> {
        let content_length = match declared_length {
            Some(len) => len,
            None => {
                let res = send(cancel, self.http.head(url)).await?;
                if is_not_found(&res) {
                    tracing::debug!("HEAD {} returned 404, dropping stream", url);
                    return Ok(None);
                }
                let res = ensure_success(res)?;
                match header_content_length(&res) {
                    Some(len) => len,
                    None => {
                        tracing::debug!("No Content-Length for {}, dropping stream", url);
                        return Ok(None);
                    }
                }
            }
        };

        // Ask for the last two bytes: some URLs report a length but fail once
        // the body is actually requested.
        let tail_url = get_segment_url(
            url,
            content_length.saturating_sub(2),
            content_length.saturating_sub(1),
        );
        let res = send(cancel, self.http.get(&tail_url)).await?;
        if is_not_found(&res) {
            tracing::debug!("Tail probe for {} returned 404, dropping stream", url);
            return Ok(None);
        }
        ensure_success(res)?;

        Ok(Some(content_length))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::errors::YouTubeError;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    fn prober() -> ContentLengthProber {
        ContentLengthProber::new(reqwest::Client::new())
    }

    #[tokio::test]
    async fn test_declared_length_skips_head() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/videoplayback"))
            .and(query_param("range", "8-9"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 2]))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let url = format!("{}/videoplayback?itag=18", server.uri());
        let size = prober()
            .probe(&url, Some(10), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(size, Some(10));
    }

    #[tokio::test]
    async fn test_head_supplies_length() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/videoplayback"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 4096]))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/videoplayback"))
            .and(query_param("range", "4094-4095"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 2]))
            .mount(&server)
            .await;

        let url = format!("{}/videoplayback?itag=251", server.uri());
        let size = prober()
            .probe(&url, None, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(size, Some(4096));
    }

    #[tokio::test]
    async fn test_head_without_length_drops_stream() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/videoplayback"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 2]))
            .expect(0)
            .mount(&server)
            .await;

        let url = format!("{}/videoplayback?itag=140", server.uri());
        let size = prober()
            .probe(&url, None, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(size, None);
    }

    #[tokio::test]
    async fn test_not_found_drops_stream() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/videoplayback?itag=22", server.uri());
        let size = prober()
            .probe(&url, None, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(size, None);
    }

    #[tokio::test]
    async fn test_tail_not_found_drops_stream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/videoplayback?itag=22", server.uri());
        let size = prober()
            .probe(&url, Some(100), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(size, None);
    }

    #[tokio::test]
    async fn test_other_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let url = format!("{}/videoplayback?itag=22", server.uri());
        let res = prober()
            .probe(&url, Some(100), &CancellationToken::new())
            .await;
        match res {
            Err(YouTubeError::Status { status, .. }) => assert_eq!(status.as_u16(), 403),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }
}
