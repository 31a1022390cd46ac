//! C3 — Upstream Fetcher.
//!
//! A single process-wide `reqwest::Client`, reused across every request,
//! with timeout-only retries on a linear backoff.

use std::sync::OnceLock;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use tokio_util::sync::CancellationToken;

use crate::config::HttpSettings;
use crate::error::GatewayError;
use crate::retry::{RetryAction, RetryPolicy, retry_with_backoff};

static CLIENT: OnceLock<Result<reqwest::Client, String>> = OnceLock::new();

fn client(settings: &HttpSettings) -> Result<&'static reqwest::Client, GatewayError> {
    CLIENT
        .get_or_init(|| {
            reqwest::Client::builder()
                .connect_timeout(settings.connect_timeout)
                .pool_max_idle_per_host(settings.max_keepalive_connections)
                .pool_idle_timeout(settings.keepalive_expiry)
                .redirect(reqwest::redirect::Policy::limited(settings.max_redirects))
                .build()
                .map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(|e| GatewayError::Internal(format!("failed to build http client: {e}")))
}

pub struct UpstreamResponse {
    pub body: Bytes,
    pub headers: HeaderMap,
    pub status: reqwest::StatusCode,
}

/// C3's single public entrypoint: fetch `url` with the configured headers
/// forwarded, retrying only on timeout.
pub async fn fetch(
    settings: &HttpSettings,
    url: &str,
    forward_headers: HeaderMap,
    token: &CancellationToken,
) -> Result<UpstreamResponse, GatewayError> {
    let http = client(settings)?;
    let policy = RetryPolicy {
        max_retries: settings.retries,
        delay: settings.retry_delay,
    };

    retry_with_backoff(&policy, token, || async {
        let req = http
            .get(url)
            .headers(forward_headers.clone())
            .timeout(settings.timeout);

        match req.send().await {
            Ok(resp) if resp.status().is_success() => {
                let status = resp.status();
                let headers = resp.headers().clone();
                match resp.bytes().await {
                    Ok(body) => RetryAction::Success(UpstreamResponse { body, headers, status }),
                    Err(e) if e.is_timeout() => RetryAction::Retry,
                    Err(e) => RetryAction::Fail(GatewayError::Network(e)),
                }
            }
            Ok(resp) => {
                tracing::warn!(status = %resp.status(), %url, "upstream returned non-success status");
                RetryAction::Fail(GatewayError::upstream_status(resp.status().as_u16(), url))
            }
            Err(e) if e.is_timeout() => {
                tracing::debug!(%url, "upstream request timed out, will retry");
                RetryAction::Retry
            }
            Err(e) => RetryAction::Fail(GatewayError::Network(e)),
        }
    })
    .await
}

/// Like [`fetch`] but streams the body instead of buffering it, used by the
/// prefetcher for segments above the streaming threshold.
pub async fn fetch_streamed(
    settings: &HttpSettings,
    url: &str,
    forward_headers: HeaderMap,
    token: &CancellationToken,
) -> Result<reqwest::Response, GatewayError> {
    let http = client(settings)?;
    let policy = RetryPolicy {
        max_retries: settings.retries,
        delay: settings.retry_delay,
    };

    retry_with_backoff(&policy, token, || async {
        let req = http
            .get(url)
            .headers(forward_headers.clone())
            .timeout(settings.timeout);

        match req.send().await {
            Ok(resp) if resp.status().is_success() => RetryAction::Success(resp),
            Ok(resp) => RetryAction::Fail(GatewayError::upstream_status(resp.status().as_u16(), url)),
            Err(e) if e.is_timeout() => RetryAction::Retry,
            Err(e) => RetryAction::Fail(GatewayError::Network(e)),
        }
    })
    .await
}

/// Reads a streamed response into a contiguous buffer, collecting chunks as
/// they arrive — used when the caller needs the whole segment body (e.g. to
/// populate the segment cache) rather than a live pass-through stream.
pub async fn drain_to_bytes(
    response: reqwest::Response,
    token: &CancellationToken,
) -> Result<Bytes, GatewayError> {
    use futures::StreamExt;

    let content_length = response.content_length().unwrap_or(0) as usize;
    let mut buffer = bytes::BytesMut::with_capacity(content_length);
    let mut stream = response.bytes_stream();

    while let Some(chunk) = tokio::select! {
        _ = token.cancelled() => return Err(GatewayError::Cancelled),
        next = stream.next() => next,
    } {
        buffer.extend_from_slice(&chunk.map_err(GatewayError::Network)?);
    }

    Ok(buffer.freeze())
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Spawns a one-shot raw HTTP/1.1 server that always replies with
    /// `response`, regardless of what it's asked for.
    async fn spawn_canned_upstream(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/segment.ts")
    }

    #[tokio::test]
    async fn fetch_returns_body_and_status_on_success() {
        let url = spawn_canned_upstream(
            "HTTP/1.1 200 OK\r\ncontent-type: video/mp2t\r\ncontent-length: 3\r\n\r\nabc",
        )
        .await;

        let settings = HttpSettings::default();
        let token = CancellationToken::new();
        let resp = fetch(&settings, &url, HeaderMap::new(), &token).await.unwrap();

        assert_eq!(resp.status, reqwest::StatusCode::OK);
        assert_eq!(&resp.body[..], b"abc");
    }

    #[tokio::test]
    async fn fetch_surfaces_upstream_error_status_without_retry() {
        let url = spawn_canned_upstream("HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\n\r\n").await;

        let settings = HttpSettings::default();
        let token = CancellationToken::new();
        let err = fetch(&settings, &url, HeaderMap::new(), &token).await.unwrap_err();

        assert!(matches!(err, GatewayError::UpstreamStatus { status: 404, .. }));
    }
}
