//! C5 — Proxy Endpoint.
//!
//! Dispatches on the requested URL's `.m3u8` suffix: manifest requests are
//! rewritten through the manifest cache tier, everything else is treated
//! as a media segment and streamed through the prefetcher.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::Response;
use axum::routing::get;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use hls_gateway_core::cache_key;
use hls_gateway_core::fetcher;
use hls_gateway_core::prefetch::{SegmentRef, prefetch_stream};
use hls_gateway_core::rewriter::rewrite_manifest;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(proxy))
}

#[derive(Deserialize)]
struct ProxyQuery {
    url: String,
}

/// Derives `{scheme}://{host}/{base_path}` from the request's own headers
/// so the proxy prefix always matches whatever host/scheme the client
/// actually reached the gateway on, making it relocatable behind any
/// hostname or reverse proxy without redeploying with a new base URL.
pub(crate) fn proxy_base(req_headers: &HeaderMap, base_path: &str) -> String {
    let scheme = req_headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("http");
    let host = req_headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    format!("{scheme}://{host}/{base_path}")
}

fn forward_request_headers(req_headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for name in [header::RANGE, header::USER_AGENT, header::ACCEPT, header::ACCEPT_ENCODING] {
        if let Some(v) = req_headers.get(&name) {
            out.insert(name, v.clone());
        }
    }
    out
}

async fn proxy(
    State(state): State<AppState>,
    Query(query): Query<ProxyQuery>,
    req_headers: HeaderMap,
) -> ApiResult<Response> {
    let upstream_url = Url::parse(&query.url).map_err(|e| ApiError::bad_request(format!("invalid url: {e}")))?;

    if upstream_url.path().ends_with(".m3u8") {
        serve_manifest(&state, upstream_url, &req_headers).await
    } else {
        serve_segment(&state, upstream_url, &req_headers).await
    }
}

async fn serve_manifest(state: &AppState, upstream_url: Url, req_headers: &HeaderMap) -> ApiResult<Response> {
    let key = cache_key(&state.settings.cache.namespace, "rewritten", upstream_url.as_str());
    let proxy_base = proxy_base(req_headers, &state.settings.proxy.base_path);
    let settings = state.settings.clone();
    let forward_headers = forward_request_headers(req_headers);
    let token = CancellationToken::new();

    let url_for_fetch = upstream_url.clone();
    let body: Arc<str> = state
        .cache
        .manifests
        .get_or_fill(&key, || async move {
            let resp = fetcher::fetch(&settings.http, url_for_fetch.as_str(), forward_headers, &token).await?;
            let text = std::str::from_utf8(&resp.body)
                .map_err(hls_gateway_core::GatewayError::InvalidManifestEncoding)?;
            let rewritten = rewrite_manifest(
                text,
                &url_for_fetch,
                &proxy_base,
                &settings.proxy.url_safe_chars,
                settings.proxy.force_start_offset,
            )?;
            Ok::<Arc<str>, hls_gateway_core::GatewayError>(Arc::from(rewritten))
        })
        .await?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/vnd.apple.mpegurl")
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .header(
            header::CACHE_CONTROL,
            format!("public, max-age={}", state.settings.cache.ttl_m3u8.as_secs()),
        )
        .body(Body::from(body.to_string()))
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(response)
}

async fn serve_segment(state: &AppState, upstream_url: Url, req_headers: &HeaderMap) -> ApiResult<Response> {
    let key = cache_key(&state.settings.cache.namespace, "raw", upstream_url.as_str());
    let segments = vec![SegmentRef {
        index: 0,
        url: upstream_url.to_string(),
        cache_key: key,
    }];

    let token = CancellationToken::new();
    let forward_headers = forward_request_headers(req_headers);
    let ttl_segment = state.settings.cache.ttl_segment.as_secs();

    let stream = prefetch_stream(
        Arc::new(state.settings.http.clone()),
        Arc::new(state.settings.proxy.clone()),
        state.cache.clone(),
        segments,
        forward_headers,
        token,
    );

    let body_stream = futures::StreamExt::map(stream, |item| {
        item.map_err(|e| std::io::Error::other(e.to_string()))
    });

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .header(header::CACHE_CONTROL, format!("public, max-age={ttl_segment}"))
        .body(Body::from_stream(body_stream))
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_base_uses_request_host_and_defaults_to_http() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("gateway.example"));
        assert_eq!(proxy_base(&headers, "proxy?url="), "http://gateway.example/proxy?url=");
    }

    #[test]
    fn proxy_base_honors_forwarded_proto() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("gateway.example"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert_eq!(proxy_base(&headers, "proxy?url="), "https://gateway.example/proxy?url=");
    }
}
