//! C6 HTTP surface — `/extract?url=`.
//!
//! Normalizes the source URL, resolves video metadata and playable stream
//! variants through the configured `StreamExtractor`, and caches the
//! combined payload, mirroring the Python original's
//! `@cached(ttl=600, key_builder=...)`-decorated `extract_cached`.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use serde::Deserialize;
use serde_json::json;

use hls_gateway_core::cache_key;
use hls_gateway_core::extraction::{ExtractionPayload, normalize_youtube_url};
use hls_gateway_core::rewriter::proxify;

use crate::error::ApiResult;
use crate::routes::proxy::proxy_base;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(extract))
}

#[derive(Deserialize)]
struct ExtractQuery {
    url: String,
}

async fn extract(
    State(state): State<AppState>,
    Query(query): Query<ExtractQuery>,
    req_headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let normalized = normalize_youtube_url(&query.url)?;
    let key = cache_key(&state.settings.cache.namespace, "payload", &normalized);
    let proxy_base = proxy_base(&req_headers, &state.settings.proxy.base_path);
    let url_safe_chars = state.settings.proxy.url_safe_chars.clone();

    let extractor = state.extractor.clone();
    let payload = state
        .cache
        .extractions
        .get_or_fill(&key, || async move {
            let (meta, streams) =
                tokio::try_join!(extractor.extract_info(&normalized), extractor.get_stream_infos(&normalized))?;

            let mut streams = streams;
            for stream in &mut streams {
                let base = url::Url::parse(&stream.url)
                    .map_err(|e| hls_gateway_core::GatewayError::invalid_url(stream.url.as_str(), e.to_string()))?;
                stream.url = proxify(&stream.url, &base, &proxy_base, &url_safe_chars)?;
            }

            let payload = ExtractionPayload { meta, streams };
            let value = serde_json::to_value(&payload)
                .map_err(|e| hls_gateway_core::GatewayError::Internal(e.to_string()))?;
            Ok::<_, hls_gateway_core::GatewayError>(Arc::new(value))
        })
        .await?;

    Ok(axum::Json(json!(*payload)))
}
