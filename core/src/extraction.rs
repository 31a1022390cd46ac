//! C6 — Extraction Adapter.
//!
//! The actual scraping/extraction logic lives in an external service; this
//! module only defines the trait boundary a caller implements against, a
//! couple of typed records for its response shape, and URL normalization
//! helpers that are cheap enough to keep in-process.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// A single playable stream a source video exposes, after the extraction
/// backend has resolved it to a concrete URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub url: String,
    pub protocol: String,
    pub is_video: bool,
    pub is_audio: bool,
    pub quality_label: String,
    pub height: Option<u32>,
    pub abr_kbps: Option<u32>,
}

/// Video-level metadata, independent of which stream variant is chosen.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub uploader: Option<String>,
    pub channel_id: Option<String>,
    pub channel_url: Option<String>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub upload_date: Option<String>,
    pub duration: Option<f64>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionPayload {
    pub meta: VideoMeta,
    pub streams: Vec<StreamDescriptor>,
}

/// The pluggable interface between this gateway and whatever actually
/// extracts playable stream URLs from a source page. Implementations are
/// free to call out to a subprocess, an HTTP microservice, or an in-process
/// library — the gateway only depends on this trait.
#[async_trait]
pub trait StreamExtractor: Send + Sync {
    /// Fetches video-level metadata for `url`.
    async fn extract_info(&self, url: &str) -> Result<VideoMeta, GatewayError>;

    /// Fetches the list of playable stream variants for `url`, already
    /// filtered down to protocols this gateway understands and capped at
    /// the configured maximum count.
    async fn get_stream_infos(&self, url: &str) -> Result<Vec<StreamDescriptor>, GatewayError>;
}

/// Normalizes the handful of YouTube URL shapes a client might pass in
/// (`watch?v=`, `youtu.be/`, `/embed/`) down to one canonical form.
/// Rejects with an `InvalidUrl` error whenever no identifier can be
/// recovered, including for non-YouTube URLs — there's nothing to extract
/// a stream from otherwise, so this fails closed rather than passing an
/// un-normalized URL further down the pipeline.
pub fn normalize_youtube_url(input: &str) -> Result<String, GatewayError> {
    let parsed = url::Url::parse(input)
        .map_err(|e| GatewayError::invalid_url(input, e.to_string()))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(GatewayError::invalid_url(input, "unsupported url scheme"));
    }

    if let Some(id) = parsed.query_pairs().find(|(k, _)| k == "v").map(|(_, v)| v.to_string()) {
        return Ok(format!("https://www.youtube.com/watch?v={id}"));
    }

    let host = parsed.host_str().unwrap_or_default();
    if host.contains("youtu.be") {
        let id = parsed.path().trim_start_matches('/');
        if id.is_empty() {
            return Err(GatewayError::invalid_url(input, "missing video id in youtu.be url"));
        }
        return Ok(format!("https://www.youtube.com/watch?v={id}"));
    }

    if parsed.path().contains("embed") {
        if let Some(id) = parsed.path().rsplit('/').next().filter(|s| !s.is_empty()) {
            return Ok(format!("https://www.youtube.com/watch?v={id}"));
        }
    }

    Err(GatewayError::invalid_url(input, "no video id found in url"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_watch_url_unchanged() {
        let out = normalize_youtube_url("https://www.youtube.com/watch?v=abc123&t=10").unwrap();
        assert_eq!(out, "https://www.youtube.com/watch?v=abc123");
    }

    #[test]
    fn normalizes_short_url() {
        let out = normalize_youtube_url("https://youtu.be/abc123").unwrap();
        assert_eq!(out, "https://www.youtube.com/watch?v=abc123");
    }

    #[test]
    fn normalizes_embed_url() {
        let out = normalize_youtube_url("https://www.youtube.com/embed/abc123").unwrap();
        assert_eq!(out, "https://www.youtube.com/watch?v=abc123");
    }

    #[test]
    fn rejects_non_youtube_url_with_no_recoverable_id() {
        let err = normalize_youtube_url("https://cdn.example.com/video.m3u8");
        assert!(err.is_err());
    }

    #[test]
    fn rejects_non_http_scheme() {
        let err = normalize_youtube_url("ftp://cdn.example.com/video.m3u8");
        assert!(err.is_err());
    }

    #[test]
    fn rejects_watch_url_without_video_id() {
        let err = normalize_youtube_url("https://www.youtube.com/watch?list=abc");
        assert!(err.is_err());
    }
}
