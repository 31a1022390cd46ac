//! Process-wide settings for the proxy pipeline.
//!
//! Small structs with a `Default` impl, each one scoped to a single
//! component.

use std::time::Duration;

/// C3 upstream fetcher tuning.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub max_keepalive_connections: usize,
    pub keepalive_expiry: Duration,
    pub max_redirects: usize,
    pub retries: u32,
    pub retry_delay: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            connect_timeout: Duration::from_secs(5),
            max_keepalive_connections: 20,
            keepalive_expiry: Duration::from_secs(90),
            max_redirects: 5,
            retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// C2 two-tier cache tuning.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub ttl_m3u8: Duration,
    pub ttl_segment: Duration,
    pub ttl_extraction: Duration,
    pub max_manifest_entries: u64,
    pub max_segment_entries: u64,
    /// Cache-key namespace prefix (see `cache_key`'s `"{namespace}:{kind}:{upstream_url}"` shape).
    pub namespace: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_m3u8: Duration::from_secs(60),
            ttl_segment: Duration::from_secs(300),
            ttl_extraction: Duration::from_secs(600),
            max_manifest_entries: 2_000,
            max_segment_entries: 10_000,
            namespace: "hls-gateway".to_string(),
        }
    }
}

/// C1/C4 rewriter and prefetch tuning.
#[derive(Debug, Clone)]
pub struct ProxySettings {
    /// Path+query prefix the proxy rewrites URIs to, appended to the
    /// request's own `{scheme}://{host}/` at rewrite time so the gateway
    /// stays relocatable.
    pub base_path: String,
    pub url_safe_chars: String,
    pub force_start_offset: bool,
    pub prefetch_segments: usize,
    pub init_chunk: usize,
    pub max_chunk: usize,
    pub streaming_threshold_bytes: u64,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            base_path: "proxy?url=".to_string(),
            url_safe_chars: "/:?&=".to_string(),
            force_start_offset: true,
            prefetch_segments: 3,
            init_chunk: 64 * 1024,
            max_chunk: 256 * 1024,
            streaming_threshold_bytes: 2 * 1024 * 1024,
        }
    }
}

/// C6 extraction adapter tuning.
#[derive(Debug, Clone)]
pub struct StreamExtractionSettings {
    pub extractor_base_url: String,
    pub max_streams: usize,
    pub supported_protocols: Vec<String>,
}

impl Default for StreamExtractionSettings {
    fn default() -> Self {
        Self {
            extractor_base_url: "http://127.0.0.1:8090".to_string(),
            max_streams: 50,
            supported_protocols: vec!["m3u8".to_string(), "m3u8_native".to_string()],
        }
    }
}

/// Outgoing-response shaping (headers to forward, CORS).
#[derive(Debug, Clone)]
pub struct ResponseSettings {
    pub cors_allow_any_origin: bool,
    pub passthrough_headers: Vec<String>,
}

impl Default for ResponseSettings {
    fn default() -> Self {
        Self {
            cors_allow_any_origin: true,
            passthrough_headers: vec![
                "content-type".into(),
                "content-length".into(),
                "content-range".into(),
                "accept-ranges".into(),
                "cache-control".into(),
                "etag".into(),
                "last-modified".into(),
                "date".into(),
            ],
        }
    }
}

/// The full settings bundle for the pipeline, read once at startup.
#[derive(Debug, Clone, Default)]
pub struct GatewaySettings {
    pub http: HttpSettings,
    pub cache: CacheSettings,
    pub proxy: ProxySettings,
    pub extraction: StreamExtractionSettings,
    pub response: ResponseSettings,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl GatewaySettings {
    /// Build settings from `Default` values overridden by environment
    /// variables.
    pub fn from_env() -> Self {
        let mut s = Self::default();

        s.http.timeout = Duration::from_secs(env_or("HTTP_TIMEOUT_SECS", s.http.timeout.as_secs()));
        s.http.retries = env_or("HTTP_RETRIES", s.http.retries);

        s.cache.ttl_m3u8 = Duration::from_secs(env_or("CACHE_TTL_M3U8_SECS", s.cache.ttl_m3u8.as_secs()));
        s.cache.ttl_segment =
            Duration::from_secs(env_or("CACHE_TTL_SEGMENT_SECS", s.cache.ttl_segment.as_secs()));

        s.proxy.prefetch_segments = env_or("PREFETCH_SEGMENTS", s.proxy.prefetch_segments);
        s.proxy.force_start_offset = env_or("FORCE_START_OFFSET", s.proxy.force_start_offset);

        if let Ok(base) = std::env::var("EXTRACTOR_BASE_URL") {
            s.extraction.extractor_base_url = base;
        }

        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_internally_consistent() {
        let s = GatewaySettings::default();
        assert!(s.proxy.init_chunk <= s.proxy.max_chunk);
        assert!(s.proxy.prefetch_segments > 0);
    }

    #[test]
    fn documented_defaults_are_pinned() {
        let s = GatewaySettings::default();
        assert_eq!(s.http.timeout, Duration::from_secs(20));
        assert_eq!(s.http.retries, 3);
        assert_eq!(s.cache.ttl_m3u8, Duration::from_secs(60));
        assert_eq!(s.cache.ttl_segment, Duration::from_secs(300));
        assert_eq!(s.extraction.max_streams, 50);
    }
}
