//! Shared application state, cloned into every handler via `State<AppState>`.

use std::sync::Arc;
use std::time::Instant;

use hls_gateway_core::extraction::StreamExtractor;
use hls_gateway_core::{GatewayCache, GatewaySettings};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<GatewaySettings>,
    pub cache: Arc<GatewayCache>,
    pub extractor: Arc<dyn StreamExtractor>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(settings: GatewaySettings, extractor: Arc<dyn StreamExtractor>) -> Self {
        let cache = Arc::new(GatewayCache::new(&settings.cache));
        Self {
            settings: Arc::new(settings),
            cache,
            extractor,
            start_time: Instant::now(),
        }
    }
}
