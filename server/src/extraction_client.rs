//! Default `StreamExtractor`: delegates to an external extraction HTTP
//! service rather than scraping source pages itself. Swapping in an
//! in-process extractor later only requires a new implementation of the
//! trait — nothing else in this crate depends on this one directly.

use async_trait::async_trait;
use hls_gateway_core::GatewayError;
use hls_gateway_core::extraction::{StreamDescriptor, StreamExtractor, VideoMeta};
use serde::Deserialize;

pub struct HttpDelegatingExtractor {
    client: reqwest::Client,
    base_url: String,
    max_streams: usize,
}

impl HttpDelegatingExtractor {
    pub fn new(base_url: impl Into<String>, max_streams: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            max_streams,
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str, url: &str) -> Result<T, GatewayError> {
        let endpoint = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&endpoint)
            .query(&[("url", url)])
            .send()
            .await
            .map_err(GatewayError::Network)?;

        if !resp.status().is_success() {
            return Err(GatewayError::Extraction {
                reason: format!("extractor returned status {}", resp.status()),
            });
        }

        resp.json::<T>().await.map_err(|e| GatewayError::Extraction {
            reason: format!("malformed extractor response: {e}"),
        })
    }
}

#[async_trait]
impl StreamExtractor for HttpDelegatingExtractor {
    async fn extract_info(&self, url: &str) -> Result<VideoMeta, GatewayError> {
        self.get_json("/info", url).await
    }

    async fn get_stream_infos(&self, url: &str) -> Result<Vec<StreamDescriptor>, GatewayError> {
        let mut streams: Vec<StreamDescriptor> = self.get_json("/streams", url).await?;
        if streams.is_empty() {
            return Err(GatewayError::NoStreamsFound { url: url.to_string() });
        }
        streams.truncate(self.max_streams);
        Ok(streams)
    }
}
