//! C4 — Segment Prefetcher.
//!
//! Fetches a list of segments with bounded concurrency but delivers their
//! bytes to the consumer in strict request order, regardless of which
//! segment's fetch actually finishes first. Completed-but-undelivered
//! segments are held in an index-keyed `BTreeMap`; a drain loop only ever
//! pops the next expected index, which is what gives the ordering
//! guarantee independent of completion order.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::Stream;
use reqwest::header::HeaderMap;
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;

use crate::cache::GatewayCache;
use crate::config::{HttpSettings, ProxySettings};
use crate::error::GatewayError;
use crate::fetcher;

/// One segment to fetch, identified by its position in the playlist so the
/// drain loop can reassemble output order.
#[derive(Debug, Clone)]
pub struct SegmentRef {
    pub index: usize,
    pub url: String,
    pub cache_key: String,
}

/// A stream adapter that cancels `token` when dropped — used so that a
/// client disconnecting mid-response (Axum drops the body stream) tears
/// down the in-flight prefetch work instead of letting it run to
/// completion for nothing.
pub struct CancelOnDrop<S> {
    inner: S,
    token: CancellationToken,
}

impl<S> CancelOnDrop<S> {
    pub fn new(inner: S, token: CancellationToken) -> Self {
        Self { inner, token }
    }
}

impl<S: Stream + Unpin> Stream for CancelOnDrop<S> {
    type Item = S::Item;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        std::pin::Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl<S> Drop for CancelOnDrop<S> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

fn chunk_bytes(body: &Bytes, init_chunk: usize, max_chunk: usize) -> Vec<Bytes> {
    if body.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    let first_len = init_chunk.min(body.len());
    out.push(body.slice(0..first_len));
    let mut offset = first_len;
    while offset < body.len() {
        let len = max_chunk.min(body.len() - offset);
        out.push(body.slice(offset..offset + len));
        offset += len;
    }
    out
}

async fn fetch_segment(
    http: Arc<HttpSettings>,
    proxy: Arc<ProxySettings>,
    cache: Arc<GatewayCache>,
    seg: SegmentRef,
    headers: HeaderMap,
    token: CancellationToken,
) -> Result<Bytes, GatewayError> {
    let key = seg.cache_key.clone();
    let url = seg.url.clone();
    cache
        .segments
        .get_or_fill(&key, || async move {
            let resp = fetcher::fetch_streamed(&http, &url, headers, &token).await?;
            fetcher::drain_to_bytes(resp, &token).await
        })
        .await
}

/// Runs the bounded-concurrency fetch + strict-order drain, returning a
/// stream of delivery-sized byte chunks in request order.
///
/// Concurrency is capped at `proxy.prefetch_segments`: that many segment
/// fetches may be in flight at once, never more. Memory is bounded by the
/// same number, since a completed segment that's ahead of the next
/// expected index just sits in the reorder map until its turn.
pub fn prefetch_stream(
    http: Arc<HttpSettings>,
    proxy: Arc<ProxySettings>,
    cache: Arc<GatewayCache>,
    segments: Vec<SegmentRef>,
    headers: HeaderMap,
    token: CancellationToken,
) -> CancelOnDrop<mpsc::Receiver<Result<Bytes, GatewayError>>> {
    let (tx, rx) = mpsc::channel(proxy.prefetch_segments.max(1));
    let drain_token = token.clone();

    tokio::spawn(async move {
        let semaphore = Arc::new(Semaphore::new(proxy.prefetch_segments.max(1)));
        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<(usize, Result<Bytes, GatewayError>)>();

        let dispatch_token = drain_token.clone();
        let dispatch = {
            let semaphore = semaphore.clone();
            let http = http.clone();
            let proxy = proxy.clone();
            let cache = cache.clone();
            let headers = headers.clone();
            async move {
                for seg in segments {
                    if dispatch_token.is_cancelled() {
                        break;
                    }
                    let permit = match semaphore.clone().acquire_owned().await {
                        Ok(p) => p,
                        Err(_) => break,
                    };
                    let http = http.clone();
                    let proxy = proxy.clone();
                    let cache = cache.clone();
                    let headers = headers.clone();
                    let result_tx = result_tx.clone();
                    let token = dispatch_token.clone();
                    let index = seg.index;
                    tokio::spawn(async move {
                        let outcome = fetch_segment(http, proxy, cache, seg, headers, token).await;
                        let _ = result_tx.send((index, outcome));
                        drop(permit);
                    });
                }
            }
        };
        tokio::spawn(dispatch);

        let mut pending: BTreeMap<usize, Result<Bytes, GatewayError>> = BTreeMap::new();
        let mut next_index = 0usize;

        while let Some((index, outcome)) = result_rx.recv().await {
            pending.insert(index, outcome);

            while let Some(outcome) = pending.remove(&next_index) {
                next_index += 1;
                match outcome {
                    Ok(bytes) => {
                        for chunk in chunk_bytes(&bytes, proxy.init_chunk, proxy.max_chunk) {
                            if tx.send(Ok(chunk)).await.is_err() || drain_token.is_cancelled() {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                }
            }
        }
    });

    CancelOnDrop::new(rx, token)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;

    use super::*;

    fn settings() -> (Arc<HttpSettings>, Arc<ProxySettings>, Arc<GatewayCache>) {
        let http = Arc::new(HttpSettings::default());
        let proxy = Arc::new(ProxySettings {
            prefetch_segments: 3,
            init_chunk: 4,
            max_chunk: 4,
            ..ProxySettings::default()
        });
        let cache = Arc::new(GatewayCache::new(&crate::config::CacheSettings::default()));
        (http, proxy, cache)
    }

    #[test]
    fn chunk_bytes_splits_first_chunk_at_init_size() {
        let body = Bytes::from_static(b"0123456789");
        let chunks = chunk_bytes(&body, 3, 4);
        assert_eq!(chunks[0], Bytes::from_static(b"012"));
        assert_eq!(chunks[1], Bytes::from_static(b"3456"));
        assert_eq!(chunks[2], Bytes::from_static(b"789"));
    }

    #[tokio::test]
    async fn delivers_segments_in_request_order_even_if_fetched_out_of_order() {
        // Segments resolve to cached values immediately (no network) so we
        // exercise only the reorder/drain logic deterministically: the
        // cache is pre-seeded here, standing in for "fetch already done".
        let (http, proxy, cache) = settings();

        for (i, body) in [(0, "aaaa"), (1, "bbbb"), (2, "cccc")] {
            cache
                .segments
                .get_or_fill(&format!("seg:{i}"), || async move {
                    Ok::<Bytes, GatewayError>(Bytes::from(body))
                })
                .await
                .unwrap();
        }

        let segments = vec![
            SegmentRef { index: 0, url: "unused://0".into(), cache_key: "seg:0".into() },
            SegmentRef { index: 1, url: "unused://1".into(), cache_key: "seg:1".into() },
            SegmentRef { index: 2, url: "unused://2".into(), cache_key: "seg:2".into() },
        ];

        let token = CancellationToken::new();
        let mut stream =
            prefetch_stream(http, proxy, cache, segments, HeaderMap::new(), token);

        let mut collected = Vec::new();
        while let Some(item) = tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("stream should not hang")
        {
            collected.push(item.unwrap());
        }

        let joined: Vec<u8> = collected.into_iter().flat_map(|b| b.to_vec()).collect();
        assert_eq!(joined, b"aaaabbbbcccc");
    }
}
