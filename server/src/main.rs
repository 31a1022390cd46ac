mod cli;
mod error;
mod extraction_client;
mod logging;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Request;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Span;

use cli::CliArgs;
use extraction_client::HttpDelegatingExtractor;
use hls_gateway_core::GatewaySettings;
use state::AppState;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn apply_cli_overrides(mut settings: GatewaySettings, args: &CliArgs) -> GatewaySettings {
    settings.extraction.extractor_base_url = args.extractor_base_url.clone();
    if let Some(n) = args.prefetch_segments {
        settings.proxy.prefetch_segments = n;
    }
    if let Some(force) = args.force_start_offset {
        settings.proxy.force_start_offset = force;
    }
    settings
}

fn build_router(state: AppState) -> axum::Router {
    let router = routes::create_router(state).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    );

    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &Request| {
                if req.uri().path().starts_with("/health") {
                    Span::none()
                } else {
                    use tower_http::trace::MakeSpan;
                    let mut make_span = tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO);
                    make_span.make_span(req)
                }
            })
            .on_response(|res: &axum::http::Response<_>, latency: Duration, span: &Span| {
                if span.is_disabled() {
                    return;
                }
                use tower_http::trace::OnResponse;
                tower_http::trace::DefaultOnResponse::new()
                    .level(tracing::Level::INFO)
                    .on_response(res, latency, span);
            }),
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();

    let _log_guard = logging::init_tracing(args.log_dir.as_deref());

    let settings = apply_cli_overrides(GatewaySettings::from_env(), &args);
    let extractor: Arc<dyn hls_gateway_core::extraction::StreamExtractor> = Arc::new(
        HttpDelegatingExtractor::new(settings.extraction.extractor_base_url.clone(), settings.extraction.max_streams),
    );
    let state = AppState::new(settings, extractor);

    let router = build_router(state);

    let addr: SocketAddr = format!("{}:{}", args.bind_address, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("hls-gateway listening on http://{addr}");

    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");

        #[cfg(unix)]
        tokio::select! {
            _ = ctrl_c => {},
            _ = sigterm.recv() => {},
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }

        shutdown_token.cancel();
    });

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            cancel_token.cancelled().await;
            tracing::info!("hls-gateway shutting down");
        })
        .await?;

    Ok(())
}
