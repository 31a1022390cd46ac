//! Structured logging bootstrap: `EnvFilter` + stdout `fmt` layer, plus an
//! optional non-blocking daily-rotating file appender. No database-backed
//! filter reload and no websocket log-streaming UI — this gateway has
//! neither a database nor a log-viewer front end to serve one to.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

pub const DEFAULT_LOG_FILTER: &str = "hls_gateway_server=info,hls_gateway_core=info,tower_http=info";

/// Initializes the global tracing subscriber. Returns a `WorkerGuard` that
/// must be kept alive for the process lifetime when `log_dir` is set,
/// otherwise buffered file log lines can be lost on shutdown.
pub fn init_tracing(log_dir: Option<&str>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "hls-gateway.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_ansi(true))
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .init();

            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_ansi(true))
                .init();
            None
        }
    }
}
