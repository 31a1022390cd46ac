//! Command-line bootstrap flags, merged over environment-derived defaults.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "HLS proxy gateway", long_about = None)]
pub struct CliArgs {
    /// Address to bind the HTTP server to.
    #[arg(long, env = "API_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Port to bind the HTTP server to.
    #[arg(long, env = "API_PORT", default_value_t = 8088)]
    pub port: u16,

    /// Directory to write rotating log files to. When unset, logs go to
    /// stdout only.
    #[arg(long, env = "LOG_DIR")]
    pub log_dir: Option<String>,

    /// Base URL of the external stream-extraction service this gateway
    /// delegates to.
    #[arg(long, env = "EXTRACTOR_BASE_URL", default_value = "http://127.0.0.1:8090")]
    pub extractor_base_url: String,

    /// Maximum number of segment fetches the prefetcher may run
    /// concurrently for a single request.
    #[arg(long, env = "PREFETCH_SEGMENTS")]
    pub prefetch_segments: Option<usize>,

    /// Whether to inject `#EXT-X-START:TIME-OFFSET=0,PRECISE=YES` into
    /// rewritten manifests that don't already declare a start offset.
    #[arg(long, env = "FORCE_START_OFFSET")]
    pub force_start_offset: Option<bool>,
}
