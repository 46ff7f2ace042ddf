use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use swagger_mcp::config::{ConfigLocator, ConfigStore};
use swagger_mcp::context::{ContextOptions, ServiceContext};
use swagger_mcp::server::{SwaggerMcpServer, serve_stdio};
use swagger_mcp_openapi_tools::resolver::CircularRefs;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// MCP server for exploring and testing APIs described by Swagger / OpenAPI documents.
///
/// Speaks JSON-RPC on stdin/stdout; logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "swagger-mcp", version, about)]
struct Cli {
    /// Path to swagger-targets.json or a directory containing it. Falls back to
    /// $SWAGGER_MCP_CONFIG, the working directory and ~/.swagger-mcp
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Same as --config, given positionally
    #[arg(value_name = "PATH", conflicts_with = "config")]
    path: Option<PathBuf>,

    /// Timeout for swagger_test requests, in milliseconds
    #[arg(long, default_value_t = 30_000)]
    request_timeout_ms: u64,

    /// Cap on response bodies read by swagger_test, in bytes (unlimited when unset)
    #[arg(long)]
    max_response_bytes: Option<usize>,

    /// What to do with circular `$ref` chains: preserve or reject
    #[arg(long, default_value = "preserve")]
    circular_refs: CircularRefs,

    /// Default log filter; RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing(&cli.log_level, cli.log_format)?;

    info!(version = env!("CARGO_PKG_VERSION"), "starting swagger-mcp");

    let config = ConfigStore::new(ConfigLocator::from_process(cli.config.clone().or_else(|| cli.path.clone())));
    let targets = config.current();
    info!(
        config = %targets
            .path()
            .map_or_else(|| "<none>".to_string(), |p| p.display().to_string()),
        services = targets.len(),
        "service targets ready"
    );

    let ctx = ServiceContext::new(
        config,
        ContextOptions {
            request_timeout: Duration::from_millis(cli.request_timeout_ms),
            max_response_bytes: cli.max_response_bytes,
            circular_refs: cli.circular_refs,
        },
    )?;

    serve_stdio(SwaggerMcpServer::new(Arc::new(ctx))).await
}

/// stdout carries the protocol, so every log line goes to stderr.
fn setup_tracing(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}
