//! CLI binary for conversion-gateway.
//!
//! A thin shim over the library crate that maps CLI flags (with environment
//! fallbacks) to `GatewayConfig`, prepares the output directory and serves
//! the router until Ctrl+C or SIGTERM.

use anyhow::{Context, Result};
use clap::Parser;
use conversion_gateway::{
    bind_listener, build_router, shutdown_signal, Gateway, GatewayConfig, LocalDirStore,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"ENDPOINTS:
  GET  /health                   liveness + service name
  POST /convert/image-to-pdf     files[]            → one PDF
  POST /convert/scan-to-pdf      files[]            → one PDF
  POST /convert/image-to-image   file, target_format → png | jpeg | webp
  POST /convert/image-compress   file, quality      → JPEG (5-95, default 75)
  POST /convert/pdf-to-images    file               → one PNG per page
  POST /convert/pdf-merge        files[] (≥2)       → one PDF
  POST /convert/pdf-split        file               → one PDF per page
  POST /cleanup                                     → delete all artifacts
  GET  /outputs/{name}                              → artifact bytes

AUTH:
  When --api-secret / API_SECRET is set, every POST must carry
  `X-Api-Key: <secret>`.

PDFIUM:
  pdf-to-images needs libpdfium. Set PDFIUM_LIB_PATH to the library file or
  the directory containing it; otherwise the system loader path is used.
"#;

/// Serve file-format conversions over HTTP.
#[derive(Parser, Debug)]
#[command(
    name = "conversion-gateway",
    version,
    about = "Serve image and PDF conversions over HTTP",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Address to bind.
    #[arg(long, env = "CONVERTER_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[arg(short, long, env = "PORT", default_value_t = 8000)]
    port: u16,

    /// Directory converted files are written to and served from.
    #[arg(short, long, env = "CONVERTER_OUTPUT_DIR", default_value = "outputs")]
    output_dir: PathBuf,

    /// Shared secret required in X-Api-Key. Empty disables the check.
    #[arg(long, env = "API_SECRET", hide_env_values = true)]
    api_secret: Option<String>,

    /// Maximum request body size in MiB.
    #[arg(long, env = "CONVERTER_MAX_UPLOAD_MB", default_value_t = 64)]
    max_upload_mb: usize,

    /// pdfium shared library, or the directory containing it.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Name reported by /health.
    #[arg(long, env = "CONVERTER_SERVICE_NAME", default_value = "conversion-gateway")]
    service_name: String,

    /// Debug-level logging.
    #[arg(short, long, env = "CONVERTER_VERBOSE")]
    verbose: bool,

    /// Errors only.
    #[arg(short, long, env = "CONVERTER_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Populate the environment before clap reads its env fallbacks.
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Configuration ────────────────────────────────────────────────────
    let mut builder = GatewayConfig::builder()
        .output_dir(&cli.output_dir)
        .service_name(&cli.service_name)
        .max_upload_bytes(cli.max_upload_mb.saturating_mul(1024 * 1024));
    if let Some(secret) = &cli.api_secret {
        builder = builder.api_secret(secret);
    }
    if let Some(lib) = &cli.pdfium_lib {
        builder = builder.pdfium_library(lib);
    }
    let config = builder.build().context("Invalid configuration")?;
    info!("Starting with {:?}", config);

    // ── Storage ──────────────────────────────────────────────────────────
    let store = LocalDirStore::new(&config.output_dir);
    store
        .ensure()
        .await
        .with_context(|| format!("Failed to create output directory {:?}", config.output_dir))?;

    // ── Serve ────────────────────────────────────────────────────────────
    let gateway = Arc::new(Gateway::new(config, Arc::new(store)));
    if gateway.config().api_secret.is_none() {
        info!("API_SECRET not set; POST routes are unauthenticated");
    }
    let app = build_router(gateway);

    let listener = bind_listener(&cli.host, cli.port)
        .await
        .with_context(|| format!("Failed to bind {}:{}", cli.host, cli.port))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shut down cleanly");
    Ok(())
}
