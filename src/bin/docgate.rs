//! CLI binary for edgequake-docgate.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `GatewayConfig`, initialises logging and runs the HTTP server.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_docgate::{serve, Gateway, GatewayConfig};
use std::io;
use std::net::IpAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"ENDPOINTS:
  GET  /                banner
  GET  /health          readiness (503 until the engine is initialised)
  GET  /metrics         Prometheus metrics
  POST /convert         {"url": "...", "output_format": "markdown"}
  POST /convert/upload  multipart: file, output_format, ocr_enabled,
                        table_extraction, formula_extraction

EXAMPLES:
  # Serve on the default port with docling from PATH
  docgate

  # Custom port, 20 MB uploads, explicit docling binary
  docgate --port 9000 --max-upload-mb 20 --engine-command /opt/docling/bin/docling

  # Convert a document by URL
  curl -s localhost:8000/convert -H 'content-type: application/json' \
       -d '{"url": "https://arxiv.org/pdf/2408.09869", "output_format": "markdown"}'

  # Convert an upload to DocTags
  curl -s localhost:8000/convert/upload -F file=@report.docx -F output_format=doctags

ENVIRONMENT VARIABLES:
  DOCGATE_HOST, DOCGATE_PORT, DOCGATE_MAX_UPLOAD_MB, DOCGATE_ENGINE_COMMAND,
  DOCGATE_TEMP_DIR, DOCGATE_SERVICE_NAME, DOCGATE_VERBOSE, DOCGATE_QUIET,
  DOCGATE_JSON_LOGS mirror the flags above.
  RUST_LOG overrides the log filter entirely.
"#;

/// Serve document conversions over HTTP.
#[derive(Parser, Debug)]
#[command(
    name = "docgate",
    version,
    about = "HTTP gateway converting documents to Markdown, JSON, DocTags or text",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Interface to bind.
    #[arg(long, env = "DOCGATE_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// TCP port to listen on.
    #[arg(short, long, env = "DOCGATE_PORT", default_value_t = 8000)]
    port: u16,

    /// Maximum upload size in megabytes.
    #[arg(long, env = "DOCGATE_MAX_UPLOAD_MB", default_value_t = 100,
          value_parser = clap::value_parser!(u64).range(1..))]
    max_upload_mb: u64,

    /// Path or name of the docling executable.
    #[arg(long, env = "DOCGATE_ENGINE_COMMAND", default_value = "docling")]
    engine_command: String,

    /// Directory for staged uploads (default: OS temp dir).
    #[arg(long, env = "DOCGATE_TEMP_DIR")]
    temp_dir: Option<PathBuf>,

    /// Service name reported by /health.
    #[arg(long, env = "DOCGATE_SERVICE_NAME", default_value = "docling-api")]
    service_name: String,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCGATE_VERBOSE")]
    verbose: bool,

    /// Suppress all logs except errors.
    #[arg(short, long, env = "DOCGATE_QUIET", conflicts_with = "verbose")]
    quiet: bool,

    /// Emit logs as JSON lines.
    #[arg(long, env = "DOCGATE_JSON_LOGS")]
    json_logs: bool,
}

impl Cli {
    fn to_config(&self) -> Result<GatewayConfig> {
        let mut builder = GatewayConfig::builder()
            .host(self.host)
            .port(self.port)
            .max_upload_mb(self.max_upload_mb)
            .engine_command(self.engine_command.clone())
            .service_name(self.service_name.clone());
        if let Some(dir) = &self.temp_dir {
            builder = builder.temp_dir(dir.clone());
        }
        builder.build().context("Invalid configuration")
    }
}

fn init_logging(cli: &Cli) {
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = cli.to_config()?;

    // Engine probing runs `docling --version`, which blocks.
    let gateway = tokio::task::spawn_blocking(move || Gateway::from_config(config))
        .await
        .context("Engine initialisation task failed")?
        .context("Failed to create gateway")?;

    if !gateway.is_ready() {
        tracing::warn!("Serving without a conversion engine; conversions will return 503");
    }

    serve(gateway).await.context("Server error")?;
    Ok(())
}
