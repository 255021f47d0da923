//! # edgequake-docgate
//!
//! HTTP gateway that converts documents (PDF, DOCX, PPTX, images, …) into
//! Markdown, structured JSON, DocTags or plain text through an external
//! conversion engine.
//!
//! ## Request Flow
//!
//! ```text
//! client
//!  │
//!  ├─ 1. Route     axum handler parses JSON body or multipart form
//!  ├─ 2. Guard     503 without an engine, 413 above the upload cap
//!  ├─ 3. Stage     uploads land in a temp file that keeps the extension
//!  ├─ 4. Convert   engine call on a blocking thread (timed)
//!  ├─ 5. Export    markdown / json / doctags / text
//!  └─ 6. Respond   content or document + metadata + duration
//! ```
//!
//! The shipped engine, [`DoclingCliEngine`], drives the `docling` command
//! line tool. Anything implementing [`ConversionEngine`] can be plugged in.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_docgate::{serve, Gateway, GatewayConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GatewayConfig::builder().port(8000).build()?;
//!     // Logs and continues without an engine if docling is missing.
//!     let gateway = Gateway::from_config(config)?;
//!     serve(gateway).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docgate` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when embedding the gateway in another service:
//! ```toml
//! edgequake-docgate = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod output;
pub mod server;
pub mod upload;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{GatewayConfig, GatewayConfigBuilder};
pub use engine::{
    ConversionEngine, ConvertedDocument, DoclingCliEngine, DocumentSource, PipelineOptions,
};
pub use error::{EngineError, GatewayError};
pub use gateway::Gateway;
pub use metrics::GatewayMetrics;
pub use output::{
    ConversionMetadata, ConversionOptions, ConversionResponse, ConversionStatus, HealthStatus,
    OutputFormat, UploadedDocument, UrlConversionRequest,
};
pub use server::{create_router, serve, serve_with_shutdown, AppState};
