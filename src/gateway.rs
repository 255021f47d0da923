//! The conversion gateway: one request in, one engine call, one response out.
//!
//! Every conversion follows the same linear sequence:
//!
//! ```text
//! validate ──▶ stage upload ──▶ engine.convert ──▶ export ──▶ unstage ──▶ respond
//!  (503/413/422)  (uploads only)   (timed)          (per format)  (always)
//! ```
//!
//! The engine call, the export and the temp-file lifecycle all run inside a
//! single `spawn_blocking` task. Metrics bookkeeping stays on the async side:
//! the in-flight gauge is held by an RAII guard for the whole conversion and
//! the outcome counter is bumped exactly once per conversion, whichever way
//! it ends.

use crate::config::GatewayConfig;
use crate::engine::{ConversionEngine, ConvertedDocument, DocumentSource, DoclingCliEngine};
use crate::error::{EngineError, GatewayError};
use crate::metrics::GatewayMetrics;
use crate::output::{
    ConversionMetadata, ConversionOptions, ConversionResponse, ConversionStatus, ExportedPayload,
    HealthStatus, OutputFormat, UploadedDocument, UrlConversionRequest,
};
use crate::upload::StagedUpload;
use axum::body::Bytes;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use url::Url;

/// Shared gateway state: the engine (if it initialised), metrics and config.
#[derive(Clone)]
pub struct Gateway {
    engine: Option<Arc<dyn ConversionEngine>>,
    metrics: GatewayMetrics,
    config: GatewayConfig,
}

/// What the blocking task converts.
enum Input {
    Url(Url),
    Upload {
        filename: String,
        bytes: Bytes,
        dir: Option<PathBuf>,
    },
}

impl Gateway {
    /// Create a gateway around an already-initialised engine, or `None` when
    /// initialisation failed.
    pub fn new(
        engine: Option<Arc<dyn ConversionEngine>>,
        config: GatewayConfig,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            engine,
            metrics: GatewayMetrics::new()?,
            config,
        })
    }

    /// Initialise the docling engine named in `config` and build a gateway.
    ///
    /// An engine that fails to start is logged and leaves the gateway running
    /// without one; every engine-backed operation then reports
    /// [`GatewayError::ServiceUnavailable`].
    pub fn from_config(config: GatewayConfig) -> Result<Self, GatewayError> {
        info!("Initializing conversion engine '{}'...", config.engine_command);
        let engine: Option<Arc<dyn ConversionEngine>> =
            match DoclingCliEngine::new(&config.engine_command) {
                Ok(engine) => {
                    info!("Conversion engine initialized successfully");
                    Some(Arc::new(engine))
                }
                Err(e) => {
                    error!("Failed to initialize conversion engine: {}", e);
                    None
                }
            };
        Self::new(engine, config)
    }

    pub fn is_ready(&self) -> bool {
        self.engine.is_some()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn metrics(&self) -> &GatewayMetrics {
        &self.metrics
    }

    /// The engine, or [`GatewayError::ServiceUnavailable`].
    pub fn engine(&self) -> Result<&Arc<dyn ConversionEngine>, GatewayError> {
        self.engine.as_ref().ok_or(GatewayError::ServiceUnavailable)
    }

    // ── Operations ───────────────────────────────────────────────────────

    /// Convert a remote document. The engine fetches the URL itself.
    pub async fn convert_from_url(
        &self,
        request: UrlConversionRequest,
    ) -> Result<ConversionResponse, GatewayError> {
        if !matches!(request.url.scheme(), "http" | "https") {
            return Err(GatewayError::InvalidRequest(format!(
                "url must use http or https, got '{}'",
                request.url.scheme()
            )));
        }
        let engine = Arc::clone(self.engine()?);

        info!("Starting conversion for URL: {}", request.url);
        let url = request.url;
        let metadata_url = url.clone();
        self.run(engine, Input::Url(url), request.options, move |pages| {
            ConversionMetadata::for_url(pages, &metadata_url)
        })
        .await
    }

    /// Convert an uploaded document via a temp file that is always removed.
    pub async fn convert_from_upload(
        &self,
        upload: UploadedDocument,
        options: ConversionOptions,
    ) -> Result<ConversionResponse, GatewayError> {
        let engine = Arc::clone(self.engine()?);
        let limit = self.config.max_upload_bytes;
        if upload.size() > limit {
            return Err(GatewayError::PayloadTooLarge { limit });
        }

        info!("Starting conversion for uploaded file: {}", upload.filename);
        let file_size = upload.size();
        let filename = upload.filename.clone();
        let input = Input::Upload {
            filename: upload.filename,
            bytes: upload.bytes,
            dir: self.config.temp_dir.clone(),
        };
        self.run(engine, input, options, move |pages| {
            ConversionMetadata::for_upload(pages, &filename, file_size)
        })
        .await
    }

    /// Readiness payload, or 503 when the engine never initialised.
    pub fn health(&self) -> Result<HealthStatus, GatewayError> {
        let engine = self.engine()?;
        Ok(HealthStatus {
            status: "healthy".to_string(),
            service: self.config.service_name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            converter_ready: true,
            engine: engine.describe(),
        })
    }

    /// All metrics in the Prometheus text exposition format.
    pub fn render_metrics(&self) -> Result<String, GatewayError> {
        Ok(self.metrics.encode()?)
    }

    // ── Internals ────────────────────────────────────────────────────────

    /// Run one conversion on its own task.
    ///
    /// The task owns the in-flight guard and the outcome count. Dropping the
    /// caller (client disconnect) does not cancel it; the conversion still
    /// finishes and is counted once.
    async fn run(
        &self,
        engine: Arc<dyn ConversionEngine>,
        input: Input,
        options: ConversionOptions,
        metadata: impl FnOnce(usize) -> ConversionMetadata + Send + 'static,
    ) -> Result<ConversionResponse, GatewayError> {
        let metrics = self.metrics.clone();
        tokio::spawn(conversion_task(engine, metrics, input, options, metadata))
            .await
            .unwrap_or_else(|e| Err(GatewayError::Internal(format!("conversion task failed: {e}"))))
    }
}

async fn conversion_task(
    engine: Arc<dyn ConversionEngine>,
    metrics: GatewayMetrics,
    input: Input,
    options: ConversionOptions,
    metadata: impl FnOnce(usize) -> ConversionMetadata,
) -> Result<ConversionResponse, GatewayError> {
    let format = options.output_format;
    let start = Instant::now();
    let _in_flight = metrics.track_in_flight();

    let engine_metrics = metrics.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        convert_blocking(engine.as_ref(), &engine_metrics, input, &options)
    })
    .await
    .unwrap_or_else(|e| Err(GatewayError::Internal(format!("conversion task failed: {e}"))));

    match outcome {
        Ok((page_count, payload)) => {
            let duration = start.elapsed().as_secs_f64();
            metrics.record_outcome(format, ConversionStatus::Success);
            info!("Conversion completed successfully in {:.2}s", duration);
            Ok(ConversionResponse::success(
                format,
                payload,
                metadata(page_count),
                duration,
            ))
        }
        Err(e) => {
            metrics.record_outcome(format, ConversionStatus::Error);
            error!("Conversion failed: {}", e);
            Err(e)
        }
    }
}

/// Stage (uploads), convert, export. The staged file is dropped on return.
fn convert_blocking(
    engine: &dyn ConversionEngine,
    metrics: &GatewayMetrics,
    input: Input,
    options: &ConversionOptions,
) -> Result<(usize, ExportedPayload), GatewayError> {
    let (_staged, source) = match input {
        Input::Url(url) => (None, DocumentSource::Url(url)),
        Input::Upload {
            filename,
            bytes,
            dir,
        } => {
            let staged = StagedUpload::stage(&filename, &bytes, dir.as_deref())?;
            let source = DocumentSource::Path(staged.path().to_path_buf());
            (Some(staged), source)
        }
    };

    let document = {
        let _timer = metrics.start_engine_timer();
        engine.convert(&source, &options.pipeline_options())?
    };
    let payload = export(document.as_ref(), options.output_format)?;
    Ok((document.page_count(), payload))
}

/// Call the export operation matching `format`.
pub fn export(
    document: &dyn ConvertedDocument,
    format: OutputFormat,
) -> Result<ExportedPayload, EngineError> {
    Ok(match format {
        OutputFormat::Markdown => ExportedPayload::Content(document.export_to_markdown()?),
        OutputFormat::Json => ExportedPayload::Document(document.export_to_dict()?),
        OutputFormat::Doctags => ExportedPayload::Content(document.export_to_doctags()?),
        OutputFormat::Text => ExportedPayload::Content(document.export_to_text()?),
    })
}
