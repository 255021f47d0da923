//! Request and response types shared by the gateway and the HTTP layer.

use crate::engine::PipelineOptions;
use crate::error::GatewayError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

// ── Output format ────────────────────────────────────────────────────────

/// Encoding of the conversion result returned to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown text in `content`. (default)
    #[default]
    Markdown,
    /// Structured document in `document`.
    Json,
    /// DocTags tagged-document text in `content`.
    Doctags,
    /// Plain text in `content`.
    Text,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Markdown,
        OutputFormat::Json,
        OutputFormat::Doctags,
        OutputFormat::Text,
    ];

    /// Wire name, also used as the `format` metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "markdown",
            OutputFormat::Json => "json",
            OutputFormat::Doctags => "doctags",
            OutputFormat::Text => "text",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" => Ok(OutputFormat::Markdown),
            "json" => Ok(OutputFormat::Json),
            "doctags" => Ok(OutputFormat::Doctags),
            "text" => Ok(OutputFormat::Text),
            other => Err(GatewayError::InvalidRequest(format!(
                "unknown output_format '{other}' (expected markdown, json, doctags or text)"
            ))),
        }
    }
}

// ── Requests ─────────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}

/// Format and feature toggles shared by both conversion paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOptions {
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default = "default_true")]
    pub ocr_enabled: bool,
    #[serde(default = "default_true")]
    pub table_extraction: bool,
    /// Formula enrichment (`--enrich-formula`). On by default, which makes
    /// docling load its formula model for every request; send `false` to
    /// skip that cost on documents without math.
    #[serde(default = "default_true")]
    pub formula_extraction: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::default(),
            ocr_enabled: true,
            table_extraction: true,
            formula_extraction: true,
        }
    }
}

impl ConversionOptions {
    /// Engine options derived from the toggles.
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            do_ocr: self.ocr_enabled,
            do_table_structure: self.table_extraction,
            do_formula_enrichment: self.formula_extraction,
        }
    }
}

/// JSON body of `POST /convert`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlConversionRequest {
    pub url: Url,
    #[serde(flatten)]
    pub options: ConversionOptions,
}

/// A document received through `POST /convert/upload`.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    /// Client-supplied filename; its extension selects the engine's parser.
    pub filename: String,
    pub bytes: axum::body::Bytes,
}

impl UploadedDocument {
    pub fn new(filename: impl Into<String>, bytes: impl Into<axum::body::Bytes>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Parse a boolean form value the way HTML forms and curl send them.
pub fn parse_form_bool(field: &str, value: &str) -> Result<bool, GatewayError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(GatewayError::InvalidRequest(format!(
            "field '{field}' must be a boolean, got '{other}'"
        ))),
    }
}

// ── Responses ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionStatus {
    Success,
    Error,
}

impl ConversionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionStatus::Success => "success",
            ConversionStatus::Error => "error",
        }
    }
}

/// Where the converted document came from, plus its page count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionMetadata {
    pub page_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

impl ConversionMetadata {
    pub fn for_url(page_count: usize, url: &Url) -> Self {
        Self {
            page_count,
            source: Some(url.to_string()),
            ..Self::default()
        }
    }

    pub fn for_upload(page_count: usize, filename: &str, file_size: u64) -> Self {
        Self {
            page_count,
            filename: Some(filename.to_string()),
            file_size: Some(file_size),
            ..Self::default()
        }
    }
}

/// The exported document, before it is wrapped into a response.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportedPayload {
    /// Markdown, DocTags or plain text.
    Content(String),
    /// Structured document (JSON format).
    Document(serde_json::Value),
}

/// Body of a successful conversion.
///
/// Exactly one of `content` / `document` is non-null: `document` for
/// [`OutputFormat::Json`], `content` for every other format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResponse {
    pub status: ConversionStatus,
    pub format: OutputFormat,
    pub content: Option<String>,
    pub document: Option<serde_json::Value>,
    pub metadata: ConversionMetadata,
    pub duration_seconds: f64,
}

impl ConversionResponse {
    pub fn success(
        format: OutputFormat,
        payload: ExportedPayload,
        metadata: ConversionMetadata,
        duration_seconds: f64,
    ) -> Self {
        let (content, document) = match payload {
            ExportedPayload::Content(text) => (Some(text), None),
            ExportedPayload::Document(doc) => (None, Some(doc)),
        };
        Self {
            status: ConversionStatus::Success,
            format,
            content,
            document,
            metadata,
            duration_seconds,
        }
    }
}

/// Body of `GET /health` when the engine is ready.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub version: String,
    pub converter_ready: bool,
    /// Engine backend and version, e.g. `docling 2.61.1`.
    pub engine: String,
}
