//! The external conversion engine, seen from the gateway.
//!
//! The gateway never looks inside a converted document. It needs exactly
//! three things from an engine:
//!
//! 1. an initialiser that may fail at startup (the concrete type's
//!    constructor, e.g. [`docling::DoclingCliEngine::new`]),
//! 2. [`ConversionEngine::convert`] taking a URL or a local path plus
//!    [`PipelineOptions`],
//! 3. four exports and a page count on the result ([`ConvertedDocument`]).
//!
//! Both traits are synchronous: the gateway calls `convert` from
//! `tokio::task::spawn_blocking`. A single engine instance is shared by every
//! in-flight request, so implementations must be `Send + Sync`.

pub mod docling;

use crate::error::EngineError;
use std::fmt;
use std::path::PathBuf;
use url::Url;

pub use docling::DoclingCliEngine;

/// What to convert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// Remote document; the engine fetches it itself.
    Url(Url),
    /// Local file. The extension tells the engine which parser to use.
    Path(PathBuf),
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSource::Url(url) => write!(f, "{url}"),
            DocumentSource::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Engine feature toggles for a single conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub do_ocr: bool,
    pub do_table_structure: bool,
    pub do_formula_enrichment: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            do_ocr: true,
            do_table_structure: true,
            do_formula_enrichment: true,
        }
    }
}

/// A document converted by the engine.
pub trait ConvertedDocument: Send {
    /// Number of pages the engine saw.
    fn page_count(&self) -> usize;

    fn export_to_markdown(&self) -> Result<String, EngineError>;

    fn export_to_dict(&self) -> Result<serde_json::Value, EngineError>;

    fn export_to_doctags(&self) -> Result<String, EngineError>;

    fn export_to_text(&self) -> Result<String, EngineError>;
}

/// A document conversion engine shared by all requests.
pub trait ConversionEngine: Send + Sync {
    /// Short name plus version, reported by `/health`.
    fn describe(&self) -> String;

    /// Convert `source` synchronously.
    fn convert(
        &self,
        source: &DocumentSource,
        options: &PipelineOptions,
    ) -> Result<Box<dyn ConvertedDocument>, EngineError>;
}
