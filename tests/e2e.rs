//! End-to-end tests against a real `docling` installation.
//!
//! Gated behind the `DOCGATE_E2E_ENABLED` environment variable so they do
//! not run in CI unless explicitly requested. `DOCGATE_ENGINE_COMMAND`
//! overrides the docling executable (default: `docling` on PATH).
//!
//! Run with:
//!   DOCGATE_E2E_ENABLED=1 cargo test --test e2e -- --nocapture

use edgequake_docgate::{
    ConversionEngine, ConversionOptions, ConvertedDocument, DoclingCliEngine, DocumentSource,
    Gateway, GatewayConfig, OutputFormat, PipelineOptions, UploadedDocument,
};
use std::sync::Arc;

const SAMPLE_HTML: &str = "<!DOCTYPE html>\n<html><head><title>Quarterly report</title></head>\
<body><h1>Quarterly report</h1><p>Revenue grew in every region.</p>\
<table><tr><th>Region</th><th>Growth</th></tr><tr><td>EMEA</td><td>12%</td></tr></table>\
</body></html>\n";

fn engine_command() -> String {
    std::env::var("DOCGATE_ENGINE_COMMAND").unwrap_or_else(|_| "docling".to_string())
}

/// Skip this test unless DOCGATE_E2E_ENABLED is set and docling starts.
macro_rules! e2e_engine_or_skip {
    () => {{
        if std::env::var("DOCGATE_E2E_ENABLED").is_err() {
            println!("SKIP — set DOCGATE_E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
        match DoclingCliEngine::new(&engine_command()) {
            Ok(engine) => engine,
            Err(e) => {
                println!("SKIP — docling not usable: {e}");
                return;
            }
        }
    }};
}

#[test]
fn test_engine_reports_version() {
    let engine = e2e_engine_or_skip!();
    println!("{}", engine.describe());
    assert!(engine.describe().starts_with("docling "));
    assert!(engine.command().exists());
}

#[test]
fn test_convert_html_file_all_exports() {
    let engine = e2e_engine_or_skip!();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.html");
    std::fs::write(&path, SAMPLE_HTML).unwrap();

    let options = PipelineOptions {
        do_ocr: false,
        do_table_structure: true,
        do_formula_enrichment: false,
    };
    let doc = engine
        .convert(&DocumentSource::Path(path), &options)
        .expect("conversion should succeed");

    let md = doc.export_to_markdown().unwrap();
    assert!(md.contains("Quarterly report"), "markdown: {md}");
    assert!(md.contains("EMEA"), "markdown: {md}");

    let dict = doc.export_to_dict().unwrap();
    assert!(dict.is_object());

    let text = doc.export_to_text().unwrap();
    assert!(text.contains("Revenue"), "text: {text}");

    let doctags = doc.export_to_doctags().unwrap();
    assert!(!doctags.trim().is_empty());
}

#[test]
fn test_missing_file_is_command_failure() {
    let engine = e2e_engine_or_skip!();
    let dir = tempfile::tempdir().unwrap();

    let result = engine.convert(
        &DocumentSource::Path(dir.path().join("does-not-exist.pdf")),
        &PipelineOptions::default(),
    );
    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_gateway_upload_with_docling() {
    let engine = e2e_engine_or_skip!();
    let tmp = tempfile::tempdir().unwrap();
    let config = GatewayConfig::builder().temp_dir(tmp.path()).build().unwrap();
    let engine: Arc<dyn ConversionEngine> = Arc::new(engine);
    let gateway = Gateway::new(Some(engine), config).unwrap();

    let resp = gateway
        .convert_from_upload(
            UploadedDocument::new("report.html", SAMPLE_HTML.as_bytes().to_vec()),
            ConversionOptions {
                output_format: OutputFormat::Markdown,
                ocr_enabled: false,
                ..ConversionOptions::default()
            },
        )
        .await
        .expect("upload conversion should succeed");

    println!("converted in {:.2}s", resp.duration_seconds);
    assert!(resp.content.unwrap().contains("Quarterly report"));
    assert_eq!(resp.metadata.filename.as_deref(), Some("report.html"));
    assert!(std::fs::read_dir(tmp.path()).unwrap().next().is_none());
}
