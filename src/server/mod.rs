//! HTTP surface of the gateway.
//!
//! | Route | Handler |
//! |-------|---------|
//! | `GET /` | plain-text banner |
//! | `GET /health` | readiness, 503 without an engine |
//! | `GET /metrics` | Prometheus exposition |
//! | `POST /convert` | convert a document by URL |
//! | `POST /convert/upload` | convert an uploaded document |

mod handlers;
mod routes;

pub use routes::create_router;

use crate::gateway::Gateway;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
}

impl AppState {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
        }
    }
}

/// Bind the configured address and serve until Ctrl-C or SIGTERM.
pub async fn serve(gateway: Gateway) -> std::io::Result<()> {
    let addr = gateway.config().bind_addr();
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Starting server at http://{}", listener.local_addr()?);
    serve_with_shutdown(listener, gateway, shutdown_signal()).await
}

/// Serve on an already-bound listener until `shutdown` resolves.
pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    gateway: Gateway,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(AppState::new(gateway));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received, draining connections");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::engine::{ConversionEngine, ConvertedDocument, DocumentSource, PipelineOptions};
    use crate::error::EngineError;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct TitleDocument;

    impl ConvertedDocument for TitleDocument {
        fn page_count(&self) -> usize {
            1
        }
        fn export_to_markdown(&self) -> Result<String, EngineError> {
            Ok("# Title".into())
        }
        fn export_to_dict(&self) -> Result<Value, EngineError> {
            Ok(json!({ "pages": { "1": {} } }))
        }
        fn export_to_doctags(&self) -> Result<String, EngineError> {
            Ok("<doctag><title>Title</title></doctag>".into())
        }
        fn export_to_text(&self) -> Result<String, EngineError> {
            Ok("Title".into())
        }
    }

    struct TitleEngine;

    impl ConversionEngine for TitleEngine {
        fn describe(&self) -> String {
            "title 1.0".into()
        }
        fn convert(
            &self,
            _source: &DocumentSource,
            _options: &PipelineOptions,
        ) -> Result<Box<dyn ConvertedDocument>, EngineError> {
            Ok(Box::new(TitleDocument))
        }
    }

    fn app_with(engine: Option<Arc<dyn ConversionEngine>>, config: GatewayConfig) -> axum::Router {
        create_router(AppState::new(Gateway::new(engine, config).unwrap()))
    }

    fn ready_app() -> axum::Router {
        app_with(Some(Arc::new(TitleEngine)), GatewayConfig::default())
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn multipart_request(boundary: &str, parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
        let mut body = Vec::new();
        for (name, filename, data) in parts {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            match filename {
                Some(f) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(data);
            body.extend_from_slice(&b"\r\n"[..]);
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/convert/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_banner() {
        let response = ready_app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("POST /convert/upload"));
    }

    #[tokio::test]
    async fn test_health_ready() {
        let response = ready_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["converter_ready"], true);
        assert_eq!(json["engine"], "title 1.0");
    }

    #[tokio::test]
    async fn test_health_without_engine() {
        let app = app_with(None, GatewayConfig::default());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["status"], "error");
        assert_eq!(json["detail"], "DocumentConverter not initialized");
    }

    #[tokio::test]
    async fn test_convert_url_markdown() {
        let response = ready_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/convert")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({ "url": "https://example.com/a.pdf", "output_format": "markdown" })
                            .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "success");
        assert_eq!(json["format"], "markdown");
        assert_eq!(json["content"], "# Title");
        assert!(json["document"].is_null());
        assert_eq!(json["metadata"]["source"], "https://example.com/a.pdf");
        assert!(json["duration_seconds"].as_f64().unwrap() >= 0.0);
    }

    #[tokio::test]
    async fn test_convert_url_rejects_non_http_scheme() {
        let response = ready_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/convert")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({ "url": "ftp://example.com/a.pdf" }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_upload_with_form_fields() {
        let request = multipart_request(
            "X-BOUNDARY",
            &[
                ("file", Some("notes.pdf"), &b"%PDF-1.7"[..]),
                ("output_format", None, &b"json"[..]),
                ("ocr_enabled", None, &b"false"[..]),
                ("comment", None, &b"ignored"[..]),
            ],
        );
        let response = ready_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["format"], "json");
        assert!(json["content"].is_null());
        assert_eq!(json["metadata"]["filename"], "notes.pdf");
        assert_eq!(json["metadata"]["file_size"], 8);
    }

    #[tokio::test]
    async fn test_upload_missing_file() {
        let request = multipart_request("X-BOUNDARY", &[("output_format", None, &b"text"[..])]);
        let response = ready_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(response).await;
        assert!(json["detail"].as_str().unwrap().contains("file"));
    }

    #[tokio::test]
    async fn test_upload_bad_toggle() {
        let request = multipart_request(
            "X-BOUNDARY",
            &[
                ("file", Some("a.pdf"), &b"%PDF"[..]),
                ("table_extraction", None, &b"sometimes"[..]),
            ],
        );
        let response = ready_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_upload_over_limit() {
        let config = GatewayConfig::builder().max_upload_bytes(4).build().unwrap();
        let app = app_with(Some(Arc::new(TitleEngine)), config);
        let request = multipart_request("X-BOUNDARY", &[("file", Some("a.pdf"), &b"%PDF-1.7"[..])]);

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_upload_without_engine_is_503_first() {
        let config = GatewayConfig::builder().max_upload_bytes(4).build().unwrap();
        let app = app_with(None, config);
        let request = multipart_request("X-BOUNDARY", &[("file", Some("a.pdf"), &b"%PDF-1.7"[..])]);

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_metrics_content_type() {
        let response = ready_app()
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let ct = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(ct.starts_with("text/plain"));
    }
}
