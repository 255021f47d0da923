//! HTTP handlers. Each one unpacks the request and delegates to [`Gateway`].
//!
//! [`Gateway`]: crate::gateway::Gateway

use axum::body::Bytes;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

use super::AppState;
use crate::error::GatewayError;
use crate::output::{
    parse_form_bool, ConversionOptions, ConversionResponse, HealthStatus, UploadedDocument,
    UrlConversionRequest,
};

/// `GET /`
pub async fn banner(State(state): State<AppState>) -> String {
    let config = state.gateway.config();
    format!(
        "{} {}\n\n\
         GET  /health          readiness check\n\
         GET  /metrics         Prometheus metrics\n\
         POST /convert         convert a document by URL (JSON body)\n\
         POST /convert/upload  convert an uploaded document (multipart, max {}MB)\n\n\
         Formats: markdown, json, doctags, text\n",
        config.service_name,
        env!("CARGO_PKG_VERSION"),
        config.max_upload_bytes / (1024 * 1024),
    )
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthStatus>, GatewayError> {
    Ok(Json(state.gateway.health()?))
}

/// `GET /metrics`
pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, GatewayError> {
    let body = state.gateway.render_metrics()?;
    let content_type = state.gateway.metrics().content_type();
    Ok(([(header::CONTENT_TYPE, content_type)], body))
}

/// `POST /convert`
pub async fn convert_url(
    State(state): State<AppState>,
    Json(request): Json<UrlConversionRequest>,
) -> Result<Json<ConversionResponse>, GatewayError> {
    Ok(Json(state.gateway.convert_from_url(request).await?))
}

/// `POST /convert/upload`
///
/// Form fields: `file` (required), `output_format`, `ocr_enabled`,
/// `table_extraction`, `formula_extraction`. Unknown fields are ignored.
/// The file is read chunk by chunk and rejected with 413 as soon as it
/// passes the configured cap.
pub async fn convert_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ConversionResponse>, GatewayError> {
    // No engine: answer 503 before reading the body.
    state.gateway.engine()?;
    let limit = state.gateway.config().max_upload_bytes;
    let rejected = multipart_error(limit);

    let mut upload: Option<UploadedDocument> = None;
    let mut options = ConversionOptions::default();

    while let Some(field) = multipart.next_field().await.map_err(&rejected)? {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(|f| f.to_string())
                    .filter(|f| !f.is_empty())
                    .ok_or_else(|| {
                        GatewayError::InvalidRequest("field 'file' has no filename".to_string())
                    })?;
                let bytes = read_capped(field, limit).await?;
                upload = Some(UploadedDocument::new(filename, bytes));
            }
            Some("output_format") => {
                let text = field.text().await.map_err(&rejected)?;
                options.output_format = text.parse()?;
            }
            Some(toggle @ ("ocr_enabled" | "table_extraction" | "formula_extraction")) => {
                let text = field.text().await.map_err(&rejected)?;
                let value = parse_form_bool(toggle, &text)?;
                match toggle {
                    "ocr_enabled" => options.ocr_enabled = value,
                    "table_extraction" => options.table_extraction = value,
                    _ => options.formula_extraction = value,
                }
            }
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| {
        GatewayError::InvalidRequest("missing 'file' in multipart form".to_string())
    })?;

    Ok(Json(state.gateway.convert_from_upload(upload, options).await?))
}

async fn read_capped(mut field: Field<'_>, limit: u64) -> Result<Bytes, GatewayError> {
    let mut buf: Vec<u8> = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error(limit))? {
        if (buf.len() + chunk.len()) as u64 > limit {
            return Err(GatewayError::PayloadTooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(Bytes::from(buf))
}

/// Body-limit rejections surface as multipart errors; keep them a 413.
fn multipart_error(limit: u64) -> impl Fn(MultipartError) -> GatewayError {
    move |e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            GatewayError::PayloadTooLarge { limit }
        } else {
            GatewayError::InvalidRequest(format!("malformed multipart body: {}", e.body_text()))
        }
    }
}
