//! Error types for the edgequake-docgate library.
//!
//! Two error types mirror the two sides of the gateway:
//!
//! * [`GatewayError`], **per-request**: the request cannot be served
//!   (engine missing, upload too large, conversion failed). Every variant maps
//!   to exactly one HTTP status via [`GatewayError::status_code`].
//!
//! * [`EngineError`], **engine-side**: raised by a
//!   [`crate::engine::ConversionEngine`] at initialisation or while
//!   converting/exporting. The gateway folds conversion-time engine errors into
//!   [`GatewayError::ConversionFailed`] with the message kept verbatim.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::path::PathBuf;
use thiserror::Error;

/// All errors a single gateway request can end with.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The conversion engine failed to initialise at process start.
    #[error("DocumentConverter not initialized")]
    ServiceUnavailable,

    /// Uploaded file exceeds the configured size cap.
    #[error("File size exceeds {}MB limit", .limit / (1024 * 1024))]
    PayloadTooLarge { limit: u64 },

    /// The engine or one of its export operations failed.
    #[error("Conversion failed: {0}")]
    ConversionFailed(String),

    /// The request was well-formed HTTP but its fields were not acceptable.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Gateway-side fault unrelated to the document itself.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl GatewayError {
    /// HTTP status used when this error is returned to a client.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::ConversionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GatewayError::Internal(_) | GatewayError::InvalidConfig(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "status": "error",
            "detail": self.to_string(),
        }));
        (self.status_code(), body).into_response()
    }
}

impl From<EngineError> for GatewayError {
    fn from(e: EngineError) -> Self {
        GatewayError::ConversionFailed(e.to_string())
    }
}

impl From<prometheus::Error> for GatewayError {
    fn from(e: prometheus::Error) -> Self {
        GatewayError::Internal(format!("metrics: {e}"))
    }
}

/// Errors raised by a conversion engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine executable could not be located.
    #[error("Conversion engine '{command}' not found: {reason}\nInstall it or point --engine-command at it.")]
    NotFound { command: String, reason: String },

    /// The executable exists but did not respond as expected at startup.
    #[error("Conversion engine '{command}' is not usable: {reason}")]
    Unavailable { command: String, reason: String },

    /// The engine ran but exited unsuccessfully.
    #[error("{command} failed (exit code {code:?}): {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The engine exited cleanly but an expected output file is missing.
    #[error("expected engine output '{path}' was not produced")]
    MissingOutput { path: PathBuf },

    /// An output file exists but could not be parsed.
    #[error("engine output '{path}' is invalid: {detail}")]
    InvalidOutput { path: PathBuf, detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_too_large_mentions_megabytes() {
        let e = GatewayError::PayloadTooLarge {
            limit: 100 * 1024 * 1024,
        };
        assert_eq!(e.to_string(), "File size exceeds 100MB limit");
        assert_eq!(e.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn engine_error_message_is_kept_verbatim() {
        let engine = EngineError::CommandFailed {
            command: "docling".into(),
            code: Some(2),
            stderr: "unsupported format".into(),
        };
        let e: GatewayError = engine.into();
        let msg = e.to_string();
        assert!(msg.starts_with("Conversion failed: "), "got: {msg}");
        assert!(msg.contains("unsupported format"), "got: {msg}");
        assert_eq!(e.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            GatewayError::ServiceUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            GatewayError::InvalidRequest("x".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            GatewayError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_display() {
        let e = EngineError::NotFound {
            command: "docling".into(),
            reason: "cannot find binary path".into(),
        };
        assert!(e.to_string().contains("docling"));
    }
}
