//! Staging of uploaded documents on disk.
//!
//! The engine reads files by path and picks its parser from the extension,
//! so every upload is written to a uniquely named temp file that keeps the
//! client's extension (`report.docx` → `/tmp/.tmpA1b2C3.docx`).
//!
//! [`StagedUpload`] owns the file. Dropping it deletes the file, on the
//! success path and on every error path alike. Deletion failures are logged
//! and swallowed.

use crate::error::GatewayError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// An uploaded document written to a temp file.
#[derive(Debug)]
pub struct StagedUpload {
    file: Option<NamedTempFile>,
    path: PathBuf,
}

impl StagedUpload {
    /// Write `bytes` to a fresh temp file named with `filename`'s extension.
    ///
    /// `dir` selects the parent directory; `None` uses the OS temp dir.
    pub fn stage(filename: &str, bytes: &[u8], dir: Option<&Path>) -> Result<Self, GatewayError> {
        let suffix = extension_suffix(filename);
        let mut builder = tempfile::Builder::new();
        builder.suffix(&suffix);

        let mut file = match dir {
            Some(d) => builder.tempfile_in(d),
            None => builder.tempfile(),
        }
        .map_err(|e| GatewayError::Internal(format!("tempfile: {e}")))?;

        file.write_all(bytes)
            .and_then(|_| file.flush())
            .map_err(|e| GatewayError::Internal(format!("tempfile write: {e}")))?;

        let path = file.path().to_path_buf();
        debug!("Staged upload '{}' at {}", filename, path.display());

        Ok(Self {
            file: Some(file),
            path,
        })
    }

    /// Path of the staged file while it exists.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(e) = file.close() {
                warn!(
                    "Failed to remove temp upload {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}

/// `".pdf"` for `"report.pdf"`, empty when the name has no usable extension.
pub fn extension_suffix(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}
