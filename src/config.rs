//! Configuration for the conversion gateway.
//!
//! Every runtime knob lives in [`GatewayConfig`], built via its
//! [`GatewayConfigBuilder`]. The binary maps CLI flags and `DOCGATE_*`
//! environment variables onto the builder; tests build configs directly.

use crate::error::GatewayError;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Default upload cap: 100 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Configuration for a gateway instance.
///
/// # Example
/// ```rust
/// use edgequake_docgate::GatewayConfig;
///
/// let config = GatewayConfig::builder()
///     .port(9000)
///     .engine_command("/opt/docling/bin/docling")
///     .build()
///     .unwrap();
/// assert_eq!(config.bind_addr().port(), 9000);
/// ```
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Interface to listen on. Default: `0.0.0.0`.
    pub host: IpAddr,

    /// TCP port to listen on. Default: 8000.
    pub port: u16,

    /// Largest accepted upload in bytes. Default: 100 MiB.
    pub max_upload_bytes: u64,

    /// Path or name of the external conversion command. Default: `docling`.
    pub engine_command: String,

    /// Directory for upload temp files. `None` uses the OS temp dir.
    pub temp_dir: Option<PathBuf>,

    /// Service name reported by `/health`. Default: `docling-api`.
    pub service_name: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8000,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            engine_command: "docling".to_string(),
            temp_dir: None,
            service_name: "docling-api".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Create a new builder for `GatewayConfig`.
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder {
            config: Self::default(),
        }
    }

    /// Socket address the server binds to.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Builder for [`GatewayConfig`].
#[derive(Debug)]
pub struct GatewayConfigBuilder {
    config: GatewayConfig,
}

impl GatewayConfigBuilder {
    pub fn host(mut self, host: IpAddr) -> Self {
        self.config.host = host;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn max_upload_bytes(mut self, bytes: u64) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    /// Convenience setter taking mebibytes.
    pub fn max_upload_mb(mut self, mb: u64) -> Self {
        self.config.max_upload_bytes = mb.saturating_mul(1024 * 1024);
        self
    }

    pub fn engine_command(mut self, command: impl Into<String>) -> Self {
        self.config.engine_command = command.into();
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = Some(dir.into());
        self
    }

    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.config.service_name = name.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GatewayConfig, GatewayError> {
        let c = &self.config;
        if c.max_upload_bytes == 0 {
            return Err(GatewayError::InvalidConfig(
                "max upload size must be > 0".into(),
            ));
        }
        if c.engine_command.trim().is_empty() {
            return Err(GatewayError::InvalidConfig(
                "engine command must not be empty".into(),
            ));
        }
        if let Some(dir) = &c.temp_dir {
            if !dir.is_dir() {
                return Err(GatewayError::InvalidConfig(format!(
                    "temp dir '{}' is not a directory",
                    dir.display()
                )));
            }
        }
        Ok(self.config)
    }
}
