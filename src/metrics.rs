//! Prometheus metrics for the gateway.
//!
//! Three series, registered on a private [`Registry`] so several gateways
//! (e.g. in tests) never share counts:
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `docling_conversions_total` | counter | `format`, `status` |
//! | `docling_active_conversions` | gauge | |
//! | `docling_conversion_duration_seconds` | histogram | |

use crate::output::{ConversionStatus, OutputFormat};
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramTimer, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Metric handles plus the registry that exposes them.
#[derive(Clone)]
pub struct GatewayMetrics {
    registry: Registry,
    conversions: IntCounterVec,
    active: IntGauge,
    duration: Histogram,
}

impl GatewayMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let conversions = IntCounterVec::new(
            Opts::new(
                "docling_conversions_total",
                "Total number of document conversions",
            ),
            &["format", "status"],
        )?;
        let active = IntGauge::new(
            "docling_active_conversions",
            "Number of currently active conversions",
        )?;
        let duration = Histogram::with_opts(HistogramOpts::new(
            "docling_conversion_duration_seconds",
            "Duration of document conversions",
        ))?;

        registry.register(Box::new(conversions.clone()))?;
        registry.register(Box::new(active.clone()))?;
        registry.register(Box::new(duration.clone()))?;

        Ok(Self {
            registry,
            conversions,
            active,
            duration,
        })
    }

    /// Count one finished conversion.
    pub fn record_outcome(&self, format: OutputFormat, status: ConversionStatus) {
        self.conversions
            .with_label_values(&[format.as_str(), status.as_str()])
            .inc();
    }

    /// Mark a conversion as in flight until the guard is dropped.
    pub fn track_in_flight(&self) -> InFlightGuard {
        self.active.inc();
        InFlightGuard {
            gauge: self.active.clone(),
        }
    }

    /// Start timing an engine invocation; observed when the timer drops.
    pub fn start_engine_timer(&self) -> HistogramTimer {
        self.duration.start_timer()
    }

    pub fn conversions(&self, format: OutputFormat, status: ConversionStatus) -> u64 {
        self.conversions
            .with_label_values(&[format.as_str(), status.as_str()])
            .get()
    }

    /// Sum of the outcome counter over every label pair.
    pub fn conversions_total(&self) -> u64 {
        OutputFormat::ALL
            .iter()
            .flat_map(|f| {
                [ConversionStatus::Success, ConversionStatus::Error]
                    .into_iter()
                    .map(move |s| (*f, s))
            })
            .map(|(f, s)| self.conversions(f, s))
            .sum()
    }

    pub fn in_flight(&self) -> i64 {
        self.active.get()
    }

    pub fn engine_observations(&self) -> u64 {
        self.duration.get_sample_count()
    }

    /// Render all metrics in the text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// Content type of [`Self::encode`]'s output.
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}

/// Decrements the in-flight gauge on drop.
pub struct InFlightGuard {
    gauge: IntGauge,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}
