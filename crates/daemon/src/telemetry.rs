//! OpenTelemetry export (optional `telemetry` feature)
//!
//! The OTLP layer is built before the global subscriber exists and is
//! stacked into it by `init_logging`; [`TelemetryStatus::log`] reports the
//! outcome once logging is up.
//!
//! # Environment Variables
//!
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (e.g., http://localhost:4317)
//! - `OTEL_SERVICE_NAME`: Service name (default: arcade-queue-watcher)

use tracing_subscriber::{Layer, Registry};

const DEFAULT_SERVICE_NAME: &str = "arcade-queue-watcher";

pub type OtelLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryStatus {
    NotConfigured,
    FeatureDisabled { endpoint: String },
    Exporting { endpoint: String, service_name: String },
    Failed { endpoint: String, error: String },
}

impl TelemetryStatus {
    pub fn log(&self) {
        match self {
            Self::NotConfigured => {
                tracing::debug!("OpenTelemetry not configured (OTEL_EXPORTER_OTLP_ENDPOINT not set)")
            }
            Self::FeatureDisabled { endpoint } => tracing::warn!(
                endpoint = %endpoint,
                "OpenTelemetry endpoint set but feature 'telemetry' not enabled"
            ),
            Self::Exporting { endpoint, service_name } => tracing::info!(
                service_name = %service_name,
                endpoint = %endpoint,
                "OpenTelemetry export enabled"
            ),
            Self::Failed { endpoint, error } => tracing::warn!(
                endpoint = %endpoint,
                error = %error,
                "Failed to initialize OpenTelemetry (continuing without it)"
            ),
        }
    }
}

pub struct Telemetry {
    pub layer: Option<OtelLayer>,
    pub status: TelemetryStatus,
}

impl Telemetry {
    pub fn from_env() -> Self {
        let service_name =
            std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string());
        Self::for_endpoint(std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok(), service_name)
    }

    pub fn for_endpoint(endpoint: Option<String>, service_name: String) -> Self {
        let Some(endpoint) = endpoint else {
            return Self {
                layer: None,
                status: TelemetryStatus::NotConfigured,
            };
        };
        build(endpoint, service_name)
    }
}

#[cfg(not(feature = "telemetry"))]
fn build(endpoint: String, _service_name: String) -> Telemetry {
    Telemetry {
        layer: None,
        status: TelemetryStatus::FeatureDisabled { endpoint },
    }
}

#[cfg(feature = "telemetry")]
fn build(endpoint: String, service_name: String) -> Telemetry {
    match otlp_layer(&endpoint, &service_name) {
        Ok(layer) => Telemetry {
            layer: Some(layer),
            status: TelemetryStatus::Exporting { endpoint, service_name },
        },
        Err(e) => Telemetry {
            layer: None,
            status: TelemetryStatus::Failed {
                endpoint,
                error: e.to_string(),
            },
        },
    }
}

#[cfg(feature = "telemetry")]
fn otlp_layer(endpoint: &str, service_name: &str) -> anyhow::Result<OtelLayer> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{runtime, trace::TracerProvider, Resource};

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    // Batch export needs a running Tokio runtime
    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(Resource::new(vec![KeyValue::new(
            "service.name",
            service_name.to_string(),
        )]))
        .build();
    let tracer = provider.tracer(service_name.to_string());
    opentelemetry::global::set_tracer_provider(provider);

    Ok(tracing_opentelemetry::layer().with_tracer(tracer).boxed())
}
