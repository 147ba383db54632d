use anyhow::{Context, Result};
use opentelemetry::{KeyValue, global};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, runtime, trace::TracerProvider};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

static OTLP_EXPORT_ACTIVE: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub service_version: String,
    pub environment: String,
    pub otlp_endpoint: Option<String>,
    pub enable_tracing: bool,
    pub export_timeout: Duration,
    /// Filter used when `RUST_LOG` is unset.
    pub default_filter: String,
}

impl TelemetryConfig {
    pub fn for_app(config: &Config) -> Self {
        let level = if config.is_production() { "info" } else { "debug" };
        Self {
            service_name: env!("CARGO_PKG_NAME").to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: format!("{:?}", config.app.environment).to_lowercase(),
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok(),
            enable_tracing: std::env::var("OTEL_TRACES_ENABLED")
                .map(|v| v.parse().unwrap_or(true))
                .unwrap_or(true),
            export_timeout: Duration::from_secs(30),
            default_filter: format!("{}={level},tower_http=info", env!("CARGO_CRATE_NAME")),
        }
    }
}

pub struct TelemetryHandles {
    tracer_provider: Option<TracerProvider>,
}

impl TelemetryHandles {
    /// Flushes pending spans and tears down the global provider.
    pub async fn shutdown(self) -> Result<()> {
        info!("Shutting down telemetry providers");
        if self.tracer_provider.is_some() {
            global::shutdown_tracer_provider();
            OTLP_EXPORT_ACTIVE.store(false, Ordering::Relaxed);
        }
        Ok(())
    }
}

pub async fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryHandles> {
    setup_tracing_subscriber(&config)?;

    info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = %config.environment,
        "Initializing telemetry"
    );

    let tracer_provider = if config.enable_tracing {
        init_tracing(&config)?
    } else {
        None
    };

    Ok(TelemetryHandles { tracer_provider })
}

fn create_resource(config: &TelemetryConfig) -> Resource {
    Resource::new(vec![
        KeyValue::new("service.name", config.service_name.clone()),
        KeyValue::new("service.version", config.service_version.clone()),
        KeyValue::new("deployment.environment", config.environment.clone()),
    ])
}

fn init_tracing(config: &TelemetryConfig) -> Result<Option<TracerProvider>> {
    let Some(endpoint) = &config.otlp_endpoint else {
        info!("No OTLP endpoint configured, spans stay local");
        return Ok(None);
    };

    let provider = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint)
                .with_timeout(config.export_timeout),
        )
        .with_trace_config(
            opentelemetry_sdk::trace::Config::default()
                .with_resource(create_resource(config))
                .with_sampler(opentelemetry_sdk::trace::Sampler::AlwaysOn),
        )
        .install_batch(runtime::Tokio)
        .context("Failed to initialize OTLP tracer")?;

    global::set_tracer_provider(provider.clone());
    OTLP_EXPORT_ACTIVE.store(true, Ordering::Relaxed);
    info!(endpoint = %endpoint, "Distributed tracing initialized with OTLP exporter");
    Ok(Some(provider))
}

fn setup_tracing_subscriber(config: &TelemetryConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    Registry::default()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .context("Failed to initialize tracing subscriber")?;
    Ok(())
}

/// Whether spans are currently being shipped to an OTLP collector.
pub fn otlp_export_active() -> bool {
    OTLP_EXPORT_ACTIVE.load(Ordering::Relaxed)
}
