use crate::config::Environment;
use opentelemetry::global;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing subscriber with pretty formatting for development
/// and JSON formatting for production.
///
/// Uses RUST_LOG for filtering and falls back to `default_level` when it is
/// not set.
///
/// The OpenTelemetry layer exports spans through the global tracer provider,
/// so call this after `TelemetryGuard::init` when telemetry is enabled.
pub fn setup_logging(service_name: &'static str, default_level: &str, environment: Environment) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let otel_layer = tracing_opentelemetry::layer().with_tracer(global::tracer(service_name));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(otel_layer);

    match environment {
        Environment::Production => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_level(true))
                .init();
        }
        Environment::Development => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_ansi(true))
                .init();
        }
    }
}
