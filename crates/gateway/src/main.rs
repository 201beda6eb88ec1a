#[cfg(not(feature = "ort-backend"))]
compile_error!("the gateway binary needs the `ort-backend` feature to load a model");

use anyhow::Context;
use common::TelemetryGuard;
use gateway::{
    AppState,
    config::get_configuration,
    logging::{SERVICE_NAME, setup_logging},
    router,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_configuration().context("failed to load configuration")?;

    // Providers must exist before the subscriber picks up the global tracer.
    let _telemetry = match config.otel_endpoint.as_deref() {
        Some(endpoint) => Some(
            TelemetryGuard::init(SERVICE_NAME, endpoint)
                .context("failed to initialise OpenTelemetry")?,
        ),
        None => None,
    };
    setup_logging(&config);

    let state = AppState::from_config(&config);
    tracing::info!(
        model = %state.loader.identifier(),
        provider = config.detector_config().execution_provider.as_str(),
        "Model will load on the first prediction request"
    );

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    tracing::info!(
        address = %address,
        environment = config.environment.as_str(),
        "Starting server"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
