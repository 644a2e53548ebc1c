//! src/telemetry.rs
use tracing_subscriber::prelude::*;

pub fn init_tracing(service_name: &'static str) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_target(false),
        )
        .try_init()?;
    tracing::info!("telemetry initialized for {service_name}");
    Ok(())
}
