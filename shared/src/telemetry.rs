use anyhow::{anyhow, Result};
use std::env;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub default_filter: String,
    pub json: bool,
}

impl TelemetryConfig {
    pub fn from_env(service_name: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            default_filter: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            json: env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        }
    }
}

/// Install the global tracing subscriber. Logs go to stderr so stdout stays
/// free for rendered output.
pub fn init_telemetry(config: TelemetryConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.default_filter)
        .map_err(|e| anyhow!("Invalid log filter '{}': {}", config.default_filter, e))?;

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| anyhow!("Failed to initialise tracing: {}", e))?;

    tracing::debug!("Telemetry initialised for {}", config.service_name);
    Ok(())
}
