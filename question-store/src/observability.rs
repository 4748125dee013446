//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

use crate::config::{Config, LogFormat};
use crate::error::{Error, Result};

/// Initialize the global tracing subscriber
///
/// `service.log_level` is parsed as an `EnvFilter` directive; an invalid
/// directive falls back to `info`. Fails if a global subscriber is already
/// installed. Events are written to stderr.
pub fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_new(&config.service.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let installed = match config.service.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
    installed.map_err(|e| Error::Internal(format!("Failed to install tracing subscriber: {}", e)))?;

    tracing::info!("Tracing initialized for service: {}", config.service.name);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice_reports_error() {
        let config = Config::default();
        // Another test may already have installed a subscriber, so only the
        // second call is guaranteed to fail.
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }
}
