//! Logging setup for host applications.
//!
//! The library only emits `tracing` events; hosts that want them printed
//! call [`init_logging`] once at startup.

use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Logging already initialized")]
    AlreadyInitialized,
}

/// Install a global fmt subscriber filtered by `filter` (e.g. `"info"` or
/// `"care_reminders_core=debug"`). `RUST_LOG` takes precedence when set.
pub fn init_logging(filter: &str) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(from_env) => from_env,
        Err(_) => EnvFilter::try_new(filter).map_err(|e| LoggingError::Filter(e.to_string()))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected() {
        // The first call may already have happened in another test
        let _ = init_logging("warn");
        assert!(matches!(
            init_logging("warn"),
            Err(LoggingError::AlreadyInitialized)
        ));
    }
}
