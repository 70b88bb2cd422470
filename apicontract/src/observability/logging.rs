//! Subscriber installation for binaries and tests embedding the crate.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::errors::ContractError;

/// Installs a global `fmt` subscriber.
///
/// `RUST_LOG` wins over `default_filter` when set. With `json` the output
/// is one JSON object per line. Fails if a global subscriber already
/// exists or the filter does not parse.
pub fn init_logging(default_filter: &str, json: bool) -> Result<(), ContractError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|err| ContractError::Config(format!("invalid log filter: {err}")))?;

    let installed = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .try_init()
    };
    installed.map_err(|err| ContractError::Config(format!("logging already initialised: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        let first = init_logging("apicontract=debug", false);
        let second = init_logging("apicontract=debug", true);
        // Another test may have installed a subscriber first.
        assert!(first.is_err() || second.is_err());
        assert!(matches!(second, Err(ContractError::Config(_))));
    }
}
