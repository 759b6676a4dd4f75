use tracing_subscriber::EnvFilter;

use crate::config::{Config, LogFormat};
use crate::error::DispatchError;

/// Installs the global tracing subscriber. Fails if one is already set.
pub fn init(config: &Config) -> Result<(), DispatchError> {
    let filter = EnvFilter::try_new(&config.log_level)
        .map_err(|err| DispatchError::Config(format!("invalid LOG_LEVEL: {err}")))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let installed = match config.log_format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    installed.map_err(|err| DispatchError::Internal(format!("tracing init failed: {err}")))
}
