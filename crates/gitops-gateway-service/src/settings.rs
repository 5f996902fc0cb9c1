//! Command line, configuration loading and log initialisation.

use clap::Parser;
use gitops_gateway_api::config::LoggingConfig;
use gitops_gateway_api::ServiceConfig;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Prefix of environment variables that override configuration, e.g.
/// `GG__SERVER__PORT=9090` sets `server.port`.
pub const ENV_PREFIX: &str = "GG";

const SYSTEM_CONFIG: &str = "/etc/gitops-gateway/service";
const LOCAL_CONFIG: &str = "config/service";

/// GitOps webhook gateway
#[derive(Debug, Parser)]
#[command(name = "gitops-gateway", version, about)]
pub struct Args {
    /// Configuration file applied after the system and local files
    #[arg(long, env = "GG_CONFIG_FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read configuration: {0}")]
    Source(#[from] config::ConfigError),

    #[error(transparent)]
    Invalid(#[from] gitops_gateway_api::ConfigError),
}

/// Load the service configuration.
///
/// Sources, later ones overriding earlier ones:
///  1. `/etc/gitops-gateway/service.yaml`
///  2. `./config/service.yaml`
///  3. `explicit`, if given; it must exist
///  4. `GG__`-prefixed environment variables
///
/// Absent optional files are skipped. A file that does not parse, or a value
/// that cannot be coerced to its field's type, is an error.
pub fn load(explicit: Option<&Path>) -> Result<ServiceConfig, LoadError> {
    load_from(&[SYSTEM_CONFIG, LOCAL_CONFIG], explicit)
}

pub(crate) fn load_from(
    defaults: &[&str],
    explicit: Option<&Path>,
) -> Result<ServiceConfig, LoadError> {
    let mut builder = config::Config::builder();
    for name in defaults {
        builder = builder.add_source(
            config::File::with_name(name)
                .required(false)
                .format(config::FileFormat::Yaml),
        );
    }
    if let Some(path) = explicit {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    let service_config: ServiceConfig = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    service_config.validate()?;
    Ok(service_config)
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `logging.level`.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", logging.level)));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json_format {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
