//! Berry - credentials distribution daemon.

use clap::Parser;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use berry::cli::daemon::execute;
use berry::cli::{Cli, LogFormat};
use berry::core::constants;
use berry::error::{ConfigError, ConfinementError, Error};

fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber with env-filter support
    let filter = EnvFilter::try_from_env(constants::LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(cli.default_log_filter()));

    let registry = tracing_subscriber::registry().with(filter);
    match cli.log_format {
        LogFormat::Text => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }

    match execute(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            let suggestion = match &e {
                Error::Config(ConfigError::MissingField { .. }) => {
                    Some("see berry --help for the required settings")
                }
                Error::Confinement(ConfinementError::UnknownUser(_)) => {
                    Some("create the local user or pass an existing one with --local-user")
                }
                Error::Confinement(ConfinementError::PrivilegeRetained { .. }) => {
                    Some("--local-user must be an unprivileged user")
                }
                _ => None,
            };

            match suggestion {
                Some(hint) => error!(hint, "{}", e),
                None => error!("{}", e),
            }
            std::process::exit(1);
        }
    }
}
