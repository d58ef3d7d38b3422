//! Daemon configuration.
//!
//! Settings come from the command line (or `BERRY_*` environment variables)
//! and, optionally, a TOML file. Command-line values win. The merged result
//! is validated once into an immutable [`Settings`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::core::constants;
use crate::error::ConfigError;

/// Settings as supplied by one source; every field may be absent.
///
/// Also the schema of the TOML config file:
///
/// ```toml
/// mint_bucket = "mint-example"
/// application_id = "kio"
/// local_directory = "/var/lib/berry"
/// local_user = "application"
/// update_interval = 60
/// ```
#[derive(Debug, Default, Clone, Deserialize, PartialEq, Eq)]
pub struct PartialSettings {
    pub mint_bucket: Option<String>,
    pub application_id: Option<String>,
    pub local_directory: Option<PathBuf>,
    pub local_user: Option<String>,
    pub update_interval: Option<u64>,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub aws_credentials_file: Option<PathBuf>,
}

impl PartialSettings {
    /// Load a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadFile` or `ConfigError::Parse`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "loading config file");
        let contents = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Fill fields missing here from `fallback`.
    pub fn or(self, fallback: Self) -> Self {
        Self {
            mint_bucket: self.mint_bucket.or(fallback.mint_bucket),
            application_id: self.application_id.or(fallback.application_id),
            local_directory: self.local_directory.or(fallback.local_directory),
            local_user: self.local_user.or(fallback.local_user),
            update_interval: self.update_interval.or(fallback.update_interval),
            region: self.region.or(fallback.region),
            endpoint_url: self.endpoint_url.or(fallback.endpoint_url),
            aws_credentials_file: self.aws_credentials_file.or(fallback.aws_credentials_file),
        }
    }
}

/// Validated daemon settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub mint_bucket: String,
    pub application_id: String,
    /// Absolute, existing install directory.
    pub local_directory: PathBuf,
    pub local_user: String,
    pub update_interval: Duration,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub aws_credentials_file: Option<PathBuf>,
}

impl Settings {
    /// Validate merged settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingField` when a mandatory value is absent
    /// or blank, and `ConfigError::InvalidValue` for malformed values.
    pub fn resolve(partial: PartialSettings) -> Result<Self, ConfigError> {
        let mint_bucket = required(partial.mint_bucket, "mint-bucket")?;
        let application_id = required(partial.application_id, "application-id")?;
        let local_user = required(partial.local_user, "local-user")?;
        let local_directory = partial
            .local_directory
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(ConfigError::MissingField {
                field: "local-directory",
            })?;

        if application_id.contains('/') {
            return Err(ConfigError::InvalidValue {
                field: "application-id",
                reason: format!("must not contain '/': {}", application_id),
            });
        }

        let interval = partial
            .update_interval
            .unwrap_or(constants::DEFAULT_UPDATE_INTERVAL);
        if interval == 0 {
            return Err(ConfigError::InvalidValue {
                field: "update-interval",
                reason: "must be a positive number of seconds".to_string(),
            });
        }

        let local_directory = local_directory.canonicalize().map_err(|e| {
            ConfigError::InvalidValue {
                field: "local-directory",
                reason: format!("{}: {}", local_directory.display(), e),
            }
        })?;
        if !local_directory.is_dir() {
            return Err(ConfigError::InvalidValue {
                field: "local-directory",
                reason: format!("{} is not a directory", local_directory.display()),
            });
        }

        Ok(Self {
            mint_bucket,
            application_id,
            local_directory,
            local_user,
            update_interval: Duration::from_secs(interval),
            region: partial.region,
            endpoint_url: partial.endpoint_url,
            aws_credentials_file: partial.aws_credentials_file,
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingField { field })
}
