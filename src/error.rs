//! Error types.
//!
//! Each concern has its own error enum; [`Error`] wraps them so fatal
//! startup paths can propagate with `?` while the sync loop inspects the
//! per-cycle variants directly.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Confinement(#[from] ConfinementError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error(transparent)]
    Install(#[from] InstallError),

    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Configuration errors. Always fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required setting: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("AWS credentials file {path}: {reason}")]
    CredentialsFile { path: PathBuf, reason: String },
}

/// Errors while confining the process. Always fatal.
#[derive(Error, Debug)]
pub enum ConfinementError {
    #[error("local user not found: {0}")]
    UnknownUser(String),

    #[error("failed to look up local user {user}: {reason}")]
    UserLookup { user: String, reason: String },

    #[error("failed to restrict filesystem to {dir}: {source}")]
    RestrictFilesystem {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to drop privileges to uid {uid} gid {gid}: {source}")]
    DropIdentity {
        uid: u32,
        gid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("privileges could be regained after dropping to uid {uid}")]
    PrivilegeRetained { uid: u32 },
}

/// Errors fetching the bundle from the object store. Retried next cycle.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("credentials {key} not found in bucket {bucket}")]
    NotFound { bucket: String, key: String },

    #[error("access denied reading {key} from bucket {bucket}: {message}")]
    AccessDenied {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("could not read from bucket {bucket}: {message}")]
    Transport { bucket: String, message: String },

    #[error("fetch from bucket {bucket} timed out after {}s", .after.as_secs())]
    TimedOut {
        bucket: String,
        after: std::time::Duration,
    },

    #[error("failed to read object body: {0}")]
    Body(String),
}

/// Errors validating a fetched bundle. Retried next cycle.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum BundleError {
    #[error("not valid JSON: {0}")]
    NotJson(String),

    #[error("expected a JSON object")]
    NotAnObject,

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("field {0} must be a string")]
    WrongType(&'static str),

    #[error("field {0} must not be empty")]
    EmptyField(&'static str),
}

/// Errors staging or installing the credentials file. Retried next cycle.
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("could not persist credentials to {path}: {source}")]
    Stage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not fingerprint {path}: {source}")]
    Fingerprint {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not activate new credentials at {path}: {source}")]
    Rename {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
