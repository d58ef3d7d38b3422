//! Command-line interface.

pub mod daemon;

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::core::config::PartialSettings;

/// Berry - mirrors mint credentials from S3 into a local directory.
#[derive(Parser, Debug)]
#[command(
    name = "berry",
    about = "Mirrors mint credentials from S3 into a confined local directory",
    version
)]
pub struct Cli {
    /// The S3 bucket where mint stores all credentials
    #[arg(short = 'm', long, env = "BERRY_MINT_BUCKET")]
    pub mint_bucket: Option<String>,

    /// The application ID (as registered in Kio) to fetch credentials for
    #[arg(short = 'a', long, env = "BERRY_APPLICATION_ID")]
    pub application_id: Option<String>,

    /// Local directory where the credentials will be stored
    #[arg(short = 'd', long, env = "BERRY_LOCAL_DIRECTORY")]
    pub local_directory: Option<PathBuf>,

    /// Local user that needs to read the credentials; berry drops to it
    #[arg(short = 'u', long, env = "BERRY_LOCAL_USER")]
    pub local_user: Option<String>,

    /// Update interval in seconds [default: 60]
    #[arg(
        short = 'i',
        long,
        env = "BERRY_UPDATE_INTERVAL",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub update_interval: Option<u64>,

    /// Read settings from the given TOML file
    #[arg(short = 'f', long, env = "BERRY_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Look up static AWS credentials by application ID in the given file
    #[arg(short = 'c', long)]
    pub aws_credentials_file: Option<PathBuf>,

    /// AWS region of the mint bucket
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Custom S3 endpoint URL
    #[arg(long)]
    pub endpoint_url: Option<String>,

    /// Fetch credentials once and exit
    #[arg(long)]
    pub once: bool,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "silent")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub silent: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl Cli {
    /// Settings given on the command line or through the environment.
    pub fn partial_settings(&self) -> PartialSettings {
        PartialSettings {
            mint_bucket: self.mint_bucket.clone(),
            application_id: self.application_id.clone(),
            local_directory: self.local_directory.clone(),
            local_user: self.local_user.clone(),
            update_interval: self.update_interval,
            region: self.region.clone(),
            endpoint_url: self.endpoint_url.clone(),
            aws_credentials_file: self.aws_credentials_file.clone(),
        }
    }

    /// Default log filter for the chosen verbosity.
    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "berry=debug"
        } else if self.silent {
            "berry=error"
        } else {
            "berry=info"
        }
    }
}
