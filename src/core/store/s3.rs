//! Amazon S3 blob store.
//!
//! Reads the mint bucket with the default AWS credential provider chain
//! (environment, profile, instance role), or with static keys looked up in
//! a credentials file when one is configured.
//!
//! SDK-level retries are disabled: a failed fetch ends the cycle and the
//! sync loop tries again after the update interval.
//!
//! The client is built before the process confines itself, so building it
//! must stay local. The region comes from `--region`, the environment or
//! the shared config file, never from instance metadata.

use std::fs;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::environment::EnvironmentVariableRegionProvider;
use aws_config::meta::region::RegionProviderChain;
use aws_config::profile::ProfileFileRegionProvider;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use tracing::{debug, trace, warn};
use zeroize::Zeroizing;

use super::{Blob, BlobStore};
use crate::error::{ConfigError, FetchError};

/// Access keys for one application, from a credentials file.
#[derive(Clone)]
pub struct StaticCredentials {
    access_key_id: String,
    secret_access_key: Zeroizing<String>,
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .finish()
    }
}

impl StaticCredentials {
    /// Find the keys for `application_id` in a credentials file.
    ///
    /// The file holds one `<application-id>:<access-key-id>:<secret-access-key>`
    /// entry per line; lines starting with `#` are comments.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::CredentialsFile` if the file cannot be read or
    /// has no entry for the application.
    pub fn lookup(path: &Path, application_id: &str) -> Result<Self, ConfigError> {
        let contents =
            Zeroizing::new(fs::read_to_string(path).map_err(|e| ConfigError::CredentialsFile {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?);

        Self::find(&contents, application_id).ok_or_else(|| ConfigError::CredentialsFile {
            path: path.to_path_buf(),
            reason: format!("no AWS credentials found for application \"{}\"", application_id),
        })
    }

    fn find(contents: &str, application_id: &str) -> Option<Self> {
        contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.starts_with('#'))
            .find_map(|line| {
                let mut parts = line.splitn(3, ':');
                if parts.next()? != application_id {
                    return None;
                }
                let access_key_id = parts.next()?.to_string();
                let secret_access_key = Zeroizing::new(parts.next()?.to_string());
                if access_key_id.is_empty() || secret_access_key.is_empty() {
                    return None;
                }
                Some(Self {
                    access_key_id,
                    secret_access_key,
                })
            })
    }
}

/// Client options.
#[derive(Debug, Clone, Default)]
pub struct S3Options {
    /// Region override; otherwise resolved by the provider chain.
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores.
    pub endpoint_url: Option<String>,
    /// Static keys instead of the default provider chain.
    pub credentials: Option<StaticCredentials>,
    /// Bound on one `GetObject` call; unbounded when `None`.
    pub timeout: Option<Duration>,
}

/// S3-backed [`BlobStore`].
pub struct S3Store {
    client: aws_sdk_s3::Client,
}

impl S3Store {
    /// Build a client from the environment and `options`.
    ///
    /// Only local configuration is read here; no request is sent until the
    /// first [`BlobStore::get`].
    pub async fn connect(options: S3Options) -> Self {
        let region = RegionProviderChain::first_try(options.region.map(Region::new))
            .or_else(EnvironmentVariableRegionProvider::new())
            .or_else(ProfileFileRegionProvider::new());
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(region)
            .load()
            .await;

        if sdk_config.region().is_none() {
            warn!("no AWS region configured; set --region or AWS_REGION");
        }

        let mut builder =
            aws_sdk_s3::config::Builder::from(&sdk_config).retry_config(RetryConfig::disabled());

        if let Some(timeout) = options.timeout {
            builder = builder.timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(timeout)
                    .build(),
            );
        }

        if let Some(url) = options.endpoint_url {
            debug!(endpoint = %url, "using custom S3 endpoint");
            builder = builder.endpoint_url(url).force_path_style(true);
        }

        if let Some(creds) = options.credentials {
            debug!(access_key_id = %creds.access_key_id, "using static AWS credentials");
            builder = builder.credentials_provider(Credentials::new(
                creds.access_key_id,
                creds.secret_access_key.as_str(),
                None,
                None,
                "berry-credentials-file",
            ));
        }

        Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
        }
    }
}

#[async_trait]
impl BlobStore for S3Store {
    async fn get(&self, bucket: &str, key: &str) -> Result<Blob, FetchError> {
        trace!(bucket, key, "fetching object");

        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify(bucket, key, e))?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;

        let blob = Zeroizing::new(data.into_bytes().to_vec());
        trace!(bucket, key, len = blob.len(), "fetched object");
        Ok(blob)
    }
}

/// Map an SDK error onto the fetch error taxonomy.
fn classify(bucket: &str, key: &str, err: SdkError<GetObjectError, HttpResponse>) -> FetchError {
    let status = err.raw_response().map(|r| r.status().as_u16());

    if let SdkError::ServiceError(service) = &err {
        let message = service.err().message().unwrap_or("no message").to_string();
        if service.err().is_no_such_key() || status == Some(404) {
            return FetchError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            };
        }
        if status == Some(403) || service.err().code() == Some("AccessDenied") {
            return FetchError::AccessDenied {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message,
            };
        }
    }

    FetchError::Transport {
        bucket: bucket.to_string(),
        message: DisplayErrorContext(&err).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILE: &str = "# application credentials\n\
                        other:AKIAOTHER:othersecret\n\
                        kio:AKIAKIO:kio/secret:with:colons\n";

    #[test]
    fn test_find_matching_entry() {
        let creds = StaticCredentials::find(FILE, "kio").unwrap();
        assert_eq!(creds.access_key_id, "AKIAKIO");
        assert_eq!(creds.secret_access_key.as_str(), "kio/secret:with:colons");
    }

    #[test]
    fn test_comment_lines_ignored() {
        assert!(StaticCredentials::find("# kio:AKIA:secret\n", "kio").is_none());
    }

    #[test]
    fn test_missing_entry() {
        assert!(StaticCredentials::find(FILE, "absent").is_none());
    }

    #[test]
    fn test_lookup_missing_file() {
        let err = StaticCredentials::lookup(Path::new("/nonexistent/berry-aws"), "kio").unwrap_err();
        assert!(matches!(err, ConfigError::CredentialsFile { .. }));
    }

    #[tokio::test]
    async fn test_connect_stays_off_the_network() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let metadata = format!("http://{}", listener.local_addr().unwrap());

        std::env::set_var("AWS_EC2_METADATA_SERVICE_ENDPOINT", &metadata);
        std::env::remove_var("AWS_REGION");
        std::env::remove_var("AWS_DEFAULT_REGION");
        std::env::set_var("AWS_CONFIG_FILE", "/nonexistent/berry/aws-config");
        std::env::set_var("AWS_SHARED_CREDENTIALS_FILE", "/nonexistent/berry/aws-credentials");

        let _store = S3Store::connect(S3Options::default()).await;

        match listener.accept() {
            Err(e) => assert_eq!(e.kind(), std::io::ErrorKind::WouldBlock),
            Ok((_, peer)) => panic!("connect opened a connection from {}", peer),
        }
    }

    #[test]
    fn test_debug_hides_secret() {
        let creds = StaticCredentials::find(FILE, "other").unwrap();
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("AKIAOTHER"));
        assert!(!rendered.contains("othersecret"));
    }
}
