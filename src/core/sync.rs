//! Credential sync loop.
//!
//! Each cycle fetches the bundle, validates it, and hands it to the
//! [`Installer`]. Failures end the cycle and are retried after the update
//! interval; the installed file is never touched on an error path.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::core::bundle::{BundleChanges, CredentialBundle};
use crate::core::constants;
use crate::core::fingerprint::Fingerprint;
use crate::core::install::{InstallOutcome, Installer};
use crate::core::store::BlobStore;
use crate::error::{FetchError, InstallError};

/// Cycle stage at which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Validating,
    Staging,
    Installing,
}

/// How a single cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// New content was renamed into place.
    Installed {
        fingerprint: Fingerprint,
        changes: BundleChanges,
    },
    /// Remote content matches the installed file.
    Unchanged,
    /// The cycle was abandoned.
    Failed(Stage),
}

impl CycleOutcome {
    /// Whether the installed file reflects the remote bundle after this cycle.
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

/// Counters over the lifetime of [`SyncLoop::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub cycles: u64,
    pub installs: u64,
    pub unchanged: u64,
    pub failures: u64,
}

impl SyncStats {
    fn record(&mut self, outcome: &CycleOutcome) {
        self.cycles += 1;
        match outcome {
            CycleOutcome::Installed { .. } => self.installs += 1,
            CycleOutcome::Unchanged => self.unchanged += 1,
            CycleOutcome::Failed(_) => self.failures += 1,
        }
    }
}

/// Periodically mirrors one application's bundle into the install directory.
pub struct SyncLoop<S> {
    store: S,
    bucket: String,
    key: String,
    installer: Installer,
    interval: Duration,
    fetch_timeout: Duration,
}

impl<S: BlobStore> SyncLoop<S> {
    pub fn new(
        store: S,
        bucket: impl Into<String>,
        application_id: &str,
        installer: Installer,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            key: constants::mint_key(application_id),
            installer,
            interval,
            fetch_timeout: constants::FETCH_TIMEOUT,
        }
    }

    /// Abandon a fetch that has not completed after `timeout`.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Object key being mirrored.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Run one fetch, validate, install cycle.
    pub async fn cycle(&self) -> CycleOutcome {
        let fetch = tokio::time::timeout(self.fetch_timeout, self.store.get(&self.bucket, &self.key));
        let fetched = fetch.await.unwrap_or_else(|_| {
            Err(FetchError::TimedOut {
                bucket: self.bucket.clone(),
                after: self.fetch_timeout,
            })
        });

        let blob = match fetched {
            Ok(blob) => blob,
            Err(e) => {
                self.report_fetch_error(&e);
                return CycleOutcome::Failed(Stage::Fetching);
            }
        };

        let bundle = match CredentialBundle::parse(&blob) {
            Ok(bundle) => bundle,
            Err(e) => {
                error!(
                    bucket = %self.bucket,
                    key = %self.key,
                    error = %e,
                    "downloaded credentials are invalid, keeping installed file"
                );
                return CycleOutcome::Failed(Stage::Validating);
            }
        };

        let previous = self.installer.installed_bundle();

        match self.installer.install(&blob) {
            Ok(InstallOutcome::Installed { current, .. }) => {
                let changes = bundle.changes_since(previous.as_ref());
                info!(
                    path = %self.installer.credentials_path().display(),
                    fingerprint = %current.short(),
                    fields = %changes,
                    "installed new credentials"
                );
                CycleOutcome::Installed {
                    fingerprint: current,
                    changes,
                }
            }
            Ok(InstallOutcome::Unchanged(fp)) => {
                debug!(fingerprint = %fp.short(), "credentials up to date");
                CycleOutcome::Unchanged
            }
            Err(e) => {
                let stage = match e {
                    InstallError::Rename { .. } => Stage::Installing,
                    InstallError::Stage { .. } | InstallError::Fingerprint { .. } => Stage::Staging,
                };
                error!(error = %e, "failed to install credentials, keeping installed file");
                CycleOutcome::Failed(stage)
            }
        }
    }

    /// Run cycles until `shutdown` resolves.
    ///
    /// The first cycle starts immediately; later cycles start one interval
    /// after the previous one finished. Shutdown may abandon a cycle midway,
    /// which leaves the installed file untouched.
    pub async fn run<F>(&self, shutdown: F) -> SyncStats
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut stats = SyncStats::default();

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                outcome = self.cycle() => stats.record(&outcome),
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!(
            cycles = stats.cycles,
            installs = stats.installs,
            failures = stats.failures,
            "sync loop stopped"
        );
        stats
    }

    fn report_fetch_error(&self, err: &FetchError) {
        match err {
            FetchError::NotFound { .. } => warn!(
                bucket = %self.bucket,
                key = %self.key,
                "credentials not found in mint bucket; mint may not have synced them yet or the configuration is wrong"
            ),
            FetchError::AccessDenied { message, .. } => error!(
                bucket = %self.bucket,
                key = %self.key,
                message = %message,
                "access denied reading mint bucket; check that the IAM policy allows read access"
            ),
            other => error!(bucket = %self.bucket, error = %other, "could not fetch credentials"),
        }
    }
}
