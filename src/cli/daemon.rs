//! Daemon startup.
//!
//! Startup order matters:
//!
//! 1. Resolve settings and read every file that lives outside the install
//!    directory (config file, AWS credentials file).
//! 2. Build the S3 client from local configuration only. No request is
//!    sent yet.
//! 3. Confine into the install directory and drop to the local user.
//! 4. Only then start fetching.

use std::future::Future;
use std::io;

use tracing::{error, info, warn};

use crate::cli::Cli;
use crate::core::config::{PartialSettings, Settings};
use crate::core::confine::{platform_sandbox, Activator, Sandbox};
use crate::core::constants;
use crate::core::install::Installer;
use crate::core::store::{BlobStore, S3Options, S3Store, StaticCredentials};
use crate::core::sync::SyncLoop;
use crate::error::{Error, Result};

type DynStore = Box<dyn BlobStore + Send + Sync>;

/// Run the daemon.
///
/// Returns `Ok(true)` on a clean exit. With `--once`, returns `Ok(false)`
/// if the single cycle failed.
///
/// # Errors
///
/// Returns an error for fatal configuration or confinement problems.
pub fn execute(cli: Cli) -> Result<bool> {
    let settings = load_settings(&cli)?;

    let credentials = settings
        .aws_credentials_file
        .as_deref()
        .map(|path| StaticCredentials::lookup(path, &settings.application_id))
        .transpose()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(Error::Runtime)?;

    let store = runtime.block_on(connect_store(&settings, credentials));
    let sync = start(&settings, platform_sandbox(), store)?;

    if cli.once {
        let outcome = runtime.block_on(sync.cycle());
        return Ok(outcome.is_success());
    }

    runtime.block_on(sync.run(shutdown_signal()));
    Ok(true)
}

/// Confine the process with `sandbox` and prepare the sync loop.
///
/// Stale staging left by an earlier run is removed from inside the
/// confined view of the install directory.
///
/// # Errors
///
/// Returns an error if confinement fails.
pub fn start<S, B>(settings: &Settings, sandbox: S, store: B) -> Result<SyncLoop<B>>
where
    S: Sandbox,
    B: BlobStore,
{
    let state = Activator::new(sandbox).establish(&settings.local_user, &settings.local_directory)?;

    let installer = Installer::new(state.base_dir());
    if let Err(e) = installer.recover() {
        warn!(error = %e, "could not clean up stale staging file");
    }

    let sync = SyncLoop::new(
        store,
        settings.mint_bucket.as_str(),
        &settings.application_id,
        installer,
        settings.update_interval,
    );

    info!(
        application_id = %settings.application_id,
        bucket = %settings.mint_bucket,
        key = %sync.key(),
        dir = %state.original_dir().display(),
        uid = state.identity().map(|id| id.uid),
        interval_secs = settings.update_interval.as_secs(),
        confined = state.is_confined(),
        "berry started"
    );

    Ok(sync)
}

/// Merge command-line settings over the optional config file.
fn load_settings(cli: &Cli) -> Result<Settings> {
    let file = match &cli.config_file {
        Some(path) => PartialSettings::load(path)?,
        None => PartialSettings::default(),
    };
    Ok(Settings::resolve(cli.partial_settings().or(file))?)
}

#[cfg(feature = "test-store")]
async fn connect_store(settings: &Settings, credentials: Option<StaticCredentials>) -> DynStore {
    if let Some(local) = crate::core::store::LocalStore::from_env() {
        warn!("using local test store instead of S3");
        return Box::new(local);
    }
    connect_s3(settings, credentials).await
}

#[cfg(not(feature = "test-store"))]
async fn connect_store(settings: &Settings, credentials: Option<StaticCredentials>) -> DynStore {
    connect_s3(settings, credentials).await
}

async fn connect_s3(settings: &Settings, credentials: Option<StaticCredentials>) -> DynStore {
    Box::new(
        S3Store::connect(S3Options {
            region: settings.region.clone(),
            endpoint_url: settings.endpoint_url.clone(),
            credentials,
            timeout: Some(constants::FETCH_TIMEOUT),
        })
        .await,
    )
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = wait_for_ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                wait_for_ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    wait_for_ctrl_c().await;

    info!("shutdown requested");
}

async fn wait_for_ctrl_c() {
    signal_or_hang(tokio::signal::ctrl_c(), "SIGINT").await
}

/// Resolves when `signal` fires. Never resolves if its handler failed.
async fn signal_or_hang<F>(signal: F, name: &str)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = signal.await {
        error!(error = %e, signal = name, "cannot listen for signal");
        std::future::pending::<()>().await;
    }
}
