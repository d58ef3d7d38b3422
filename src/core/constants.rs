//! Constants used throughout berry.
//!
//! Centralizes file names, key layout, and defaults.

use std::time::Duration;

/// Installed credentials file name, relative to the install directory.
pub const CREDENTIALS_FILE: &str = "credentials.json";

/// Staging file name, a sibling of [`CREDENTIALS_FILE`].
pub const CREDENTIALS_TMP_FILE: &str = "credentials.json.tmp";

/// Permissions for both the staging and the installed file.
pub const CREDENTIALS_MODE: u32 = 0o600;

/// Default poll interval in seconds.
pub const DEFAULT_UPDATE_INTERVAL: u64 = 60;

/// Upper bound on a single fetch, including reading the body.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable controlling the log filter.
pub const LOG_ENV: &str = "BERRY_LOG";

/// Object key of the credentials bundle for an application.
///
/// Mint stores every application's bundle at `apps/<application-id>/credentials.json`.
pub fn mint_key(application_id: &str) -> String {
    format!("apps/{}/{}", application_id, CREDENTIALS_FILE)
}
