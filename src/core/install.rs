//! Atomic installation of the credentials file.
//!
//! New content is written to a staging file next to the installed file and
//! moved into place with a single `rename`, so readers opening
//! `credentials.json` see either the old or the new bundle in full.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::core::bundle::CredentialBundle;
use crate::core::constants::{CREDENTIALS_FILE, CREDENTIALS_MODE, CREDENTIALS_TMP_FILE};
use crate::core::fingerprint::Fingerprint;
use crate::error::InstallError;

/// Result of offering new content to the installer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Content differed and was renamed into place.
    Installed {
        previous: Option<Fingerprint>,
        current: Fingerprint,
    },
    /// Content matched the installed file; nothing was touched.
    Unchanged(Fingerprint),
}

/// Installs credentials into one directory.
///
/// The base directory is the confined view of the install directory (`/`
/// after a chroot), or the original absolute directory when unconfined.
#[derive(Debug, Clone)]
pub struct Installer {
    dir: PathBuf,
}

impl Installer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the installed credentials file.
    pub fn credentials_path(&self) -> PathBuf {
        self.dir.join(CREDENTIALS_FILE)
    }

    /// Path of the staging file.
    pub fn staging_path(&self) -> PathBuf {
        self.dir.join(CREDENTIALS_TMP_FILE)
    }

    /// Remove a staging file left behind by an interrupted run.
    ///
    /// Returns whether a stale file was found.
    pub fn recover(&self) -> Result<bool, InstallError> {
        let path = self.staging_path();
        match fs::remove_file(&path) {
            Ok(()) => {
                warn!(path = %path.display(), "removed stale staging file");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(InstallError::Stage { path, source }),
        }
    }

    /// Read the currently installed bundle, if it exists and still parses.
    pub fn installed_bundle(&self) -> Option<CredentialBundle> {
        let bytes = Zeroizing::new(fs::read(self.credentials_path()).ok()?);
        CredentialBundle::parse(&bytes).ok()
    }

    /// Stage `content`, then install it unless it matches the installed file.
    ///
    /// On every error path the staging file is removed and the installed
    /// file is left as it was.
    pub fn install(&self, content: &[u8]) -> Result<InstallOutcome, InstallError> {
        let staged = self.stage(content)?;

        let current = Fingerprint::of_file(staged.path()).map_err(|source| {
            InstallError::Fingerprint {
                path: staged.path().to_path_buf(),
                source,
            }
        })?;

        let target = self.credentials_path();
        let previous = match Fingerprint::of_existing(&target) {
            Ok(fp) => fp,
            Err(e) => {
                warn!(path = %target.display(), error = %e, "installed credentials unreadable, replacing");
                None
            }
        };

        if previous == Some(current) {
            debug!(fingerprint = %current.short(), "credentials unchanged");
            // Dropping the guard discards the staging file.
            return Ok(InstallOutcome::Unchanged(current));
        }

        staged.commit(&target)?;
        Ok(InstallOutcome::Installed { previous, current })
    }

    fn stage(&self, content: &[u8]) -> Result<Staged, InstallError> {
        let path = self.staging_path();
        let guard = Staged {
            path: path.clone(),
            committed: false,
        };

        write_restricted(&path, content).map_err(|source| InstallError::Stage { path, source })?;
        Ok(guard)
    }
}

/// Staging file owned by the current cycle.
///
/// Removed on drop unless it was renamed into place.
struct Staged {
    path: PathBuf,
    committed: bool,
}

impl Staged {
    fn path(&self) -> &Path {
        &self.path
    }

    fn commit(mut self, target: &Path) -> Result<(), InstallError> {
        fs::rename(&self.path, target).map_err(|source| InstallError::Rename {
            path: target.to_path_buf(),
            source,
        })?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for Staged {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to remove staging file");
            }
        }
    }
}

/// Write `content` to `path` with owner-only permissions and flush to disk.
fn write_restricted(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(CREDENTIALS_MODE);
    }

    let mut file = options.open(path)?;

    // A pre-existing file keeps its old mode, so tighten it explicitly.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(CREDENTIALS_MODE))?;
    }

    file.write_all(content)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BUNDLE_V1: &[u8] = br#"{"application_username":"kio-svc","client_id":"abc123"}"#;
    const BUNDLE_V2: &[u8] = br#"{"application_username":"kio-svc","client_id":"abc124"}"#;

    fn setup() -> (TempDir, Installer) {
        let dir = TempDir::new().unwrap();
        let installer = Installer::new(dir.path());
        (dir, installer)
    }

    #[test]
    fn test_first_install() {
        let (_dir, installer) = setup();

        let outcome = installer.install(BUNDLE_V1).unwrap();
        assert_eq!(
            outcome,
            InstallOutcome::Installed {
                previous: None,
                current: Fingerprint::of_bytes(BUNDLE_V1),
            }
        );
        assert_eq!(fs::read(installer.credentials_path()).unwrap(), BUNDLE_V1);
        assert!(!installer.staging_path().exists());
    }

    #[test]
    fn test_identical_content_is_not_renamed() {
        let (_dir, installer) = setup();
        installer.install(BUNDLE_V1).unwrap();

        let modified = fs::metadata(installer.credentials_path())
            .unwrap()
            .modified()
            .unwrap();

        for _ in 0..3 {
            let outcome = installer.install(BUNDLE_V1).unwrap();
            assert_eq!(
                outcome,
                InstallOutcome::Unchanged(Fingerprint::of_bytes(BUNDLE_V1))
            );
        }

        assert!(!installer.staging_path().exists());
        assert_eq!(
            fs::metadata(installer.credentials_path())
                .unwrap()
                .modified()
                .unwrap(),
            modified
        );
    }

    #[test]
    fn test_changed_content_replaces_file() {
        let (_dir, installer) = setup();
        installer.install(BUNDLE_V1).unwrap();

        let outcome = installer.install(BUNDLE_V2).unwrap();
        assert_eq!(
            outcome,
            InstallOutcome::Installed {
                previous: Some(Fingerprint::of_bytes(BUNDLE_V1)),
                current: Fingerprint::of_bytes(BUNDLE_V2),
            }
        );
        assert_eq!(fs::read(installer.credentials_path()).unwrap(), BUNDLE_V2);
    }

    #[cfg(unix)]
    #[test]
    fn test_installed_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, installer) = setup();
        installer.install(BUNDLE_V1).unwrap();

        let mode = fs::metadata(installer.credentials_path())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_stale_staging_permissions_tightened() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, installer) = setup();
        fs::write(installer.staging_path(), b"junk").unwrap();
        fs::set_permissions(installer.staging_path(), fs::Permissions::from_mode(0o644)).unwrap();

        installer.install(BUNDLE_V1).unwrap();
        let mode = fs::metadata(installer.credentials_path())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_crash_before_rename_keeps_previous_bundle() {
        let (_dir, installer) = setup();
        installer.install(BUNDLE_V1).unwrap();

        // Simulate a crash after staging: the temp file exists, no rename happened.
        fs::write(installer.staging_path(), &BUNDLE_V2[..20]).unwrap();

        assert_eq!(fs::read(installer.credentials_path()).unwrap(), BUNDLE_V1);
        assert!(installer.recover().unwrap());
        assert!(!installer.staging_path().exists());
        assert_eq!(fs::read(installer.credentials_path()).unwrap(), BUNDLE_V1);

        installer.install(BUNDLE_V2).unwrap();
        assert_eq!(fs::read(installer.credentials_path()).unwrap(), BUNDLE_V2);
    }

    #[test]
    fn test_recover_without_stale_file() {
        let (_dir, installer) = setup();
        assert!(!installer.recover().unwrap());
    }

    #[test]
    fn test_stage_failure_leaves_installed_file() {
        let (dir, installer) = setup();
        installer.install(BUNDLE_V1).unwrap();

        // A directory in the staging slot makes the write fail.
        fs::create_dir(dir.path().join(CREDENTIALS_TMP_FILE)).unwrap();

        let err = installer.install(BUNDLE_V2).unwrap_err();
        assert!(matches!(err, InstallError::Stage { .. }));
        assert_eq!(fs::read(installer.credentials_path()).unwrap(), BUNDLE_V1);
    }

    #[test]
    fn test_rename_failure_cleans_staging() {
        let (dir, installer) = setup();

        // A non-empty directory at the target path cannot be renamed over.
        let target = dir.path().join(CREDENTIALS_FILE);
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), b"x").unwrap();

        let err = installer.install(BUNDLE_V1).unwrap_err();
        assert!(matches!(err, InstallError::Rename { .. }));
        assert!(!installer.staging_path().exists());
        assert!(target.join("keep").exists());
    }

    #[test]
    fn test_installed_bundle_reads_back() {
        let (_dir, installer) = setup();
        assert!(installer.installed_bundle().is_none());

        installer.install(BUNDLE_V1).unwrap();
        let bundle = installer.installed_bundle().unwrap();
        assert_eq!(bundle, CredentialBundle::parse(BUNDLE_V1).unwrap());
    }
}
