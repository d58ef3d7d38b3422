//! Process confinement.
//!
//! Before any remote content is processed the daemon locks itself into the
//! install directory and gives up root. The platform mechanics live behind
//! the [`Sandbox`] trait; [`Activator`] owns the ordering and the
//! all-or-nothing failure policy.
//!
//! ## Sequence
//!
//! 1. Resolve the local user name to a uid/gid pair.
//! 2. Restrict the filesystem to the install directory.
//! 3. Drop supplementary groups, gid and uid.
//! 4. Verify root cannot be regained.
//!
//! The filesystem step must come first: once the identity is dropped the
//! process no longer has the privilege to chroot.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::ConfinementError;

mod unconfined;
#[cfg(unix)]
mod unix;

pub use unconfined::Unconfined;
#[cfg(unix)]
pub use unix::Chroot;

/// Numeric identity the daemon drops to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub uid: u32,
    pub gid: u32,
}

/// Platform confinement primitives.
pub trait Sandbox {
    /// Whether the process holds enough privilege to confine itself.
    fn is_privileged(&self) -> bool;

    /// Resolve a local user name to its uid and primary gid.
    fn resolve_user(&self, name: &str) -> Result<Identity, ConfinementError>;

    /// Restrict the filesystem view to `dir`.
    ///
    /// Returns the path under which `dir` is reachable afterwards.
    fn restrict_filesystem(&self, dir: &Path) -> io::Result<PathBuf>;

    /// Permanently switch group and user identity.
    fn drop_identity(&self, identity: Identity) -> io::Result<()>;

    /// Whether the process could switch back to root.
    fn can_regain_privilege(&self) -> bool;
}

/// Process-wide confinement state after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfinementState {
    /// Restricted to `original_dir`, now reachable as `root`, and running
    /// as `identity`.
    Confined {
        identity: Identity,
        original_dir: PathBuf,
        root: PathBuf,
    },
    /// Running unconfined with the original privileges.
    Degraded { dir: PathBuf },
}

impl ConfinementState {
    /// Directory that holds the credentials file from this process's view.
    pub fn base_dir(&self) -> &Path {
        match self {
            Self::Confined { root, .. } => root,
            Self::Degraded { dir } => dir,
        }
    }

    pub fn is_confined(&self) -> bool {
        matches!(self, Self::Confined { .. })
    }

    /// Install directory as configured, outside any confinement.
    pub fn original_dir(&self) -> &Path {
        match self {
            Self::Confined { original_dir, .. } => original_dir,
            Self::Degraded { dir } => dir,
        }
    }

    /// Identity the process runs as, if it was dropped.
    pub fn identity(&self) -> Option<Identity> {
        match self {
            Self::Confined { identity, .. } => Some(*identity),
            Self::Degraded { .. } => None,
        }
    }
}

/// Drives a [`Sandbox`] through the confinement sequence.
pub struct Activator<S> {
    sandbox: S,
}

impl<S: Sandbox> Activator<S> {
    pub fn new(sandbox: S) -> Self {
        Self { sandbox }
    }

    /// Whether [`Activator::activate`] can succeed in this process.
    pub fn can_confine(&self) -> bool {
        self.sandbox.is_privileged()
    }

    /// Restrict the filesystem to `dir`, then drop to `identity`.
    ///
    /// Returns the path under which `dir` is reachable afterwards.
    ///
    /// # Errors
    ///
    /// Any error is fatal. If the filesystem step fails the identity is
    /// untouched; if the identity step fails the process is already
    /// chrooted and must exit rather than keep running as root.
    pub fn activate(&self, identity: Identity, dir: &Path) -> Result<PathBuf, ConfinementError> {
        let root = self
            .sandbox
            .restrict_filesystem(dir)
            .map_err(|source| ConfinementError::RestrictFilesystem {
                dir: dir.to_path_buf(),
                source,
            })?;

        self.sandbox
            .drop_identity(identity)
            .map_err(|source| ConfinementError::DropIdentity {
                uid: identity.uid,
                gid: identity.gid,
                source,
            })?;

        if self.sandbox.can_regain_privilege() {
            return Err(ConfinementError::PrivilegeRetained { uid: identity.uid });
        }

        Ok(root)
    }

    /// Confine into `dir` as `local_user`, or fall back to degraded mode
    /// when the process lacks the privilege to do so.
    pub fn establish(
        &self,
        local_user: &str,
        dir: &Path,
    ) -> Result<ConfinementState, ConfinementError> {
        if !self.can_confine() {
            warn!(
                dir = %dir.display(),
                "SECURITY DEGRADED: cannot activate confinement; run berry as root so it can chroot and drop to the local user"
            );
            return Ok(ConfinementState::Degraded {
                dir: dir.to_path_buf(),
            });
        }

        let identity = self.sandbox.resolve_user(local_user)?;
        let root = self.activate(identity, dir)?;

        info!(
            dir = %dir.display(),
            user = local_user,
            uid = identity.uid,
            gid = identity.gid,
            "confinement active"
        );

        Ok(ConfinementState::Confined {
            identity,
            original_dir: dir.to_path_buf(),
            root,
        })
    }
}

/// The confinement backend for the current platform.
#[cfg(unix)]
pub fn platform_sandbox() -> Chroot {
    Chroot
}

/// The confinement backend for the current platform.
#[cfg(not(unix))]
pub fn platform_sandbox() -> Unconfined {
    Unconfined
}
