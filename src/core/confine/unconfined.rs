//! Sandbox for platforms without chroot support.
//!
//! Never reports privilege, so the daemon always runs degraded.

use std::io;
use std::path::{Path, PathBuf};

use super::{Identity, Sandbox};
use crate::error::ConfinementError;

/// No-op sandbox.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconfined;

impl Sandbox for Unconfined {
    fn is_privileged(&self) -> bool {
        false
    }

    fn resolve_user(&self, name: &str) -> Result<Identity, ConfinementError> {
        Err(ConfinementError::UserLookup {
            user: name.to_string(),
            reason: "user lookup is not supported on this platform".to_string(),
        })
    }

    fn restrict_filesystem(&self, _dir: &Path) -> io::Result<PathBuf> {
        Err(io::Error::from(io::ErrorKind::Unsupported))
    }

    fn drop_identity(&self, _identity: Identity) -> io::Result<()> {
        Err(io::Error::from(io::ErrorKind::Unsupported))
    }

    fn can_regain_privilege(&self) -> bool {
        false
    }
}
