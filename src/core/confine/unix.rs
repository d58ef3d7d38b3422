//! chroot + setuid sandbox for Unix.

use std::io;
use std::path::{Path, PathBuf};

use nix::unistd::{self, Gid, Uid, User};
use tracing::debug;

use super::{Identity, Sandbox};
use crate::error::ConfinementError;

/// Confines the process with `chroot(2)` and drops to an unprivileged user.
#[derive(Debug, Clone, Copy, Default)]
pub struct Chroot;

impl Sandbox for Chroot {
    fn is_privileged(&self) -> bool {
        Uid::effective().is_root()
    }

    fn resolve_user(&self, name: &str) -> Result<Identity, ConfinementError> {
        let user = User::from_name(name)
            .map_err(|e| ConfinementError::UserLookup {
                user: name.to_string(),
                reason: e.to_string(),
            })?
            .ok_or_else(|| ConfinementError::UnknownUser(name.to_string()))?;

        Ok(Identity {
            uid: user.uid.as_raw(),
            gid: user.gid.as_raw(),
        })
    }

    fn restrict_filesystem(&self, dir: &Path) -> io::Result<PathBuf> {
        debug!(dir = %dir.display(), "chroot");
        unistd::chdir(dir)?;
        unistd::chroot(".")?;
        // The working directory must not point outside the new root.
        unistd::chdir("/")?;
        Ok(PathBuf::from("/"))
    }

    fn drop_identity(&self, identity: Identity) -> io::Result<()> {
        let gid = Gid::from_raw(identity.gid);
        let uid = Uid::from_raw(identity.uid);
        debug!(uid = identity.uid, gid = identity.gid, "dropping privileges");

        // Supplementary groups first, while still root.
        #[cfg(not(any(target_vendor = "apple", target_os = "redox", target_os = "haiku")))]
        unistd::setgroups(&[gid])?;

        unistd::setgid(gid)?;
        unistd::setuid(uid)?;
        Ok(())
    }

    fn can_regain_privilege(&self) -> bool {
        if Uid::current().is_root() || Uid::effective().is_root() {
            return true;
        }
        unistd::setuid(Uid::from_raw(0)).is_ok()
    }
}
