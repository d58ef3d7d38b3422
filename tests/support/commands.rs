//! Command helper methods for Test.

use super::{Test, APPLICATION_ID, BUCKET};
use assert_cmd::Command;
use std::process::Output;

/// Environment variables that would leak settings into the child process.
const INHERITED_SETTINGS: &[&str] = &[
    "BERRY_MINT_BUCKET",
    "BERRY_APPLICATION_ID",
    "BERRY_LOCAL_DIRECTORY",
    "BERRY_LOCAL_USER",
    "BERRY_UPDATE_INTERVAL",
    "BERRY_CONFIG_FILE",
    "BERRY_LOG",
];

impl Test {
    /// Create a berry command with an isolated environment.
    ///
    /// Returns a Command configured with:
    /// - HOME set to the temporary home directory
    /// - `BERRY_TEST_STORE_DIR` pointing at the local blob store
    /// - No inherited `BERRY_*` settings
    pub fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("berry").expect("failed to find berry binary");
        for var in INHERITED_SETTINGS {
            cmd.env_remove(var);
        }
        cmd.env("HOME", self.home.path());
        cmd.env("BERRY_TEST_STORE_DIR", self.store.path());
        cmd.current_dir(self.home.path());
        cmd
    }

    /// A command with every mandatory setting filled in.
    pub fn configured(&self) -> Command {
        let mut cmd = self.cmd();
        cmd.args(["--mint-bucket", BUCKET, "--application-id", APPLICATION_ID])
            .arg("--local-directory")
            .arg(self.dir.path())
            .args(["--local-user", "nobody"]);
        cmd
    }

    /// Shortcut for a single sync cycle.
    pub fn once(&self) -> Output {
        self.configured()
            .arg("--once")
            .output()
            .expect("failed to run berry --once")
    }
}
