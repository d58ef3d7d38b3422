//! Test support utilities for berry integration tests.
//!
//! Provides an isolated install directory and a local blob store per test.

#![allow(dead_code)]

pub mod assertions;
pub mod commands;
pub mod fixtures;
pub mod skip;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

/// Test environment with isolated temp directories.
///
/// No process-global state is mutated; child processes get their
/// environment through the command builder so tests can run in parallel.
pub struct Test {
    /// Install directory passed as `--local-directory`
    pub dir: TempDir,
    /// Root of the local blob store
    pub store: TempDir,
    /// Temporary home directory
    pub home: TempDir,
}

impl Test {
    /// Create a new empty test environment.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let store = TempDir::new().expect("failed to create temp store");
        let home = TempDir::new().expect("failed to create temp home");

        Self { dir, store, home }
    }

    /// Create a test environment with a bundle already published.
    pub fn with_bundle(content: &[u8]) -> Self {
        let t = Self::new();
        t.publish(content);
        t
    }

    /// Path of the published object for the test application.
    pub fn object_path(&self) -> PathBuf {
        self.store
            .path()
            .join(BUCKET)
            .join("apps")
            .join(APPLICATION_ID)
            .join("credentials.json")
    }

    /// Publish `content` as the application's bundle.
    pub fn publish(&self, content: &[u8]) {
        let path = self.object_path();
        fs::create_dir_all(path.parent().unwrap()).expect("failed to create store dir");
        fs::write(path, content).expect("failed to publish bundle");
    }

    /// Remove the published bundle.
    pub fn unpublish(&self) {
        let _ = fs::remove_file(self.object_path());
    }

    /// Installed credentials file path.
    pub fn installed_path(&self) -> PathBuf {
        self.dir.path().join("credentials.json")
    }

    /// Staging file path.
    pub fn staging_path(&self) -> PathBuf {
        self.dir.path().join("credentials.json.tmp")
    }

    /// Contents of the installed credentials file, if any.
    pub fn installed(&self) -> Option<Vec<u8>> {
        fs::read(self.installed_path()).ok()
    }
}
