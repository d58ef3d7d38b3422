//! Directory-backed blob store (test builds only).
//!
//! Objects live at `<root>/<bucket>/<key>`. The `test-store` feature makes
//! the binary use this store when `BERRY_TEST_STORE_DIR` is set, so the CLI
//! can be exercised end to end without S3.

use std::fs;
use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use zeroize::Zeroizing;

use super::{Blob, BlobStore};
use crate::error::FetchError;

/// Environment variable naming the store root.
pub const TEST_STORE_ENV: &str = "BERRY_TEST_STORE_DIR";

/// Blob store reading plain files from a local directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted at `$BERRY_TEST_STORE_DIR`, if set.
    pub fn from_env() -> Option<Self> {
        std::env::var_os(TEST_STORE_ENV).map(Self::new)
    }
}

#[async_trait]
impl BlobStore for LocalStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Blob, FetchError> {
        let path = self.root.join(bucket).join(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Zeroizing::new(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(FetchError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                Err(FetchError::AccessDenied {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    message: e.to_string(),
                })
            }
            Err(e) => Err(FetchError::Transport {
                bucket: bucket.to_string(),
                message: e.to_string(),
            }),
        }
    }
}
