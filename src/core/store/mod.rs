//! Remote blob stores.
//!
//! The sync loop only needs one operation: fetch the bytes stored under a
//! key in a bucket. Backends implement [`BlobStore`].
//!
//! ## Adding a New Backend
//!
//! 1. Implement the `BlobStore` trait
//! 2. Add the implementation in a new file (e.g., `gcs.rs`)
//! 3. Re-export from this module

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::error::FetchError;

mod s3;
pub use s3::{S3Options, S3Store, StaticCredentials};

#[cfg(any(test, feature = "test-store"))]
mod local;
#[cfg(any(test, feature = "test-store"))]
pub use local::{LocalStore, TEST_STORE_ENV};

/// Object contents, wiped from memory on drop.
pub type Blob = Zeroizing<Vec<u8>>;

/// Blob fetch capability.
///
/// Every error is treated the same way by the caller: log and try again on
/// the next cycle.
#[async_trait]
pub trait BlobStore {
    /// Fetch the object stored at `key` in `bucket`.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if the object is missing, access is denied, or
    /// the transport fails.
    async fn get(&self, bucket: &str, key: &str) -> Result<Blob, FetchError>;
}

#[async_trait]
impl<T: BlobStore + Send + Sync + ?Sized> BlobStore for Box<T> {
    async fn get(&self, bucket: &str, key: &str) -> Result<Blob, FetchError> {
        (**self).get(bucket, key).await
    }
}
