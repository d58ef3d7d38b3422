//! Berry - credentials distribution daemon.
//!
//! Mirrors an application's mint credential bundle from S3 into a local
//! directory, after confining itself to that directory and dropping root.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface and daemon startup
//! └── core/             # Core library components
//!     ├── config        # Settings merging and validation
//!     ├── confine/      # chroot + privilege drop
//!     │   ├── mod       # Sandbox trait, Activator
//!     │   ├── unix      # nix-based implementation
//!     │   └── unconfined # no-op fallback
//!     ├── bundle        # Credential bundle validation
//!     ├── fingerprint   # SHA-256 content digests
//!     ├── install       # Staging file + atomic rename
//!     ├── store/        # Blob stores
//!     │   ├── mod       # BlobStore trait
//!     │   └── s3        # Amazon S3 implementation
//!     └── sync          # Fetch, validate, install loop
//! ```
//!
//! # Guarantees
//!
//! - `credentials.json` is only ever replaced by `rename`, never edited
//! - Invalid or unreachable remote content leaves the installed file alone
//! - Unchanged content is never rewritten
//! - Remote content is only fetched after confinement

pub mod cli;
pub mod core;
pub mod error;
