//! Test fixtures and constants.

/// Bucket used by every test.
pub const BUCKET: &str = "mint";

/// Application ID used by every test.
pub const APPLICATION_ID: &str = "kio";

/// A valid bundle.
pub const BUNDLE: &[u8] = br#"{"application_username":"kio-svc","client_id":"abc123"}"#;

/// The same bundle with a rotated client ID.
pub const BUNDLE_ROTATED: &[u8] = br#"{"application_username":"kio-svc","client_id":"abc124"}"#;

/// A bundle with extra fields that must be preserved verbatim.
pub const BUNDLE_EXTENDED: &[u8] =
    br#"{ "application_username": "kio-svc", "client_id": "abc123", "client_secret": "s3cr3t" }"#;

/// A bundle missing `client_id`.
pub const BUNDLE_INCOMPLETE: &[u8] = br#"{"application_username": "a"}"#;
