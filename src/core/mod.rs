//! Core library components.
//!
//! Confinement, the credential bundle model, atomic installation, remote
//! stores, and the sync loop that ties them together.

pub mod bundle;
pub mod config;
pub mod confine;
pub mod constants;
pub mod fingerprint;
pub mod install;
pub mod store;
pub mod sync;
