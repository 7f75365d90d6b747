//! Loader installer library.
//!
//! This crate installs a runtime mod loader into a game directory from
//! published release archives, and after an upgrade removes the files the
//! previous release shipped that the new one no longer does. It is used by
//! the `loader-installer` CLI binary and can be driven programmatically with
//! substitute collaborators for testing.
//!
//! # Modules
//!
//! - [`artefact`] - Release download, payload integrity, extraction, and
//!   archive listing
//! - [`cleanup`] - Marker-gated removal of obsolete files
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - TOML configuration file loading
//! - [`diff`] - Obsolete-file detection from two archive listings
//! - [`dirs`] - Directory resolution abstraction for platform-specific paths
//! - [`error`] - Top-level errors for the CLI
//! - [`install`] - Release install orchestration
//! - [`output`] - User-facing message formatting
//! - [`release`] - Release and asset model with version selection
//! - [`settings`] - Persisted cleanup completion marker
//! - [`verification`] - Post-install marker checks

pub mod artefact;
pub mod cleanup;
pub mod cli;
pub mod config;
pub mod diff;
pub mod dirs;
pub mod error;
pub mod install;
pub mod output;
pub mod release;
pub mod settings;
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
pub mod verification;
