//! Release artefact retrieval, validation, and unpacking.
//!
//! # Sub-modules
//!
//! - [`download`] - Release listing and asset download trait with the
//!   GitHub-backed implementation.
//! - [`entries`] - Archive entry listings (`ArchiveEntryPath`).
//! - [`extraction`] - Zip extraction with path traversal protection.
//! - [`integrity`] - Payload signature and staged-size checks.

pub mod download;
pub mod entries;
pub mod extraction;
pub mod integrity;
