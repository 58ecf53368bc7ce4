//! TIN-X Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the TIN-X workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`TinxError`] and the crate-wide [`Result`] alias
//! - **Logging**: `tracing` subscriber bootstrap shared by every binary
//! - **Checksums**: input file fingerprints recorded in dataset provenance
//! - **Types**: protein, disease and paper identifiers plus output records
//!
//! # Example
//!
//! ```no_run
//! use tinx_common::checksum::compute_file_checksum;
//! use tinx_common::types::ChecksumAlgorithm;
//!
//! fn fingerprint(path: &str) -> tinx_common::Result<String> {
//!     compute_file_checksum(path, ChecksumAlgorithm::Sha256)
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{Result, TinxError};
