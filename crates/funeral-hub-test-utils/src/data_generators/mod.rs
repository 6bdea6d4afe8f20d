//! Test data generators for Funeral Hub.
//!
//! Uploaded file metadata, deceased records and burial progress payloads.

mod files;
mod records;

// Re-export all data generators for easy access
pub use files::*;
pub use records::*;
