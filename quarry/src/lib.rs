//! Quarry property-based testing library.
//!
//! This is the main entry point for Quarry: strategies for describing
//! data, and an engine that searches them for minimal examples.

pub use quarry_core::*;

// Re-export derive macros when available
#[cfg(feature = "derive")]
pub use quarry_derive::Arbitrary;
