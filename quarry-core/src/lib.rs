//! Core functionality for Quarry property-based testing.
//!
//! This crate provides the building blocks for generating data and
//! searching for minimal examples: strategies, the templates they draw and
//! simplify, and the engine that drives the search.

pub mod arbitrary;
pub mod collections;
pub mod combinators;
pub mod data;
pub mod engine;
pub mod error;
pub mod numbers;
pub mod registry;
pub mod settings;
pub mod strategy;
pub mod streams;
pub mod strings;
pub mod template;

// Re-export the main types
pub use arbitrary::*;
pub use collections::*;
pub use combinators::*;
pub use data::*;
pub use engine::*;
pub use error::*;
pub use numbers::*;
pub use registry::*;
pub use settings::*;
pub use strategy::*;
pub use streams::*;
pub use strings::*;
pub use template::*;
