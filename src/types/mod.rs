//! This module defines the core, strongly-typed data representations used
//! throughout the decoder.
//!
//! It includes the canonical `TypeTag` enum, which replaces the statistics
//! file's textual marshal type names with a closed, Arrow-compatible enum, and
//! the `CqlValue` enum holding decoded cell payloads.

pub mod type_tag;
pub mod value;

// Re-export the main type(s) for easier access.
pub use type_tag::TypeTag;
pub use value::CqlValue;
