//! This module serves as the public API for the low-level decoding kernels.
//!
//! Every higher-level parser (statistics, index, data) is built on these
//! primitives. They are PURE RUST, stateless apart from the cursor position,
//! and never panic on malformed input.

//==================================================================================
// 1. Module Declarations
//==================================================================================

/// The bounds-checked, big-endian byte reader.
pub mod cursor;
/// The self-describing variable-width integer codec.
pub mod vint;
/// The signed-to-unsigned mapping used by signed vints.
pub mod zigzag;

//==================================================================================
// 2. Public API Re-exports
//==================================================================================
pub use cursor::ByteCursor;
