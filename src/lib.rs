//! This file is the root of the `sstable_arrow` Rust crate.
//!
//! Its responsibilities are strictly limited to:
//! 1.  Declaring all the top-level modules of our library (`sstable`, `bridge`, etc.)
//!     so the Rust compiler knows they exist.
//! 2.  Defining the `#[pymodule]` which acts as the main entry point when the
//!     compiled library is imported into Python (`python` feature only).

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
//==================================================================================
// 1. Module Declarations
//==================================================================================
#[macro_use]
mod observability; // Make macros available throughout the crate

pub mod bridge;
pub mod config;
pub mod error;
pub mod kernels;
pub mod sstable;
pub mod traits;
pub mod types;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

#[cfg(feature = "python")]
mod ffi;

pub use bridge::{decode_to_record_batch, decode_to_table, ColumnarTable, SstableDecoder};
pub use config::{DecodeConfig, TombstoneMode};
pub use error::SstableError;

//==================================================================================
// 2. Python Module Definition
//==================================================================================
#[cfg(feature = "python")]
use pyo3::prelude::*;

/// The `sstable_arrow` Python module, containing all exposed Rust functions.
#[cfg(feature = "python")]
#[pymodule]
fn sstable_arrow(py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(ffi::python::decode_sstable_py, m)?)?;
    m.add_function(wrap_pyfunction!(ffi::python::read_schema_json_py, m)?)?;

    // --- Expose the custom error type ---
    m.add(
        "SstableError",
        py.get_type::<pyo3::exceptions::PyValueError>(),
    )?;

    // --- Expose version string as a module attribute ---
    m.add("__version__", VERSION)?;

    // --- Turn on the structure dump ---
    m.add_function(wrap_pyfunction!(ffi::python::enable_verbose_logging_py, m)?)?;

    Ok(())
}
