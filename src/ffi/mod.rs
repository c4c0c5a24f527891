// In: src/ffi/mod.rs

//! Foreign-function bindings. Only built with the `python` feature.

pub mod python;
