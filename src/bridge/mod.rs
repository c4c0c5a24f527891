// In: src/bridge/mod.rs

// ====================================================================================
// ARCHITECTURAL OVERVIEW: The Bridge Layer
// ====================================================================================
//
// The `bridge` is the public-facing API of the sstable-arrow library. It sits on
// top of the Arrow-agnostic `sstable` decoders and turns their partition stream
// into a columnar table and, from there, into Arrow.
//
// Data Flow:
//
//   1. [Stateful Facade (SstableDecoder)]  -> Receives Statistics.db + DecodeConfig
//         |
//         `-> parses the schema once, fixes the output columns
//
//   2. [decode(data, index?)]             -> Receives Data.db (+ Index.db)
//         |
//         `-> a. one `DataReader` over the file, or one per index shard (rayon)
//         |
//         `-> b. `ColumnarTableBuilder` projects each `Partition` into rows
//         |
//         `-> c. shard tables are concatenated in index order
//
//   3. [ColumnarTable]                    -> `to_record_batch` via `arrow_impl`
//
// The stateless API wraps all three steps in single calls for FFI and the CLI.
// ====================================================================================
pub(crate) mod arrow_impl;
pub mod columnar;
pub mod decoder;
pub mod stateless_api;

// --- High-Level Stateful API ---
pub use decoder::SstableDecoder;

// --- Columnar Output ---
pub use columnar::{ColumnBuffer, ColumnarTable, ColumnarTableBuilder, OutputColumn};

// --- Low-Level Stateless API (for FFI and the CLI) ---
pub use stateless_api::{decode_to_record_batch, decode_to_table, read_schema};

#[cfg(test)]
mod tests;
