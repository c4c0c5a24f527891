// In: src/sstable/mod.rs

// ====================================================================================
// ARCHITECTURAL OVERVIEW: The SSTable Decoders
// ====================================================================================
//
// One hand-written decoder per on-disk component, all built on `ByteCursor`:
//
//   1. [statistics]  Statistics.db -> `StatisticsFile` (TOC + `SchemaDescriptor`)
//         |
//         `-> wrapped once in a `SchemaRegistry` (counts + positional lookups)
//
//   2. [index]       Index.db -> `IndexEntry` stream (key, data offset)
//
//   3. [data]        Data.db + &SchemaRegistry -> `Partition` stream of
//                    `Unfiltered::{Row, RangeTombstoneMarker}`
//
// The two files must come from the same sstable generation: every delta in the
// data file is relative to the baselines in the statistics header.
// ====================================================================================
pub mod data;
pub mod index;
pub mod schema;
pub mod statistics;
pub mod unfiltered;

pub use data::DataReader;
pub use index::{IndexEntry, IndexReader};
pub use schema::{ColumnDef, ColumnRole, SchemaDescriptor, SchemaRegistry};
pub use statistics::{parse_statistics, StatisticsFile};
pub use unfiltered::{Partition, Row, Unfiltered};
