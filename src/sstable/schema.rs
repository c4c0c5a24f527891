// In: src/sstable/schema.rs

//! The schema shared by every stage of a decode session.
//!
//! A `SchemaDescriptor` is produced once from the statistics file and is
//! read-only afterwards. The `SchemaRegistry` wraps it with memoised per-role
//! column counts and positional lookups, and is what the data parser consults
//! for loop bounds and value types. Both are `Send + Sync` and are shared by
//! reference, including across shards.

use serde::Serialize;
use std::sync::Arc;

use crate::error::SstableError;
use crate::types::TypeTag;

/// Cassandra stores `minTimestamp` relative to 2015-09-22T00:00:00Z in microseconds.
pub const TIMESTAMP_EPOCH: i64 = 1_442_880_000_000_000;
/// `minLocalDeletionTime` is relative to the same instant in seconds.
pub const DELETION_TIME_EPOCH: i32 = 1_442_880_000;
pub const TTL_EPOCH: i32 = 0;

/// Local deletion time of a cell or row that never expires.
pub const NO_DELETION_TIME: i32 = i32::MAX;
/// TTL of a cell or row that never expires.
pub const NO_TTL: i32 = 0;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Clustering,
    Static,
    Regular,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub type_tag: TypeTag,
    pub role: ColumnRole,
    pub position: usize,
}

/// The delta-decoding baselines for timestamps, TTLs and local deletion times.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingStats {
    pub min_timestamp: i64,
    pub min_local_deletion_time: i32,
    pub min_ttl: i32,
}

impl EncodingStats {
    /// Timestamps are written as unsigned deltas above `min_timestamp`; the
    /// addition wraps exactly like the writer's subtraction did.
    pub fn timestamp(&self, delta: u64) -> i64 {
        self.min_timestamp.wrapping_add(delta as i64)
    }

    pub fn local_deletion_time(&self, delta: u64) -> i32 {
        self.min_local_deletion_time.wrapping_add(delta as i32)
    }

    pub fn ttl(&self, delta: u64) -> i32 {
        self.min_ttl.wrapping_add(delta as i32)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SchemaDescriptor {
    pub partition_key_type: TypeTag,
    pub encoding: EncodingStats,
    pub clustering_columns: Vec<ColumnDef>,
    pub static_columns: Vec<ColumnDef>,
    pub regular_columns: Vec<ColumnDef>,
}

impl SchemaDescriptor {
    pub fn min_timestamp(&self) -> i64 {
        self.encoding.min_timestamp
    }

    pub fn min_ttl(&self) -> i32 {
        self.encoding.min_ttl
    }

    pub fn min_local_deletion_time(&self) -> i32 {
        self.encoding.min_local_deletion_time
    }

    pub fn columns(&self, role: ColumnRole) -> &[ColumnDef] {
        match role {
            ColumnRole::Clustering => &self.clustering_columns,
            ColumnRole::Static => &self.static_columns,
            ColumnRole::Regular => &self.regular_columns,
        }
    }

    /// All columns in declaration order: clustering, static, regular.
    pub fn all_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.clustering_columns
            .iter()
            .chain(self.static_columns.iter())
            .chain(self.regular_columns.iter())
    }

    /// The name given to the `i`-th clustering column. Statistics headers only
    /// carry clustering types, never their names.
    pub fn clustering_column_name(position: usize) -> String {
        format!("clustering_key_{}", position)
    }
}

//==================================================================================
// Schema Registry
//==================================================================================

#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    descriptor: Arc<SchemaDescriptor>,
    counts: [usize; 3],
}

impl SchemaRegistry {
    pub fn new(descriptor: Arc<SchemaDescriptor>) -> Self {
        let counts = [
            descriptor.clustering_columns.len(),
            descriptor.static_columns.len(),
            descriptor.regular_columns.len(),
        ];
        Self { descriptor, counts }
    }

    pub fn descriptor(&self) -> &Arc<SchemaDescriptor> {
        &self.descriptor
    }

    pub fn encoding(&self) -> &EncodingStats {
        &self.descriptor.encoding
    }

    pub fn column_count(&self, role: ColumnRole) -> usize {
        self.counts[role_slot(role)]
    }

    pub fn total_columns(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn column(&self, role: ColumnRole, position: usize) -> Result<&ColumnDef, SstableError> {
        self.descriptor.columns(role).get(position).ok_or_else(|| {
            SstableError::SchemaMismatch(format!(
                "{:?} column #{} referenced but only {} declared",
                role,
                position,
                self.column_count(role)
            ))
        })
    }

    pub fn type_of(&self, role: ColumnRole, position: usize) -> Result<&TypeTag, SstableError> {
        self.column(role, position).map(|c| &c.type_tag)
    }

    pub fn clustering_types(&self) -> impl Iterator<Item = &TypeTag> {
        self.descriptor.clustering_columns.iter().map(|c| &c.type_tag)
    }
}

fn role_slot(role: ColumnRole) -> usize {
    match role {
        ColumnRole::Clustering => 0,
        ColumnRole::Static => 1,
        ColumnRole::Regular => 2,
    }
}
