// In: src/sstable/statistics.rs

//! Decoder for the statistics component (`Statistics.db`).
//!
//! The file starts with a table of contents:
//!
//! ```text
//! [count: u32] ([type: u32][offset: u32]) * count
//! ```
//!
//! followed by the components it addresses. Only the serialization header
//! (type 3) is required to decode the data file; the validation component is
//! decoded when present because it names the partitioner. Of the stats
//! component only the leading partition-size histogram is read: its bucket
//! counts sum to the number of partitions in the data file. The compaction
//! component is located but not decoded.

use serde::Serialize;
use std::sync::Arc;

use crate::error::SstableError;
use crate::kernels::ByteCursor;
use crate::sstable::schema::{
    ColumnDef, ColumnRole, EncodingStats, SchemaDescriptor, DELETION_TIME_EPOCH, TIMESTAMP_EPOCH,
    TTL_EPOCH,
};
use crate::types::TypeTag;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MetadataType {
    Validation,
    Compaction,
    Stats,
    Header,
}

impl MetadataType {
    fn from_ordinal(ordinal: u32) -> Option<Self> {
        match ordinal {
            0 => Some(MetadataType::Validation),
            1 => Some(MetadataType::Compaction),
            2 => Some(MetadataType::Stats),
            3 => Some(MetadataType::Header),
            _ => None,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub kind: MetadataType,
    pub offset: u32,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ValidationMetadata {
    pub partitioner: String,
    pub bloom_filter_fp_chance: f64,
}

/// Everything decoded from a statistics file.
#[derive(Serialize, Debug, Clone)]
pub struct StatisticsFile {
    pub toc: Vec<TocEntry>,
    pub validation: Option<ValidationMetadata>,
    /// Partitions written to the data file, when a stats component is present.
    pub partition_count: Option<u64>,
    pub schema: Arc<SchemaDescriptor>,
}

//==================================================================================
// 1. Public API
//==================================================================================

/// Decodes a complete statistics file.
pub fn parse_statistics(bytes: &[u8]) -> Result<StatisticsFile, SstableError> {
    let mut cursor = ByteCursor::new(bytes);
    let toc = read_toc(&mut cursor)?;

    let offset_of = |kind: MetadataType| toc.iter().find(|e| e.kind == kind).map(|e| e.offset);

    let header_offset = offset_of(MetadataType::Header).ok_or_else(|| {
        SstableError::UnknownSection("serialization header (type 3) is absent".to_string())
    })?;
    cursor.seek(header_offset as usize)?;
    let schema = read_serialization_header(&mut cursor)?;

    let validation = match offset_of(MetadataType::Validation) {
        Some(offset) => {
            cursor.seek(offset as usize)?;
            Some(read_validation(&mut cursor)?)
        }
        None => None,
    };

    let partition_count = match offset_of(MetadataType::Stats) {
        Some(offset) => {
            cursor.seek(offset as usize)?;
            Some(read_partition_count(&mut cursor)?)
        }
        None => None,
    };

    log::info!("partition key type: {}", schema.partition_key_type);
    log::info!(
        "min ttl: {}, min timestamp: {}, min local deletion time: {}",
        schema.min_ttl(),
        schema.min_timestamp(),
        schema.min_local_deletion_time()
    );
    for (role, columns) in [
        ("clustering", &schema.clustering_columns),
        ("static", &schema.static_columns),
        ("regular", &schema.regular_columns),
    ] {
        log::info!("=== {} columns ({}) ===", role, columns.len());
        for column in columns {
            log::info!("  {}: {}", column.name, column.type_tag);
        }
    }

    if let Some(count) = partition_count {
        log::info!("partitions: {}", count);
    }

    Ok(StatisticsFile {
        toc,
        validation,
        partition_count,
        schema: Arc::new(schema),
    })
}

//==================================================================================
// 2. Component Decoders
//==================================================================================

fn read_toc(cursor: &mut ByteCursor<'_>) -> Result<Vec<TocEntry>, SstableError> {
    let count = cursor.read_u32()? as usize;
    // Each entry is 8 bytes; refuse counts the buffer cannot possibly hold.
    if count.saturating_mul(8) > cursor.remaining() {
        return Err(SstableError::TruncatedInput {
            offset: cursor.position(),
            needed: count.saturating_mul(8),
            remaining: cursor.remaining(),
        });
    }

    let mut toc = Vec::with_capacity(count);
    for _ in 0..count {
        let ordinal = cursor.read_u32()?;
        let offset = cursor.read_u32()?;
        match MetadataType::from_ordinal(ordinal) {
            Some(kind) => toc.push(TocEntry { kind, offset }),
            None => log::warn!("skipping unknown statistics component type {}", ordinal),
        }
    }
    Ok(toc)
}

fn read_validation(cursor: &mut ByteCursor<'_>) -> Result<ValidationMetadata, SstableError> {
    let partitioner = cursor.read_short_length_text()?.to_string();
    let bloom_filter_fp_chance = cursor.read_f64()?;
    Ok(ValidationMetadata {
        partitioner,
        bloom_filter_fp_chance,
    })
}

/// Sums the estimated partition-size histogram: an `i32` bucket count, then
/// `(i64 offset, i64 count)` per bucket.
fn read_partition_count(cursor: &mut ByteCursor<'_>) -> Result<u64, SstableError> {
    let buckets = cursor.read_i32()?;
    let buckets = usize::try_from(buckets).map_err(|_| {
        SstableError::UnknownSection(format!("partition size histogram has {} buckets", buckets))
    })?;
    if buckets.saturating_mul(16) > cursor.remaining() {
        return Err(SstableError::TruncatedInput {
            offset: cursor.position(),
            needed: buckets.saturating_mul(16),
            remaining: cursor.remaining(),
        });
    }

    let mut total = 0u64;
    for _ in 0..buckets {
        cursor.read_i64()?; // bucket offset
        let count = cursor.read_i64()?;
        let count = u64::try_from(count).map_err(|_| {
            SstableError::UnknownSection(format!("partition size histogram bucket holds {}", count))
        })?;
        total = total.saturating_add(count);
    }
    Ok(total)
}

fn read_type(cursor: &mut ByteCursor<'_>) -> Result<TypeTag, SstableError> {
    TypeTag::from_type_name(cursor.read_length_prefixed_text()?)
}

fn read_named_columns(
    cursor: &mut ByteCursor<'_>,
    role: ColumnRole,
) -> Result<Vec<ColumnDef>, SstableError> {
    let count = cursor.read_vint_length()?;
    let mut columns = Vec::with_capacity(count.min(cursor.remaining()));
    for position in 0..count {
        let name = cursor.read_length_prefixed_text()?.to_string();
        let type_tag = read_type(cursor)?;
        columns.push(ColumnDef {
            name,
            type_tag,
            role,
            position,
        });
    }
    Ok(columns)
}

fn read_serialization_header(cursor: &mut ByteCursor<'_>) -> Result<SchemaDescriptor, SstableError> {
    let min_timestamp = (cursor.read_unsigned_vint()? as i64).wrapping_add(TIMESTAMP_EPOCH);
    let min_local_deletion_time =
        (cursor.read_unsigned_vint()? as i32).wrapping_add(DELETION_TIME_EPOCH);
    let min_ttl = (cursor.read_unsigned_vint()? as i32).wrapping_add(TTL_EPOCH);

    let partition_key_type = read_type(cursor)?;

    let clustering_count = cursor.read_vint_length()?;
    let mut clustering_columns = Vec::with_capacity(clustering_count.min(cursor.remaining()));
    for position in 0..clustering_count {
        let type_tag = read_type(cursor)?;
        if type_tag.is_complex() {
            return Err(SstableError::UnsupportedType(format!(
                "non-frozen collection {} cannot be a clustering column",
                type_tag
            )));
        }
        clustering_columns.push(ColumnDef {
            name: SchemaDescriptor::clustering_column_name(position),
            type_tag,
            role: ColumnRole::Clustering,
            position,
        });
    }

    let static_columns = read_named_columns(cursor, ColumnRole::Static)?;
    let regular_columns = read_named_columns(cursor, ColumnRole::Regular)?;

    Ok(SchemaDescriptor {
        partition_key_type,
        encoding: EncodingStats {
            min_timestamp,
            min_local_deletion_time,
            min_ttl,
        },
        clustering_columns,
        static_columns,
        regular_columns,
    })
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
