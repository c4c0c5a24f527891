// In: src/sstable/data.rs

//! Decoder for the data component (`Data.db`).
//!
//! The data file is a sequence of partitions. Each partition is a header
//! (`u16`-length key, `i32` local deletion time, `i64` marked-for-delete-at)
//! followed by "unfiltered" entries and a terminating end-of-partition flags
//! byte. Every entry starts with a flags byte that selects between a row and a
//! range tombstone marker:
//!
//! ```text
//! row:    [flags][ext flags?][clustering prefix][body size][prev size]
//!         [liveness?][deletion?][column subset?][cells...]
//! marker: [0x02][bound kind][prefix size: u16][clustering prefix]
//!         [body size][prev size][deletion time(s)]
//! ```
//!
//! The `DataReader` is a pull parser: `next_partition` yields partition
//! headers and `next_unfiltered` yields that partition's entries, so a
//! partition is always fully consumed before the next one begins. For eager
//! use, the reader is also an `Iterator` of fully decoded `Partition`s.

use crate::error::SstableError;
use crate::kernels::ByteCursor;
use crate::sstable::schema::{
    ColumnDef, ColumnRole, EncodingStats, SchemaRegistry, NO_DELETION_TIME, NO_TTL,
};
use crate::sstable::unfiltered::{
    BoundKind, Cell, ColumnData, ComplexCell, ComplexColumn, DeletionTime, LivenessInfo,
    MarkerDeletion, Partition, PartitionHeader, RangeTombstoneMarker, Row, Unfiltered,
};
use crate::types::value::{decode_empty_value, decode_value};
use crate::types::{CqlValue, TypeTag};

//==================================================================================
// 0. Flag Constants
//==================================================================================

const END_OF_PARTITION: u8 = 0x01;
const IS_MARKER: u8 = 0x02;
const HAS_TIMESTAMP: u8 = 0x04;
const HAS_TTL: u8 = 0x08;
const HAS_DELETION: u8 = 0x10;
const HAS_COMPLEX_DELETION: u8 = 0x20;
const HAS_ALL_COLUMNS: u8 = 0x40;
const EXTENSION_FLAG: u8 = 0x80;

const IS_STATIC: u8 = 0x01;
const HAS_SHADOWABLE_DELETION: u8 = 0x02;
const KNOWN_EXTENDED_FLAGS: u8 = IS_STATIC | HAS_SHADOWABLE_DELETION;

const CELL_IS_DELETED: u8 = 0x01;
const CELL_IS_EXPIRING: u8 = 0x02;
const CELL_HAS_EMPTY_VALUE: u8 = 0x04;
const CELL_USE_ROW_TIMESTAMP: u8 = 0x08;
const CELL_USE_ROW_TTL: u8 = 0x10;
const KNOWN_CELL_FLAGS: u8 = 0x1F;

/// Clustering prefixes are written in blocks of this many values, each
/// preceded by a header holding two bits (empty, null) per value.
const CLUSTERING_BLOCK: usize = 32;

/// Column subsets of at least this many columns are encoded as index lists
/// instead of a bitmap.
const LARGE_SUBSET_THRESHOLD: usize = 64;

//==================================================================================
// 1. Reader
//==================================================================================

pub struct DataReader<'a> {
    cursor: ByteCursor<'a>,
    registry: &'a SchemaRegistry,
    in_partition: bool,
    entries_in_partition: usize,
    partitions_read: usize,
    /// A whole data file must hold at least one partition; a shard may not.
    require_partition: bool,
    /// The partition count declared by the statistics file, if known.
    expected_partitions: Option<u64>,
    failed: bool,
}

impl<'a> DataReader<'a> {
    /// Creates a reader over a complete data file.
    pub fn new(bytes: &'a [u8], registry: &'a SchemaRegistry) -> Self {
        let mut reader = Self::from_cursor(ByteCursor::new(bytes), registry);
        reader.require_partition = true;
        reader
    }

    /// Creates a reader over the byte range `[start, end)` of a data file.
    /// Offsets reported by the reader stay absolute.
    pub fn for_range(
        bytes: &'a [u8],
        registry: &'a SchemaRegistry,
        start: usize,
        end: usize,
    ) -> Result<Self, SstableError> {
        let mut cursor = ByteCursor::new(bytes);
        cursor.seek(start)?;
        let len = end.checked_sub(start).ok_or_else(|| {
            SstableError::InternalError(format!("shard range {}..{} is reversed", start, end))
        })?;
        let shard = cursor.sub_cursor(len)?;
        Ok(Self::from_cursor(shard, registry))
    }

    pub fn from_cursor(cursor: ByteCursor<'a>, registry: &'a SchemaRegistry) -> Self {
        Self {
            cursor,
            registry,
            in_partition: false,
            entries_in_partition: 0,
            partitions_read: 0,
            require_partition: false,
            expected_partitions: None,
            failed: false,
        }
    }

    /// Requires the data to hold exactly `count` partitions. Running out
    /// earlier is reported as truncation, even at a partition boundary.
    pub fn with_partition_count(mut self, count: Option<u64>) -> Self {
        self.expected_partitions = count;
        self
    }

    /// Absolute offset of the next byte to be decoded.
    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    /// Repositions the reader at a partition boundary, e.g. an offset taken
    /// from the partition index.
    pub fn seek_partition(&mut self, offset: usize) -> Result<(), SstableError> {
        self.cursor.seek(offset)?;
        self.in_partition = false;
        self.entries_in_partition = 0;
        Ok(())
    }

    pub fn partitions_read(&self) -> usize {
        self.partitions_read
    }

    /// Advances to the next partition, draining whatever is left of the
    /// current one. Returns `None` once the data is exhausted.
    pub fn next_partition(&mut self) -> Result<Option<PartitionHeader<'a>>, SstableError> {
        while self.in_partition {
            self.next_unfiltered()?;
        }

        if self.cursor.is_at_end() {
            if self.require_partition && self.partitions_read == 0 {
                // Empty sstables are never written; an empty file was cut short.
                return Err(SstableError::TruncatedInput {
                    offset: self.cursor.position(),
                    needed: 2,
                    remaining: 0,
                });
            }
            match self.expected_partitions {
                Some(expected) if (self.partitions_read as u64) < expected => {
                    return Err(SstableError::TruncatedInput {
                        offset: self.cursor.position(),
                        needed: 2,
                        remaining: 0,
                    });
                }
                Some(expected) if (self.partitions_read as u64) > expected => {
                    return Err(SstableError::SchemaMismatch(format!(
                        "data file holds {} partition(s) but the statistics declare {}",
                        self.partitions_read, expected
                    )));
                }
                _ => {}
            }
            return Ok(None);
        }

        let offset = self.cursor.position() as u64;
        let key = self.cursor.read_short_length_bytes()?;
        let local_deletion_time = self.cursor.read_i32()?;
        let marked_for_delete_at = self.cursor.read_i64()?;
        let deletion = DeletionTime {
            marked_for_delete_at,
            local_deletion_time,
        };

        self.in_partition = true;
        self.entries_in_partition = 0;
        self.partitions_read += 1;
        log_metric!("event"="partition_header", "offset"=&offset, "key_len"=&key.len());

        Ok(Some(PartitionHeader {
            key,
            deletion: (!deletion.is_live()).then_some(deletion),
            offset,
        }))
    }

    /// Decodes the next entry of the current partition. Returns `None` after
    /// the end-of-partition flag, without consuming anything beyond it.
    pub fn next_unfiltered(&mut self) -> Result<Option<Unfiltered<'a>>, SstableError> {
        if !self.in_partition {
            return Ok(None);
        }

        let offset = self.cursor.position();
        let flags = self.cursor.read_u8()?;

        if flags & END_OF_PARTITION != 0 {
            if flags != END_OF_PARTITION {
                return Err(SstableError::malformed_row(
                    offset,
                    format!("end-of-partition flag combined with other flags ({:#04x})", flags),
                ));
            }
            self.in_partition = false;
            return Ok(None);
        }

        let entry = if flags & IS_MARKER != 0 {
            Unfiltered::RangeTombstoneMarker(self.read_marker(flags, offset)?)
        } else {
            let row = self.read_row(flags, offset)?;
            if row.is_static && self.entries_in_partition > 0 {
                return Err(SstableError::malformed_row(
                    offset,
                    "static row must precede every other entry of its partition",
                ));
            }
            Unfiltered::Row(row)
        };
        self.entries_in_partition += 1;
        Ok(Some(entry))
    }

    /// Decodes the next partition in full.
    pub fn read_partition(&mut self) -> Result<Option<Partition<'a>>, SstableError> {
        let header = match self.next_partition()? {
            Some(header) => header,
            None => return Ok(None),
        };

        let mut static_row = None;
        let mut entries = Vec::new();
        while let Some(entry) = self.next_unfiltered()? {
            match entry {
                Unfiltered::Row(row) if row.is_static => static_row = Some(row),
                other => entries.push(other),
            }
        }

        Ok(Some(Partition {
            key: header.key,
            deletion: header.deletion,
            offset: header.offset,
            static_row,
            entries,
        }))
    }

    //==============================================================================
    // Rows
    //==============================================================================

    fn read_row(&mut self, flags: u8, offset: usize) -> Result<Row<'a>, SstableError> {
        let extended = if flags & EXTENSION_FLAG != 0 {
            self.cursor.read_u8()?
        } else {
            0
        };
        if extended & !KNOWN_EXTENDED_FLAGS != 0 {
            return Err(SstableError::malformed_row(
                offset,
                format!("unknown extended row flags {:#04x}", extended),
            ));
        }
        if flags & HAS_TTL != 0 && flags & HAS_TIMESTAMP == 0 {
            return Err(SstableError::malformed_row(offset, "row TTL without a row timestamp"));
        }
        if extended & HAS_SHADOWABLE_DELETION != 0 && flags & HAS_DELETION == 0 {
            return Err(SstableError::malformed_row(
                offset,
                "shadowable deletion flag without a deletion",
            ));
        }

        let is_static = extended & IS_STATIC != 0;
        if is_static && self.registry.column_count(ColumnRole::Static) == 0 {
            return Err(SstableError::SchemaMismatch(format!(
                "static row at offset {} but the schema declares no static columns",
                offset
            )));
        }

        let clustering = if is_static {
            Vec::new()
        } else {
            let count = self.registry.column_count(ColumnRole::Clustering);
            read_clustering_prefix(&mut self.cursor, self.registry, count)?
        };

        let mut body = self.read_body()?;
        let row = read_row_body(&mut body, self.registry, flags, extended, clustering)
            .map_err(|e| overrun_to_malformed(e, offset, "row"))?;
        expect_body_consumed(&body, offset, "row")?;

        log::trace!(
            "row at {}: static={}, clustering={:?}, {} cell(s)",
            offset,
            row.is_static,
            row.clustering,
            row.cells.iter().flatten().count()
        );
        Ok(row)
    }

    //==============================================================================
    // Range tombstone markers
    //==============================================================================

    fn read_marker(&mut self, flags: u8, offset: usize) -> Result<RangeTombstoneMarker, SstableError> {
        if flags != IS_MARKER {
            return Err(SstableError::malformed_row(
                offset,
                format!("range tombstone marker with extra flags ({:#04x})", flags),
            ));
        }

        let ordinal = self.cursor.read_u8()?;
        let bound_kind = BoundKind::from_ordinal(ordinal)
            .filter(|kind| kind.is_marker_kind())
            .ok_or_else(|| {
                SstableError::malformed_row(
                    offset,
                    format!("invalid range tombstone bound kind {}", ordinal),
                )
            })?;

        let size = self.cursor.read_u16()? as usize;
        let declared = self.registry.column_count(ColumnRole::Clustering);
        if size > declared {
            return Err(SstableError::SchemaMismatch(format!(
                "marker at offset {} has a {}-value clustering prefix but {} clustering column(s) are declared",
                offset, size, declared
            )));
        }
        let clustering = read_clustering_prefix(&mut self.cursor, self.registry, size)?;

        let registry = self.registry;
        let mut body = self.read_body()?;
        let deletion = read_marker_body(&mut body, registry.encoding(), bound_kind)
            .map_err(|e| overrun_to_malformed(e, offset, "marker"))?;
        expect_body_consumed(&body, offset, "marker")?;

        log::info!(
            "range tombstone marker {:?} at offset {} (clustering {:?})",
            bound_kind,
            offset,
            clustering
        );
        Ok(RangeTombstoneMarker {
            bound_kind,
            clustering,
            deletion,
        })
    }

    /// Reads the body-size vint and splits off the body as its own cursor. A
    /// body that claims more bytes than remain is a truncated file.
    fn read_body(&mut self) -> Result<ByteCursor<'a>, SstableError> {
        let size = self.cursor.read_vint_length()?;
        self.cursor.sub_cursor(size)
    }
}

impl<'a> Iterator for DataReader<'a> {
    type Item = Result<Partition<'a>, SstableError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_partition() {
            Ok(partition) => partition.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

//==================================================================================
// 2. Body Decoding Helpers
//==================================================================================

/// Inside a size-delimited body, running out of bytes means the declared size
/// was wrong rather than the file being short.
fn overrun_to_malformed(err: SstableError, offset: usize, what: &str) -> SstableError {
    match err {
        SstableError::TruncatedInput { .. } => SstableError::malformed_row(
            offset,
            format!("{} content overruns its declared body size", what),
        ),
        other => other,
    }
}

fn expect_body_consumed(body: &ByteCursor<'_>, offset: usize, what: &str) -> Result<(), SstableError> {
    if body.is_at_end() {
        Ok(())
    } else {
        Err(SstableError::malformed_row(
            offset,
            format!(
                "{} body has {} unread byte(s) after its last field",
                what,
                body.remaining()
            ),
        ))
    }
}

fn read_deletion_time(
    cursor: &mut ByteCursor<'_>,
    encoding: &EncodingStats,
) -> Result<DeletionTime, SstableError> {
    let marked_for_delete_at = encoding.timestamp(cursor.read_unsigned_vint()?);
    let local_deletion_time = encoding.local_deletion_time(cursor.read_unsigned_vint()?);
    Ok(DeletionTime {
        marked_for_delete_at,
        local_deletion_time,
    })
}

fn read_marker_body(
    body: &mut ByteCursor<'_>,
    encoding: &EncodingStats,
    bound_kind: BoundKind,
) -> Result<MarkerDeletion, SstableError> {
    body.read_unsigned_vint()?; // previous entry size
    if bound_kind.is_boundary() {
        let end = read_deletion_time(body, encoding)?;
        let start = read_deletion_time(body, encoding)?;
        Ok(MarkerDeletion::Boundary { end, start })
    } else {
        Ok(MarkerDeletion::Bound(read_deletion_time(body, encoding)?))
    }
}

/// Reads the bytes of one value: raw for fixed-width types, vint-length
/// prefixed otherwise.
fn read_value_bytes<'a>(cursor: &mut ByteCursor<'a>, tag: &TypeTag) -> Result<&'a [u8], SstableError> {
    match tag.fixed_length() {
        Some(width) => cursor.read_bytes(width),
        None => cursor.read_length_prefixed_bytes(),
    }
}

fn decode_non_empty(column: &str, tag: &TypeTag, bytes: &[u8]) -> Result<Option<CqlValue>, SstableError> {
    if bytes.is_empty() {
        Ok(decode_empty_value(tag))
    } else {
        decode_value(column, tag, bytes).map(Some)
    }
}

fn read_clustering_prefix(
    cursor: &mut ByteCursor<'_>,
    registry: &SchemaRegistry,
    size: usize,
) -> Result<Vec<Option<CqlValue>>, SstableError> {
    let mut values = Vec::with_capacity(size);
    let mut header = 0u64;
    for i in 0..size {
        if i % CLUSTERING_BLOCK == 0 {
            header = cursor.read_unsigned_vint()?;
        }
        let shift = 2 * (i % CLUSTERING_BLOCK);
        let is_empty = header & (1 << shift) != 0;
        let is_null = header & (1 << (shift + 1)) != 0;

        let column = registry.column(ColumnRole::Clustering, i)?;
        let value = if is_null {
            None
        } else if is_empty {
            decode_empty_value(&column.type_tag)
        } else {
            let bytes = read_value_bytes(cursor, &column.type_tag)?;
            decode_non_empty(&column.name, &column.type_tag, bytes)?
        };
        values.push(value);
    }
    Ok(values)
}

/// Decodes which columns of a `superset`-column row are present.
///
/// Zero means every column. Below 64 columns the value is a bitmap with a set
/// bit for each *missing* column. Otherwise it is the number of missing
/// columns, followed by the present indices when fewer than half are present,
/// or else by the missing indices.
fn read_column_subset(cursor: &mut ByteCursor<'_>, superset: usize) -> Result<Vec<bool>, SstableError> {
    let offset = cursor.position();
    let encoded = cursor.read_unsigned_vint()?;
    if encoded == 0 {
        return Ok(vec![true; superset]);
    }

    let out_of_range = |what: String| {
        SstableError::SchemaMismatch(format!(
            "column subset at offset {} {} but the row has {} column(s)",
            offset, what, superset
        ))
    };

    if superset < LARGE_SUBSET_THRESHOLD {
        if encoded >> superset != 0 {
            return Err(out_of_range(format!("has bitmap {:#x}", encoded)));
        }
        return Ok((0..superset).map(|i| encoded & (1 << i) == 0).collect());
    }

    let missing = usize::try_from(encoded)
        .ok()
        .filter(|&m| m <= superset)
        .ok_or_else(|| out_of_range(format!("omits {} column(s)", encoded)))?;
    let present_count = superset - missing;

    let read_index = |cursor: &mut ByteCursor<'_>| -> Result<usize, SstableError> {
        let index = cursor.read_vint_length()?;
        if index >= superset {
            return Err(out_of_range(format!("references column #{}", index)));
        }
        Ok(index)
    };

    if present_count < superset / 2 {
        let mut present = vec![false; superset];
        for _ in 0..present_count {
            present[read_index(cursor)?] = true;
        }
        Ok(present)
    } else {
        let mut present = vec![true; superset];
        for _ in 0..missing {
            present[read_index(cursor)?] = false;
        }
        Ok(present)
    }
}

fn read_row_body<'a>(
    body: &mut ByteCursor<'_>,
    registry: &'a SchemaRegistry,
    flags: u8,
    extended: u8,
    clustering: Vec<Option<CqlValue>>,
) -> Result<Row<'a>, SstableError> {
    let encoding = registry.encoding();
    body.read_unsigned_vint()?; // previous entry size

    let mut liveness = LivenessInfo::EMPTY;
    if flags & HAS_TIMESTAMP != 0 {
        liveness.timestamp = Some(encoding.timestamp(body.read_unsigned_vint()?));
        if flags & HAS_TTL != 0 {
            liveness.ttl = encoding.ttl(body.read_unsigned_vint()?);
            liveness.local_expiration_time = encoding.local_deletion_time(body.read_unsigned_vint()?);
        }
    }

    let deletion = if flags & HAS_DELETION != 0 {
        Some(read_deletion_time(body, encoding)?)
    } else {
        None
    };

    let is_static = extended & IS_STATIC != 0;
    let role = if is_static {
        ColumnRole::Static
    } else {
        ColumnRole::Regular
    };
    let superset = registry.column_count(role);
    let present = if flags & HAS_ALL_COLUMNS != 0 {
        vec![true; superset]
    } else {
        read_column_subset(body, superset)?
    };

    let has_complex_deletion = flags & HAS_COMPLEX_DELETION != 0;
    let mut cells = Vec::with_capacity(superset);
    for (position, is_present) in present.into_iter().enumerate() {
        if !is_present {
            cells.push(None);
            continue;
        }
        let column = registry.column(role, position)?;
        let data = if column.type_tag.is_complex() {
            ColumnData::Complex(read_complex_column(body, column, &liveness, encoding, has_complex_deletion)?)
        } else {
            ColumnData::Simple(read_simple_cell(body, column, &liveness, encoding)?)
        };
        cells.push(Some(data));
    }

    Ok(Row {
        is_static,
        clustering,
        liveness,
        deletion,
        shadowable_deletion: extended & HAS_SHADOWABLE_DELETION != 0,
        cells,
    })
}

//==================================================================================
// 3. Cells
//==================================================================================

/// The fields shared by simple and complex cells.
struct CellHeader<'b> {
    is_live: bool,
    timestamp: i64,
    local_deletion_time: i32,
    ttl: i32,
    path: Option<&'b [u8]>,
    value: Option<&'b [u8]>,
}

fn read_cell_header<'b>(
    cursor: &mut ByteCursor<'b>,
    value_type: &TypeTag,
    liveness: &LivenessInfo,
    encoding: &EncodingStats,
    has_path: bool,
) -> Result<CellHeader<'b>, SstableError> {
    let offset = cursor.position();
    let flags = cursor.read_u8()?;
    let malformed = |reason: &str| SstableError::malformed_row(offset, format!("cell: {}", reason));

    if flags & !KNOWN_CELL_FLAGS != 0 {
        return Err(malformed(&format!("unknown flags {:#04x}", flags)));
    }
    let is_deleted = flags & CELL_IS_DELETED != 0;
    let is_expiring = flags & CELL_IS_EXPIRING != 0;
    let use_row_timestamp = flags & CELL_USE_ROW_TIMESTAMP != 0;
    let use_row_ttl = flags & CELL_USE_ROW_TTL != 0;

    if is_deleted && is_expiring {
        return Err(malformed("both deleted and expiring"));
    }
    if use_row_ttl && !(is_expiring && liveness.is_expiring()) {
        return Err(malformed("uses the row TTL but the row or cell does not expire"));
    }

    let timestamp = if use_row_timestamp {
        liveness
            .timestamp
            .ok_or_else(|| malformed("uses the row timestamp but the row has none"))?
    } else {
        encoding.timestamp(cursor.read_unsigned_vint()?)
    };

    let (local_deletion_time, ttl) = if use_row_ttl {
        (liveness.local_expiration_time, liveness.ttl)
    } else {
        let local_deletion_time = if is_deleted || is_expiring {
            encoding.local_deletion_time(cursor.read_unsigned_vint()?)
        } else {
            NO_DELETION_TIME
        };
        let ttl = if is_expiring {
            encoding.ttl(cursor.read_unsigned_vint()?)
        } else {
            NO_TTL
        };
        (local_deletion_time, ttl)
    };

    let path = if has_path {
        Some(cursor.read_length_prefixed_bytes()?)
    } else {
        None
    };
    let value = if flags & CELL_HAS_EMPTY_VALUE != 0 {
        None
    } else {
        Some(read_value_bytes(cursor, value_type)?)
    };

    Ok(CellHeader {
        is_live: !is_deleted,
        timestamp,
        local_deletion_time,
        ttl,
        path,
        value,
    })
}

fn read_simple_cell<'a>(
    cursor: &mut ByteCursor<'_>,
    column: &'a ColumnDef,
    liveness: &LivenessInfo,
    encoding: &EncodingStats,
) -> Result<Cell<'a>, SstableError> {
    let header = read_cell_header(cursor, &column.type_tag, liveness, encoding, false)?;
    let value = match header.value {
        _ if !header.is_live => None,
        Some(bytes) => decode_non_empty(&column.name, &column.type_tag, bytes)?,
        None => decode_empty_value(&column.type_tag),
    };
    Ok(Cell {
        column,
        is_live: header.is_live,
        timestamp: header.timestamp,
        local_deletion_time: header.local_deletion_time,
        ttl: header.ttl,
        value,
    })
}

fn read_complex_column<'a>(
    cursor: &mut ByteCursor<'_>,
    column: &'a ColumnDef,
    liveness: &LivenessInfo,
    encoding: &EncodingStats,
    has_complex_deletion: bool,
) -> Result<ComplexColumn<'a>, SstableError> {
    let (path_type, value_type) = column.type_tag.element_types().ok_or_else(|| {
        SstableError::InternalError(format!("column {} is not a collection", column.name))
    })?;

    let deletion = if has_complex_deletion {
        Some(read_deletion_time(cursor, encoding)?).filter(|d| !d.is_live())
    } else {
        None
    };

    let count = cursor.read_vint_length()?;
    let mut cells = Vec::with_capacity(count.min(cursor.remaining()));
    for _ in 0..count {
        let header = read_cell_header(cursor, value_type, liveness, encoding, true)?;
        let path_bytes = header.path.unwrap_or_default();
        let path = decode_non_empty(&column.name, path_type, path_bytes)?.ok_or_else(|| {
            SstableError::coercion(&column.name, "collection element has an empty path")
        })?;
        let value = match header.value {
            _ if !header.is_live => None,
            Some(bytes) => decode_non_empty(&column.name, value_type, bytes)?,
            None => decode_empty_value(value_type),
        };
        cells.push(ComplexCell {
            path,
            is_live: header.is_live,
            timestamp: header.timestamp,
            local_deletion_time: header.local_deletion_time,
            ttl: header.ttl,
            value,
        });
    }

    Ok(ComplexColumn {
        column,
        deletion,
        cells,
    })
}
