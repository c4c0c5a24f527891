// In: src/fixtures.rs

//! Byte-image writers for statistics, index and data components.
//!
//! These produce exactly the layouts the decoders read and exist so that
//! tests and benchmarks can describe an SSTable declaratively instead of
//! shipping binary files. Values are supplied as raw serialized bytes; the
//! helpers at the bottom cover the common primitive types.

use std::sync::Arc;

use crate::kernels::vint;
use crate::sstable::schema::{
    SchemaDescriptor, DELETION_TIME_EPOCH, NO_DELETION_TIME, TIMESTAMP_EPOCH, TTL_EPOCH,
};
use crate::sstable::unfiltered::BoundKind;
use crate::types::TypeTag;

pub const MARSHAL_PACKAGE: &str = "org.apache.cassandra.db.marshal.";
pub const DEFAULT_PARTITIONER: &str = "org.apache.cassandra.dht.Murmur3Partitioner";

/// The fully-qualified marshal type name of `class`.
pub fn marshal(class: &str) -> String {
    format!("{}{}", MARSHAL_PACKAGE, class)
}

fn put_vint_text(buf: &mut Vec<u8>, text: &str) {
    vint::encode_unsigned(text.len() as u64, buf);
    buf.extend_from_slice(text.as_bytes());
}

fn put_vint_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    vint::encode_unsigned(bytes.len() as u64, buf);
    buf.extend_from_slice(bytes);
}

fn delta64(value: i64, base: i64) -> u64 {
    value.wrapping_sub(base) as u64
}

fn delta32(value: i32, base: i32) -> u64 {
    value.wrapping_sub(base) as i64 as u64
}

//==================================================================================
// 1. Statistics
//==================================================================================

#[derive(Debug, Clone)]
pub struct StatisticsFixture {
    partition_key_type: String,
    min_timestamp: i64,
    min_local_deletion_time: i32,
    min_ttl: i32,
    clustering: Vec<String>,
    static_columns: Vec<(String, String)>,
    regular_columns: Vec<(String, String)>,
    partition_count: Option<u64>,
    include_header: bool,
}

impl StatisticsFixture {
    pub fn new(partition_key_type: impl Into<String>) -> Self {
        Self {
            partition_key_type: partition_key_type.into(),
            min_timestamp: TIMESTAMP_EPOCH,
            min_local_deletion_time: DELETION_TIME_EPOCH,
            min_ttl: TTL_EPOCH,
            clustering: Vec::new(),
            static_columns: Vec::new(),
            regular_columns: Vec::new(),
            partition_count: None,
            include_header: true,
        }
    }

    pub fn min_timestamp(mut self, value: i64) -> Self {
        self.min_timestamp = value;
        self
    }

    pub fn min_local_deletion_time(mut self, value: i32) -> Self {
        self.min_local_deletion_time = value;
        self
    }

    pub fn min_ttl(mut self, value: i32) -> Self {
        self.min_ttl = value;
        self
    }

    pub fn clustering(mut self, type_name: impl Into<String>) -> Self {
        self.clustering.push(type_name.into());
        self
    }

    pub fn static_column(mut self, name: &str, type_name: impl Into<String>) -> Self {
        self.static_columns.push((name.to_string(), type_name.into()));
        self
    }

    pub fn regular_column(mut self, name: &str, type_name: impl Into<String>) -> Self {
        self.regular_columns.push((name.to_string(), type_name.into()));
        self
    }

    /// Writes a stats component whose partition-size histogram holds `count`
    /// partitions. Without it the stats component is left out.
    pub fn partition_count(mut self, count: u64) -> Self {
        self.partition_count = Some(count);
        self
    }

    pub fn without_header(mut self) -> Self {
        self.include_header = false;
        self
    }

    fn header_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        vint::encode_unsigned(delta64(self.min_timestamp, TIMESTAMP_EPOCH), &mut buf);
        vint::encode_unsigned(
            delta32(self.min_local_deletion_time, DELETION_TIME_EPOCH),
            &mut buf,
        );
        vint::encode_unsigned(delta32(self.min_ttl, TTL_EPOCH), &mut buf);
        put_vint_text(&mut buf, &self.partition_key_type);

        vint::encode_unsigned(self.clustering.len() as u64, &mut buf);
        for type_name in &self.clustering {
            put_vint_text(&mut buf, type_name);
        }
        for columns in [&self.static_columns, &self.regular_columns] {
            vint::encode_unsigned(columns.len() as u64, &mut buf);
            for (name, type_name) in columns {
                put_vint_text(&mut buf, name);
                put_vint_text(&mut buf, type_name);
            }
        }
        buf
    }

    /// The partition-size histogram, split over two buckets.
    fn stats_bytes(count: u64) -> Vec<u8> {
        let mut buf = 2i32.to_be_bytes().to_vec();
        for (offset, partitions) in [(0u64, count / 2), (1u64, count - count / 2)] {
            buf.extend_from_slice(&offset.to_be_bytes());
            buf.extend_from_slice(&partitions.to_be_bytes());
        }
        buf
    }

    /// Lays out the table of contents followed by the validation,
    /// compaction, optional stats and optional serialization header components.
    pub fn build(&self) -> Vec<u8> {
        let mut validation = Vec::new();
        validation.extend_from_slice(&(DEFAULT_PARTITIONER.len() as u16).to_be_bytes());
        validation.extend_from_slice(DEFAULT_PARTITIONER.as_bytes());
        validation.extend_from_slice(&0.01f64.to_be_bytes());

        let mut components: Vec<(u32, Vec<u8>)> = vec![(0, validation), (1, vec![0u8; 4])];
        if let Some(count) = self.partition_count {
            components.push((2, Self::stats_bytes(count)));
        }
        if self.include_header {
            components.push((3, self.header_bytes()));
        }

        let mut buf = Vec::new();
        buf.extend_from_slice(&(components.len() as u32).to_be_bytes());
        let mut offset = 4 + 8 * components.len();
        for (kind, bytes) in &components {
            buf.extend_from_slice(&kind.to_be_bytes());
            buf.extend_from_slice(&(offset as u32).to_be_bytes());
            offset += bytes.len();
        }
        for (_, bytes) in components {
            buf.extend(bytes);
        }
        buf
    }
}

//==================================================================================
// 2. Rows, Cells & Markers
//==================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct CellFixture {
    /// `None` reuses the row timestamp.
    timestamp: Option<i64>,
    deleted: bool,
    /// (ttl, local expiration time)
    expiring: Option<(i32, i32)>,
    local_deletion_time: i32,
    path: Option<Vec<u8>>,
    /// `None` writes an empty value.
    value: Option<Vec<u8>>,
}

impl CellFixture {
    pub fn live(value: impl Into<Vec<u8>>) -> Self {
        Self {
            timestamp: None,
            deleted: false,
            expiring: None,
            local_deletion_time: NO_DELETION_TIME,
            path: None,
            value: Some(value.into()),
        }
    }

    pub fn empty() -> Self {
        Self {
            value: None,
            ..Self::live(Vec::<u8>::new())
        }
    }

    pub fn tombstone(timestamp: i64, local_deletion_time: i32) -> Self {
        Self {
            timestamp: Some(timestamp),
            deleted: true,
            local_deletion_time,
            value: None,
            ..Self::live(Vec::<u8>::new())
        }
    }

    /// A non-frozen collection element.
    pub fn element(path: impl Into<Vec<u8>>, value: Option<Vec<u8>>) -> Self {
        Self {
            path: Some(path.into()),
            value,
            ..Self::live(Vec::<u8>::new())
        }
    }

    pub fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn expiring(mut self, ttl: i32, local_expiration_time: i32) -> Self {
        self.expiring = Some((ttl, local_expiration_time));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnFixture {
    Absent,
    Simple(CellFixture),
    Complex {
        deletion: Option<(i64, i32)>,
        cells: Vec<CellFixture>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowFixture {
    is_static: bool,
    clustering: Vec<Option<Vec<u8>>>,
    timestamp: Option<i64>,
    ttl: Option<(i32, i32)>,
    deletion: Option<(i64, i32)>,
    columns: Vec<ColumnFixture>,
}

impl RowFixture {
    /// A regular row; `None` clustering values are written as null.
    pub fn regular(clustering: Vec<Option<Vec<u8>>>) -> Self {
        Self {
            is_static: false,
            clustering,
            timestamp: None,
            ttl: None,
            deletion: None,
            columns: Vec::new(),
        }
    }

    pub fn static_row() -> Self {
        Self {
            is_static: true,
            ..Self::regular(Vec::new())
        }
    }

    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn ttl(mut self, ttl: i32, local_expiration_time: i32) -> Self {
        self.ttl = Some((ttl, local_expiration_time));
        self
    }

    pub fn deletion(mut self, marked_for_delete_at: i64, local_deletion_time: i32) -> Self {
        self.deletion = Some((marked_for_delete_at, local_deletion_time));
        self
    }

    pub fn cell(mut self, cell: CellFixture) -> Self {
        self.columns.push(ColumnFixture::Simple(cell));
        self
    }

    pub fn absent(mut self) -> Self {
        self.columns.push(ColumnFixture::Absent);
        self
    }

    pub fn complex(mut self, deletion: Option<(i64, i32)>, cells: Vec<CellFixture>) -> Self {
        self.columns.push(ColumnFixture::Complex { deletion, cells });
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerFixture {
    kind: BoundKind,
    clustering: Vec<Option<Vec<u8>>>,
    deletions: Vec<(i64, i32)>,
}

impl MarkerFixture {
    pub fn bound(
        kind: BoundKind,
        clustering: Vec<Option<Vec<u8>>>,
        marked_for_delete_at: i64,
        local_deletion_time: i32,
    ) -> Self {
        Self {
            kind,
            clustering,
            deletions: vec![(marked_for_delete_at, local_deletion_time)],
        }
    }

    pub fn boundary(
        kind: BoundKind,
        clustering: Vec<Option<Vec<u8>>>,
        end: (i64, i32),
        start: (i64, i32),
    ) -> Self {
        Self {
            kind,
            clustering,
            deletions: vec![end, start],
        }
    }
}

//==================================================================================
// 3. Data & Index
//==================================================================================

/// Appends partitions to a data file image and records where each begins.
#[derive(Debug, Clone)]
pub struct DataFixture {
    schema: Arc<SchemaDescriptor>,
    buf: Vec<u8>,
    partitions: Vec<(Vec<u8>, u64)>,
    previous_size: u64,
}

impl DataFixture {
    pub fn new(schema: Arc<SchemaDescriptor>) -> Self {
        Self {
            schema,
            buf: Vec::new(),
            partitions: Vec::new(),
            previous_size: 0,
        }
    }

    pub fn partition(&mut self, key: &[u8]) -> &mut Self {
        self.partition_with_deletion(key, i64::MIN, i32::MAX)
    }

    pub fn deleted_partition(
        &mut self,
        key: &[u8],
        marked_for_delete_at: i64,
        local_deletion_time: i32,
    ) -> &mut Self {
        self.partition_with_deletion(key, marked_for_delete_at, local_deletion_time)
    }

    fn partition_with_deletion(&mut self, key: &[u8], at: i64, ldt: i32) -> &mut Self {
        self.partitions.push((key.to_vec(), self.buf.len() as u64));
        self.buf.extend_from_slice(&(key.len() as u16).to_be_bytes());
        self.buf.extend_from_slice(key);
        self.buf.extend_from_slice(&ldt.to_be_bytes());
        self.buf.extend_from_slice(&at.to_be_bytes());
        self.previous_size = 0;
        self
    }

    pub fn end_partition(&mut self) -> &mut Self {
        self.buf.push(0x01);
        self
    }

    /// Appends arbitrary bytes, for malformed input.
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn finish(&self) -> Vec<u8> {
        self.buf.clone()
    }

    /// Offsets of every partition written so far, in write order.
    pub fn partition_offsets(&self) -> Vec<u64> {
        self.partitions.iter().map(|(_, offset)| *offset).collect()
    }

    /// The index file addressing every partition written so far.
    pub fn index(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for (key, offset) in &self.partitions {
            write_index_entry(&mut buf, key, *offset, &[]);
        }
        buf
    }

    fn put_timestamp(&self, buf: &mut Vec<u8>, timestamp: i64) {
        vint::encode_unsigned(delta64(timestamp, self.schema.min_timestamp()), buf);
    }

    fn put_local_deletion_time(&self, buf: &mut Vec<u8>, ldt: i32) {
        vint::encode_unsigned(delta32(ldt, self.schema.min_local_deletion_time()), buf);
    }

    fn put_ttl(&self, buf: &mut Vec<u8>, ttl: i32) {
        vint::encode_unsigned(delta32(ttl, self.schema.min_ttl()), buf);
    }

    fn put_deletion(&self, buf: &mut Vec<u8>, (at, ldt): (i64, i32)) {
        self.put_timestamp(buf, at);
        self.put_local_deletion_time(buf, ldt);
    }

    fn put_clustering(&self, buf: &mut Vec<u8>, values: &[Option<Vec<u8>>]) {
        for (block, chunk) in values.chunks(32).enumerate() {
            let mut header = 0u64;
            for (i, value) in chunk.iter().enumerate() {
                match value {
                    None => header |= 1 << (2 * i + 1),
                    Some(v) if v.is_empty() => header |= 1 << (2 * i),
                    Some(_) => {}
                }
            }
            vint::encode_unsigned(header, buf);
            for (i, value) in chunk.iter().enumerate() {
                if let Some(v) = value.as_ref().filter(|v| !v.is_empty()) {
                    let tag = self
                        .schema
                        .clustering_columns
                        .get(block * 32 + i)
                        .map(|c| &c.type_tag);
                    put_value(buf, tag, v);
                }
            }
        }
    }

    fn put_cell(
        &self,
        buf: &mut Vec<u8>,
        cell: &CellFixture,
        value_type: Option<&TypeTag>,
        row: &RowFixture,
    ) {
        let use_row_timestamp = cell.timestamp.is_none() && row.timestamp.is_some();
        let inherits_ttl = !cell.deleted && cell.expiring.is_none() && row.ttl.is_some();
        let is_expiring = cell.expiring.is_some() || inherits_ttl;

        let mut flags = 0u8;
        if cell.deleted {
            flags |= 0x01;
        }
        if is_expiring {
            flags |= 0x02;
        }
        if cell.value.is_none() {
            flags |= 0x04;
        }
        if use_row_timestamp {
            flags |= 0x08;
        }
        if inherits_ttl {
            flags |= 0x10;
        }
        buf.push(flags);

        if !use_row_timestamp {
            self.put_timestamp(buf, cell.timestamp.unwrap_or(0));
        }
        if let Some((ttl, ldt)) = cell.expiring {
            self.put_local_deletion_time(buf, ldt);
            self.put_ttl(buf, ttl);
        } else if cell.deleted {
            self.put_local_deletion_time(buf, cell.local_deletion_time);
        }
        if let Some(path) = &cell.path {
            put_vint_bytes(buf, path);
        }
        if let Some(value) = &cell.value {
            put_value(buf, value_type, value);
        }
    }

    pub fn row(&mut self, row: RowFixture) -> &mut Self {
        let columns = if row.is_static {
            &self.schema.static_columns
        } else {
            &self.schema.regular_columns
        };
        let superset = columns.len();
        let present: Vec<bool> = (0..superset)
            .map(|i| !matches!(row.columns.get(i), None | Some(ColumnFixture::Absent)))
            .collect();
        let all_present = present.iter().all(|&p| p);
        let has_complex_deletion = row
            .columns
            .iter()
            .any(|c| matches!(c, ColumnFixture::Complex { deletion: Some(_), .. }));

        let mut flags = 0u8;
        if row.timestamp.is_some() {
            flags |= 0x04;
        }
        if row.ttl.is_some() {
            flags |= 0x08;
        }
        if row.deletion.is_some() {
            flags |= 0x10;
        }
        if has_complex_deletion {
            flags |= 0x20;
        }
        if all_present {
            flags |= 0x40;
        }
        if row.is_static {
            flags |= 0x80;
        }

        let mut body = Vec::new();
        vint::encode_unsigned(self.previous_size, &mut body);
        if let Some(timestamp) = row.timestamp {
            self.put_timestamp(&mut body, timestamp);
            if let Some((ttl, ldt)) = row.ttl {
                self.put_ttl(&mut body, ttl);
                self.put_local_deletion_time(&mut body, ldt);
            }
        }
        if let Some(deletion) = row.deletion {
            self.put_deletion(&mut body, deletion);
        }
        if !all_present {
            put_column_subset(&mut body, &present);
        }
        for (column, data) in columns.iter().zip(row.columns.iter()) {
            match data {
                ColumnFixture::Absent => {}
                ColumnFixture::Simple(cell) => {
                    self.put_cell(&mut body, cell, Some(&column.type_tag), &row)
                }
                ColumnFixture::Complex { deletion, cells } => {
                    if has_complex_deletion {
                        self.put_deletion(&mut body, deletion.unwrap_or((i64::MIN, i32::MAX)));
                    }
                    vint::encode_unsigned(cells.len() as u64, &mut body);
                    let value_type = column.type_tag.element_types().map(|(_, v)| v);
                    for cell in cells {
                        self.put_cell(&mut body, cell, value_type, &row);
                    }
                }
            }
        }

        let start = self.buf.len();
        self.buf.push(flags);
        if row.is_static {
            self.buf.push(0x01);
        }
        if !row.is_static {
            let mut prefix = Vec::new();
            self.put_clustering(&mut prefix, &row.clustering);
            self.buf.extend(prefix);
        }
        put_vint_bytes(&mut self.buf, &body);
        self.previous_size = (self.buf.len() - start) as u64;
        self
    }

    pub fn marker(&mut self, marker: MarkerFixture) -> &mut Self {
        let mut body = Vec::new();
        vint::encode_unsigned(self.previous_size, &mut body);
        for deletion in &marker.deletions {
            self.put_deletion(&mut body, *deletion);
        }

        let start = self.buf.len();
        self.buf.push(0x02);
        self.buf.push(marker.kind.ordinal());
        self.buf
            .extend_from_slice(&(marker.clustering.len() as u16).to_be_bytes());
        let mut prefix = Vec::new();
        self.put_clustering(&mut prefix, &marker.clustering);
        self.buf.extend(prefix);
        put_vint_bytes(&mut self.buf, &body);
        self.previous_size = (self.buf.len() - start) as u64;
        self
    }
}

/// Writes a value raw when its type is fixed-width, vint-length prefixed otherwise.
fn put_value(buf: &mut Vec<u8>, tag: Option<&TypeTag>, value: &[u8]) {
    match tag.and_then(TypeTag::fixed_length) {
        Some(_) => buf.extend_from_slice(value),
        None => put_vint_bytes(buf, value),
    }
}

fn put_column_subset(buf: &mut Vec<u8>, present: &[bool]) {
    let superset = present.len();
    let missing: Vec<usize> = (0..superset).filter(|&i| !present[i]).collect();
    if superset < 64 {
        let bitmap = missing.iter().fold(0u64, |acc, &i| acc | (1 << i));
        vint::encode_unsigned(bitmap, buf);
        return;
    }
    vint::encode_unsigned(missing.len() as u64, buf);
    let present_count = superset - missing.len();
    if present_count < superset / 2 {
        for i in (0..superset).filter(|&i| present[i]) {
            vint::encode_unsigned(i as u64, buf);
        }
    } else {
        for i in missing {
            vint::encode_unsigned(i as u64, buf);
        }
    }
}

/// Appends one index entry; a non-empty `promoted` block is written after its length.
pub fn write_index_entry(buf: &mut Vec<u8>, key: &[u8], position: u64, promoted: &[u8]) {
    buf.extend_from_slice(&(key.len() as u16).to_be_bytes());
    buf.extend_from_slice(key);
    vint::encode_unsigned(position, buf);
    put_vint_bytes(buf, promoted);
}

//==================================================================================
// 4. Value Helpers
//==================================================================================

pub fn boolean(value: bool) -> Vec<u8> {
    vec![value as u8]
}

pub fn int(value: i32) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

pub fn bigint(value: i64) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

pub fn text(value: &str) -> Vec<u8> {
    value.as_bytes().to_vec()
}

/// A uuid whose sixteen bytes are all `seed`.
pub fn uuid(seed: u8) -> Vec<u8> {
    vec![seed; 16]
}

/// A frozen list/set image in the native-protocol collection layout.
pub fn frozen_elements(elements: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = (elements.len() as i32).to_be_bytes().to_vec();
    for element in elements {
        buf.extend_from_slice(&(element.len() as i32).to_be_bytes());
        buf.extend_from_slice(element);
    }
    buf
}
