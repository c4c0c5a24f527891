// In: src/bridge/columnar.rs

//! The columnar projection of decoded partitions.
//!
//! A `ColumnarTableBuilder` owns one append-only `ColumnBuffer` per output
//! column and turns each `Partition` into zero or more table rows. Output
//! columns are laid out as: partition key component(s) (optional), clustering
//! columns (optional), static columns, regular columns, then `_tombstone`
//! when synthetic tombstone rows are enabled. A row is validated against every
//! buffer before any buffer is appended to, so all buffers always have the
//! same length.

use arrow::array::ArrayRef;
use arrow::datatypes::{Field, Schema, SchemaRef};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use serde::Serialize;
use std::sync::Arc;

use crate::bridge::arrow_impl;
use crate::config::DecodeConfig;
use crate::error::SstableError;
use crate::sstable::schema::{ColumnRole, SchemaDescriptor, SchemaRegistry};
use crate::sstable::unfiltered::{Partition, Row, Unfiltered};
use crate::types::value::decode_partition_key;
use crate::types::{CqlValue, TypeTag};

pub const PARTITION_KEY_COLUMN: &str = "partition_key";
pub const TOMBSTONE_COLUMN: &str = "_tombstone";

//==================================================================================
// 1. Output Schema
//==================================================================================

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct OutputColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub type_tag: TypeTag,
    pub nullable: bool,
}

impl OutputColumn {
    fn nullable(name: impl Into<String>, type_tag: TypeTag) -> Self {
        Self {
            name: name.into(),
            type_tag,
            nullable: true,
        }
    }

    pub fn to_arrow_field(&self) -> Field {
        Field::new(&self.name, self.type_tag.to_arrow_type(), self.nullable)
    }
}

/// The ordered output columns of `schema` under `config`.
pub fn output_columns(schema: &SchemaDescriptor, config: &DecodeConfig) -> Vec<OutputColumn> {
    let mut columns = Vec::new();
    if config.include_partition_key {
        match &schema.partition_key_type {
            TypeTag::Composite(components) => {
                for (i, component) in components.iter().enumerate() {
                    columns.push(OutputColumn::nullable(
                        format!("{}_{}", PARTITION_KEY_COLUMN, i),
                        component.clone(),
                    ));
                }
            }
            single => columns.push(OutputColumn::nullable(PARTITION_KEY_COLUMN, single.clone())),
        }
    }
    if config.include_clustering_columns {
        columns.extend(
            schema
                .clustering_columns
                .iter()
                .map(|c| OutputColumn::nullable(c.name.clone(), c.type_tag.clone())),
        );
    }
    columns.extend(
        schema
            .static_columns
            .iter()
            .chain(schema.regular_columns.iter())
            .map(|c| OutputColumn::nullable(c.name.clone(), c.type_tag.clone())),
    );
    if config.emits_synthetic_rows() {
        columns.push(OutputColumn {
            name: TOMBSTONE_COLUMN.to_string(),
            type_tag: TypeTag::Boolean,
            nullable: false,
        });
    }
    columns
}

pub fn arrow_schema(columns: &[OutputColumn]) -> SchemaRef {
    Arc::new(Schema::new(
        columns.iter().map(OutputColumn::to_arrow_field).collect::<Vec<_>>(),
    ))
}

//==================================================================================
// 2. Column Buffers
//==================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnBuffer {
    column: OutputColumn,
    values: Vec<Option<CqlValue>>,
}

impl ColumnBuffer {
    pub fn new(column: OutputColumn) -> Self {
        Self {
            column,
            values: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.column.name
    }

    pub fn column(&self) -> &OutputColumn {
        &self.column
    }

    pub fn values(&self) -> &[Option<CqlValue>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fails with `TypeCoercion` if `value` cannot inhabit this column.
    pub fn check(&self, value: &Option<CqlValue>) -> Result<(), SstableError> {
        match value {
            Some(v) if !v.matches(&self.column.type_tag) => Err(SstableError::coercion(
                &self.column.name,
                format!("decoded a {} value for a {} column", v.kind(), self.column.type_tag),
            )),
            None if !self.column.nullable => Err(SstableError::coercion(
                &self.column.name,
                "null value for a non-nullable column",
            )),
            _ => Ok(()),
        }
    }

    pub fn push(&mut self, value: Option<CqlValue>) -> Result<(), SstableError> {
        self.check(&value)?;
        self.values.push(value);
        Ok(())
    }

    pub fn to_arrow(&self) -> Result<ArrayRef, SstableError> {
        arrow_impl::to_arrow_array(&self.column.name, &self.column.type_tag, &self.values)
    }
}

//==================================================================================
// 3. Columnar Table
//==================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnarTable {
    columns: Vec<ColumnBuffer>,
    row_count: usize,
}

impl ColumnarTable {
    /// A table with the given columns and no rows.
    pub fn empty(columns: &[OutputColumn]) -> Self {
        Self {
            columns: columns.iter().cloned().map(ColumnBuffer::new).collect(),
            row_count: 0,
        }
    }

    /// The ordered (name, type, nullability) triples of the table.
    pub fn schema(&self) -> Vec<OutputColumn> {
        self.columns.iter().map(|c| c.column.clone()).collect()
    }

    pub fn arrow_schema(&self) -> SchemaRef {
        arrow_schema(&self.schema())
    }

    pub fn columns(&self) -> &[ColumnBuffer] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnBuffer> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// The values of one table row, in column order.
    pub fn row(&self, index: usize) -> Option<Vec<Option<CqlValue>>> {
        (index < self.row_count)
            .then(|| self.columns.iter().map(|c| c.values[index].clone()).collect())
    }

    pub fn to_record_batch(&self) -> Result<RecordBatch, SstableError> {
        let arrays = self
            .columns
            .iter()
            .map(ColumnBuffer::to_arrow)
            .collect::<Result<Vec<_>, _>>()?;
        let options = RecordBatchOptions::new().with_row_count(Some(self.row_count));
        Ok(RecordBatch::try_new_with_options(self.arrow_schema(), arrays, &options)?)
    }

    /// Appends the rows of `parts`, in order, to a table of `columns`. Every
    /// part must have exactly that layout.
    pub fn concat(columns: &[OutputColumn], parts: Vec<ColumnarTable>) -> Result<Self, SstableError> {
        let mut merged = Self::empty(columns);
        for part in parts {
            if part.columns.len() != merged.columns.len()
                || part
                    .columns
                    .iter()
                    .zip(merged.columns.iter())
                    .any(|(a, b)| a.column != b.column)
            {
                return Err(SstableError::InternalError(
                    "cannot concatenate tables with different layouts".to_string(),
                ));
            }
            merged.row_count += part.row_count;
            for (target, source) in merged.columns.iter_mut().zip(part.columns) {
                target.values.extend(source.values);
            }
        }
        Ok(merged)
    }
}

//==================================================================================
// 4. Builder
//==================================================================================

pub struct ColumnarTableBuilder<'r> {
    registry: &'r SchemaRegistry,
    config: &'r DecodeConfig,
    buffers: Vec<ColumnBuffer>,
    row_count: usize,
    key_width: usize,
}

impl<'r> ColumnarTableBuilder<'r> {
    pub fn new(registry: &'r SchemaRegistry, config: &'r DecodeConfig) -> Self {
        let columns = output_columns(registry.descriptor(), config);
        let key_width = if !config.include_partition_key {
            0
        } else {
            match &registry.descriptor().partition_key_type {
                TypeTag::Composite(components) => components.len(),
                _ => 1,
            }
        };
        Self {
            registry,
            config,
            buffers: columns.into_iter().map(ColumnBuffer::new).collect(),
            row_count: 0,
            key_width,
        }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Projects one partition into table rows.
    pub fn add_partition(&mut self, partition: &Partition<'_>) -> Result<(), SstableError> {
        let now = self.config.expire_cells_at;
        let synthetic = self.config.emits_synthetic_rows();
        let key = self.decode_key(partition.key)?;

        let statics: Vec<Option<CqlValue>> = match &partition.static_row {
            Some(row) => project_cells(row, now),
            None => vec![None; self.registry.column_count(ColumnRole::Static)],
        };

        if let Some(deletion) = partition.deletion {
            log::info!(
                "partition at offset {} deleted at {} (local {})",
                partition.offset,
                deletion.marked_for_delete_at,
                deletion.local_deletion_time
            );
            if synthetic {
                self.push_row(&key, &[], None, None, true)?;
            }
        }

        let mut data_rows = 0usize;
        for entry in &partition.entries {
            match entry {
                Unfiltered::Row(row) if row.is_tombstone() => {
                    log::info!("row tombstone at clustering {:?}", row.clustering);
                    if synthetic {
                        self.push_row(&key, &row.clustering, None, None, true)?;
                    }
                }
                Unfiltered::Row(row) => {
                    let regulars = project_cells(row, now);
                    self.push_row(&key, &row.clustering, Some(statics.as_slice()), Some(regulars.as_slice()), false)?;
                    data_rows += 1;
                }
                Unfiltered::RangeTombstoneMarker(marker) => {
                    if synthetic {
                        self.push_row(&key, &marker.clustering, None, None, true)?;
                    }
                }
            }
        }

        // A partition holding only static data still yields one row.
        if data_rows == 0 && statics.iter().any(Option::is_some) {
            self.push_row(&key, &[], Some(statics.as_slice()), None, false)?;
            data_rows = 1;
        }

        log::debug!(
            "partition at offset {} projected into {} data row(s)",
            partition.offset,
            data_rows
        );
        Ok(())
    }

    pub fn finish(self) -> ColumnarTable {
        log_metric!("event"="projection_finished", "rows"=&self.row_count, "columns"=&self.buffers.len());
        ColumnarTable {
            columns: self.buffers,
            row_count: self.row_count,
        }
    }

    fn decode_key(&self, raw: &[u8]) -> Result<Vec<Option<CqlValue>>, SstableError> {
        if self.key_width == 0 {
            return Ok(Vec::new());
        }
        let key = decode_partition_key(&self.registry.descriptor().partition_key_type, raw)?;
        if key.len() != self.key_width {
            return Err(SstableError::SchemaMismatch(format!(
                "partition key has {} component(s), expected {}",
                key.len(),
                self.key_width
            )));
        }
        Ok(key)
    }

    /// Appends one table row. Missing clustering values (short marker
    /// prefixes) and absent static/regular groups are null.
    fn push_row(
        &mut self,
        key: &[Option<CqlValue>],
        clustering: &[Option<CqlValue>],
        statics: Option<&[Option<CqlValue>]>,
        regulars: Option<&[Option<CqlValue>]>,
        tombstone: bool,
    ) -> Result<(), SstableError> {
        let mut values: Vec<Option<CqlValue>> = Vec::with_capacity(self.buffers.len());
        values.extend(key.iter().cloned());
        if self.config.include_clustering_columns {
            let width = self.registry.column_count(ColumnRole::Clustering);
            values.extend(padded(Some(clustering), width));
        }
        values.extend(padded(statics, self.registry.column_count(ColumnRole::Static)));
        values.extend(padded(regulars, self.registry.column_count(ColumnRole::Regular)));
        if self.config.emits_synthetic_rows() {
            values.push(Some(CqlValue::Boolean(tombstone)));
        }

        if values.len() != self.buffers.len() {
            return Err(SstableError::InternalError(format!(
                "row of {} value(s) for {} column buffer(s)",
                values.len(),
                self.buffers.len()
            )));
        }
        for (buffer, value) in self.buffers.iter().zip(values.iter()) {
            buffer.check(value)?;
        }
        for (buffer, value) in self.buffers.iter_mut().zip(values) {
            buffer.values.push(value);
        }
        self.row_count += 1;
        Ok(())
    }
}

fn padded<'v>(
    values: Option<&'v [Option<CqlValue>]>,
    width: usize,
) -> impl Iterator<Item = Option<CqlValue>> + 'v {
    (0..width).map(move |i| values.and_then(|v| v.get(i)).cloned().flatten())
}

fn project_cells(row: &Row<'_>, now: Option<i32>) -> Vec<Option<CqlValue>> {
    row.cells
        .iter()
        .map(|data| data.as_ref().and_then(|d| d.project(now)))
        .collect()
}
