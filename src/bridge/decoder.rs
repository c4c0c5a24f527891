// In: src/bridge/decoder.rs

//! The stateful decode facade.
//!
//! An `SstableDecoder` is built once from a statistics file and a
//! `DecodeConfig`, and can then project any number of data files of the same
//! sstable generation. With an index, decoding can be sharded by partition
//! offsets and every decoded partition is cross-checked against the index.

use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::bridge::columnar::{self, ColumnarTable, ColumnarTableBuilder, OutputColumn};
use crate::config::DecodeConfig;
use crate::error::SstableError;
use crate::sstable::index::partition_offsets;
use crate::sstable::{parse_statistics, DataReader, SchemaRegistry, StatisticsFile};
use arrow::datatypes::SchemaRef;

/// One contiguous byte range of the data file and the partitions the index
/// places in it.
struct Shard<'i> {
    start: u64,
    end: u64,
    offsets: &'i [u64],
}

pub struct SstableDecoder {
    statistics: StatisticsFile,
    registry: SchemaRegistry,
    config: DecodeConfig,
    columns: Vec<OutputColumn>,
}

impl SstableDecoder {
    pub fn new(statistics: StatisticsFile, config: DecodeConfig) -> Result<Self, SstableError> {
        config.validate()?;
        let registry = SchemaRegistry::new(statistics.schema.clone());
        let columns = columnar::output_columns(registry.descriptor(), &config);
        Ok(Self {
            statistics,
            registry,
            config,
            columns,
        })
    }

    pub fn from_statistics(bytes: &[u8], config: DecodeConfig) -> Result<Self, SstableError> {
        Self::new(parse_statistics(bytes)?, config)
    }

    pub fn statistics(&self) -> &StatisticsFile {
        &self.statistics
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// The output columns every decoded table will have.
    pub fn output_columns(&self) -> &[OutputColumn] {
        &self.columns
    }

    pub fn arrow_schema(&self) -> SchemaRef {
        columnar::arrow_schema(&self.columns)
    }

    /// Projects a whole data file. `index`, when given, must describe the
    /// same data file.
    pub fn decode(&self, data: &[u8], index: Option<&[u8]>) -> Result<ColumnarTable, SstableError> {
        self.decode_with_cancel(data, index, &AtomicBool::new(false))
    }

    /// Like `decode`, but checks `cancel` before every partition and fails
    /// with `Cancelled` once it is set.
    pub fn decode_with_cancel(
        &self,
        data: &[u8],
        index: Option<&[u8]>,
        cancel: &AtomicBool,
    ) -> Result<ColumnarTable, SstableError> {
        let offsets = index.map(partition_offsets).transpose()?;
        if let Some(offsets) = &offsets {
            check_offsets_in_range(offsets, data.len())?;
        }
        match offsets {
            Some(offsets) if self.config.parallelism > 1 && offsets.len() > 1 => {
                self.decode_sharded(data, &offsets, cancel)
            }
            Some(offsets) => {
                let reader = self.full_reader(data);
                self.project(reader, Some(offsets.as_slice()), data.len() as u64, cancel)
            }
            None => {
                let reader = self.full_reader(data);
                self.project(reader, None, data.len() as u64, cancel)
            }
        }
    }

    /// A reader over the whole data file, held to the partition count the
    /// statistics declare.
    fn full_reader<'d>(&'d self, data: &'d [u8]) -> DataReader<'d> {
        DataReader::new(data, &self.registry).with_partition_count(self.statistics.partition_count)
    }

    fn decode_sharded(
        &self,
        data: &[u8],
        offsets: &[u64],
        cancel: &AtomicBool,
    ) -> Result<ColumnarTable, SstableError> {
        let shard_count = self.config.parallelism.min(offsets.len());
        let per_shard = (offsets.len() + shard_count - 1) / shard_count;
        let groups: Vec<&[u64]> = offsets.chunks(per_shard).collect();

        let shards: Vec<Shard<'_>> = groups
            .iter()
            .enumerate()
            .map(|(i, &group)| Shard {
                start: group[0],
                end: groups.get(i + 1).map_or(data.len() as u64, |next| next[0]),
                offsets: group,
            })
            .collect();
        log::info!(
            "decoding {} partition(s) in {} shard(s)",
            offsets.len(),
            shards.len()
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(shards.len())
            .build()
            .map_err(|e| SstableError::InternalError(format!("cannot start shard pool: {}", e)))?;
        let parts = pool.install(|| {
            shards
                .par_iter()
                .map(|shard| {
                    let reader = DataReader::for_range(
                        data,
                        &self.registry,
                        to_usize(shard.start)?,
                        to_usize(shard.end)?,
                    )?;
                    self.project(reader, Some(shard.offsets), shard.end, cancel)
                })
                .collect::<Result<Vec<_>, SstableError>>()
        })?;

        ColumnarTable::concat(&self.columns, parts)
    }

    /// Drains `reader` into a table. With `expected` offsets, the n-th decoded
    /// partition must start at the n-th offset and every offset must be
    /// reached before `end`.
    fn project(
        &self,
        mut reader: DataReader<'_>,
        expected: Option<&[u64]>,
        end: u64,
        cancel: &AtomicBool,
    ) -> Result<ColumnarTable, SstableError> {
        let mut builder = ColumnarTableBuilder::new(&self.registry, &self.config);
        let mut decoded = 0usize;
        loop {
            if cancel.load(Ordering::Relaxed) {
                return Err(SstableError::Cancelled { partitions: decoded });
            }
            let partition = match reader.read_partition()? {
                Some(partition) => partition,
                None => break,
            };
            if let Some(expected) = expected {
                let want = expected.get(decoded).copied().unwrap_or(end);
                if partition.offset != want {
                    return Err(SstableError::IndexMismatch {
                        expected: want,
                        actual: partition.offset,
                    });
                }
            }
            builder.add_partition(&partition)?;
            decoded += 1;
        }

        if let Some(&missing) = expected.and_then(|e| e.get(decoded)) {
            return Err(SstableError::IndexMismatch {
                expected: missing,
                actual: end,
            });
        }
        log::debug!("{} partition(s) -> {} row(s)", decoded, builder.row_count());
        Ok(builder.finish())
    }
}

/// An index offset at or past the end of the data names a partition the data
/// no longer holds: the data file was cut short.
fn check_offsets_in_range(offsets: &[u64], data_len: usize) -> Result<(), SstableError> {
    let len = data_len as u64;
    match offsets.iter().copied().find(|&offset| offset >= len) {
        Some(offset) => Err(SstableError::TruncatedInput {
            offset: data_len,
            needed: usize::try_from(offset - len + 1).unwrap_or(usize::MAX),
            remaining: 0,
        }),
        None => Ok(()),
    }
}

fn to_usize(offset: u64) -> Result<usize, SstableError> {
    usize::try_from(offset)
        .map_err(|_| SstableError::InternalError(format!("offset {} does not fit in memory", offset)))
}
