// In: src/bridge/stateless_api.rs

use arrow::record_batch::RecordBatch;

use crate::bridge::columnar::{ColumnarTable, OutputColumn};
use crate::bridge::decoder::SstableDecoder;
use crate::config::DecodeConfig;
use crate::error::SstableError;

/// Decodes the output schema of a statistics file without touching any data.
pub fn read_schema(statistics: &[u8], config: DecodeConfig) -> Result<Vec<OutputColumn>, SstableError> {
    Ok(SstableDecoder::from_statistics(statistics, config)?
        .output_columns()
        .to_vec())
}

/// Decodes a statistics/data (and optional index) triple into a columnar table.
pub fn decode_to_table(
    statistics: &[u8],
    data: &[u8],
    index: Option<&[u8]>,
    config: DecodeConfig,
) -> Result<ColumnarTable, SstableError> {
    SstableDecoder::from_statistics(statistics, config)?.decode(data, index)
}

/// Like `decode_to_table`, but returns a single Arrow `RecordBatch`.
pub fn decode_to_record_batch(
    statistics: &[u8],
    data: &[u8],
    index: Option<&[u8]>,
    config: DecodeConfig,
) -> Result<RecordBatch, SstableError> {
    decode_to_table(statistics, data, index, config)?.to_record_batch()
}
