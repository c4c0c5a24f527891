// In: src/ffi/python.rs

use arrow::pyarrow::ToPyArrow;
use log::LevelFilter;
use pyo3::prelude::*;
use std::fs::OpenOptions;
use std::sync::Once;

use crate::bridge::SstableDecoder;
use crate::config::{DecodeConfig, TombstoneMode};
use crate::error::SstableError;

//==================================================================================
// I. Decoding
//==================================================================================

fn parse_tombstone_mode(mode: &str) -> PyResult<TombstoneMode> {
    match mode.to_lowercase().as_str() {
        "skip" => Ok(TombstoneMode::Skip),
        "emit_synthetic_rows" => Ok(TombstoneMode::EmitSyntheticRows),
        _ => Err(PyErr::new::<pyo3::exceptions::PyValueError, _>(
            "Invalid tombstones mode. Must be 'skip' or 'emit_synthetic_rows'.",
        )),
    }
}

/// Decodes an sstable's statistics and data files (plus, optionally, its
/// index) into a single `pyarrow.RecordBatch`.
#[pyfunction]
#[pyo3(name = "decode_sstable", signature = (
    statistics_path,
    data_path,
    index_path = None,
    include_partition_key = false,
    include_clustering_columns = true,
    tombstones = "skip",
    expire_cells_at = None,
    parallelism = 1
))]
#[allow(clippy::too_many_arguments)]
pub fn decode_sstable_py(
    py: Python,
    statistics_path: &str,
    data_path: &str,
    index_path: Option<&str>,
    include_partition_key: bool,
    include_clustering_columns: bool,
    tombstones: &str,
    expire_cells_at: Option<i32>,
    parallelism: usize,
) -> PyResult<PyObject> {
    let config = DecodeConfig {
        include_partition_key,
        include_clustering_columns,
        tombstones: parse_tombstone_mode(tombstones)?,
        expire_cells_at,
        parallelism,
    };

    let statistics = std::fs::read(statistics_path).map_err(SstableError::from)?;
    let data = std::fs::read(data_path).map_err(SstableError::from)?;
    let index = index_path
        .map(std::fs::read)
        .transpose()
        .map_err(SstableError::from)?;

    let batch = py.allow_threads(|| -> Result<_, SstableError> {
        let decoder = SstableDecoder::from_statistics(&statistics, config)?;
        decoder.decode(&data, index.as_deref())?.to_record_batch()
    })?;
    batch.to_pyarrow(py)
}

/// Returns the output columns of a statistics file as a JSON string.
#[pyfunction]
#[pyo3(name = "read_schema_json")]
pub fn read_schema_json_py(statistics_path: &str) -> PyResult<String> {
    let statistics = std::fs::read(statistics_path).map_err(SstableError::from)?;
    let columns = crate::bridge::read_schema(&statistics, DecodeConfig::default())?;
    Ok(serde_json::to_string(&columns).map_err(SstableError::from)?)
}

//==================================================================================
// II. Logging
//==================================================================================

static INIT_LOGGER: Once = Once::new();

#[pyfunction]
#[pyo3(name = "enable_verbose_logging", signature = (log_file = None))]
pub fn enable_verbose_logging_py(log_file: Option<String>) -> PyResult<()> {
    let target = match log_file {
        Some(filename) => Some(
            OpenOptions::new()
                .append(true)
                .create(true)
                .open(filename)
                .map_err(SstableError::from)?,
        ),
        None => None,
    };

    INIT_LOGGER.call_once(|| {
        let mut builder = env_logger::Builder::new();

        builder.is_test(false);
        builder.filter_level(LevelFilter::Info);

        // Custom formatter: just print the level and message
        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(buf, "[{}] {}", record.level(), record.args())?;
            buf.flush()?;
            Ok(())
        });

        if let Some(file) = target {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }

        let _ = builder.try_init();
    });
    Ok(())
}
