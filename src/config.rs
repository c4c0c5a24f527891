// In: src/config.rs

//! The single source of truth for decode configuration.
//!
//! A `DecodeConfig` is created once at the application boundary (a JSON file
//! handed to the CLI, keyword arguments from Python, or a struct literal in
//! Rust) and is then shared read-only by the decoder and every shard it
//! spawns. Every field has a default, so `{}` is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::error::SstableError;

//==================================================================================
// I. Enums
//==================================================================================

/// What the columnar projection does with deletions.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TombstoneMode {
    /// **Default:** row tombstones, range tombstone markers and partition
    /// deletions contribute no rows.
    #[default]
    Skip,

    /// Each of them contributes one row whose data columns are null, flagged
    /// by a trailing non-null boolean `_tombstone` column.
    EmitSyntheticRows,
}

//==================================================================================
// II. The DecodeConfig
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct DecodeConfig {
    /// Prepend the decoded partition key as `partition_key`, or as
    /// `partition_key_{i}` for composite keys.
    #[serde(default)]
    pub include_partition_key: bool,

    /// Emit the clustering columns as `clustering_key_{i}`.
    #[serde(default = "default_true")]
    pub include_clustering_columns: bool,

    #[serde(default)]
    pub tombstones: TombstoneMode,

    /// Local time in seconds. Expiring cells whose local deletion time is at
    /// or before it project as null. `None` treats every expiring cell as live.
    #[serde(default)]
    pub expire_cells_at: Option<i32>,

    /// Number of shards for index-driven decoding. Only used when an index is
    /// supplied; 1 decodes sequentially.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            include_partition_key: false,
            include_clustering_columns: true,
            tombstones: TombstoneMode::default(),
            expire_cells_at: None,
            parallelism: default_parallelism(),
        }
    }
}

impl DecodeConfig {
    /// Loads a configuration from JSON. Unknown fields are rejected.
    pub fn from_json(json: &str) -> Result<Self, SstableError> {
        let config: DecodeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SstableError> {
        if self.parallelism == 0 {
            return Err(SstableError::InvalidConfig(
                "parallelism must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn emits_synthetic_rows(&self) -> bool {
        self.tombstones == TombstoneMode::EmitSyntheticRows
    }
}

/// Serde default of `include_clustering_columns`.
fn default_true() -> bool {
    true
}

/// Serde default of `parallelism`: sequential decoding.
fn default_parallelism() -> usize {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_field_defaults() {
        let config = DecodeConfig::from_json(r#"{"include_partition_key": true}"#).unwrap();
        assert!(config.include_partition_key);
        assert!(config.include_clustering_columns);
        assert_eq!(config.parallelism, 1);
    }

    #[test]
    fn test_empty_json_yields_defaults() {
        let config = DecodeConfig::from_json("{}").unwrap();
        assert_eq!(config, DecodeConfig::default());
        assert!(config.include_clustering_columns);
        assert!(!config.include_partition_key);
        assert_eq!(config.tombstones, TombstoneMode::Skip);
        assert_eq!(config.parallelism, 1);
    }

    #[test]
    fn test_json_overrides() {
        let config = DecodeConfig::from_json(
            r#"{"include_partition_key": true, "tombstones": "emit_synthetic_rows",
                "expire_cells_at": 1700000000, "parallelism": 4}"#,
        )
        .unwrap();
        assert!(config.include_partition_key);
        assert!(config.emits_synthetic_rows());
        assert_eq!(config.expire_cells_at, Some(1_700_000_000));
        assert_eq!(config.parallelism, 4);
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        assert!(matches!(
            DecodeConfig::from_json(r#"{"tombstones": "keep"}"#),
            Err(SstableError::SerdeJson(_))
        ));
        assert!(matches!(
            DecodeConfig::from_json(r#"{"parallelism": 0}"#),
            Err(SstableError::InvalidConfig(_))
        ));
        assert!(DecodeConfig::from_json(r#"{"include_partition_keys": true}"#).is_err());
    }
}
