use super::*;
use crate::config::{DecodeConfig, TombstoneMode};
use crate::error::SstableError;
use crate::fixtures::{
    bigint, boolean, frozen_elements, int, marshal, text, uuid, write_index_entry, CellFixture,
    DataFixture, MarkerFixture, RowFixture, StatisticsFixture,
};
use crate::sstable::parse_statistics;
use crate::sstable::unfiltered::BoundKind;
use crate::types::{CqlValue, TypeTag};
use arrow::array::{Array, AsArray};
use arrow::datatypes::DataType;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

const MIN_TS: i64 = 1_600_000_000_000_000;
const LDT: i32 = 1_700_000_000;

//==================================================================================
// Fixtures
//==================================================================================

fn users_statistics() -> Vec<u8> {
    StatisticsFixture::new(marshal("UTF8Type"))
        .min_timestamp(MIN_TS)
        .static_column("active", marshal("BooleanType"))
        .regular_column("name", marshal("UTF8Type"))
        .regular_column("age", marshal("Int32Type"))
        .build()
}

fn events_statistics() -> Vec<u8> {
    StatisticsFixture::new(marshal("UTF8Type"))
        .min_timestamp(MIN_TS)
        .clustering(marshal("Int32Type"))
        .regular_column("payload", marshal("UTF8Type"))
        .build()
}

fn data_for(statistics: &[u8]) -> DataFixture {
    DataFixture::new(parse_statistics(statistics).unwrap().schema)
}

fn event_row(id: i32, payload: &str) -> RowFixture {
    RowFixture::regular(vec![Some(int(id))])
        .timestamp(MIN_TS + id as i64)
        .cell(CellFixture::live(text(payload)))
}

fn synthetic() -> DecodeConfig {
    DecodeConfig {
        tombstones: TombstoneMode::EmitSyntheticRows,
        ..DecodeConfig::default()
    }
}

fn column_values(table: &ColumnarTable, name: &str) -> Vec<Option<CqlValue>> {
    table.column(name).unwrap().values().to_vec()
}

fn texts(values: &[Option<&str>]) -> Vec<Option<CqlValue>> {
    values.iter().map(|v| v.map(|s| CqlValue::Text(s.to_string()))).collect()
}

fn assert_rectangular(table: &ColumnarTable) {
    for column in table.columns() {
        assert_eq!(column.len(), table.row_count(), "column {}", column.name());
    }
}

/// Five partitions of two rows each, plus the matching index. The statistics
/// declare the partition count.
fn five_event_partitions() -> (Vec<u8>, DataFixture) {
    let statistics = StatisticsFixture::new(marshal("UTF8Type"))
        .min_timestamp(MIN_TS)
        .clustering(marshal("Int32Type"))
        .regular_column("payload", marshal("UTF8Type"))
        .partition_count(5)
        .build();
    let mut data = data_for(&statistics);
    for p in 0..5 {
        data.partition(format!("p{}", p).as_bytes())
            .row(event_row(p * 10, &format!("a{}", p)))
            .row(event_row(p * 10 + 1, &format!("b{}", p)))
            .end_partition();
    }
    (statistics, data)
}

//==================================================================================
// Projection scenarios
//==================================================================================

#[test]
fn test_users_scenario() {
    let statistics = users_statistics();
    let mut data = data_for(&statistics);
    data.partition(b"user1")
        .row(RowFixture::static_row().timestamp(MIN_TS).cell(CellFixture::live(boolean(true))))
        .row(
            RowFixture::regular(vec![])
                .timestamp(MIN_TS)
                .cell(CellFixture::live(text("Alice")))
                .cell(CellFixture::live(int(30))),
        )
        .end_partition();

    let table = decode_to_table(&statistics, &data.finish(), None, DecodeConfig::default()).unwrap();
    let names: Vec<String> = table.schema().into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["active", "name", "age"]);
    assert_eq!(table.row_count(), 1);
    assert_eq!(
        table.row(0).unwrap(),
        vec![
            Some(CqlValue::Boolean(true)),
            Some(CqlValue::Text("Alice".into())),
            Some(CqlValue::Int(30)),
        ]
    );
    assert!(table.row(1).is_none());
}

#[test]
fn test_record_batch_matches_declared_types() {
    let statistics = users_statistics();
    let mut data = data_for(&statistics);
    data.partition(b"user1")
        .row(RowFixture::static_row().timestamp(MIN_TS).cell(CellFixture::live(boolean(true))))
        .row(
            RowFixture::regular(vec![])
                .timestamp(MIN_TS)
                .cell(CellFixture::live(text("Alice")))
                .cell(CellFixture::live(int(30))),
        )
        .end_partition();

    let batch =
        decode_to_record_batch(&statistics, &data.finish(), None, DecodeConfig::default()).unwrap();
    assert_eq!(batch.num_rows(), 1);
    let types: Vec<DataType> = batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.data_type().clone())
        .collect();
    assert_eq!(types, vec![DataType::Boolean, DataType::Utf8, DataType::Int32]);
    assert!(batch.column(0).as_boolean().value(0));
    assert_eq!(batch.column(1).as_string::<i32>().value(0), "Alice");
}

#[test]
fn test_static_values_repeat_on_every_row() {
    let statistics = StatisticsFixture::new(marshal("UTF8Type"))
        .min_timestamp(MIN_TS)
        .clustering(marshal("Int32Type"))
        .static_column("owner", marshal("UTF8Type"))
        .regular_column("payload", marshal("UTF8Type"))
        .build();
    let mut data = data_for(&statistics);
    data.partition(b"p")
        .row(RowFixture::static_row().timestamp(MIN_TS).cell(CellFixture::live(text("ann"))))
        .row(event_row(1, "x"))
        .row(event_row(2, "y"))
        .end_partition();

    let table = decode_to_table(&statistics, &data.finish(), None, DecodeConfig::default()).unwrap();
    assert_eq!(table.row_count(), 2);
    assert_eq!(column_values(&table, "owner"), texts(&[Some("ann"), Some("ann")]));
    assert_eq!(
        column_values(&table, "clustering_key_0"),
        vec![Some(CqlValue::Int(1)), Some(CqlValue::Int(2))]
    );
}

#[test]
fn test_static_only_partition_yields_one_row() {
    let statistics = users_statistics();
    let mut data = data_for(&statistics);
    data.partition(b"user9")
        .row(RowFixture::static_row().timestamp(MIN_TS).cell(CellFixture::live(boolean(false))))
        .end_partition();

    let table = decode_to_table(&statistics, &data.finish(), None, DecodeConfig::default()).unwrap();
    assert_eq!(table.row_count(), 1);
    assert_eq!(table.row(0).unwrap(), vec![Some(CqlValue::Boolean(false)), None, None]);
}

#[test]
fn test_marker_between_rows_in_both_tombstone_modes() {
    let statistics = events_statistics();
    let mut data = data_for(&statistics);
    data.partition(b"p")
        .row(event_row(1, "a"))
        .marker(MarkerFixture::bound(BoundKind::InclStartBound, vec![Some(int(2))], MIN_TS + 9, LDT))
        .row(event_row(3, "c"))
        .end_partition();
    let bytes = data.finish();

    let skipped = decode_to_table(&statistics, &bytes, None, DecodeConfig::default()).unwrap();
    assert_eq!(skipped.row_count(), 2);
    assert!(skipped.column(columnar::TOMBSTONE_COLUMN).is_none());
    assert_eq!(column_values(&skipped, "payload"), texts(&[Some("a"), Some("c")]));

    let emitted = decode_to_table(&statistics, &bytes, None, synthetic()).unwrap();
    assert_eq!(emitted.row_count(), 3);
    assert_rectangular(&emitted);
    assert_eq!(
        column_values(&emitted, columnar::TOMBSTONE_COLUMN),
        vec![
            Some(CqlValue::Boolean(false)),
            Some(CqlValue::Boolean(true)),
            Some(CqlValue::Boolean(false)),
        ]
    );
    assert_eq!(column_values(&emitted, "payload"), texts(&[Some("a"), None, Some("c")]));
    assert_eq!(
        column_values(&emitted, "clustering_key_0"),
        vec![Some(CqlValue::Int(1)), Some(CqlValue::Int(2)), Some(CqlValue::Int(3))]
    );
}

#[test]
fn test_row_and_partition_deletions_in_both_tombstone_modes() {
    let statistics = events_statistics();
    let mut data = data_for(&statistics);
    data.deleted_partition(b"p", MIN_TS + 1, LDT)
        .row(RowFixture::regular(vec![Some(int(5))]).deletion(MIN_TS + 3, LDT))
        .row(event_row(6, "live"))
        .end_partition();
    let bytes = data.finish();

    let skipped = decode_to_table(&statistics, &bytes, None, DecodeConfig::default()).unwrap();
    assert_eq!(skipped.row_count(), 1);
    assert_eq!(column_values(&skipped, "payload"), texts(&[Some("live")]));

    let emitted = decode_to_table(&statistics, &bytes, None, synthetic()).unwrap();
    assert_eq!(emitted.row_count(), 3);
    assert_rectangular(&emitted);
    assert_eq!(
        column_values(&emitted, "clustering_key_0"),
        vec![None, Some(CqlValue::Int(5)), Some(CqlValue::Int(6))]
    );
    assert_eq!(
        column_values(&emitted, columnar::TOMBSTONE_COLUMN),
        vec![
            Some(CqlValue::Boolean(true)),
            Some(CqlValue::Boolean(true)),
            Some(CqlValue::Boolean(false)),
        ]
    );

    let batch = emitted.to_record_batch().unwrap();
    let field = batch.schema().field_with_name(columnar::TOMBSTONE_COLUMN).unwrap().clone();
    assert!(!field.is_nullable());
    assert_eq!(batch.num_rows(), 3);
}

#[test]
fn test_clustering_columns_can_be_excluded() {
    let statistics = events_statistics();
    let mut data = data_for(&statistics);
    data.partition(b"p").row(event_row(1, "a")).end_partition();
    let config = DecodeConfig {
        include_clustering_columns: false,
        ..DecodeConfig::default()
    };

    let table = decode_to_table(&statistics, &data.finish(), None, config).unwrap();
    let names: Vec<String> = table.schema().into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["payload"]);
}

#[test]
fn test_composite_partition_key_columns() {
    let key_type = format!(
        "{}({},{})",
        marshal("CompositeType"),
        marshal("UTF8Type"),
        marshal("Int32Type")
    );
    let statistics = StatisticsFixture::new(key_type)
        .min_timestamp(MIN_TS)
        .regular_column("v", marshal("Int32Type"))
        .build();

    let mut key = Vec::new();
    for component in [text("eu"), int(7)] {
        key.extend_from_slice(&(component.len() as u16).to_be_bytes());
        key.extend_from_slice(&component);
        key.push(0);
    }
    let mut data = data_for(&statistics);
    data.partition(&key)
        .row(RowFixture::regular(vec![]).timestamp(MIN_TS).cell(CellFixture::live(int(1))))
        .end_partition();
    let config = DecodeConfig {
        include_partition_key: true,
        ..DecodeConfig::default()
    };

    let table = decode_to_table(&statistics, &data.finish(), None, config).unwrap();
    let names: Vec<String> = table.schema().into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["partition_key_0", "partition_key_1", "v"]);
    assert_eq!(
        table.row(0).unwrap(),
        vec![
            Some(CqlValue::Text("eu".into())),
            Some(CqlValue::Int(7)),
            Some(CqlValue::Int(1)),
        ]
    );
}

#[test]
fn test_single_partition_key_column() {
    let statistics = users_statistics();
    let mut data = data_for(&statistics);
    data.partition(b"user1")
        .row(RowFixture::regular(vec![]).timestamp(MIN_TS).cell(CellFixture::live(text("A"))))
        .end_partition();
    let config = DecodeConfig {
        include_partition_key: true,
        ..DecodeConfig::default()
    };

    let table = decode_to_table(&statistics, &data.finish(), None, config).unwrap();
    assert_eq!(table.columns()[0].name(), columnar::PARTITION_KEY_COLUMN);
    assert_eq!(column_values(&table, "partition_key"), texts(&[Some("user1")]));
}

#[test]
fn test_expired_cells_project_as_null_only_when_asked() {
    let statistics = events_statistics();
    let mut data = data_for(&statistics);
    data.partition(b"p")
        .row(
            RowFixture::regular(vec![Some(int(1))])
                .timestamp(MIN_TS)
                .cell(CellFixture::live(text("soon gone")).expiring(60, LDT + 60)),
        )
        .end_partition();
    let bytes = data.finish();

    let live = decode_to_table(&statistics, &bytes, None, DecodeConfig::default()).unwrap();
    assert_eq!(column_values(&live, "payload"), texts(&[Some("soon gone")]));

    let config = DecodeConfig {
        expire_cells_at: Some(LDT + 60),
        ..DecodeConfig::default()
    };
    let expired = decode_to_table(&statistics, &bytes, None, config).unwrap();
    assert_eq!(expired.row_count(), 1);
    assert_eq!(column_values(&expired, "payload"), vec![None]);
}

#[test]
fn test_collections_and_uuids_in_a_record_batch() {
    let statistics = StatisticsFixture::new(marshal("UTF8Type"))
        .min_timestamp(MIN_TS)
        .regular_column("id", marshal("TimeUUIDType"))
        .regular_column("tags", format!("{}({})", marshal("SetType"), marshal("UTF8Type")))
        .regular_column(
            "scores",
            format!("{}({},{})", marshal("MapType"), marshal("UTF8Type"), marshal("Int32Type")),
        )
        .regular_column("log", format!("{}({})", marshal("ListType"), marshal("LongType")))
        .regular_column(
            "frozen_ids",
            format!("{}({}({}))", marshal("FrozenType"), marshal("ListType"), marshal("Int32Type")),
        )
        .build();
    let mut data = data_for(&statistics);
    data.partition(b"p")
        .row(
            RowFixture::regular(vec![])
                .timestamp(MIN_TS)
                .cell(CellFixture::live(uuid(3)))
                .complex(None, vec![CellFixture::element(text("x"), None)])
                .complex(None, vec![CellFixture::element(text("k"), Some(int(4)))])
                .complex(None, vec![CellFixture::element(uuid(1), Some(bigint(99)))])
                .cell(CellFixture::live(frozen_elements(&[int(1), int(2)]))),
        )
        .row(
            RowFixture::regular(vec![])
                .timestamp(MIN_TS + 1)
                .absent()
                .absent()
                .absent()
                .absent()
                .cell(CellFixture::live(frozen_elements(&[]))),
        )
        .end_partition();

    let decoder = SstableDecoder::from_statistics(&statistics, DecodeConfig::default()).unwrap();
    let table = decoder.decode(&data.finish(), None).unwrap();
    assert_eq!(table.row_count(), 2);
    assert_eq!(
        column_values(&table, "tags"),
        vec![Some(CqlValue::Set(vec![CqlValue::Text("x".into())])), None]
    );

    let batch = table.to_record_batch().unwrap();
    assert_eq!(batch.schema(), decoder.arrow_schema());
    for (field, column) in decoder.output_columns().iter().zip(batch.columns()) {
        assert_eq!(column.data_type(), &field.type_tag.to_arrow_type(), "{}", field.name);
        assert_eq!(column.len(), 2);
    }
    assert!(batch.column(1).is_null(1));
    assert_eq!(batch.column(4).as_list::<i32>().value_length(0), 2);
}

//==================================================================================
// Buffers and tables
//==================================================================================

#[test]
fn test_column_buffer_rejects_mismatched_values() {
    let mut buffer = ColumnBuffer::new(OutputColumn {
        name: "age".into(),
        type_tag: TypeTag::Int,
        nullable: true,
    });
    buffer.push(Some(CqlValue::Int(1))).unwrap();
    buffer.push(None).unwrap();
    let err = buffer.push(Some(CqlValue::Text("x".into()))).unwrap_err();
    assert!(matches!(err, SstableError::TypeCoercion { ref column, .. } if column == "age"));
    assert_eq!(buffer.len(), 2);

    let mut flags = ColumnBuffer::new(OutputColumn {
        name: "_tombstone".into(),
        type_tag: TypeTag::Boolean,
        nullable: false,
    });
    assert!(matches!(flags.push(None), Err(SstableError::TypeCoercion { .. })));
    assert!(flags.is_empty());
}

#[test]
fn test_concat_requires_identical_layouts() {
    let users = read_schema(&users_statistics(), DecodeConfig::default()).unwrap();
    let events = read_schema(&events_statistics(), DecodeConfig::default()).unwrap();
    let part = ColumnarTable::empty(&events);
    assert!(matches!(
        ColumnarTable::concat(&users, vec![part]),
        Err(SstableError::InternalError(_))
    ));
    let merged = ColumnarTable::concat(&users, vec![]).unwrap();
    assert_eq!(merged.row_count(), 0);
    assert_eq!(merged.to_record_batch().unwrap().num_columns(), 3);
}

#[test]
fn test_schema_serializes_to_json() {
    let columns = read_schema(&events_statistics(), synthetic()).unwrap();
    let json = serde_json::to_string(&columns).unwrap();
    assert!(json.contains("\"clustering_key_0\""));
    assert!(json.contains("\"_tombstone\""));
    let arrow_json = serde_json::to_string(&*columnar::arrow_schema(&columns)).unwrap();
    assert!(arrow_json.contains("payload"));
}

//==================================================================================
// Index, sharding and cancellation
//==================================================================================

#[test]
fn test_sharded_decode_matches_sequential() {
    let (statistics, data) = five_event_partitions();
    let bytes = data.finish();
    let index = data.index();

    let sequential = decode_to_table(&statistics, &bytes, None, DecodeConfig::default()).unwrap();
    assert_eq!(sequential.row_count(), 10);

    for parallelism in [1, 2, 3, 8] {
        let config = DecodeConfig {
            parallelism,
            ..DecodeConfig::default()
        };
        let sharded = decode_to_table(&statistics, &bytes, Some(&index), config).unwrap();
        assert_eq!(sharded, sequential, "parallelism {}", parallelism);
    }
}

#[test]
fn test_index_missing_a_partition_is_a_mismatch() {
    let (statistics, data) = five_event_partitions();
    let bytes = data.finish();
    let offsets = data.partition_offsets();
    let mut index = Vec::new();
    write_index_entry(&mut index, b"p0", offsets[0], &[]);
    write_index_entry(&mut index, b"p2", offsets[2], &[]);

    for parallelism in [1, 2] {
        let config = DecodeConfig {
            parallelism,
            ..DecodeConfig::default()
        };
        let result = decode_to_table(&statistics, &bytes, Some(&index), config);
        assert!(
            matches!(
                result,
                Err(SstableError::IndexMismatch { expected, actual })
                    if expected == offsets[2] && actual == offsets[1]
            ),
            "parallelism {}: {:?}",
            parallelism,
            result.map(|t| t.row_count())
        );
    }
}

#[test]
fn test_index_beyond_the_data_is_truncation() {
    let (statistics, data) = five_event_partitions();
    let bytes = data.finish();
    let mut index = data.index();
    write_index_entry(&mut index, b"p5", bytes.len() as u64 + 10, &[]);

    for parallelism in [1, 2] {
        let config = DecodeConfig {
            parallelism,
            ..DecodeConfig::default()
        };
        let result = decode_to_table(&statistics, &bytes, Some(&index), config);
        assert!(
            matches!(result, Err(SstableError::TruncatedInput { offset, .. }) if offset == bytes.len()),
            "parallelism {}: {:?}",
            parallelism,
            result.map(|t| t.row_count())
        );
    }
}

#[test]
fn test_cut_at_a_partition_boundary_is_truncation() {
    let (statistics, data) = five_event_partitions();
    let bytes = data.finish();
    let index = data.index();
    let cut = data.partition_offsets()[3] as usize;

    let without_index = decode_to_table(&statistics, &bytes[..cut], None, DecodeConfig::default());
    assert!(
        matches!(without_index, Err(SstableError::TruncatedInput { offset, .. }) if offset == cut),
        "{:?}",
        without_index.map(|t| t.row_count())
    );

    for parallelism in [1, 2, 8] {
        let config = DecodeConfig {
            parallelism,
            ..DecodeConfig::default()
        };
        let result = decode_to_table(&statistics, &bytes[..cut], Some(&index), config);
        assert!(
            matches!(result, Err(SstableError::TruncatedInput { offset, .. }) if offset == cut),
            "parallelism {}: {:?}",
            parallelism,
            result.map(|t| t.row_count())
        );
    }
}

#[test]
fn test_more_partitions_than_declared_is_a_mismatch() {
    let statistics = StatisticsFixture::new(marshal("UTF8Type"))
        .min_timestamp(MIN_TS)
        .clustering(marshal("Int32Type"))
        .regular_column("payload", marshal("UTF8Type"))
        .partition_count(1)
        .build();
    let mut data = data_for(&statistics);
    for p in 0..2 {
        data.partition(format!("p{}", p).as_bytes())
            .row(event_row(p, "x"))
            .end_partition();
    }
    let result = decode_to_table(&statistics, &data.finish(), None, DecodeConfig::default());
    assert!(matches!(result, Err(SstableError::SchemaMismatch(_))));
}

#[test]
fn test_cancellation_between_partitions() {
    let (statistics, data) = five_event_partitions();
    let decoder = SstableDecoder::from_statistics(&statistics, DecodeConfig::default()).unwrap();
    let cancel = AtomicBool::new(true);
    assert!(matches!(
        decoder.decode_with_cancel(&data.finish(), None, &cancel),
        Err(SstableError::Cancelled { partitions: 0 })
    ));
}

#[test]
fn test_truncated_data_never_yields_a_short_table() {
    let (statistics, data) = five_event_partitions();
    let bytes = data.finish();
    let index = data.index();
    assert_eq!(
        decode_to_table(&statistics, &bytes, None, DecodeConfig::default()).unwrap().row_count(),
        10
    );

    for cut in 0..bytes.len() {
        for (cut_index, parallelism) in [(None, 1), (Some(index.as_slice()), 1), (Some(index.as_slice()), 3)] {
            let config = DecodeConfig {
                parallelism,
                ..DecodeConfig::default()
            };
            let result = decode_to_table(&statistics, &bytes[..cut], cut_index, config);
            assert!(
                matches!(result, Err(SstableError::TruncatedInput { .. })),
                "cut at {} (index {}, parallelism {}): {:?}",
                cut,
                cut_index.is_some(),
                parallelism,
                result.map(|t| t.row_count())
            );
        }
    }
}

#[test]
fn test_schema_shared_across_threads() {
    let (statistics, data) = five_event_partitions();
    let decoder = Arc::new(SstableDecoder::from_statistics(&statistics, DecodeConfig::default()).unwrap());
    let bytes = Arc::new(data.finish());
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let decoder = Arc::clone(&decoder);
            let bytes = Arc::clone(&bytes);
            std::thread::spawn(move || decoder.decode(&bytes, None).map(|t| t.row_count()))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap().unwrap(), 10);
    }
}
