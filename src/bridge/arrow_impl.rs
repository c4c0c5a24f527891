// In: src/bridge/arrow_impl.rs

//! Conversion of column buffers into Arrow arrays.
//!
//! Each `TypeTag` maps onto exactly one Arrow type (see
//! `TypeTag::to_arrow_type`); this module builds the matching array from a
//! slice of optional values, recursing into list and map children.

use arrow::array::{
    ArrayRef, BinaryArray, BooleanArray, Date32Array, Decimal128Array, FixedSizeBinaryArray,
    Float32Array, Float64Array, Int16Array, Int32Array, Int64Array, Int8Array,
    IntervalMonthDayNanoArray, ListArray, MapArray, NullArray, StringArray, StructArray,
    Time64NanosecondArray, TimestampMillisecondArray,
};
use arrow::buffer::{NullBuffer, OffsetBuffer};
use arrow::datatypes::IntervalMonthDayNanoType;
use std::sync::Arc;

use crate::error::SstableError;
use crate::types::type_tag::{list_item_field, map_entries_field, map_entry_fields};
use crate::types::value::format_decimal;
use crate::types::{CqlValue, TypeTag};

/// Builds the Arrow array of a column of `tag` values. `column` only labels
/// errors.
pub(crate) fn to_arrow_array(
    column: &str,
    tag: &TypeTag,
    values: &[Option<CqlValue>],
) -> Result<ArrayRef, SstableError> {
    let mismatch = |value: &CqlValue| {
        SstableError::coercion(column, format!("{} value in a {} column", value.kind(), tag))
    };

    // Collects `values` through `$extract`, which maps a matching value to
    // the array's native item.
    macro_rules! collect_array {
        ($array:ty, $pattern:pat => $extract:expr) => {{
            let array = values
                .iter()
                .map(|value| match value {
                    None => Ok(None),
                    Some($pattern) => Ok(Some($extract)),
                    Some(other) => Err(mismatch(other)),
                })
                .collect::<Result<$array, SstableError>>()?;
            array
        }};
    }

    let array: ArrayRef = match tag {
        TypeTag::Boolean => Arc::new(collect_array!(BooleanArray, CqlValue::Boolean(v) => *v)),
        TypeTag::TinyInt => Arc::new(collect_array!(Int8Array, CqlValue::TinyInt(v) => *v)),
        TypeTag::SmallInt => Arc::new(collect_array!(Int16Array, CqlValue::SmallInt(v) => *v)),
        TypeTag::Int => Arc::new(collect_array!(Int32Array, CqlValue::Int(v) => *v)),
        TypeTag::BigInt => Arc::new(collect_array!(Int64Array, CqlValue::BigInt(v) => *v)),
        TypeTag::Float => Arc::new(collect_array!(Float32Array, CqlValue::Float(v) => *v)),
        TypeTag::Double => Arc::new(collect_array!(Float64Array, CqlValue::Double(v) => *v)),
        TypeTag::Text | TypeTag::Ascii => {
            Arc::new(collect_array!(StringArray, CqlValue::Text(v) => v.as_str()))
        }
        TypeTag::Decimal => Arc::new(collect_array!(
            StringArray,
            CqlValue::Decimal { unscaled, scale } => format_decimal(*unscaled, *scale)
        )),
        TypeTag::Inet => Arc::new(collect_array!(StringArray, CqlValue::Inet(v) => v.to_string())),
        TypeTag::Blob | TypeTag::Composite(_) => {
            Arc::new(collect_array!(BinaryArray, CqlValue::Blob(v) => v.as_slice()))
        }
        TypeTag::Timestamp => Arc::new(
            collect_array!(TimestampMillisecondArray, CqlValue::Timestamp(v) => *v)
                .with_timezone("UTC"),
        ),
        TypeTag::Date => Arc::new(collect_array!(Date32Array, CqlValue::Date(v) => *v)),
        TypeTag::Time => Arc::new(collect_array!(Time64NanosecondArray, CqlValue::Time(v) => *v)),
        TypeTag::Varint => Arc::new(
            collect_array!(Decimal128Array, CqlValue::Varint(v) => *v)
                .with_precision_and_scale(38, 0)?,
        ),
        TypeTag::Duration => Arc::new(collect_array!(
            IntervalMonthDayNanoArray,
            CqlValue::Duration { months, days, nanos } =>
                IntervalMonthDayNanoType::make_value(*months, *days, *nanos)
        )),
        TypeTag::Uuid | TypeTag::TimeUuid => {
            let items = values
                .iter()
                .map(|value| match value {
                    None => Ok(None),
                    Some(CqlValue::Uuid(bytes)) => Ok(Some(bytes)),
                    Some(other) => Err(mismatch(other)),
                })
                .collect::<Result<Vec<_>, SstableError>>()?;
            Arc::new(FixedSizeBinaryArray::try_from_sparse_iter_with_size(
                items.into_iter(),
                16,
            )?)
        }
        TypeTag::Empty => Arc::new(NullArray::new(values.len())),
        TypeTag::List { element, .. } | TypeTag::Set { element, .. } => {
            list_array(column, tag, element, values, &mismatch)?
        }
        TypeTag::Map { key, value, .. } => map_array(column, key, value, values, &mismatch)?,
    };
    Ok(array)
}

fn list_array(
    column: &str,
    tag: &TypeTag,
    element: &TypeTag,
    values: &[Option<CqlValue>],
    mismatch: &dyn Fn(&CqlValue) -> SstableError,
) -> Result<ArrayRef, SstableError> {
    let mut lengths = Vec::with_capacity(values.len());
    let mut validity = Vec::with_capacity(values.len());
    let mut children = Vec::new();
    for value in values {
        match (tag, value) {
            (_, None) => {
                lengths.push(0);
                validity.push(false);
            }
            (TypeTag::List { .. }, Some(CqlValue::List(items)))
            | (TypeTag::Set { .. }, Some(CqlValue::Set(items))) => {
                lengths.push(items.len());
                validity.push(true);
                children.extend(items.iter().cloned().map(Some));
            }
            (_, Some(other)) => return Err(mismatch(other)),
        }
    }

    let child = to_arrow_array(column, element, &children)?;
    Ok(Arc::new(ListArray::try_new(
        list_item_field(element),
        OffsetBuffer::from_lengths(lengths),
        child,
        Some(NullBuffer::from(validity)),
    )?))
}

fn map_array(
    column: &str,
    key: &TypeTag,
    value: &TypeTag,
    values: &[Option<CqlValue>],
    mismatch: &dyn Fn(&CqlValue) -> SstableError,
) -> Result<ArrayRef, SstableError> {
    let mut lengths = Vec::with_capacity(values.len());
    let mut validity = Vec::with_capacity(values.len());
    let mut keys = Vec::new();
    let mut items = Vec::new();
    for entry in values {
        match entry {
            None => {
                lengths.push(0);
                validity.push(false);
            }
            Some(CqlValue::Map(entries)) => {
                lengths.push(entries.len());
                validity.push(true);
                for (k, v) in entries {
                    keys.push(Some(k.clone()));
                    items.push(Some(v.clone()));
                }
            }
            Some(other) => return Err(mismatch(other)),
        }
    }

    let entries = StructArray::try_new(
        map_entry_fields(key, value),
        vec![
            to_arrow_array(column, key, &keys)?,
            to_arrow_array(column, value, &items)?,
        ],
        None,
    )?;
    Ok(Arc::new(MapArray::try_new(
        map_entries_field(key, value),
        OffsetBuffer::from_lengths(lengths),
        entries,
        Some(NullBuffer::from(validity)),
        false,
    )?))
}
