//! This module defines the canonical, type-safe representation of the column
//! types declared in an SSTable statistics header.
//!
//! The statistics file names each type by its fully-qualified marshal class,
//! e.g. `org.apache.cassandra.db.marshal.Int32Type` or
//! `org.apache.cassandra.db.marshal.MapType(...UTF8Type,...Int32Type)`.
//! [`TypeTag::from_type_name`] turns those strings into a closed enum so the
//! rest of the decoder never inspects type names again.

use arrow::datatypes::{DataType as ArrowDataType, Field, Fields, IntervalUnit, TimeUnit};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::error::SstableError;

/// The closed set of column types the decoder understands.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Boolean,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    Text,
    Ascii,
    Blob,
    Timestamp,
    Date,
    Time,
    Uuid,
    TimeUuid,
    Decimal,
    Varint,
    Inet,
    Duration,
    Empty,
    List { element: Box<TypeTag>, frozen: bool },
    Set { element: Box<TypeTag>, frozen: bool },
    Map { key: Box<TypeTag>, value: Box<TypeTag>, frozen: bool },
    /// Multi-component partition keys only.
    Composite(Vec<TypeTag>),
}

impl TypeTag {
    //==============================================================================
    // Parsing
    //==============================================================================

    /// Parses a marshal type name from the statistics header.
    pub fn from_type_name(name: &str) -> Result<Self, SstableError> {
        let (class, params) = split_type_name(name)?;
        let unsupported = || SstableError::UnsupportedType(name.to_string());

        let tag = match (class, params.as_slice()) {
            ("BooleanType", []) => TypeTag::Boolean,
            ("ByteType", []) => TypeTag::TinyInt,
            ("ShortType", []) => TypeTag::SmallInt,
            ("Int32Type", []) => TypeTag::Int,
            ("LongType", []) => TypeTag::BigInt,
            ("FloatType", []) => TypeTag::Float,
            ("DoubleType", []) => TypeTag::Double,
            ("UTF8Type", []) => TypeTag::Text,
            ("AsciiType", []) => TypeTag::Ascii,
            ("BytesType", []) => TypeTag::Blob,
            ("TimestampType", []) | ("DateType", []) => TypeTag::Timestamp,
            ("SimpleDateType", []) => TypeTag::Date,
            ("TimeType", []) => TypeTag::Time,
            ("UUIDType", []) | ("LexicalUUIDType", []) => TypeTag::Uuid,
            ("TimeUUIDType", []) => TypeTag::TimeUuid,
            ("DecimalType", []) => TypeTag::Decimal,
            ("IntegerType", []) => TypeTag::Varint,
            ("InetAddressType", []) => TypeTag::Inet,
            ("DurationType", []) => TypeTag::Duration,
            ("EmptyType", []) => TypeTag::Empty,
            ("ReversedType", [inner]) => Self::from_type_name(inner)?,
            ("FrozenType", [inner]) => Self::from_type_name(inner)?.frozen(),
            ("ListType", [element]) => TypeTag::List {
                element: Box::new(Self::from_type_name(element)?),
                frozen: false,
            },
            ("SetType", [element]) => TypeTag::Set {
                element: Box::new(Self::from_type_name(element)?),
                frozen: false,
            },
            ("MapType", [key, value]) => TypeTag::Map {
                key: Box::new(Self::from_type_name(key)?),
                value: Box::new(Self::from_type_name(value)?),
                frozen: false,
            },
            ("CompositeType", components) if !components.is_empty() => TypeTag::Composite(
                components
                    .iter()
                    .map(|c| Self::from_type_name(c))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            _ => return Err(unsupported()),
        };
        Ok(tag)
    }

    /// Marks a collection as frozen. Frozen collections are stored as a single
    /// serialized cell; frozen primitives are unchanged.
    fn frozen(self) -> Self {
        match self {
            TypeTag::List { element, .. } => TypeTag::List { element, frozen: true },
            TypeTag::Set { element, .. } => TypeTag::Set { element, frozen: true },
            TypeTag::Map { key, value, .. } => TypeTag::Map {
                key,
                value,
                frozen: true,
            },
            other => other,
        }
    }

    //==============================================================================
    // Layout properties
    //==============================================================================

    /// The serialized width of values of this type when it is fixed, `None`
    /// when values are written with a vint length prefix.
    pub fn fixed_length(&self) -> Option<usize> {
        match self {
            TypeTag::Boolean => Some(1),
            TypeTag::Int | TypeTag::Float | TypeTag::Date => Some(4),
            TypeTag::BigInt | TypeTag::Double | TypeTag::Timestamp | TypeTag::Time => Some(8),
            TypeTag::Uuid | TypeTag::TimeUuid => Some(16),
            TypeTag::Empty => Some(0),
            _ => None,
        }
    }

    /// A complex column stores one cell per collection element.
    pub fn is_complex(&self) -> bool {
        matches!(
            self,
            TypeTag::List { frozen: false, .. }
                | TypeTag::Set { frozen: false, .. }
                | TypeTag::Map { frozen: false, .. }
        )
    }

    /// The (path, value) types of one element of a non-frozen collection: a
    /// timeuuid path for lists, the element as path for sets, key and value
    /// for maps.
    pub fn element_types(&self) -> Option<(&TypeTag, &TypeTag)> {
        static TIMEUUID: TypeTag = TypeTag::TimeUuid;
        static EMPTY: TypeTag = TypeTag::Empty;
        match self {
            TypeTag::List { element, .. } => Some((&TIMEUUID, &**element)),
            TypeTag::Set { element, .. } => Some((&**element, &EMPTY)),
            TypeTag::Map { key, value, .. } => Some((&**key, &**value)),
            _ => None,
        }
    }

    //==============================================================================
    // Arrow mapping
    //==============================================================================

    /// Converts a `TypeTag` into the Arrow `DataType` of its column buffer.
    pub fn to_arrow_type(&self) -> ArrowDataType {
        match self {
            TypeTag::Boolean => ArrowDataType::Boolean,
            TypeTag::TinyInt => ArrowDataType::Int8,
            TypeTag::SmallInt => ArrowDataType::Int16,
            TypeTag::Int => ArrowDataType::Int32,
            TypeTag::BigInt => ArrowDataType::Int64,
            TypeTag::Float => ArrowDataType::Float32,
            TypeTag::Double => ArrowDataType::Float64,
            TypeTag::Text | TypeTag::Ascii | TypeTag::Decimal | TypeTag::Inet => ArrowDataType::Utf8,
            TypeTag::Blob | TypeTag::Composite(_) => ArrowDataType::Binary,
            TypeTag::Timestamp => {
                ArrowDataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into()))
            }
            TypeTag::Date => ArrowDataType::Date32,
            TypeTag::Time => ArrowDataType::Time64(TimeUnit::Nanosecond),
            TypeTag::Uuid | TypeTag::TimeUuid => ArrowDataType::FixedSizeBinary(16),
            TypeTag::Varint => ArrowDataType::Decimal128(38, 0),
            TypeTag::Duration => ArrowDataType::Interval(IntervalUnit::MonthDayNano),
            TypeTag::Empty => ArrowDataType::Null,
            TypeTag::List { element, .. } | TypeTag::Set { element, .. } => {
                ArrowDataType::List(list_item_field(element))
            }
            TypeTag::Map { key, value, .. } => ArrowDataType::Map(map_entries_field(key, value), false),
        }
    }
}

/// The child field of a list column buffer.
pub(crate) fn list_item_field(element: &TypeTag) -> Arc<Field> {
    Arc::new(Field::new("item", element.to_arrow_type(), true))
}

/// The entries field of a map column buffer.
pub(crate) fn map_entries_field(key: &TypeTag, value: &TypeTag) -> Arc<Field> {
    Arc::new(Field::new(
        "entries",
        ArrowDataType::Struct(map_entry_fields(key, value)),
        false,
    ))
}

pub(crate) fn map_entry_fields(key: &TypeTag, value: &TypeTag) -> Fields {
    Fields::from(vec![
        Field::new("key", key.to_arrow_type(), false),
        Field::new("value", value.to_arrow_type(), true),
    ])
}

/// Splits `pkg.ClassName(p1,p2(...))` into the bare class name and its
/// top-level parameters, respecting nested parentheses.
fn split_type_name(name: &str) -> Result<(&str, Vec<&str>), SstableError> {
    let name = name.trim();
    let malformed = || SstableError::UnsupportedType(name.to_string());

    let (head, params) = match name.find('(') {
        Some(open) => {
            if !name.ends_with(')') {
                return Err(malformed());
            }
            (&name[..open], &name[open + 1..name.len() - 1])
        }
        None => (name, ""),
    };
    let class = head.rsplit('.').next().unwrap_or(head);

    let mut parts = Vec::new();
    if !params.is_empty() {
        let mut depth = 0usize;
        let mut start = 0usize;
        for (i, c) in params.char_indices() {
            match c {
                '(' => depth += 1,
                ')' => depth = depth.checked_sub(1).ok_or_else(malformed)?,
                ',' if depth == 0 => {
                    parts.push(params[start..i].trim());
                    start = i + 1;
                }
                _ => {}
            }
        }
        if depth != 0 {
            return Err(malformed());
        }
        parts.push(params[start..].trim());
    }
    Ok((class, parts))
}

/// Provides the CQL spelling of a type, used by the structure dump.
impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frozen = |f: &mut fmt::Formatter<'_>, is_frozen: bool, inner: String| {
            if is_frozen {
                write!(f, "frozen<{}>", inner)
            } else {
                write!(f, "{}", inner)
            }
        };
        match self {
            TypeTag::Boolean => write!(f, "boolean"),
            TypeTag::TinyInt => write!(f, "tinyint"),
            TypeTag::SmallInt => write!(f, "smallint"),
            TypeTag::Int => write!(f, "int"),
            TypeTag::BigInt => write!(f, "bigint"),
            TypeTag::Float => write!(f, "float"),
            TypeTag::Double => write!(f, "double"),
            TypeTag::Text => write!(f, "text"),
            TypeTag::Ascii => write!(f, "ascii"),
            TypeTag::Blob => write!(f, "blob"),
            TypeTag::Timestamp => write!(f, "timestamp"),
            TypeTag::Date => write!(f, "date"),
            TypeTag::Time => write!(f, "time"),
            TypeTag::Uuid => write!(f, "uuid"),
            TypeTag::TimeUuid => write!(f, "timeuuid"),
            TypeTag::Decimal => write!(f, "decimal"),
            TypeTag::Varint => write!(f, "varint"),
            TypeTag::Inet => write!(f, "inet"),
            TypeTag::Duration => write!(f, "duration"),
            TypeTag::Empty => write!(f, "empty"),
            TypeTag::List { element, frozen: z } => frozen(f, *z, format!("list<{}>", element)),
            TypeTag::Set { element, frozen: z } => frozen(f, *z, format!("set<{}>", element)),
            TypeTag::Map { key, value, frozen: z } => {
                frozen(f, *z, format!("map<{}, {}>", key, value))
            }
            TypeTag::Composite(components) => {
                let inner: Vec<String> = components.iter().map(|c| c.to_string()).collect();
                write!(f, "composite<{}>", inner.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const M: &str = "org.apache.cassandra.db.marshal.";

    #[test]
    fn test_primitive_type_names() {
        assert_eq!(TypeTag::from_type_name(&format!("{}Int32Type", M)).unwrap(), TypeTag::Int);
        assert_eq!(TypeTag::from_type_name(&format!("{}UTF8Type", M)).unwrap(), TypeTag::Text);
        assert_eq!(TypeTag::from_type_name("BooleanType").unwrap(), TypeTag::Boolean);
        assert_eq!(TypeTag::Int.fixed_length(), Some(4));
        assert_eq!(TypeTag::Text.fixed_length(), None);
    }

    #[test]
    fn test_nested_collection_type_names() {
        let name = format!(
            "{m}MapType({m}UTF8Type,{m}FrozenType({m}ListType({m}Int32Type)))",
            m = M
        );
        let tag = TypeTag::from_type_name(&name).unwrap();
        assert_eq!(
            tag,
            TypeTag::Map {
                key: Box::new(TypeTag::Text),
                value: Box::new(TypeTag::List {
                    element: Box::new(TypeTag::Int),
                    frozen: true
                }),
                frozen: false,
            }
        );
        assert!(tag.is_complex());
        assert_eq!(tag.to_string(), "map<text, frozen<list<int>>>");
    }

    #[test]
    fn test_reversed_clustering_type_is_unwrapped() {
        let name = format!("{m}ReversedType({m}TimestampType)", m = M);
        assert_eq!(TypeTag::from_type_name(&name).unwrap(), TypeTag::Timestamp);
    }

    #[test]
    fn test_frozen_set_is_simple() {
        let name = format!("{m}FrozenType({m}SetType({m}UTF8Type))", m = M);
        let tag = TypeTag::from_type_name(&name).unwrap();
        assert!(!tag.is_complex());
        assert_eq!(tag.fixed_length(), None);
    }

    #[test]
    fn test_unsupported_type_names() {
        for name in [
            format!("{}CounterColumnType", M),
            format!("{m}UserType(ks,61646472657373,7374726565743a{m}UTF8Type)", m = M),
            format!("{m}ListType({m}Int32Type", m = M),
            format!("{m}MapType({m}Int32Type)", m = M),
        ] {
            let result = TypeTag::from_type_name(&name);
            assert!(
                matches!(result, Err(SstableError::UnsupportedType(_))),
                "{} should be unsupported",
                name
            );
        }
    }
}
