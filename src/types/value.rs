//! Typed cell values and the type-driven decoding of their serialized bytes.

use byteorder::{BigEndian, ByteOrder};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::SstableError;
use crate::kernels::ByteCursor;
use crate::types::TypeTag;

/// `SimpleDateType` stores days as an unsigned integer with the Unix epoch at 2^31.
const DATE_EPOCH_OFFSET: i64 = 1 << 31;

/// A decoded, typed value. Ascii and UTF-8 text share `Text`; uuid and
/// timeuuid share `Uuid`.
#[derive(Debug, Clone, PartialEq)]
pub enum CqlValue {
    Boolean(bool),
    TinyInt(i8),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Float(f32),
    Double(f64),
    Text(String),
    Blob(Vec<u8>),
    /// Milliseconds since the Unix epoch.
    Timestamp(i64),
    /// Days since the Unix epoch.
    Date(i32),
    /// Nanoseconds since midnight.
    Time(i64),
    Uuid([u8; 16]),
    Decimal { unscaled: i128, scale: i32 },
    Varint(i128),
    Inet(IpAddr),
    Duration { months: i32, days: i32, nanos: i64 },
    List(Vec<CqlValue>),
    Set(Vec<CqlValue>),
    Map(Vec<(CqlValue, CqlValue)>),
}

impl CqlValue {
    /// Whether the runtime shape of this value is a legal inhabitant of `tag`.
    pub fn matches(&self, tag: &TypeTag) -> bool {
        match (self, tag) {
            (CqlValue::Boolean(_), TypeTag::Boolean)
            | (CqlValue::TinyInt(_), TypeTag::TinyInt)
            | (CqlValue::SmallInt(_), TypeTag::SmallInt)
            | (CqlValue::Int(_), TypeTag::Int)
            | (CqlValue::BigInt(_), TypeTag::BigInt)
            | (CqlValue::Float(_), TypeTag::Float)
            | (CqlValue::Double(_), TypeTag::Double)
            | (CqlValue::Text(_), TypeTag::Text | TypeTag::Ascii)
            | (CqlValue::Blob(_), TypeTag::Blob | TypeTag::Composite(_))
            | (CqlValue::Timestamp(_), TypeTag::Timestamp)
            | (CqlValue::Date(_), TypeTag::Date)
            | (CqlValue::Time(_), TypeTag::Time)
            | (CqlValue::Uuid(_), TypeTag::Uuid | TypeTag::TimeUuid)
            | (CqlValue::Decimal { .. }, TypeTag::Decimal)
            | (CqlValue::Varint(_), TypeTag::Varint)
            | (CqlValue::Inet(_), TypeTag::Inet)
            | (CqlValue::Duration { .. }, TypeTag::Duration) => true,
            (CqlValue::List(items), TypeTag::List { element, .. })
            | (CqlValue::Set(items), TypeTag::Set { element, .. }) => {
                items.iter().all(|v| v.matches(element))
            }
            (CqlValue::Map(entries), TypeTag::Map { key, value, .. }) => entries
                .iter()
                .all(|(k, v)| k.matches(key) && v.matches(value)),
            _ => false,
        }
    }

    /// The short name of the value's shape, used in coercion errors.
    pub fn kind(&self) -> &'static str {
        match self {
            CqlValue::Boolean(_) => "boolean",
            CqlValue::TinyInt(_) => "tinyint",
            CqlValue::SmallInt(_) => "smallint",
            CqlValue::Int(_) => "int",
            CqlValue::BigInt(_) => "bigint",
            CqlValue::Float(_) => "float",
            CqlValue::Double(_) => "double",
            CqlValue::Text(_) => "text",
            CqlValue::Blob(_) => "blob",
            CqlValue::Timestamp(_) => "timestamp",
            CqlValue::Date(_) => "date",
            CqlValue::Time(_) => "time",
            CqlValue::Uuid(_) => "uuid",
            CqlValue::Decimal { .. } => "decimal",
            CqlValue::Varint(_) => "varint",
            CqlValue::Inet(_) => "inet",
            CqlValue::Duration { .. } => "duration",
            CqlValue::List(_) => "list",
            CqlValue::Set(_) => "set",
            CqlValue::Map(_) => "map",
        }
    }
}

//==================================================================================
// 1. Value Decoding
//==================================================================================

/// Decodes the raw bytes of a non-empty value according to its declared type.
/// `column` only labels errors.
pub fn decode_value(column: &str, tag: &TypeTag, bytes: &[u8]) -> Result<CqlValue, SstableError> {
    let expect_len = |n: usize| {
        if bytes.len() == n {
            Ok(())
        } else {
            Err(SstableError::coercion(
                column,
                format!("{} value must be {} bytes, got {}", tag, n, bytes.len()),
            ))
        }
    };

    let value = match tag {
        TypeTag::Boolean => {
            expect_len(1)?;
            CqlValue::Boolean(bytes[0] != 0)
        }
        TypeTag::TinyInt => {
            expect_len(1)?;
            CqlValue::TinyInt(bytes[0] as i8)
        }
        TypeTag::SmallInt => {
            expect_len(2)?;
            CqlValue::SmallInt(BigEndian::read_i16(bytes))
        }
        TypeTag::Int => {
            expect_len(4)?;
            CqlValue::Int(BigEndian::read_i32(bytes))
        }
        TypeTag::BigInt => {
            expect_len(8)?;
            CqlValue::BigInt(BigEndian::read_i64(bytes))
        }
        TypeTag::Float => {
            expect_len(4)?;
            CqlValue::Float(BigEndian::read_f32(bytes))
        }
        TypeTag::Double => {
            expect_len(8)?;
            CqlValue::Double(BigEndian::read_f64(bytes))
        }
        TypeTag::Text | TypeTag::Ascii => CqlValue::Text(
            std::str::from_utf8(bytes)
                .map_err(|_| SstableError::coercion(column, "text value is not valid UTF-8"))?
                .to_string(),
        ),
        TypeTag::Blob | TypeTag::Composite(_) => CqlValue::Blob(bytes.to_vec()),
        TypeTag::Timestamp => {
            expect_len(8)?;
            CqlValue::Timestamp(BigEndian::read_i64(bytes))
        }
        TypeTag::Date => {
            expect_len(4)?;
            let days = BigEndian::read_u32(bytes) as i64 - DATE_EPOCH_OFFSET;
            CqlValue::Date(days as i32)
        }
        TypeTag::Time => {
            expect_len(8)?;
            CqlValue::Time(BigEndian::read_i64(bytes))
        }
        TypeTag::Uuid | TypeTag::TimeUuid => {
            expect_len(16)?;
            let mut uuid = [0u8; 16];
            uuid.copy_from_slice(bytes);
            CqlValue::Uuid(uuid)
        }
        TypeTag::Decimal => {
            if bytes.len() < 4 {
                return Err(SstableError::coercion(column, "decimal value is missing its scale"));
            }
            let scale = BigEndian::read_i32(&bytes[..4]);
            let unscaled = read_big_integer(column, &bytes[4..])?;
            CqlValue::Decimal { unscaled, scale }
        }
        TypeTag::Varint => CqlValue::Varint(read_big_integer(column, bytes)?),
        TypeTag::Inet => match bytes.len() {
            4 => CqlValue::Inet(IpAddr::V4(Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]))),
            16 => {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(bytes);
                CqlValue::Inet(IpAddr::V6(Ipv6Addr::from(octets)))
            }
            n => {
                return Err(SstableError::coercion(
                    column,
                    format!("inet value must be 4 or 16 bytes, got {}", n),
                ))
            }
        },
        TypeTag::Duration => {
            let mut cursor = ByteCursor::new(bytes);
            let mut component = || {
                cursor
                    .read_signed_vint()
                    .map_err(|e| value_shape_error(column, tag, e))
            };
            let months = component()?;
            let days = component()?;
            let nanos = component()?;
            let narrow = |v: i64| {
                i32::try_from(v)
                    .map_err(|_| SstableError::coercion(column, "duration component exceeds 32 bits"))
            };
            CqlValue::Duration {
                months: narrow(months)?,
                days: narrow(days)?,
                nanos,
            }
        }
        TypeTag::Empty => {
            return Err(SstableError::coercion(column, "empty type cannot carry a value"))
        }
        TypeTag::List { element, .. } => CqlValue::List(
            decode_frozen_elements(column, element, bytes).map_err(|e| value_shape_error(column, tag, e))?,
        ),
        TypeTag::Set { element, .. } => CqlValue::Set(
            decode_frozen_elements(column, element, bytes).map_err(|e| value_shape_error(column, tag, e))?,
        ),
        TypeTag::Map { key, value, .. } => CqlValue::Map(
            decode_frozen_map(column, key, value, bytes).map_err(|e| value_shape_error(column, tag, e))?,
        ),
    };
    Ok(value)
}

/// Overruns and bad vints inside one value's own bytes are shape errors of
/// that value, not of the row around it.
fn value_shape_error(column: &str, tag: &TypeTag, error: SstableError) -> SstableError {
    match error {
        SstableError::TruncatedInput { needed, remaining, .. } => SstableError::coercion(
            column,
            format!(
                "{} value is too short: needed {} byte(s), {} remained",
                tag, needed, remaining
            ),
        ),
        SstableError::MalformedVarint { reason, .. } => {
            SstableError::coercion(column, format!("{} value holds a malformed vint: {}", tag, reason))
        }
        other => other,
    }
}

/// Decodes a zero-length value. Only textual and binary types have a
/// meaningful empty value; every other type projects it as null.
pub fn decode_empty_value(tag: &TypeTag) -> Option<CqlValue> {
    match tag {
        TypeTag::Text | TypeTag::Ascii => Some(CqlValue::Text(String::new())),
        TypeTag::Blob => Some(CqlValue::Blob(Vec::new())),
        _ => None,
    }
}

/// Reads a big-endian two's complement integer of arbitrary length into an i128.
fn read_big_integer(column: &str, bytes: &[u8]) -> Result<i128, SstableError> {
    if bytes.is_empty() {
        return Ok(0);
    }
    if bytes.len() > 16 {
        return Err(SstableError::coercion(
            column,
            format!("integer of {} bytes exceeds 128 bits", bytes.len()),
        ));
    }
    // Seed with the sign so that shifting in bytes performs sign extension.
    let seed: i128 = if bytes[0] & 0x80 != 0 { -1 } else { 0 };
    Ok(bytes
        .iter()
        .fold(seed, |acc, &b| (acc << 8) | b as i128))
}

/// Frozen collections use the native-protocol layout: an `i32` element count,
/// then each element as an `i32` length (negative for null) and its bytes.
fn read_frozen_item<'a>(cursor: &mut ByteCursor<'a>) -> Result<Option<&'a [u8]>, SstableError> {
    let len = cursor.read_i32()?;
    if len < 0 {
        return Ok(None);
    }
    cursor.read_bytes(len as usize).map(Some)
}

fn decode_element(column: &str, tag: &TypeTag, bytes: Option<&[u8]>) -> Result<CqlValue, SstableError> {
    match bytes {
        Some([]) => decode_empty_value(tag)
            .ok_or_else(|| SstableError::coercion(column, "collection element is empty")),
        Some(b) => decode_value(column, tag, b),
        None => Err(SstableError::coercion(column, "collection element is null")),
    }
}

fn frozen_count(column: &str, cursor: &mut ByteCursor<'_>) -> Result<usize, SstableError> {
    let count = cursor.read_i32()?;
    usize::try_from(count)
        .map_err(|_| SstableError::coercion(column, format!("negative collection size {}", count)))
}

fn decode_frozen_elements(
    column: &str,
    element: &TypeTag,
    bytes: &[u8],
) -> Result<Vec<CqlValue>, SstableError> {
    let mut cursor = ByteCursor::new(bytes);
    let count = frozen_count(column, &mut cursor)?;
    let mut items = Vec::with_capacity(count.min(bytes.len()));
    for _ in 0..count {
        let raw = read_frozen_item(&mut cursor)?;
        items.push(decode_element(column, element, raw)?);
    }
    Ok(items)
}

fn decode_frozen_map(
    column: &str,
    key: &TypeTag,
    value: &TypeTag,
    bytes: &[u8],
) -> Result<Vec<(CqlValue, CqlValue)>, SstableError> {
    let mut cursor = ByteCursor::new(bytes);
    let count = frozen_count(column, &mut cursor)?;
    let mut entries = Vec::with_capacity(count.min(bytes.len()));
    for _ in 0..count {
        let k = read_frozen_item(&mut cursor)?;
        let v = read_frozen_item(&mut cursor)?;
        entries.push((decode_element(column, key, k)?, decode_element(column, value, v)?));
    }
    Ok(entries)
}

//==================================================================================
// 2. Partition Keys
//==================================================================================

/// Decodes a partition key into one value per key component.
///
/// Composite keys store each component as a `u16` length, the component bytes
/// and a single end-of-component byte.
pub fn decode_partition_key(tag: &TypeTag, key: &[u8]) -> Result<Vec<Option<CqlValue>>, SstableError> {
    let decode_one = |component: &TypeTag, bytes: &[u8]| {
        if bytes.is_empty() {
            Ok(decode_empty_value(component))
        } else {
            decode_value("partition_key", component, bytes).map(Some)
        }
    };

    match tag {
        TypeTag::Composite(components) => {
            let mut cursor = ByteCursor::new(key);
            let mut values = Vec::with_capacity(components.len());
            for component in components {
                let bytes = cursor.read_short_length_bytes()?;
                cursor.read_u8()?;
                values.push(decode_one(component, bytes)?);
            }
            Ok(values)
        }
        single => Ok(vec![decode_one(single, key)?]),
    }
}

//==================================================================================
// 3. Display
//==================================================================================

/// Formats an unscaled integer with a decimal scale, e.g. (12345, 2) -> "123.45".
pub fn format_decimal(unscaled: i128, scale: i32) -> String {
    let negative = unscaled < 0;
    let digits = unscaled.unsigned_abs().to_string();
    let body = if scale <= 0 {
        let mut s = digits;
        if unscaled != 0 {
            s.extend(std::iter::repeat('0').take(scale.unsigned_abs() as usize));
        }
        s
    } else {
        let scale = scale as usize;
        let padded = if digits.len() <= scale {
            format!("{}{}", "0".repeat(scale - digits.len() + 1), digits)
        } else {
            digits
        };
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        format!("{}.{}", int_part, frac_part)
    };
    if negative {
        format!("-{}", body)
    } else {
        body
    }
}

fn format_uuid(bytes: &[u8; 16]) -> String {
    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

impl fmt::Display for CqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |items: &[CqlValue]| {
            items.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ")
        };
        match self {
            CqlValue::Boolean(v) => write!(f, "{}", v),
            CqlValue::TinyInt(v) => write!(f, "{}", v),
            CqlValue::SmallInt(v) => write!(f, "{}", v),
            CqlValue::Int(v) => write!(f, "{}", v),
            CqlValue::BigInt(v) => write!(f, "{}", v),
            CqlValue::Float(v) => write!(f, "{}", v),
            CqlValue::Double(v) => write!(f, "{}", v),
            CqlValue::Text(v) => write!(f, "{:?}", v),
            CqlValue::Blob(v) => {
                write!(f, "0x")?;
                v.iter().try_for_each(|b| write!(f, "{:02x}", b))
            }
            CqlValue::Timestamp(v) => write!(f, "{}ms", v),
            CqlValue::Date(v) => write!(f, "day {}", v),
            CqlValue::Time(v) => write!(f, "{}ns", v),
            CqlValue::Uuid(v) => write!(f, "{}", format_uuid(v)),
            CqlValue::Decimal { unscaled, scale } => write!(f, "{}", format_decimal(*unscaled, *scale)),
            CqlValue::Varint(v) => write!(f, "{}", v),
            CqlValue::Inet(v) => write!(f, "{}", v),
            CqlValue::Duration { months, days, nanos } => write!(f, "{}mo{}d{}ns", months, days, nanos),
            CqlValue::List(items) => write!(f, "[{}]", join(items)),
            CqlValue::Set(items) => write!(f, "{{{}}}", join(items)),
            CqlValue::Map(entries) => {
                let inner: Vec<String> = entries.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                write!(f, "{{{}}}", inner.join(", "))
            }
        }
    }
}
