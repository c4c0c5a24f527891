// In: src/sstable/unfiltered.rs

//! The logical model produced by the data parser.
//!
//! Everything here borrows from the decode session: partition keys point into
//! the data buffer and cells point at their `ColumnDef` in the schema, so a
//! `Partition<'a>` lives exactly as long as the buffer and registry it was
//! decoded from.

use crate::sstable::schema::{ColumnDef, NO_DELETION_TIME, NO_TTL};
use crate::types::{CqlValue, TypeTag};

//==================================================================================
// 1. Deletion & Liveness
//==================================================================================

/// A deletion marker: the write timestamp at which data was deleted and the
/// local (server) time of the deletion in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletionTime {
    pub marked_for_delete_at: i64,
    pub local_deletion_time: i32,
}

impl DeletionTime {
    pub const LIVE: DeletionTime = DeletionTime {
        marked_for_delete_at: i64::MIN,
        local_deletion_time: i32::MAX,
    };

    pub fn is_live(&self) -> bool {
        self.marked_for_delete_at == i64::MIN && self.local_deletion_time == i32::MAX
    }

    /// Whether data written at `timestamp` is covered by this deletion.
    pub fn deletes(&self, timestamp: i64) -> bool {
        !self.is_live() && timestamp <= self.marked_for_delete_at
    }
}

/// Row-level liveness: the primary-key timestamp and optional expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessInfo {
    pub timestamp: Option<i64>,
    pub ttl: i32,
    pub local_expiration_time: i32,
}

impl LivenessInfo {
    pub const EMPTY: LivenessInfo = LivenessInfo {
        timestamp: None,
        ttl: NO_TTL,
        local_expiration_time: NO_DELETION_TIME,
    };

    pub fn is_empty(&self) -> bool {
        self.timestamp.is_none()
    }

    pub fn is_expiring(&self) -> bool {
        self.ttl != NO_TTL
    }
}

//==================================================================================
// 2. Cells
//==================================================================================

/// A single-valued cell.
///
/// `local_deletion_time` and `ttl` carry the `NO_DELETION_TIME` / `NO_TTL`
/// sentinels when the cell neither expires nor is deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell<'a> {
    pub column: &'a ColumnDef,
    pub is_live: bool,
    pub timestamp: i64,
    pub local_deletion_time: i32,
    pub ttl: i32,
    pub value: Option<CqlValue>,
}

impl Cell<'_> {
    pub fn is_expiring(&self) -> bool {
        self.ttl != NO_TTL
    }

    /// `true` when the cell is live, and not expired as of `now` (seconds).
    pub fn is_live_at(&self, now: Option<i32>) -> bool {
        self.is_live && !expired(self.ttl, self.local_deletion_time, now)
    }
}

/// One element of a non-frozen collection. The path identifies the element:
/// a timeuuid for lists, the element itself for sets, the key for maps.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexCell {
    pub path: CqlValue,
    pub is_live: bool,
    pub timestamp: i64,
    pub local_deletion_time: i32,
    pub ttl: i32,
    pub value: Option<CqlValue>,
}

impl ComplexCell {
    pub fn is_live_at(&self, now: Option<i32>) -> bool {
        self.is_live && !expired(self.ttl, self.local_deletion_time, now)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComplexColumn<'a> {
    pub column: &'a ColumnDef,
    pub deletion: Option<DeletionTime>,
    pub cells: Vec<ComplexCell>,
}

impl ComplexColumn<'_> {
    /// Assembles the live elements into a single collection value, or `None`
    /// when no element survives.
    pub fn materialize(&self, now: Option<i32>) -> Option<CqlValue> {
        let live = self.cells.iter().filter(|c| {
            c.is_live_at(now) && !self.deletion.map_or(false, |d| d.deletes(c.timestamp))
        });

        let value = match &self.column.type_tag {
            TypeTag::List { .. } => {
                CqlValue::List(live.filter_map(|c| c.value.clone()).collect())
            }
            TypeTag::Set { .. } => CqlValue::Set(live.map(|c| c.path.clone()).collect()),
            TypeTag::Map { .. } => CqlValue::Map(
                live.filter_map(|c| c.value.clone().map(|v| (c.path.clone(), v)))
                    .collect(),
            ),
            _ => return None,
        };

        let is_empty = match &value {
            CqlValue::List(items) | CqlValue::Set(items) => items.is_empty(),
            CqlValue::Map(entries) => entries.is_empty(),
            _ => false,
        };
        (!is_empty).then_some(value)
    }

    fn has_live_data(&self) -> bool {
        self.materialize(None).is_some()
    }
}

/// The data of one column within a row.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData<'a> {
    Simple(Cell<'a>),
    Complex(ComplexColumn<'a>),
}

impl<'a> ColumnData<'a> {
    pub fn column(&self) -> &'a ColumnDef {
        match self {
            ColumnData::Simple(cell) => cell.column,
            ColumnData::Complex(complex) => complex.column,
        }
    }

    /// The value projected into a column buffer.
    pub fn project(&self, now: Option<i32>) -> Option<CqlValue> {
        match self {
            ColumnData::Simple(cell) if cell.is_live_at(now) => cell.value.clone(),
            ColumnData::Simple(_) => None,
            ColumnData::Complex(complex) => complex.materialize(now),
        }
    }
}

fn expired(ttl: i32, local_deletion_time: i32, now: Option<i32>) -> bool {
    ttl != NO_TTL && now.map_or(false, |now| local_deletion_time <= now)
}

//==================================================================================
// 3. Rows & Range Tombstone Markers
//==================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Row<'a> {
    pub is_static: bool,
    /// One entry per clustering column; empty for the static row.
    pub clustering: Vec<Option<CqlValue>>,
    pub liveness: LivenessInfo,
    pub deletion: Option<DeletionTime>,
    pub shadowable_deletion: bool,
    /// Aligned with the static or regular columns of the schema; `None`
    /// where the row omits a column.
    pub cells: Vec<Option<ColumnData<'a>>>,
}

impl Row<'_> {
    /// Whether the row carries a primary-key liveness or any live cell.
    pub fn has_live_data(&self) -> bool {
        !self.liveness.is_empty()
            || self.cells.iter().flatten().any(|data| match data {
                ColumnData::Simple(cell) => cell.is_live,
                ColumnData::Complex(complex) => complex.has_live_data(),
            })
    }

    /// A row tombstone: deleted, with nothing written after the deletion.
    pub fn is_tombstone(&self) -> bool {
        self.deletion.is_some() && !self.has_live_data()
    }
}

/// The eight clustering bound kinds, in their on-disk ordinal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundKind {
    ExclEndBound,
    InclStartBound,
    ExclEndInclStartBoundary,
    StaticClustering,
    Clustering,
    InclEndExclStartBoundary,
    InclEndBound,
    ExclStartBound,
}

impl BoundKind {
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Some(match ordinal {
            0 => BoundKind::ExclEndBound,
            1 => BoundKind::InclStartBound,
            2 => BoundKind::ExclEndInclStartBoundary,
            3 => BoundKind::StaticClustering,
            4 => BoundKind::Clustering,
            5 => BoundKind::InclEndExclStartBoundary,
            6 => BoundKind::InclEndBound,
            7 => BoundKind::ExclStartBound,
            _ => return None,
        })
    }

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Only bounds and boundaries can start a range tombstone marker.
    pub fn is_marker_kind(self) -> bool {
        !matches!(self, BoundKind::StaticClustering | BoundKind::Clustering)
    }

    pub fn is_boundary(self) -> bool {
        matches!(
            self,
            BoundKind::ExclEndInclStartBoundary | BoundKind::InclEndExclStartBoundary
        )
    }

    pub fn is_start(self) -> bool {
        matches!(self, BoundKind::InclStartBound | BoundKind::ExclStartBound) || self.is_boundary()
    }

    pub fn is_end(self) -> bool {
        matches!(self, BoundKind::InclEndBound | BoundKind::ExclEndBound) || self.is_boundary()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerDeletion {
    Bound(DeletionTime),
    /// Closes one range and opens the next at the same clustering.
    Boundary {
        end: DeletionTime,
        start: DeletionTime,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeTombstoneMarker {
    pub bound_kind: BoundKind,
    /// The bound's clustering prefix; may be shorter than the clustering key.
    pub clustering: Vec<Option<CqlValue>>,
    pub deletion: MarkerDeletion,
}

impl RangeTombstoneMarker {
    /// The deletion this marker opens, or closes when it is an end bound.
    pub fn deletion_time(&self) -> DeletionTime {
        match self.deletion {
            MarkerDeletion::Bound(deletion) => deletion,
            MarkerDeletion::Boundary { start, .. } => start,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Unfiltered<'a> {
    Row(Row<'a>),
    RangeTombstoneMarker(RangeTombstoneMarker),
}

//==================================================================================
// 4. Partitions
//==================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct PartitionHeader<'a> {
    pub key: &'a [u8],
    /// `None` when the partition is not deleted.
    pub deletion: Option<DeletionTime>,
    /// Absolute offset of the partition within the data file.
    pub offset: u64,
}

/// A fully decoded partition.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition<'a> {
    pub key: &'a [u8],
    pub deletion: Option<DeletionTime>,
    pub offset: u64,
    pub static_row: Option<Row<'a>>,
    pub entries: Vec<Unfiltered<'a>>,
}

impl<'a> Partition<'a> {
    pub fn rows(&self) -> impl Iterator<Item = &Row<'a>> + '_ {
        self.entries.iter().filter_map(|e| match e {
            Unfiltered::Row(row) => Some(row),
            Unfiltered::RangeTombstoneMarker(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sstable::schema::ColumnRole;

    fn list_column() -> ColumnDef {
        ColumnDef {
            name: "tags".into(),
            type_tag: TypeTag::List {
                element: Box::new(TypeTag::Text),
                frozen: false,
            },
            role: ColumnRole::Regular,
            position: 0,
        }
    }

    fn element(timestamp: i64, text: &str) -> ComplexCell {
        ComplexCell {
            path: CqlValue::Uuid([timestamp as u8; 16]),
            is_live: true,
            timestamp,
            local_deletion_time: NO_DELETION_TIME,
            ttl: NO_TTL,
            value: Some(CqlValue::Text(text.into())),
        }
    }

    #[test]
    fn test_complex_deletion_shadows_older_elements() {
        let column = list_column();
        let complex = ComplexColumn {
            column: &column,
            deletion: Some(DeletionTime {
                marked_for_delete_at: 10,
                local_deletion_time: 100,
            }),
            cells: vec![element(5, "old"), element(11, "new")],
        };
        assert_eq!(
            complex.materialize(None),
            Some(CqlValue::List(vec![CqlValue::Text("new".into())]))
        );
    }

    #[test]
    fn test_expiry_only_applies_with_a_reference_time() {
        let column = list_column();
        let mut cell = element(1, "x");
        cell.ttl = 60;
        cell.local_deletion_time = 1_000;
        assert!(cell.is_live_at(None));
        assert!(cell.is_live_at(Some(999)));
        assert!(!cell.is_live_at(Some(1_000)));

        let complex = ComplexColumn {
            column: &column,
            deletion: None,
            cells: vec![cell],
        };
        assert_eq!(complex.materialize(Some(2_000)), None);
    }

    #[test]
    fn test_row_tombstone_detection() {
        let row = Row {
            is_static: false,
            clustering: vec![],
            liveness: LivenessInfo::EMPTY,
            deletion: Some(DeletionTime {
                marked_for_delete_at: 1,
                local_deletion_time: 1,
            }),
            shadowable_deletion: false,
            cells: vec![None],
        };
        assert!(row.is_tombstone());
        assert!(!DeletionTime::LIVE.deletes(0));
        assert!(BoundKind::ExclEndInclStartBoundary.is_start());
        assert!(BoundKind::ExclEndInclStartBoundary.is_end());
        assert!(!BoundKind::Clustering.is_marker_kind());
    }
}
