//! Index key value and codec (spec.md §3 "Index key", §4.1 "Key codec").
//!
//! Grounded on the teacher's `storage/tuple/cell.rs` (`Cell` enum with a
//! `to_bytes`/`Encodeable` impl per variant) and `btree/tuple.rs`
//! (fixed-width on-disk tuple layout), generalized from the teacher's
//! single-type `IntField` world into the multi-type `Cell` the spec
//! requires (OID, VARCHAR, INT, BIGINT) plus a bound-bit NULL bitmap.
//!
//! Design Notes §9 suggests `SmallVec<Cell>` for `IdxKey::cells`; this
//! crate uses a plain `Vec<Cell>` instead (no example repo in the
//! retrieval pack pulls in `smallvec`, and the teacher's own composite
//! structures are plain `Vec`s throughout) — see DESIGN.md.

use bit_vec::BitVec;

use crate::config::BTREE_MAX_KEYLEN;
use crate::error::SmallError;
use crate::types::{Oid, SmallResult};

/// The declared type of one user attribute cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellType {
    Int,
    BigInt,
    VarChar,
    /// Only ever used for the trailing row-identifier cell.
    Oid,
}

/// A single cell value of an `IdxKey`. `Null` cells carry no payload
/// bytes on disk (spec.md §3): the bound-bit bitmap is what distinguishes
/// "this cell is NULL" from "this cell is 0 / empty string".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Null,
    Int(i32),
    BigInt(i64),
    VarChar(String),
    Oid(Oid),
}

impl Cell {
    pub fn cell_type(&self) -> Option<CellType> {
        match self {
            Cell::Null => None,
            Cell::Int(_) => Some(CellType::Int),
            Cell::BigInt(_) => Some(CellType::BigInt),
            Cell::VarChar(_) => Some(CellType::VarChar),
            Cell::Oid(_) => Some(CellType::Oid),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Type-min/-max sentinel, used by `coerce` to pad a partial key.
    pub fn sentinel(ty: CellType, min: bool) -> Cell {
        match (ty, min) {
            (CellType::Int, true) => Cell::Int(i32::MIN),
            (CellType::Int, false) => Cell::Int(i32::MAX),
            (CellType::BigInt, true) => Cell::BigInt(i64::MIN),
            (CellType::BigInt, false) => Cell::BigInt(i64::MAX),
            (CellType::VarChar, true) => Cell::VarChar(String::new()),
            (CellType::VarChar, false) => Cell::VarChar(String::from('\u{10FFFF}')),
            (CellType::Oid, true) => Cell::Oid(Oid::MIN),
            (CellType::Oid, false) => Cell::Oid(Oid::MAX),
        }
    }

    fn encode(&self) -> Vec<u8> {
        match self {
            Cell::Null => Vec::new(),
            Cell::Int(v) => v.to_be_bytes().to_vec(),
            Cell::BigInt(v) => v.to_be_bytes().to_vec(),
            Cell::VarChar(s) => {
                let bytes = s.as_bytes();
                let mut out = (bytes.len() as u16).to_be_bytes().to_vec();
                out.extend_from_slice(bytes);
                out
            }
            Cell::Oid(o) => {
                let mut out = Vec::with_capacity(8);
                out.extend_from_slice(&o.volid.to_be_bytes());
                out.extend_from_slice(&o.pageid.to_be_bytes());
                out.extend_from_slice(&o.slotid.to_be_bytes());
                out
            }
        }
    }

    fn decode(ty: CellType, bytes: &[u8], cursor: &mut usize) -> Cell {
        match ty {
            CellType::Int => {
                let v = i32::from_be_bytes(bytes[*cursor..*cursor + 4].try_into().unwrap());
                *cursor += 4;
                Cell::Int(v)
            }
            CellType::BigInt => {
                let v = i64::from_be_bytes(bytes[*cursor..*cursor + 8].try_into().unwrap());
                *cursor += 8;
                Cell::BigInt(v)
            }
            CellType::VarChar => {
                let len = u16::from_be_bytes(bytes[*cursor..*cursor + 2].try_into().unwrap()) as usize;
                *cursor += 2;
                let s = String::from_utf8(bytes[*cursor..*cursor + len].to_vec()).unwrap();
                *cursor += len;
                Cell::VarChar(s)
            }
            CellType::Oid => {
                let volid = i16::from_be_bytes(bytes[*cursor..*cursor + 2].try_into().unwrap());
                let pageid = i32::from_be_bytes(bytes[*cursor + 2..*cursor + 6].try_into().unwrap());
                let slotid = i16::from_be_bytes(bytes[*cursor + 6..*cursor + 8].try_into().unwrap());
                *cursor += 8;
                Cell::Oid(Oid::new(volid, pageid, slotid))
            }
        }
    }
}

/// Result of comparing two cells/keys (spec.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareResult {
    Lt,
    Eq,
    Gt,
    Unknown,
}

impl CompareResult {
    fn flip(self) -> Self {
        match self {
            CompareResult::Lt => CompareResult::Gt,
            CompareResult::Gt => CompareResult::Lt,
            other => other,
        }
    }
}

/// One declared index column: its type and sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub ty: CellType,
    pub descending: bool,
}

/// The cached class representation a `BtidInt` carries: column types,
/// asc/desc flags, and whether the index enforces uniqueness
/// (spec.md §3 "Tree descriptor").
#[derive(Debug, Clone)]
pub struct IndexSchema {
    /// The `N` user attribute columns, in key order. The trailing OID
    /// cell is implicit and always `CellType::Oid`/ascending.
    pub columns: Vec<ColumnSpec>,
    pub unique: bool,
}

impl IndexSchema {
    pub fn new(columns: Vec<ColumnSpec>, unique: bool) -> Self {
        Self { columns, unique }
    }

    /// Number of user attributes (`N` in spec.md §3), not counting the
    /// trailing OID cell.
    pub fn num_attrs(&self) -> usize {
        self.columns.len()
    }

    /// Total cell count, `N + 1` including the trailing OID.
    pub fn total_cells(&self) -> usize {
        self.columns.len() + 1
    }

    fn cell_type_at(&self, col: usize) -> CellType {
        if col < self.columns.len() {
            self.columns[col].ty
        } else {
            CellType::Oid
        }
    }

    fn descending_at(&self, col: usize) -> bool {
        if col < self.columns.len() {
            self.columns[col].descending
        } else {
            false
        }
    }
}

/// An ordered tuple of `N` user attribute values plus a trailing OID,
/// with a per-cell bound bitmap (spec.md §3, GLOSSARY).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdxKey {
    cells: Vec<Cell>,
}

impl IdxKey {
    /// Construct a key from already-typed cells. `cells` must already be
    /// in column order and include the trailing OID cell if this is a
    /// leaf-record key (enforced by `new_leaf`).
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    /// Construct a leaf key: disallow a NULL trailing OID, per Design
    /// Notes §9 ("disallow constructing a leaf key whose trailing OID is
    /// NULL").
    pub fn new_leaf(mut attrs: Vec<Cell>, oid: Oid) -> Self {
        attrs.push(Cell::Oid(oid));
        Self { cells: attrs }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// `get_oid_from_key` (spec.md §4.1): the trailing cell, which must
    /// be a non-NULL `Oid` on a leaf key.
    pub fn oid(&self) -> Oid {
        match self.cells.last() {
            Some(Cell::Oid(o)) => *o,
            _ => panic!("IdxKey::oid called on a key with no trailing OID cell"),
        }
    }

    fn bound_bitmap(&self) -> BitVec<u32> {
        let mut bits = BitVec::from_elem(self.cells.len(), false);
        for (i, cell) in self.cells.iter().enumerate() {
            bits.set(i, !cell.is_null());
        }
        bits
    }
}

/// Which side of a partial key `coerce` should pad towards (spec.md
/// §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Min,
    Max,
}

/// `coerce(key, index_metadata, num_terms, min_or_max)`: pad a partial
/// key of `k <= N` user cells with type-min/-max per column, according to
/// the requested bound and each column's ascending/descending flag, and
/// fill the trailing OID cell likewise. After coerce the key has exactly
/// `N + 1` cells.
pub fn coerce(schema: &IndexSchema, mut partial: Vec<Cell>, num_terms: usize, bound: Bound) -> IdxKey {
    assert!(num_terms <= schema.num_attrs());
    partial.truncate(num_terms);

    for col in num_terms..schema.num_attrs() {
        let spec = schema.columns[col];
        // A descending column's "low" value is the type max and vice
        // versa, so the coerced key still bounds the subtree correctly
        // once `compare` flips the sign for descending columns.
        let want_min = match bound {
            Bound::Min => !spec.descending,
            Bound::Max => spec.descending,
        };
        partial.push(Cell::sentinel(spec.ty, want_min));
    }

    let oid_min = matches!(bound, Bound::Min);
    partial.push(Cell::sentinel(CellType::Oid, oid_min));

    IdxKey::new(partial)
}

/// `write_record(key, node_kind)`: serialize a key into its on-disk
/// record form (spec.md §4.1).
///
/// Layout: `[child VPID if internal][bound bitmap][bound cell
/// payloads...]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Leaf,
    Internal,
}

pub fn write_record(
    key: &IdxKey,
    kind: NodeKind,
    child: Option<crate::types::Vpid>,
) -> Result<Vec<u8>, SmallError> {
    let mut out = Vec::new();

    if kind == NodeKind::Internal {
        let vpid = child.expect("internal records must carry a child VPID");
        out.extend_from_slice(&vpid.page_id.to_be_bytes());
        out.extend_from_slice(&vpid.volume_id.to_be_bytes());
    }

    let bitmap = key.bound_bitmap();
    out.extend_from_slice(&bitmap.to_bytes());

    for cell in key.cells() {
        if !cell.is_null() {
            out.extend_from_slice(&cell.encode());
        }
    }

    if out.len() > BTREE_MAX_KEYLEN {
        return Err(SmallError::BtreeMaxKeyLen { len: out.len() });
    }

    Ok(out)
}

/// `read_record(bytes, node_kind)`: inverse of `write_record`. The caller
/// supplies the schema so variable-width/NULL cells can be located.
pub fn read_record(
    schema: &IndexSchema,
    bytes: &[u8],
    kind: NodeKind,
) -> (IdxKey, Option<crate::types::Vpid>) {
    let mut cursor = 0usize;

    let child = if kind == NodeKind::Internal {
        let pageid = i32::from_be_bytes(bytes[0..4].try_into().unwrap());
        let volid = i16::from_be_bytes(bytes[4..6].try_into().unwrap());
        cursor += 6;
        Some(crate::types::Vpid::new(volid, pageid))
    } else {
        None
    };

    let total_cells = schema.total_cells();
    let bitmap_len = crate::util::ceil_div(total_cells, 8);
    let bitmap = BitVec::<u32>::from_bytes(&bytes[cursor..cursor + bitmap_len]);
    cursor += bitmap_len;

    let mut cells = Vec::with_capacity(total_cells);
    for col in 0..total_cells {
        if bitmap[col] {
            cells.push(Cell::decode(schema.cell_type_at(col), bytes, &mut cursor));
        } else {
            cells.push(Cell::Null);
        }
    }

    (IdxKey::new(cells), child)
}

/// `key_length(key)`: the byte length `write_record` would produce for a
/// leaf record (no child VPID prefix).
pub fn key_length(key: &IdxKey) -> usize {
    let bitmap_len = crate::util::ceil_div(key.num_cells(), 8);
    let payload: usize = key.cells().iter().map(|c| c.encode().len()).sum();
    bitmap_len + payload
}

fn compare_cells(a: &Cell, b: &Cell) -> CompareResult {
    match (a, b) {
        (Cell::Null, Cell::Null) => CompareResult::Eq,
        // SQL-style NULL ordering: NULL sorts before any real value, and
        // this only matters for non-key-defining comparisons since a
        // leaf key's trailing OID is never NULL.
        (Cell::Null, _) => CompareResult::Lt,
        (_, Cell::Null) => CompareResult::Gt,
        (Cell::Int(x), Cell::Int(y)) => ord_to_cmp(x.cmp(y)),
        (Cell::BigInt(x), Cell::BigInt(y)) => ord_to_cmp(x.cmp(y)),
        (Cell::VarChar(x), Cell::VarChar(y)) => ord_to_cmp(x.cmp(y)),
        (Cell::Oid(x), Cell::Oid(y)) => ord_to_cmp(x.cmp(y)),
        _ => CompareResult::Unknown,
    }
}

fn ord_to_cmp(o: std::cmp::Ordering) -> CompareResult {
    match o {
        std::cmp::Ordering::Less => CompareResult::Lt,
        std::cmp::Ordering::Equal => CompareResult::Eq,
        std::cmp::Ordering::Greater => CompareResult::Gt,
    }
}

/// `compare(k1, k2, hint_start_col)`: walk cells left-to-right starting
/// at `*hint_start_col`, updating the hint to the first differing
/// column, flipping the sign on descending columns. On the trailing OID
/// cell, equal non-leaf keys compare as if the OID were `+inf` (so a
/// non-leaf separator with an infinity OID never compares `Lt` against a
/// leaf key that matches on all user attributes).
pub fn compare(
    schema: &IndexSchema,
    k1: &IdxKey,
    k2: &IdxKey,
    hint_start_col: &mut usize,
) -> CompareResult {
    let total = schema.total_cells().min(k1.num_cells()).min(k2.num_cells());

    for col in *hint_start_col..total {
        let is_oid_col = col == schema.num_attrs();
        let (c1, c2) = (&k1.cells()[col], &k2.cells()[col]);

        let result = if is_oid_col {
            match (c1, c2) {
                (Cell::Oid(o), _) if *o == Oid::MAX => CompareResult::Eq,
                (_, Cell::Oid(o)) if *o == Oid::MAX => CompareResult::Eq,
                _ => compare_cells(c1, c2),
            }
        } else {
            compare_cells(c1, c2)
        };

        if result == CompareResult::Unknown {
            *hint_start_col = col;
            return CompareResult::Unknown;
        }

        if result != CompareResult::Eq {
            *hint_start_col = col;
            if !is_oid_col && schema.descending_at(col) {
                return result.flip();
            }
            return result;
        }
    }

    *hint_start_col = total;
    CompareResult::Eq
}

/// Convenience wrapper over `compare` for call sites that don't need to
/// reuse a hint across repeated comparisons (e.g. a one-off predicate
/// check).
pub fn compare_full(schema: &IndexSchema, k1: &IdxKey, k2: &IdxKey) -> CompareResult {
    let mut hint = 0;
    compare(schema, k1, k2, &mut hint)
}

/// Total ordering helper for use in binary search, panicking on
/// `Unknown` exactly as spec.md §4.1 requires ("propagates up as a hard
/// error").
pub fn must_compare(schema: &IndexSchema, k1: &IdxKey, k2: &IdxKey) -> std::cmp::Ordering {
    match compare_full(schema, k1, k2) {
        CompareResult::Lt => std::cmp::Ordering::Less,
        CompareResult::Eq => std::cmp::Ordering::Equal,
        CompareResult::Gt => std::cmp::Ordering::Greater,
        CompareResult::Unknown => panic!("key comparison yielded Unknown (type coercion failure)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_oid_schema() -> IndexSchema {
        IndexSchema::new(vec![ColumnSpec { ty: CellType::Int, descending: false }], false)
    }

    #[test]
    fn round_trip_leaf_record() {
        let schema = int_oid_schema();
        let key = IdxKey::new_leaf(vec![Cell::Int(42)], Oid::new(0, 7, 1));
        let bytes = write_record(&key, NodeKind::Leaf, None).unwrap();
        let (decoded, child) = read_record(&schema, &bytes, NodeKind::Leaf);
        assert_eq!(decoded, key);
        assert!(child.is_none());
    }

    #[test]
    fn round_trip_internal_record() {
        let schema = int_oid_schema();
        let key = IdxKey::new_leaf(vec![Cell::Int(7)], Oid::MAX);
        let vpid = crate::types::Vpid::new(0, 99);
        let bytes = write_record(&key, NodeKind::Internal, Some(vpid)).unwrap();
        let (decoded, child) = read_record(&schema, &bytes, NodeKind::Internal);
        assert_eq!(decoded, key);
        assert_eq!(child, Some(vpid));
    }

    #[test]
    fn compare_is_reflexive_and_antisymmetric() {
        let schema = int_oid_schema();
        let a = IdxKey::new_leaf(vec![Cell::Int(1)], Oid::new(0, 1, 0));
        let b = IdxKey::new_leaf(vec![Cell::Int(2)], Oid::new(0, 1, 1));

        assert_eq!(compare_full(&schema, &a, &a), CompareResult::Eq);

        let ab = compare_full(&schema, &a, &b);
        let ba = compare_full(&schema, &b, &a);
        assert_eq!(ab, CompareResult::Lt);
        assert_eq!(ba, CompareResult::Gt);
    }

    #[test]
    fn descending_column_flips_sign() {
        let schema = IndexSchema::new(
            vec![ColumnSpec { ty: CellType::Int, descending: true }],
            false,
        );
        let a = IdxKey::new_leaf(vec![Cell::Int(1)], Oid::new(0, 1, 0));
        let b = IdxKey::new_leaf(vec![Cell::Int(2)], Oid::new(0, 1, 1));
        // Ascending, 1 < 2; descending column flips it to Gt.
        assert_eq!(compare_full(&schema, &a, &b), CompareResult::Gt);
    }

    #[test]
    fn coerce_pads_to_n_plus_one_cells() {
        let schema = IndexSchema::new(
            vec![
                ColumnSpec { ty: CellType::Int, descending: false },
                ColumnSpec { ty: CellType::VarChar, descending: false },
            ],
            false,
        );
        let key = coerce(&schema, vec![Cell::Int(5)], 1, Bound::Min);
        assert_eq!(key.num_cells(), 3);
        assert_eq!(key.cells()[0], Cell::Int(5));
        assert_eq!(key.cells()[1], Cell::VarChar(String::new()));
        assert_eq!(key.cells()[2], Cell::Oid(Oid::MIN));
    }

    #[test]
    fn max_key_len_is_enforced() {
        let schema = IndexSchema::new(
            vec![ColumnSpec { ty: CellType::VarChar, descending: false }],
            false,
        );
        let _ = schema;
        let huge = "x".repeat(1000);
        let key = IdxKey::new_leaf(vec![Cell::VarChar(huge)], Oid::new(0, 1, 0));
        let err = write_record(&key, NodeKind::Leaf, None).unwrap_err();
        assert!(matches!(err, SmallError::BtreeMaxKeyLen { .. }));
    }
}
