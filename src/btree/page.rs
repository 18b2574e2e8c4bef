//! Slotted B+tree node pages (spec.md §4.1).
//!
//! Grounded on the teacher's `btree::page` (`PageCategory`, `BTreePageID`,
//! `BTreeLeafPage`/`BTreeInternalPage` with a `BitVec` occupancy header
//! and forward/reverse iterators), generalized from a fixed-width tuple
//! scheme to variable-length `IdxKey` records: the teacher's flat
//! `Vec<Tuple>` + bit header becomes a classic slot directory
//! (offset/length pairs) since a VARCHAR column means records no longer
//! share one size.

use bit_vec::BitVec;

use crate::config;
use crate::error::SmallError;
use crate::key::{self, read_record, write_record, Bound, IdxKey, IndexSchema, NodeKind};
use crate::types::{Oid, Vpid};

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum PageCategory {
    RootPointer,
    Header,
    Internal,
    Leaf,
}

impl std::fmt::Display for PageCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            PageCategory::RootPointer => "ROOT_POINTER",
            PageCategory::Header => "HEADER",
            PageCategory::Internal => "INTERNAL",
            PageCategory::Leaf => "LEAF",
        };
        write!(f, "{}", s)
    }
}

/// Identifies a page within one index's file (spec.md §4.1, §4.12).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BTreePageId {
    pub category: PageCategory,
    pub index_id: i32,
    pub vpid: Vpid,
}

impl BTreePageId {
    pub fn new(category: PageCategory, index_id: i32, vpid: Vpid) -> Self {
        Self { category, index_id, vpid }
    }
}

impl std::fmt::Display for BTreePageId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "<{} idx={} {}>", self.category, self.index_id, self.vpid)
    }
}

/// Fields shared by leaf and internal pages: the slotted-record body
/// plus split-pivot bookkeeping (spec.md §4.1, §4.3: "running sample
/// count" used to pick the next split point).
#[derive(Clone)]
struct SlottedBody {
    bytes: Vec<u8>,
    /// One entry per logical slot, in key order: `(offset, len)` into
    /// `bytes`. No tombstones: `delete` removes the entry outright, so
    /// a slot index is always valid for exactly as long as no other
    /// slot at a lower index is removed.
    slots: Vec<(usize, usize)>,
    free_offset: usize,
}

impl SlottedBody {
    fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0u8; capacity],
            slots: Vec::new(),
            free_offset: 0,
        }
    }

    fn free_space(&self) -> usize {
        self.bytes.len().saturating_sub(self.free_offset)
    }

    /// Append a record's bytes at the end of the backing array and
    /// insert its slot entry at logical position `pos`.
    fn insert_at(&mut self, pos: usize, record: &[u8]) -> Result<(), SmallError> {
        if record.len() > self.free_space() {
            return Err(SmallError::page_corrupted("<pending>", "page full"));
        }
        let start = self.free_offset;
        self.bytes[start..start + record.len()].copy_from_slice(record);
        self.free_offset += record.len();
        self.slots.insert(pos.min(self.slots.len()), (start, record.len()));
        Ok(())
    }

    fn remove(&mut self, slot: usize) {
        self.slots.remove(slot);
    }

    fn record_bytes(&self, slot: usize) -> &[u8] {
        let (start, len) = self.slots[slot];
        &self.bytes[start..start + len]
    }

    fn occupied_count(&self) -> usize {
        self.slots.len()
    }

    /// Repack the backing array so records sit contiguously from offset
    /// 0 in slot order, reclaiming space left behind by deletions.
    fn compact(&mut self) {
        let records: Vec<Vec<u8>> = (0..self.slots.len()).map(|i| self.record_bytes(i).to_vec()).collect();
        self.slots.clear();
        self.free_offset = 0;
        for r in records {
            let pos = self.slots.len();
            let _ = self.insert_at(pos, &r);
        }
    }
}

/// A B+tree leaf page: holds `IdxKey`s with their trailing OID in
/// ascending key order (spec.md §4.1).
#[derive(Clone)]
pub struct BTreeLeafPage {
    pid: BTreePageId,
    parent: Option<BTreePageId>,
    prev_sibling: Option<Vpid>,
    next_sibling: Option<Vpid>,
    body: SlottedBody,
    /// Running count of splits at this node, used to damp the split
    /// pivot toward 50% over time (spec.md §4.3).
    pub split_sample_count: u32,
    #[cfg(debug_assertions)]
    pub low_fence: Option<IdxKey>,
    #[cfg(debug_assertions)]
    pub high_fence: Option<IdxKey>,
}

impl BTreeLeafPage {
    pub fn empty(pid: BTreePageId) -> Self {
        Self {
            pid,
            parent: None,
            prev_sibling: None,
            next_sibling: None,
            body: SlottedBody::new(config::page_size()),
            split_sample_count: 0,
            #[cfg(debug_assertions)]
            low_fence: None,
            #[cfg(debug_assertions)]
            high_fence: None,
        }
    }

    pub fn pid(&self) -> BTreePageId {
        self.pid
    }

    pub fn parent(&self) -> Option<BTreePageId> {
        self.parent
    }

    pub fn set_parent(&mut self, pid: Option<BTreePageId>) {
        self.parent = pid;
    }

    pub fn prev_sibling(&self) -> Option<Vpid> {
        self.prev_sibling
    }

    pub fn set_prev_sibling(&mut self, vpid: Option<Vpid>) {
        self.prev_sibling = vpid;
    }

    pub fn next_sibling(&self) -> Option<Vpid> {
        self.next_sibling
    }

    pub fn set_next_sibling(&mut self, vpid: Option<Vpid>) {
        self.next_sibling = vpid;
    }

    pub fn free_space(&self) -> usize {
        self.body.free_space()
    }

    pub fn tuple_count(&self) -> usize {
        self.body.occupied_count()
    }

    /// Keys in ascending slot order.
    pub fn keys(&self, schema: &IndexSchema) -> Vec<IdxKey> {
        (0..self.body.slots.len())
            .map(|i| read_record(schema, self.body.record_bytes(i), NodeKind::Leaf).0)
            .collect()
    }

    /// Insert `key` keeping the page in ascending order (spec.md §4.3).
    /// Returns an error rather than splitting: splitting is the
    /// descent layer's job.
    pub fn insert(&mut self, schema: &IndexSchema, key: &IdxKey) -> Result<(), SmallError> {
        let record = write_record(key, NodeKind::Leaf, None)?;
        let pos = self.find_insert_pos(schema, key);
        self.body.insert_at(pos, &record)
    }

    fn find_insert_pos(&self, schema: &IndexSchema, key: &IdxKey) -> usize {
        let existing = self.keys(schema);
        let mut hint = 0usize;
        for (i, k) in existing.iter().enumerate() {
            if key::compare(schema, key, k, &mut hint) == key::CompareResult::Lt {
                return i;
            }
        }
        existing.len()
    }

    pub fn delete_at(&mut self, slot: usize) {
        self.body.remove(slot);
    }

    /// Physically overwrite (or remove) one slot's raw record bytes
    /// without re-deriving them from an `IdxKey` (spec.md §4.11
    /// `RVBT_NDRECORD_*`): `bytes = Some(..)` installs those exact bytes
    /// at `slot` (replacing whatever was there), `bytes = None` removes
    /// the slot outright. Used by recovery redo/undo replay, which works
    /// from logged before/after byte images rather than re-running the
    /// higher-level insert/delete that produced them.
    pub fn set_slot_bytes(&mut self, slot: usize, bytes: Option<&[u8]>) -> Result<(), SmallError> {
        if slot < self.body.slots.len() {
            self.body.remove(slot);
        }
        if let Some(bytes) = bytes {
            self.body.insert_at(slot, bytes)?;
        }
        Ok(())
    }

    pub fn find_slot(&self, schema: &IndexSchema, key: &IdxKey) -> Option<usize> {
        let mut hint = 0usize;
        self.keys(schema)
            .iter()
            .position(|k| key::compare(schema, k, key, &mut hint) == key::CompareResult::Eq)
    }

    pub fn compact(&mut self) {
        self.body.compact();
    }

    pub fn oid_at(&self, schema: &IndexSchema, slot: usize) -> Oid {
        read_record(schema, self.body.record_bytes(slot), NodeKind::Leaf).0.oid()
    }

    /// Serialize the page out to a fixed-size on-disk image.
    pub fn to_page_bytes(&self) -> Vec<u8> {
        self.body.bytes.clone()
    }
}

/// A B+tree internal (non-leaf) page: separator keys paired with child
/// page pointers, `children.len() == keys.len() + 1` (spec.md §4.1).
#[derive(Clone)]
pub struct BTreeInternalPage {
    pid: BTreePageId,
    parent: Option<BTreePageId>,
    keys: Vec<IdxKey>,
    children: Vec<Vpid>,
    pub node_level: u32,
    pub split_sample_count: u32,
    #[cfg(debug_assertions)]
    pub low_fence: Option<IdxKey>,
    #[cfg(debug_assertions)]
    pub high_fence: Option<IdxKey>,
}

impl BTreeInternalPage {
    pub fn empty(pid: BTreePageId, node_level: u32) -> Self {
        Self {
            pid,
            parent: None,
            keys: Vec::new(),
            children: Vec::new(),
            node_level,
            split_sample_count: 0,
            #[cfg(debug_assertions)]
            low_fence: None,
            #[cfg(debug_assertions)]
            high_fence: None,
        }
    }

    pub fn pid(&self) -> BTreePageId {
        self.pid
    }

    pub fn parent(&self) -> Option<BTreePageId> {
        self.parent
    }

    pub fn set_parent(&mut self, pid: Option<BTreePageId>) {
        self.parent = pid;
    }

    pub fn keys(&self) -> &[IdxKey] {
        &self.keys
    }

    pub fn children(&self) -> &[Vpid] {
        &self.children
    }

    pub fn entry_count(&self) -> usize {
        self.keys.len()
    }

    /// A page with exactly one child and no separators yet — the seed a
    /// split rebuilds a half-page from via repeated `insert_after` calls
    /// (spec.md §4.3 split propagation).
    pub fn single_child(pid: BTreePageId, node_level: u32, child: Vpid) -> Self {
        Self {
            pid,
            parent: None,
            keys: Vec::new(),
            children: vec![child],
            node_level,
            split_sample_count: 0,
            #[cfg(debug_assertions)]
            low_fence: None,
            #[cfg(debug_assertions)]
            high_fence: None,
        }
    }

    pub fn new_root(left: Vpid, separator: IdxKey, right: Vpid, pid: BTreePageId, node_level: u32) -> Self {
        Self {
            pid,
            parent: None,
            keys: vec![separator],
            children: vec![left, right],
            node_level,
            split_sample_count: 0,
            #[cfg(debug_assertions)]
            low_fence: None,
            #[cfg(debug_assertions)]
            high_fence: None,
        }
    }

    /// Child index whose subtree covers `key` (spec.md §4.2
    /// `search_nonleaf`): the last child whose separator is `<= key`.
    pub fn child_for(&self, schema: &IndexSchema, key: &IdxKey) -> Vpid {
        let mut hint = 0usize;
        let mut idx = 0usize;
        for (i, sep) in self.keys.iter().enumerate() {
            match key::compare(schema, key, sep, &mut hint) {
                key::CompareResult::Lt => break,
                _ => idx = i + 1,
            }
        }
        self.children[idx]
    }

    /// Insert a new separator/right-child pair after the child at
    /// `left_child_idx` (spec.md §4.3 split propagation).
    pub fn insert_after(&mut self, left_child_idx: usize, separator: IdxKey, right_child: Vpid) {
        self.keys.insert(left_child_idx, separator);
        self.children.insert(left_child_idx + 1, right_child);
    }

    pub fn child_index(&self, child: Vpid) -> Option<usize> {
        self.children.iter().position(|&c| c == child)
    }

    /// Remove the separator to the left of `child_idx` and the child
    /// pointer itself (spec.md §4.4 merge collapse).
    pub fn remove_child(&mut self, child_idx: usize) {
        if child_idx == 0 {
            self.keys.remove(0);
        } else {
            self.keys.remove(child_idx - 1);
        }
        self.children.remove(child_idx);
    }

    pub fn free_space_estimate(&self, schema: &IndexSchema) -> usize {
        let used: usize = self
            .keys
            .iter()
            .map(|k| write_record(k, NodeKind::Internal, Some(Vpid::NULL)).map(|b| b.len()).unwrap_or(0))
            .sum::<usize>()
            + self.children.len() * 8;
        let _ = schema;
        config::page_size().saturating_sub(used)
    }
}

/// Always page 0 of the file: points at the current root (spec.md
/// §4.1 "the root page's identity changes across splits/merges, so a
/// stable pointer page is needed").
#[derive(Clone)]
pub struct BTreeRootPointerPage {
    root: Vpid,
    header: Vpid,
    /// `node_level` of the current root, so a descent can pick the right
    /// `PageCategory` (leaf vs. internal) for the root vpid before ever
    /// reading it (spec.md §4.2).
    root_level: u32,
}

impl BTreeRootPointerPage {
    pub fn new(root: Vpid, header: Vpid) -> Self {
        Self { root, header, root_level: 1 }
    }

    pub fn root(&self) -> Vpid {
        self.root
    }

    pub fn root_level(&self) -> u32 {
        self.root_level
    }

    pub fn set_root(&mut self, root: Vpid, level: u32) {
        self.root = root;
        self.root_level = level;
    }

    pub fn header(&self) -> Vpid {
        self.header
    }
}

/// Free-page bitmap page (spec.md §4.12 `IndexFile::alloc_pages`).
#[derive(Clone)]
pub struct BTreeHeaderPage {
    bitmap: BitVec,
}

impl BTreeHeaderPage {
    pub fn new(capacity: usize) -> Self {
        Self {
            bitmap: BitVec::from_elem(capacity, false),
        }
    }

    pub fn is_free(&self, slot: usize) -> bool {
        slot >= self.bitmap.len() || !self.bitmap[slot]
    }

    pub fn mark_used(&mut self, slot: usize) {
        if slot >= self.bitmap.len() {
            self.bitmap.grow(slot + 1 - self.bitmap.len(), false);
        }
        self.bitmap.set(slot, true);
    }

    pub fn mark_free(&mut self, slot: usize) {
        if slot < self.bitmap.len() {
            self.bitmap.set(slot, false);
        }
    }

    pub fn next_free(&self) -> usize {
        for i in 0..self.bitmap.len() {
            if !self.bitmap[i] {
                return i;
            }
        }
        self.bitmap.len()
    }
}

/// A fence key is a debug-only consistency check (spec.md §9 Design
/// Notes); this helper is used after split/merge to assert that a
/// page's resident keys still lie within its fence bounds.
#[cfg(debug_assertions)]
pub fn assert_within_fence(schema: &IndexSchema, key: &IdxKey, low: &Option<IdxKey>, high: &Option<IdxKey>) {
    let mut hint = 0usize;
    if let Some(low) = low {
        debug_assert_ne!(key::compare(schema, key, low, &mut hint), key::CompareResult::Lt);
    }
    if let Some(high) = high {
        debug_assert_ne!(key::compare(schema, key, high, &mut hint), key::CompareResult::Gt);
    }
}

pub fn min_sentinel(schema: &IndexSchema) -> IdxKey {
    key::coerce(schema, vec![], 0, Bound::Min)
}

pub fn max_sentinel(schema: &IndexSchema) -> IdxKey {
    key::coerce(schema, vec![], 0, Bound::Max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{Cell, CellType, ColumnSpec};

    fn schema() -> IndexSchema {
        IndexSchema {
            columns: vec![ColumnSpec { ty: CellType::Int, descending: false }],
            unique: true,
        }
    }

    fn leaf_key(n: i32, slot: i16) -> IdxKey {
        IdxKey::new_leaf(vec![Cell::Int(n)], Oid::new(0, 1, slot))
    }

    #[test]
    fn insert_keeps_ascending_order() {
        let schema = schema();
        let pid = BTreePageId::new(PageCategory::Leaf, 1, Vpid::new(0, 1));
        let mut page = BTreeLeafPage::empty(pid);
        page.insert(&schema, &leaf_key(5, 0)).unwrap();
        page.insert(&schema, &leaf_key(1, 1)).unwrap();
        page.insert(&schema, &leaf_key(3, 2)).unwrap();

        let keys = page.keys(&schema);
        let vals: Vec<i32> = keys
            .iter()
            .map(|k| match &k.cells()[0] {
                Cell::Int(v) => *v,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(vals, vec![1, 3, 5]);
    }

    #[test]
    fn internal_child_for_picks_right_subtree() {
        let schema = schema();
        let pid = BTreePageId::new(PageCategory::Internal, 1, Vpid::new(0, 2));
        let mut page = BTreeInternalPage::empty(pid, 1);
        page.keys.push(leaf_key(10, 0));
        page.children.push(Vpid::new(0, 3));
        page.children.push(Vpid::new(0, 4));

        assert_eq!(page.child_for(&schema, &leaf_key(5, 0)), Vpid::new(0, 3));
        assert_eq!(page.child_for(&schema, &leaf_key(15, 0)), Vpid::new(0, 4));
    }
}
