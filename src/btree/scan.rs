//! Resumable range search (spec.md §4.5 `BtreeScan`).
//!
//! No direct teacher analog (the teacher's `page_cache`/`table.rs` do a
//! single-shot full scan); grounded on the descent primitives in
//! `super::index` (`locate_key`/`search_leaf`) the way spec.md layers
//! `BtreeScan` on top of `locate_key`, and on the teacher's sibling-
//! pointer leaf chain (`prev_sibling`/`next_sibling` in `page.rs`) for
//! the forward/backward walk.
//!
//! Simplification from spec.md: the resume fast path keys off a page
//! LSA equality check ("if its page LSA equals `cur_leaf_lsa`, the slot
//! id is still valid"). This crate's pages carry no LSA/version stamp
//! (see DESIGN.md), so every resume re-locates via `cur_key` unconditionally
//! instead of attempting the fast path — correct, just always taking the
//! slower of the two branches spec.md describes.

use crate::error::SmallError;
use crate::key::{self, Cell, IdxKey};
use crate::types::{Oid, Vpid};

use super::catalog::BtidInt;
use super::index::{locate_key, search_leaf};
use super::page::BTreePageId;

/// `range_kind` (spec.md §4.5, §8 scenario 2 `GE_LE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeKind {
    GeLe,
    GeLt,
    GtLe,
    GtLt,
}

impl RangeKind {
    fn lower_inclusive(self) -> bool {
        matches!(self, RangeKind::GeLe | RangeKind::GeLt)
    }

    fn upper_inclusive(self) -> bool {
        matches!(self, RangeKind::GeLe | RangeKind::GtLe)
    }
}

/// `eval_key_filter(key, filter) -> {True, False, Error}` (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFilterResult {
    True,
    False,
    Error,
}

pub type KeyFilter<'a> = dyn Fn(&IdxKey) -> KeyFilterResult + 'a;

/// What a matching key turns into on its way out of `next_batch`
/// (spec.md §4.5 "emits one of: OID ..., a tuple assembled from
/// attribute descriptors ..., or an entry in a bounded top-N heap ...").
pub enum ScanMode {
    /// Basic scan: just the trailing OID.
    Oid,
    /// Covering-index scan: project the listed cell indices into a
    /// tuple, accumulated for the caller to drain via
    /// `BtreeScan::take_covering_tuples`.
    CoveringIndex { attr_descriptors: Vec<usize>, tuples: Vec<Vec<Cell>> },
    /// Multi-range-optimization scan: feed candidates to the heap; a
    /// rejected offer ends the scan early (spec.md "the first item
    /// rejected ends the scan").
    Mro(MroHeap),
}

/// Shard-key group-ownership check applied to the trailing OID of every
/// matching key (spec.md §4.5 "enforces shard-key group ownership on the
/// trailing OID", cross-referenced to §4.10's `SHARD_GROUP_OWN` set via
/// `LockManager::owns_shard_group`). A non-shard-table scope always
/// passes; a shard-table scope rejects any OID whose `group_id` is not
/// owned by this process's shard-key lock, except migrator/GC's negative
/// group ids, which are exempt the same way `shard_key_lock` exempts them.
pub struct ShardScope<'a> {
    pub is_shard_table: bool,
    pub is_owned: &'a dyn Fn(i32) -> bool,
}

impl<'a> ShardScope<'a> {
    fn admits(&self, group_id: i32) -> bool {
        !self.is_shard_table || group_id < 0 || (self.is_owned)(group_id)
    }
}

/// Resumable scan state (spec.md §4.5).
pub struct BtreeScan<'a> {
    lower: Option<IdxKey>,
    upper: Option<IdxKey>,
    range_kind: RangeKind,
    filter: Option<&'a KeyFilter<'a>>,
    ascending: bool,

    cur_leaf: Option<Vpid>,
    prev_leaf: Option<Vpid>,
    cur_slot: usize,
    cur_key: Option<IdxKey>,
    is_first_search: bool,

    mode: ScanMode,
    shard_scope: Option<ShardScope<'a>>,

    pub scanned: u64,
    pub returned: u64,
}

impl<'a> BtreeScan<'a> {
    pub fn new(
        lower: Option<IdxKey>,
        upper: Option<IdxKey>,
        range_kind: RangeKind,
        ascending: bool,
        filter: Option<&'a KeyFilter<'a>>,
    ) -> Self {
        Self {
            lower,
            upper,
            range_kind,
            filter,
            ascending,
            cur_leaf: None,
            prev_leaf: None,
            cur_slot: 0,
            cur_key: None,
            is_first_search: true,
            mode: ScanMode::Oid,
            shard_scope: None,
            scanned: 0,
            returned: 0,
        }
    }

    /// Switch to covering-index emission: each matching key is projected
    /// through `attr_descriptors` (cell indices into the key, in output
    /// order) instead of being reduced to its OID.
    pub fn with_covering_projection(mut self, attr_descriptors: Vec<usize>) -> Self {
        self.mode = ScanMode::CoveringIndex { attr_descriptors, tuples: Vec::new() };
        self
    }

    /// Switch to multi-range-optimization emission: matching keys are
    /// offered to `heap` instead of being pushed to the OID batch; the
    /// scan ends as soon as the heap rejects a candidate.
    pub fn with_mro(mut self, heap: MroHeap) -> Self {
        self.mode = ScanMode::Mro(heap);
        self
    }

    pub fn with_shard_scope(mut self, scope: ShardScope<'a>) -> Self {
        self.shard_scope = Some(scope);
        self
    }

    /// Drain the tuples accumulated by a `CoveringIndex` scan. Empty (and
    /// harmless to call) for any other mode.
    pub fn take_covering_tuples(&mut self) -> Vec<Vec<Cell>> {
        match &mut self.mode {
            ScanMode::CoveringIndex { tuples, .. } => std::mem::take(tuples),
            _ => Vec::new(),
        }
    }

    /// Consume the scan and return the `MroHeap`'s final sorted items.
    /// Empty for any other mode.
    pub fn into_mro_items(self) -> Vec<IdxKey> {
        match self.mode {
            ScanMode::Mro(heap) => heap.into_items(),
            _ => Vec::new(),
        }
    }

    pub fn is_done(&self) -> bool {
        !self.is_first_search && self.cur_leaf.is_none()
    }

    /// Fetch up to `batch_size` matching OIDs into `out`. Returns the
    /// number appended. An empty return with `is_done() == false` cannot
    /// happen — the scan always either fills the batch or exhausts the
    /// index before returning (spec.md §4.5 "when the caller's OID
    /// buffer fills, the scan saves ... and returns the current batch").
    ///
    /// In `ScanMode::CoveringIndex` the OID is still pushed to `out` (so
    /// batching/resume work unchanged) and the projected tuple is queued
    /// for `take_covering_tuples`. In `ScanMode::Mro`, `out` is left
    /// untouched; candidates are offered to the heap instead, and the
    /// scan runs until the heap rejects one or the index is exhausted,
    /// ignoring `batch_size`.
    pub fn next_batch(
        &mut self,
        btid: &BtidInt,
        out: &mut Vec<Oid>,
        batch_size: usize,
    ) -> Result<usize, SmallError> {
        let start_len = out.len();

        if self.is_first_search {
            self.first_search(btid)?;
            self.is_first_search = false;
        }

        while out.len() - start_len < batch_size {
            let leaf_vpid = match self.cur_leaf {
                Some(v) => v,
                None => break,
            };

            let pid = BTreePageId::new(super::page::PageCategory::Leaf, btid.index_id, leaf_vpid);
            let pod = btid.buffer_pool.fix(&btid.file, pid, super::buffer_pool::FixMode::Unconditional)?;
            let guard = pod.read().unwrap();
            let leaf = guard.as_leaf();
            let keys = leaf.keys(&btid.schema);

            if self.cur_slot >= keys.len() {
                self.step_to_next_leaf(leaf.prev_sibling(), leaf.next_sibling());
                drop(guard);
                continue;
            }

            let key = &keys[self.cur_slot];
            self.scanned += 1;

            if !self.within_upper_bound(btid, key) {
                self.cur_leaf = None;
                break;
            }

            self.cur_key = Some(key.clone());

            let passes_filter = match self.filter {
                Some(f) => match f(key) {
                    KeyFilterResult::True => true,
                    KeyFilterResult::False => false,
                    KeyFilterResult::Error => {
                        return Err(SmallError::Io("key filter evaluation failed".to_string()));
                    }
                },
                None => true,
            };

            let passes_shard_scope = match &self.shard_scope {
                Some(scope) => scope.admits(key.oid().group_id),
                None => true,
            };

            if !passes_shard_scope {
                return Err(SmallError::ShardInvalidGroupId { group_id: key.oid().group_id });
            }

            let mut mro_rejected = false;

            if passes_filter {
                match &mut self.mode {
                    ScanMode::Oid => {
                        out.push(key.oid());
                        self.returned += 1;
                    }
                    ScanMode::CoveringIndex { attr_descriptors, tuples } => {
                        let cells = key.cells();
                        let tuple = attr_descriptors.iter().map(|&i| cells[i].clone()).collect();
                        tuples.push(tuple);
                        out.push(key.oid());
                        self.returned += 1;
                    }
                    ScanMode::Mro(heap) => {
                        if heap.offer(&btid.schema, key.clone()) {
                            self.returned += 1;
                        } else {
                            mro_rejected = true;
                        }
                    }
                }
            }

            if mro_rejected {
                self.cur_leaf = None;
                drop(guard);
                break;
            }

            if self.ascending {
                self.cur_slot += 1;
            } else if self.cur_slot == 0 {
                self.step_to_next_leaf(leaf.prev_sibling(), leaf.next_sibling());
            } else {
                self.cur_slot -= 1;
            }
        }

        Ok(out.len() - start_len)
    }

    fn step_to_next_leaf(&mut self, prev: Option<Vpid>, next: Option<Vpid>) {
        self.prev_leaf = self.cur_leaf;
        self.cur_leaf = if self.ascending { next } else { prev };
        self.cur_slot = if self.ascending { 0 } else { usize::MAX };
    }

    fn within_upper_bound(&self, btid: &BtidInt, key: &IdxKey) -> bool {
        let bound = if self.ascending { &self.upper } else { &self.lower };
        let inclusive = if self.ascending {
            self.range_kind.upper_inclusive()
        } else {
            self.range_kind.lower_inclusive()
        };
        match bound {
            None => true,
            Some(b) => {
                let cmp = key::compare_full(&btid.schema, key, b);
                if self.ascending {
                    cmp == key::CompareResult::Lt || (inclusive && cmp == key::CompareResult::Eq)
                } else {
                    cmp == key::CompareResult::Gt || (inclusive && cmp == key::CompareResult::Eq)
                }
            }
        }
    }

    /// spec.md §4.5 "First call" contract.
    fn first_search(&mut self, btid: &BtidInt) -> Result<(), SmallError> {
        let start_key = if self.ascending { &self.lower } else { &self.upper };

        let coerced = match start_key {
            Some(k) => k.clone(),
            None if self.ascending => super::page::min_sentinel(&btid.schema),
            None => super::page::max_sentinel(&btid.schema),
        };

        let (leaf_vpid, mut slot, found) = locate_key(btid, &coerced)?;
        let pid = BTreePageId::new(super::page::PageCategory::Leaf, btid.index_id, leaf_vpid);
        let pod = btid.buffer_pool.fix(&btid.file, pid, super::buffer_pool::FixMode::Unconditional)?;
        let leaf_len = pod.read().unwrap().as_leaf().tuple_count();

        if !found && !self.ascending && slot > 0 {
            slot -= 1;
        }

        self.cur_leaf = Some(leaf_vpid);
        self.cur_slot = slot;

        if self.ascending && slot >= leaf_len {
            let next = pod.read().unwrap().as_leaf().next_sibling();
            self.cur_leaf = next;
            self.cur_slot = 0;
        }

        Ok(())
    }
}

/// Multi-range-optimization top-N heap (spec.md §4.5 "Multi-range
/// optimization"). Caller supplies sort columns/direction and a
/// capacity; candidates are kept in sorted order via a scratch buffer so
/// the scan can end early once a full heap's worst entry can't be beaten.
pub struct MroHeap {
    sort_cols: Vec<usize>,
    descending: Vec<bool>,
    capacity: usize,
    items: Vec<IdxKey>,
}

impl MroHeap {
    pub fn new(sort_cols: Vec<usize>, descending: Vec<bool>, capacity: usize) -> Self {
        Self {
            sort_cols,
            descending,
            capacity,
            items: Vec::with_capacity(capacity),
        }
    }

    /// Try to admit `key`. Returns `false` once the heap is full and
    /// `key` is not better than the current worst entry — the scan's
    /// signal to stop (spec.md: "the first item rejected ends the scan").
    pub fn offer(&mut self, schema: &crate::key::IndexSchema, key: IdxKey) -> bool {
        let pos = self.items.partition_point(|existing| self.better_or_equal(schema, existing, &key));

        if self.items.len() < self.capacity {
            self.items.insert(pos, key);
            true
        } else if pos < self.items.len() {
            self.items.insert(pos, key);
            self.items.pop();
            true
        } else {
            false
        }
    }

    fn better_or_equal(&self, schema: &crate::key::IndexSchema, a: &IdxKey, b: &IdxKey) -> bool {
        for (i, &col) in self.sort_cols.iter().enumerate() {
            let desc = self.descending.get(i).copied().unwrap_or(false);
            let mut hint = col;
            let cmp = key::compare(schema, a, b, &mut hint);
            if cmp == key::CompareResult::Eq {
                continue;
            }
            let a_better = if desc {
                cmp == key::CompareResult::Gt
            } else {
                cmp == key::CompareResult::Lt
            };
            return a_better;
        }
        true
    }

    pub fn into_items(self) -> Vec<IdxKey> {
        self.items
    }
}
