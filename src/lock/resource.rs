//! `LkRes`/`LkEntry` typed arenas (spec.md §3, §9 Design Notes: "model as
//! typed arenas indexed by u32 handles").
//!
//! Grounded on the teacher's `HashMap`-based `s_latch_map`/`x_latch_map`
//! (`transaction::concurrent_status::ConcurrentStatus`), generalized from
//! two fixed lock modes to the full `LockMode` set and from "one holder
//! set per page" to "one resource per `LockKey`, arena-allocated".

use super::mode::LockMode;
use super::wait_for_graph::TranIndex;

pub type ResourceId = u32;
pub type EntryId = u32;

/// Per (transaction, resource) pair (spec.md §3 `LkEntry`).
#[derive(Debug, Clone)]
pub struct LkEntry {
    pub tran: TranIndex,
    pub resource: ResourceId,
    pub granted_mode: LockMode,
    /// `NULL` (modeled as `None`) unless this entry is blocked/upgrading.
    pub blocked_mode: Option<LockMode>,
    pub count: u32,
}

impl LkEntry {
    fn new(tran: TranIndex, resource: ResourceId, mode: LockMode) -> Self {
        Self {
            tran,
            resource,
            granted_mode: mode,
            blocked_mode: None,
            count: 1,
        }
    }
}

/// One lock resource (spec.md §3 `LkRes`). `holders`/`waiters` store
/// `EntryId`s rather than embedding `LkEntry` inline, matching the "no
/// raw pointers, typed arena handles" guidance: an `LkEntry` belongs to
/// exactly one resource's holder or waiter list at a time, so this is a
/// plain index into `LockTable::entries`.
#[derive(Debug, Clone)]
pub struct LkRes {
    pub key_repr: String,
    pub holders: Vec<EntryId>,
    pub waiters: Vec<EntryId>,
    pub total_holders_mode: LockMode,
    pub total_waiters_mode: LockMode,
}

impl LkRes {
    fn new(key_repr: String) -> Self {
        Self {
            key_repr,
            holders: Vec::new(),
            waiters: Vec::new(),
            total_holders_mode: LockMode::Null,
            total_waiters_mode: LockMode::Null,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.holders.is_empty() && self.waiters.is_empty()
    }
}

/// A slot in a free-listed typed arena: either live data or the index of
/// the next free slot (spec.md §9: "free-lists are singly linked via
/// index fields").
enum Slot<T> {
    Occupied(T),
    Free(Option<u32>),
}

pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<u32>,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
        }
    }

    pub fn insert(&mut self, value: T) -> u32 {
        if let Some(idx) = self.free_head {
            let next_free = match &self.slots[idx as usize] {
                Slot::Free(next) => *next,
                Slot::Occupied(_) => unreachable!("free_head points at an occupied slot"),
            };
            self.free_head = next_free;
            self.slots[idx as usize] = Slot::Occupied(value);
            idx
        } else {
            self.slots.push(Slot::Occupied(value));
            (self.slots.len() - 1) as u32
        }
    }

    pub fn remove(&mut self, id: u32) -> T {
        let old = std::mem::replace(&mut self.slots[id as usize], Slot::Free(self.free_head));
        self.free_head = Some(id);
        match old {
            Slot::Occupied(v) => v,
            Slot::Free(_) => panic!("double free of arena slot {}", id),
        }
    }

    pub fn get(&self, id: u32) -> &T {
        match &self.slots[id as usize] {
            Slot::Occupied(v) => v,
            Slot::Free(_) => panic!("access to freed arena slot {}", id),
        }
    }

    pub fn get_mut(&mut self, id: u32) -> &mut T {
        match &mut self.slots[id as usize] {
            Slot::Occupied(v) => v,
            Slot::Free(_) => panic!("access to freed arena slot {}", id),
        }
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub(super) fn new_resource(key_repr: String) -> LkRes {
    LkRes::new(key_repr)
}

pub(super) fn new_entry(tran: TranIndex, resource: ResourceId, mode: LockMode) -> LkEntry {
    LkEntry::new(tran, resource, mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_reuses_freed_slots() {
        let mut arena: Arena<i32> = Arena::new();
        let a = arena.insert(1);
        let b = arena.insert(2);
        arena.remove(a);
        let c = arena.insert(3);
        assert_eq!(c, a);
        assert_eq!(*arena.get(b), 2);
        assert_eq!(*arena.get(c), 3);
    }
}
