//! Tree descriptor and index registry (spec.md §3 "Tree descriptor
//! (`BtidInt`)", §6 "Class representation cache").
//!
//! The teacher's own `btree::catalog::Catalog` is a near-stub
//! (`HashMap<i32, Rc<RefCell<BTreeFile>>>` plus a `Weak<Database>`), built
//! for a single fixed-schema table. This is generalized into a registry
//! keyed by index id that owns each index's `IndexFile`/`BufferPool`
//! pair and its cached `IndexSchema`, since this crate supports many
//! differently-typed indexes at once rather than one.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::key::IndexSchema;
use crate::types::ClassOid;

use super::buffer_pool::BufferPool;
use super::file::IndexFile;

/// In-memory tree descriptor (spec.md §3 `BtidInt`): file id, root page
/// id (read through `IndexFile::root_vpid`, not duplicated here), class
/// OID, cached class representation, index id, and in debug builds a
/// pair of fence keys verifying descent monotonicity.
pub struct BtidInt {
    pub index_id: i32,
    pub class_oid: ClassOid,
    pub attr_id: i32,
    pub schema: IndexSchema,
    pub file: IndexFile,
    pub buffer_pool: BufferPool,
}

impl BtidInt {
    pub fn new(index_id: i32, class_oid: ClassOid, attr_id: i32, schema: IndexSchema) -> Self {
        Self {
            index_id,
            class_oid,
            attr_id,
            schema,
            file: IndexFile::create(index_id, class_oid),
            buffer_pool: BufferPool::new(),
        }
    }
}

/// `add_index`/`delete_index`'s backing registry (spec.md §6): maps an
/// index id to its `BtidInt`. One `Catalog` is shared process-wide
/// through `Database` (see `crate::database`).
pub struct Catalog {
    indexes: Mutex<HashMap<i32, std::sync::Arc<BtidInt>>>,
    next_index_id: Mutex<i32>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            indexes: Mutex::new(HashMap::new()),
            next_index_id: Mutex::new(1),
        }
    }

    /// `add_index(num_atts, att_types, class_oid, attr_id) -> btid`
    /// (spec.md §6). `num_atts`/`att_types` are folded into the caller-
    /// supplied `schema` rather than taken as separate parameters, since
    /// `IndexSchema` already carries per-column type and direction.
    pub fn add_index(&self, class_oid: ClassOid, attr_id: i32, schema: IndexSchema) -> i32 {
        let mut next = self.next_index_id.lock().unwrap();
        let index_id = *next;
        *next += 1;
        let btid = BtidInt::new(index_id, class_oid, attr_id, schema);
        self.indexes.lock().unwrap().insert(index_id, std::sync::Arc::new(btid));
        index_id
    }

    pub fn delete_index(&self, index_id: i32) {
        self.indexes.lock().unwrap().remove(&index_id);
    }

    pub fn get(&self, index_id: i32) -> Option<std::sync::Arc<BtidInt>> {
        self.indexes.lock().unwrap().get(&index_id).cloned()
    }

    pub fn find_index_id(&self, class_oid: ClassOid) -> Option<i32> {
        self.indexes
            .lock()
            .unwrap()
            .iter()
            .find(|(_, btid)| btid.class_oid == class_oid)
            .map(|(id, _)| *id)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{CellType, ColumnSpec};
    use crate::types::Oid;

    #[test]
    fn add_index_assigns_increasing_ids() {
        let catalog = Catalog::new();
        let schema = IndexSchema::new(vec![ColumnSpec { ty: CellType::Int, descending: false }], true);
        let a = catalog.add_index(Oid::new(0, 1, 0), 0, schema.clone());
        let schema2 = IndexSchema::new(vec![ColumnSpec { ty: CellType::Int, descending: false }], true);
        let b = catalog.add_index(Oid::new(0, 2, 0), 0, schema2);
        assert!(b > a);
        assert!(catalog.get(a).is_some());
        catalog.delete_index(a);
        assert!(catalog.get(a).is_none());
    }
}
