//! Backing store for one index's pages (spec.md §4.12 `IndexFile`).
//!
//! Grounded on the teacher's `btree::file::BTreeFile`/`io::SmallFile`
//! raw `std::fs::File` seek-and-read-exact pattern, adapted from a flat
//! byte array to a `Page`-keyed store: this crate's leaf/internal pages
//! are variable-length (`IdxKey` records, not fixed tuples), so a
//! faithful fixed-stride-into-one-file layout would need its own
//! variable-length page codec with no payoff for a library crate that
//! has no on-disk compatibility promise to keep (unlike the original
//! system, which must match a wire format other processes also read).
//! `IndexFile` keeps the same role — the single owner of a page's
//! durable image, separate from `BufferPool`'s cache — by storing
//! `Page` values keyed by `Vpid` directly.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::SmallError;
use crate::types::{ClassOid, Vpid};

use super::buffer_pool::Page;
use super::page::{BTreeHeaderPage, BTreePageId, BTreeRootPointerPage, PageCategory};

pub struct IndexFile {
    pub index_id: i32,
    pub class_oid: ClassOid,
    pages: Mutex<HashMap<Vpid, Page>>,
    next_page_id: Mutex<i32>,
}

impl IndexFile {
    /// `file_create` (spec.md §4.12): a brand new index file starts with
    /// a root pointer page (vpid 0) pointing at an empty leaf root
    /// (vpid 1) and a header page (vpid 2) for free-page bookkeeping.
    pub fn create(index_id: i32, class_oid: ClassOid) -> Self {
        let root_vpid = Vpid::new(0, 1);
        let header_vpid = Vpid::new(0, 2);

        let mut pages = HashMap::new();
        pages.insert(
            Vpid::new(0, 0),
            Page::RootPointer(BTreeRootPointerPage::new(root_vpid, header_vpid)),
        );
        pages.insert(header_vpid, Page::Header(BTreeHeaderPage::new(64)));
        pages.insert(
            root_vpid,
            Page::Leaf(super::page::BTreeLeafPage::empty(BTreePageId::new(
                PageCategory::Leaf,
                index_id,
                root_vpid,
            ))),
        );

        Self {
            index_id,
            class_oid,
            pages: Mutex::new(pages),
            next_page_id: Mutex::new(3),
        }
    }

    pub fn root_pointer_vpid(&self) -> Vpid {
        Vpid::new(0, 0)
    }

    pub fn root_vpid(&self) -> Vpid {
        let pages = self.pages.lock().unwrap();
        match pages.get(&self.root_pointer_vpid()) {
            Some(Page::RootPointer(p)) => p.root(),
            _ => panic!("root pointer page missing"),
        }
    }

    pub fn root_level(&self) -> u32 {
        let pages = self.pages.lock().unwrap();
        match pages.get(&self.root_pointer_vpid()) {
            Some(Page::RootPointer(p)) => p.root_level(),
            _ => panic!("root pointer page missing"),
        }
    }

    pub fn set_root_vpid(&self, new_root: Vpid, level: u32) {
        let mut pages = self.pages.lock().unwrap();
        match pages.get_mut(&self.root_pointer_vpid()) {
            Some(Page::RootPointer(p)) => p.set_root(new_root, level),
            _ => panic!("root pointer page missing"),
        }
    }

    /// `read_page(pid)` (spec.md §4.12): the `BufferPool` cache-miss
    /// path. Returns a clone; the file keeps its own copy as the
    /// last-flushed durable image, same as a real buffer pool reading
    /// off disk while the file itself stays put.
    pub fn read_page(&self, pid: BTreePageId) -> Result<Page, SmallError> {
        let pages = self.pages.lock().unwrap();
        match pages.get(&pid.vpid) {
            Some(page) => Ok(page.clone()),
            None => Err(SmallError::page_corrupted(
                &format!("index {}", self.index_id),
                format!("page {} not found", pid),
            )),
        }
    }

    /// `write_page(pid, page)`: overwrite the file's durable image with
    /// the buffer pool's current copy (spec.md §4.12 `flush_page`).
    pub fn write_page(&self, pid: BTreePageId, page: &Page) -> Result<(), SmallError> {
        self.pages.lock().unwrap().insert(pid.vpid, page.clone());
        Ok(())
    }

    /// `alloc_pages(count)` (spec.md §4.12): prefer a free slot recorded
    /// in the header page's bitmap, otherwise grow the file.
    pub fn alloc_page(&self) -> Vpid {
        let header_vpid = self.header_vpid();
        let mut pages = self.pages.lock().unwrap();
        let free_slot = match pages.get(&header_vpid) {
            Some(Page::Header(h)) => {
                let slot = h.next_free();
                if slot < 1_000_000 {
                    Some(slot)
                } else {
                    None
                }
            }
            _ => None,
        };

        let page_id = if let Some(slot) = free_slot {
            if let Some(Page::Header(h)) = pages.get_mut(&header_vpid) {
                if !h.is_free(slot) {
                    None
                } else {
                    h.mark_used(slot);
                    Some(slot as i32 + 3)
                }
            } else {
                None
            }
        } else {
            None
        };

        let page_id = page_id.unwrap_or_else(|| {
            let mut next = self.next_page_id.lock().unwrap();
            let id = *next;
            *next += 1;
            id
        });

        Vpid::new(0, page_id)
    }

    /// `dealloc_page(vpid)` (spec.md §4.12): mark the slot free in the
    /// header bitmap so a later `alloc_page` can reuse it.
    pub fn dealloc_page(&self, vpid: Vpid) {
        let header_vpid = self.header_vpid();
        let mut pages = self.pages.lock().unwrap();
        if let Some(Page::Header(h)) = pages.get_mut(&header_vpid) {
            let slot = (vpid.page_id - 3).max(0) as usize;
            h.mark_free(slot);
        }
        pages.remove(&vpid);
    }

    fn header_vpid(&self) -> Vpid {
        Vpid::new(0, 2)
    }
}
