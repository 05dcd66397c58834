//! # inode 分配器层
//!
//! 定长的 inode 槽位数组加一张占用位图，负责分配、回收 inode 编号。
//! 新 inode 一经分配就预留一份初始块配额。

use derive_more::{Display, From, Into};

use crate::layout::{Bitmap, Inode, InodeKind};
use crate::{BlockStore, Result};
use vfs::Error;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
#[repr(transparent)]
pub struct InodeId(u32);

impl InodeId {
    /// 根目录
    pub const ROOT: Self = Self(0);
}

impl From<InodeId> for u64 {
    fn from(id: InodeId) -> Self {
        id.0 as u64
    }
}

/// `ls` 与 `stat` 报告的编号是 u64，超出 u32 的编号不存在
impl TryFrom<u64> for InodeId {
    type Error = Error;

    fn try_from(ino: u64) -> Result<Self> {
        u32::try_from(ino).map(Self).map_err(|_| Error::NotFound)
    }
}

impl From<InodeId> for usize {
    fn from(id: InodeId) -> Self {
        id.0 as usize
    }
}

#[derive(Debug)]
pub struct InodeTable {
    slots: Vec<Option<Inode>>,
    bitmap: Bitmap,
}

impl InodeTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            bitmap: Bitmap::new(capacity),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.bitmap.capacity()
    }

    #[inline]
    pub fn free(&self) -> usize {
        self.bitmap.free()
    }

    /// 分配新的 inode 并为其预留 `quota` 个块。
    ///
    /// 先确认 inode 槽位与块都足够，再改动位图。
    pub fn alloc(
        &mut self,
        kind: InodeKind,
        quota: usize,
        store: &mut BlockStore,
        now: u64,
    ) -> Result<InodeId> {
        if self.free() == 0 {
            log::warn!("inode table is full");
            return Err(Error::OutOfInodes);
        }
        let blocks = store.alloc_many(quota)?;
        let index = self.bitmap.alloc().ok_or(Error::OutOfInodes)?;

        let id = InodeId(index as u32);
        self.slots[index] = Some(Inode::new(id, kind, blocks, now));
        log::debug!("alloc {kind:?} inode {id}");

        Ok(id)
    }

    /// 回收 inode 及其全部块
    pub fn dealloc(&mut self, id: InodeId, store: &mut BlockStore) {
        let index = usize::from(id);
        let mut inode = self.slots[index]
            .take()
            .unwrap_or_else(|| panic!("inode {id} is not allocated"));

        for block in inode.clear() {
            store.dealloc(block);
        }
        self.bitmap.dealloc(index);
        log::debug!("free inode {id}");
    }

    #[inline]
    pub fn get(&self, id: InodeId) -> Option<&Inode> {
        self.slots.get(usize::from(id))?.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, id: InodeId) -> Option<&mut Inode> {
        self.slots.get_mut(usize::from(id))?.as_mut()
    }

    /// 所有在用的 inode
    pub fn iter(&self) -> impl Iterator<Item = &Inode> {
        self.slots.iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_from_listing_numbers() {
        assert_eq!(InodeId::try_from(7u64), Ok(InodeId(7)));
        assert_eq!(InodeId::try_from(u64::from(u32::MAX) + 1), Err(Error::NotFound));
    }

    #[test]
    fn alloc_reserves_quota() {
        let mut store = BlockStore::new(16, 10);
        let mut table = InodeTable::new(4);

        let a = table.alloc(InodeKind::File, 3, &mut store, 0).unwrap();
        let b = table.alloc(InodeKind::Directory, 3, &mut store, 0).unwrap();
        assert_eq!((a, b), (InodeId(0), InodeId(1)));
        assert_eq!(store.free(), 4);
        assert_eq!(table.get(b).unwrap().block_ids().len(), 3);
        assert!(table.get(b).unwrap().is_dir());

        table.dealloc(a, &mut store);
        assert_eq!(store.free(), 7);
        assert!(table.get(a).is_none());
        assert_eq!(table.alloc(InodeKind::File, 1, &mut store, 0), Ok(a));
    }

    #[test]
    fn exhaustion_leaves_no_trace() {
        let mut store = BlockStore::new(16, 4);
        let mut table = InodeTable::new(2);

        table.alloc(InodeKind::File, 3, &mut store, 0).unwrap();
        assert_eq!(
            table.alloc(InodeKind::File, 3, &mut store, 0),
            Err(Error::OutOfBlocks)
        );
        assert_eq!(table.free(), 1);
        assert_eq!(store.free(), 1);

        table.alloc(InodeKind::File, 1, &mut store, 0).unwrap();
        assert_eq!(
            table.alloc(InodeKind::File, 0, &mut store, 0),
            Err(Error::OutOfInodes)
        );
    }
}
