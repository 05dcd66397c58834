//! # 块存储层
//!
//! 模拟的块设备：定长缓冲区数组加一张占用位图。
//! 位图是块的唯一分配者，一个块同一时刻至多属于一个 inode。

use derive_more::{Display, From, Into};

use crate::Result;
use crate::layout::Bitmap;
use vfs::Error;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
#[repr(transparent)]
pub struct BlockId(u32);

impl From<BlockId> for usize {
    fn from(id: BlockId) -> Self {
        id.0 as usize
    }
}

#[derive(Debug)]
pub struct BlockStore {
    /// 空闲块为 `None`
    blocks: Vec<Option<Box<[u8]>>>,
    bitmap: Bitmap,
    block_size: usize,
}

impl BlockStore {
    pub fn new(block_size: usize, capacity: usize) -> Self {
        Self {
            blocks: (0..capacity).map(|_| None).collect(),
            bitmap: Bitmap::new(capacity),
            block_size,
        }
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.bitmap.capacity()
    }

    #[inline]
    pub fn free(&self) -> usize {
        self.bitmap.free()
    }

    #[inline]
    pub fn is_allocated(&self, id: BlockId) -> bool {
        self.bitmap.is_set(id.into())
    }

    /// 分配一个全零的新块
    pub fn alloc(&mut self) -> Result<BlockId> {
        let index = self.bitmap.alloc().ok_or(Error::OutOfBlocks)?;
        self.blocks[index] = Some(vec![0; self.block_size].into_boxed_slice());
        log::debug!("alloc block {index}");

        Ok(BlockId(index as u32))
    }

    /// 一次分配多个块；空闲块不够时什么都不做
    pub fn alloc_many(&mut self, count: usize) -> Result<Vec<BlockId>> {
        if self.free() < count {
            log::warn!("need {count} blocks but only {} left", self.free());
            return Err(Error::OutOfBlocks);
        }

        (0..count).map(|_| self.alloc()).collect()
    }

    /// 调用者须保证该块已不被任何 inode 引用
    pub fn dealloc(&mut self, id: BlockId) {
        let index = usize::from(id);
        self.bitmap.dealloc(index);
        self.blocks[index] = None;
        log::debug!("free block {index}");
    }

    pub fn get(&self, id: BlockId) -> &[u8] {
        self.blocks[usize::from(id)]
            .as_deref()
            .unwrap_or_else(|| panic!("block {id} is not allocated"))
    }

    pub fn get_mut(&mut self, id: BlockId) -> &mut [u8] {
        self.blocks[usize::from(id)]
            .as_deref_mut()
            .unwrap_or_else(|| panic!("block {id} is not allocated"))
    }
}
