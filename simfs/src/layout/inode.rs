//! inode 与其数据访问
//!
//! inode 持有一列直接块编号，逻辑上把这些块首尾相接看作一段连续字节。
//! 块列表只会因截断或目录扩容而变化，写入从不隐式扩容。
//!
//! - 实际大小：块内容去掉尾部零字节后的长度
//! - 声明大小：最近一次截断请求的大小
//! - 大小：两者的较大者

use enumflags2::bitflags;

use crate::{BlockId, BlockStore, InodeId, Result};
use vfs::{Error, StatKind};

#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InodeKind {
    File = 0b001,
    Directory = 0b010,
    Symlink = 0b100,
}

#[derive(Debug, Clone)]
pub struct Inode {
    pub id: InodeId,
    pub kind: InodeKind,
    /// 直接索引块，两两不同，且都在块位图中被占用
    blocks: Vec<BlockId>,
    /// 硬链接个数
    pub links: u32,
    declared_size: usize,
    pub created: u64,
    pub modified: u64,
}

impl Inode {
    #[inline]
    pub fn new(id: InodeId, kind: InodeKind, blocks: Vec<BlockId>, now: u64) -> Self {
        Self {
            id,
            kind,
            blocks,
            links: 0,
            declared_size: 0,
            created: now,
            modified: now,
        }
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == InodeKind::Directory
    }

    #[inline]
    pub fn block_ids(&self) -> &[BlockId] {
        &self.blocks
    }

    #[inline]
    pub fn declared_size(&self) -> usize {
        self.declared_size
    }

    /// 配额：当前块列表能容纳的字节数
    #[inline]
    pub fn capacity(&self, store: &BlockStore) -> usize {
        self.blocks.len() * store.block_size()
    }

    /// 去掉尾部零字节后的数据长度
    pub fn actual_size(&self, store: &BlockStore) -> usize {
        let block_size = store.block_size();

        self.blocks
            .iter()
            .enumerate()
            .rev()
            .find_map(|(block_index, &id)| {
                store
                    .get(id)
                    .iter()
                    .rposition(|&b| b != 0)
                    .map(|pos| block_index * block_size + pos + 1)
            })
            .unwrap_or(0)
    }

    #[inline]
    pub fn size(&self, store: &BlockStore) -> usize {
        self.actual_size(store).max(self.declared_size)
    }

    /// 全部块内容，含尾部零字节
    pub fn load(&self, store: &BlockStore) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.capacity(store));
        for &id in &self.blocks {
            bytes.extend_from_slice(store.get(id));
        }
        bytes
    }

    /// 从指定位置(字节偏移)读出至多 `len` 字节，超出大小的部分不返回
    pub fn read_at(&self, offset: usize, len: usize, store: &BlockStore) -> Vec<u8> {
        let block_size = store.block_size();
        let mut start = offset;
        let end = start
            .saturating_add(len)
            .min(self.size(store))
            .min(self.capacity(store));

        if start >= end {
            return Vec::new();
        }

        let mut buf = Vec::with_capacity(end - start);
        loop {
            // 当前块的逻辑索引
            let block_index = start / block_size;
            // 当前块的末地址(字节)
            let current_block_end = ((block_index + 1) * block_size).min(end);
            let data_block = store.get(self.blocks[block_index]);

            // 绝对地址 % 块大小 = 块内偏移
            let inoffset = start % block_size;
            buf.extend_from_slice(&data_block[inoffset..inoffset + current_block_end - start]);

            if current_block_end == end {
                break;
            }

            start = current_block_end;
        }

        buf
    }

    /// 原地覆写，跨越块边界；超出配额则整体失败
    pub fn write_at(
        &mut self,
        offset: usize,
        buf: &[u8],
        store: &mut BlockStore,
        now: u64,
    ) -> Result<usize> {
        let end = offset.checked_add(buf.len()).ok_or(Error::QuotaExceeded)?;
        if end > self.capacity(store) {
            return Err(Error::QuotaExceeded);
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let block_size = store.block_size();
        let mut start = offset;

        let mut written_size = 0;
        loop {
            let block_index = start / block_size;
            let current_block_end = ((block_index + 1) * block_size).min(end);
            let block_write_size = current_block_end - start;

            let inoffset = start % block_size;
            store.get_mut(self.blocks[block_index])[inoffset..inoffset + block_write_size]
                .copy_from_slice(&buf[written_size..written_size + block_write_size]);

            written_size += block_write_size;

            if current_block_end == end {
                break;
            }

            start = current_block_end;
        }

        self.modified = now;
        Ok(written_size)
    }

    /// 整体覆盖为 `bytes`，其余部分清零。供目录、符号链接的编码落盘使用
    pub fn store_bytes(&mut self, bytes: &[u8], store: &mut BlockStore) -> Result<()> {
        if bytes.len() > self.capacity(store) {
            return Err(Error::QuotaExceeded);
        }

        let mut chunks = bytes.chunks(store.block_size());
        for &id in &self.blocks {
            let data_block = store.get_mut(id);
            match chunks.next() {
                Some(chunk) => {
                    data_block[..chunk.len()].copy_from_slice(chunk);
                    data_block[chunk.len()..].fill(0);
                }
                None => data_block.fill(0),
            }
        }

        Ok(())
    }

    /// 截断到 `new_size`
    ///
    /// - 变小：丢弃多余的整块(至少保留一块)，并把最后一块中超出的部分清零
    /// - 变大：按与实际大小的差值追加全零的新块
    ///
    /// 两种情况下声明大小都记为 `new_size`。
    pub fn truncate(&mut self, new_size: usize, store: &mut BlockStore, now: u64) -> Result<()> {
        let block_size = store.block_size();
        let actual_size = self.actual_size(store);

        if new_size < actual_size {
            let keep = new_size.div_ceil(block_size).max(1);
            for id in self.blocks.split_off(keep) {
                store.dealloc(id);
            }

            let last_index = keep - 1;
            let tail_start = new_size.saturating_sub(last_index * block_size);
            store.get_mut(self.blocks[last_index])[tail_start..].fill(0);
        } else if new_size > actual_size {
            let additional = (new_size - actual_size).div_ceil(block_size);
            let new_blocks = store.alloc_many(additional)?;
            self.blocks.extend(new_blocks);
        }

        self.declared_size = new_size;
        self.modified = now;
        Ok(())
    }

    /// 追加已分配好的块
    pub fn extend_blocks(&mut self, new_blocks: Vec<BlockId>) {
        self.blocks.extend(new_blocks);
    }

    /// 交出全部块，由调用者归还给块存储
    pub fn clear(&mut self) -> Vec<BlockId> {
        self.declared_size = 0;
        core::mem::take(&mut self.blocks)
    }
}

impl From<InodeKind> for StatKind {
    #[inline]
    fn from(kind: InodeKind) -> Self {
        match kind {
            InodeKind::Directory => Self::DIR,
            InodeKind::File => Self::FILE,
            InodeKind::Symlink => Self::LINK,
        }
    }
}

impl From<InodeKind> for vfs::DirEntryType {
    #[inline]
    fn from(kind: InodeKind) -> Self {
        match kind {
            InodeKind::Directory => Self::Directory,
            InodeKind::File => Self::Regular,
            InodeKind::Symlink => Self::SymLink,
        }
    }
}
