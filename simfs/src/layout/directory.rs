//! 目录即文件：目录的内容是一张编码后的目录表。
//!
//! 目录视图是临时的，每次解析路径访问到目录时都从 inode 的字节重新构建；
//! 修改视图后须显式 [`Directory::save`]，同一目录的两个视图以最后保存者为准。

use std::collections::BTreeMap;

use super::dir_entry::{DirEntry, DirHeader};
use crate::{BlockStore, Inode, InodeId, Result};
use vfs::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    pub inode: InodeId,
    pub name: String,
    /// 根目录没有父目录
    pub parent: Option<InodeId>,
    pub entries: BTreeMap<String, InodeId>,
}

impl Directory {
    /// 构建一个全新的目录视图，自带 `.`，非根目录还带 `..`
    pub fn new(inode: InodeId, name: &str, parent: Option<InodeId>) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(String::from("."), inode);
        if let Some(parent) = parent {
            entries.insert(String::from(".."), parent);
        }

        Self {
            inode,
            name: String::from(name),
            parent,
            entries,
        }
    }

    /// 读出目录；inode 刚分配、内容全零时构建全新的目录
    pub fn open(inode: &Inode, store: &BlockStore, name: &str, parent: Option<InodeId>) -> Self {
        Self::load(inode, store).unwrap_or_else(|| Self::new(inode.id, name, parent))
    }

    /// 从 inode 的内容读出目录；内容全零(尚未初始化)时返回空
    pub fn load(inode: &Inode, store: &BlockStore) -> Option<Self> {
        Self::decode(inode.id, &inode.load(store))
    }

    /// 写回 inode；编码后超出配额则失败，inode 不变
    pub fn save(&self, inode: &mut Inode, store: &mut BlockStore) -> Result<()> {
        debug_assert_eq!(inode.id, self.inode);
        inode.store_bytes(&self.encode(), store)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_len());
        let header = DirHeader::new(&self.name, self.parent, self.entries.len());
        bytes.extend_from_slice(header.as_bytes());

        for (name, &inode_id) in &self.entries {
            bytes.extend_from_slice(DirEntry::new(name, inode_id).as_bytes());
        }

        bytes
    }

    pub fn decode(inode: InodeId, bytes: &[u8]) -> Option<Self> {
        if bytes.iter().all(|&b| b == 0) {
            return None;
        }
        if bytes.len() < DirHeader::SIZE {
            log::error!("directory inode {inode}: truncated header");
            return None;
        }

        let header = DirHeader::from_bytes(bytes);
        if !header.is_valid() {
            log::error!("directory inode {inode}: bad magic");
            return None;
        }

        let count = header.count as usize;
        let table = &bytes[DirHeader::SIZE..];
        if table.len() < count * DirEntry::SIZE {
            log::error!("directory inode {inode}: {count} entries don't fit");
            return None;
        }

        let entries = table
            .chunks_exact(DirEntry::SIZE)
            .take(count)
            .map(|chunk| {
                let dir_entry = DirEntry::from_bytes(chunk);
                (String::from(dir_entry.name()), dir_entry.inode_id())
            })
            .collect();

        Some(Self {
            inode,
            name: String::from(header.name()),
            parent: header.parent(),
            entries,
        })
    }

    /// 编码后的字节数
    #[inline]
    pub fn encoded_len(&self) -> usize {
        Self::encoded_len_of(self.entries.len())
    }

    #[inline]
    pub fn encoded_len_of(count: usize) -> usize {
        DirHeader::SIZE + count * DirEntry::SIZE
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<InodeId> {
        self.entries.get(name).copied()
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// 新增目录项，名字在目录内唯一
    pub fn insert(&mut self, name: &str, inode_id: InodeId) -> Result<()> {
        if self.contains(name) {
            return Err(Error::AlreadyExists);
        }
        self.entries.insert(String::from(name), inode_id);
        Ok(())
    }

    #[inline]
    pub fn remove(&mut self, name: &str) -> Option<InodeId> {
        self.entries.remove(name)
    }

    /// 除了 `.` 与 `..` 再无其它项
    pub fn is_empty(&self) -> bool {
        self.entries.keys().all(|name| name == "." || name == "..")
    }

    /// 不含 `.` 与 `..` 的目录项
    pub fn children(&self) -> impl Iterator<Item = (&str, InodeId)> {
        self.entries
            .iter()
            .filter(|(name, _)| *name != "." && *name != "..")
            .map(|(name, &id)| (name.as_str(), id))
    }
}
