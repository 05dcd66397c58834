//! # 文件描述符层
//!
//! 整个文件系统共用一张描述符表。描述符编号单调递增、从不复用；
//! 描述符的生命周期与 inode 的链接数无关，可以指向已被删除但仍打开的 inode。

use std::collections::BTreeMap;

use crate::{InodeId, Result};
use vfs::Error;

/// 一个打开的文件：inode 加读写位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFile {
    pub inode: InodeId,
    /// 只能由 seek 改变，读写不会推进
    pub offset: usize,
}

#[derive(Debug, Default)]
pub struct FdTable {
    files: BTreeMap<usize, OpenFile>,
    next_fd: usize,
}

impl FdTable {
    pub fn open(&mut self, inode: InodeId) -> usize {
        let fd = self.next_fd;
        self.next_fd += 1;
        self.files.insert(fd, OpenFile { inode, offset: 0 });
        fd
    }

    #[inline]
    pub fn get(&self, fd: usize) -> Result<OpenFile> {
        self.files.get(&fd).copied().ok_or(Error::BadDescriptor)
    }

    pub fn seek(&mut self, fd: usize, offset: usize) -> Result<()> {
        let file = self.files.get_mut(&fd).ok_or(Error::BadDescriptor)?;
        file.offset = offset;
        Ok(())
    }

    pub fn close(&mut self, fd: usize) -> Result<OpenFile> {
        self.files.remove(&fd).ok_or(Error::BadDescriptor)
    }

    /// 是否还有描述符持有该 inode
    pub fn is_open(&self, inode: InodeId) -> bool {
        self.files.values().any(|file| file.inode == inode)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.files.len()
    }
}
