//! # 数据结构层
//!
//! simfs 的存储布局：
//! inode 表(带位图) | 块存储(带位图)
//!
//! 普通文件、目录、符号链接的内容都放在 inode 的块列表中，
//! 后两者的内容是编码过的目录表/目标路径。

mod bitmap;
pub use bitmap::Bitmap;

mod inode;
pub use inode::{Inode, InodeKind};

/// 目录项，也属于数据结构
mod dir_entry;
pub use dir_entry::{DirEntry, DirHeader, NAME_MAX_LEN};

mod directory;
pub use directory::Directory;

mod symlink;
pub use symlink::Symlink;

use crate::BlockStore;

/// inode 内容按其类型解读的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InodePayload {
    Raw(Vec<u8>),
    Directory(Directory),
    Symlink(String),
}

impl InodePayload {
    /// 目录或符号链接的内容尚未初始化时返回空
    pub fn decode(inode: &Inode, store: &BlockStore) -> Option<Self> {
        match inode.kind {
            InodeKind::File => Some(Self::Raw(inode.read_at(0, inode.size(store), store))),
            InodeKind::Directory => Directory::load(inode, store).map(Self::Directory),
            InodeKind::Symlink => Symlink::load(inode, store).map(|link| Self::Symlink(link.target)),
        }
    }
}
