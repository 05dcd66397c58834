//! # simfs
//!
//! 完全驻留于内存的 inode 文件系统模拟器。
//! 目录与符号链接都只是内容经过编码的普通 inode，
//! 所有状态都在进程内存中，每次运行从零构建。

/* simfs 的整体架构，自上而下 */

// 文件系统层：文件描述符、当前目录，以及对外暴露的全部操作
mod fs;

// 路径解析层：`.`、`..` 与符号链接替换
mod path;

// 文件描述符表
mod fd;

// 后台回收：周期性清理无链接且未打开的 inode
mod sweep;

// 数据结构层：inode、目录与符号链接的编码
mod layout;

// 分配器层：inode 表与块存储，各自带一张占用位图
mod inode_table;
mod block_store;

mod config;

pub use self::{
    block_store::{BlockId, BlockStore},
    config::{Clock, FsConfig, ManualClock, SystemClock},
    fs::{FileSystem, Usage},
    inode_table::{InodeId, InodeTable},
    layout::{Directory, Inode, InodeKind, InodePayload},
};
pub use vfs::{DirEntry, DirEntryType, Error, Stat, StatKind};

pub type Result<T> = core::result::Result<T, Error>;

/// 块大小(字节)
pub const BLOCK_SIZE: usize = 512;
/// 块存储的总块数
pub const MAX_BLOCKS: usize = 1024;
/// inode 表的槽位数
pub const MAX_INODES: usize = 128;
/// 文件名最大长度，须能放进定长目录项
pub const MAX_FILENAME_LENGTH: usize = layout::NAME_MAX_LEN;
/// 新分配的 inode 预留的块数
pub const INITIAL_BLOCKS: usize = 5;
/// 一次路径解析最多替换的符号链接数
pub const MAX_SYMLINKS: usize = 10;
/// 后台回收的周期，毫秒
pub const PURGE_INTERVAL_MS: u64 = 500;
