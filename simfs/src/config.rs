//! 文件系统的可调参数与时钟

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::layout::{DirEntry, DirHeader, NAME_MAX_LEN};
use crate::{
    BLOCK_SIZE, INITIAL_BLOCKS, MAX_BLOCKS, MAX_FILENAME_LENGTH, MAX_INODES, MAX_SYMLINKS,
    PURGE_INTERVAL_MS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsConfig {
    pub block_size: usize,
    pub max_blocks: usize,
    pub max_inodes: usize,
    pub max_filename_length: usize,
    /// 每个新 inode 预留的块数
    pub initial_blocks: usize,
    pub max_symlinks: usize,
    pub purge_interval_ms: u64,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            block_size: BLOCK_SIZE,
            max_blocks: MAX_BLOCKS,
            max_inodes: MAX_INODES,
            max_filename_length: MAX_FILENAME_LENGTH,
            initial_blocks: INITIAL_BLOCKS,
            max_symlinks: MAX_SYMLINKS,
            purge_interval_ms: PURGE_INTERVAL_MS,
        }
    }
}

impl FsConfig {
    /// 每个 inode 初始的字节配额
    #[inline]
    pub fn initial_quota(&self) -> usize {
        self.block_size * self.initial_blocks
    }

    /// 参数不自洽时直接 panic，这是构建文件系统的前提
    pub(crate) fn check(&self) {
        assert!(self.block_size > 0, "block size must be positive");
        assert!(self.max_inodes > 0, "inode table must have a slot for root");
        assert!(self.initial_blocks > 0, "inode quota must be positive");
        assert!(
            self.max_blocks >= self.initial_blocks,
            "device cannot hold the root directory"
        );
        assert!(
            (1..=NAME_MAX_LEN).contains(&self.max_filename_length),
            "file name limit must fit a directory record"
        );
        // 空目录也至少要装下表头和 `.`、`..`
        assert!(
            self.initial_quota() >= DirHeader::SIZE + 2 * DirEntry::SIZE,
            "inode quota too small for a directory"
        );
    }
}

/// 时间来源，毫秒
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }
}

/// 手动拨动的时钟，克隆体共享同一时间
#[derive(Debug, Default, Clone)]
pub struct ManualClock(Arc<AtomicU64>);

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self(Arc::new(AtomicU64::new(start)))
    }

    pub fn set(&self, now: u64) {
        self.0.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.0.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}
