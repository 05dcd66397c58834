//! 符号链接：内容是目标路径，与目录一样编码后存放在 inode 的块里。

use crate::{BlockStore, Inode, InodeId, Result};

/// 用于识别符号链接内容是否已初始化
const LINK_MAGIC: u32 = 0x3b80_11c5;

/// 魔数 + 目标路径长度
const HEADER_SIZE: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symlink {
    pub inode: InodeId,
    pub target: String,
}

impl Symlink {
    #[inline]
    pub fn new(inode: InodeId, target: &str) -> Self {
        Self {
            inode,
            target: String::from(target),
        }
    }

    pub fn load(inode: &Inode, store: &BlockStore) -> Option<Self> {
        Self::decode(inode.id, &inode.load(store))
    }

    pub fn save(&self, inode: &mut Inode, store: &mut BlockStore) -> Result<()> {
        debug_assert_eq!(inode.id, self.inode);
        inode.store_bytes(&self.encode(), store)
    }

    #[inline]
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.target.len()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_len());
        bytes.extend_from_slice(&LINK_MAGIC.to_le_bytes());
        bytes.extend_from_slice(&(self.target.len() as u32).to_le_bytes());
        bytes.extend_from_slice(self.target.as_bytes());
        bytes
    }

    pub fn decode(inode: InodeId, bytes: &[u8]) -> Option<Self> {
        if bytes.iter().all(|&b| b == 0) {
            return None;
        }

        let (header, rest) = bytes.split_at_checked(HEADER_SIZE)?;
        let (magic, len) = header.split_at(4);
        if u32::from_le_bytes(magic.try_into().ok()?) != LINK_MAGIC {
            log::error!("symlink inode {inode}: bad magic");
            return None;
        }

        let len = u32::from_le_bytes(len.try_into().ok()?) as usize;
        let target = rest.get(..len)?;
        match core::str::from_utf8(target) {
            Ok(target) => Some(Self::new(inode, target)),
            Err(err) => {
                log::error!("symlink inode {inode}: {err}");
                None
            }
        }
    }
}
