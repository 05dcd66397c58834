use core::{ptr, slice};

use crate::InodeId;

/// 名字最长字节数；最后一字节留给 \0
pub const NAME_MAX_LEN: usize = 27;

/// 目录表的魔数：用于识别目录内容是否已初始化
pub const DIR_MAGIC: u32 = 0x3b80_d1e5;

/// 没有父目录(根目录)时写入的父指针
const NO_PARENT: u32 = u32::MAX;

/// 目录项：名字 → inode 编号
#[derive(Debug, Default, Clone)]
#[repr(C)]
pub struct DirEntry {
    name: [u8; NAME_MAX_LEN + 1],
    inode_id: u32,
}

/// 目录表头，位于目录内容的最前面，其后紧跟 `count` 个 [`DirEntry`]
#[derive(Debug, Default, Clone)]
#[repr(C)]
pub struct DirHeader {
    magic: u32,
    pub count: u32,
    parent: u32,
    /// 目录自己的名字
    name: [u8; NAME_MAX_LEN + 1],
}

impl DirEntry {
    /// 目录项大小恒为32字节
    pub const SIZE: usize = 32;

    #[inline]
    pub fn new(name: &str, inode_id: InodeId) -> Self {
        Self {
            name: encode_name(name),
            inode_id: inode_id.into(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        decode_name(&self.name)
    }

    #[inline]
    pub fn inode_id(&self) -> InodeId {
        self.inode_id.into()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(ptr::from_ref(self).cast(), Self::SIZE) }
    }

    /// 从字节还原，`bytes` 至少有 [`DirEntry::SIZE`] 字节
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut dir_entry = Self::default();
        let dest =
            unsafe { slice::from_raw_parts_mut(ptr::from_mut(&mut dir_entry).cast(), Self::SIZE) };
        dest.copy_from_slice(&bytes[..Self::SIZE]);
        dir_entry
    }
}

impl DirHeader {
    pub const SIZE: usize = 40;

    pub fn new(name: &str, parent: Option<InodeId>, count: usize) -> Self {
        Self {
            magic: DIR_MAGIC,
            count: count as u32,
            parent: parent.map_or(NO_PARENT, Into::into),
            name: encode_name(name),
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.magic == DIR_MAGIC
    }

    #[inline]
    pub fn name(&self) -> &str {
        decode_name(&self.name)
    }

    #[inline]
    pub fn parent(&self) -> Option<InodeId> {
        (self.parent != NO_PARENT).then(|| self.parent.into())
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(ptr::from_ref(self).cast(), Self::SIZE) }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut header = Self::default();
        let dest =
            unsafe { slice::from_raw_parts_mut(ptr::from_mut(&mut header).cast(), Self::SIZE) };
        dest.copy_from_slice(&bytes[..Self::SIZE]);
        header
    }
}

/// 超长部分会被截掉，调用者须事先校验长度
fn encode_name(name: &str) -> [u8; NAME_MAX_LEN + 1] {
    let bytes = name.as_bytes();
    let len = bytes.len().min(NAME_MAX_LEN);
    let mut buf = [0; NAME_MAX_LEN + 1];
    buf[..len].copy_from_slice(&bytes[..len]);
    buf
}

fn decode_name(buf: &[u8; NAME_MAX_LEN + 1]) -> &str {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(NAME_MAX_LEN);
    core::str::from_utf8(&buf[..len]).unwrap_or_default()
}
