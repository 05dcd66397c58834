use alloc::string::String;
use core::fmt;

/// `ls` 所列出的目录项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Inode number
    pub inode: u64,
    pub ty: DirEntryType,
    pub name: String,
    /// 符号链接所指向的路径
    pub target: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DirEntryType {
    Directory,
    SymLink,
    #[default]
    Regular,
}

impl DirEntryType {
    /// `ls` 中的单字符类型标记
    pub fn tag(&self) -> char {
        match self {
            Self::Directory => 'd',
            Self::SymLink => 'l',
            Self::Regular => 'f',
        }
    }
}

impl fmt::Display for DirEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(target) => {
                let name = alloc::format!("{} -> {}", self.name, target);
                write!(f, "{name:<20}\t{:<5}\t{:>5}", self.ty.tag(), self.inode)
            }
            None => write!(f, "{:<20}\t{:<5}\t{:>5}", self.name, self.ty.tag(), self.inode),
        }
    }
}
