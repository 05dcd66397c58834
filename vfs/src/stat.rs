use core::fmt;

/// inode 的元信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub inode: u64,
    pub kind: StatKind,
    /// 逻辑大小(字节)：实际数据长度与截断声明长度的较大者
    pub size: u64,
    /// 占用块数
    pub blocks: u64,
    /// 块大小
    pub block_size: u64,
    /// 硬链接个数
    pub links: u32,
    /// 创建时间，毫秒
    pub created: u64,
    /// 修改时间，毫秒
    pub modified: u64,
}

/// 文件类型，取值与 `st_mode` 的类型位一致
#[allow(clippy::upper_case_acronyms)]
#[repr(u32)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatKind {
    DIR = 0o040000,
    #[default]
    FILE = 0o100000,
    LINK = 0o120000,
}

impl StatKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DIR => "Directory",
            Self::FILE => "File",
            Self::LINK => "Symlink",
        }
    }
}

/// 把毫秒时间戳写成 `秒.毫秒`
struct Millis(u64);

impl fmt::Display for Millis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}", self.0 / 1000, self.0 % 1000)
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Type: {}", self.kind.name())?;
        writeln!(f, "Size: {} bytes", self.size)?;
        writeln!(f, "Blocks: {} x {} bytes", self.blocks, self.block_size)?;
        writeln!(f, "Inode: {}", self.inode)?;
        writeln!(f, "Links: {}", self.links)?;
        writeln!(f, "Created: {}", Millis(self.created))?;
        write!(f, "Modified: {}", Millis(self.modified))
    }
}
