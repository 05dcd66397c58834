use derive_more::Display;

/// 文件系统操作的错误
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[display(fmt = "no such file or directory")]
    NotFound,
    #[display(fmt = "bad file descriptor")]
    BadDescriptor,
    #[display(fmt = "file already exists")]
    AlreadyExists,
    #[display(fmt = "file name too long")]
    NameTooLong,
    #[display(fmt = "is a directory")]
    IsADirectory,
    #[display(fmt = "not a directory")]
    NotADirectory,
    #[display(fmt = "directory not empty")]
    DirectoryNotEmpty,
    #[display(fmt = "no free blocks left on device")]
    OutOfBlocks,
    #[display(fmt = "no free inodes left on device")]
    OutOfInodes,
    /// 数据超出了 inode 当前块配额
    #[display(fmt = "data exceeds the inode's block quota")]
    QuotaExceeded,
    #[display(fmt = "too many levels of symbolic links")]
    TooManySymlinks,
    #[display(fmt = "invalid operation")]
    InvalidOperation,
}

impl Error {
    /// 是否属于“非法操作”一类：对目录读写、链接目录、删除根目录等
    pub fn is_invalid_operation(&self) -> bool {
        matches!(
            self,
            Self::IsADirectory | Self::NotADirectory | Self::InvalidOperation
        )
    }
}

impl core::error::Error for Error {}
