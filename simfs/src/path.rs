//! # 路径解析层
//!
//! 逐个分量走过以 `/` 分隔的路径：
//!
//! - `""` 与 `.`：原地不动
//! - `..`：有父目录就移到父目录，根目录则原地不动
//! - 其它名字：在当前目录中查找；是目录就进入，是符号链接就把
//!   目标路径与尚未处理的分量拼接后从头解析，是普通文件则失败
//!
//! 一次解析最多替换 `max_symlinks` 次符号链接。

use crate::layout::{Directory, Inode, InodeKind, Symlink};
use crate::{BlockStore, InodeId, InodeTable, Result};
use vfs::Error;

pub trait Path {
    fn is_absolute(&self) -> bool;

    /// 返回路径的`(父目录, 文件名)`。
    ///
    /// 相对路径只有一项时父目录为`.`；根目录的文件名为`.`；
    /// 末尾多余的`/`会被忽略。空路径返回`None`。
    fn parent_file(&self) -> Option<(&Self, &Self)>;
}

impl Path for str {
    fn is_absolute(&self) -> bool {
        self.starts_with('/')
    }

    fn parent_file(&self) -> Option<(&Self, &Self)> {
        if self.is_empty() {
            return None;
        }

        let trimmed = self.trim_end_matches('/');
        if trimmed.is_empty() {
            return Some(("/", "."));
        }

        match trimmed.rsplit_once('/') {
            None => Some((".", trimmed)),
            Some(("", file)) => Some(("/", file)),
            Some(pair) => Some(pair),
        }
    }
}

/// 路径解析器：对 inode 表与块存储只读
pub struct Resolver<'a> {
    inodes: &'a InodeTable,
    store: &'a BlockStore,
    cwd: InodeId,
    max_symlinks: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(
        inodes: &'a InodeTable,
        store: &'a BlockStore,
        cwd: InodeId,
        max_symlinks: usize,
    ) -> Self {
        Self {
            inodes,
            store,
            cwd,
            max_symlinks,
        }
    }

    /// 把路径解析为目录
    pub fn resolve(&self, path: &str) -> Result<Directory> {
        let mut symlinks = 0;
        // 尚未处理的分量，逆序存放，栈顶是下一个分量
        let mut pending = Vec::new();
        let mut current = self.start(path, &mut pending)?;

        while let Some(cmp) = pending.pop() {
            match cmp.as_str() {
                "" | "." => (),
                ".." => {
                    if let Some(parent) = current.parent {
                        current = self.directory(parent)?;
                    }
                }
                name => {
                    let id = current.get(name).ok_or(Error::NotFound)?;
                    let inode = self.inode(id)?;

                    match inode.kind {
                        InodeKind::Directory => current = self.directory(id)?,
                        InodeKind::File => return Err(Error::NotADirectory),
                        InodeKind::Symlink => {
                            symlinks += 1;
                            if symlinks > self.max_symlinks {
                                log::warn!("too many symlinks while resolving {path:?}");
                                return Err(Error::TooManySymlinks);
                            }

                            let target = self.link_target(inode)?;
                            log::debug!("{name} -> {target}");
                            // 剩余分量留在栈底，接到目标路径之后，从头解析
                            current = self.start(&target, &mut pending)?;
                        }
                    }
                }
            }
        }

        Ok(current)
    }

    /// 找到路径最后一项所指的 inode，不跟随最后一项的符号链接
    pub fn lookup(&self, path: &str) -> Result<InodeId> {
        let (parent, file) = path.parent_file().ok_or(Error::NotFound)?;
        let id = self.resolve(parent)?.get(file).ok_or(Error::NotFound)?;
        self.inode(id)?;
        Ok(id)
    }

    /// 沿符号链接一路走到非符号链接的 inode
    pub fn follow(&self, mut id: InodeId) -> Result<InodeId> {
        let mut hops = 0;

        loop {
            let inode = self.inode(id)?;
            if inode.kind != InodeKind::Symlink {
                return Ok(id);
            }

            hops += 1;
            if hops > self.max_symlinks {
                return Err(Error::TooManySymlinks);
            }
            id = self.lookup(&self.link_target(inode)?)?;
        }
    }

    /// 从 inode 的内容重新构建目录视图
    pub fn directory(&self, id: InodeId) -> Result<Directory> {
        let inode = self.inode(id)?;
        if !inode.is_dir() {
            return Err(Error::NotADirectory);
        }

        Directory::load(inode, self.store).ok_or_else(|| {
            log::error!("directory inode {id} has no entry table");
            Error::NotFound
        })
    }

    fn start(&self, path: &str, pending: &mut Vec<String>) -> Result<Directory> {
        pending.extend(path.split('/').rev().map(String::from));
        self.directory(if path.is_absolute() {
            InodeId::ROOT
        } else {
            self.cwd
        })
    }

    #[inline]
    fn inode(&self, id: InodeId) -> Result<&'a Inode> {
        self.inodes.get(id).ok_or(Error::NotFound)
    }

    fn link_target(&self, inode: &Inode) -> Result<String> {
        Symlink::load(inode, self.store)
            .map(|link| link.target)
            .ok_or(Error::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FileSystem, FsConfig};

    #[test]
    fn parent_file() {
        assert_eq!("a".parent_file(), Some((".", "a")));
        assert_eq!("a/b/c".parent_file(), Some(("a/b", "c")));
        assert_eq!("/a".parent_file(), Some(("/", "a")));
        assert_eq!("/a/b/".parent_file(), Some(("/a", "b")));
        assert_eq!("a//b".parent_file(), Some(("a/", "b")));
        assert_eq!("/".parent_file(), Some(("/", ".")));
        assert_eq!("./x".parent_file(), Some((".", "x")));
        assert_eq!("".parent_file(), None);
        assert!("/x".is_absolute());
        assert!(!"x/y".is_absolute());
    }

    fn fs() -> FileSystem {
        let mut fs = FileSystem::new(FsConfig::default());
        fs.mkdir("a").unwrap();
        fs.mkdir("a/b").unwrap();
        fs.create("a/b/f").unwrap();
        fs
    }

    #[test]
    fn dot_and_dotdot() {
        let fs = fs();
        let b = fs.resolve("a/b").unwrap();

        assert_eq!(fs.resolve("a/b/../b").unwrap(), b);
        assert_eq!(fs.resolve("./a/./b/").unwrap(), b);
        assert_eq!(fs.resolve("/a//b").unwrap(), b);
        // 根目录的 `..` 原地不动
        assert_eq!(fs.resolve("../../..").unwrap().inode, InodeId::ROOT);
        assert_eq!(fs.resolve("").unwrap().inode, InodeId::ROOT);
    }

    #[test]
    fn failures() {
        let fs = fs();
        assert_eq!(fs.resolve("a/missing"), Err(Error::NotFound));
        assert_eq!(fs.resolve("a/b/f"), Err(Error::NotADirectory));
        assert_eq!(fs.resolve("a/b/f/x"), Err(Error::NotADirectory));
    }

    #[test]
    fn symlink_splices_remaining_components() {
        let mut fs = fs();
        fs.symlink("a", "s").unwrap();
        fs.symlink("/a/b", "a/deep").unwrap();

        let b = fs.resolve("a/b").unwrap();
        assert_eq!(fs.resolve("s/b").unwrap(), b);
        assert_eq!(fs.resolve("s/deep").unwrap(), b);
        assert_eq!(fs.resolve("s/deep/..").unwrap().inode, fs.resolve("a").unwrap().inode);
    }

    #[test]
    fn symlink_loop_is_bounded() {
        let mut fs = fs();
        fs.symlink("loop2", "loop1").unwrap();
        fs.symlink("loop1", "loop2").unwrap();
        fs.symlink("self/x", "self").unwrap();

        assert_eq!(fs.resolve("loop1"), Err(Error::TooManySymlinks));
        assert_eq!(fs.resolve("self"), Err(Error::TooManySymlinks));
    }
}
