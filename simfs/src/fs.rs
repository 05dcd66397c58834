//! # 文件系统层
//!
//! 持有 inode 表、块存储、描述符表与当前目录，对外提供全部操作。
//!
//! 所有以路径为参数的操作都先解析出父目录，再在父目录里查找或插入最后一项，
//! 最后一项本身不做符号链接替换。操作要么整体生效，要么不改变任何状态：
//! 分配失败总是发生在修改目录表之前。

use core::fmt;
use std::sync::Arc;

use enumflags2::BitFlags;
use log::{debug, info, warn};
use spin::Mutex;

use crate::fd::FdTable;
use crate::layout::{Directory, Inode, InodeKind, InodePayload, Symlink};
use crate::path::{Path, Resolver};
use crate::sweep::Sweeper;
use crate::{BlockStore, Clock, FsConfig, InodeId, InodeTable, Result, SystemClock};
use vfs::{DirEntry, Error, Stat};

pub struct FileSystem {
    config: FsConfig,
    inodes: InodeTable,
    store: BlockStore,
    fds: FdTable,
    /// 当前目录
    cwd: InodeId,
    sweeper: Sweeper,
    clock: Box<dyn Clock>,
}

/// 资源用量，相当于 statfs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub block_size: usize,
    pub total_blocks: usize,
    pub free_blocks: usize,
    pub total_inodes: usize,
    pub free_inodes: usize,
    pub open_files: usize,
}

impl FileSystem {
    pub fn new(config: FsConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }

    /// 以指定时钟构建，根目录占用 0 号 inode
    pub fn with_clock(config: FsConfig, clock: impl Clock + 'static) -> Self {
        config.check();

        let mut inodes = InodeTable::new(config.max_inodes);
        let mut store = BlockStore::new(config.block_size, config.max_blocks);
        let now = clock.now();

        let root = inodes
            .alloc(InodeKind::Directory, config.initial_blocks, &mut store, now)
            .expect("an empty device always has room for root");
        assert_eq!(root, InodeId::ROOT);

        let inode = inodes.get_mut(root).expect("root was just allocated");
        inode.links = 1;
        Directory::open(inode, &store, "/", None)
            .save(inode, &mut store)
            .expect("the quota always holds an empty directory");

        info!(
            "simfs ready: {} blocks of {} bytes, {} inodes",
            config.max_blocks, config.block_size, config.max_inodes
        );

        Self {
            config,
            inodes,
            store,
            fds: FdTable::default(),
            cwd: root,
            sweeper: Sweeper::new(config.purge_interval_ms),
            clock: Box::new(clock),
        }
    }

    /// 供多个使用者共享的文件系统
    pub fn shared(config: FsConfig) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self::new(config)))
    }

    #[inline]
    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    /* 文件 */

    /// 创建空的普通文件
    pub fn create(&mut self, path: &str) -> Result<InodeId> {
        let (mut parent, name) = self.parent_of(path)?;
        if parent.contains(name) {
            return Err(Error::AlreadyExists);
        }
        self.check_name(name)?;

        let id = self.alloc_inode(InodeKind::File)?;
        self.attach(&mut parent, name, id)?;
        info!("create {path} (inode {id})");

        Ok(id)
    }

    /// 打开路径最后一项所指的 inode，返回描述符
    pub fn open(&mut self, path: &str) -> Result<usize> {
        let id = self.lookup(path)?;
        let fd = self.fds.open(id);
        debug!("open {path} as fd {fd}");
        Ok(fd)
    }

    /// 从描述符的当前位置读出至多 `size` 字节，不推进位置
    pub fn read(&self, fd: usize, size: usize) -> Result<Vec<u8>> {
        let file = self.fds.get(fd)?;
        let id = self.data_inode(file.inode)?;
        Ok(self.inode(id)?.read_at(file.offset, size, &self.store))
    }

    /// 在描述符的当前位置写入，不推进位置，也不扩容
    pub fn write(&mut self, fd: usize, data: &[u8]) -> Result<usize> {
        let file = self.fds.get(fd)?;
        let id = self.data_inode(file.inode)?;
        let now = self.now();

        let inode = self.inodes.get_mut(id).ok_or(Error::NotFound)?;
        let written = inode.write_at(file.offset, data, &mut self.store, now)?;
        debug!("fd {fd}: wrote {written} bytes at {}", file.offset);

        Ok(written)
    }

    #[inline]
    pub fn seek(&mut self, fd: usize, offset: usize) -> Result<()> {
        self.fds.seek(fd, offset)
    }

    /// 关闭描述符；无链接的 inode 留给下一次回收
    pub fn close(&mut self, fd: usize) -> Result<()> {
        self.fds.close(fd)?;
        debug!("close fd {fd}");
        Ok(())
    }

    /// 截断到 `size`，跟随符号链接
    pub fn truncate(&mut self, path: &str, size: usize) -> Result<()> {
        let id = self.lookup(path)?;
        let id = self.data_inode(id)?;
        let now = self.now();

        let inode = self.inodes.get_mut(id).ok_or(Error::NotFound)?;
        inode.truncate(size, &mut self.store, now)?;
        info!("truncate {path} to {size} bytes");

        Ok(())
    }

    /* 链接 */

    /// 为普通文件 `src` 建立硬链接 `dst`。
    ///
    /// `dst` 已是普通文件时改为指向 `src`，原 inode 的链接数减一。
    pub fn link(&mut self, src: &str, dst: &str) -> Result<()> {
        let src_id = self.lookup(src)?;
        match self.inode(src_id)?.kind {
            InodeKind::File => (),
            InodeKind::Directory => return Err(Error::IsADirectory),
            InodeKind::Symlink => return Err(Error::InvalidOperation),
        }

        let (mut parent, name) = self.parent_of(dst)?;
        self.check_name(name)?;

        let displaced = match parent.get(name) {
            None => {
                parent.insert(name, src_id)?;
                None
            }
            Some(old) if old != src_id && self.kind_in(old, InodeKind::File.into()) => {
                parent.entries.insert(String::from(name), src_id);
                Some(old)
            }
            Some(_) => return Err(Error::AlreadyExists),
        };
        self.save_dir(&parent)?;

        if let Some(inode) = self.inodes.get_mut(src_id) {
            inode.links += 1;
        }
        if let Some(old) = displaced {
            self.release(old);
        }
        info!("link {dst} -> inode {src_id}");

        Ok(())
    }

    /// 删除目录项并减少链接数，回收留给后台。目标不存在时只记日志
    pub fn unlink(&mut self, path: &str) -> Result<()> {
        let (mut parent, name, id) = match self.entry_of(path) {
            Ok(found) => found,
            Err(Error::NotFound) => {
                warn!("unlink {path}: no such file, skipped");
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        if self.kind_in(id, InodeKind::Directory.into()) {
            return Err(Error::IsADirectory);
        }

        parent.remove(name);
        self.save_dir(&parent)?;
        if let Some(inode) = self.inodes.get_mut(id) {
            inode.links = inode.links.saturating_sub(1);
            debug!("unlink {path}: inode {id} has {} links", inode.links);
        }

        Ok(())
    }

    /// 删除普通文件或符号链接；链接数归零且未打开时立即回收。
    ///
    /// 符号链接也可以用 rm 删除，删除的是链接本身，不影响目标。
    pub fn rm(&mut self, path: &str) -> Result<()> {
        let (mut parent, name, id) = self.entry_of(path)?;
        if self.kind_in(id, InodeKind::Directory.into()) {
            return Err(Error::IsADirectory);
        }

        parent.remove(name);
        self.save_dir(&parent)?;
        self.release(id);
        info!("rm {path}");

        Ok(())
    }

    /// 创建指向 `target` 的符号链接 `path`，目标无需存在
    pub fn symlink(&mut self, target: &str, path: &str) -> Result<InodeId> {
        if target.is_empty() {
            return Err(Error::InvalidOperation);
        }
        let (mut parent, name) = self.parent_of(path)?;
        if parent.contains(name) {
            return Err(Error::AlreadyExists);
        }
        self.check_name(name)?;

        let id = self.alloc_inode(InodeKind::Symlink)?;
        let link = Symlink::new(id, target);
        if let Err(err) = self.reserve(id, link.encoded_len()) {
            self.inodes.dealloc(id, &mut self.store);
            return Err(err);
        }
        if let Some(inode) = self.inodes.get_mut(id) {
            link.save(inode, &mut self.store)?;
        }
        self.attach(&mut parent, name, id)?;
        info!("symlink {path} -> {target}");

        Ok(id)
    }

    /* 目录 */

    pub fn mkdir(&mut self, path: &str) -> Result<InodeId> {
        let (mut parent, name) = self.parent_of(path)?;
        if parent.contains(name) {
            return Err(Error::AlreadyExists);
        }
        self.check_name(name)?;

        let id = self.alloc_inode(InodeKind::Directory)?;
        if let Some(inode) = self.inodes.get_mut(id) {
            Directory::open(inode, &self.store, name, Some(parent.inode))
                .save(inode, &mut self.store)?;
        }
        self.attach(&mut parent, name, id)?;
        info!("mkdir {path} (inode {id})");

        Ok(id)
    }

    /// 删除空目录。根目录与当前目录不可删除
    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        let (mut parent, name, id) = self.entry_of(path)?;
        if id == InodeId::ROOT || id == self.cwd || name == "." || name == ".." {
            return Err(Error::InvalidOperation);
        }

        if !self.resolver().directory(id)?.is_empty() {
            return Err(Error::DirectoryNotEmpty);
        }

        parent.remove(name);
        self.save_dir(&parent)?;
        if let Some(inode) = self.inodes.get_mut(id) {
            inode.links = 0;
        }
        if !self.fds.is_open(id) {
            self.inodes.dealloc(id, &mut self.store);
        }
        info!("rmdir {path}");

        Ok(())
    }

    /// 切换当前目录，路径中的符号链接全部替换
    pub fn cd(&mut self, path: &str) -> Result<()> {
        let dir = self.resolver().resolve(path)?;
        self.cwd = dir.inode;
        debug!("cd {path}: now at inode {}", self.cwd);
        Ok(())
    }

    /// 当前目录的视图
    pub fn cwd(&self) -> Result<Directory> {
        self.resolver().directory(self.cwd)
    }

    /// 把路径解析为目录
    pub fn resolve(&self, path: &str) -> Result<Directory> {
        self.resolver().resolve(path)
    }

    /// 列出当前目录
    pub fn ls(&self) -> Result<Vec<DirEntry>> {
        self.cwd().map(|dir| self.listing(&dir))
    }

    pub fn ls_at(&self, path: &str) -> Result<Vec<DirEntry>> {
        self.resolve(path).map(|dir| self.listing(&dir))
    }

    /// 当前目录的绝对路径
    pub fn pwd(&self) -> Result<String> {
        let resolver = self.resolver();
        let mut names = Vec::new();
        let mut current = resolver.directory(self.cwd)?;

        while let Some(parent_id) = current.parent {
            let parent = resolver.directory(parent_id)?;
            let name = parent
                .children()
                .find(|&(_, id)| id == current.inode)
                .map_or_else(|| current.name.clone(), |(name, _)| String::from(name));
            names.push(name);
            current = parent;
        }

        if names.is_empty() {
            return Ok(String::from("/"));
        }
        Ok(names.iter().rev().fold(String::new(), |mut path, name| {
            path.push('/');
            path.push_str(name);
            path
        }))
    }

    /* 元数据 */

    /// 路径最后一项的元数据，不跟随符号链接
    pub fn stat(&self, path: &str) -> Result<Stat> {
        self.stat_of(self.lookup(path)?)
    }

    pub fn fstat(&self, fd: usize) -> Result<Stat> {
        self.stat_of(self.fds.get(fd)?.inode)
    }

    pub fn usage(&self) -> Usage {
        Usage {
            block_size: self.store.block_size(),
            total_blocks: self.store.capacity(),
            free_blocks: self.store.free(),
            total_inodes: self.inodes.capacity(),
            free_inodes: self.inodes.free(),
            open_files: self.fds.len(),
        }
    }

    /// inode 内容按其类型解读
    pub fn payload(&self, id: InodeId) -> Result<InodePayload> {
        InodePayload::decode(self.inode(id)?, &self.store).ok_or(Error::NotFound)
    }

    /* 回收 */

    /// 回收所有无链接且未打开的 inode 及其块，返回回收的个数
    pub fn purge(&mut self) -> usize {
        let dead: Vec<InodeId> = self
            .inodes
            .iter()
            .filter(|inode| {
                inode.id != InodeId::ROOT && inode.links == 0 && !self.fds.is_open(inode.id)
            })
            .map(|inode| inode.id)
            .collect();

        for &id in &dead {
            self.inodes.dealloc(id, &mut self.store);
        }
        if !dead.is_empty() {
            info!("purge reclaimed {} inodes", dead.len());
        }

        dead.len()
    }

    /// 推进时间；满一个回收周期时执行一次 [`FileSystem::purge`]。
    /// 一次跨越多个周期也只回收一遍，再扫也不会有新的收获
    pub fn tick(&mut self, elapsed_ms: u64) -> usize {
        if self.sweeper.advance(elapsed_ms) {
            self.purge()
        } else {
            0
        }
    }
}

impl FileSystem {
    #[inline]
    fn now(&self) -> u64 {
        self.clock.now()
    }

    #[inline]
    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(
            &self.inodes,
            &self.store,
            self.cwd,
            self.config.max_symlinks,
        )
    }

    #[inline]
    fn inode(&self, id: InodeId) -> Result<&Inode> {
        self.inodes.get(id).ok_or(Error::NotFound)
    }

    fn kind_in(&self, id: InodeId, kinds: BitFlags<InodeKind>) -> bool {
        self.inodes
            .get(id)
            .is_some_and(|inode| kinds.contains(inode.kind))
    }

    /// 解析出父目录，返回父目录与最后一项的名字
    fn parent_of<'p>(&self, path: &'p str) -> Result<(Directory, &'p str)> {
        let (parent, name) = path.parent_file().ok_or(Error::NotFound)?;
        Ok((self.resolver().resolve(parent)?, name))
    }

    /// 父目录、名字与目录项所指的 inode
    fn entry_of<'p>(&self, path: &'p str) -> Result<(Directory, &'p str, InodeId)> {
        let (parent, name) = self.parent_of(path)?;
        let id = parent.get(name).ok_or(Error::NotFound)?;
        self.inode(id)?;
        Ok((parent, name, id))
    }

    #[inline]
    fn lookup(&self, path: &str) -> Result<InodeId> {
        self.resolver().lookup(path)
    }

    /// 沿符号链接找到存放数据的 inode，目录不能读写
    fn data_inode(&self, id: InodeId) -> Result<InodeId> {
        let id = self.resolver().follow(id)?;
        if self.inode(id)?.is_dir() {
            return Err(Error::IsADirectory);
        }
        Ok(id)
    }

    fn check_name(&self, name: &str) -> Result<()> {
        // 目录项中的名字以 \0 结尾
        if name.is_empty() || name == "." || name == ".." || name.contains('\0') {
            return Err(Error::InvalidOperation);
        }
        if name.len() > self.config.max_filename_length {
            return Err(Error::NameTooLong);
        }
        Ok(())
    }

    /// 分配带初始配额的 inode，链接数为一
    fn alloc_inode(&mut self, kind: InodeKind) -> Result<InodeId> {
        let now = self.now();
        let id = self
            .inodes
            .alloc(kind, self.config.initial_blocks, &mut self.store, now)?;
        if let Some(inode) = self.inodes.get_mut(id) {
            inode.links = 1;
        }
        Ok(id)
    }

    /// 把新 inode 挂到父目录下；失败时回收该 inode
    fn attach(&mut self, parent: &mut Directory, name: &str, id: InodeId) -> Result<()> {
        let attached = parent
            .insert(name, id)
            .and_then(|()| self.save_dir(parent));
        if attached.is_err() {
            self.inodes.dealloc(id, &mut self.store);
        }
        attached
    }

    /// 确保 inode 的配额不小于 `len` 字节，不足时追加新块
    fn reserve(&mut self, id: InodeId, len: usize) -> Result<()> {
        let block_size = self.store.block_size();
        let inode = self.inodes.get_mut(id).ok_or(Error::NotFound)?;
        let have = inode.block_ids().len();
        let need = len.div_ceil(block_size);

        if need > have {
            let new_blocks = self.store.alloc_many(need - have)?;
            debug!("inode {id} grows by {} blocks", new_blocks.len());
            inode.extend_blocks(new_blocks);
        }

        Ok(())
    }

    /// 写回目录，必要时先扩容
    fn save_dir(&mut self, dir: &Directory) -> Result<()> {
        self.reserve(dir.inode, dir.encoded_len())?;

        let now = self.now();
        let inode = self.inodes.get_mut(dir.inode).ok_or(Error::NotFound)?;
        dir.save(inode, &mut self.store)?;
        inode.modified = now;

        Ok(())
    }

    /// 链接数减一，归零且未打开时立即回收
    fn release(&mut self, id: InodeId) {
        let Some(inode) = self.inodes.get_mut(id) else {
            return;
        };
        inode.links = inode.links.saturating_sub(1);

        if inode.links == 0 && !self.fds.is_open(id) {
            self.inodes.dealloc(id, &mut self.store);
        }
    }

    fn stat_of(&self, id: InodeId) -> Result<Stat> {
        let inode = self.inode(id)?;
        Ok(Stat {
            inode: id.into(),
            kind: inode.kind.into(),
            size: inode.size(&self.store) as u64,
            blocks: inode.block_ids().len() as u64,
            block_size: self.store.block_size() as u64,
            links: inode.links,
            created: inode.created,
            modified: inode.modified,
        })
    }

    fn listing(&self, dir: &Directory) -> Vec<DirEntry> {
        dir.entries
            .iter()
            .filter_map(|(name, &id)| {
                let Some(inode) = self.inodes.get(id) else {
                    warn!("{name} refers to free inode {id}");
                    return None;
                };
                let target = match inode.kind {
                    InodeKind::Symlink => Symlink::load(inode, &self.store).map(|link| link.target),
                    _ => None,
                };

                Some(DirEntry {
                    inode: id.into(),
                    ty: inode.kind.into(),
                    name: name.clone(),
                    target,
                })
            })
            .collect()
    }

    /// 块的归属：每个在用块恰好属于一个 inode，且位图与之一致
    #[cfg(test)]
    fn check_ownership(&self) {
        let mut owned = std::collections::BTreeSet::new();
        for inode in self.inodes.iter() {
            for &block in inode.block_ids() {
                assert!(owned.insert(block), "block {block} is shared");
                assert!(self.store.is_allocated(block), "block {block} is not allocated");
            }
        }
        assert_eq!(owned.len(), self.store.capacity() - self.store.free());
    }
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Blocks: {}/{} free ({} bytes each)",
            self.free_blocks, self.total_blocks, self.block_size
        )?;
        writeln!(f, "Inodes: {}/{} free", self.free_inodes, self.total_inodes)?;
        write!(f, "Open files: {}", self.open_files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;

    fn small() -> FsConfig {
        FsConfig {
            block_size: 64,
            max_blocks: 64,
            max_inodes: 8,
            initial_blocks: 2,
            ..FsConfig::default()
        }
    }

    #[test]
    fn root_is_inode_zero() {
        let fs = FileSystem::new(small());
        let root = fs.cwd().unwrap();

        assert_eq!(root.inode, InodeId::ROOT);
        assert_eq!(root.parent, None);
        assert_eq!(fs.stat("/").unwrap().links, 1);
        assert_eq!(fs.pwd().unwrap(), "/");
        fs.check_ownership();
    }

    #[test]
    fn failed_create_changes_nothing() {
        let mut fs = FileSystem::new(small());
        for i in 0..7 {
            fs.create(&format!("f{i}")).unwrap();
        }
        let before = fs.usage();

        assert_eq!(fs.create("f7"), Err(Error::OutOfInodes));
        assert_eq!(fs.usage(), before);
        assert!(!fs.cwd().unwrap().contains("f7"));
        fs.check_ownership();
    }

    #[test]
    fn directory_grows_on_insert() {
        let mut fs = FileSystem::new(FsConfig {
            max_inodes: 16,
            ..small()
        });
        // 表头 40 字节，两块只够 `.` 之外再放 1 项
        let blocks_before = fs.stat("/").unwrap().blocks;
        for i in 0..6 {
            fs.create(&format!("f{i}")).unwrap();
        }

        assert!(fs.stat("/").unwrap().blocks > blocks_before);
        assert_eq!(fs.ls().unwrap().len(), 7);
        fs.check_ownership();
    }

    #[test]
    fn directory_growth_failure_rolls_back() {
        let mut fs = FileSystem::new(FsConfig {
            max_blocks: 6,
            ..small()
        });
        // 根目录 2 块，f0 2 块，再建 f1 时剩下的 2 块被 f1 占用，根目录无法扩容
        fs.create("f0").unwrap();
        let before = fs.usage();

        assert_eq!(fs.create("f1"), Err(Error::OutOfBlocks));
        assert_eq!(fs.usage(), before);
        fs.check_ownership();
    }

    #[test]
    fn timestamps_follow_the_clock() {
        let clock = ManualClock::new(1_000);
        let mut fs = FileSystem::with_clock(small(), clock.clone());
        fs.create("f").unwrap();

        clock.advance(250);
        let fd = fs.open("f").unwrap();
        fs.write(fd, b"hi").unwrap();

        let stat = fs.fstat(fd).unwrap();
        assert_eq!(stat.created, 1_000);
        assert_eq!(stat.modified, 1_250);
    }

    #[test]
    fn long_names() {
        let mut fs = FileSystem::new(small());
        let name = "n".repeat(FsConfig::default().max_filename_length + 1);

        assert_eq!(fs.create(&name), Err(Error::NameTooLong));
        assert_eq!(fs.mkdir("a/.."), Err(Error::NotFound));
        assert_eq!(fs.mkdir(".."), Err(Error::InvalidOperation));
    }

    #[test]
    fn purge_reclaims_everything_unreachable() {
        let mut fs = FileSystem::new(small());
        fs.create("a").unwrap();
        fs.create("b").unwrap();
        let fd = fs.open("b").unwrap();
        fs.unlink("a").unwrap();
        fs.unlink("b").unwrap();

        // b 仍被打开
        assert_eq!(fs.purge(), 1);
        fs.close(fd).unwrap();
        assert_eq!(fs.tick(499), 0);
        assert_eq!(fs.tick(1), 1);
        assert_eq!(fs.usage().free_inodes, 7);
        fs.check_ownership();
    }

    #[test]
    fn rmdir_of_open_directory_is_deferred() {
        let mut fs = FileSystem::new(small());
        fs.mkdir("d").unwrap();
        let fd = fs.open("d").unwrap();

        fs.rmdir("d").unwrap();
        assert_eq!(fs.usage().free_inodes, 6);
        assert_eq!(fs.read(fd, 1), Err(Error::IsADirectory));

        fs.close(fd).unwrap();
        assert_eq!(fs.purge(), 1);
        assert_eq!(fs.usage().free_inodes, 7);
    }
}
