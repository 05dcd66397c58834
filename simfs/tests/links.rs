use simfs::{Error, FileSystem, FsConfig, InodeId, InodePayload, StatKind};

fn fs() -> FileSystem {
    let _ = env_logger::builder().is_test(true).try_init();
    FileSystem::new(FsConfig::default())
}

fn write_file(fs: &mut FileSystem, path: &str, data: &[u8]) {
    fs.create(path).unwrap();
    let fd = fs.open(path).unwrap();
    fs.write(fd, data).unwrap();
    fs.close(fd).unwrap();
}

#[test]
fn link_count_follows_names() {
    let mut fs = fs();
    let before = fs.usage();
    fs.create("a").unwrap();
    assert_eq!(fs.stat("a").unwrap().links, 1);

    fs.link("a", "b").unwrap();
    fs.link("a", "c").unwrap();
    assert_eq!(fs.stat("a").unwrap().links, 3);

    fs.unlink("b").unwrap();
    assert_eq!(fs.stat("a").unwrap().links, 2);
    fs.rm("c").unwrap();
    assert_eq!(fs.stat("a").unwrap().links, 1);

    // 最后一个名字被 rm 时立即回收
    fs.rm("a").unwrap();
    assert_eq!(fs.usage(), before);
}

#[test]
fn unlink_leaves_reclamation_to_the_sweep() {
    let mut fs = fs();
    let before = fs.usage();
    fs.create("a").unwrap();
    fs.unlink("a").unwrap();

    assert_eq!(fs.usage().free_inodes, before.free_inodes - 1);
    assert_eq!(fs.tick(100), 0);
    assert_eq!(fs.tick(400), 1);
    assert_eq!(fs.usage(), before);
}

#[test]
fn unlink_is_lenient_but_rm_is_not() {
    let mut fs = fs();
    assert_eq!(fs.unlink("missing"), Ok(()));
    assert_eq!(fs.unlink("no/such/dir"), Ok(()));
    assert_eq!(fs.rm("missing"), Err(Error::NotFound));
}

#[test]
fn directories_cannot_be_linked_or_removed_as_files() {
    let mut fs = fs();
    fs.mkdir("d").unwrap();

    assert_eq!(fs.link("d", "e"), Err(Error::IsADirectory));
    assert_eq!(fs.unlink("d"), Err(Error::IsADirectory));
    assert_eq!(fs.rm("d"), Err(Error::IsADirectory));
    assert!(fs.resolve("d").is_ok());
}

#[test]
fn open_file_survives_rm() {
    let mut fs = fs();
    write_file(&mut fs, "f", b"still here");
    let before = fs.usage();
    let fd = fs.open("f").unwrap();

    fs.rm("f").unwrap();
    assert_eq!(fs.open("f"), Err(Error::NotFound));
    assert_eq!(fs.read(fd, 64).unwrap(), b"still here");
    assert_eq!(fs.fstat(fd).unwrap().links, 0);
    assert_eq!(fs.purge(), 0);

    fs.close(fd).unwrap();
    assert_eq!(fs.purge(), 1);
    assert_eq!(fs.usage().free_inodes, before.free_inodes + 1);
}

#[test]
fn link_replaces_an_existing_file() {
    let mut fs = fs();
    write_file(&mut fs, "a", b"A");
    write_file(&mut fs, "b", b"B");
    let free = fs.usage().free_inodes;

    fs.link("a", "b").unwrap();
    let fd = fs.open("b").unwrap();
    assert_eq!(fs.read(fd, 8).unwrap(), b"A");
    assert_eq!(fs.stat("a").unwrap().links, 2);
    // 被替换的 inode 已经回收
    assert_eq!(fs.usage().free_inodes, free + 1);

    assert_eq!(fs.link("a", "b"), Err(Error::AlreadyExists));
    fs.mkdir("d").unwrap();
    assert_eq!(fs.link("a", "d"), Err(Error::AlreadyExists));
}

#[test]
fn symlink_to_file() {
    let mut fs = fs();
    write_file(&mut fs, "f", b"data");
    fs.symlink("f", "l").unwrap();

    let fd = fs.open("l").unwrap();
    assert_eq!(fs.read(fd, 16).unwrap(), b"data");
    assert_eq!(fs.stat("l").unwrap().kind, StatKind::LINK);
    assert_eq!(fs.stat("f").unwrap().kind, StatKind::FILE);

    fs.truncate("l", 2).unwrap();
    assert_eq!(fs.stat("f").unwrap().size, 2);
    assert_eq!(fs.read(fd, 16).unwrap(), b"da");

    let id = fs.ls().unwrap().into_iter().find(|e| e.name == "l").unwrap().inode;
    assert_eq!(
        fs.payload(InodeId::try_from(id).unwrap()).unwrap(),
        InodePayload::Symlink(String::from("f"))
    );

    // 删除符号链接不影响目标
    fs.rm("l").unwrap();
    assert_eq!(fs.stat("f").unwrap().links, 1);
}

#[test]
fn dangling_symlink() {
    let mut fs = fs();
    fs.symlink("nowhere", "d").unwrap();

    let fd = fs.open("d").unwrap();
    assert_eq!(fs.read(fd, 1), Err(Error::NotFound));
    assert_eq!(fs.cd("d"), Err(Error::NotFound));

    fs.create("nowhere").unwrap();
    assert_eq!(fs.read(fd, 1).unwrap(), b"");
}

#[test]
fn long_symlink_target_grows_the_inode() {
    let mut fs = FileSystem::new(FsConfig {
        block_size: 32,
        initial_blocks: 4,
        ..FsConfig::default()
    });
    let target = "/a".repeat(100);
    fs.symlink(&target, "l").unwrap();

    assert!(fs.stat("l").unwrap().blocks > 4);
    let link = fs.ls().unwrap().into_iter().find(|e| e.name == "l").unwrap();
    assert_eq!(link.target, Some(target));
}
