use super::*;

fn shell() -> Shell {
    let _ = env_logger::builder().is_test(true).try_init();
    Shell::new(FsConfig::default())
}

fn run(shell: &mut Shell, script: &str) -> Vec<String> {
    script
        .lines()
        .map(|line| shell.execute(line).unwrap())
        .filter(|output| !output.is_empty())
        .collect()
}

#[test]
fn file_round_trip() {
    let mut shell = shell();
    let output = run(
        &mut shell,
        "
        # 新建文件并写入
        create f.txt
        open f.txt
        write 0 hello   world
        seek 0 6
        read 0 100
        ",
    );

    assert_eq!(output, ["0", "wrote 11 bytes", "world"]);
}

#[test]
fn directories_and_links() {
    let mut shell = shell();
    run(
        &mut shell,
        "
        mkdir dir1
        cd dir1
        create x.txt
        cd ..
        symlink dir1 s
        link s/x.txt y.txt
        ",
    );

    assert_eq!(shell.execute("ls s").unwrap().lines().count(), 3);
    assert!(shell.execute("stat y.txt").unwrap().contains("Links: 2"));
    assert!(shell.execute("ls").unwrap().contains("s -> dir1"));

    shell.execute("cd s").unwrap();
    assert_eq!(shell.execute("pwd").unwrap(), "/dir1");
}

#[test]
fn reclamation_commands() {
    let mut shell = shell();
    run(&mut shell, "create a\nunlink a");

    assert_eq!(shell.execute("tick 499").unwrap(), "reclaimed 0 inodes");
    assert_eq!(shell.execute("tick 1").unwrap(), "reclaimed 1 inodes");
    assert!(shell.execute("df").unwrap().contains("Inodes: 127/128 free"));
}

#[test]
fn errors() {
    let mut shell = shell();

    assert_eq!(
        shell.execute("frobnicate"),
        Err(ShellError::UnknownCommand(String::from("frobnicate")))
    );
    assert_eq!(
        shell.execute("read 0"),
        Err(ShellError::Usage("read <fd> <size>"))
    );
    assert_eq!(
        shell.execute("seek x 0"),
        Err(ShellError::Usage("seek <fd> <offset>"))
    );
    assert_eq!(shell.execute("rm nope"), Err(ShellError::Fs(Error::NotFound)));
    assert_eq!(shell.execute("unlink nope"), Ok(String::new()));
    assert_eq!(
        shell.execute("rmdir /").unwrap_err().to_string(),
        Error::InvalidOperation.to_string()
    );
}
