//! simfs 的命令解释器：一行一条命令。

#[cfg(test)]
mod tests;

use core::str::FromStr;

use derive_more::Display;
use simfs::{FileSystem, FsConfig};
use vfs::Error;

#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum ShellError {
    #[display(fmt = "unknown command: {}", _0)]
    UnknownCommand(String),
    #[display(fmt = "usage: {}", _0)]
    Usage(&'static str),
    #[display(fmt = "{}", _0)]
    Fs(Error),
}

impl From<Error> for ShellError {
    #[inline]
    fn from(err: Error) -> Self {
        Self::Fs(err)
    }
}

impl std::error::Error for ShellError {}

pub struct Shell {
    fs: FileSystem,
}

impl Shell {
    pub fn new(config: FsConfig) -> Self {
        Self {
            fs: FileSystem::new(config),
        }
    }

    #[inline]
    pub fn fs(&self) -> &FileSystem {
        &self.fs
    }

    /// 执行一行命令，返回要打印的内容，可能为空。
    /// 空行与 `#` 开头的注释什么也不做。
    pub fn execute(&mut self, line: &str) -> Result<String, ShellError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(String::new());
        }

        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(String::new());
        };
        let args: Vec<&str> = words.collect();
        log::trace!("{command} {args:?}");

        let fs = &mut self.fs;
        let output = match command {
            "create" => {
                let [path] = exact(&args, "create <path>")?;
                fs.create(path)?;
                String::new()
            }
            "open" => {
                let [path] = exact(&args, "open <path>")?;
                fs.open(path)?.to_string()
            }
            "close" => {
                let [fd] = exact(&args, "close <fd>")?;
                fs.close(parse(fd, "close <fd>")?)?;
                String::new()
            }
            "read" => {
                const USAGE: &str = "read <fd> <size>";
                let [fd, size] = exact(&args, USAGE)?;
                let data = fs.read(parse(fd, USAGE)?, parse(size, USAGE)?)?;
                String::from_utf8_lossy(&data).into_owned()
            }
            "write" => {
                const USAGE: &str = "write <fd> <text...>";
                let Some((fd, text)) = args.split_first() else {
                    return Err(ShellError::Usage(USAGE));
                };
                let written = fs.write(parse(fd, USAGE)?, text.join(" ").as_bytes())?;
                format!("wrote {written} bytes")
            }
            "seek" => {
                const USAGE: &str = "seek <fd> <offset>";
                let [fd, offset] = exact(&args, USAGE)?;
                fs.seek(parse(fd, USAGE)?, parse(offset, USAGE)?)?;
                String::new()
            }
            "truncate" => {
                const USAGE: &str = "truncate <path> <size>";
                let [path, size] = exact(&args, USAGE)?;
                fs.truncate(path, parse(size, USAGE)?)?;
                String::new()
            }
            "link" => {
                let [src, dst] = exact(&args, "link <src> <dst>")?;
                fs.link(src, dst)?;
                String::new()
            }
            "unlink" => {
                let [path] = exact(&args, "unlink <path>")?;
                fs.unlink(path)?;
                String::new()
            }
            "rm" => {
                let [path] = exact(&args, "rm <path>")?;
                fs.rm(path)?;
                String::new()
            }
            "symlink" => {
                let [target, path] = exact(&args, "symlink <target> <path>")?;
                fs.symlink(target, path)?;
                String::new()
            }
            "mkdir" => {
                let [path] = exact(&args, "mkdir <path>")?;
                fs.mkdir(path)?;
                String::new()
            }
            "rmdir" => {
                let [path] = exact(&args, "rmdir <path>")?;
                fs.rmdir(path)?;
                String::new()
            }
            "cd" => {
                let [path] = exact(&args, "cd <path>")?;
                fs.cd(path)?;
                String::new()
            }
            "ls" => {
                let entries = match args.as_slice() {
                    [] => fs.ls()?,
                    [path] => fs.ls_at(path)?,
                    _ => return Err(ShellError::Usage("ls [path]")),
                };
                entries
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            "pwd" => {
                let [] = exact(&args, "pwd")?;
                fs.pwd()?
            }
            "stat" => {
                let [path] = exact(&args, "stat <path>")?;
                fs.stat(path)?.to_string()
            }
            "fstat" => {
                let [fd] = exact(&args, "fstat <fd>")?;
                fs.fstat(parse(fd, "fstat <fd>")?)?.to_string()
            }
            "df" => {
                let [] = exact(&args, "df")?;
                fs.usage().to_string()
            }
            "purge" => {
                let [] = exact(&args, "purge")?;
                format!("reclaimed {} inodes", fs.purge())
            }
            "tick" => {
                let [ms] = exact(&args, "tick <ms>")?;
                format!("reclaimed {} inodes", fs.tick(parse(ms, "tick <ms>")?))
            }
            _ => return Err(ShellError::UnknownCommand(String::from(command))),
        };

        Ok(output)
    }
}

/// 参数个数必须恰好为 `N`
fn exact<'a, const N: usize>(
    args: &[&'a str],
    usage: &'static str,
) -> Result<[&'a str; N], ShellError> {
    <[&str; N]>::try_from(args).map_err(|_| ShellError::Usage(usage))
}

fn parse<T: FromStr>(arg: &str, usage: &'static str) -> Result<T, ShellError> {
    arg.parse().map_err(|_| ShellError::Usage(usage))
}
