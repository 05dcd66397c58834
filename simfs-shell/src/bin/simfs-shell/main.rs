mod cli;

use std::fs;
use std::io;
use std::io::Read;

use clap::Parser;
use cli::Cli;
use simfs_shell::Shell;

fn main() -> io::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let script = match &cli.script {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut script = String::new();
            io::stdin().read_to_string(&mut script)?;
            script
        }
    };

    let mut shell = Shell::new(cli.config());
    for (lineno, line) in script.lines().enumerate() {
        match shell.execute(line) {
            Ok(output) if output.is_empty() => (),
            Ok(output) => println!("{output}"),
            Err(err) if cli.strict => {
                return Err(io::Error::other(format!("line {}: {err}", lineno + 1)));
            }
            Err(err) => eprintln!("line {}: {line}: {err}", lineno + 1),
        }
    }

    Ok(())
}
