use clap::Parser;
use simfs::FsConfig;
use std::path::PathBuf;

#[derive(Parser)]
pub struct Cli {
    /// Script to run, one command per line; reads stdin if absent
    pub script: Option<PathBuf>,

    /// Stop at the first failing command
    #[arg(long)]
    pub strict: bool,

    /// Block size in bytes
    #[arg(long, default_value_t = simfs::BLOCK_SIZE)]
    pub block_size: usize,

    /// Number of blocks on the device
    #[arg(long, default_value_t = simfs::MAX_BLOCKS)]
    pub max_blocks: usize,

    /// Number of inode slots
    #[arg(long, default_value_t = simfs::MAX_INODES)]
    pub max_inodes: usize,

    /// Blocks reserved for every new inode
    #[arg(long, default_value_t = simfs::INITIAL_BLOCKS)]
    pub quota: usize,
}

impl Cli {
    pub fn config(&self) -> FsConfig {
        FsConfig {
            block_size: self.block_size,
            max_blocks: self.max_blocks,
            max_inodes: self.max_inodes,
            initial_blocks: self.quota,
            ..FsConfig::default()
        }
    }
}
