//! mkext4：从 tar 归档和主机目录生成 ext4 镜像

pub mod cli;
pub mod import;
pub mod tar;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use mkext4_core::{Ext4Filesystem, FsConfig, StdHal, SystemHal, VirtualMemory, EXT4_BLOCK_SIZE};

pub use cli::Args;
pub use import::ImportStats;

const MIB: u64 = 1 << 20;

/// 按参数构建文件系统（不写出）
pub fn build(args: &Args) -> Result<Ext4Filesystem<StdHal>> {
    let size = args
        .size
        .checked_mul(MIB)
        .context("image size overflows")?;
    let vm = VirtualMemory::new(size, EXT4_BLOCK_SIZE).context("failed to create virtual memory")?;
    let config = FsConfig {
        volume_name: args.volume_name.clone().unwrap_or_default(),
        ..Default::default()
    };
    let mut fs = Ext4Filesystem::<StdHal>::create(vm, 0, size, config)
        .context("failed to create filesystem")?;

    if args.deterministic {
        fs.make_deterministic(args.uuid.unwrap_or_default(), args.timestamp)?;
    }

    for archive in &args.archives {
        let entries = tar::read_archive(archive)?;
        let stats = import::apply_entries(&mut fs, entries)
            .with_context(|| format!("failed to import {}", archive.display()))?;
        log::debug!("imported {}: {:?}", archive.display(), stats);
    }

    for dir in &args.dirs {
        let stats = import::import_dir(&mut fs, dir)
            .with_context(|| format!("failed to import {}", dir.display()))?;
        log::debug!("imported {}: {:?}", dir.display(), stats);
    }

    Ok(fs)
}

/// 把镜像顺序写出到文件
pub fn write_image<H: SystemHal>(fs: Ext4Filesystem<H>, output: &Path) -> Result<()> {
    fs.dump_stats();
    let file = File::create(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    fs.into_vm()
        .write_to(BufWriter::new(file))
        .with_context(|| format!("failed to write {}", output.display()))
}

pub fn run(args: &Args) -> Result<()> {
    let fs = build(args)?;
    write_image(fs, &args.output)
}
