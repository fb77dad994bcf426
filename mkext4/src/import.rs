//! 把归档条目和主机目录写入文件系统
//!
//! 每个条目：路径不存在时先按需创建父目录再创建节点；
//! 之后无论节点是否新建，都重新应用权限、属主和修改时间。

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use mkext4_core::fs::clean_path;
use mkext4_core::region::FileRegion;
use mkext4_core::{Ext4Filesystem, Region, SystemHal};

use crate::tar::{EntryKind, TarEntry};

/// 导入统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportStats {
    pub files: usize,
    pub dirs: usize,
    pub symlinks: usize,
    pub hard_links: usize,
    /// 已存在、只更新了属性的条目
    pub existing: usize,
}

/// 节点属性
#[derive(Debug, Clone, Copy)]
struct Attrs {
    mode: u16,
    uid: u32,
    gid: u32,
    mtime: u32,
}

/// 要创建的节点
enum Node {
    File(Region),
    Directory,
    Symlink(String),
    HardLink(String),
}

/// 写入一个归档的全部条目
pub fn apply_entries<H: SystemHal>(
    fs: &mut Ext4Filesystem<H>,
    entries: Vec<TarEntry>,
) -> Result<ImportStats> {
    let mut stats = ImportStats::default();
    for entry in entries {
        let path = clean_path(&entry.path);
        let attrs = Attrs {
            mode: entry.mode,
            uid: entry.uid,
            gid: entry.gid,
            mtime: entry.mtime,
        };
        let node = match entry.kind {
            EntryKind::File => Node::File(Region::from(entry.data)),
            EntryKind::Directory => Node::Directory,
            EntryKind::Symlink => Node::Symlink(entry.link_target),
            // 硬链接目标相对归档根目录
            EntryKind::HardLink => Node::HardLink(clean_path(&entry.link_target)),
        };
        apply(fs, &path, node, Some(attrs), &mut stats)
            .with_context(|| format!("failed to add {path}"))?;
    }
    Ok(stats)
}

/// 递归导入主机目录，按名称排序遍历
pub fn import_dir<H: SystemHal>(fs: &mut Ext4Filesystem<H>, host: &Path) -> Result<ImportStats> {
    let mut stats = ImportStats::default();
    walk(fs, host, "/", &mut stats)?;
    Ok(stats)
}

fn walk<H: SystemHal>(
    fs: &mut Ext4Filesystem<H>,
    host: &Path,
    guest: &str,
    stats: &mut ImportStats,
) -> Result<()> {
    let mut children: Vec<_> = fs::read_dir(host)
        .with_context(|| format!("failed to list {}", host.display()))?
        .collect::<std::io::Result<_>>()
        .with_context(|| format!("failed to list {}", host.display()))?;
    children.sort_by_key(|e| e.file_name());

    for child in children {
        let host_path = child.path();
        let name = child.file_name();
        let Some(name) = name.to_str() else {
            log::warn!("skipping non UTF-8 file name {}", host_path.display());
            continue;
        };
        let guest_path = clean_path(&format!("{guest}/{name}"));

        let meta = fs::symlink_metadata(&host_path)
            .with_context(|| format!("failed to stat {}", host_path.display()))?;
        let file_type = meta.file_type();
        let node = if file_type.is_dir() {
            Node::Directory
        } else if file_type.is_symlink() {
            let target = fs::read_link(&host_path)
                .with_context(|| format!("failed to read link {}", host_path.display()))?;
            Node::Symlink(target.to_string_lossy().into_owned())
        } else if file_type.is_file() {
            let region = FileRegion::from_path(&host_path)
                .with_context(|| format!("failed to stat {}", host_path.display()))?;
            Node::File(Region::File(region))
        } else {
            log::warn!("skipping special file {}", host_path.display());
            continue;
        };

        apply(fs, &guest_path, node, host_attrs(&meta), stats)
            .with_context(|| format!("failed to add {}", host_path.display()))?;

        if file_type.is_dir() {
            walk(fs, &host_path, &guest_path, stats)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn host_attrs(meta: &fs::Metadata) -> Option<Attrs> {
    use std::os::unix::fs::MetadataExt;

    Some(Attrs {
        mode: (meta.mode() & 0o7777) as u16,
        uid: meta.uid(),
        gid: meta.gid(),
        mtime: meta.mtime().clamp(0, u32::MAX as i64) as u32,
    })
}

#[cfg(not(unix))]
fn host_attrs(_meta: &fs::Metadata) -> Option<Attrs> {
    None
}

/// 创建（如不存在）并设置属性
fn apply<H: SystemHal>(
    fs: &mut Ext4Filesystem<H>,
    path: &str,
    node: Node,
    attrs: Option<Attrs>,
    stats: &mut ImportStats,
) -> Result<()> {
    if path == "/" {
        // 归档中的根目录条目只带属性
    } else if fs.exists(path) {
        log::debug!("{path} already exists, updating attributes");
        stats.existing += 1;
    } else {
        if let Some((parent, _)) = path.rsplit_once('/') {
            if !parent.is_empty() && !fs.exists(parent) {
                fs.mkdir(parent, true)?;
            }
        }
        match node {
            Node::File(region) => {
                fs.create_file_from_region(path, region)?;
                stats.files += 1;
            }
            Node::Directory => {
                fs.mkdir(path, false)?;
                stats.dirs += 1;
            }
            Node::Symlink(target) => {
                fs.symlink(path, &target)?;
                stats.symlinks += 1;
            }
            Node::HardLink(target) => {
                fs.link(path, &target)?;
                stats.hard_links += 1;
            }
        }
    }

    if let Some(attrs) = attrs {
        fs.chmod(path, attrs.mode)?;
        fs.chown(path, attrs.uid, attrs.gid)?;
        fs.chtimes(path, attrs.mtime)?;
    }
    Ok(())
}
