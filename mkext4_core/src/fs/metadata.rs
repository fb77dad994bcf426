//! 读回接口使用的元数据类型

use alloc::string::String;

use super::FileType;

/// 文件元数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// inode 编号
    pub ino: u32,
    /// 完整 mode（类型位 + 权限位）
    pub mode: u16,
    pub file_type: FileType,
    /// 文件大小（字节）
    pub size: u64,
    /// 硬链接数量
    pub nlink: u16,
    pub uid: u32,
    pub gid: u32,
    /// 分配的 512B 块数量
    pub blocks: u64,
    pub atime: u32,
    pub mtime: u32,
    pub ctime: u32,
}

impl Metadata {
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }

    pub fn is_file(&self) -> bool {
        self.file_type == FileType::RegularFile
    }

    pub fn is_symlink(&self) -> bool {
        self.file_type == FileType::Symlink
    }

    /// 权限位（含 setuid/setgid/sticky）
    pub fn permissions(&self) -> u16 {
        self.mode & 0o7777
    }
}

/// 目录项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub inode: u32,
    pub file_type: FileType,
}

/// 文件系统状态信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatFs {
    pub blocks_count: u64,
    pub free_blocks_count: u64,
    pub inodes_count: u32,
    pub free_inodes_count: u32,
    pub block_size: u64,
}
