//! Superblock 操作模块
//!
//! 这个模块提供 ext4 superblock 的初始化、读取和更新功能。
//! Superblock 以 1024 字节的 [`RawRegion`] 映射在文件系统偏移 1024 处，
//! 构建过程中持续被原地更新。

mod read;
mod write;

pub use write::SuperblockGeometry;

use crate::consts::*;
use crate::region::{RawRegion, Region};

/// Superblock 包装器
#[derive(Clone)]
pub struct Superblock {
    raw: RawRegion,
}

impl Superblock {
    /// 分配一个全零 superblock
    pub fn new() -> Self {
        Self {
            raw: RawRegion::new(EXT4_SUPERBLOCK_SIZE),
        }
    }

    /// 从已有字节解析（用于读回校验）
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let raw = RawRegion::new(EXT4_SUPERBLOCK_SIZE);
        let n = core::cmp::min(bytes.len(), EXT4_SUPERBLOCK_SIZE);
        raw.write_bytes(0, &bytes[..n]);
        Self { raw }
    }

    /// 用于映射的区域（与本对象共享缓冲区）
    pub fn region(&self) -> Region {
        Region::Raw(self.raw.clone())
    }
}

impl Default for Superblock {
    fn default() -> Self {
        Self::new()
    }
}
