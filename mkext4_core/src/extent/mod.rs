//! Extent 树模块
//!
//! 这个模块负责生成 ext4 extent 树，把文件的逻辑块映射到分配出来的物理块。
//!
//! 不超过 4 个 extent 时整棵树直接放在 inode 的 i_block 中（深度 0）；
//! 更大的文件使用一个外部叶子块（深度 1）。

mod tree;

pub use tree::{ExtentTree, ExternalTree, InlineTree};

use alloc::vec::Vec;

use crate::consts::*;
use crate::error::{Error, ErrorKind, Result};
use crate::region::RawRegion;
use crate::types::{extent_off, split_u64};

/// 一段连续的块映射
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    logical_block: u32,
    physical_block: u64,
    len: u16,
}

impl Extent {
    /// 创建 extent
    ///
    /// 物理块 0 永远属于 superblock 所在块，出现在 extent 中说明分配器状态已损坏。
    pub fn new(logical_block: u32, physical_block: u64, len: u16) -> Result<Self> {
        if physical_block == 0 {
            return Err(Error::new(
                ErrorKind::Corrupted,
                "extent points at physical block 0",
            ));
        }
        Ok(Self {
            logical_block,
            physical_block,
            len,
        })
    }

    pub fn logical_block(&self) -> u32 {
        self.logical_block
    }

    pub fn physical_block(&self) -> u64 {
        self.physical_block
    }

    pub fn len(&self) -> u16 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 最后一个逻辑块之后的逻辑块号
    pub fn logical_end(&self) -> u32 {
        self.logical_block + self.len as u32
    }

    /// 替换逻辑起始块
    pub fn with_logical_block(self, logical_block: u32) -> Self {
        Self {
            logical_block,
            ..self
        }
    }

    /// 拆成若干单块 extent
    pub fn blocks(&self) -> impl Iterator<Item = Extent> + '_ {
        (0..self.len).map(move |i| Extent {
            logical_block: self.logical_block + i as u32,
            physical_block: self.physical_block + i as u64,
            len: 1,
        })
    }
}

/// 把多个 extent 展开成按逻辑顺序排列的单块 extent
pub fn split_into_blocks(extents: &[Extent]) -> Vec<Extent> {
    extents.iter().flat_map(|e| e.blocks()).collect()
}

/// 写入 extent 头
pub(crate) fn write_header(raw: &RawRegion, off: usize, entries: u16, max: u16, depth: u16) {
    raw.write_u16(off + extent_off::EH_MAGIC, EXT4_EXTENT_MAGIC);
    raw.write_u16(off + extent_off::EH_ENTRIES, entries);
    raw.write_u16(off + extent_off::EH_MAX, max);
    raw.write_u16(off + extent_off::EH_DEPTH, depth);
    raw.write_u32(off + extent_off::EH_GENERATION, 0);
}

/// 读取 extent 头，返回 (entries, max, depth)
pub(crate) fn read_header(raw: &RawRegion, off: usize) -> Result<(u16, u16, u16)> {
    if raw.read_u16(off + extent_off::EH_MAGIC) != EXT4_EXTENT_MAGIC {
        return Err(Error::new(ErrorKind::Corrupted, "bad extent header magic"));
    }
    let entries = raw.read_u16(off + extent_off::EH_ENTRIES);
    let max = raw.read_u16(off + extent_off::EH_MAX);
    if entries > max {
        return Err(Error::new(
            ErrorKind::Corrupted,
            "extent header entries exceed max",
        ));
    }
    Ok((entries, max, raw.read_u16(off + extent_off::EH_DEPTH)))
}

/// 写入叶子节点项
pub(crate) fn write_leaf(raw: &RawRegion, off: usize, extent: &Extent) {
    let (lo, hi) = split_u64(extent.physical_block);
    raw.write_u32(off + extent_off::EE_BLOCK, extent.logical_block);
    raw.write_u16(off + extent_off::EE_LEN, extent.len);
    raw.write_u16(off + extent_off::EE_START_HI, hi as u16);
    raw.write_u32(off + extent_off::EE_START_LO, lo);
}

/// 读取叶子节点项
pub(crate) fn read_leaf(raw: &RawRegion, off: usize) -> Result<Extent> {
    let lo = raw.read_u32(off + extent_off::EE_START_LO) as u64;
    let hi = raw.read_u16(off + extent_off::EE_START_HI) as u64;
    Extent::new(
        raw.read_u32(off + extent_off::EE_BLOCK),
        hi << 32 | lo,
        raw.read_u16(off + extent_off::EE_LEN),
    )
}

/// 写入索引节点项
pub(crate) fn write_index(raw: &RawRegion, off: usize, logical_block: u32, leaf: u64) {
    let (lo, hi) = split_u64(leaf);
    raw.write_u32(off + extent_off::EI_BLOCK, logical_block);
    raw.write_u32(off + extent_off::EI_LEAF_LO, lo);
    raw.write_u16(off + extent_off::EI_LEAF_HI, hi as u16);
}
