//! Extent 树的两种编码
//!
//! - 内联树：头和最多 4 个叶子直接存放在 inode 的 i_block 中；
//! - 外部树：i_block 中只有一个索引项，指向单独一个叶子块。
//!
//! 两种编码在创建时根据需要的 extent 数选择，之后不会互相转换。

use alloc::vec::Vec;
use core::fmt;

use super::{read_header, read_leaf, write_header, write_index, write_leaf, Extent};
use crate::consts::*;
use crate::error::{Error, ErrorKind, Result};
use crate::fs::volume::Volume;
use crate::inode::InodeRecord;
use crate::region::{RawRegion, Region};
use crate::types::{div_round_up, inode_off, InodeFlags};

/// i_block 中 extent 树根的偏移
const ROOT: usize = inode_off::BLOCK;

/// 第 `i` 个表项相对节点起点的偏移（第 0 项是头）
#[inline]
fn entry(i: usize) -> usize {
    (i + 1) * EXT4_EXTENT_ENTRY_SIZE
}

/// 一个 inode 的 extent 树
pub enum ExtentTree {
    Inline(InlineTree),
    External(ExternalTree),
}

impl ExtentTree {
    /// 为 inode 分配 `blocks` 个块并建立 extent 树
    ///
    /// 跨越的块组数不超过 4 时使用内联编码，否则使用外部叶子块。
    pub(crate) fn create(vol: &mut Volume, record: &InodeRecord, blocks: u64) -> Result<Self> {
        let per_group = vol.alloc.blocks_per_group() as u64;
        let tree = if div_round_up(blocks, per_group) <= EXT4_INLINE_EXTENTS_MAX as u64 {
            ExtentTree::Inline(InlineTree::create(vol, record, blocks)?)
        } else {
            ExtentTree::External(ExternalTree::create(vol, record, blocks)?)
        };
        record.set_flags(record.flags() | InodeFlags::EXTENTS);
        Ok(tree)
    }

    /// 按逻辑顺序返回全部 extent
    pub fn extents(&self) -> Result<Vec<Extent>> {
        match self {
            ExtentTree::Inline(t) => t.extents(),
            ExtentTree::External(t) => t.extents(),
        }
    }

    /// 追加 `blocks` 个块，返回新增的 extent
    pub(crate) fn allocate_blocks(&mut self, vol: &mut Volume, blocks: u64) -> Result<Vec<Extent>> {
        match self {
            ExtentTree::Inline(t) => t.allocate_blocks(vol, blocks),
            ExtentTree::External(t) => t.allocate_blocks(vol, blocks),
        }
    }

    /// 树本身占用的块数（不含数据块）
    pub fn metadata_blocks(&self) -> u64 {
        match self {
            ExtentTree::Inline(_) => 0,
            ExtentTree::External(_) => 1,
        }
    }

    /// 数据块总数
    pub fn data_blocks(&self) -> Result<u64> {
        Ok(self.extents()?.iter().map(|e| e.len() as u64).sum())
    }
}

impl fmt::Debug for ExtentTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            ExtentTree::Inline(_) => "inline",
            ExtentTree::External(_) => "external",
        };
        write!(f, "ExtentTree<{}>[", kind)?;
        match self.extents() {
            Ok(extents) => {
                for (i, e) in extents.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}+{}@{}", e.logical_block(), e.len(), e.physical_block())?;
                }
            }
            Err(err) => write!(f, "{}", err)?,
        }
        write!(f, "]")
    }
}

/// 存放在 inode 内的 extent 树（深度 0）
pub struct InlineTree {
    record: InodeRecord,
}

impl InlineTree {
    fn create(vol: &mut Volume, record: &InodeRecord, blocks: u64) -> Result<Self> {
        let extents = vol.alloc.allocate_multi_extent_blocks(blocks)?;
        if extents.len() > EXT4_INLINE_EXTENTS_MAX {
            return Err(Error::new(
                ErrorKind::Corrupted,
                "inline extent tree cannot hold more than 4 extents",
            ));
        }

        let raw = record.raw();
        write_header(raw, ROOT, extents.len() as u16, EXT4_INLINE_EXTENTS_MAX as u16, 0);
        for (i, e) in extents.iter().enumerate() {
            write_leaf(raw, ROOT + entry(i), e);
        }

        Ok(Self {
            record: record.clone(),
        })
    }

    pub fn extents(&self) -> Result<Vec<Extent>> {
        let raw = self.record.raw();
        let (entries, _, depth) = read_header(raw, ROOT)?;
        if depth != 0 {
            return Err(Error::new(ErrorKind::Corrupted, "inline extent tree has depth"));
        }
        (0..entries as usize)
            .map(|i| read_leaf(raw, ROOT + entry(i)))
            .collect()
    }

    /// 追加块
    ///
    /// 新 extent 的逻辑块号接在现有最后一个 extent 之后。
    /// 预计总数超过 4 个时在分配之前就失败，不会泄漏块。
    fn allocate_blocks(&mut self, vol: &mut Volume, blocks: u64) -> Result<Vec<Extent>> {
        if blocks == 0 {
            return Ok(Vec::new());
        }

        let existing = self.extents()?;
        let per_group = vol.alloc.blocks_per_group() as u64;
        let predicted = div_round_up(blocks, per_group) as usize;
        if existing.len() + predicted > EXT4_INLINE_EXTENTS_MAX {
            return Err(Error::new(
                ErrorKind::Corrupted,
                "inline extent tree cannot hold more than 4 extents",
            ));
        }

        let base = existing.last().map_or(0, |e| e.logical_end());
        let added: Vec<Extent> = vol
            .alloc
            .allocate_multi_extent_blocks(blocks)?
            .into_iter()
            .map(|e| e.with_logical_block(base + e.logical_block()))
            .collect();

        let raw = self.record.raw();
        for (i, e) in added.iter().enumerate() {
            write_leaf(raw, ROOT + entry(existing.len() + i), e);
        }
        write_header(
            raw,
            ROOT,
            (existing.len() + added.len()) as u16,
            EXT4_INLINE_EXTENTS_MAX as u16,
            0,
        );

        Ok(added)
    }
}

/// 带一个外部叶子块的 extent 树（深度 1）
pub struct ExternalTree {
    leaf: RawRegion,
    leaf_block: u64,
}

impl ExternalTree {
    fn create(vol: &mut Volume, record: &InodeRecord, blocks: u64) -> Result<Self> {
        let block_size = vol.block_size();
        let max = (block_size as usize - EXT4_EXTENT_ENTRY_SIZE) / EXT4_EXTENT_ENTRY_SIZE;

        // 先检查叶子容量再分配，失败时不会占用任何块
        let per_group = vol.alloc.blocks_per_group() as u64;
        if div_round_up(blocks, per_group) > max as u64 {
            return Err(Error::new(
                ErrorKind::Unsupported,
                "file needs more extents than one leaf block can hold",
            ));
        }

        let extents = vol.alloc.allocate_multi_extent_blocks(blocks)?;
        let leaf_extent = vol.alloc.allocate_blocks(1)?;

        let leaf = RawRegion::new(block_size as usize);
        write_header(&leaf, 0, extents.len() as u16, max as u16, 0);
        for (i, e) in extents.iter().enumerate() {
            write_leaf(&leaf, entry(i), e);
        }
        vol.map_raw_extent(Region::Raw(leaf.clone()), &leaf_extent)?;

        let raw = record.raw();
        write_header(raw, ROOT, 1, EXT4_INLINE_EXTENTS_MAX as u16, 1);
        write_index(raw, ROOT + entry(0), 0, leaf_extent.physical_block());

        log::debug!(
            "external extent tree: {} extents, leaf at block {}",
            extents.len(),
            leaf_extent.physical_block()
        );

        Ok(Self {
            leaf,
            leaf_block: leaf_extent.physical_block(),
        })
    }

    /// 叶子块的物理块号
    pub fn leaf_block(&self) -> u64 {
        self.leaf_block
    }

    pub fn extents(&self) -> Result<Vec<Extent>> {
        let (entries, _, depth) = read_header(&self.leaf, 0)?;
        if depth != 0 {
            return Err(Error::new(
                ErrorKind::Unsupported,
                "extent trees deeper than one index level",
            ));
        }
        (0..entries as usize)
            .map(|i| read_leaf(&self.leaf, entry(i)))
            .collect()
    }

    fn allocate_blocks(&mut self, _vol: &mut Volume, _blocks: u64) -> Result<Vec<Extent>> {
        Err(Error::new(
            ErrorKind::Unsupported,
            "external extent tree cannot grow",
        ))
    }
}
