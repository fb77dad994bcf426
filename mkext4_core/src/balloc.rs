//! 块分配功能
//!
//! 块组内部按首次适配查找连续空闲块；文件系统级的分配器按固定顺序
//! 依次尝试每个块组，返回第一个成功的结果。

use alloc::vec::Vec;

use crate::block_group::BlockGroup;
use crate::error::{Error, ErrorKind, Result};
use crate::extent::Extent;
use crate::superblock::Superblock;
use crate::types::div_round_up;

/// 分配统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocStats {
    pub block_allocations: u64,
    pub blocks_allocated: u64,
    pub full_group_allocations: u64,
    pub inode_allocations: u64,
}

impl BlockGroup {
    /// 在组内查找并占用 `blocks` 个连续空闲块
    ///
    /// # 返回
    ///
    /// 组内起始索引；空间不足时返回 `None`（不是错误）
    pub(crate) fn take_run(&mut self, blocks: u32) -> Result<Option<u32>> {
        if blocks == 0 || self.free_blocks_count() < blocks {
            return Ok(None);
        }

        // 整组分配的快速路径
        if blocks == self.block_count()
            && self.free_blocks_count() == self.block_count()
            && self.first_free_block == 0
        {
            self.block_bitmap().set_all(true);
            self.desc().set_free_blocks_count(0);
            self.first_free_block = self.block_count();
            return Ok(Some(0));
        }

        let mut start = self.first_free_block;
        let mut no_free_seen = true;

        for i in self.first_free_block..self.block_count() {
            if self.block_bitmap().get(i as u64)? {
                if no_free_seen {
                    self.first_free_block = i + 1;
                }
                start = i + 1;
                continue;
            }
            no_free_seen = false;

            if i + 1 - start == blocks {
                self.block_bitmap().set_range(start as u64, (i + 1) as u64, true)?;
                self.desc()
                    .set_free_blocks_count(self.free_blocks_count() - blocks);
                if start == self.first_free_block {
                    self.first_free_block = i + 1;
                }
                return Ok(Some(start));
            }
        }

        Ok(None)
    }

    /// 在组内分配连续块
    ///
    /// 首次适配，一次分配一段连续区间。返回的 extent 逻辑块号为 0，由调用者填写。
    pub fn allocate_blocks(&mut self, blocks: u32) -> Result<Option<Extent>> {
        match self.take_run(blocks)? {
            Some(start) => {
                let extent = Extent::new(0, self.first_block() + start as u64, blocks as u16)?;
                Ok(Some(extent))
            }
            None => Ok(None),
        }
    }
}

/// 文件系统级块分配器
///
/// 拥有全部块组，并与 superblock 共享空闲计数。
pub struct BlockAllocator {
    sb: Superblock,
    groups: Vec<BlockGroup>,
    blocks_per_group: u32,
    block_size: u64,
    stats: AllocStats,
}

impl BlockAllocator {
    pub fn new(sb: Superblock, blocks_per_group: u32, block_size: u64) -> Self {
        Self {
            sb,
            groups: Vec::new(),
            blocks_per_group,
            block_size,
            stats: AllocStats::default(),
        }
    }

    pub fn push_group(&mut self, group: BlockGroup) {
        self.groups.push(group);
    }

    pub fn groups(&self) -> &[BlockGroup] {
        &self.groups
    }

    pub(crate) fn groups_mut(&mut self) -> &mut [BlockGroup] {
        &mut self.groups
    }

    pub fn group(&self, index: u32) -> Option<&BlockGroup> {
        self.groups.get(index as usize)
    }

    pub fn superblock(&self) -> &Superblock {
        &self.sb
    }

    pub fn stats(&self) -> AllocStats {
        self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut AllocStats {
        &mut self.stats
    }

    pub fn blocks_per_group(&self) -> u32 {
        self.blocks_per_group
    }

    /// 分配不超过一个块组大小的连续块
    ///
    /// # 返回
    ///
    /// 成功返回 extent（逻辑块号为 0）；所有块组都放不下时返回 `NoSpace`
    pub fn allocate_blocks(&mut self, blocks: u64) -> Result<Extent> {
        if blocks == 0 {
            return Err(Error::new(ErrorKind::InvalidInput, "cannot allocate zero blocks"));
        }
        if blocks > self.blocks_per_group as u64 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "requested blocks exceed one block group, use allocate_multi_extent_blocks",
            ));
        }

        for group in self.groups.iter_mut() {
            let full = blocks == group.block_count() as u64;
            if let Some(extent) = group.allocate_blocks(blocks as u32)? {
                self.sb
                    .set_free_blocks_count(self.sb.free_blocks_count() - blocks);
                self.stats.block_allocations += 1;
                self.stats.blocks_allocated += blocks;
                if full {
                    self.stats.full_group_allocations += 1;
                }
                log::trace!(
                    "allocated {} blocks at {} in group {}",
                    blocks,
                    extent.physical_block(),
                    group.index()
                );
                return Ok(extent);
            }
        }

        Err(Error::new(ErrorKind::NoSpace, "filesystem is full or fragmented"))
    }

    /// 分配能容纳 `bytes` 字节的连续块
    pub fn allocate_blocks_for_bytes(&mut self, bytes: u64) -> Result<Extent> {
        self.allocate_blocks(div_round_up(bytes, self.block_size))
    }

    /// 分配任意数量的块
    ///
    /// 按整块组拆分成若干子请求加一个余数请求，
    /// 结果 extent 的逻辑块号从 0 开始依次递增。
    pub fn allocate_multi_extent_blocks(&mut self, blocks: u64) -> Result<Vec<Extent>> {
        let per_group = self.blocks_per_group as u64;
        let full_groups = blocks / per_group;
        let remainder = blocks % per_group;

        let mut extents = Vec::new();
        let mut logical = 0u32;

        for _ in 0..full_groups {
            let extent = self.allocate_blocks(per_group)?.with_logical_block(logical);
            logical += extent.len() as u32;
            extents.push(extent);
        }
        if remainder > 0 {
            extents.push(self.allocate_blocks(remainder)?.with_logical_block(logical));
        }

        Ok(extents)
    }

    /// 在指定块组开头占用 `blocks` 个块，不生成 extent
    ///
    /// 用于块 0（superblock 所在块）这类不能用 extent 表示的区域。
    pub fn reserve_blocks(&mut self, group: u32, blocks: u32) -> Result<u64> {
        let bg = self
            .groups
            .get_mut(group as usize)
            .ok_or(Error::new(ErrorKind::InvalidInput, "no such block group"))?;
        let start = bg
            .take_run(blocks)?
            .ok_or(Error::new(ErrorKind::NoSpace, "cannot reserve metadata blocks"))?;
        self.sb
            .set_free_blocks_count(self.sb.free_blocks_count() - blocks as u64);
        Ok(bg.first_block() + start as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;

    fn allocator(groups: u32, bpg: u32, last: u32) -> BlockAllocator {
        let sb = Superblock::new();
        let total = (groups - 1) as u64 * bpg as u64 + last as u64;
        sb.set_free_blocks_count(total);
        let mut alloc = BlockAllocator::new(sb, bpg, EXT4_BLOCK_SIZE);
        for i in 0..groups {
            let count = if i + 1 == groups { last } else { bpg };
            alloc.push_group(
                BlockGroup::new(i, i as u64 * bpg as u64, count, 16, 32768, 32768).unwrap(),
            );
        }
        alloc
    }

    #[test]
    fn test_first_fit_contiguous() {
        let mut alloc = allocator(1, 64, 64);
        alloc.reserve_blocks(0, 1).unwrap();

        let a = alloc.allocate_blocks(3).unwrap();
        assert_eq!((a.physical_block(), a.len()), (1, 3));
        let b = alloc.allocate_blocks(5).unwrap();
        assert_eq!(b.physical_block(), 4);
        assert_eq!(alloc.superblock().free_blocks_count(), 64 - 9);
        assert_eq!(alloc.group(0).unwrap().free_blocks_count(), 64 - 9);
    }

    #[test]
    fn test_exact_fit_at_group_end() {
        let mut alloc = allocator(1, 16, 16);
        alloc.reserve_blocks(0, 1).unwrap();
        alloc.allocate_blocks(11).unwrap();
        // 恰好剩余 4 个块时仍能分配成功
        let e = alloc.allocate_blocks(4).unwrap();
        assert_eq!(e.physical_block(), 12);
        assert_eq!(alloc.allocate_blocks(1).unwrap_err().kind(), ErrorKind::NoSpace);
    }

    #[test]
    fn test_falls_through_to_next_group() {
        let mut alloc = allocator(2, 16, 16);
        alloc.reserve_blocks(0, 1).unwrap();
        alloc.allocate_blocks(10).unwrap();
        let e = alloc.allocate_blocks(8).unwrap();
        assert_eq!(e.physical_block(), 16);
    }

    #[test]
    fn test_full_group_fast_path() {
        let mut alloc = allocator(2, 16, 16);
        alloc.reserve_blocks(0, 1).unwrap();
        let e = alloc.allocate_blocks(16).unwrap();
        assert_eq!((e.physical_block(), e.len()), (16, 16));
        assert_eq!(alloc.group(1).unwrap().free_blocks_count(), 0);
        assert_eq!(alloc.stats().full_group_allocations, 1);
    }

    #[test]
    fn test_partial_last_group() {
        let mut alloc = allocator(2, 16, 5);
        alloc.reserve_blocks(0, 16).unwrap();
        assert_eq!(alloc.allocate_blocks(6).unwrap_err().kind(), ErrorKind::NoSpace);
        let e = alloc.allocate_blocks(5).unwrap();
        assert_eq!(e.physical_block(), 16);
    }

    #[test]
    fn test_multi_extent_ordering() {
        let mut alloc = allocator(4, 16, 16);
        alloc.reserve_blocks(0, 1).unwrap();
        let extents = alloc.allocate_multi_extent_blocks(37).unwrap();
        let lens: Vec<_> = extents.iter().map(|e| (e.logical_block(), e.len())).collect();
        assert_eq!(lens, [(0, 16), (16, 16), (32, 5)]);
        assert_eq!(alloc.superblock().free_blocks_count(), 64 - 1 - 37);
    }

    #[test]
    fn test_request_larger_than_group() {
        let mut alloc = allocator(2, 16, 16);
        assert_eq!(alloc.allocate_blocks(17).unwrap_err().kind(), ErrorKind::InvalidInput);
    }
}
