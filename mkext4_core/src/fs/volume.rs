//! 文件系统在虚拟内存中的落点
//!
//! 把文件系统内的字节偏移或 extent 换算成虚拟内存地址，
//! 并持有块分配器，供 extent 树和目录在增长时分配块。

use crate::balloc::BlockAllocator;
use crate::error::{Error, ErrorKind, Result};
use crate::extent::Extent;
use crate::region::Region;
use crate::vm::VirtualMemory;

pub(crate) struct Volume {
    pub(crate) vm: VirtualMemory,
    /// 文件系统在虚拟内存中的起始偏移
    pub(crate) base: u64,
    pub(crate) alloc: BlockAllocator,
    block_size: u64,
}

impl Volume {
    pub(crate) fn new(vm: VirtualMemory, base: u64, alloc: BlockAllocator, block_size: u64) -> Self {
        Self {
            vm,
            base,
            alloc,
            block_size,
        }
    }

    pub(crate) fn block_size(&self) -> u64 {
        self.block_size
    }

    /// 把区域映射到文件系统内偏移 `offset`
    ///
    /// 偏移 0 是 superblock 之前的引导区，任何结构都不应指向那里。
    pub(crate) fn map_region(&mut self, region: Region, offset: u64) -> Result<()> {
        if offset == 0 {
            return Err(Error::new(
                ErrorKind::Corrupted,
                "attempted to map a region at filesystem offset 0",
            ));
        }
        self.vm.map(region, self.base + offset)
    }

    /// 按 extent 的逻辑位置截取区域，映射到其物理块
    pub(crate) fn map_extent(&mut self, region: Region, extent: &Extent) -> Result<()> {
        let skip = extent.logical_block() as u64 * self.block_size;
        self.map_raw_extent(Region::offset(region, skip), extent)
    }

    /// 把区域的开头（最多 extent 长度）映射到 extent 的物理块
    pub(crate) fn map_raw_extent(&mut self, region: Region, extent: &Extent) -> Result<()> {
        let max = extent.len() as u64 * self.block_size;
        let offset = extent.physical_block() * self.block_size;
        self.map_region(Region::truncated(region, max), offset)
    }

    /// 读取文件系统内偏移 `offset` 处的字节
    pub(crate) fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.vm.read_at(buf, self.base + offset)
    }
}
