//! 块组
//!
//! 每个块组拥有一段固定的块和 inode 窗口，用块位图和 inode 位图记录占用，
//! 描述符中保存空闲计数和位图、inode 表的位置。

mod desc;

pub use desc::GroupDescriptor;

use crate::consts::*;
use crate::error::Result;
use crate::region::BitmapRegion;

/// 块组状态
pub struct BlockGroup {
    index: u32,
    desc: GroupDescriptor,
    block_bitmap: BitmapRegion,
    inode_bitmap: BitmapRegion,
    /// 本组第一个块的绝对块号
    first_block: u64,
    /// 本组实际拥有的块数（最后一组可能不满）
    block_count: u32,
    inode_count: u32,
    /// 可能空闲的第一个块（组内索引）
    pub(crate) first_free_block: u32,
    /// 可能空闲的第一个 inode（组内索引）
    pub(crate) first_free_inode: u32,
}

impl BlockGroup {
    /// 创建块组
    ///
    /// # 参数
    ///
    /// * `index` - 块组号
    /// * `first_block` - 本组第一个块的块号
    /// * `block_count` - 本组拥有的块数
    /// * `inode_count` - 本组拥有的 inode 数
    /// * `bitmap_bits` - 位图容量（整块），超出本组数量的位被预先置位
    pub fn new(
        index: u32,
        first_block: u64,
        block_count: u32,
        inode_count: u32,
        block_bitmap_bits: u64,
        inode_bitmap_bits: u64,
    ) -> Result<Self> {
        let block_bitmap = BitmapRegion::new(block_bitmap_bits);
        let inode_bitmap = BitmapRegion::new(inode_bitmap_bits);

        // 位图尾部的填充位标记为已用
        block_bitmap.set_range(block_count as u64, block_bitmap.bits(), true)?;
        inode_bitmap.set_range(inode_count as u64, inode_bitmap.bits(), true)?;

        let desc = GroupDescriptor::new();
        desc.set_free_blocks_count(block_count);
        desc.set_free_inodes_count(inode_count);
        desc.set_flags(EXT4_BG_INODE_ZEROED);

        Ok(Self {
            index,
            desc,
            block_bitmap,
            inode_bitmap,
            first_block,
            block_count,
            inode_count,
            first_free_block: 0,
            first_free_inode: 0,
        })
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn desc(&self) -> &GroupDescriptor {
        &self.desc
    }

    pub fn block_bitmap(&self) -> &BitmapRegion {
        &self.block_bitmap
    }

    pub fn inode_bitmap(&self) -> &BitmapRegion {
        &self.inode_bitmap
    }

    pub fn first_block(&self) -> u64 {
        self.first_block
    }

    pub fn block_count(&self) -> u32 {
        self.block_count
    }

    pub fn inode_count(&self) -> u32 {
        self.inode_count
    }

    pub fn free_blocks_count(&self) -> u32 {
        self.desc.free_blocks_count()
    }

    pub fn free_inodes_count(&self) -> u32 {
        self.desc.free_inodes_count()
    }

    /// 记录一个新目录
    pub fn inc_used_dirs(&self) {
        self.desc.set_used_dirs_count(self.desc.used_dirs_count() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_group_marks_padding() {
        let bg = BlockGroup::new(1, 32768, 100, 64, 32768, 32768).unwrap();
        assert_eq!(bg.free_blocks_count(), 100);
        assert_eq!(bg.free_inodes_count(), 64);
        assert!(!bg.block_bitmap().get(99).unwrap());
        assert!(bg.block_bitmap().get(100).unwrap());
        assert!(bg.inode_bitmap().get(64).unwrap());
        assert_eq!(bg.block_bitmap().count_ones(), 32768 - 100);
        assert!(bg.desc().has_flag(EXT4_BG_INODE_ZEROED));
    }
}
